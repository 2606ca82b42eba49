//! Stockroom Core Library
//!
//! Core functionality for the stockroom versioned array store:
//! - Typed n-dimensional array values and schemas
//! - Content-addressed object model (samples, manifests, commits)
//! - Tunable storage backends (zstd pack files, raw collections)
//! - Repository lifecycle: init, open, checkouts, teardown
//! - Write checkouts with arrayset staging and linear commit history

pub mod array;
pub mod arrayset;
pub mod backend;
pub mod checkout;
pub mod error;
pub mod object;
pub mod repository;
pub mod schema;
pub mod settings;

pub use array::{DType, NdArray};
pub use arrayset::{Arrayset, ArraysetView, Arraysets};
pub use backend::{BackendCode, BackendStore, PackedStore, PlainStore, choose_backend};
pub use checkout::{ReadCheckout, WriteCheckout};
pub use error::{Result, StoreError};
pub use object::{ArraysetManifest, CommitRecord, ObjectId, SampleRef};
pub use repository::{Environments, RepoConfig, Repository};
pub use schema::ArraySchema;
pub use settings::{
    BackendTuning, DEFAULT_COLLECTION_COUNT, DEFAULT_COLLECTION_SIZE, DEFAULT_MAP_SIZE, Settings,
};
