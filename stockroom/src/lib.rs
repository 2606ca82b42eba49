//! Stockroom
//!
//! A thin façade over the stockroom-core versioned array store for projects
//! that already live in git: `init_repo` sets up a `.stock/` data directory
//! next to `.git`, and [`StockRoom`] stores labelled arrays against it.
//!
//! The [`fixtures`] module provides the test-scoped setup/teardown chain
//! used by the test suites.

pub mod fixtures;
pub mod repo;
pub mod stock;

pub use repo::{DATA_DIR, data_dir, init_repo, init_repo_at, init_repo_with, open_repo};
pub use stock::{DATA_ARRAYSET, StockRoom};
