//! Storage tunables
//!
//! Production defaults are sized for real datasets; tests shrink everything
//! so backend rotation and the ref database stay small per test.

use serde::{Deserialize, Serialize};

/// Default sqlite mmap size for the ref database (bytes)
pub const DEFAULT_MAP_SIZE: u64 = 256 * 1024 * 1024;

/// Default number of pack files per fanout directory
pub const DEFAULT_COLLECTION_COUNT: usize = 500;

/// Default number of samples per collection file
pub const DEFAULT_COLLECTION_SIZE: usize = 1000;

/// Per-backend rotation tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTuning {
    /// Collection files per fanout directory
    pub collection_count: usize,
    /// Samples per collection file before rotation
    pub collection_size: usize,
}

impl Default for BackendTuning {
    fn default() -> Self {
        Self {
            collection_count: DEFAULT_COLLECTION_COUNT,
            collection_size: DEFAULT_COLLECTION_SIZE,
        }
    }
}

/// Repository-wide storage settings
///
/// Persisted into the repository config at init time so later opens honor
/// the same layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// sqlite mmap size for the ref database (bytes)
    pub map_size: u64,
    /// Tuning for the compressed pack backend
    pub packed: BackendTuning,
    /// Tuning for the raw collection backend
    pub plain: BackendTuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            packed: BackendTuning::default(),
            plain: BackendTuning::default(),
        }
    }
}

impl Settings {
    /// Scaled-down settings for test repositories
    pub fn small_for_tests() -> Self {
        let tuning = BackendTuning {
            collection_count: 10,
            collection_size: 50,
        };
        Self {
            map_size: 2_000_000,
            packed: tuning,
            plain: tuning,
        }
    }
}
