//! Extension cache inspection
//!
//! The cache directory is written only by the external fetch process; this
//! module only ever reads it.
//!
//! # Readiness
//!
//! | Entries | State | Meaning |
//! |---------|-------|---------|
//! | < threshold | preparing | First fetch missing or still running |
//! | >= threshold | ready | Enough extensions present to launch |

pub mod estimate;
pub mod path;
pub mod state;

pub use estimate::{format_bytes, format_duration, DownloadEstimate, DownloadEstimator};
pub use path::normalize_path;
pub use state::{CacheState, CacheStateDetector, Readiness};
