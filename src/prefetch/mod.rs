//! Cache prefetch
//!
//! Runs the external fetch command for a resolved [`DependencySpec`] when its
//! cache is not yet ready. Output lines are coalesced into periodic
//! [`PrefetchStatus`] updates; jobs can be cancelled and at most one job runs
//! per cache path.
//!
//! [`DependencySpec`]: crate::deps::DependencySpec

pub mod cancel;
pub mod job;
mod orchestrator;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use job::{PrefetchCommand, PrefetchJob, PrefetchStatus};
pub use orchestrator::{
    PrefetchHandle, PrefetchOrchestrator, PrefetchOutcome, PrefetchRequest, PrefetchSettings,
    PrefetchStart, ENV_APP, ENV_CACHE_PATH, ENV_SDK_VERSION,
};
