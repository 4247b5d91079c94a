//! kitprep - Kit application dependency cache manager
//!
//! Resolves per-application dependency declarations, classifies extension
//! cache readiness, estimates first-run downloads and prefetches caches
//! through an external fetch command.

pub mod cache;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod events;
pub mod prefetch;
pub mod ui;

pub use error::{KitprepError, KitprepResult};
