//! Extension cache readiness
//!
//! Readiness is a threshold on the number of entries directly under the cache
//! directory. The full required set is unknown before the first resolution,
//! so the threshold is an approximation rather than a membership check.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Default entry count at which a cache counts as ready
pub const DEFAULT_READY_THRESHOLD: usize = 50;

/// Binary readiness classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Below threshold, still populating
    Preparing,
    /// At or above threshold
    Ready,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Point-in-time snapshot of a cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheState {
    pub cache_path: PathBuf,
    pub extension_count: usize,
    pub threshold: usize,
    pub is_ready: bool,
}

impl CacheState {
    /// Classify a count against a threshold
    pub fn classify(cache_path: PathBuf, extension_count: usize, threshold: usize) -> Self {
        Self {
            cache_path,
            extension_count,
            threshold,
            is_ready: extension_count >= threshold,
        }
    }

    pub fn readiness(&self) -> Readiness {
        if self.is_ready {
            Readiness::Ready
        } else {
            Readiness::Preparing
        }
    }
}

/// Counts cache entries and classifies readiness.
///
/// Never caches results; every call rescans the filesystem.
#[derive(Debug, Clone, Copy)]
pub struct CacheStateDetector {
    threshold: usize,
}

impl CacheStateDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Scan `cache_path` (non-recursive) and classify it
    pub async fn detect(&self, cache_path: &Path) -> CacheState {
        let count = count_entries(cache_path).await;
        let state = CacheState::classify(cache_path.to_path_buf(), count, self.threshold);
        debug!(
            "Cache {}: {} entries (threshold {}) -> {}",
            cache_path.display(),
            count,
            self.threshold,
            state.readiness()
        );
        state
    }
}

impl Default for CacheStateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_READY_THRESHOLD)
    }
}

/// Missing directory counts as zero; unreadable entries are skipped.
async fn count_entries(dir: &Path) -> usize {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("Cannot read cache directory {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut count = 0;
    loop {
        match entries.next_entry().await {
            Ok(Some(_)) => count += 1,
            Ok(None) => break,
            Err(e) => debug!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populate(dir: &Path, n: usize) {
        for i in 0..n {
            fs::create_dir(dir.join(format!("omni.ext_{i}-1.0.0"))).unwrap();
        }
    }

    #[tokio::test]
    async fn missing_directory_is_zero() {
        let temp = TempDir::new().unwrap();
        let state = CacheStateDetector::default().detect(&temp.path().join("absent")).await;
        assert_eq!(state.extension_count, 0);
        assert!(!state.is_ready);
        assert_eq!(state.readiness(), Readiness::Preparing);
    }

    #[tokio::test]
    async fn threshold_boundary() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 49);

        let detector = CacheStateDetector::default();
        assert!(!detector.detect(temp.path()).await.is_ready);

        fs::write(temp.path().join("omni.last.txt"), "").unwrap();
        let state = detector.detect(temp.path()).await;
        assert_eq!(state.extension_count, 50);
        assert!(state.is_ready);
    }

    #[test]
    fn classify_is_binary() {
        for count in 0..DEFAULT_READY_THRESHOLD {
            assert!(!CacheState::classify(PathBuf::new(), count, DEFAULT_READY_THRESHOLD).is_ready);
        }
        for count in DEFAULT_READY_THRESHOLD..DEFAULT_READY_THRESHOLD * 3 {
            assert!(CacheState::classify(PathBuf::new(), count, DEFAULT_READY_THRESHOLD).is_ready);
        }
    }

    #[tokio::test]
    async fn counts_are_not_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("omni.ui");
        fs::create_dir(&nested).unwrap();
        populate(&nested, 5);

        let state = CacheStateDetector::new(1).detect(temp.path()).await;
        assert_eq!(state.extension_count, 1);
        assert!(state.is_ready);
    }

    #[tokio::test]
    async fn custom_threshold() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 3);

        assert!(CacheStateDetector::new(3).detect(temp.path()).await.is_ready);
        assert!(!CacheStateDetector::new(4).detect(temp.path()).await.is_ready);
    }

    #[tokio::test]
    async fn scan_yields_to_other_tasks() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 200);

        // Single-threaded runtime: a ticker only advances if the scan awaits
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = std::sync::Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            })
        };

        let state = CacheStateDetector::default().detect(temp.path()).await;
        ticker.abort();

        assert_eq!(state.extension_count, 200);
        assert!(ticks.load(std::sync::atomic::Ordering::Relaxed) > 0);
    }

    #[test]
    fn readiness_display() {
        assert_eq!(Readiness::Ready.to_string(), "ready");
        assert_eq!(Readiness::Preparing.to_string(), "preparing");
    }
}
