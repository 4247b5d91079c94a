//! First-run download estimate
//!
//! The size is a static overestimate of a full dependency set. It does not
//! look at the declared dependency list.

use crate::error::{KitprepError, KitprepResult};
use serde::Serialize;

/// Default size of a full first-time dependency set (12 GiB)
pub const DEFAULT_ESTIMATED_BYTES: u64 = 12 * 1024 * 1024 * 1024;

/// Default bandwidth assumption
pub const DEFAULT_BANDWIDTH_MBPS: f64 = 50.0;

/// Estimated size and duration of a first fetch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DownloadEstimate {
    pub estimated_bytes: u64,
    pub bandwidth_mbps: f64,
    pub estimated_seconds: f64,
}

/// Computes download estimates from a fixed size
#[derive(Debug, Clone, Copy)]
pub struct DownloadEstimator {
    size_bytes: u64,
    default_bandwidth_mbps: f64,
}

impl DownloadEstimator {
    pub fn new(size_bytes: u64, default_bandwidth_mbps: f64) -> Self {
        Self {
            size_bytes,
            default_bandwidth_mbps,
        }
    }

    /// Estimate for `bandwidth_mbps`, or the configured default when `None`
    pub fn estimate(&self, bandwidth_mbps: Option<f64>) -> KitprepResult<DownloadEstimate> {
        let bandwidth_mbps = bandwidth_mbps.unwrap_or(self.default_bandwidth_mbps);

        if !bandwidth_mbps.is_finite() || bandwidth_mbps <= 0.0 {
            return Err(KitprepError::Estimation {
                reason: format!("bandwidth must be a positive number of Mbps, got {}", bandwidth_mbps),
            });
        }

        let estimated_seconds =
            (self.size_bytes as f64 * 8.0) / (bandwidth_mbps * 1024.0 * 1024.0);

        Ok(DownloadEstimate {
            estimated_bytes: self.size_bytes,
            bandwidth_mbps,
            estimated_seconds,
        })
    }
}

impl Default for DownloadEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ESTIMATED_BYTES, DEFAULT_BANDWIDTH_MBPS)
    }
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format seconds as a rough duration (e.g., "32 min", "1 h 05 min")
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    if total < 60 {
        return format!("{} s", total);
    }
    let minutes = (total + 30) / 60;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_estimate_is_deterministic() {
        let estimate = DownloadEstimator::default().estimate(Some(50.0)).unwrap();
        assert_eq!(estimate.estimated_bytes, DEFAULT_ESTIMATED_BYTES);
        // 12 GiB * 8 / (50 * 2^20) = 1966.08
        assert!((estimate.estimated_seconds - 1966.08).abs() < 1e-6);
    }

    #[test]
    fn uses_default_bandwidth() {
        let estimator = DownloadEstimator::default();
        assert_eq!(
            estimator.estimate(None).unwrap(),
            estimator.estimate(Some(DEFAULT_BANDWIDTH_MBPS)).unwrap()
        );
    }

    #[test]
    fn doubling_bandwidth_halves_time() {
        let estimator = DownloadEstimator::default();
        for mbps in [1.0, 12.5, 50.0, 300.0] {
            let slow = estimator.estimate(Some(mbps)).unwrap();
            let fast = estimator.estimate(Some(mbps * 2.0)).unwrap();
            assert!((slow.estimated_seconds / 2.0 - fast.estimated_seconds).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_non_positive_bandwidth() {
        let estimator = DownloadEstimator::default();
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = estimator.estimate(Some(bad)).unwrap_err();
            assert!(matches!(err, KitprepError::Estimation { .. }));
        }
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(DEFAULT_ESTIMATED_BYTES), "12.0 GB");
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(42.0), "42 s");
        assert_eq!(format_duration(1966.08), "33 min");
        assert_eq!(format_duration(3900.0), "1 h 05 min");
    }

    #[test]
    fn format_duration_rounds_up_into_hours() {
        assert_eq!(format_duration(3569.0), "59 min");
        assert_eq!(format_duration(3570.0), "1 h 00 min");
        assert_eq!(format_duration(3590.0), "1 h 00 min");
        assert_eq!(format_duration(59.6), "1 min");
    }
}
