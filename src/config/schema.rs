//! Configuration schema for kitprep
//!
//! Settings are stored at `~/.config/kitprep/config.toml`; a project-local
//! `.kitprep.toml` may override any subset of keys.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One gibibyte
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Process-wide SDK defaults
    pub sdk: SdkConfig,

    /// Where per-application declarations live
    pub apps: AppsConfig,

    /// Extension cache locations and readiness threshold
    pub cache: CacheConfig,

    /// First-run download estimate
    pub estimate: EstimateConfig,

    /// External fetch process
    pub prefetch: PrefetchConfig,

    /// Remote extension registry
    pub registry: RegistryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record prefetch lifecycle events as JSON lines
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            event_log: true,
        }
    }
}

/// SDK settings shared by every application without a private version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Default SDK version (semver)
    pub version: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            version: "106.5.0".to_string(),
        }
    }
}

/// Application declaration discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Directory holding one subdirectory per application
    pub root: PathBuf,

    /// Declaration file name inside each application directory
    pub declaration_file: String,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("source/apps"),
            declaration_file: "dependencies.toml".to_string(),
        }
    }
}

impl AppsConfig {
    /// Candidate declaration file for an application
    pub fn declaration_path(&self, app_id: &str) -> PathBuf {
        self.root.join(app_id).join(&self.declaration_file)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Process-wide shared extension cache
    pub default_path: PathBuf,

    /// Parent directory for isolated per-application caches
    pub isolated_root: PathBuf,

    /// Minimum entry count for a cache to count as ready
    pub ready_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            default_path: base.join("extscache"),
            isolated_root: base.join("apps"),
            ready_threshold: 50,
        }
    }
}

/// Download estimate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Assumed size of a full first-time dependency set
    pub size_bytes: u64,

    /// Bandwidth used when the caller does not supply one
    pub bandwidth_mbps: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            size_bytes: 12 * GIB,
            bandwidth_mbps: 50.0,
        }
    }
}

/// External fetch process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Program followed by leading arguments, e.g. `["./repo.sh", "build"]`
    pub command: Vec<String>,

    /// Profile passed as `--config <profile>` when none is given
    pub default_profile: String,

    /// Emit one status update every N output lines
    pub status_update_every: u64,

    /// Number of trailing stderr lines kept for failure reports
    pub stderr_tail_lines: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            command: vec!["./repo.sh".to_string(), "build".to_string()],
            default_profile: "release".to_string(),
            status_update_every: 10,
            stderr_tail_lines: 20,
        }
    }
}

/// Extension registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL; identifiers are looked up at `{url}/{identifier}`
    pub url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://ovextensionsprod.blob.core.windows.net/exts/kit/prod/shared".to_string(),
            timeout_secs: 10,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kitprep")
}
