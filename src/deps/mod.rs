//! Per-application dependency resolution and validation
//!
//! An application either shares the process-wide extension cache or keeps an
//! isolated one of its own. Which one it gets is decided by its
//! `dependencies.toml`:
//!
//! ```toml
//! [kit_sdk]
//! version = "106.5.0"
//!
//! [cache]
//! strategy = "isolated"   # or "shared" (default)
//!
//! [dependencies]
//! "omni.kit.uiapp" = {}
//! "omni.kit.window.file" = "1.3.2"
//! "omni.usd-1.10.4" = {}
//! ```
//!
//! A missing file means the application uses the global defaults.

mod declaration;
pub mod registry;
mod resolver;
mod validate;

pub use declaration::{Declaration, DeclaredDependency};
pub use registry::{HttpRegistry, Registry, StaticRegistry};
pub use resolver::{ConfigResolver, ResolverSettings};
pub use validate::{ValidationIssue, ValidationMode, ValidationPipeline, ValidationReport};

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Whether an application has its own dependency cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Shares the process-wide cache
    Global,
    /// Owns a private cache
    Isolated,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

/// Declared `cache.strategy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    #[default]
    Shared,
    Isolated,
}

impl CacheStrategy {
    /// Parse a declaration value
    pub fn from_value(s: &str) -> Option<Self> {
        match s {
            "shared" => Some(Self::Shared),
            "isolated" => Some(Self::Isolated),
            _ => None,
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Isolated => write!(f, "isolated"),
        }
    }
}

/// Resolved dependency configuration for one application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencySpec {
    /// Application identifier, `None` for the process-wide default
    pub app: Option<String>,
    pub scope: Scope,
    pub sdk_version: semver::Version,
    pub cache_strategy: CacheStrategy,
    /// Directory consulted for readiness checks
    pub cache_path: PathBuf,
    /// In declaration order; duplicates are kept so validation can report them
    pub declared_dependencies: Vec<DeclaredDependency>,
}

impl DependencySpec {
    /// The process-wide default spec
    pub fn global(sdk_version: semver::Version, cache_path: PathBuf) -> Self {
        Self {
            app: None,
            scope: Scope::Global,
            sdk_version,
            cache_strategy: CacheStrategy::Shared,
            cache_path,
            declared_dependencies: Vec::new(),
        }
    }

    /// Display label for logs and UI
    pub fn label(&self) -> &str {
        self.app.as_deref().unwrap_or("<global>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_known_values() {
        assert_eq!(CacheStrategy::from_value("shared"), Some(CacheStrategy::Shared));
        assert_eq!(
            CacheStrategy::from_value("isolated"),
            Some(CacheStrategy::Isolated)
        );
        assert_eq!(CacheStrategy::from_value("Isolated"), None);
    }

    #[test]
    fn global_spec_defaults() {
        let spec = DependencySpec::global(
            semver::Version::new(106, 5, 0),
            PathBuf::from("/data/extscache"),
        );
        assert_eq!(spec.scope, Scope::Global);
        assert_eq!(spec.cache_strategy, CacheStrategy::Shared);
        assert_eq!(spec.label(), "<global>");
    }
}
