//! Dependency declaration validation
//!
//! Local checks are structural and run in one pass over the declared list,
//! stopping at the first problem. Registry checks are opt-in and only run
//! once the local checks pass.

use crate::deps::{DeclaredDependency, DependencySpec, Registry};
use crate::error::{KitprepError, KitprepResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Longest identifier accepted
const MAX_IDENTIFIER_LEN: usize = 128;

/// Which checks to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Structure and duplicates only
    Local,
    /// Local checks plus a registry lookup per dependency
    Registry,
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Registry => write!(f, "registry"),
        }
    }
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Entry is not a well-formed identifier or pin
    Malformed { entry: String, reason: String },
    /// Two entries name the same extension
    Duplicate {
        identifier: String,
        first: String,
        first_index: usize,
        second: String,
        second_index: usize,
    },
    /// Registry has no such extension
    Unresolved { identifier: String, registry: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { entry, reason } => write!(f, "'{}': {}", entry, reason),
            Self::Duplicate {
                identifier,
                first,
                first_index,
                second,
                second_index,
            } => write!(
                f,
                "'{}' declared twice: '{}' (#{}) and '{}' (#{})",
                identifier,
                first,
                first_index + 1,
                second,
                second_index + 1
            ),
            Self::Unresolved {
                identifier,
                registry,
            } => write!(f, "'{}' not found in {}", identifier, registry),
        }
    }
}

/// Summary of a passing validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub mode: ValidationMode,
    /// Number of dependencies checked
    pub checked: usize,
}

/// Runs checks over a spec's declared dependencies
pub struct ValidationPipeline<'a> {
    registry: Option<&'a dyn Registry>,
}

impl<'a> ValidationPipeline<'a> {
    /// Local-only pipeline (default)
    pub fn local() -> Self {
        Self { registry: None }
    }

    /// Pipeline that also confirms each dependency against `registry`
    pub fn with_registry(registry: &'a dyn Registry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn mode(&self) -> ValidationMode {
        if self.registry.is_some() {
            ValidationMode::Registry
        } else {
            ValidationMode::Local
        }
    }

    /// Validate a resolved spec.
    ///
    /// Returns `ValidationFailure` when any check fails; registry transport
    /// problems surface as `Registry` errors instead.
    pub async fn validate(&self, spec: &DependencySpec) -> KitprepResult<ValidationReport> {
        let deps = &spec.declared_dependencies;
        debug!(
            "Validating {} dependencies for {} ({:?})",
            deps.len(),
            spec.label(),
            self.mode()
        );

        if let Some(issue) = check_local(deps) {
            return Err(KitprepError::ValidationFailure {
                issues: vec![issue],
            });
        }

        if let Some(registry) = self.registry {
            let mut issues = Vec::new();
            for dep in deps {
                if !registry.contains(dep).await? {
                    issues.push(ValidationIssue::Unresolved {
                        identifier: dep.identifier.clone(),
                        registry: registry.location().to_string(),
                    });
                }
            }
            if !issues.is_empty() {
                return Err(KitprepError::ValidationFailure { issues });
            }
        }

        info!("{}: {} dependencies valid", spec.label(), deps.len());
        Ok(ValidationReport {
            mode: self.mode(),
            checked: deps.len(),
        })
    }
}

/// First structural problem in `deps`, if any
fn check_local(deps: &[DeclaredDependency]) -> Option<ValidationIssue> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(deps.len());

    for (index, dep) in deps.iter().enumerate() {
        if let Err(reason) = check_identifier(&dep.identifier) {
            return Some(ValidationIssue::Malformed {
                entry: dep.entry.clone(),
                reason,
            });
        }

        if let Some(ref version) = dep.version {
            if let Err(reason) = check_version(version) {
                return Some(ValidationIssue::Malformed {
                    entry: dep.entry.clone(),
                    reason,
                });
            }
        }

        if let Some(&first_index) = seen.get(dep.identifier.as_str()) {
            return Some(ValidationIssue::Duplicate {
                identifier: dep.identifier.clone(),
                first: deps[first_index].entry.clone(),
                first_index,
                second: dep.entry.clone(),
                second_index: index,
            });
        }
        seen.insert(&dep.identifier, index);
    }

    None
}

/// Identifiers are dot-separated lowercase segments, e.g. `omni.kit.window.file`
fn check_identifier(identifier: &str) -> Result<(), String> {
    if identifier.is_empty() {
        return Err("identifier is empty".to_string());
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(format!("identifier exceeds {} characters", MAX_IDENTIFIER_LEN));
    }
    if !identifier.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err("identifier must start with a lowercase letter".to_string());
    }
    if identifier.split('.').any(str::is_empty) {
        return Err("identifier has an empty segment (leading, trailing or doubled '.')".to_string());
    }
    if let Some(bad) = identifier
        .chars()
        .find(|&c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!("identifier contains invalid character '{}'", bad));
    }
    Ok(())
}

/// Pins accept anything Cargo-style requirements accept: `1.2.3`, `1.2`, `^1.2`
fn check_version(version: &str) -> Result<(), String> {
    if version.trim().is_empty() {
        return Err("version pin is empty".to_string());
    }
    semver::VersionReq::parse(version)
        .map(|_| ())
        .map_err(|e| format!("version pin '{}' is invalid: {}", version, e))
}
