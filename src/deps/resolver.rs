//! Dependency spec resolution
//!
//! Resolves an application identifier to a `DependencySpec` by reading its
//! declaration file, falling back to the process-wide defaults.

use crate::cache::normalize_path;
use crate::config::Config;
use crate::deps::{CacheStrategy, Declaration, DependencySpec, Scope};
use crate::error::{KitprepError, KitprepResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name of an isolated cache inside `<isolated_root>/<app>/`
const ISOLATED_CACHE_DIR: &str = "extscache";

/// Process-wide defaults the resolver falls back to
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub default_sdk_version: semver::Version,
    pub default_cache_path: PathBuf,
    pub isolated_root: PathBuf,
}

impl ResolverSettings {
    /// Build from loaded settings
    pub fn from_config(config: &Config) -> KitprepResult<Self> {
        let default_sdk_version = semver::Version::parse(&config.sdk.version).map_err(|e| {
            KitprepError::config(
                "config.toml",
                format!("sdk.version '{}' is not a semantic version: {}", config.sdk.version, e),
            )
        })?;

        Ok(Self {
            default_sdk_version,
            default_cache_path: config.cache.default_path.clone(),
            isolated_root: config.cache.isolated_root.clone(),
        })
    }
}

/// Resolves per-application dependency configuration
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    settings: ResolverSettings,
}

impl ConfigResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self { settings }
    }

    /// The process-wide default spec
    pub fn default_spec(&self) -> DependencySpec {
        DependencySpec::global(
            self.settings.default_sdk_version.clone(),
            self.settings.default_cache_path.clone(),
        )
    }

    /// Resolve an application from its candidate declaration file.
    ///
    /// A missing file is not an error: the app gets the global defaults.
    pub async fn resolve(&self, app_id: &str, declaration_path: &Path) -> KitprepResult<DependencySpec> {
        validate_app_id(app_id)?;

        let exists = tokio::fs::try_exists(declaration_path).await.map_err(|e| {
            KitprepError::io(
                format!("checking declaration {}", declaration_path.display()),
                e,
            )
        })?;

        if !exists {
            debug!(
                "No declaration at {}, using global defaults for {}",
                declaration_path.display(),
                app_id
            );
            let mut spec = self.default_spec();
            spec.app = Some(app_id.to_string());
            return Ok(spec);
        }

        let declaration = Declaration::from_file(declaration_path).await?;
        self.resolve_declaration(app_id, declaration, declaration_path)
    }

    /// Turn an already-parsed declaration into a spec
    pub fn resolve_declaration(
        &self,
        app_id: &str,
        declaration: Declaration,
        declaration_path: &Path,
    ) -> KitprepResult<DependencySpec> {
        let cache_strategy = declaration.cache_strategy.unwrap_or_default();

        let (scope, cache_path) = match cache_strategy {
            CacheStrategy::Shared => {
                if let Some(ref path) = declaration.cache_path {
                    warn!(
                        "{}: cache.path {} ignored for shared strategy",
                        app_id,
                        path.display()
                    );
                }
                (Scope::Global, self.settings.default_cache_path.clone())
            }
            CacheStrategy::Isolated => {
                let path = match declaration.cache_path {
                    Some(path) if path.is_relative() => declaration_path
                        .parent()
                        .map(|dir| dir.join(&path))
                        .unwrap_or(path),
                    Some(path) => path,
                    None => self
                        .settings
                        .isolated_root
                        .join(app_id)
                        .join(ISOLATED_CACHE_DIR),
                };

                if normalize_path(&path) == normalize_path(&self.settings.default_cache_path) {
                    return Err(KitprepError::config(
                        declaration_path,
                        format!(
                            "isolated cache path {} is the shared default cache",
                            path.display()
                        ),
                    ));
                }
                (Scope::Isolated, path)
            }
        };

        let sdk_version = declaration
            .sdk_version
            .unwrap_or_else(|| self.settings.default_sdk_version.clone());

        debug!(
            "Resolved {}: scope={} sdk={} cache={}",
            app_id,
            scope,
            sdk_version,
            cache_path.display()
        );

        Ok(DependencySpec {
            app: Some(app_id.to_string()),
            scope,
            sdk_version,
            cache_strategy,
            cache_path,
            declared_dependencies: declaration.dependencies,
        })
    }
}

/// App identifiers become path components, so keep them to a safe alphabet.
fn validate_app_id(app_id: &str) -> KitprepResult<()> {
    if app_id.is_empty() {
        return Err(KitprepError::User("Application id cannot be empty".to_string()));
    }
    if app_id.contains("..")
        || !app_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(KitprepError::User(format!(
            "Invalid application id '{}': use alphanumerics, '.', '-' or '_'",
            app_id
        )));
    }
    Ok(())
}
