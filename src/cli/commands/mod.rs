//! CLI command implementations

pub mod config;
pub mod estimate;
pub mod prefetch;
pub mod status;
pub mod validate;

pub use config::execute as config;
pub use estimate::execute as estimate;
pub use prefetch::execute as prefetch;
pub use status::execute as status;
pub use validate::execute as validate;

use crate::config::Config;
use crate::deps::{ConfigResolver, DependencySpec, ResolverSettings};
use crate::error::KitprepResult;

/// Resolve `--app` to a spec, or the global default spec without it
pub(crate) async fn resolve_spec(app: Option<&str>, config: &Config) -> KitprepResult<DependencySpec> {
    let resolver = ConfigResolver::new(ResolverSettings::from_config(config)?);
    match app {
        Some(app_id) => {
            resolver
                .resolve(app_id, &config.apps.declaration_path(app_id))
                .await
        }
        None => Ok(resolver.default_spec()),
    }
}
