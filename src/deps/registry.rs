//! Extension registry lookups
//!
//! Only used by the registry-checking validation mode. Lookups go over the
//! network and are never made implicitly.

use crate::config::schema::RegistryConfig;
use crate::deps::DeclaredDependency;
use crate::error::{KitprepError, KitprepResult};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Something that can answer "does this extension exist?"
#[async_trait]
pub trait Registry: Send + Sync {
    /// Whether the dependency resolves in the registry
    async fn contains(&self, dependency: &DeclaredDependency) -> KitprepResult<bool>;

    /// Human-readable location for messages
    fn location(&self) -> &str;
}

/// Registry reachable over HTTP at `{base_url}/{identifier}[-{version}]`
pub struct HttpRegistry {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url_for(&self, dependency: &DeclaredDependency) -> String {
        match &dependency.version {
            Some(version) => format!("{}/{}-{}", self.base_url, dependency.identifier, version),
            None => format!("{}/{}", self.base_url, dependency.identifier),
        }
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn contains(&self, dependency: &DeclaredDependency) -> KitprepResult<bool> {
        let url = self.url_for(dependency);
        let agent = self.agent.clone();
        debug!("Registry lookup: {}", url);

        let lookup_url = url.clone();
        let status = tokio::task::spawn_blocking(move || {
            agent
                .head(&lookup_url)
                .call()
                .map(|response| response.status().as_u16())
        })
        .await
        .map_err(|e| KitprepError::Internal(format!("registry lookup task failed: {}", e)))?
        .map_err(|e| KitprepError::Registry {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        match status {
            200..=299 => Ok(true),
            404 | 410 => Ok(false),
            other => Err(KitprepError::Registry {
                url,
                reason: format!("unexpected HTTP status {}", other),
            }),
        }
    }

    fn location(&self) -> &str {
        &self.base_url
    }
}

/// Fixed set of known identifiers, e.g. a mirrored index
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    known: HashSet<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn contains(&self, dependency: &DeclaredDependency) -> KitprepResult<bool> {
        Ok(self.known.contains(&dependency.identifier))
    }

    fn location(&self) -> &str {
        "static index"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_registry_builds_urls() {
        let registry = HttpRegistry::new(&RegistryConfig {
            url: "https://registry.example.com/exts/".to_string(),
            timeout_secs: 1,
        });

        assert_eq!(
            registry.url_for(&DeclaredDependency::new("omni.ui")),
            "https://registry.example.com/exts/omni.ui"
        );
        assert_eq!(
            registry.url_for(&DeclaredDependency::pinned("omni.usd", "1.10.4")),
            "https://registry.example.com/exts/omni.usd-1.10.4"
        );
        assert_eq!(registry.location(), "https://registry.example.com/exts");
    }

    #[tokio::test]
    async fn static_registry_lookup() {
        let registry = StaticRegistry::new(["omni.ui", "omni.usd"]);
        assert!(registry
            .contains(&DeclaredDependency::new("omni.ui"))
            .await
            .unwrap());
        assert!(!registry
            .contains(&DeclaredDependency::new("omni.missing"))
            .await
            .unwrap());
    }
}
