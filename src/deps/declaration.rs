//! Declaration file parsing
//!
//! Parsed with `toml_edit` rather than serde so the `[dependencies]` table
//! keeps the order it was written in.

use crate::deps::CacheStrategy;
use crate::error::{KitprepError, KitprepResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item};
use tracing::debug;

/// One `[dependencies]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredDependency {
    /// Key exactly as written in the declaration
    pub entry: String,
    /// Extension name with any `-<version>` suffix removed
    pub identifier: String,
    /// Pinned version, if any
    pub version: Option<String>,
}

impl DeclaredDependency {
    /// Unpinned dependency
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            entry: identifier.clone(),
            identifier,
            version: None,
        }
    }

    /// Dependency pinned to a version
    pub fn pinned(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::new(identifier)
        }
    }

    /// Parse a key that may carry a Kit-style pin, e.g. `omni.usd-1.10.4`.
    ///
    /// Splits at the first `-` whose remainder reads as a version, so
    /// `omni.kit.viewport-2d` stays one unpinned name.
    pub fn from_entry(entry: &str) -> Self {
        let split = entry
            .match_indices('-')
            .map(|(i, _)| i)
            .find(|&i| looks_like_version(&entry[i + 1..]));

        match split {
            Some(i) => Self {
                entry: entry.to_string(),
                identifier: entry[..i].to_string(),
                version: Some(entry[i + 1..].to_string()),
            },
            None => Self::new(entry),
        }
    }
}

/// Full semver, or dotted numbers such as `1.2`
fn looks_like_version(suffix: &str) -> bool {
    if semver::Version::parse(suffix).is_ok() {
        return true;
    }
    let mut parts = suffix.split('.');
    let numeric = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    parts.clone().count() >= 2 && parts.all(numeric)
}

impl fmt::Display for DeclaredDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) if self.entry == self.identifier => write!(f, "{} = \"{}\"", self.entry, v),
            _ => write!(f, "{}", self.entry),
        }
    }
}

/// Contents of one application's `dependencies.toml`
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    /// `[kit_sdk] version`
    pub sdk_version: Option<semver::Version>,
    /// `[cache] strategy`
    pub cache_strategy: Option<CacheStrategy>,
    /// `[cache] path`
    pub cache_path: Option<PathBuf>,
    /// `[dependencies]`, in declaration order
    pub dependencies: Vec<DeclaredDependency>,
}

impl Declaration {
    /// Read and parse a declaration file
    pub async fn from_file(path: &Path) -> KitprepResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            KitprepError::io(format!("reading declaration {}", path.display()), e)
        })?;
        Self::parse(&content, path)
    }

    /// Parse declaration content; `path` is only used for error context
    pub fn parse(content: &str, path: &Path) -> KitprepResult<Self> {
        let doc: DocumentMut = content
            .parse()
            .map_err(|e: toml_edit::TomlError| KitprepError::config(path, e.to_string()))?;

        let mut declaration = Self::default();

        if let Some(version) = section_str(&doc, "kit_sdk", "version", path)? {
            let parsed = semver::Version::parse(version).map_err(|e| {
                KitprepError::config(
                    path,
                    format!("kit_sdk.version '{}' is not a semantic version: {}", version, e),
                )
            })?;
            declaration.sdk_version = Some(parsed);
        }

        if let Some(strategy) = section_str(&doc, "cache", "strategy", path)? {
            let parsed = CacheStrategy::from_value(strategy).ok_or_else(|| {
                KitprepError::config(
                    path,
                    format!(
                        "cache.strategy must be \"shared\" or \"isolated\", got '{}'",
                        strategy
                    ),
                )
            })?;
            declaration.cache_strategy = Some(parsed);
        }

        declaration.cache_path = section_str(&doc, "cache", "path", path)?.map(PathBuf::from);

        if let Some(item) = doc.get("dependencies") {
            let table = item
                .as_table_like()
                .ok_or_else(|| KitprepError::config(path, "[dependencies] must be a table"))?;

            for (key, value) in table.iter() {
                if let Some(dep) = parse_dependency(key, value, path)? {
                    declaration.dependencies.push(dep);
                }
            }
        }

        debug!(
            "Parsed declaration {}: {} dependencies",
            path.display(),
            declaration.dependencies.len()
        );
        Ok(declaration)
    }
}

/// Look up `[section] key` as a string, erroring on the wrong shape
fn section_str<'a>(
    doc: &'a DocumentMut,
    section: &str,
    key: &str,
    path: &Path,
) -> KitprepResult<Option<&'a str>> {
    let Some(item) = doc.get(section) else {
        return Ok(None);
    };
    let table = item
        .as_table_like()
        .ok_or_else(|| KitprepError::config(path, format!("[{}] must be a table", section)))?;

    match table.get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or_else(|| {
            KitprepError::config(path, format!("{}.{} must be a string", section, key))
        }),
    }
}

/// Accepts `{}`, `true`, `"1.2.3"`, `{ version = "1.2.3" }`; `false` disables the entry.
fn parse_dependency(
    key: &str,
    value: &Item,
    path: &Path,
) -> KitprepResult<Option<DeclaredDependency>> {
    let mut dep = DeclaredDependency::from_entry(key);

    let value_version = if let Some(enabled) = value.as_bool() {
        if !enabled {
            debug!("Skipping disabled dependency {}", key);
            return Ok(None);
        }
        None
    } else if let Some(version) = value.as_str() {
        Some(version.to_string())
    } else if let Some(table) = value.as_table_like() {
        match table.get("version") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| {
                        KitprepError::config(
                            path,
                            format!("dependencies.\"{}\".version must be a string", key),
                        )
                    })?
                    .to_string(),
            ),
        }
    } else {
        return Err(KitprepError::config(
            path,
            format!(
                "dependencies.\"{}\" must be a table, a version string, or a boolean",
                key
            ),
        ));
    };

    if let Some(version) = value_version {
        if dep.version.is_some() {
            return Err(KitprepError::config(
                path,
                format!("dependency '{}' pins its version twice", key),
            ));
        }
        dep.version = Some(version);
    }

    Ok(Some(dep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> KitprepResult<Declaration> {
        Declaration::parse(content, Path::new("dependencies.toml"))
    }

    #[test]
    fn entry_with_kit_style_pin() {
        let dep = DeclaredDependency::from_entry("omni.usd-1.10.4");
        assert_eq!(dep.identifier, "omni.usd");
        assert_eq!(dep.version.as_deref(), Some("1.10.4"));
        assert_eq!(dep.entry, "omni.usd-1.10.4");
    }

    #[test]
    fn entry_with_hyphenated_name() {
        let dep = DeclaredDependency::from_entry("omni.kit-tools");
        assert_eq!(dep.identifier, "omni.kit-tools");
        assert!(dep.version.is_none());
    }

    #[test]
    fn digit_led_name_suffix_is_not_a_pin() {
        let dep = DeclaredDependency::from_entry("omni.kit.viewport-2d");
        assert_eq!(dep.identifier, "omni.kit.viewport-2d");
        assert!(dep.version.is_none());

        let dep = DeclaredDependency::from_entry("omni.kit.viewport-2d-1.0.3");
        assert_eq!(dep.identifier, "omni.kit.viewport-2d");
        assert_eq!(dep.version.as_deref(), Some("1.0.3"));
    }

    #[test]
    fn short_and_prerelease_pins_split() {
        let dep = DeclaredDependency::from_entry("omni.usd-1.10");
        assert_eq!(dep.identifier, "omni.usd");
        assert_eq!(dep.version.as_deref(), Some("1.10"));

        let dep = DeclaredDependency::from_entry("omni.usd-1.10.4-rc.1");
        assert_eq!(dep.identifier, "omni.usd");
        assert_eq!(dep.version.as_deref(), Some("1.10.4-rc.1"));
    }

    #[test]
    fn parse_full_declaration() {
        let decl = parse(
            r#"
[kit_sdk]
version = "106.5.0"

[cache]
strategy = "isolated"

[dependencies]
"omni.kit.uiapp" = {}
"omni.kit.window.file" = "1.3.2"
"omni.ui" = { version = "2.1.0" }
"omni.usd-1.10.4" = {}
"omni.kit.debug" = false
"#,
        )
        .unwrap();

        assert_eq!(decl.sdk_version, Some(semver::Version::new(106, 5, 0)));
        assert_eq!(decl.cache_strategy, Some(CacheStrategy::Isolated));

        let ids: Vec<&str> = decl
            .dependencies
            .iter()
            .map(|d| d.identifier.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["omni.kit.uiapp", "omni.kit.window.file", "omni.ui", "omni.usd"]
        );
        assert_eq!(decl.dependencies[1].version.as_deref(), Some("1.3.2"));
        assert_eq!(decl.dependencies[2].version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn order_is_preserved() {
        let decl = parse("[dependencies]\nzeta = {}\nalpha = {}\nmid = {}\n").unwrap();
        let ids: Vec<&str> = decl
            .dependencies
            .iter()
            .map(|d| d.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn missing_sections_are_empty() {
        let decl = parse("").unwrap();
        assert!(decl.sdk_version.is_none());
        assert!(decl.cache_strategy.is_none());
        assert!(decl.dependencies.is_empty());
    }

    #[test]
    fn unparsable_document_errors() {
        let err = parse("[kit_sdk\nversion = ").unwrap_err();
        assert!(matches!(err, KitprepError::ConfigInvalid { .. }));
    }

    #[test]
    fn bad_sdk_version_errors() {
        let err = parse("[kit_sdk]\nversion = \"latest\"\n").unwrap_err();
        assert!(err.to_string().contains("kit_sdk.version"));
    }

    #[test]
    fn unknown_strategy_errors() {
        let err = parse("[cache]\nstrategy = \"private\"\n").unwrap_err();
        assert!(err.to_string().contains("cache.strategy"));
    }

    #[test]
    fn double_pin_errors() {
        let err = parse("[dependencies]\n\"omni.ui-2.0.0\" = \"2.1.0\"\n").unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn non_table_dependencies_errors() {
        let err = parse("dependencies = [\"omni.ui\"]\n").unwrap_err();
        assert!(err.to_string().contains("[dependencies] must be a table"));
    }
}
