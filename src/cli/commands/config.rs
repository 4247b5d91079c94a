//! Config command - show or edit settings
//!
//! `set` edits the TOML document in place with `toml_edit`, so comments and
//! key order in hand-written settings files survive.

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{KitprepError, KitprepResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;
use toml_edit::{Array, DocumentMut, Item};

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> KitprepResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            let path = if local {
                std::env::current_dir()
                    .map_err(|e| KitprepError::io("getting current directory", e))?
                    .join(LOCAL_CONFIG_FILE)
            } else {
                manager.path().to_path_buf()
            };

            set_in_file(&path, &key, &value).await?;

            let ctx = UiContext::detect();
            ui::step_ok(&ctx, &format!("Set {} = {} in {}", key, value, path.display()));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> KitprepResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> KitprepResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Settings already exist at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Settings initialized", &path.display().to_string());
    Ok(())
}

/// How a settings value is parsed from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Bool,
    Count,
    Mbps,
    /// Whitespace-separated program and arguments
    Command,
    SemVer,
    LogFormat,
}

fn value_kind(key: &str) -> Option<ValueKind> {
    let kind = match key {
        "general.log_format" => ValueKind::LogFormat,
        "general.event_log" => ValueKind::Bool,
        "sdk.version" => ValueKind::SemVer,
        "apps.root" | "apps.declaration_file" => ValueKind::Text,
        "cache.default_path" | "cache.isolated_root" => ValueKind::Text,
        "cache.ready_threshold" => ValueKind::Count,
        "estimate.size_bytes" => ValueKind::Count,
        "estimate.bandwidth_mbps" => ValueKind::Mbps,
        "prefetch.command" => ValueKind::Command,
        "prefetch.default_profile" => ValueKind::Text,
        "prefetch.status_update_every" | "prefetch.stderr_tail_lines" => ValueKind::Count,
        "registry.url" => ValueKind::Text,
        "registry.timeout_secs" => ValueKind::Count,
        _ => return None,
    };
    Some(kind)
}

const KEYS: &[&str] = &[
    "general.log_format",
    "general.event_log",
    "sdk.version",
    "apps.root",
    "apps.declaration_file",
    "cache.default_path",
    "cache.isolated_root",
    "cache.ready_threshold",
    "estimate.size_bytes",
    "estimate.bandwidth_mbps",
    "prefetch.command",
    "prefetch.default_profile",
    "prefetch.status_update_every",
    "prefetch.stderr_tail_lines",
    "registry.url",
    "registry.timeout_secs",
];

fn parse_item(kind: ValueKind, key: &str, value: &str) -> KitprepResult<Item> {
    let invalid = |expected: &str| {
        KitprepError::User(format!("Invalid value for {}: '{}' ({})", key, value, expected))
    };

    let item = match kind {
        ValueKind::Text => toml_edit::value(value),
        ValueKind::Bool => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => toml_edit::value(true),
            "false" | "0" | "no" => toml_edit::value(false),
            _ => return Err(invalid("expected true/false")),
        },
        ValueKind::Count => {
            let n: i64 = value
                .parse()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| invalid("expected a non-negative integer"))?;
            toml_edit::value(n)
        }
        ValueKind::Mbps => {
            let n: f64 = value
                .parse()
                .ok()
                .filter(|n: &f64| n.is_finite() && *n > 0.0)
                .ok_or_else(|| invalid("expected a positive number"))?;
            toml_edit::value(n)
        }
        ValueKind::Command => {
            let parts: Array = value.split_whitespace().collect();
            if parts.is_empty() {
                return Err(invalid("expected a program and optional arguments"));
            }
            toml_edit::value(parts)
        }
        ValueKind::SemVer => {
            semver::Version::parse(value).map_err(|_| invalid("expected a version like 106.5.0"))?;
            toml_edit::value(value)
        }
        ValueKind::LogFormat => match value {
            "text" | "json" => toml_edit::value(value),
            _ => return Err(invalid("expected text or json")),
        },
    };
    Ok(item)
}

/// Set `key` in the TOML file at `path`, creating the file if needed.
///
/// The edited document must still load as settings before it is written.
async fn set_in_file(path: &Path, key: &str, value: &str) -> KitprepResult<()> {
    let kind = value_kind(key).ok_or_else(|| {
        KitprepError::User(format!(
            "Unknown config key: {}. Valid keys: {}",
            key,
            KEYS.join(", ")
        ))
    })?;
    let item = parse_item(kind, key, value)?;

    let mut doc = if path.exists() {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| KitprepError::io(format!("reading {}", path.display()), e))?;
        content
            .parse::<DocumentMut>()
            .map_err(|e| KitprepError::config(path, e.to_string()))?
    } else {
        DocumentMut::new()
    };

    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| KitprepError::Internal(format!("config key without section: {}", key)))?;
    doc.entry(section)
        .or_insert(toml_edit::table())
        .as_table_like_mut()
        .ok_or_else(|| KitprepError::config(path, format!("'{}' is not a table", section)))?
        .insert(leaf, item);

    let content = doc.to_string();
    toml::from_str::<Config>(&content).map_err(|e| KitprepError::config(path, e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| KitprepError::ConfigDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| KitprepError::io(format!("writing {}", path.display()), e))
}
