//! Prefetch lifecycle journal
//!
//! Every job that starts ends in exactly one of `prefetch.completed`,
//! `prefetch.failed` or `prefetch.cancelled`. A fetch program that cannot be
//! spawned is recorded as `prefetch.failed` without a preceding start.
//!
//! Lines are flat JSON objects, for example:
//!
//! ```text
//! {"timestamp":"2026-10-19T08:12:03Z","event":"prefetch.started","job_id":"…","cache_path":"/data/extscache","command":"./repo.sh --prefetch --config release"}
//! ```

use crate::config::{schema::Config, ConfigManager};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// A prefetch job transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum PrefetchEvent {
    /// Fetch process is running
    #[serde(rename = "prefetch.started")]
    Started {
        job_id: Uuid,
        cache_path: PathBuf,
        command: String,
    },
    #[serde(rename = "prefetch.completed")]
    Completed {
        job_id: Uuid,
        lines_emitted: u64,
        extension_count: usize,
        ready: bool,
    },
    /// Nonzero exit, or the program never started (`exit_code` absent)
    #[serde(rename = "prefetch.failed")]
    Failed {
        job_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        lines_emitted: u64,
        reason: String,
    },
    #[serde(rename = "prefetch.cancelled")]
    Cancelled { job_id: Uuid, lines_emitted: u64 },
}

impl PrefetchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "prefetch.started",
            Self::Completed { .. } => "prefetch.completed",
            Self::Failed { .. } => "prefetch.failed",
            Self::Cancelled { .. } => "prefetch.cancelled",
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Started { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id, .. } => *job_id,
        }
    }
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a PrefetchEvent,
}

fn encode(event: &PrefetchEvent, at: DateTime<Utc>) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&Line {
        timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        event,
    })?;
    line.push('\n');
    Ok(line)
}

/// Append-only journal of prefetch events; a no-op when disabled
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Journal at the state-dir location, if `general.event_log` is on
    pub fn new(config: &Config) -> Self {
        if config.general.event_log {
            Self::at(ConfigManager::event_log_path())
        } else {
            Self::disabled()
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append `event`. Write failures are logged and swallowed.
    pub async fn record(&self, event: &PrefetchEvent) {
        let Some(ref path) = self.path else {
            return;
        };

        let result = match encode(event, Utc::now()) {
            Ok(line) => append(path, &line).await,
            Err(e) => {
                warn!("Cannot encode {} for job {}: {}", event.name(), event.job_id(), e);
                return;
            }
        };
        if let Err(e) = result {
            warn!(
                "Cannot record {} in {}: {}",
                event.name(),
                path.display(),
                e
            );
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn started(job_id: Uuid) -> PrefetchEvent {
        PrefetchEvent::Started {
            job_id,
            cache_path: PathBuf::from("/data/extscache"),
            command: "./repo.sh --prefetch --config release".to_string(),
        }
    }

    #[test]
    fn lines_are_flat_and_tagged() {
        let job_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 12, 3).unwrap();

        let line = encode(&started(job_id), at).unwrap();
        assert!(line.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed["timestamp"], "2026-10-19T08:12:03Z");
        assert_eq!(parsed["event"], "prefetch.started");
        assert_eq!(parsed["job_id"], job_id.to_string());
        assert_eq!(parsed["cache_path"], "/data/extscache");
    }

    #[test]
    fn spawn_failure_has_no_exit_code() {
        let event = PrefetchEvent::Failed {
            job_id: Uuid::new_v4(),
            exit_code: None,
            lines_emitted: 0,
            reason: "No such file or directory".to_string(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(encode(&event, Utc::now()).unwrap().trim()).unwrap();

        assert_eq!(parsed["event"], event.name());
        assert!(parsed.get("exit_code").is_none());
        assert_eq!(parsed["reason"], "No such file or directory");
    }

    #[tokio::test]
    async fn record_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("events.log");
        let events = EventLog::at(path.clone());
        let job_id = Uuid::new_v4();

        events.record(&started(job_id)).await;
        events
            .record(&PrefetchEvent::Cancelled {
                job_id,
                lines_emitted: 4,
            })
            .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let names: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["event"].to_string())
            .collect();
        assert_eq!(names, vec!["\"prefetch.started\"", "\"prefetch.cancelled\""]);
    }

    #[tokio::test]
    async fn disabled_in_settings() {
        let mut config = Config::default();
        config.general.event_log = false;

        let events = EventLog::new(&config);
        assert!(events.path().is_none());
        events.record(&started(Uuid::new_v4())).await;
    }
}
