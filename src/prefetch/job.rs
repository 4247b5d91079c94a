//! Prefetch job bookkeeping
//!
//! A job owns the command it runs and the counters used to coalesce output
//! lines into periodic status updates.

use crate::error::{KitprepError, KitprepResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use uuid::Uuid;

/// External fetch invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl PrefetchCommand {
    /// Build `<base...> --prefetch --config <profile> [-v]`.
    ///
    /// `base` is the configured program followed by its leading arguments.
    pub fn build(base: &[String], profile: &str, verbose: bool) -> KitprepResult<Self> {
        let (program, leading) = base.split_first().ok_or_else(|| {
            KitprepError::User("prefetch.command is empty; set it to the fetch script".to_string())
        })?;

        let mut args = leading.to_vec();
        args.push("--prefetch".to_string());
        args.push("--config".to_string());
        args.push(profile.to_string());
        if verbose {
            args.push("-v".to_string());
        }

        Ok(Self {
            program: program.clone(),
            args,
            env: Vec::new(),
        })
    }

    /// Add an environment variable for the child
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Coalesced progress report surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefetchStatus {
    pub job_id: Uuid,
    /// Output lines seen so far
    pub lines_emitted: u64,
    /// Most recent output line
    pub last_line: String,
}

/// A running prefetch
#[derive(Debug)]
pub struct PrefetchJob {
    pub id: Uuid,
    pub cache_path: PathBuf,
    pub command: PrefetchCommand,
    pub lines_emitted: u64,
    /// Line count at which the last status update went out
    pub last_status_emitted_at: u64,
    /// `None` while running
    pub exit_code: Option<i32>,
    status_every: u64,
    stderr_tail: VecDeque<String>,
    stderr_tail_lines: usize,
}

impl PrefetchJob {
    pub fn new(
        cache_path: PathBuf,
        command: PrefetchCommand,
        status_every: u64,
        stderr_tail_lines: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cache_path,
            command,
            lines_emitted: 0,
            last_status_emitted_at: 0,
            exit_code: None,
            status_every: status_every.max(1),
            stderr_tail: VecDeque::with_capacity(stderr_tail_lines),
            stderr_tail_lines,
        }
    }

    /// Count a stdout line; returns a status every `status_every` lines
    pub fn observe_line(&mut self, line: &str) -> Option<PrefetchStatus> {
        self.lines_emitted += 1;
        if self.lines_emitted - self.last_status_emitted_at < self.status_every {
            return None;
        }

        self.last_status_emitted_at = self.lines_emitted;
        Some(PrefetchStatus {
            job_id: self.id,
            lines_emitted: self.lines_emitted,
            last_line: line.to_string(),
        })
    }

    /// Keep the last few stderr lines for failure reports
    pub fn observe_stderr(&mut self, line: String) {
        if self.stderr_tail_lines == 0 {
            return;
        }
        if self.stderr_tail.len() == self.stderr_tail_lines {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line);
    }

    pub fn stderr_tail(&self) -> String {
        self.stderr_tail
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
