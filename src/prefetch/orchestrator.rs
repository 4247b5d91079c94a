//! Prefetch orchestration
//!
//! Decides whether a cache needs fetching and, if so, runs the external fetch
//! command on its own task. At most one job per cache path runs at a time;
//! in-flight tracking is in memory only and released when the job task ends.

use crate::cache::{normalize_path, CacheState, CacheStateDetector};
use crate::config::schema::PrefetchConfig;
use crate::deps::DependencySpec;
use crate::error::{KitprepError, KitprepResult};
use crate::events::{EventLog, PrefetchEvent};
use crate::prefetch::cancel::{cancel_pair, CancelHandle, CancelToken};
use crate::prefetch::job::{PrefetchCommand, PrefetchJob, PrefetchStatus};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Environment variable carrying the target cache path to the fetch process
pub const ENV_CACHE_PATH: &str = "KITPREP_CACHE_PATH";
/// Environment variable carrying the application id, when there is one
pub const ENV_APP: &str = "KITPREP_APP";
/// Environment variable carrying the resolved SDK version
pub const ENV_SDK_VERSION: &str = "KIT_SDK_VERSION";

/// How the external fetch is invoked
#[derive(Debug, Clone)]
pub struct PrefetchSettings {
    /// Program followed by leading arguments
    pub command: Vec<String>,
    pub status_update_every: u64,
    pub stderr_tail_lines: usize,
}

impl From<&PrefetchConfig> for PrefetchSettings {
    fn from(config: &PrefetchConfig) -> Self {
        Self {
            command: config.command.clone(),
            status_update_every: config.status_update_every,
            stderr_tail_lines: config.stderr_tail_lines,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct PrefetchRequest {
    /// Passed as `--config <profile>`
    pub profile: String,
    /// Pass `-v` to the fetch process
    pub verbose: bool,
    /// Fetch even if the cache is already ready
    pub force: bool,
}

/// Result of a prefetch that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum PrefetchOutcome {
    /// Cache was already ready; nothing ran
    Skipped { state: CacheState },
    /// Fetch process exited with code 0
    Completed {
        job_id: Uuid,
        exit_code: i32,
        lines_emitted: u64,
        state: CacheState,
    },
}

/// What `spawn` did
pub enum PrefetchStart {
    Skipped(CacheState),
    Running(PrefetchHandle),
}

/// Handle to a job running on its own task
pub struct PrefetchHandle {
    job_id: Uuid,
    cache_path: PathBuf,
    statuses: mpsc::UnboundedReceiver<PrefetchStatus>,
    cancel: CancelHandle,
    task: JoinHandle<KitprepResult<PrefetchOutcome>>,
}

impl PrefetchHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Ask the job to terminate its child; `wait` then yields `PrefetchCancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Next coalesced status; `None` once the job has finished
    pub async fn next_status(&mut self) -> Option<PrefetchStatus> {
        self.statuses.recv().await
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> KitprepResult<PrefetchOutcome> {
        self.task
            .await
            .map_err(|e| KitprepError::Internal(format!("prefetch task failed: {}", e)))?
    }
}

type InFlight = Arc<Mutex<HashSet<PathBuf>>>;

/// Marks a cache path busy until dropped
struct InFlightGuard {
    registry: InFlight,
    key: PathBuf,
}

impl InFlightGuard {
    fn acquire(registry: &InFlight, cache_path: &Path) -> KitprepResult<Self> {
        let key = in_flight_key(cache_path);
        let mut busy = registry.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(key.clone()) {
            return Err(KitprepError::PrefetchAlreadyRunning {
                cache_path: cache_path.to_path_buf(),
            });
        }
        Ok(Self {
            registry: Arc::clone(registry),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut busy = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        busy.remove(&self.key);
    }
}

/// `viewer/../extscache` and a symlink to `extscache` are the same cache
fn in_flight_key(cache_path: &Path) -> PathBuf {
    normalize_path(cache_path)
}

/// Schedules prefetch jobs; cheap to clone and share between requests
#[derive(Clone)]
pub struct PrefetchOrchestrator {
    detector: CacheStateDetector,
    settings: Arc<PrefetchSettings>,
    in_flight: InFlight,
    events: EventLog,
}

impl PrefetchOrchestrator {
    pub fn new(detector: CacheStateDetector, settings: PrefetchSettings) -> Self {
        Self {
            detector,
            settings: Arc::new(settings),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            events: EventLog::disabled(),
        }
    }

    /// Record job lifecycle events
    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Whether a job currently holds `cache_path`
    pub fn is_running(&self, cache_path: &Path) -> bool {
        let busy = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        busy.contains(&in_flight_key(cache_path))
    }

    /// Whether `spec` needs a fetch right now
    pub async fn needs_fetch(&self, spec: &DependencySpec, force: bool) -> (bool, CacheState) {
        let state = self.detector.detect(&spec.cache_path).await;
        (force || !state.is_ready, state)
    }

    /// Start a prefetch for `spec` unless its cache is ready.
    ///
    /// Rejects with `PrefetchAlreadyRunning` if another job holds the same
    /// cache path.
    pub async fn spawn(
        &self,
        spec: &DependencySpec,
        request: PrefetchRequest,
    ) -> KitprepResult<PrefetchStart> {
        let guard = InFlightGuard::acquire(&self.in_flight, &spec.cache_path)?;

        let (needed, state) = self.needs_fetch(spec, request.force).await;
        if !needed {
            info!(
                "{}: cache ready ({} entries), skipping prefetch",
                spec.label(),
                state.extension_count
            );
            return Ok(PrefetchStart::Skipped(state));
        }

        let mut command =
            PrefetchCommand::build(&self.settings.command, &request.profile, request.verbose)?
                .with_env(ENV_CACHE_PATH, spec.cache_path.to_string_lossy())
                .with_env(ENV_SDK_VERSION, spec.sdk_version.to_string());
        if let Some(ref app) = spec.app {
            command = command.with_env(ENV_APP, app.as_str());
        }

        let job = PrefetchJob::new(
            spec.cache_path.clone(),
            command,
            self.settings.status_update_every,
            self.settings.stderr_tail_lines,
        );
        let job_id = job.id;

        info!(
            "{}: starting prefetch {} ({} of {} entries): {}",
            spec.label(),
            job_id,
            state.extension_count,
            state.threshold,
            job.command.display()
        );

        let (status_tx, statuses) = mpsc::unbounded_channel();
        let (cancel, token) = cancel_pair();
        let detector = self.detector;
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            execute(job, detector, status_tx, token, events).await
        });

        Ok(PrefetchStart::Running(PrefetchHandle {
            job_id,
            cache_path: spec.cache_path.clone(),
            statuses,
            cancel,
            task,
        }))
    }

    /// Prefetch and wait, forwarding each status update to `on_status`
    pub async fn run<F>(
        &self,
        spec: &DependencySpec,
        request: PrefetchRequest,
        mut on_status: F,
    ) -> KitprepResult<PrefetchOutcome>
    where
        F: FnMut(&PrefetchStatus),
    {
        match self.spawn(spec, request).await? {
            PrefetchStart::Skipped(state) => Ok(PrefetchOutcome::Skipped { state }),
            PrefetchStart::Running(mut handle) => {
                while let Some(status) = handle.next_status().await {
                    on_status(&status);
                }
                handle.wait().await
            }
        }
    }
}

async fn execute(
    mut job: PrefetchJob,
    detector: CacheStateDetector,
    statuses: mpsc::UnboundedSender<PrefetchStatus>,
    mut cancel: CancelToken,
    events: EventLog,
) -> KitprepResult<PrefetchOutcome> {
    let command_line = job.command.display();
    let mut child = match job.command.to_command().spawn() {
        Ok(child) => child,
        Err(e) => {
            events
                .record(&PrefetchEvent::Failed {
                    job_id: job.id,
                    exit_code: None,
                    lines_emitted: 0,
                    reason: e.to_string(),
                })
                .await;
            return Err(KitprepError::command_failed(command_line, e));
        }
    };
    events
        .record(&PrefetchEvent::Started {
            job_id: job.id,
            cache_path: job.cache_path.clone(),
            command: command_line.clone(),
        })
        .await;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| KitprepError::Internal("prefetch stdout not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| KitprepError::Internal("prefetch stderr not piped".to_string()))?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            _ = cancel.cancelled() => {
                return cancelled(&mut child, &job, &events).await;
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        debug!("[prefetch] {}", line);
                        if let Some(status) = job.observe_line(&line) {
                            // Receiver may be gone if the caller stopped listening
                            let _ = statuses.send(status);
                        }
                    }
                    _ => stdout_done = true,
                }
            }
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        debug!("[prefetch:stderr] {}", line);
                        job.observe_stderr(line);
                    }
                    _ => stderr_done = true,
                }
            }
        }
    }

    let status = tokio::select! {
        _ = cancel.cancelled() => None,
        status = child.wait() => Some(status),
    };
    let Some(status) = status else {
        return cancelled(&mut child, &job, &events).await;
    };
    let status = status.map_err(|e| KitprepError::command_failed(command_line.clone(), e))?;

    let exit_code = status.code().unwrap_or(-1);
    job.exit_code = Some(exit_code);

    if exit_code != 0 {
        let stderr = job.stderr_tail();
        warn!("Prefetch {} exited with code {}", job.id, exit_code);
        events
            .record(&PrefetchEvent::Failed {
                job_id: job.id,
                exit_code: Some(exit_code),
                lines_emitted: job.lines_emitted,
                reason: format!("exited with code {}", exit_code),
            })
            .await;
        return Err(KitprepError::PrefetchFailed { exit_code, stderr });
    }

    let state = detector.detect(&job.cache_path).await;
    info!(
        "Prefetch {} finished: {} lines, cache now {} ({} entries)",
        job.id,
        job.lines_emitted,
        state.readiness(),
        state.extension_count
    );
    events
        .record(&PrefetchEvent::Completed {
            job_id: job.id,
            lines_emitted: job.lines_emitted,
            extension_count: state.extension_count,
            ready: state.is_ready,
        })
        .await;

    Ok(PrefetchOutcome::Completed {
        job_id: job.id,
        exit_code,
        lines_emitted: job.lines_emitted,
        state,
    })
}

async fn cancelled(
    child: &mut Child,
    job: &PrefetchJob,
    events: &EventLog,
) -> KitprepResult<PrefetchOutcome> {
    info!("Cancelling prefetch {}", job.id);
    if let Err(e) = child.start_kill() {
        warn!("Failed to signal prefetch {}: {}", job.id, e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap prefetch {}: {}", job.id, e);
    }

    events
        .record(&PrefetchEvent::Cancelled {
            job_id: job.id,
            lines_emitted: job.lines_emitted,
        })
        .await;

    Err(KitprepError::PrefetchCancelled {
        cache_path: job.cache_path.clone(),
    })
}
