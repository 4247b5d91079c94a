//! Prefetch command - populate the extension cache before first launch

use crate::cache::{format_bytes, format_duration, CacheStateDetector, DownloadEstimator};
use crate::cli::args::PrefetchArgs;
use crate::cli::commands::resolve_spec;
use crate::config::Config;
use crate::error::KitprepResult;
use crate::events::EventLog;
use crate::prefetch::{
    PrefetchOrchestrator, PrefetchOutcome, PrefetchRequest, PrefetchSettings, PrefetchStart,
};
use crate::ui::{self, PrefetchProgress, UiContext};
use tracing::warn;

/// Execute the prefetch command
pub async fn execute(
    args: PrefetchArgs,
    app: Option<&str>,
    verbose: bool,
    config: &Config,
) -> KitprepResult<()> {
    let spec = resolve_spec(app, config).await?;
    let ctx = UiContext::detect();

    let detector = CacheStateDetector::new(config.cache.ready_threshold);
    let orchestrator =
        PrefetchOrchestrator::new(detector, PrefetchSettings::from(&config.prefetch))
            .with_event_log(EventLog::new(config));

    let request = PrefetchRequest {
        profile: args
            .config
            .unwrap_or_else(|| config.prefetch.default_profile.clone()),
        verbose,
        force: args.force,
    };

    let before = detector.detect(&spec.cache_path).await;
    if before.extension_count == 0 {
        let estimator =
            DownloadEstimator::new(config.estimate.size_bytes, config.estimate.bandwidth_mbps);
        if let Ok(estimate) = estimator.estimate(None) {
            ui::remark(
                &ctx,
                &format!(
                    "First fetch: up to {}, about {} at {} Mbps",
                    format_bytes(estimate.estimated_bytes),
                    format_duration(estimate.estimated_seconds),
                    estimate.bandwidth_mbps
                ),
            );
        }
    }

    let mut handle = match orchestrator.spawn(&spec, request).await? {
        PrefetchStart::Skipped(state) => {
            ui::step_ok_detail(
                &ctx,
                &format!("{}: cache ready, nothing to fetch", spec.label()),
                &format!("{} entries", state.extension_count),
            );
            ui::remark(&ctx, "Use --force to fetch anyway");
            return Ok(());
        }
        PrefetchStart::Running(handle) => handle,
    };

    let progress = PrefetchProgress::new(&ctx, spec.label());
    let cancel = handle.cancel_handle();
    let job_id = handle.job_id();
    let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;

    loop {
        tokio::select! {
            status = handle.next_status() => match status {
                Some(status) => progress.on_status(&status),
                None => break,
            },
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        warn!("Interrupted, stopping prefetch {}", job_id);
                        cancel.cancel();
                    }
                    Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
                }
            }
        }
    }

    let outcome = handle.wait().await;
    progress.finish();

    match outcome? {
        PrefetchOutcome::Completed {
            lines_emitted,
            state,
            ..
        } => {
            let detail = format!(
                "{} lines, {} entries, {}",
                lines_emitted,
                state.extension_count,
                state.readiness()
            );
            if state.is_ready {
                ui::step_ok_detail(&ctx, &format!("{}: prefetch complete", spec.label()), &detail);
            } else {
                // Exit code is authoritative; a short cache is only worth a warning
                ui::step_warn_hint(
                    &ctx,
                    &format!("{}: prefetch finished below readiness threshold ({})", spec.label(), detail),
                    "Check prefetch.command or lower cache.ready_threshold",
                );
            }
        }
        PrefetchOutcome::Skipped { state } => {
            ui::step_ok_detail(
                &ctx,
                &format!("{}: cache ready", spec.label()),
                &format!("{} entries", state.extension_count),
            );
        }
    }

    Ok(())
}
