//! Status command - resolved scope and cache readiness

use crate::cache::{format_bytes, format_duration, CacheStateDetector, DownloadEstimator};
use crate::cli::args::StatusArgs;
use crate::cli::commands::resolve_spec;
use crate::config::Config;
use crate::error::KitprepResult;
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(args: StatusArgs, app: Option<&str>, config: &Config) -> KitprepResult<()> {
    let spec = resolve_spec(app, config).await?;
    let state = CacheStateDetector::new(config.cache.ready_threshold)
        .detect(&spec.cache_path)
        .await;

    // Only a cache that is still preparing has a meaningful first-run estimate
    let estimate = if state.is_ready {
        None
    } else {
        Some(
            DownloadEstimator::new(config.estimate.size_bytes, config.estimate.bandwidth_mbps)
                .estimate(None)?,
        )
    };

    if args.json {
        let body = serde_json::json!({
            "app": spec.app,
            "scope": spec.scope,
            "sdk_version": spec.sdk_version.to_string(),
            "cache_strategy": spec.cache_strategy,
            "cache_path": spec.cache_path,
            "dependencies": spec.declared_dependencies.len(),
            "extension_count": state.extension_count,
            "threshold": state.threshold,
            "state": state.readiness(),
            "estimate": estimate,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("kitprep status: {}", spec.label()));

    ui::section(&ctx, "Resolution");
    ui::key_value(&ctx, "scope", &spec.scope.to_string());
    ui::key_value(&ctx, "strategy", &spec.cache_strategy.to_string());
    ui::key_value(&ctx, "sdk", &spec.sdk_version.to_string());
    ui::key_value(
        &ctx,
        "dependencies",
        &spec.declared_dependencies.len().to_string(),
    );

    ui::section(&ctx, "Cache");
    ui::key_value(&ctx, "path", &spec.cache_path.display().to_string());
    ui::key_value(
        &ctx,
        "entries",
        &format!("{} / {}", state.extension_count, state.threshold),
    );
    ui::key_value_status(&ctx, "state", &state.readiness().to_string(), state.is_ready);

    if let Some(estimate) = estimate {
        ui::step_warn_hint(
            &ctx,
            &format!(
                "First launch downloads up to {} (about {} at {} Mbps)",
                format_bytes(estimate.estimated_bytes),
                format_duration(estimate.estimated_seconds),
                estimate.bandwidth_mbps
            ),
            "Run: kitprep prefetch",
        );
    }

    Ok(())
}
