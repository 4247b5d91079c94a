//! Estimate command - first-run download time

use crate::cache::{format_bytes, format_duration, DownloadEstimator};
use crate::cli::args::EstimateArgs;
use crate::config::Config;
use crate::error::KitprepResult;
use crate::ui::{self, UiContext};

/// Execute the estimate command
pub async fn execute(args: EstimateArgs, config: &Config) -> KitprepResult<()> {
    let estimator =
        DownloadEstimator::new(config.estimate.size_bytes, config.estimate.bandwidth_mbps);
    let estimate = estimator.estimate(args.bandwidth)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    let ctx = UiContext::detect();
    ui::key_value(&ctx, "download", &format_bytes(estimate.estimated_bytes));
    ui::key_value(&ctx, "bandwidth", &format!("{} Mbps", estimate.bandwidth_mbps));
    ui::key_value(
        &ctx,
        "estimated",
        &format!(
            "{} ({:.0} s)",
            format_duration(estimate.estimated_seconds),
            estimate.estimated_seconds
        ),
    );
    ui::remark(&ctx, "Static upper bound for a full first-time dependency set");

    Ok(())
}
