//! Validate command - check an application's dependency declaration

use crate::cli::args::ValidateArgs;
use crate::cli::commands::resolve_spec;
use crate::config::Config;
use crate::deps::{HttpRegistry, ValidationPipeline};
use crate::error::{KitprepError, KitprepResult};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the validate command
pub async fn execute(args: ValidateArgs, app: Option<&str>, config: &Config) -> KitprepResult<()> {
    let spec = resolve_spec(app, config).await?;
    let ctx = UiContext::detect();

    let registry;
    let pipeline = if args.check_registry {
        registry = HttpRegistry::new(&config.registry);
        ValidationPipeline::with_registry(&registry)
    } else {
        ValidationPipeline::local()
    };

    let spinner = (args.check_registry && !args.json).then(|| {
        let count = spec.declared_dependencies.len();
        TaskSpinner::start(
            &ctx,
            &format!("Checking {} dependencies against {}", count, config.registry.url),
        )
    });

    let result = pipeline.validate(&spec).await;

    if let Some(spinner) = spinner {
        match result {
            Ok(_) => spinner.stop("Registry lookups complete"),
            Err(_) => spinner.stop_error("Registry check failed"),
        }
    }

    if args.json {
        let body = match result {
            Ok(ref report) => serde_json::json!({
                "app": spec.app,
                "valid": true,
                "mode": report.mode,
                "checked": report.checked,
            }),
            Err(KitprepError::ValidationFailure { ref issues }) => serde_json::json!({
                "app": spec.app,
                "valid": false,
                "mode": pipeline.mode(),
                "issues": issues,
            }),
            Err(e) => return Err(e),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return result.map(|_| ());
    }

    match result {
        Ok(report) => {
            ui::step_ok_detail(
                &ctx,
                &format!("{}: dependencies valid", spec.label()),
                &format!("{} checked, {} mode", report.checked, report.mode),
            );
            Ok(())
        }
        Err(KitprepError::ValidationFailure { issues }) => {
            for issue in &issues {
                ui::step_error(&ctx, &issue.to_string());
            }
            Err(KitprepError::ValidationFailure { issues })
        }
        Err(e) => Err(e),
    }
}
