use crate::cli::RunArgs;
use crate::infra;
use dscr_scout::config::{split_list, AppConfig};
use dscr_scout::error::AppError;
use dscr_scout::telemetry;
use dscr_scout::workflows::pipeline::{cancel_pair, PipelineOrchestrator};
use tracing::{info, warn};

/// Fold command-line overrides into the loaded configuration.
pub(crate) fn apply_overrides(config: &mut AppConfig, args: RunArgs) {
    if args.dry_run {
        config.pipeline.dry_run = true;
    }
    if !args.zips.is_empty() {
        config.market.postal_codes = args.zips.iter().flat_map(|zip| split_list(zip)).collect();
    }
    if let Some(prefix) = args.run_id_prefix {
        config.pipeline.run_id_prefix = prefix;
    }
}

pub(crate) async fn run(args: RunArgs) -> Result<i32, AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config, args);

    telemetry::init(&config.telemetry)?;

    let market = config.market.filter()?;
    let collaborators = infra::collaborators(&config).await?;
    info!(
        environment = ?config.environment,
        postal_codes = market.postal_codes.len(),
        dry_run = config.pipeline.dry_run,
        "collaborators wired"
    );

    let (cancel, signal) = cancel_pair();
    let orchestrator = PipelineOrchestrator::new(
        collaborators,
        market,
        config.thresholds.clone(),
        config.pipeline.options(),
    )
    .with_cancellation(signal);

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let summary = orchestrator.run().await;
    interrupt.abort();

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "unable to render run summary"),
    }

    Ok(summary.outcome.exit_code())
}
