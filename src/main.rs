use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

use dx_analyzer::config::{AppConfig, SourceMode, PLACEHOLDER_CALLSIGN};
use dx_analyzer::module::cluster::ClusterClient;
use dx_analyzer::module::pipeline::{CsvSink, ResourceBudget, SpotPipeline};
use dx_analyzer::module::spot::BandPlan;
use dx_analyzer::module::web::WebPoller;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load("config.toml")?;

    let _logging_guard =
        dx_analyzer::logging::init_logging("logs", "dx-analyzer", &config.log_level);

    tracing::info!("DX cluster analyzer starting...");

    // No band rules means nothing could ever be counted: startup-fatal.
    let band_plan = Arc::new(
        BandPlan::load(&config.band_config)
            .await
            .context("cannot start without a band configuration")?,
    );

    if config.source == SourceMode::Cluster && config.callsign == PLACEHOLDER_CALLSIGN {
        tracing::warn!(
            "Using placeholder callsign '{}'; set your callsign in config.toml",
            PLACEHOLDER_CALLSIGN
        );
    }

    let sink = CsvSink::create(&config.output_dir, band_plan.clone())?;
    let mut pipeline = SpotPipeline::new(band_plan, sink);
    let budget = ResourceBudget::new(
        &config.output_dir,
        config.max_runtime(),
        config.max_output_bytes(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted by user");
            let _ = stop_tx.send(true);
        }
    });

    match config.source {
        SourceMode::Cluster => {
            tracing::info!("Using cluster feed {} as data source", config.cluster);
            let mut client =
                ClusterClient::new(config.endpoint_ring()?, config.callsign.clone());
            client.run(&mut pipeline, &budget, stop_rx).await?;
        }
        SourceMode::Web => {
            tracing::info!("Using cluster web pages as data source");
            let poller = WebPoller::with_default_sources();
            poller.run(&mut pipeline, &budget, stop_rx).await?;
        }
    }

    // Graceful shutdown: whatever is buffered becomes durable.
    pipeline.finalize()?;
    tracing::info!(
        "Collection complete after {:?}. Total spots: {}",
        budget.elapsed(),
        pipeline.total_admitted()
    );

    Ok(())
}
