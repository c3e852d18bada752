//! Churn Prediction Service - Main Entry Point
//!
//! Loads the classifier once, then answers prediction requests over HTTP
//! and/or NATS request/reply until interrupted.

use anyhow::{Context, Result};
use churn_prediction_service::{
    config::AppConfig,
    consumer::RequestConsumer,
    metrics::{MetricsReporter, PredictionMetrics},
    models::{Classifier, OnnxClassifier},
    predictor::{ChurnPredictor, CHURN_THRESHOLD},
    processor::RequestProcessor,
    server, FEATURE_COUNT,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config)?;

    info!("Starting Churn Prediction Service");
    info!(
        "Decision threshold: p(churn) > {:.2}, {} features",
        CHURN_THRESHOLD, FEATURE_COUNT
    );

    if !config.has_transport() {
        anyhow::bail!("Neither HTTP nor NATS transport is enabled");
    }

    // Load the classifier once; failure here is fatal
    let classifier: Arc<dyn Classifier> = Arc::new(
        OnnxClassifier::new(&config.model)
            .with_context(|| format!("Failed to load classifier from {}", config.model.model_path))?,
    );
    let predictor = Arc::new(ChurnPredictor::new(classifier)?);
    info!(model = %predictor.model_name(), "Churn predictor ready");

    let metrics = Arc::new(PredictionMetrics::new());
    let processor = RequestProcessor::new(predictor, metrics.clone());

    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for shutdown signal");
                // Dropping the sender would read as a shutdown to every receiver
                std::future::pending::<()>().await;
            }
        }
    });

    let http_task = if config.http.enabled {
        let bind_addr = config.http.bind_addr.clone();
        let processor = processor.clone();
        let mut rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            server::serve(&bind_addr, processor, async move {
                let _ = rx.changed().await;
            })
            .await
        }))
    } else {
        None
    };

    if config.nats.enabled {
        run_nats(&config, processor.clone(), shutdown_rx.clone()).await?;
    }

    if let Some(task) = http_task {
        task.await.context("HTTP server task panicked")??;
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "churn_prediction_service={level},tower_http={level}",
            level = config.logging.level
        ))
        .context("Invalid logging.level")?,
    };

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}

/// Answer prediction requests arriving on the NATS predict subject
async fn run_nats(
    config: &AppConfig,
    processor: RequestProcessor,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    RequestConsumer::new(client, &config.nats.predict_subject)
        .run(processor, config.pipeline.workers, shutdown)
        .await
}
