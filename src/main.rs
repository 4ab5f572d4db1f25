//! OCR Worker
//!
//! Reads one JSON request per stdin line and writes one JSON response per
//! stdout line. Logs and status notices go to stderr.
//!
//! Passing a directory as the first argument recognizes it once, prints the
//! response and exits.

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{stdin, stdout, BufReader};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_worker::config::Config;
use ocr_worker::ocr::{FastEngine, LayoutEngineLoader, ResidentLayoutLoader, TesseractCli};
use ocr_worker::worker::{announce_ready, write_response, Worker};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout is reserved for protocol lines
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_worker=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting OCR worker v{}", env!("CARGO_PKG_VERSION"));

    let fast = TesseractCli::new(config.tesseract.clone()).context("Invalid Tesseract configuration")?;
    if !fast.is_available().await {
        anyhow::bail!("Tesseract binary {:?} is not available", config.tesseract.binary);
    }
    match fast.version().await {
        Ok(version) => tracing::info!("Fast tier: {} (lang {})", version, config.tesseract.language),
        Err(e) => tracing::warn!("Could not read Tesseract version: {}", e),
    }

    if config.layout.command.is_none() {
        tracing::warn!("OCR_LAYOUT_COMMAND is not set; escalated requests will fail");
    }
    let loader = ResidentLayoutLoader::new(config.layout.clone());
    let mut worker = Worker::from_config(fast, loader, &config);

    if let Some(dir) = std::env::args_os().nth(1) {
        return run_once(&mut worker, PathBuf::from(dir)).await;
    }

    announce_ready();

    tokio::select! {
        result = worker.serve(BufReader::new(stdin()), stdout()) => {
            result.context("Worker I/O failed")?;
        },
        _ = shutdown_signal() => {},
    }

    tracing::info!("Worker shutdown complete after {} requests", worker.requests_handled());
    Ok(())
}

/// Recognize a single directory and print the response
async fn run_once<F, L>(worker: &mut Worker<F, L>, dir: PathBuf) -> anyhow::Result<()>
where
    F: FastEngine,
    L: LayoutEngineLoader,
{
    let line = serde_json::json!({ "imageDir": dir }).to_string();
    let Some(response) = worker.handle_line(&line).await else {
        anyhow::bail!("Empty request for {}", dir.display());
    };

    write_response(&mut stdout(), &response).await?;

    if response.is_error() {
        anyhow::bail!("Recognition failed for {}", dir.display());
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
