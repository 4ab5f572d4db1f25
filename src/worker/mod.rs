//! Worker Loop
//!
//! Long-running request loop speaking newline-delimited JSON. Requests are
//! handled one at a time in arrival order and every non-blank input line
//! gets exactly one response line. Per-request failures, panics included,
//! become `{"error": ...}` responses; the loop only ends when input closes.
//!
//! stdout carries protocol lines only. Readiness and model-loading notices
//! go to stderr through [`announce`] alongside the tracing output.

pub mod handle;
pub mod pipeline;
pub mod protocol;

use std::any::Any;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::Result;
use crate::ocr::engine::{FastEngine, LayoutEngineLoader};
use crate::ocr::layout::LayoutOptions;
use crate::pages::PageImageSet;
use crate::quality::QualityGate;

pub use handle::LayoutModelHandle;
pub use pipeline::{Extraction, Pipeline};
pub use protocol::{ErrorResponse, SuccessResponse, WorkerRequest, WorkerResponse};

const PROCESS_NAME: &str = "ocr-worker";

/// Side-channel line for a status message
pub fn notice_line(message: &str) -> String {
    format!("{}: {}", PROCESS_NAME, message)
}

/// Side-channel line signalling readiness
pub fn ready_line() -> String {
    format!("{} ready", PROCESS_NAME)
}

/// Write one side-channel line and flush it
pub fn write_notice<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()
}

/// Write a side-channel notice to stderr
pub fn announce(message: &str) {
    let _ = write_notice(&mut std::io::stderr().lock(), &notice_line(message));
}

/// Tell the parent process the worker accepts requests
pub fn announce_ready() {
    let _ = write_notice(&mut std::io::stderr().lock(), &ready_line());
}

pub struct Worker<F: FastEngine, L: LayoutEngineLoader> {
    pipeline: Pipeline<F, L>,
    requests: u64,
}

impl<F: FastEngine, L: LayoutEngineLoader> Worker<F, L> {
    pub fn new(pipeline: Pipeline<F, L>) -> Self {
        Self {
            pipeline,
            requests: 0,
        }
    }

    /// Wire a worker from runtime configuration
    pub fn from_config(fast: F, loader: L, config: &Config) -> Self {
        let options = LayoutOptions {
            min_score: config.layout.min_score,
            row_threshold: config.layout.row_threshold,
        };
        Self::new(Pipeline::new(fast, loader, QualityGate::new(config.quality), options))
    }

    /// Number of non-blank request lines handled so far
    pub fn requests_handled(&self) -> u64 {
        self.requests
    }

    pub fn layout_loaded(&self) -> bool {
        self.pipeline.layout_loaded()
    }

    /// Handle one input line. Blank lines produce no response.
    pub async fn handle_line(&mut self, line: &str) -> Option<WorkerResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        self.requests += 1;
        let seq = self.requests;
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.process(line)).catch_unwind().await;
        let response = match outcome {
            Ok(Ok(success)) => {
                tracing::info!(
                    "Request #{} done: tier {}, {} pages in {}ms",
                    seq,
                    success.ocr_tier,
                    success.total_pages,
                    started.elapsed().as_millis()
                );
                WorkerResponse::Success(success)
            }
            Ok(Err(e)) => {
                if e.is_not_found() {
                    tracing::warn!("Request #{} rejected: {}", seq, e);
                } else {
                    tracing::error!("Request #{} failed: {}", seq, e);
                }
                WorkerResponse::error(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Request #{} panicked: {}", seq, message);
                WorkerResponse::error(format!("Internal error: {}", message))
            }
        };

        Some(response)
    }

    async fn process(&mut self, line: &str) -> Result<SuccessResponse> {
        let request = WorkerRequest::parse(line)?;
        let dir = request.image_dir()?;
        let tier = request.requested_tier()?;
        let pages = PageImageSet::discover(&dir)?;

        tracing::debug!("Processing {} pages from {}", pages.page_count(), pages.dir().display());

        let extraction = match tier {
            Some(tier) => self.pipeline.extract_with_tier(&pages, tier).await?,
            None => {
                self.pipeline
                    .extract(&pages, request.text_layer_ref.as_deref())
                    .await?
            }
        };

        Ok(extraction.into_response())
    }

    /// Serve requests until `input` reaches end of file
    pub async fn serve<R, W>(&mut self, mut input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            write_response(&mut output, &response).await?;
        }

        tracing::info!("Input closed after {} requests", self.requests);
        Ok(())
    }
}

/// Write one response line and flush it
pub async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, response: &WorkerResponse) -> std::io::Result<()> {
    let mut encoded = response.to_line()?;
    encoded.push('\n');
    output.write_all(encoded.as_bytes()).await?;
    output.flush().await
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
