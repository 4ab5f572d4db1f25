//! Resident layout engine
//!
//! The layout-aware model is expensive to load, so it runs inside a helper
//! process that is spawned once and kept alive for the life of the worker.
//! The helper speaks newline-delimited JSON on its stdin/stdout:
//!
//! ```text
//! helper -> {"ready": true}                        (once, after model load)
//! worker -> {"image": "/path/to/page_1.png"}
//! helper -> {"rec_texts": [...], "rec_scores": [...], "rec_boxes": [[x0, y0, x1, y1], ...]}
//!         | {"error": "..."}
//!         | {}                                     (no result for the page)
//! ```
//!
//! Replies may echo `"image"`; a reply naming a different page is stale and
//! is discarded. Lines that are not reply objects (download notices, library
//! warnings, structured logs) are skipped.
//!
//! The helper's stderr is inherited, so its diagnostics land on the
//! worker's side channel.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::engine::{LayoutEngine, LayoutEngineLoader};
use crate::config::LayoutConfig;
use crate::error::OcrError;
use crate::geometry::{BoundingBox, RecognitionFragment};
use crate::pages::PageImage;

/// Handshake line sent by the helper once its model is loaded
#[derive(Debug, Deserialize)]
struct ReadyLine {
    ready: bool,
}

#[derive(Debug, Serialize)]
struct PageRequest<'a> {
    image: &'a std::path::Path,
}

/// Keys a reply object may carry; objects with any other key are not replies
const REPLY_KEYS: &[&str] = &["image", "error", "rec_texts", "rec_scores", "rec_boxes"];

/// One page of helper output
#[derive(Debug, Default, Deserialize)]
pub struct HelperReply {
    /// Page the reply belongs to, when the helper echoes it
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub rec_texts: Option<Vec<String>>,
    #[serde(default)]
    pub rec_scores: Vec<f64>,
    #[serde(default)]
    pub rec_boxes: Vec<Vec<f64>>,
}

/// Classified line of helper stdout
#[derive(Debug)]
pub enum HelperLine {
    /// `null` or a reply object
    Reply(Option<HelperReply>),
    /// Anything else the helper printed
    Noise,
}

impl HelperLine {
    pub fn parse(line: &str) -> Result<Self, OcrError> {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Null) => Ok(HelperLine::Reply(None)),
            Ok(Value::Object(map)) if map.keys().all(|k| REPLY_KEYS.contains(&k.as_str())) => {
                serde_json::from_value(Value::Object(map))
                    .map(|reply| HelperLine::Reply(Some(reply)))
                    .map_err(|e| OcrError::Engine(format!("Malformed layout helper reply: {}", e)))
            }
            _ => Ok(HelperLine::Noise),
        }
    }
}

impl HelperReply {
    /// Whether this reply may belong to `image`; replies without an echo
    /// are trusted
    pub fn is_for(&self, image: &str) -> bool {
        self.image.as_deref().map_or(true, |echoed| echoed == image)
    }

    /// Zip texts, scores and boxes into fragments.
    ///
    /// Parallel arrays are truncated to the shortest; entries with fewer
    /// than two box coordinates are dropped. No score or text filtering
    /// happens here.
    pub fn into_fragments(self) -> Result<Option<Vec<RecognitionFragment>>, OcrError> {
        if let Some(message) = self.error {
            return Err(OcrError::Engine(message));
        }
        let Some(texts) = self.rec_texts else {
            return Ok(None);
        };

        let fragments = texts
            .into_iter()
            .zip(self.rec_scores)
            .zip(self.rec_boxes)
            .filter_map(|((text, score), coords)| {
                BoundingBox::from_coords(&coords)
                    .map(|bbox| RecognitionFragment::new(text, score, bbox))
            })
            .collect();
        Ok(Some(fragments))
    }
}

/// Spawns the resident helper
pub struct ResidentLayoutLoader {
    config: LayoutConfig,
}

impl ResidentLayoutLoader {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LayoutEngineLoader for ResidentLayoutLoader {
    async fn load(&self) -> Result<Box<dyn LayoutEngine>, OcrError> {
        let command = self
            .config
            .command
            .as_deref()
            .ok_or_else(|| OcrError::Init("OCR_LAYOUT_COMMAND is not set".to_string()))?;
        let (program, args) = command
            .split_first()
            .ok_or_else(|| OcrError::Init("OCR_LAYOUT_COMMAND is empty".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Init(format!("Failed to spawn {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Init("layout helper stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OcrError::Init("layout helper stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        // Model load happens in the helper before it answers; plain-text
        // progress output may come first
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| OcrError::Init(format!("Failed to read layout helper handshake: {}", e)))?
                .ok_or_else(|| OcrError::Init("layout helper exited before becoming ready".to_string()))?;

            match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(_)) => match serde_json::from_str::<ReadyLine>(&line) {
                    Ok(ReadyLine { ready: true }) => break,
                    _ => {
                        return Err(OcrError::Init(format!(
                            "unexpected layout helper handshake: {}",
                            truncate(&line, 200)
                        )))
                    }
                },
                _ => tracing::debug!("Layout helper: {}", truncate(&line, 200)),
            }
        }

        tracing::debug!("Layout helper {} ready (pid {:?})", program, child.id());
        Ok(Box::new(ResidentLayoutEngine {
            _child: child,
            stdin,
            stdout: lines,
        }))
    }
}

/// Live connection to the helper process
pub struct ResidentLayoutEngine {
    /// Kept for `kill_on_drop`
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl LayoutEngine for ResidentLayoutEngine {
    async fn recognize(&mut self, page: &PageImage) -> Result<Option<Vec<RecognitionFragment>>, OcrError> {
        let mut request = serde_json::to_vec(&PageRequest { image: &page.path })?;
        request.push(b'\n');

        self.stdin
            .write_all(&request)
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to write to layout helper: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to flush layout helper stdin: {}", e)))?;

        let expected = page.path.to_string_lossy();
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| OcrError::Engine(format!("Failed to read from layout helper: {}", e)))?
                .ok_or_else(|| OcrError::Engine("layout helper exited".to_string()))?;

            match HelperLine::parse(&line)? {
                HelperLine::Noise => {
                    tracing::debug!("Skipping layout helper output: {}", truncate(&line, 200));
                }
                HelperLine::Reply(None) => return Ok(None),
                HelperLine::Reply(Some(reply)) if reply.is_for(&expected) => return reply.into_fragments(),
                HelperLine::Reply(Some(reply)) => {
                    tracing::warn!(
                        "Discarding stale layout helper reply for {:?} while waiting for {}",
                        reply.image,
                        expected
                    );
                }
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
