//! Worker wire protocol
//!
//! Newline-delimited JSON: one request object per stdin line, one response
//! object per stdout line, in the same order.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OcrError, Result};
use crate::ocr::types::{ConfidenceSummary, TierKind};

/// One request line
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    /// Directory holding `page_N.png` files
    #[serde(default)]
    pub image_dir: Option<String>,
    /// Independent text extraction used to cross-check numbers
    #[serde(default)]
    pub text_layer_ref: Option<String>,
    /// Skip the gate and run this tier (2 or 3)
    #[serde(default)]
    pub tier: Option<u8>,
}

impl WorkerRequest {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| OcrError::Protocol(e.to_string()))
    }

    /// Requested directory; blank counts as missing
    pub fn image_dir(&self) -> Result<PathBuf> {
        match self.image_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => Err(OcrError::Protocol("imageDir is required".to_string())),
        }
    }

    pub fn requested_tier(&self) -> Result<Option<TierKind>> {
        match self.tier {
            None => Ok(None),
            Some(number) => TierKind::from_number(number)
                .map(Some)
                .ok_or_else(|| OcrError::Protocol(format!("unsupported tier {}", number))),
        }
    }
}

/// Successful extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub full_text: String,
    pub pages: Vec<String>,
    pub total_pages: usize,
    pub ocr_tier: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceSummary>,
    pub quality_reason: String,
}

/// Per-request failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl WorkerResponse {
    pub fn error(message: impl Into<String>) -> Self {
        WorkerResponse::Error(ErrorResponse {
            error: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, WorkerResponse::Error(_))
    }

    /// Single-line JSON encoding
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
