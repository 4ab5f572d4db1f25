//! OCR Types
//!
//! Tier results, confidence statistics and per-page outcomes shared by the
//! recognition tiers.

use serde::{Deserialize, Serialize};

/// Separator between page texts in `full_text`
pub const PAGE_BREAK: &str = "\n\n---\n\n";

/// Word confidence below this counts as low confidence (0-100 scale)
pub const LOW_CONFIDENCE_WORD: i32 = 60;

/// Tesseract's marker for tokens that are not actual text
pub const NOT_TEXT_CONFIDENCE: i32 = -1;

/// Recognition tier identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    /// Low-cost word-level OCR
    Fast,
    /// Layout-aware document-structure OCR
    Layout,
}

impl TierKind {
    /// Protocol tier number (tier 1 is the text layer, handled upstream)
    pub fn number(&self) -> u8 {
        match self {
            TierKind::Fast => 2,
            TierKind::Layout => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            2 => Some(TierKind::Fast),
            3 => Some(TierKind::Layout),
            _ => None,
        }
    }
}

/// One token from word-level recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordToken {
    pub text: String,
    /// 0-100, or -1 for non-text layout markers
    pub confidence: i32,
}

impl WordToken {
    pub fn new(text: impl Into<String>, confidence: i32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Raw fast-engine output for one page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FastPage {
    /// Engine-formatted plain text
    pub text: String,
    pub words: Vec<WordToken>,
}

/// Per-page word confidence aggregate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageConfidence {
    /// Rounded to one decimal; 0.0 when no words were kept
    pub mean: f64,
    pub low_confidence_words: usize,
    pub total_words: usize,
}

impl PageConfidence {
    /// Aggregate word tokens, skipping blank text and the not-text marker
    pub fn from_words(words: &[WordToken]) -> Self {
        let mut sum: i64 = 0;
        let mut total_words = 0;
        let mut low_confidence_words = 0;

        for word in words {
            if word.text.trim().is_empty() || word.confidence == NOT_TEXT_CONFIDENCE {
                continue;
            }
            total_words += 1;
            sum += i64::from(word.confidence);
            if word.confidence < LOW_CONFIDENCE_WORD {
                low_confidence_words += 1;
            }
        }

        let mean = if total_words == 0 {
            0.0
        } else {
            round1(sum as f64 / total_words as f64)
        };

        Self {
            mean,
            low_confidence_words,
            total_words,
        }
    }
}

/// Document-level confidence block (fast tier only)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub mean: f64,
    pub per_page: Vec<f64>,
    pub low_confidence_words: usize,
    pub total_words: usize,
}

impl ConfidenceSummary {
    /// Combine page aggregates.
    ///
    /// Pages with a zero mean are left out of the document mean rather than
    /// pulling it down; word counts still include every page.
    pub fn from_pages(pages: &[PageConfidence]) -> Self {
        let scored: Vec<f64> = pages.iter().map(|p| p.mean).filter(|m| *m > 0.0).collect();
        let mean = if scored.is_empty() {
            0.0
        } else {
            round1(scored.iter().sum::<f64>() / scored.len() as f64)
        };

        Self {
            mean,
            per_page: pages.iter().map(|p| p.mean).collect(),
            low_confidence_words: pages.iter().map(|p| p.low_confidence_words).sum(),
            total_words: pages.iter().map(|p| p.total_words).sum(),
        }
    }

    /// Share of low-confidence words, `None` when no words were counted
    pub fn low_confidence_ratio(&self) -> Option<f64> {
        if self.total_words == 0 {
            None
        } else {
            Some(self.low_confidence_words as f64 / self.total_words as f64)
        }
    }
}

/// Outcome of recognizing one page in the layout tier
#[derive(Debug, Clone, PartialEq)]
pub enum PageText {
    /// Reconstructed text
    Recognized(String),
    /// Fragments came back but none survived filtering
    NoTextDetected,
    /// The engine produced nothing for the page
    NoResults,
    /// Recognition failed for this page only
    Failed(String),
}

impl PageText {
    /// Text emitted for the page, placeholders included
    pub fn into_text(self) -> String {
        match self {
            PageText::Recognized(text) => text,
            PageText::NoTextDetected => "[No text detected]".to_string(),
            PageText::NoResults => "[No OCR results]".to_string(),
            PageText::Failed(message) => format!("[Layout OCR failed: {}]", message),
        }
    }
}

/// Unit exchanged between tiers and returned to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct TierResult {
    pub full_text: String,
    pub pages: Vec<String>,
    pub total_pages: usize,
    pub confidence: Option<ConfidenceSummary>,
    pub tier: TierKind,
}

impl TierResult {
    /// Assemble from ordered page texts
    pub fn from_pages(tier: TierKind, pages: Vec<String>, confidence: Option<ConfidenceSummary>) -> Self {
        Self {
            full_text: pages.join(PAGE_BREAK),
            total_pages: pages.len(),
            pages,
            confidence,
            tier,
        }
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
