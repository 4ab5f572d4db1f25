//! Layout recognition tier
//!
//! Runs the heavy layout-aware engine over every page and rebuilds
//! reading-order text from fragment positions. Failures are isolated per
//! page: a page that cannot be recognized becomes a placeholder and the
//! remaining pages still run.

use super::engine::LayoutEngine;
use super::types::{PageText, TierKind, TierResult};
use crate::error::Result;
use crate::geometry::{reconstruct_text, RecognitionFragment, ROW_THRESHOLD};
use crate::pages::{PageImage, PageImageSet};

/// Fragments scoring below this (0-1 scale) are dropped
pub const MIN_FRAGMENT_SCORE: f64 = 0.30;

/// Layout tier tuning
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    pub min_score: f64,
    pub row_threshold: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            min_score: MIN_FRAGMENT_SCORE,
            row_threshold: ROW_THRESHOLD,
        }
    }
}

/// Layout tier over a loaded engine
pub struct LayoutRecognitionTier<'a> {
    engine: &'a mut dyn LayoutEngine,
    options: LayoutOptions,
}

impl<'a> LayoutRecognitionTier<'a> {
    pub fn new(engine: &'a mut dyn LayoutEngine, options: LayoutOptions) -> Self {
        Self { engine, options }
    }

    /// Recognize all pages. The result carries no confidence block.
    pub async fn run(&mut self, pages: &PageImageSet) -> Result<TierResult> {
        let mut texts = Vec::with_capacity(pages.page_count());

        for page in pages.pages() {
            let outcome = self.recognize_page(page).await;
            if let PageText::Failed(message) = &outcome {
                tracing::warn!("Layout OCR failed on page {}: {}", page.index, message);
            }
            texts.push(outcome.into_text());
        }

        Ok(TierResult::from_pages(TierKind::Layout, texts, None))
    }

    async fn recognize_page(&mut self, page: &PageImage) -> PageText {
        // Malformed images fail here before reaching the engine
        let dimensions = match page.dimensions() {
            Ok(dimensions) => dimensions,
            Err(e) => return PageText::Failed(e.to_string()),
        };
        tracing::debug!(
            "Layout OCR page {} ({}x{})",
            page.index,
            dimensions.width,
            dimensions.height
        );

        match self.engine.recognize(page).await {
            Ok(Some(fragments)) => build_page_text(fragments, &self.options),
            Ok(None) => PageText::NoResults,
            Err(e) => PageText::Failed(e.to_string()),
        }
    }
}

/// Filter fragments and reconstruct the page's text
pub fn build_page_text(fragments: Vec<RecognitionFragment>, options: &LayoutOptions) -> PageText {
    let kept: Vec<RecognitionFragment> = fragments
        .into_iter()
        .filter(|f| f.confidence >= options.min_score)
        .filter_map(|mut f| {
            f.text = f.text.trim().to_string();
            (!f.text.is_empty()).then_some(f)
        })
        .collect();

    if kept.is_empty() {
        return PageText::NoTextDetected;
    }
    PageText::Recognized(reconstruct_text(kept, options.row_threshold))
}
