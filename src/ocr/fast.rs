//! Fast recognition tier
//!
//! Word-level OCR over every page. Page text is the engine's own formatted
//! output; the word table only feeds the confidence statistics.

use super::engine::FastEngine;
use super::types::{ConfidenceSummary, PageConfidence, TierKind, TierResult};
use crate::error::Result;
use crate::pages::PageImageSet;

/// Fast tier over any `FastEngine`
pub struct FastRecognitionTier<'a, E: FastEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: FastEngine + ?Sized> FastRecognitionTier<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Recognize all pages in order.
    ///
    /// An engine failure on any page fails the whole tier.
    pub async fn run(&self, pages: &PageImageSet) -> Result<TierResult> {
        let mut texts = Vec::with_capacity(pages.page_count());
        let mut confidences = Vec::with_capacity(pages.page_count());

        for page in pages.pages() {
            let output = self.engine.recognize(page).await?;
            let confidence = PageConfidence::from_words(&output.words);

            tracing::debug!(
                "{} page {}: mean {:.1}%, {}/{} low-confidence words",
                self.engine.name(),
                page.index,
                confidence.mean,
                confidence.low_confidence_words,
                confidence.total_words
            );

            texts.push(output.text);
            confidences.push(confidence);
        }

        let summary = ConfidenceSummary::from_pages(&confidences);
        Ok(TierResult::from_pages(TierKind::Fast, texts, Some(summary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::engine::mock::MockFastEngine;
    use crate::ocr::types::{FastPage, WordToken};
    use crate::pages::page_path;
    use tempfile::TempDir;

    fn page_set(count: usize) -> (TempDir, PageImageSet) {
        let dir = TempDir::new().unwrap();
        for index in 1..=count {
            image::RgbImage::new(4, 4).save(page_path(dir.path(), index)).unwrap();
        }
        let set = PageImageSet::discover(dir.path()).unwrap();
        (dir, set)
    }

    fn fast_page(text: &str, confidences: &[i32]) -> FastPage {
        FastPage {
            text: text.to_string(),
            words: confidences
                .iter()
                .enumerate()
                .map(|(i, c)| WordToken::new(format!("w{}", i), *c))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_fast_tier_aggregates_pages() {
        let (_dir, pages) = page_set(2);
        let engine = MockFastEngine::default();
        engine.set_page(1, fast_page("Invoice 1042\nTotal 99.00", &[90, 95, -1, 50]));
        engine.set_page(2, fast_page("Thank you", &[88]));

        let result = FastRecognitionTier::new(&engine).run(&pages).await.unwrap();

        assert_eq!(result.tier, TierKind::Fast);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.pages, vec!["Invoice 1042\nTotal 99.00", "Thank you"]);
        assert_eq!(result.full_text, "Invoice 1042\nTotal 99.00\n\n---\n\nThank you");

        let confidence = result.confidence.unwrap();
        // Page 1: (90 + 95 + 50) / 3 = 78.3
        assert_eq!(confidence.per_page, vec![78.3, 88.0]);
        assert_eq!(confidence.mean, 83.2);
        assert_eq!(confidence.low_confidence_words, 1);
        assert_eq!(confidence.total_words, 4);
    }

    #[tokio::test]
    async fn test_blank_page_excluded_from_mean() {
        let (_dir, pages) = page_set(2);
        let engine = MockFastEngine::default();
        engine.set_page(1, fast_page("Receipt", &[92]));
        engine.set_page(2, fast_page("", &[]));

        let result = FastRecognitionTier::new(&engine).run(&pages).await.unwrap();
        let confidence = result.confidence.unwrap();
        assert_eq!(confidence.per_page, vec![92.0, 0.0]);
        assert_eq!(confidence.mean, 92.0);
    }

    #[tokio::test]
    async fn test_fast_tier_is_idempotent() {
        let (_dir, pages) = page_set(2);
        let engine = MockFastEngine::default();
        engine.set_page(1, fast_page("Line one", &[81, 99, 70]));
        engine.set_page(2, fast_page("Line two", &[64, 97]));

        let tier = FastRecognitionTier::new(&engine);
        let first = tier.run(&pages).await.unwrap();
        let second = tier.run(&pages).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_engine_failure_fails_tier() {
        let (_dir, pages) = page_set(2);
        let engine = MockFastEngine::default();
        engine.set_page(1, fast_page("only page one", &[90]));

        let result = FastRecognitionTier::new(&engine).run(&pages).await;
        assert!(matches!(result, Err(OcrError::Engine(_))));
    }
}
