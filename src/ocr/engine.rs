//! OCR Engines
//!
//! Traits the recognition tiers drive. Concrete engines live in
//! `tesseract` and `resident`; tests substitute in-memory mocks.

use async_trait::async_trait;

use super::types::FastPage;
use crate::error::OcrError;
use crate::geometry::RecognitionFragment;
use crate::pages::PageImage;

/// Low-cost word-level OCR engine
#[async_trait]
pub trait FastEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Check if the engine can run in this environment
    async fn is_available(&self) -> bool;

    /// Recognize one page: formatted text plus per-word confidences
    async fn recognize(&self, page: &PageImage) -> Result<FastPage, OcrError>;
}

/// Heavy layout-aware OCR engine, loaded once per process
#[async_trait]
pub trait LayoutEngine: Send {
    /// Recognize one page into positioned fragments.
    ///
    /// `Ok(None)` means the engine produced no result at all for the page.
    async fn recognize(&mut self, page: &PageImage) -> Result<Option<Vec<RecognitionFragment>>, OcrError>;
}

/// Constructs the layout engine; called at most once per successful load
#[async_trait]
pub trait LayoutEngineLoader: Send + Sync {
    async fn load(&self) -> Result<Box<dyn LayoutEngine>, OcrError>;
}
