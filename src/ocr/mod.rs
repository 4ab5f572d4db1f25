//! OCR Module
//!
//! Recognition tiers and the engines behind them.
//!
//! - Fast tier: Tesseract, word-level confidences
//! - Layout tier: resident layout-aware model, row reconstruction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_worker::ocr::{FastRecognitionTier, TesseractCli};
//! use ocr_worker::pages::PageImageSet;
//!
//! let engine = TesseractCli::new(TesseractConfig::default())?;
//! let pages = PageImageSet::discover(Path::new("/tmp/render-1234"))?;
//! let result = FastRecognitionTier::new(&engine).run(&pages).await?;
//! println!("{:?}", result.confidence);
//! ```

pub mod engine;
pub mod fast;
pub mod layout;
pub mod resident;
pub mod tesseract;
pub mod types;

pub use engine::{FastEngine, LayoutEngine, LayoutEngineLoader};
pub use fast::FastRecognitionTier;
pub use layout::{LayoutOptions, LayoutRecognitionTier};
pub use resident::ResidentLayoutLoader;
pub use tesseract::TesseractCli;
pub use types::{
    ConfidenceSummary, FastPage, PageConfidence, PageText, TierKind, TierResult, WordToken,
};

#[cfg(feature = "ocr-tesseract")]
pub use tesseract::TesseractLib;
