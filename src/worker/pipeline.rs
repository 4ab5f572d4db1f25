//! Escalation pipeline
//!
//! Fast tier first, then the quality gate, then the layout tier only when
//! the gate rejects. The outcome records which path was taken.

use super::handle::LayoutModelHandle;
use super::protocol::SuccessResponse;
use crate::error::Result;
use crate::ocr::engine::{FastEngine, LayoutEngineLoader};
use crate::ocr::fast::FastRecognitionTier;
use crate::ocr::layout::{LayoutOptions, LayoutRecognitionTier};
use crate::ocr::types::{TierKind, TierResult};
use crate::pages::PageImageSet;
use crate::quality::{QualityGate, QualityVerdict};

/// How a request's result was produced
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Fast tier passed the gate
    Accepted {
        result: TierResult,
        verdict: QualityVerdict,
    },
    /// Fast tier was rejected and the layout tier ran
    Escalated {
        result: TierResult,
        rejection: QualityVerdict,
    },
    /// Caller asked for a specific tier; the gate was skipped
    Requested { result: TierResult },
}

impl Extraction {
    pub fn result(&self) -> &TierResult {
        match self {
            Extraction::Accepted { result, .. }
            | Extraction::Escalated { result, .. }
            | Extraction::Requested { result } => result,
        }
    }

    pub fn tier(&self) -> TierKind {
        self.result().tier
    }

    /// Human-readable explanation of the tier choice
    pub fn reason(&self) -> String {
        match self {
            Extraction::Accepted { verdict, .. } => verdict.reason.clone(),
            Extraction::Escalated { rejection, .. } => {
                format!("fast tier rejected: {}; escalated to layout tier", rejection.reason)
            }
            Extraction::Requested { result } => format!("tier {} requested", result.tier.number()),
        }
    }

    pub fn into_response(self) -> SuccessResponse {
        let quality_reason = self.reason();
        let result = match self {
            Extraction::Accepted { result, .. }
            | Extraction::Escalated { result, .. }
            | Extraction::Requested { result } => result,
        };

        SuccessResponse {
            full_text: result.full_text,
            pages: result.pages,
            total_pages: result.total_pages,
            ocr_tier: result.tier.number(),
            confidence: result.confidence,
            quality_reason,
        }
    }
}

/// Fast tier, gate and lazily-loaded layout tier wired together
pub struct Pipeline<F: FastEngine, L: LayoutEngineLoader> {
    fast: F,
    layout: LayoutModelHandle<L>,
    gate: QualityGate,
    layout_options: LayoutOptions,
}

impl<F: FastEngine, L: LayoutEngineLoader> Pipeline<F, L> {
    pub fn new(fast: F, loader: L, gate: QualityGate, layout_options: LayoutOptions) -> Self {
        Self {
            fast,
            layout: LayoutModelHandle::new(loader),
            gate,
            layout_options,
        }
    }

    pub fn layout_loaded(&self) -> bool {
        self.layout.is_loaded()
    }

    /// Run the fast tier and escalate if the gate rejects it
    pub async fn extract(&mut self, pages: &PageImageSet, reference: Option<&str>) -> Result<Extraction> {
        let fast = self.run_fast(pages).await?;
        let verdict = self.gate.assess(&fast, reference);

        if verdict.accept {
            tracing::info!("Fast tier accepted: {}", verdict.reason);
            return Ok(Extraction::Accepted {
                result: fast,
                verdict,
            });
        }

        tracing::warn!("Fast tier rejected: {}", verdict.reason);
        let result = self.run_layout(pages).await?;
        Ok(Extraction::Escalated {
            result,
            rejection: verdict,
        })
    }

    /// Run exactly one tier without consulting the gate
    pub async fn extract_with_tier(&mut self, pages: &PageImageSet, tier: TierKind) -> Result<Extraction> {
        let result = match tier {
            TierKind::Fast => self.run_fast(pages).await?,
            TierKind::Layout => self.run_layout(pages).await?,
        };
        Ok(Extraction::Requested { result })
    }

    async fn run_fast(&self, pages: &PageImageSet) -> Result<TierResult> {
        FastRecognitionTier::new(&self.fast).run(pages).await
    }

    async fn run_layout(&mut self, pages: &PageImageSet) -> Result<TierResult> {
        let options = self.layout_options;
        let engine = self.layout.get_or_load().await?;
        LayoutRecognitionTier::new(engine, options).run(pages).await
    }
}
