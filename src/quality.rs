//! Quality gate
//!
//! Decides whether a fast-tier result is good enough to return or must be
//! escalated to the layout tier. Checks run in a fixed order and the first
//! failing check decides the verdict:
//!
//! 1. mean word confidence
//! 2. share of low-confidence words
//! 3. amount of extracted text
//! 4. numbers cross-referenced against an independent text layer
//!
//! Confidence alone misses confident-but-wrong passes on numerically dense
//! documents. Check 4 catches garbled digits by comparing number tokens
//! with the document's text layer when one is supplied.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::ocr::types::{round1, ConfidenceSummary, TierResult};

/// Digit run with inner separators, bounded by digits on both ends
const NUMBER_PATTERN: &str = r"\d[\d,.\-/]+\d";

/// Characters removed before comparing numbers
const NUMBER_NOISE: &[char] = &['$', '€', '£', '¥', ','];

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    /// Minimum document mean confidence (0-100)
    pub min_confidence: f64,
    /// Maximum share of low-confidence words
    pub max_low_confidence_ratio: f64,
    /// Minimum trimmed text length in characters
    pub min_text_length: usize,
    /// Reference text must be longer than this to be cross-checked
    pub min_reference_length: usize,
    /// Reference must yield more than this many numbers to be cross-checked
    pub min_reference_numbers: usize,
    /// Minimum share of reference numbers found in the candidate
    pub min_number_match_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 80.0,
            max_low_confidence_ratio: 0.10,
            min_text_length: 50,
            min_reference_length: 100,
            min_reference_numbers: 3,
            min_number_match_ratio: 0.5,
        }
    }
}

/// Auditable gate decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityVerdict {
    pub accept: bool,
    pub reason: String,
}

impl QualityVerdict {
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            accept: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accept: false,
            reason: reason.into(),
        }
    }
}

/// Accept-or-escalate decision procedure
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGate {
    thresholds: QualityThresholds,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Assess a fast-tier result, optionally against a reference text.
    ///
    /// A result without a confidence block is judged as zero confidence.
    pub fn assess(&self, result: &TierResult, reference: Option<&str>) -> QualityVerdict {
        let t = &self.thresholds;
        let missing = ConfidenceSummary::default();
        let conf = result.confidence.as_ref().unwrap_or(&missing);

        if conf.mean < t.min_confidence {
            return QualityVerdict::reject(format!(
                "confidence {:.1}% < {}% threshold",
                conf.mean,
                percent_label(t.min_confidence)
            ));
        }

        if let Some(ratio) = conf.low_confidence_ratio() {
            if ratio > t.max_low_confidence_ratio {
                return QualityVerdict::reject(format!(
                    "{}% low-confidence words > {}% threshold",
                    (ratio * 100.0).round(),
                    percent_label(t.max_low_confidence_ratio * 100.0)
                ));
            }
        }

        let text_length = result.full_text.trim().chars().count();
        if text_length < t.min_text_length {
            return QualityVerdict::reject(format!(
                "extracted text too short ({} < {} chars)",
                text_length, t.min_text_length
            ));
        }

        if let Some(reference) = reference {
            if reference.trim().chars().count() > t.min_reference_length {
                if let Some(verdict) = self.cross_reference(reference, &result.full_text) {
                    return verdict;
                }
            }
        }

        QualityVerdict::accept(format!(
            "confidence {:.1}%, {}/{} low-conf words",
            conf.mean, conf.low_confidence_words, conf.total_words
        ))
    }

    /// Rejection when too few reference numbers appear in the candidate
    fn cross_reference(&self, reference: &str, candidate: &str) -> Option<QualityVerdict> {
        let t = &self.thresholds;
        let expected = extract_numbers(reference);
        if expected.len() <= t.min_reference_numbers {
            return None;
        }

        let found = extract_numbers(candidate);
        let matched = expected.iter().filter(|n| found.contains(*n)).count();
        let ratio = matched as f64 / expected.len() as f64;

        tracing::debug!(
            "Number cross-reference: {}/{} reference numbers found",
            matched,
            expected.len()
        );

        (ratio < t.min_number_match_ratio).then(|| {
            QualityVerdict::reject(format!(
                "number cross-ref: {}/{} ({}%) matched < {}% threshold",
                matched,
                expected.len(),
                (ratio * 100.0).round(),
                percent_label(t.min_number_match_ratio * 100.0)
            ))
        })
    }
}

fn number_regex() -> &'static Regex {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NUMBER_RE.get_or_init(|| Regex::new(NUMBER_PATTERN).expect("number pattern is valid"))
}

/// Distinct number-like tokens with currency symbols and thousands
/// separators removed
pub fn extract_numbers(text: &str) -> HashSet<String> {
    number_regex()
        .find_iter(text)
        .map(|m| m.as_str().replace(NUMBER_NOISE, ""))
        .collect()
}

/// Threshold for display: one decimal at most, no trailing `.0`
fn percent_label(value: f64) -> String {
    format!("{}", round1(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::TierKind;

    const BODY: &str = "ACME Supplies Ltd\nInvoice 2024-0042\nWidgets x4 19.99\nShipping 5.00\nTotal due 84.96";

    fn fast_result(text: &str, mean: f64, low: usize, total: usize) -> TierResult {
        TierResult::from_pages(
            TierKind::Fast,
            vec![text.to_string()],
            Some(ConfidenceSummary {
                mean,
                per_page: vec![mean],
                low_confidence_words: low,
                total_words: total,
            }),
        )
    }

    fn gate() -> QualityGate {
        QualityGate::default()
    }

    #[test]
    fn test_low_mean_rejects() {
        let verdict = gate().assess(&fast_result(BODY, 79.9, 0, 100), None);
        assert!(!verdict.accept);
        assert_eq!(verdict.reason, "confidence 79.9% < 80% threshold");
    }

    #[test]
    fn test_mean_boundary_passes_check_one() {
        let verdict = gate().assess(&fast_result(BODY, 80.0, 0, 100), None);
        assert!(verdict.accept);
        assert_eq!(verdict.reason, "confidence 80.0%, 0/100 low-conf words");
    }

    #[test]
    fn test_mean_check_wins_over_other_failures() {
        // Also too many low-confidence words and too little text
        let verdict = gate().assess(&fast_result("short", 50.0, 90, 100), None);
        assert!(verdict.reason.starts_with("confidence 50.0%"));
    }

    #[test]
    fn test_low_confidence_ratio_rejects_despite_high_mean() {
        let verdict = gate().assess(&fast_result(BODY, 95.0, 11, 100), None);
        assert!(!verdict.accept);
        assert_eq!(verdict.reason, "11% low-confidence words > 10% threshold");
    }

    #[test]
    fn test_low_confidence_ratio_boundary() {
        let verdict = gate().assess(&fast_result(BODY, 95.0, 10, 100), None);
        assert!(verdict.accept);
    }

    #[test]
    fn test_short_text_rejects() {
        let verdict = gate().assess(&fast_result("   Total 12.00   ", 95.0, 0, 2), None);
        assert!(!verdict.accept);
        assert_eq!(verdict.reason, "extracted text too short (11 < 50 chars)");
    }

    #[test]
    fn test_missing_confidence_block_rejects() {
        let mut result = fast_result(BODY, 95.0, 0, 10);
        result.confidence = None;
        assert!(!gate().assess(&result, None).accept);
    }

    #[test]
    fn test_number_cross_reference_rejects() {
        let reference = "Statement of account for March. Invoice totals listed below for reconciliation:\n\
            INV-1 1,250.00\nINV-2 980.50\nINV-3 3,400.75\nINV-4 120.99\nINV-5 45.10\n";
        let candidate = "Statement of account for March\nINV-1 1,250.00\nINV-2 98O.5O\nINV-3 3,4OO.75\nINV-4 l20.99\nINV-5 4S.10";

        let verdict = gate().assess(&fast_result(candidate, 92.0, 1, 60), Some(reference));
        assert!(!verdict.accept);
        assert!(verdict.reason.contains("1/5 (20%)"), "{}", verdict.reason);
    }

    #[test]
    fn test_number_cross_reference_accepts_when_digits_agree() {
        let reference = "Statement of account for March. Invoice totals listed below for reconciliation:\n\
            INV-1 1,250.00\nINV-2 980.50\nINV-3 3,400.75\nINV-4 120.99\nINV-5 45.10\n";
        let candidate = "Statement of account\nINV-1 $1250.00\nINV-2 980.50\nINV-3 3400.75\nINV-4 120.99\nINV-5 45.1O";

        let verdict = gate().assess(&fast_result(candidate, 92.0, 1, 60), Some(reference));
        assert!(verdict.accept, "{}", verdict.reason);
    }

    #[test]
    fn test_short_reference_is_ignored() {
        let verdict = gate().assess(&fast_result(BODY, 92.0, 0, 40), Some("1,000.00 2,000.00 3,000.00 4,000.00"));
        assert!(verdict.accept);
    }

    #[test]
    fn test_reference_with_few_numbers_is_ignored() {
        let reference = format!("{} 111.11 222.22 333.33", "Lorem ipsum dolor sit amet ".repeat(5));
        let verdict = gate().assess(&fast_result(BODY, 92.0, 0, 40), Some(&reference));
        assert!(verdict.accept);
    }

    #[test]
    fn test_extract_numbers() {
        let numbers = extract_numbers("Total $1,234.56 due 12/03/2024, ref 2024-0042, qty 7, 42 units, 1,234.56 again");
        let mut sorted: Vec<&str> = numbers.iter().map(String::as_str).collect();
        sorted.sort();
        assert_eq!(sorted, vec!["12/03/2024", "1234.56", "2024-0042"]);
    }

    #[test]
    fn test_extract_numbers_needs_three_chars() {
        assert!(extract_numbers("a 7 b 42 c").is_empty());
        assert_eq!(extract_numbers("100").len(), 1);
    }
}
