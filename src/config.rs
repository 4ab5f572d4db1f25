//! Configuration management for the OCR worker

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::geometry::ROW_THRESHOLD;
use crate::ocr::layout::MIN_FRAGMENT_SCORE;
use crate::quality::QualityThresholds;

#[derive(Debug, Clone)]
pub struct Config {
    pub tesseract: TesseractConfig,
    pub layout: LayoutConfig,
    pub quality: QualityThresholds,
}

#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Tesseract executable (default: "tesseract" - uses PATH)
    pub binary: String,
    /// Recognition language, e.g. "eng" or "eng+deu"
    pub language: String,
    /// Page segmentation mode
    pub psm: u8,
}

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Resident helper program and its arguments
    pub command: Option<Vec<String>>,
    /// Fragments scoring below this are dropped
    pub min_score: f64,
    /// Vertical pixel distance that starts a new row
    pub row_threshold: i32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            psm: 3,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            command: None,
            min_score: MIN_FRAGMENT_SCORE,
            row_threshold: ROW_THRESHOLD,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tesseract: TesseractConfig::default(),
            layout: LayoutConfig::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl Config {
    /// Load from the process environment.
    ///
    /// Any malformed value fails the whole load; nothing is silently
    /// replaced by its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let quality_defaults = QualityThresholds::default();

        Ok(Config {
            tesseract: TesseractConfig {
                binary: lookup("TESSERACT_PATH").unwrap_or_else(|| "tesseract".to_string()),
                language: lookup("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
                psm: parse_var(&lookup, "TESSERACT_PSM", 3)?,
            },
            layout: LayoutConfig {
                command: lookup("OCR_LAYOUT_COMMAND").and_then(|raw| split_command(&raw)),
                min_score: parse_var(&lookup, "OCR_LAYOUT_MIN_SCORE", MIN_FRAGMENT_SCORE)?,
                row_threshold: parse_var(&lookup, "OCR_ROW_THRESHOLD", ROW_THRESHOLD)?,
            },
            quality: QualityThresholds {
                min_confidence: parse_var(&lookup, "OCR_MIN_CONFIDENCE", quality_defaults.min_confidence)?,
                max_low_confidence_ratio: parse_var(
                    &lookup,
                    "OCR_MAX_LOW_CONFIDENCE_RATIO",
                    quality_defaults.max_low_confidence_ratio,
                )?,
                min_text_length: parse_var(&lookup, "OCR_MIN_TEXT_LENGTH", quality_defaults.min_text_length)?,
                min_number_match_ratio: parse_var(
                    &lookup,
                    "OCR_MIN_NUMBER_MATCH_RATIO",
                    quality_defaults.min_number_match_ratio,
                )?,
                ..quality_defaults
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

/// Whitespace-split a command line; `None` when it is blank
pub fn split_command(raw: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}
