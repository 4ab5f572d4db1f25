//! Tesseract engine
//!
//! Runs the `tesseract` CLI once per page, asking for both the formatted
//! text (`txt`) and the word table (`tsv`) in the same invocation.
//!
//! ## Requirements
//!
//! - `tesseract` must be installed and available in PATH (or configured via
//!   `TESSERACT_PATH`)
//! - The traineddata for the configured language must be installed

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::engine::FastEngine;
use super::types::{FastPage, WordToken};
use crate::config::TesseractConfig;
use crate::error::OcrError;
use crate::pages::PageImage;

/// TSV level of word rows
const WORD_LEVEL: u32 = 5;

/// Number of TSV columns, `text` being the last
const TSV_COLUMNS: usize = 12;

/// Validate language code to prevent argument injection
pub fn validate_language(lang: &str) -> Result<(), OcrError> {
    // Language codes should be alphanumeric with optional underscore/plus (e.g., "eng", "eng+deu", "chi_sim")
    if lang.is_empty() || lang.len() > 20 {
        return Err(OcrError::InvalidConfig("Invalid language code length".to_string()));
    }
    for c in lang.chars() {
        if !c.is_ascii_alphanumeric() && c != '+' && c != '_' {
            return Err(OcrError::InvalidConfig(format!(
                "Invalid character in language code: {}",
                c
            )));
        }
    }
    Ok(())
}

/// Parse Tesseract TSV output into word tokens.
///
/// Only word-level rows are returned. Rows that do not parse are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<WordToken> {
    tsv.lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
            if columns.len() < TSV_COLUMNS - 1 {
                return None;
            }
            // Header row fails here
            let level: u32 = columns[0].trim().parse().ok()?;
            if level != WORD_LEVEL {
                return None;
            }
            let confidence = columns[10].trim().parse::<f64>().ok()? as i32;
            let text = columns.get(11).copied().unwrap_or("").trim();
            Some(WordToken::new(text, confidence))
        })
        .collect()
}

/// Tesseract CLI engine
pub struct TesseractCli {
    config: TesseractConfig,
    temp_dir: PathBuf,
}

impl TesseractCli {
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        validate_language(&config.language)?;
        Ok(Self {
            config,
            temp_dir: std::env::temp_dir(),
        })
    }

    /// Get tesseract version
    pub async fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            return Err(OcrError::Engine("tesseract not available".to_string()));
        }

        // Older releases print the version on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            stdout.to_string()
        };
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn run(&self, image: &Path, output_base: &Path) -> Result<(), OcrError> {
        let output = Command::new(&self.config.binary)
            .arg(image)
            .arg(output_base)
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("txt")
            .arg("tsv")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "Tesseract failed on {}: {}",
                image.display(),
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Run tesseract, then read back `(text, tsv)`
    async fn run_and_read(&self, image: &Path, output_base: &Path) -> Result<(String, String), OcrError> {
        self.run(image, output_base).await?;

        let text = tokio::fs::read_to_string(output_base.with_extension("txt"))
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to read tesseract text output: {}", e)))?;
        let tsv = tokio::fs::read_to_string(output_base.with_extension("tsv"))
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to read tesseract TSV output: {}", e)))?;

        Ok((text, tsv))
    }
}

#[async_trait]
impl FastEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        let result = Command::new(&self.config.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }

    async fn recognize(&self, page: &PageImage) -> Result<FastPage, OcrError> {
        let output_base = self
            .temp_dir
            .join(format!("ocr_page_{}", uuid::Uuid::new_v4()));

        let outputs = self.run_and_read(&page.path, &output_base).await;

        // Clean up output files (always happens, even on read error)
        let _ = tokio::fs::remove_file(output_base.with_extension("txt")).await;
        let _ = tokio::fs::remove_file(output_base.with_extension("tsv")).await;

        let (text, tsv) = outputs?;
        Ok(FastPage {
            text: text.trim().to_string(),
            words: parse_tsv(&tsv),
        })
    }
}

/// In-process Tesseract engine (libtesseract via the `tesseract` crate)
#[cfg(feature = "ocr-tesseract")]
pub struct TesseractLib {
    language: String,
}

#[cfg(feature = "ocr-tesseract")]
impl TesseractLib {
    pub fn new(config: &TesseractConfig) -> Result<Self, OcrError> {
        validate_language(&config.language)?;
        Ok(Self {
            language: config.language.clone(),
        })
    }
}

#[cfg(feature = "ocr-tesseract")]
#[async_trait]
impl FastEngine for TesseractLib {
    fn name(&self) -> &str {
        "libtesseract"
    }

    async fn is_available(&self) -> bool {
        tesseract::Tesseract::new(None, Some(&self.language)).is_ok()
    }

    async fn recognize(&self, page: &PageImage) -> Result<FastPage, OcrError> {
        let language = self.language.clone();
        let path = page.path.to_string_lossy().to_string();

        // libtesseract calls are blocking and CPU-bound
        tokio::task::spawn_blocking(move || {
            let engine_err = |e: &dyn std::fmt::Display| OcrError::Engine(e.to_string());

            let mut engine = tesseract::Tesseract::new(None, Some(&language))
                .map_err(|e| engine_err(&e))?
                .set_image(&path)
                .map_err(|e| engine_err(&e))?
                .recognize()
                .map_err(|e| engine_err(&e))?;

            let text = engine.get_text().map_err(|e| engine_err(&e))?;
            let tsv = engine.get_tsv_text(0).map_err(|e| engine_err(&e))?;

            Ok::<_, OcrError>(FastPage {
                text: text.trim().to_string(),
                words: parse_tsv(&tsv),
            })
        })
        .await
        .map_err(|e| OcrError::Engine(format!("Tesseract task failed: {}", e)))?
    }
}
