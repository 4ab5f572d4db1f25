//! OCR Worker Library
//!
//! Tiered OCR for rendered document pages. A fast word-level pass runs
//! first; a quality gate decides whether its output is trustworthy, and a
//! resident layout-aware model is brought in only when it is not.
//!
//! # Modules
//!
//! - `pages`: page image discovery (`page_1.png`, `page_2.png`, ...)
//! - `ocr`: recognition engines and the two tiers
//! - `geometry`: fragment boxes and row reconstruction
//! - `quality`: accept-or-escalate gate
//! - `worker`: NDJSON request loop and escalation pipeline

pub mod config;
pub mod error;
pub mod geometry;
pub mod ocr;
pub mod pages;
pub mod quality;
pub mod worker;

pub use error::{OcrError, Result};
