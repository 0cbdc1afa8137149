//! OCR engine abstraction.
//!
//! The archive treats OCR as an opaque capability: a decoded image goes in,
//! text comes out. [`TesseractCli`] shells out to the `tesseract`
//! executable; tests plug in their own [`OcrEngine`].

use image::{DynamicImage, ImageFormat};
use std::process::Command;
use tracing::debug;

use crate::config::OcrConfig;
use crate::extract::ExtractError;

/// Recognises text in a decoded raster image.
pub trait OcrEngine: Send + Sync {
    /// Short engine identifier used in logs.
    fn name(&self) -> &str;

    /// Returns the recognised text verbatim (no trimming).
    fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractError>;
}

/// Runs the `tesseract` command-line tool on a temporary PNG copy of the
/// image and reads the result from its stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    language: String,
    extra_args: Vec<String>,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            extra_args: config.extra_args.clone(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        let mut input = tempfile::Builder::new()
            .prefix("rpt-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Ocr(format!("failed to create temp file: {}", e)))?;
        image
            .write_to(input.as_file_mut(), ImageFormat::Png)
            .map_err(|e| ExtractError::Ocr(format!("failed to write temp image: {}", e)))?;

        debug!(command = %self.command, lang = %self.language, "running OCR");
        let output = Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(&self.extra_args)
            .output()
            .map_err(|e| ExtractError::Ocr(format!("failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
