//! Text extraction for uploaded report documents (images and PDFs).
//!
//! The caller supplies bytes plus the declared content-type; this module
//! returns plain UTF-8 text. Dispatch is driven by the declared type only:
//! exactly `application/pdf` goes to the PDF text layer, everything else is
//! decoded as a raster image and handed to an [`OcrEngine`].

use std::panic;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Upload;
use crate::ocr::{OcrEngine, TesseractCli};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";

/// Extraction error. Every variant means the upload could not be turned
/// into text; none of them are retried.
#[derive(Debug)]
pub enum ExtractError {
    /// Bytes are not a decodable raster image.
    Image(String),
    /// Bytes are not a readable PDF.
    Pdf(String),
    /// The OCR engine could not be run or rejected the image.
    Ocr(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Image(e) => write!(f, "image decoding failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ocr(e) => write!(f, "OCR failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Decodes `bytes` as an image and returns the text recognised by `ocr`.
pub fn extract_from_image(bytes: &[u8], ocr: &dyn OcrEngine) -> Result<String, ExtractError> {
    let image = image::load_from_memory(bytes).map_err(|e| ExtractError::Image(e.to_string()))?;
    debug!(
        width = image.width(),
        height = image.height(),
        engine = ocr.name(),
        "decoded image for OCR"
    );
    ocr.recognize(&image)
}

/// Line break `pdf-extract` writes at the start of every page.
const PAGE_BREAK: &str = "\n\n";

/// Opens `bytes` as a PDF and concatenates the text layer of every page in
/// page order, with nothing inserted between pages.
///
/// `pdf-extract` panics on some malformed documents (a content stream that
/// uses a font the page never declares, for one). Those panics are caught
/// and reported as [`ExtractError::Pdf`].
pub fn extract_from_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string()))?,
        Err(_) => {
            warn!("PDF parser panicked on malformed input");
            return Err(ExtractError::Pdf("malformed PDF".to_string()));
        }
    };
    debug!(pages = pages.len(), "read PDF text layer");
    Ok(pages
        .iter()
        .map(|page| page.strip_prefix(PAGE_BREAK).unwrap_or(page.as_str()))
        .collect())
}

/// Whether a declared content-type routes to the PDF extractor.
pub fn is_pdf(content_type: &str) -> bool {
    content_type == MIME_PDF
}

/// Converts an upload into text.
///
/// The session workflow only talks to this trait, so tests can swap in an
/// extractor that does not need a real OCR engine.
pub trait TextExtractor {
    fn extract_from_image(&self, bytes: &[u8]) -> Result<String, ExtractError>;

    fn extract_from_pdf(&self, bytes: &[u8]) -> Result<String, ExtractError>;

    /// Dispatches on the declared content-type. No content sniffing: a PDF
    /// labelled as an image goes to the image path and fails there.
    fn extract(&self, upload: &Upload) -> Result<String, ExtractError> {
        if is_pdf(&upload.content_type) {
            debug!(file = %upload.filename, "dispatching to PDF extractor");
            self.extract_from_pdf(&upload.bytes)
        } else {
            debug!(
                file = %upload.filename,
                content_type = %upload.content_type,
                "dispatching to image extractor"
            );
            self.extract_from_image(&upload.bytes)
        }
    }
}

/// The production extractor: `pdf-extract` for PDFs, an [`OcrEngine`] for
/// images.
pub struct DocumentExtractor {
    ocr: Box<dyn OcrEngine>,
}

impl DocumentExtractor {
    pub fn new(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Builds the extractor with the OCR executable named in `[ocr]`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Box::new(TesseractCli::from_config(&config.ocr)))
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract_from_image(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        extract_from_image(bytes, self.ocr.as_ref())
    }

    fn extract_from_pdf(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        extract_from_pdf(bytes)
    }
}
