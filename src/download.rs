//! Downloadable copy of an extracted report.
//!
//! The copy is a base64 `data:` URI so it can be embedded in a page or
//! pasted into a browser without touching the archive again.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::models::PatientId;

/// MIME type used in the data URI.
pub const DOWNLOAD_MIME: &str = "file/txt";

pub fn download_data_uri(text: &str) -> String {
    format!("data:{};base64,{}", DOWNLOAD_MIME, STANDARD.encode(text.as_bytes()))
}

/// Suggested filename, `{patient}_report.txt`.
pub fn download_filename(patient: &PatientId) -> String {
    format!("{}_report.txt", patient)
}

/// HTML anchor that downloads `text` as `filename`.
pub fn download_anchor(text: &str, filename: &str) -> String {
    format!(
        r#"<a href="{}" download="{}">Download This Report</a>"#,
        download_data_uri(text),
        filename.replace('"', "&quot;")
    )
}
