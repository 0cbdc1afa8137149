//! Upload intake at the presentation boundary.
//!
//! Applies the accepted-type filter (png, jpg, jpeg, pdf by default) and
//! determines the declared content-type of a file. The workflow itself does
//! not re-check the type; whatever passes here goes straight to extraction.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::config::UploadConfig;
use crate::models::Upload;

/// Compiles filename patterns, matched case-insensitively.
pub fn build_accept_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

pub struct AcceptFilter {
    set: GlobSet,
    patterns: Vec<String>,
}

impl AcceptFilter {
    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        Ok(Self {
            set: build_accept_set(&config.accepted_globs)?,
            patterns: config.accepted_globs.clone(),
        })
    }

    /// Matches on the file name only, never the directory part.
    pub fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.set.is_match(Path::new(name)))
            .unwrap_or(false)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// MIME type implied by the file extension, `application/octet-stream`
/// when unknown.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Reads a file into an [`Upload`] after the accepted-type check.
///
/// `declared_type` overrides the extension-derived type, the same way a
/// browser-supplied type would.
pub fn load_upload(
    path: &Path,
    declared_type: Option<&str>,
    filter: &AcceptFilter,
) -> Result<Upload> {
    if !filter.accepts(path) {
        bail!(
            "{} is not an accepted report type (accepted: {})",
            path.display(),
            filter.patterns().join(", ")
        );
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read upload: {}", path.display()))?;

    let content_type = match declared_type {
        Some(t) => t.to_string(),
        None => content_type_for(path),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Upload {
        bytes,
        content_type,
        filename,
    })
}
