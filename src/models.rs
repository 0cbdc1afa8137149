//! Core data models used throughout the report archive.
//!
//! These types represent the patients, uploads, and stored report entries
//! that flow through the ingestion workflow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// File extension of every stored report entry.
pub const ENTRY_EXTENSION: &str = "txt";

/// A user-supplied patient name.
///
/// Only presence is checked: any name with at least one non-whitespace
/// character is accepted. Mapping to a filesystem-safe directory name
/// happens in [`crate::archive::storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientId(String);

impl PatientId {
    /// Returns `None` when the name is empty or only whitespace.
    ///
    /// Surrounding whitespace is dropped, and the trimmed name is the
    /// identity from then on: `" Alice "` shares `Alice`'s directory, gets
    /// `Alice_`-prefixed entry ids and downloads as `Alice_report.txt`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filename stem of a stored entry, `{patient_key}_{6 hex}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(stem: impl Into<String>) -> Self {
        Self(stem.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The on-disk filename, `{stem}.txt`.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.0, ENTRY_EXTENSION)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One uploaded document as handed over by the presentation layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// Declared MIME type; drives extractor dispatch.
    pub content_type: String,
    /// Declared filename, informational only.
    pub filename: String,
}

/// A report entry persisted in a patient's archive.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub owner: PatientId,
    pub entry_id: EntryId,
    pub content: String,
}

/// Filesystem facts about a stored entry, used by listings.
#[derive(Debug, Clone, Serialize)]
pub struct EntryListing {
    pub filename: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// A patient archive found under the archive root.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    /// Directory name (the storage key, not necessarily the typed name).
    pub key: String,
    pub entries: usize,
}
