//! One upload-to-display cycle.
//!
//! A [`Session`] walks a single patient's upload through the pipeline:
//!
//! ```text
//! AwaitingPatientName ──name──▶ AwaitingUpload ──upload──▶ Extracting ──▶ Archived
//!                                                              │
//!                                                              └──error──▶ Failed
//! ```
//!
//! Extraction happens before anything is written, so a decode failure leaves
//! the archive untouched. A storage failure after a successful extraction
//! loses the extracted text; nothing is cached for a retry. Every failure is
//! terminal for that upload; submitting again starts a fresh cycle.

use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::archive::{storage_key, ArchiveStore, StorageError};
use crate::config::DisplayConfig;
use crate::extract::{ExtractError, TextExtractor};
use crate::models::{EntryId, PatientId, ReportEntry, Upload};

/// Hex digits in the random part of an entry id.
pub const SUFFIX_HEX_LEN: usize = 6;

/// Draws before giving up on finding an unused entry id.
const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPatientName,
    AwaitingUpload,
    Extracting,
    Archived,
    Failed,
}

/// Missing input that gates the workflow. Not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    PatientName,
    Upload,
}

/// Why an upload did not make it into the archive.
#[derive(Debug)]
pub enum SessionError {
    PreconditionNotMet(Precondition),
    Decode(ExtractError),
    Storage(StorageError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PreconditionNotMet(Precondition::PatientName) => {
                write!(f, "Please enter the patient name to begin.")
            }
            SessionError::PreconditionNotMet(Precondition::Upload) => {
                write!(f, "Please upload a report (image or PDF).")
            }
            SessionError::Decode(e) => write!(f, "{}", e),
            SessionError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::PreconditionNotMet(_) => None,
            SessionError::Decode(e) => Some(e),
            SessionError::Storage(e) => Some(e),
        }
    }
}

impl From<ExtractError> for SessionError {
    fn from(e: ExtractError) -> Self {
        SessionError::Decode(e)
    }
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Storage(e)
    }
}

/// A previously stored report shown next to the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonItem {
    pub filename: String,
    pub preview: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// The archive holds only the entry just written.
    NoPreviousReports,
    /// Every other entry, in lexical filename order.
    Previous(Vec<ComparisonItem>),
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub entry: ReportEntry,
    pub path: PathBuf,
    pub comparison: Comparison,
}

/// Cuts `content` to `limit` characters and appends `ellipsis` when it was
/// longer. Content of exactly `limit` characters is returned whole.
pub fn truncate_preview(content: &str, limit: usize, ellipsis: &str) -> (String, bool) {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => (format!("{}{}", &content[..cut], ellipsis), true),
        None => (content.to_string(), false),
    }
}

/// A fresh `{key}_{6 hex}` id. Not checked against the archive.
pub fn generate_entry_id(key: &str) -> EntryId {
    let hex = Uuid::new_v4().simple().to_string();
    EntryId::new(format!("{}_{}", key, &hex[..SUFFIX_HEX_LEN]))
}

pub struct Session<'a> {
    store: &'a ArchiveStore,
    extractor: &'a dyn TextExtractor,
    display: DisplayConfig,
    patient: Option<PatientId>,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(
        store: &'a ArchiveStore,
        extractor: &'a dyn TextExtractor,
        display: DisplayConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            display,
            patient: None,
            state: SessionState::AwaitingPatientName,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn patient(&self) -> Option<&PatientId> {
        self.patient.as_ref()
    }

    /// Sets (or clears, for a blank name) the patient being tracked.
    pub fn set_patient(&mut self, raw: &str) -> SessionState {
        self.patient = PatientId::parse(raw);
        self.state = if self.patient.is_some() {
            SessionState::AwaitingUpload
        } else {
            SessionState::AwaitingPatientName
        };
        self.state
    }

    /// Runs extract → store → list → read-back for one upload.
    pub fn submit(&mut self, upload: Option<&Upload>) -> Result<IngestOutcome, SessionError> {
        let patient = match &self.patient {
            Some(p) => p.clone(),
            None => {
                return Err(SessionError::PreconditionNotMet(Precondition::PatientName));
            }
        };
        let upload = match upload {
            Some(u) => u,
            None => {
                self.state = SessionState::AwaitingUpload;
                return Err(SessionError::PreconditionNotMet(Precondition::Upload));
            }
        };

        self.state = SessionState::Extracting;
        match self.run(patient, upload) {
            Ok(outcome) => {
                self.state = SessionState::Archived;
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn run(&self, patient: PatientId, upload: &Upload) -> Result<IngestOutcome, SessionError> {
        let entry_id = self.fresh_entry_id(&patient);

        let text = self.extractor.extract(upload)?;

        let path = self.store.append_entry(&patient, &entry_id, &text)?;
        let written = entry_id.filename();

        let mut previous = Vec::new();
        for filename in self.store.list_entries(&patient)? {
            if filename == written {
                continue;
            }
            let content = self.store.read_entry(&patient, &filename)?;
            let (preview, truncated) = truncate_preview(
                &content,
                self.display.preview_chars,
                &self.display.ellipsis,
            );
            previous.push(ComparisonItem {
                filename,
                preview,
                truncated,
            });
        }

        let comparison = if previous.is_empty() {
            Comparison::NoPreviousReports
        } else {
            Comparison::Previous(previous)
        };

        info!(
            patient = %patient,
            entry = %entry_id,
            content_type = %upload.content_type,
            "report archived"
        );

        Ok(IngestOutcome {
            entry: ReportEntry {
                owner: patient,
                entry_id,
                content: text,
            },
            path,
            comparison,
        })
    }

    /// Draws ids until one is not already on disk. After
    /// [`MAX_ID_ATTEMPTS`] collisions the last draw is used anyway.
    fn fresh_entry_id(&self, patient: &PatientId) -> EntryId {
        let key = storage_key(patient);
        let mut id = generate_entry_id(&key);
        for _ in 1..MAX_ID_ATTEMPTS {
            if !self.store.entry_exists(patient, &id) {
                break;
            }
            warn!(entry = %id, "entry id collision, drawing again");
            id = generate_entry_id(&key);
        }
        id
    }
}
