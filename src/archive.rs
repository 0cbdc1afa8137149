//! Per-patient report storage on the local filesystem.
//!
//! Layout:
//!
//! ```text
//! <root>/
//! └── <patient_key>/
//!     ├── <patient_key>_3fa9c1.txt
//!     └── <patient_key>_b07e22.txt
//! ```
//!
//! One directory per patient, one UTF-8 text file per ingested report. The
//! file content is the extracted text verbatim: no header, no sidecar, no
//! index. Every listing re-reads the directory.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::{ArchiveSummary, EntryId, EntryListing, PatientId};

/// Number of hex digits of the name digest appended to sanitised keys.
const KEY_DIGEST_LEN: usize = 8;

/// Storage failure. Carries the path involved and the underlying I/O error.
#[derive(Debug)]
pub enum StorageError {
    CreateDir { path: PathBuf, source: io::Error },
    Write { path: PathBuf, source: io::Error },
    Read { path: PathBuf, source: io::Error },
    List { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::CreateDir { path, source } => {
                write!(f, "failed to create {}: {}", path.display(), source)
            }
            StorageError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            StorageError::Read { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            StorageError::List { path, source } => {
                write!(f, "failed to list {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::CreateDir { source, .. }
            | StorageError::Write { source, .. }
            | StorageError::Read { source, .. }
            | StorageError::List { source, .. } => Some(source),
        }
    }
}

fn is_unsafe_char(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Maps a patient name to its directory name.
///
/// Names that are already safe path segments are used verbatim. Anything
/// else has each offending character replaced by `_` and gets a short
/// SHA-256 prefix of the original name appended, so two different unsafe
/// names cannot land in the same directory.
pub fn storage_key(patient: &PatientId) -> String {
    let name = patient.as_str();
    let safe = name != "." && name != ".." && !name.chars().any(is_unsafe_char);
    if safe {
        return name.to_string();
    }

    let sanitised: String = name
        .chars()
        .map(|c| if is_unsafe_char(c) { '_' } else { c })
        .collect();
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    format!("{}-{}", sanitised, &digest[..KEY_DIGEST_LEN])
}

/// Filesystem-backed archive rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.archive.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_dir(&self, patient: &PatientId) -> PathBuf {
        self.root.join(storage_key(patient))
    }

    /// Creates the patient's directory if absent. Idempotent.
    pub fn ensure_archive(&self, patient: &PatientId) -> Result<PathBuf, StorageError> {
        let dir = self.archive_dir(patient);
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "archive ready");
        Ok(dir)
    }

    /// Writes `content` to `{entry_id}.txt` in the patient's archive and
    /// returns the file path. An existing file with the same name is
    /// overwritten.
    pub fn append_entry(
        &self,
        patient: &PatientId,
        entry_id: &EntryId,
        content: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.ensure_archive(patient)?;
        let path = dir.join(entry_id.filename());
        fs::write(&path, content.as_bytes()).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes = content.len(), "stored report entry");
        Ok(path)
    }

    pub fn entry_exists(&self, patient: &PatientId, entry_id: &EntryId) -> bool {
        self.archive_dir(patient).join(entry_id.filename()).exists()
    }

    /// Every file name in the patient's archive, sorted lexically.
    ///
    /// Sub-directories are skipped. A missing archive directory is an
    /// error; callers list only after a successful write.
    pub fn list_entries(&self, patient: &PatientId) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self
            .entry_listings(patient)?
            .into_iter()
            .map(|l| l.filename)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Reads one entry in full. `filename` must be a bare file name.
    pub fn read_entry(&self, patient: &PatientId, filename: &str) -> Result<String, StorageError> {
        let path = self.archive_dir(patient).join(filename);
        if Path::new(filename).file_name() != Some(OsStr::new(filename)) {
            return Err(StorageError::Read {
                path,
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "entry name must not contain path components",
                ),
            });
        }
        fs::read_to_string(&path).map_err(|source| StorageError::Read { path, source })
    }

    /// Entry metadata, in lexical filename order.
    pub fn entry_listings(&self, patient: &PatientId) -> Result<Vec<EntryListing>, StorageError> {
        let dir = self.archive_dir(patient);
        let list_err = |source: io::Error| StorageError::List {
            path: dir.clone(),
            source,
        };

        let mut listings = Vec::new();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| list_err(e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| list_err(e.into()))?;
            let modified = metadata.modified().map_err(list_err)?;
            listings.push(EntryListing {
                filename: entry.file_name().to_string_lossy().to_string(),
                size_bytes: metadata.len(),
                modified_at: DateTime::<Utc>::from(modified),
            });
        }

        // Walk order is by raw OS name; listings are ordered by the lossy string.
        listings.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(listings)
    }

    /// Entries ordered by modification time, oldest first; ties fall back
    /// to filename order.
    pub fn entries_by_recency(
        &self,
        patient: &PatientId,
    ) -> Result<Vec<EntryListing>, StorageError> {
        let mut listings = self.entry_listings(patient)?;
        listings.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(listings)
    }

    /// Every patient archive under the root. A missing root means no
    /// patients yet.
    pub fn list_patients(&self) -> Result<Vec<ArchiveSummary>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| StorageError::List {
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let count = WalkDir::new(entry.path())
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| !e.file_type().is_dir())
                .count();
            summaries.push(ArchiveSummary {
                key: entry.file_name().to_string_lossy().to_string(),
                entries: count,
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patient(name: &str) -> PatientId {
        PatientId::parse(name).unwrap()
    }

    #[test]
    fn ensure_archive_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path().join("reports"));
        let alice = patient("Alice");

        let first = store.ensure_archive(&alice).unwrap();
        let second = store.ensure_archive(&alice).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());

        let dirs: Vec<_> = fs::read_dir(tmp.path().join("reports"))
            .unwrap()
            .collect();
        assert_eq!(dirs.len(), 1);
    }

    #[test]
    fn ensure_archive_fails_when_path_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("reports");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("Alice"), "not a directory").unwrap();

        let err = ArchiveStore::new(&root)
            .ensure_archive(&patient("Alice"))
            .unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }));
    }

    #[test]
    fn append_then_read_round_trips_exactly() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let alice = patient("Alice");
        let text = "Hämoglobin 13.5 g/dL\r\n\tBP 120/80 ✓\n\n";

        let path = store
            .append_entry(&alice, &EntryId::new("Alice_0a1b2c"), text)
            .unwrap();
        assert_eq!(path, tmp.path().join("Alice").join("Alice_0a1b2c.txt"));
        assert_eq!(fs::read(&path).unwrap(), text.as_bytes());
        assert_eq!(store.read_entry(&alice, "Alice_0a1b2c.txt").unwrap(), text);
    }

    #[test]
    fn append_overwrites_on_collision() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let alice = patient("Alice");
        let id = EntryId::new("Alice_ffffff");

        store.append_entry(&alice, &id, "first").unwrap();
        store.append_entry(&alice, &id, "second").unwrap();
        assert_eq!(store.list_entries(&alice).unwrap().len(), 1);
        assert_eq!(store.read_entry(&alice, &id.filename()).unwrap(), "second");
    }

    #[test]
    fn list_entries_is_lexical() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let bob = patient("Bob");
        for stem in ["Bob_c00000", "Bob_0abcde", "Bob_9fffff", "Bob_a11111"] {
            store.append_entry(&bob, &EntryId::new(stem), stem).unwrap();
        }
        fs::create_dir(store.archive_dir(&bob).join("nested")).unwrap();

        let expected = vec![
            "Bob_0abcde.txt",
            "Bob_9fffff.txt",
            "Bob_a11111.txt",
            "Bob_c00000.txt",
        ];
        assert_eq!(store.list_entries(&bob).unwrap(), expected);
        assert_eq!(store.list_entries(&bob).unwrap(), expected);
    }

    #[test]
    fn listings_stay_at_the_archive_top_level() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let dana = patient("Dana");
        store
            .append_entry(&dana, &EntryId::new("Dana_0a0a0a"), "BP 121/81")
            .unwrap();
        let nested = store.archive_dir(&dana).join("scans");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("raw.txt"), "ignored").unwrap();

        let listings = store.entry_listings(&dana).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].filename, "Dana_0a0a0a.txt");
        assert_eq!(listings[0].size_bytes, 9);

        let patients = store.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].entries, 1);
    }

    #[test]
    fn list_entries_on_missing_archive_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = ArchiveStore::new(tmp.path())
            .list_entries(&patient("Nobody"))
            .unwrap_err();
        assert!(matches!(err, StorageError::List { .. }));
    }

    #[test]
    fn read_entry_rejects_path_components() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let alice = patient("Alice");
        store.ensure_archive(&alice).unwrap();

        let err = store.read_entry(&alice, "../secret.txt").unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }));
        let err = store.read_entry(&alice, "missing.txt").unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }));
    }

    #[test]
    fn safe_names_are_used_verbatim() {
        assert_eq!(storage_key(&patient("Alice")), "Alice");
        assert_eq!(storage_key(&patient("Mary Jane O'Neil")), "Mary Jane O'Neil");
        assert_eq!(storage_key(&patient("José")), "José");
    }

    #[test]
    fn unsafe_names_are_sanitised_and_disambiguated() {
        let slash = storage_key(&patient("a/b"));
        let colon = storage_key(&patient("a:b"));
        assert!(slash.starts_with("a_b-"));
        assert!(colon.starts_with("a_b-"));
        assert_ne!(slash, colon);
        assert_eq!(slash.len(), "a_b-".len() + KEY_DIGEST_LEN);

        let dots = storage_key(&patient(".."));
        assert!(dots.starts_with("..-"));
        assert!(!storage_key(&patient("../../etc")).contains('/'));
    }

    #[test]
    fn traversal_names_stay_under_root() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path().join("reports"));
        let sneaky = patient("../../outside");
        let dir = store.ensure_archive(&sneaky).unwrap();
        assert_eq!(dir.parent().unwrap(), tmp.path().join("reports"));
    }

    #[test]
    fn list_patients_counts_entries() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path().join("reports"));
        assert!(store.list_patients().unwrap().is_empty());

        store
            .append_entry(&patient("Bob"), &EntryId::new("Bob_000001"), "x")
            .unwrap();
        store
            .append_entry(&patient("Alice"), &EntryId::new("Alice_000001"), "x")
            .unwrap();
        store
            .append_entry(&patient("Alice"), &EntryId::new("Alice_000002"), "y")
            .unwrap();

        let summaries = store.list_patients().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, "Alice");
        assert_eq!(summaries[0].entries, 2);
        assert_eq!(summaries[1].key, "Bob");
        assert_eq!(summaries[1].entries, 1);
    }

    #[test]
    fn recency_order_breaks_ties_by_name() {
        let tmp = TempDir::new().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let alice = patient("Alice");
        store
            .append_entry(&alice, &EntryId::new("Alice_bbbbbb"), "1")
            .unwrap();
        store
            .append_entry(&alice, &EntryId::new("Alice_aaaaaa"), "2")
            .unwrap();

        let listings = store.entries_by_recency(&alice).unwrap();
        assert_eq!(listings.len(), 2);
        assert!(listings[0].modified_at <= listings[1].modified_at);
        if listings[0].modified_at == listings[1].modified_at {
            assert_eq!(listings[0].filename, "Alice_aaaaaa.txt");
        }
    }
}
