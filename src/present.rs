//! Terminal rendering for the `rpt` CLI.
//!
//! Everything is written to a caller-supplied writer so stdout stays the
//! only place results go and tests can capture the text.

use std::io::{self, Write};

use crate::download::{download_anchor, download_filename};
use crate::models::{ArchiveSummary, EntryListing, Upload};
use crate::session::{Comparison, IngestOutcome};

pub const AWAITING_NAME: &str = "Please enter the patient name to begin.";
pub const NO_PREVIOUS: &str = "No previous reports found yet for this patient.";

pub fn print_awaiting_name(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "warning: {}", AWAITING_NAME)
}

pub fn print_processing(out: &mut impl Write, patient: &str, upload: &Upload) -> io::Result<()> {
    writeln!(out, "Tracking reports for: {}", patient)?;
    writeln!(
        out,
        "Processing the uploaded report: {} ({})",
        upload.filename, upload.content_type
    )
}

pub fn print_outcome(out: &mut impl Write, outcome: &IngestOutcome, link: bool) -> io::Result<()> {
    writeln!(out, "--- Extracted Report Text ---")?;
    writeln!(out, "{}", outcome.entry.content)?;
    writeln!(out)?;

    writeln!(
        out,
        "Report saved successfully under: {}",
        outcome.path.display()
    )?;
    let filename = download_filename(&outcome.entry.owner);
    writeln!(out, "download: {}", filename)?;
    if link {
        writeln!(out, "{}", download_anchor(&outcome.entry.content, &filename))?;
    }
    writeln!(out)?;

    writeln!(out, "--- Previous Reports for Comparison ---")?;
    match &outcome.comparison {
        Comparison::NoPreviousReports => writeln!(out, "{}", NO_PREVIOUS)?,
        Comparison::Previous(items) => {
            for item in items {
                if item.truncated {
                    writeln!(out, "[{}] (preview)", item.filename)?;
                } else {
                    writeln!(out, "[{}]", item.filename)?;
                }
                writeln!(out, "{}", item.preview)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

pub fn print_listings(out: &mut impl Write, listings: &[EntryListing]) -> io::Result<()> {
    writeln!(out, "{:<32} {:>10}  MODIFIED", "ENTRY", "BYTES")?;
    for l in listings {
        writeln!(
            out,
            "{:<32} {:>10}  {}",
            l.filename,
            l.size_bytes,
            l.modified_at.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
    }
    Ok(())
}

pub fn print_patients(out: &mut impl Write, summaries: &[ArchiveSummary]) -> io::Result<()> {
    writeln!(out, "{:<32} ENTRIES", "PATIENT")?;
    for s in summaries {
        writeln!(out, "{:<32} {}", s.key, s.entries)?;
    }
    Ok(())
}
