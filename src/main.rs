//! # Report Archive CLI (`rpt`)
//!
//! The `rpt` binary ingests scanned patient reports (PNG, JPEG, or PDF),
//! extracts their text, stores it in a per-patient archive, and shows
//! earlier reports for the same patient for comparison.
//!
//! ## Usage
//!
//! ```bash
//! rpt --config ./config/rpt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rpt ingest <file> --patient <name>` | Extract, archive, and compare one report |
//! | `rpt list --patient <name>` | List stored entries in filename order |
//! | `rpt history --patient <name>` | List stored entries oldest first |
//! | `rpt show --patient <name> <entry>` | Print one stored entry |
//! | `rpt link --patient <name> <entry>` | Print a download link for one entry |
//! | `rpt patients` | List patient archives |
//!
//! ## Examples
//!
//! ```bash
//! # Archive a scanned lab sheet
//! rpt ingest ./scans/labs.png --patient Alice
//!
//! # A PDF served with the wrong type, declared explicitly
//! rpt ingest ./inbox/upload.bin.pdf --patient Alice --content-type application/pdf
//!
//! # Machine-readable listing
//! rpt list --patient Alice --json
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use report_archive::archive::ArchiveStore;
use report_archive::config;
use report_archive::download::{download_anchor, download_filename};
use report_archive::extract::DocumentExtractor;
use report_archive::models::PatientId;
use report_archive::present;
use report_archive::session::{Session, SessionError, SessionState};
use report_archive::upload::{self, AcceptFilter};

/// Report Archive CLI: OCR and PDF text extraction into per-patient
/// report archives.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means all defaults.
#[derive(Parser)]
#[command(
    name = "rpt",
    about = "Report Archive: extract text from scanned patient reports and keep it per patient",
    version,
    long_about = "Report Archive reads an uploaded report (PNG, JPEG, or PDF), extracts its text \
    with OCR or the PDF text layer, stores the text under a folder for the patient, and shows \
    the patient's earlier reports for comparison."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rpt.toml`. When the file does not exist the
    /// built-in defaults are used (archive root `reports`, `tesseract`).
    #[arg(long, global = true, default_value = "./config/rpt.toml")]
    config: PathBuf,

    /// Override `[archive].root` from the config file.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract text from one report and archive it.
    ///
    /// Images are decoded and run through OCR; PDFs are read through their
    /// text layer. The choice follows the declared content type, which is
    /// guessed from the file extension unless `--content-type` is given.
    Ingest {
        /// Report file (png, jpg, jpeg, or pdf).
        file: PathBuf,

        /// Patient name. Without it nothing is processed.
        #[arg(long, default_value = "")]
        patient: String,

        /// Declared MIME type, overriding the extension.
        #[arg(long)]
        content_type: Option<String>,

        /// Also print the download link (base64 data URI).
        #[arg(long)]
        link: bool,
    },

    /// List a patient's stored entries in filename order.
    List {
        #[arg(long)]
        patient: String,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List a patient's stored entries oldest first.
    History {
        #[arg(long)]
        patient: String,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print one stored entry in full.
    Show {
        #[arg(long)]
        patient: String,

        /// Entry filename, e.g. `Alice_3fa9c1.txt`.
        entry: String,
    },

    /// Print the download link for one stored entry.
    Link {
        #[arg(long)]
        patient: String,

        /// Entry filename, e.g. `Alice_3fa9c1.txt`.
        entry: String,
    },

    /// List every patient archive and its entry count.
    Patients {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn require_patient(raw: &str) -> Result<PatientId> {
    match PatientId::parse(raw) {
        Some(p) => Ok(p),
        None => bail!("{}", present::AWAITING_NAME),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = config::load_or_default(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.archive.root = root;
    }
    let store = ArchiveStore::from_config(&cfg);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Ingest {
            file,
            patient,
            content_type,
            link,
        } => {
            let extractor = DocumentExtractor::from_config(&cfg);
            let mut session = Session::new(&store, &extractor, cfg.display.clone());
            if session.set_patient(&patient) == SessionState::AwaitingPatientName {
                present::print_awaiting_name(&mut out)?;
                return Ok(());
            }

            let filter = AcceptFilter::from_config(&cfg.upload)?;
            let upload = upload::load_upload(&file, content_type.as_deref(), &filter)?;
            present::print_processing(&mut out, &patient, &upload)?;

            match session.submit(Some(&upload)) {
                Ok(outcome) => present::print_outcome(&mut out, &outcome, link)?,
                Err(SessionError::PreconditionNotMet(_)) => present::print_awaiting_name(&mut out)?,
                Err(e) => {
                    out.flush()?;
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::List { patient, json } => {
            let listings = store.entry_listings(&require_patient(&patient)?)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&listings)?)?;
            } else {
                present::print_listings(&mut out, &listings)?;
            }
        }
        Commands::History { patient, json } => {
            let listings = store.entries_by_recency(&require_patient(&patient)?)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&listings)?)?;
            } else {
                present::print_listings(&mut out, &listings)?;
            }
        }
        Commands::Show { patient, entry } => {
            let content = store.read_entry(&require_patient(&patient)?, &entry)?;
            write!(out, "{}", content)?;
        }
        Commands::Link { patient, entry } => {
            let patient = require_patient(&patient)?;
            let content = store.read_entry(&patient, &entry)?;
            writeln!(
                out,
                "{}",
                download_anchor(&content, &download_filename(&patient))
            )?;
        }
        Commands::Patients { json } => {
            let summaries = store.list_patients()?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
            } else {
                present::print_patients(&mut out, &summaries)?;
            }
        }
    }

    Ok(())
}
