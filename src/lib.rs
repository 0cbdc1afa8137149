//! # Report Archive
//!
//! A local-first tool for turning scanned patient reports into searchable
//! text, kept in one folder per patient.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────────┐   ┌──────────────┐
//! │  Upload  │──▶│   Session   │──▶│   Extractor   │   │   Archive    │
//! │  filter  │   │  workflow   │   │ OCR / PDF txt │   │ reports/<p>/ │
//! └──────────┘   └──────┬──────┘   └───────────────┘   └──────▲───────┘
//!                       │          write, list, read back     │
//!                       └─────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rpt ingest ./scans/labs.png --patient Alice
//! rpt list --patient Alice
//! rpt show --patient Alice Alice_3fa9c1.txt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Image and PDF text extraction |
//! | [`ocr`] | OCR engine abstraction |
//! | [`archive`] | Per-patient filesystem storage |
//! | [`session`] | Upload-to-display workflow |
//! | [`upload`] | Accepted-type filter and content-type detection |
//! | [`download`] | Download link encoding |
//! | [`present`] | Terminal rendering |

pub mod archive;
pub mod config;
pub mod download;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod present;
pub mod session;
pub mod upload;
