//! # digitprobe-core
//!
//! **Does this digit stream look like noise?**
//!
//! `digitprobe-core` ingests a sequence of symbols (decimal digits of a
//! constant, or integer draws reduced modulo a declared alphabet), runs a fixed
//! battery of statistical metrics over it, and packages the results into a
//! reproducible JSON report. Reports from several sources can then be compared
//! against a baseline and ranked by a versioned AnomalyScore.
//!
//! ## Quick Start
//!
//! ```no_run
//! use digitprobe_core::{Mode, ProbeConfig, SymbolSequence, assemble};
//!
//! let seq = SymbolSequence::from_bytes(b"31415926535897932384", Mode::Digits, None)?;
//! let report = assemble(&seq, &ProbeConfig::default())?;
//! println!("chi2 = {:.3}, schur z = {:+.2}", report.chi_square, report.schur.z);
//! # Ok::<(), digitprobe_core::ProbeError>(())
//! ```
//!
//! ## Architecture
//!
//! Input → [`SymbolSequence`] → metric battery (`digitprobe-tests`) →
//! [`AnalysisReport`] → [`compare`] → ranked [`Comparison`]
//!
//! Weak metrics (tiny samples, constant input) never fail a run: they carry a
//! sentinel value plus a [`ReportNote`] in the report.

pub mod compare;
pub mod config;
pub mod error;
pub mod report;
pub mod sequence;

pub use compare::{
    Comparison, ComparisonRow, LabeledReport, MODEL_ID, MODEL_VERSION, ScoringConfig, Severity,
    compare,
};
pub use config::{ProbeConfig, SchurConfig};
pub use error::{ProbeError, Result};
pub use report::{AnalysisReport, NoteKind, ReportNote, SCHEMA_VERSION, assemble};
pub use sequence::{DIGIT_ALPHABET, Mode, ModeTag, SymbolSequence, sha256_hex};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
