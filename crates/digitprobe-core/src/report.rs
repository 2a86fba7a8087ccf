//! Analysis report assembly and persistence.
//!
//! [`assemble`] runs the metric battery over a [`SymbolSequence`] and packages
//! the results into an [`AnalysisReport`]: a fixed-field record whose maps
//! enumerate every key up front (`0..M-1` for per-symbol data, `1..5` for
//! autocorrelation lags, `1..3` for n-gram orders). Reports serialize to
//! pretty JSON; the same input and configuration always produce byte-identical
//! output.

use std::collections::BTreeMap;
use std::path::Path;

use digitprobe_tests::{Battery, Flag, FlagKind, MAX_LAG, MAX_NGRAM_ORDER, run_battery};
use serde::{Deserialize, Serialize};

use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::sequence::{ModeTag, SymbolSequence};

/// Current report schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Kind of a non-fatal condition recorded in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    LowConfidence,
    Degenerate,
}

/// Structured note explaining a weak or sentinel metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportNote {
    pub kind: NoteKind,
    pub metric: String,
    pub message: String,
}

impl From<&Flag> for ReportNote {
    fn from(flag: &Flag) -> Self {
        Self {
            kind: match flag.kind {
                FlagKind::LowConfidence => NoteKind::LowConfidence,
                FlagKind::Degenerate => NoteKind::Degenerate,
            },
            metric: flag.metric.to_string(),
            message: flag.message.clone(),
        }
    }
}

/// Configuration echoed into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub schur_r_cap: usize,
    pub truncate: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapEntry {
    pub occurrences: u64,
    pub gaps: u64,
    /// `null` when the symbol occurs fewer than twice.
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunsEntry {
    #[serde(rename = "Z")]
    pub z: f64,
    pub p_two_tailed: f64,
    pub runs: u64,
    pub evens: u64,
    pub odds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchurEntry {
    #[serde(rename = "R")]
    pub r: usize,
    pub triples: u64,
    pub count: u64,
    pub expected: f64,
    pub fraction: f64,
    pub z: f64,
    /// Index `i` of the first pair where the additive relation holds.
    pub first_violation_index: Option<usize>,
    pub first_violation_pair: Option<[usize; 2]>,
}

/// Immutable result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub digitprobe_version: String,
    pub mode: ModeTag,
    #[serde(rename = "N")]
    pub n: usize,
    pub alphabet: u32,
    pub max_observed: Option<i64>,
    pub config: ReportConfig,
    pub chi_square: f64,
    pub chi_square_p: f64,
    pub expected_per_bin: f64,
    pub counts: BTreeMap<u32, u64>,
    pub zscores: BTreeMap<u32, f64>,
    pub gaps: BTreeMap<u32, GapEntry>,
    pub runs: RunsEntry,
    pub autocorr: BTreeMap<u32, f64>,
    pub autocorr_max_abs: f64,
    pub compress_ratio: f64,
    pub ngram: BTreeMap<u32, f64>,
    pub ngram_baseline: f64,
    pub schur: SchurEntry,
    pub notes: Vec<ReportNote>,
    pub source_sha256: String,
}

/// Run the battery over `seq` and package the result.
pub fn assemble(seq: &SymbolSequence, config: &ProbeConfig) -> Result<AnalysisReport> {
    config.validate()?;
    seq.mode().validate()?;

    let symbols = match config.truncate {
        Some(n) => &seq.symbols()[..n.min(seq.len())],
        None => seq.symbols(),
    };
    if symbols.is_empty() {
        return Err(ProbeError::contract("symbol sequence is empty"));
    }

    let alphabet = seq.alphabet();
    let battery = run_battery(
        symbols,
        alphabet,
        seq.mode().text_encoding(),
        config.schur.r_cap,
    );

    let report = package(seq, symbols.len(), config, &battery);
    for note in &report.notes {
        match note.kind {
            NoteKind::LowConfidence => log::warn!("{}: {}", note.metric, note.message),
            NoteKind::Degenerate => log::info!("{}: {}", note.metric, note.message),
        }
    }
    log::info!(
        "assembled {} report: N={} M={} chi2={:.3} schur z={:+.2}",
        report.mode,
        report.n,
        report.alphabet,
        report.chi_square,
        report.schur.z
    );
    Ok(report)
}

fn package(
    seq: &SymbolSequence,
    n: usize,
    config: &ProbeConfig,
    battery: &Battery,
) -> AnalysisReport {
    let dist = &battery.distribution;
    let schur = &battery.schur;

    let counts = (0u32..).zip(dist.counts.iter().copied()).collect();
    let zscores = (0u32..).zip(dist.zscores.iter().copied()).collect();
    let gaps = (0u32..)
        .zip(battery.gaps.per_symbol.iter().map(|g| GapEntry {
            occurrences: g.occurrences,
            gaps: g.gaps,
            mean: g.mean,
        }))
        .collect();
    let autocorr = battery
        .autocorrelation
        .lags
        .iter()
        .map(|l| (l.lag as u32, l.correlation))
        .collect();
    let ngram = battery
        .ngram
        .orders
        .iter()
        .map(|o| (o.order as u32, o.accuracy))
        .collect();

    AnalysisReport {
        schema_version: SCHEMA_VERSION,
        digitprobe_version: crate::VERSION.to_string(),
        mode: seq.mode().tag(),
        n,
        alphabet: seq.alphabet(),
        max_observed: seq.max_observed(),
        config: ReportConfig {
            schur_r_cap: config.schur.r_cap,
            truncate: config.truncate,
        },
        chi_square: dist.chi_square,
        chi_square_p: dist.p_value,
        expected_per_bin: dist.expected_per_bin,
        counts,
        zscores,
        gaps,
        runs: RunsEntry {
            z: battery.runs.z,
            p_two_tailed: battery.runs.p_two_tailed,
            runs: battery.runs.runs,
            evens: battery.runs.evens,
            odds: battery.runs.odds,
        },
        autocorr,
        autocorr_max_abs: battery.autocorrelation.max_abs_correlation,
        compress_ratio: battery.compression.ratio,
        ngram,
        ngram_baseline: battery.ngram.baseline,
        schur: SchurEntry {
            r: schur.r,
            triples: schur.triples,
            count: schur.count,
            expected: schur.expected,
            fraction: schur.fraction,
            z: schur.z,
            first_violation_index: schur.first_violation.map(|(i, _)| i),
            first_violation_pair: schur.first_violation.map(|(i, j)| [i, j]),
        },
        notes: battery.flags().map(ReportNote::from).collect(),
        source_sha256: seq.source_sha256().to_string(),
    }
}

/// True when the map's keys are exactly `keys`, in order.
fn has_keys<V>(map: &BTreeMap<u32, V>, keys: impl Iterator<Item = u32>) -> bool {
    map.keys().copied().eq(keys)
}

impl AnalysisReport {
    /// Largest |ρ| over lags 1..5.
    pub fn max_abs_autocorr(&self) -> f64 {
        self.autocorr.values().map(|v| v.abs()).fold(0.0, f64::max)
    }

    /// Best n-gram accuracy over orders 1..3.
    pub fn ngram_best(&self) -> f64 {
        self.ngram.values().copied().fold(0.0, f64::max)
    }

    /// Chi-square degrees of freedom, `M - 1`.
    pub fn degrees_of_freedom(&self) -> u32 {
        self.alphabet.saturating_sub(1)
    }

    pub fn low_confidence(&self) -> bool {
        self.notes.iter().any(|n| n.kind == NoteKind::LowConfidence)
    }

    /// Stable artifact file stem derived from fingerprint and configuration.
    pub fn artifact_key(&self) -> String {
        let sha = self.source_sha256.get(..16).unwrap_or(&self.source_sha256);
        format!(
            "{sha}-{}-m{}-r{}-n{}",
            self.mode, self.alphabet, self.config.schur_r_cap, self.n
        )
    }

    /// Check the structural invariants a well-formed report must satisfy.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(ProbeError::contract(format!("malformed report: {msg}")));

        if self.alphabet < 2 {
            return bad(format!("alphabet {} < 2", self.alphabet));
        }
        if self.n == 0 {
            return bad("N is 0".to_string());
        }
        let m = self.alphabet;
        if !has_keys(&self.counts, 0..m) {
            return bad(format!("counts must have keys 0..{}", m - 1));
        }
        if !has_keys(&self.zscores, 0..m) {
            return bad(format!("zscores must have keys 0..{}", m - 1));
        }
        if !has_keys(&self.gaps, 0..m) {
            return bad(format!("gaps must have keys 0..{}", m - 1));
        }
        let total: u64 = self.counts.values().sum();
        if total != self.n as u64 {
            return bad(format!("counts sum to {total}, N is {}", self.n));
        }
        if !has_keys(&self.autocorr, 1..=MAX_LAG as u32) {
            return bad(format!("autocorr must have lags 1..{MAX_LAG}"));
        }
        if !has_keys(&self.ngram, 1..=MAX_NGRAM_ORDER as u32) {
            return bad(format!("ngram must have orders 1..{MAX_NGRAM_ORDER}"));
        }
        if self.chi_square < 0.0 {
            return bad(format!("chi_square {} is negative", self.chi_square));
        }
        if !(0.0..=1.0).contains(&self.schur.fraction) {
            return bad(format!("schur.fraction {} outside [0, 1]", self.schur.fraction));
        }
        if !(self.compress_ratio > 0.0 && self.compress_ratio <= 1.0) {
            return bad(format!("compress_ratio {} outside (0, 1]", self.compress_ratio));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProbeError::Serialization(e.to_string()))
    }

    /// Parse and validate a report. Missing or malformed fields are contract violations.
    pub fn from_json(text: &str) -> Result<Self> {
        let report: Self = serde_json::from_str(text)
            .map_err(|e| ProbeError::contract(format!("malformed report: {e}")))?;
        report.validate()?;
        Ok(report)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json_pretty()?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| ProbeError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))?;
        Self::from_json(&text)
    }
}
