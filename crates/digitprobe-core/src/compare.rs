//! Baseline comparison and anomaly ranking (`anomaly_score_v1`).
//!
//! Every non-baseline report becomes a [`ComparisonRow`]: per-metric deltas
//! against the baseline, normalized score components, a composite
//! AnomalyScore and a severity band. Rows are ranked deterministically.
//!
//! ## Delta policy
//!
//! | metric          | value                   | delta                     |
//! |-----------------|-------------------------|---------------------------|
//! | chi-square      | `chi_square`            | `value - baseline`        |
//! | compression     | `compress_ratio`        | `value / baseline - 1`    |
//! | runs            | `runs.Z`                | `value - baseline`        |
//! | autocorrelation | max \|ρ\| over lags 1..5 | `value - baseline`        |
//! | n-gram          | best accuracy, orders 1..3 | `value - baseline`     |
//! | SchurProbe      | `schur.z`               | `value - baseline`        |
//!
//! ## Score
//!
//! `component = |delta| / divisor` (chi-square additionally divided by the
//! baseline's `M - 1`), `score = Σ wᵢ·componentᵢ / Σ wᵢ`. The score is
//! monotonic in every component and exactly 0 for a report compared against
//! itself. Changing any constant in [`ScoringConfig`] is a behavioral change
//! and must bump [`MODEL_VERSION`].

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::report::AnalysisReport;

/// Scoring model identifier.
pub const MODEL_ID: &str = "anomaly_score_v1";
/// Scoring model version.
pub const MODEL_VERSION: u32 = 1;

/// Relative weight of each score component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub chi_square: f64,
    pub compression: f64,
    pub runs: f64,
    pub autocorr: f64,
    pub ngram: f64,
    pub schur: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            chi_square: 1.0,
            compression: 1.0,
            runs: 1.0,
            autocorr: 1.0,
            ngram: 1.0,
            schur: 1.0,
        }
    }
}

/// Versioned constants of the AnomalyScore and severity bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub model_id: String,
    pub model_version: u32,
    /// |Δchi²| per baseline degree of freedom mapped to component 1.
    pub chi_square_per_df_divisor: f64,
    /// Relative compression change mapped to component 1.
    pub compression_relative_divisor: f64,
    /// |Δ runs Z| mapped to component 1.
    pub runs_z_divisor: f64,
    /// |Δ max |ρ|| mapped to component 1.
    pub autocorr_divisor: f64,
    /// |Δ best n-gram accuracy| mapped to component 1.
    pub ngram_divisor: f64,
    /// |Δ Schur z| mapped to component 1.
    pub schur_z_divisor: f64,
    pub weights: ComponentWeights,
    /// Score at or above which a row is at least yellow.
    pub yellow_score: f64,
    /// Score at or above which a row is red.
    pub red_score: f64,
    /// Any single component at or above this is at least yellow.
    pub yellow_component: f64,
    /// Any single component at or above this is red.
    pub red_component: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_id: MODEL_ID.to_string(),
            model_version: MODEL_VERSION,
            chi_square_per_df_divisor: 0.5,
            compression_relative_divisor: 0.04,
            runs_z_divisor: 1.0,
            autocorr_divisor: 0.01,
            ngram_divisor: 0.01,
            schur_z_divisor: 1.0,
            weights: ComponentWeights::default(),
            yellow_score: 0.8,
            red_score: 1.8,
            yellow_component: 3.0,
            red_component: 6.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model_id != MODEL_ID {
            return Err(ProbeError::contract(format!(
                "scoring model '{}' is not supported (expected '{MODEL_ID}')",
                self.model_id
            )));
        }
        let divisors = [
            self.chi_square_per_df_divisor,
            self.compression_relative_divisor,
            self.runs_z_divisor,
            self.autocorr_divisor,
            self.ngram_divisor,
            self.schur_z_divisor,
        ];
        if divisors.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(ProbeError::contract("scoring divisors must be positive"));
        }
        let w = &self.weights;
        let weights = [w.chi_square, w.compression, w.runs, w.autocorr, w.ngram, w.schur];
        if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ProbeError::contract(
                "scoring weights must be non-negative with a positive sum",
            ));
        }
        if self.yellow_score > self.red_score || self.yellow_component > self.red_component {
            return Err(ProbeError::contract(
                "yellow thresholds must not exceed red thresholds",
            ));
        }
        Ok(())
    }

    /// Load and validate a scoring config from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| ProbeError::contract(format!("invalid scoring config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Severity band of a comparison row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// A metric value next to the baseline's.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricDelta {
    pub value: f64,
    pub baseline: f64,
    pub delta: f64,
}

impl MetricDelta {
    fn difference(value: f64, baseline: f64) -> Self {
        Self {
            value,
            baseline,
            delta: value - baseline,
        }
    }

    /// Relative change; falls back to the plain difference for a
    /// non-positive baseline.
    fn relative(value: f64, baseline: f64) -> Self {
        let delta = if baseline > 0.0 {
            value / baseline - 1.0
        } else {
            value - baseline
        };
        Self {
            value,
            baseline,
            delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub chi_square: MetricDelta,
    pub compress_ratio: MetricDelta,
    pub runs_z: MetricDelta,
    pub autocorr_max_abs: MetricDelta,
    pub ngram_best: MetricDelta,
    pub schur_z: MetricDelta,
}

impl MetricDeltas {
    pub fn between(report: &AnalysisReport, baseline: &AnalysisReport) -> Self {
        Self {
            chi_square: MetricDelta::difference(report.chi_square, baseline.chi_square),
            compress_ratio: MetricDelta::relative(report.compress_ratio, baseline.compress_ratio),
            runs_z: MetricDelta::difference(report.runs.z, baseline.runs.z),
            autocorr_max_abs: MetricDelta::difference(
                report.max_abs_autocorr(),
                baseline.max_abs_autocorr(),
            ),
            ngram_best: MetricDelta::difference(report.ngram_best(), baseline.ngram_best()),
            schur_z: MetricDelta::difference(report.schur.z, baseline.schur.z),
        }
    }
}

/// Normalized, non-negative score components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub chi_square: f64,
    pub compression: f64,
    pub runs: f64,
    pub autocorr: f64,
    pub ngram: f64,
    pub schur: f64,
}

fn normalized(delta: f64, divisor: f64) -> f64 {
    let c = delta.abs() / divisor;
    if c.is_finite() { c } else { 0.0 }
}

impl ScoreComponents {
    pub fn from_deltas(deltas: &MetricDeltas, baseline_df: u32, cfg: &ScoringConfig) -> Self {
        let df = baseline_df.max(1) as f64;
        Self {
            chi_square: normalized(deltas.chi_square.delta / df, cfg.chi_square_per_df_divisor),
            compression: normalized(deltas.compress_ratio.delta, cfg.compression_relative_divisor),
            runs: normalized(deltas.runs_z.delta, cfg.runs_z_divisor),
            autocorr: normalized(deltas.autocorr_max_abs.delta, cfg.autocorr_divisor),
            ngram: normalized(deltas.ngram_best.delta, cfg.ngram_divisor),
            schur: normalized(deltas.schur_z.delta, cfg.schur_z_divisor),
        }
    }

    pub fn max(&self) -> f64 {
        [
            self.chi_square,
            self.compression,
            self.runs,
            self.autocorr,
            self.ngram,
            self.schur,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    /// Weighted mean of the components.
    pub fn anomaly_score(&self, cfg: &ScoringConfig) -> f64 {
        let w = &cfg.weights;
        let total = w.chi_square + w.compression + w.runs + w.autocorr + w.ngram + w.schur;
        if total <= 0.0 {
            return 0.0;
        }
        (w.chi_square * self.chi_square
            + w.compression * self.compression
            + w.runs * self.runs
            + w.autocorr * self.autocorr
            + w.ngram * self.ngram
            + w.schur * self.schur)
            / total
    }
}

/// Severity from the composite score and the most extreme single component.
pub fn classify(score: f64, components: &ScoreComponents, cfg: &ScoringConfig) -> Severity {
    let worst = components.max();
    if score >= cfg.red_score || worst >= cfg.red_component {
        Severity::Red
    } else if score >= cfg.yellow_score || worst >= cfg.yellow_component {
        Severity::Yellow
    } else {
        Severity::Green
    }
}

/// A report with the label it is shown under.
#[derive(Debug, Clone)]
pub struct LabeledReport {
    pub label: String,
    pub report: AnalysisReport,
}

/// One ranked row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub label: String,
    #[serde(rename = "N")]
    pub n: usize,
    pub alphabet: u32,
    pub severity: Severity,
    pub score: f64,
    pub components: ScoreComponents,
    pub deltas: MetricDeltas,
    pub notes: Vec<String>,
}

impl ComparisonRow {
    pub fn new(labeled: &LabeledReport, baseline: &AnalysisReport, cfg: &ScoringConfig) -> Self {
        let report = &labeled.report;
        let deltas = MetricDeltas::between(report, baseline);
        let components = ScoreComponents::from_deltas(&deltas, baseline.degrees_of_freedom(), cfg);
        let score = components.anomaly_score(cfg);
        let severity = classify(score, &components, cfg);

        let mut notes = Vec::new();
        if report.alphabet != baseline.alphabet {
            log::warn!(
                "{}: alphabet {} differs from baseline alphabet {}",
                labeled.label,
                report.alphabet,
                baseline.alphabet
            );
            notes.push(format!(
                "alphabet {} differs from baseline {}",
                report.alphabet, baseline.alphabet
            ));
        }
        if report.low_confidence() {
            notes.push("report carries low-confidence notes".to_string());
        }

        Self {
            label: labeled.label.clone(),
            n: report.n,
            alphabet: report.alphabet,
            severity,
            score,
            components,
            deltas,
            notes,
        }
    }
}

/// Ranking order: score, |Schur z|, chi-square, max |ρ| (all descending), then label.
pub fn ranking_order(a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            b.deltas
                .schur_z
                .value
                .abs()
                .total_cmp(&a.deltas.schur_z.value.abs())
        })
        .then_with(|| b.deltas.chi_square.value.total_cmp(&a.deltas.chi_square.value))
        .then_with(|| {
            b.deltas
                .autocorr_max_abs
                .value
                .total_cmp(&a.deltas.autocorr_max_abs.value)
        })
        .then_with(|| a.label.cmp(&b.label))
}

pub fn rank_rows(rows: &mut [ComparisonRow]) {
    rows.sort_by(ranking_order);
}

/// Ranked comparison of several reports against one baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub model_id: String,
    pub model_version: u32,
    pub baseline: String,
    pub baseline_n: usize,
    pub rows: Vec<ComparisonRow>,
}

/// Compare `reports` against the one labeled `baseline_label`.
pub fn compare(
    reports: &[LabeledReport],
    baseline_label: &str,
    cfg: &ScoringConfig,
) -> Result<Comparison> {
    cfg.validate()?;
    if reports.len() < 2 {
        return Err(ProbeError::contract(format!(
            "comparison needs at least 2 reports, got {}",
            reports.len()
        )));
    }
    let mut seen = HashSet::new();
    for r in reports {
        if !seen.insert(r.label.as_str()) {
            return Err(ProbeError::contract(format!(
                "duplicate report label '{}'",
                r.label
            )));
        }
        r.report.validate().map_err(|e| match e {
            ProbeError::ContractViolation(msg) => {
                ProbeError::contract(format!("{}: {msg}", r.label))
            }
            other => other,
        })?;
    }
    let baseline = reports
        .iter()
        .find(|r| r.label == baseline_label)
        .ok_or_else(|| {
            ProbeError::contract(format!(
                "baseline '{baseline_label}' is not among the compared reports"
            ))
        })?;

    log::info!(
        "comparing {} report(s) against baseline {} ({MODEL_ID} v{MODEL_VERSION})",
        reports.len() - 1,
        baseline.label
    );
    let mut rows: Vec<ComparisonRow> = reports
        .iter()
        .filter(|r| r.label != baseline_label)
        .map(|r| ComparisonRow::new(r, &baseline.report, cfg))
        .collect();
    rank_rows(&mut rows);

    Ok(Comparison {
        model_id: cfg.model_id.clone(),
        model_version: cfg.model_version,
        baseline: baseline.label.clone(),
        baseline_n: baseline.report.n,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::report::assemble;
    use crate::sequence::{Mode, SymbolSequence};

    fn labeled(label: &str, symbols: Vec<u32>) -> LabeledReport {
        let seq = SymbolSequence::from_symbols(symbols, Mode::Digits).unwrap();
        LabeledReport {
            label: label.to_string(),
            report: assemble(&seq, &ProbeConfig::default()).unwrap(),
        }
    }

    fn lcg_digits(n: usize, seed: u64) -> Vec<u32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) % 10) as u32
            })
            .collect()
    }

    fn row(label: &str, score: f64, schur_z: f64) -> ComparisonRow {
        ComparisonRow {
            label: label.to_string(),
            n: 100,
            alphabet: 10,
            severity: Severity::Green,
            score,
            components: ScoreComponents::default(),
            deltas: MetricDeltas {
                schur_z: MetricDelta {
                    value: schur_z,
                    ..MetricDelta::default()
                },
                ..MetricDeltas::default()
            },
            notes: Vec::new(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = ScoringConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model_id, MODEL_ID);
    }

    #[test]
    fn rejects_foreign_model_and_bad_constants() {
        let mut cfg = ScoringConfig {
            model_id: "other".into(),
            ..ScoringConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg = ScoringConfig {
            runs_z_divisor: 0.0,
            ..ScoringConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg = ScoringConfig {
            yellow_score: 3.0,
            ..ScoringConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_components_score_zero_and_green() {
        let cfg = ScoringConfig::default();
        let c = ScoreComponents::default();
        assert_eq!(c.anomaly_score(&cfg), 0.0);
        assert_eq!(classify(0.0, &c, &cfg), Severity::Green);
    }

    #[test]
    fn score_is_monotonic_in_each_component() {
        let cfg = ScoringConfig::default();
        let base = ScoreComponents {
            chi_square: 0.3,
            compression: 0.1,
            runs: 0.5,
            autocorr: 0.2,
            ngram: 0.4,
            schur: 0.6,
        };
        let s0 = base.anomaly_score(&cfg);
        let bumps: [fn(&mut ScoreComponents); 6] = [
            |c| c.chi_square += 1.0,
            |c| c.compression += 1.0,
            |c| c.runs += 1.0,
            |c| c.autocorr += 1.0,
            |c| c.ngram += 1.0,
            |c| c.schur += 1.0,
        ];
        for bump in bumps {
            let mut c = base;
            bump(&mut c);
            assert!(c.anomaly_score(&cfg) > s0);
        }
    }

    #[test]
    fn single_extreme_component_escalates_severity() {
        let cfg = ScoringConfig::default();
        // 4.5 / 6 stays under the yellow score; the component alone crosses yellow.
        let c = ScoreComponents {
            runs: 4.5,
            ..ScoreComponents::default()
        };
        let score = c.anomaly_score(&cfg);
        assert!(score < cfg.yellow_score);
        assert_eq!(classify(score, &c, &cfg), Severity::Yellow);

        let strict = ScoringConfig {
            red_component: 4.0,
            ..ScoringConfig::default()
        };
        assert!(score < strict.yellow_score);
        assert_eq!(classify(score, &c, &strict), Severity::Red);

        // Past the default red component the band is red whatever the score.
        let c = ScoreComponents {
            schur: 6.0,
            ..ScoreComponents::default()
        };
        let score = c.anomaly_score(&cfg);
        assert!(score < cfg.red_score);
        assert_eq!(classify(score, &c, &cfg), Severity::Red);
    }

    #[test]
    fn compression_delta_is_relative() {
        let d = MetricDelta::relative(0.25, 0.5);
        assert!((d.delta + 0.5).abs() < 1e-12);
        let d = MetricDelta::difference(3.0, 1.0);
        assert_eq!(d.delta, 2.0);
    }

    #[test]
    fn chi_square_component_uses_baseline_df() {
        let cfg = ScoringConfig::default();
        let deltas = MetricDeltas {
            chi_square: MetricDelta::difference(19.0, 10.0),
            ..MetricDeltas::default()
        };
        let c = ScoreComponents::from_deltas(&deltas, 9, &cfg);
        assert!((c.chi_square - 2.0).abs() < 1e-12);
    }

    #[test]
    fn ranking_is_descending_by_score() {
        let mut rows = vec![row("a", 2.1, 0.0), row("b", 0.3, 0.0), row("c", 5.6, 0.0)];
        rank_rows(&mut rows);
        let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![5.6, 2.1, 0.3]);
    }

    #[test]
    fn ties_break_on_schur_then_label() {
        let mut rows = vec![row("b", 1.0, 2.0), row("a", 1.0, 2.0), row("c", 1.0, -9.0)];
        rank_rows(&mut rows);
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[test]
    fn self_comparison_is_zero_and_green() {
        let a = labeled("a.json", lcg_digits(3000, 11));
        let b = LabeledReport {
            label: "b.json".into(),
            report: a.report.clone(),
        };
        let cmp = compare(&[a, b], "a.json", &ScoringConfig::default()).unwrap();
        assert_eq!(cmp.rows.len(), 1);
        assert_eq!(cmp.rows[0].score, 0.0);
        assert_eq!(cmp.rows[0].severity, Severity::Green);
    }

    #[test]
    fn structured_input_ranks_above_noise() {
        let baseline = labeled("base", lcg_digits(5000, 1));
        let noise = labeled("noise", lcg_digits(5000, 2));
        let cycle = labeled("cycle", (0..5000).map(|i| i % 10).collect());
        let cmp = compare(&[noise, cycle, baseline], "base", &ScoringConfig::default()).unwrap();
        assert_eq!(cmp.baseline, "base");
        assert_eq!(cmp.rows[0].label, "cycle");
        assert_eq!(cmp.rows[0].severity, Severity::Red);
        assert!(cmp.rows[0].score > cmp.rows[1].score);
    }

    #[test]
    fn contract_violations() {
        let a = labeled("a", lcg_digits(500, 3));
        let b = labeled("b", lcg_digits(500, 4));
        let cfg = ScoringConfig::default();
        assert!(compare(std::slice::from_ref(&a), "a", &cfg).is_err());
        assert!(compare(&[a.clone(), b.clone()], "missing", &cfg).is_err());
        assert!(compare(&[a.clone(), a.clone()], "a", &cfg).is_err());

        let mut broken = b.clone();
        broken.report.counts.remove(&0);
        let err = compare(&[a, broken], "a", &cfg).unwrap_err();
        assert!(err.to_string().contains("b:"));
    }

    #[test]
    fn alphabet_mismatch_is_noted() {
        let a = labeled("a", lcg_digits(800, 5));
        let seq = SymbolSequence::from_symbols(
            lcg_digits(800, 6).into_iter().map(|d| d % 4).collect(),
            Mode::Integers { alphabet: 4 },
        )
        .unwrap();
        let b = LabeledReport {
            label: "b".into(),
            report: assemble(&seq, &ProbeConfig::default()).unwrap(),
        };
        let cmp = compare(&[a, b], "a", &ScoringConfig::default()).unwrap();
        assert!(cmp.rows[0].notes.iter().any(|n| n.contains("alphabet 4")));
    }
}
