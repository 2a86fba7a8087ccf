use std::path::{Path, PathBuf};

use digitprobe_core::{
    AnalysisReport, Comparison, LabeledReport, ProbeError, Result, ScoringConfig, Severity,
    compare,
};

use crate::export;

pub struct CompareCommandConfig<'a> {
    pub reports: &'a [PathBuf],
    pub baseline: &'a Path,
    pub csv: Option<&'a Path>,
    pub md: Option<&'a Path>,
    pub scoring_config: Option<&'a Path>,
}

/// Same file, by canonical path when both resolve, else by literal path.
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Labels are file names; colliding names fall back to the path as given.
fn labels(paths: &[PathBuf]) -> Vec<String> {
    let names: Vec<String> = paths.iter().map(|p| super::file_label(p)).collect();
    names
        .iter()
        .zip(paths)
        .map(|(name, path)| {
            if names.iter().filter(|n| *n == name).count() > 1 {
                path.display().to_string()
            } else {
                name.clone()
            }
        })
        .collect()
}

pub fn run(cfg: CompareCommandConfig<'_>) -> Result<()> {
    let scoring = match cfg.scoring_config {
        Some(path) => ScoringConfig::load(path)?,
        None => ScoringConfig::default(),
    };

    let baseline_idx = cfg
        .reports
        .iter()
        .position(|p| same_file(p, cfg.baseline))
        .ok_or_else(|| {
            ProbeError::contract(format!(
                "baseline {} is not among the compared reports",
                cfg.baseline.display()
            ))
        })?;

    let labels = labels(cfg.reports);
    let mut loaded = Vec::with_capacity(cfg.reports.len());
    for (path, label) in cfg.reports.iter().zip(&labels) {
        let report = AnalysisReport::load(path)?;
        loaded.push(LabeledReport {
            label: label.clone(),
            report,
        });
    }

    let comparison = compare(&loaded, &labels[baseline_idx], &scoring)?;
    print_table(&comparison);

    if let Some(path) = cfg.csv {
        super::write_output(path, &export::to_csv(&comparison))?;
        println!("CSV written to {}", path.display());
    }
    if let Some(path) = cfg.md {
        super::write_output(path, &export::to_markdown(&comparison))?;
        println!("Markdown written to {}", path.display());
    }
    Ok(())
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Green => "✓",
        Severity::Yellow => "!",
        Severity::Red => "✗",
    }
}

fn print_table(cmp: &Comparison) {
    let width = cmp
        .rows
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "Baseline: {} (N={})   model {} v{}\n",
        cmp.baseline, cmp.baseline_n, cmp.model_id, cmp.model_version
    );
    println!(
        "  {:<width$} {:>8} {:<8} {:>7} {:>18} {:>18} {:>16} {:>16} {:>18} {:>18}",
        "file", "N", "severity", "score", "chi² (Δ)", "zlib (Δrel)", "runs Z (Δ)", "max|ρ| (Δ)", "n-gram (Δpp)", "Schur z (Δ)",
    );
    println!("  {}", "─".repeat(width + 150));
    for row in &cmp.rows {
        let d = &row.deltas;
        println!(
            "  {:<width$} {:>8} {} {:<6} {:>7.3} {:>18} {:>18} {:>16} {:>16} {:>18} {:>18}",
            row.label,
            row.n,
            severity_marker(row.severity),
            row.severity.to_string(),
            row.score,
            format!("{:.2} ({:+.2})", d.chi_square.value, d.chi_square.delta),
            format!(
                "{:.4} ({:+.1}%)",
                d.compress_ratio.value,
                d.compress_ratio.delta * 100.0
            ),
            format!("{:+.2} ({:+.2})", d.runs_z.value, d.runs_z.delta),
            format!(
                "{:.4} ({:+.4})",
                d.autocorr_max_abs.value, d.autocorr_max_abs.delta
            ),
            format!(
                "{:.2}% ({:+.2})",
                d.ngram_best.value * 100.0,
                d.ngram_best.delta * 100.0
            ),
            format!("{:+.2} ({:+.2})", d.schur_z.value, d.schur_z.delta),
        );
    }
    for row in cmp.rows.iter().filter(|r| !r.notes.is_empty()) {
        for note in &row.notes {
            println!("  note: {}: {note}", row.label);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use digitprobe_core::{Mode, ProbeConfig, SymbolSequence, assemble};

    fn write_report(dir: &Path, name: &str, symbols: Vec<u32>) -> PathBuf {
        let seq = SymbolSequence::from_symbols(symbols, Mode::Digits).unwrap();
        let report = assemble(&seq, &ProbeConfig::default()).unwrap();
        let path = dir.join(name);
        report.save(&path).unwrap();
        path
    }

    #[test]
    fn test_labels_disambiguate_collisions() {
        let paths = vec![
            PathBuf::from("a/r.json"),
            PathBuf::from("b/r.json"),
            PathBuf::from("c/x.json"),
        ];
        assert_eq!(labels(&paths), vec!["a/r.json", "b/r.json", "x.json"]);
    }

    #[test]
    fn test_compare_writes_exports() {
        let tmp = tempfile::tempdir().unwrap();
        let base = write_report(tmp.path(), "base.json", (0..2000).map(|i| (i * 7 + i / 3) % 10).collect());
        let cyc = write_report(tmp.path(), "cycle.json", (0..2000).map(|i| i % 10).collect());
        let csv = tmp.path().join("out/table.csv");
        let md = tmp.path().join("out/table.md");
        let reports = vec![base.clone(), cyc];

        run(CompareCommandConfig {
            reports: &reports,
            baseline: &base,
            csv: Some(&csv),
            md: Some(&md),
            scoring_config: None,
        })
        .unwrap();

        let csv_text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(csv_text.lines().count(), 2);
        assert!(csv_text.lines().nth(1).unwrap().starts_with("cycle.json,2000,"));
        assert!(std::fs::read_to_string(&md).unwrap().contains("cycle.json"));
    }

    #[test]
    fn test_baseline_must_be_an_input() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_report(tmp.path(), "a.json", (0..500).map(|i| i % 10).collect());
        let b = write_report(tmp.path(), "b.json", (0..500).map(|i| (i * 3) % 10).collect());
        let other = tmp.path().join("other.json");
        let reports = vec![a, b];
        let err = run(CompareCommandConfig {
            reports: &reports,
            baseline: &other,
            csv: None,
            md: None,
            scoring_config: None,
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_foreign_scoring_model_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_report(tmp.path(), "a.json", (0..500).map(|i| i % 10).collect());
        let b = write_report(tmp.path(), "b.json", (0..500).map(|i| (i * 3) % 10).collect());
        let mut cfg = serde_json::to_value(ScoringConfig::default()).unwrap();
        cfg["model_id"] = "anomaly_score_v0".into();
        let cfg_path = tmp.path().join("scoring.json");
        std::fs::write(&cfg_path, cfg.to_string()).unwrap();
        let reports = vec![a.clone(), b];
        let err = run(CompareCommandConfig {
            reports: &reports,
            baseline: &a,
            csv: None,
            md: None,
            scoring_config: Some(&cfg_path),
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
