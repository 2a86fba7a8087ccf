use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use digitprobe_core::{
    AnalysisReport, Mode, NoteKind, ProbeConfig, ProbeError, Result, SchurConfig, SymbolSequence,
    assemble,
};

pub struct ProbeCommandConfig<'a> {
    pub files: &'a [PathBuf],
    pub mode: Mode,
    pub limit: Option<usize>,
    pub schur_r: usize,
    pub report_json: Option<&'a Path>,
    pub report_dir: Option<&'a Path>,
    pub quiet: bool,
}

fn analyze_file(path: &Path, mode: Mode, config: &ProbeConfig) -> Result<AnalysisReport> {
    let t0 = Instant::now();
    let seq = SymbolSequence::from_path(path, mode, config.truncate)?;
    let report = assemble(&seq, config)?;
    log::debug!(
        "{}: analyzed in {:.3}s",
        path.display(),
        t0.elapsed().as_secs_f64()
    );
    Ok(report)
}

/// Analyze every input, one scoped thread per file. Results keep input order.
fn analyze_all(files: &[PathBuf], mode: Mode, config: &ProbeConfig) -> Vec<Result<AnalysisReport>> {
    if let [single] = files {
        return vec![analyze_file(single, mode, config)];
    }
    thread::scope(|s| {
        let handles: Vec<_> = files
            .iter()
            .map(|path| s.spawn(move || analyze_file(path, mode, config)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

pub fn run(cfg: ProbeCommandConfig<'_>) -> Result<()> {
    if cfg.report_json.is_some() && cfg.files.len() > 1 {
        return Err(ProbeError::contract(
            "--report-json takes a single input; use --report-dir for several files",
        ));
    }
    let config = ProbeConfig {
        schur: SchurConfig { r_cap: cfg.schur_r },
        truncate: cfg.limit,
    };
    config.validate()?;

    let results = analyze_all(cfg.files, cfg.mode, &config);

    let mut first_err = None;
    for (path, result) in cfg.files.iter().zip(results) {
        let report = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                first_err.get_or_insert(e);
                continue;
            }
        };
        if !cfg.quiet {
            print_summary(path, &report);
        }
        if let Some(out) = cfg.report_json {
            write_report(&report, out, cfg.quiet)?;
        }
        if let Some(dir) = cfg.report_dir {
            std::fs::create_dir_all(dir).map_err(|e| ProbeError::io(dir, e))?;
            let out = dir.join(format!("{}.json", report.artifact_key()));
            write_report(&report, &out, cfg.quiet)?;
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn write_report(report: &AnalysisReport, path: &Path, quiet: bool) -> Result<()> {
    report.save(path)?;
    if !quiet {
        println!("  Report saved to {}", path.display());
    }
    log::info!("wrote report {}", path.display());
    Ok(())
}

fn print_summary(path: &Path, report: &AnalysisReport) {
    println!("{}", path.display());
    println!(
        "  Mode:            {} (M={}, N={})",
        report.mode, report.alphabet, report.n
    );
    if let Some(max) = report.max_observed {
        println!("  Max raw value:   {max}");
    }
    println!(
        "  Chi-square:      {:.3}  (df {}, p={:.4}, expected/bin {:.1})",
        report.chi_square,
        report.degrees_of_freedom(),
        report.chi_square_p,
        report.expected_per_bin
    );
    println!(
        "  Parity runs:     Z={:+.3}  (p={:.4}, {} runs, {} even / {} odd)",
        report.runs.z, report.runs.p_two_tailed, report.runs.runs, report.runs.evens, report.runs.odds
    );
    let lags: Vec<String> = report
        .autocorr
        .iter()
        .map(|(lag, rho)| format!("{lag}:{rho:+.4}"))
        .collect();
    println!(
        "  Autocorrelation: max|ρ|={:.4}  [{}]",
        report.autocorr_max_abs,
        lags.join(" ")
    );
    println!("  zlib ratio:      {:.4}", report.compress_ratio);
    let orders: Vec<String> = report
        .ngram
        .iter()
        .map(|(order, acc)| format!("{order}:{:.2}%", acc * 100.0))
        .collect();
    println!(
        "  n-gram accuracy: [{}]  (baseline {:.2}%)",
        orders.join(" "),
        report.ngram_baseline * 100.0
    );
    let s = &report.schur;
    println!(
        "  SchurProbe:      z={:+.2}  ({}/{} pairs, expected {:.1}, R={})",
        s.z, s.count, s.triples, s.expected, s.r
    );
    if let (Some(i), Some([a, b])) = (s.first_violation_index, s.first_violation_pair) {
        println!("  First relation:  index {i} (pair {a},{b})");
    }
    for note in &report.notes {
        let tag = match note.kind {
            NoteKind::LowConfidence => "low confidence",
            NoteKind::Degenerate => "degenerate",
        };
        println!("  Note [{tag}] {}: {}", note.metric, note.message);
    }
    println!("  SHA-256:         {}", report.source_sha256);
    println!();
}
