//! Synthetic datasets with known structure, for calibrating the battery.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use clap::ValueEnum;
use digitprobe_core::{ProbeError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default length in symbols.
pub const DEFAULT_N: usize = 21_010;
pub const DEFAULT_SEED: u64 = 123_456;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    /// Uniform digits 0..9
    Uniform,
    /// Short-period LCG x -> 3x + 7 (mod 10)
    LcgMod10,
    /// Digits with 7 weighted 6:1 against every other digit
    Biased7,
    /// 0, 1, ..., 9, 0, 1, ... repeated
    Gradient,
    /// A single repeated digit
    Constant,
    /// Uniform digits with every other position following 7k (mod 10)
    SchurTrap,
    /// Integer draws 1..90, one per line
    Lotto,
}

impl DatasetKind {
    /// Whether the output is one integer per line (probe with `--integers`).
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Lotto)
    }
}

fn lcg_mod10(n: usize) -> Vec<u32> {
    let mut x = 1u32;
    (0..n)
        .map(|_| {
            x = (3 * x + 7) % 10;
            x
        })
        .collect()
}

fn biased7(n: usize, rng: &mut StdRng) -> Vec<u32> {
    // Weight 6 for digit 7, 1 for the others: 15 tickets.
    (0..n)
        .map(|_| match rng.random_range(0..15u32) {
            t @ 0..=6 => t,
            7..=12 => 7,
            t => t - 5,
        })
        .collect()
}

fn schur_trap(n: usize, rng: &mut StdRng) -> Vec<u32> {
    (0..n)
        .map(|k| {
            if rng.random_bool(0.5) {
                (7 * k as u64 % 10) as u32
            } else {
                rng.random_range(0..10)
            }
        })
        .collect()
}

/// Generate `n` values of `kind`.
pub fn generate(kind: DatasetKind, n: usize, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    match kind {
        DatasetKind::Uniform => (0..n).map(|_| rng.random_range(0..10)).collect(),
        DatasetKind::LcgMod10 => lcg_mod10(n),
        DatasetKind::Biased7 => biased7(n, &mut rng),
        DatasetKind::Gradient => (0..n).map(|i| (i % 10) as u32).collect(),
        DatasetKind::Constant => vec![7; n],
        DatasetKind::SchurTrap => schur_trap(n, &mut rng),
        DatasetKind::Lotto => (0..n).map(|_| rng.random_range(1..=90)).collect(),
    }
}

/// Text rendering: one run of digits, or one integer per line.
pub fn render(kind: DatasetKind, values: &[u32]) -> String {
    let mut out = String::with_capacity(values.len() * 3 + 1);
    for v in values {
        if kind.is_integer() {
            let _ = writeln!(out, "{v}");
        } else {
            let _ = write!(out, "{v}");
        }
    }
    if !kind.is_integer() {
        out.push('\n');
    }
    out
}

pub fn run(kind: DatasetKind, n: usize, seed: u64, output: Option<&Path>) -> Result<()> {
    if n == 0 {
        return Err(ProbeError::contract("--n must be positive"));
    }
    let text = render(kind, &generate(kind, n, seed));
    log::info!("generated {n} {kind:?} value(s) with seed {seed}");
    match output {
        Some(path) => {
            super::write_output(path, &text)?;
            eprintln!("Wrote {n} values to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            stdout
                .lock()
                .write_all(text.as_bytes())
                .map_err(|e| ProbeError::io("<stdout>", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use digitprobe_core::{AnalysisReport, Mode, ProbeConfig, SymbolSequence, assemble};

    #[test]
    fn test_generation_is_seeded() {
        assert_eq!(
            generate(DatasetKind::Uniform, 100, 1),
            generate(DatasetKind::Uniform, 100, 1)
        );
        assert_ne!(
            generate(DatasetKind::Uniform, 100, 1),
            generate(DatasetKind::Uniform, 100, 2)
        );
    }

    #[test]
    fn test_lcg_has_short_period() {
        let v = lcg_mod10(12);
        // 1 -> 0 -> 7 -> 8 -> 1 -> ...
        assert_eq!(&v[..5], &[0, 7, 8, 1, 0]);
    }

    #[test]
    fn test_biased7_favors_seven() {
        let v = generate(DatasetKind::Biased7, 30_000, 3);
        let sevens = v.iter().filter(|&&d| d == 7).count() as f64 / v.len() as f64;
        assert!((sevens - 0.4).abs() < 0.02, "share of 7s = {sevens}");
        assert!(v.iter().all(|&d| d < 10));
        for d in [0, 1, 6, 8, 9] {
            assert!(v.contains(&d));
        }
    }

    #[test]
    fn test_lotto_range_and_rendering() {
        let v = generate(DatasetKind::Lotto, 1000, 5);
        assert!(v.iter().all(|&x| (1..=90).contains(&x)));
        let text = render(DatasetKind::Lotto, &v[..3]);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_digit_rendering_is_one_line() {
        let text = render(DatasetKind::Gradient, &generate(DatasetKind::Gradient, 12, 0));
        assert_eq!(text, "012345678901\n");
    }

    fn digits_report(kind: DatasetKind, n: usize, seed: u64) -> AnalysisReport {
        let seq = SymbolSequence::from_symbols(generate(kind, n, seed), Mode::Digits).unwrap();
        assemble(&seq, &ProbeConfig::default()).unwrap()
    }

    #[test]
    fn test_biased7_is_flagged_by_chi_square() {
        let report = digits_report(DatasetKind::Biased7, DEFAULT_N, DEFAULT_SEED);
        assert!(report.chi_square > 1000.0, "chi2 = {}", report.chi_square);
        assert!(report.chi_square_p < 1e-12);
        assert!(report.zscores[&7] > 10.0);
        assert!(report.zscores.iter().all(|(&d, &z)| d == 7 || z < 0.0));
    }

    #[test]
    fn test_lcg_mod10_is_flagged_as_periodic_and_predictable() {
        let report = digits_report(DatasetKind::LcgMod10, DEFAULT_N, DEFAULT_SEED);
        // Only 0, 1, 7 and 8 ever appear.
        assert_eq!(report.counts.values().filter(|&&c| c == 0).count(), 6);
        assert!(report.chi_square > 1000.0, "chi2 = {}", report.chi_square);
        // Period 4: the lag-4 copy is the sequence itself.
        assert!(report.autocorr[&4] > 0.99, "lag 4 = {}", report.autocorr[&4]);
        assert!(report.max_abs_autocorr() > 0.99);
        assert!(report.ngram[&1] > 0.999, "order 1 = {}", report.ngram[&1]);
        assert!(report.compress_ratio < 0.05);
    }

    #[test]
    fn test_uniform_stays_quiet() {
        let report = digits_report(DatasetKind::Uniform, DEFAULT_N, DEFAULT_SEED);
        assert!(report.chi_square < 40.0, "chi2 = {}", report.chi_square);
        assert!(report.max_abs_autocorr() < 0.05);
        assert!(report.ngram_best() < 0.13);
    }

    #[test]
    fn test_schur_trap_lifts_schur_z() {
        let report = digits_report(DatasetKind::SchurTrap, 3000, 9);
        assert!(report.schur.z > 20.0, "schur z = {}", report.schur.z);
        assert!(report.chi_square < 40.0);
    }
}
