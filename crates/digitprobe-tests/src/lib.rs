//! Symbol-sequence test battery.
//!
//! Seven independent probes over a sequence of symbols in `[0, M)`:
//! distribution/chi-square, parity runs, per-symbol gaps, lag 1..5
//! autocorrelation, a compression-ratio proxy, n-gram predictive accuracy and
//! the SchurProbe additive-structure test. Every probe is a pure function that
//! always returns a fully populated result; degenerate inputs produce defined
//! sentinel values plus a [`Flag`] describing what happened.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::erf::erfc;
use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;

/// Highest autocorrelation lag examined.
pub const MAX_LAG: usize = 5;
/// Highest n-gram order examined.
pub const MAX_NGRAM_ORDER: usize = 3;
/// Default cap on the number of symbols fed to the SchurProbe.
pub const DEFAULT_SCHUR_R: usize = 5000;
/// Below this many expected observations per bin the chi-square
/// approximation is unreliable.
pub const MIN_EXPECTED_PER_BIN: f64 = 5.0;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Category of a non-fatal condition raised by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// The metric was computed but its statistical footing is weak.
    LowConfidence,
    /// The metric fell back to a sentinel value.
    Degenerate,
}

/// Non-fatal condition attached to a probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub kind: FlagKind,
    pub metric: &'static str,
    pub message: String,
}

impl Flag {
    fn low_confidence(metric: &'static str, message: String) -> Self {
        Self {
            kind: FlagKind::LowConfidence,
            metric,
            message,
        }
    }

    fn degenerate(metric: &'static str, message: String) -> Self {
        Self {
            kind: FlagKind::Degenerate,
            metric,
            message,
        }
    }
}

/// How a sequence is rendered to text before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// One ASCII character per symbol, no separators.
    Digits,
    /// Decimal text, one value per line.
    Lines,
}

/// Symbol counts and the chi-square goodness-of-fit against uniform.
#[derive(Debug, Clone)]
pub struct DistributionResult {
    pub counts: Vec<u64>,
    pub expected_per_bin: f64,
    pub chi_square: f64,
    pub degrees_of_freedom: u32,
    /// Upper-tail probability of `chi_square` under the uniform null.
    pub p_value: f64,
    /// `(observed - expected) / sqrt(expected)` per symbol.
    pub zscores: Vec<f64>,
    pub flags: Vec<Flag>,
}

impl DistributionResult {
    pub fn low_confidence(&self) -> bool {
        self.flags.iter().any(|f| f.kind == FlagKind::LowConfidence)
    }
}

/// Wald–Wolfowitz runs test on symbol parity.
#[derive(Debug, Clone)]
pub struct RunsResult {
    pub runs: u64,
    pub evens: u64,
    pub odds: u64,
    pub expected_runs: f64,
    pub variance: f64,
    pub z: f64,
    pub p_two_tailed: f64,
    pub flags: Vec<Flag>,
}

/// Gap statistics for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapStat {
    pub occurrences: u64,
    /// Number of gaps between consecutive occurrences.
    pub gaps: u64,
    /// Mean distance between consecutive occurrences; `None` below two occurrences.
    pub mean: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GapsResult {
    pub per_symbol: Vec<GapStat>,
    pub flags: Vec<Flag>,
}

/// Autocorrelation at a single lag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagCorrelation {
    pub lag: usize,
    pub correlation: f64,
}

#[derive(Debug, Clone)]
pub struct AutocorrResult {
    pub lags: Vec<LagCorrelation>,
    pub max_abs_correlation: f64,
    pub max_abs_lag: usize,
    pub flags: Vec<Flag>,
}

/// zlib compression ratio of the canonical text rendering.
///
/// A proxy for entropy, not an estimate of it: lower means more redundancy.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub raw_bytes: usize,
    pub compressed_bytes: usize,
    pub ratio: f64,
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NgramOrder {
    pub order: usize,
    pub accuracy: f64,
    pub evaluated: usize,
    pub correct: usize,
    /// Evaluation positions whose context never appeared in training.
    pub unseen_contexts: usize,
}

#[derive(Debug, Clone)]
pub struct NgramResult {
    pub orders: Vec<NgramOrder>,
    pub train_len: usize,
    /// Accuracy of blind guessing, `1/M`.
    pub baseline: f64,
    pub flags: Vec<Flag>,
}

impl NgramResult {
    pub fn best_accuracy(&self) -> f64 {
        self.orders
            .iter()
            .map(|o| o.accuracy)
            .fold(0.0, f64::max)
    }
}

/// Pairwise additive-structure probe.
#[derive(Debug, Clone)]
pub struct SchurResult {
    /// Number of leading symbols examined.
    pub r: usize,
    pub triples: u64,
    pub count: u64,
    pub expected: f64,
    pub variance: f64,
    pub fraction: f64,
    pub z: f64,
    /// First `(i, j)` in lexicographic order where the additive relation holds.
    pub first_violation: Option<(usize, usize)>,
    pub flags: Vec<Flag>,
}

/// All seven probes over one sequence.
#[derive(Debug, Clone)]
pub struct Battery {
    pub distribution: DistributionResult,
    pub runs: RunsResult,
    pub gaps: GapsResult,
    pub autocorrelation: AutocorrResult,
    pub compression: CompressionResult,
    pub ngram: NgramResult,
    pub schur: SchurResult,
}

impl Battery {
    /// Every flag raised by any probe, in probe order.
    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.distribution
            .flags
            .iter()
            .chain(&self.runs.flags)
            .chain(&self.gaps.flags)
            .chain(&self.autocorrelation.flags)
            .chain(&self.compression.flags)
            .chain(&self.ngram.flags)
            .chain(&self.schur.flags)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Most frequent key; ties go to the smallest symbol.
fn argmax_symbol(counts: &HashMap<u32, u64>) -> Option<u32> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&sym, _)| sym)
}

/// Render a sequence as the text fed to the compressor.
pub fn canonical_text(seq: &[u32], encoding: TextEncoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len() * 2);
    for &s in seq {
        // Writing into a Vec cannot fail.
        let _ = write!(out, "{s}");
        if encoding == TextEncoding::Lines {
            out.push(b'\n');
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. DISTRIBUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Symbol counts and chi-square against the uniform distribution over `M` bins.
pub fn distribution(seq: &[u32], alphabet: u32) -> DistributionResult {
    let m = alphabet.max(1) as usize;
    let mut counts = vec![0u64; m];
    for &s in seq {
        if let Some(c) = counts.get_mut(s as usize) {
            *c += 1;
        }
    }

    let n = seq.len();
    let expected = n as f64 / m as f64;
    let mut flags = Vec::new();
    let degrees_of_freedom = (m as u32).saturating_sub(1);

    if n == 0 {
        flags.push(Flag::degenerate("chi_square", "empty sequence".to_string()));
        return DistributionResult {
            counts,
            expected_per_bin: 0.0,
            chi_square: 0.0,
            degrees_of_freedom,
            p_value: 1.0,
            zscores: vec![0.0; m],
            flags,
        };
    }

    let chi_square: f64 = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();
    let sd = expected.sqrt();
    let zscores = counts
        .iter()
        .map(|&c| (c as f64 - expected) / sd)
        .collect();

    let p_value = ChiSquared::new(degrees_of_freedom.max(1) as f64)
        .map(|d| d.sf(chi_square))
        .unwrap_or(1.0);

    if expected < MIN_EXPECTED_PER_BIN {
        flags.push(Flag::low_confidence(
            "chi_square",
            format!(
                "expected per bin {expected:.2} < {MIN_EXPECTED_PER_BIN}; chi-square approximation unreliable"
            ),
        ));
    }

    DistributionResult {
        counts,
        expected_per_bin: expected,
        chi_square,
        degrees_of_freedom,
        p_value,
        zscores,
        flags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. RUNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs test on the even/odd classification of each symbol.
pub fn parity_runs(seq: &[u32]) -> RunsResult {
    let n = seq.len();
    let odds = seq.iter().filter(|&&s| s & 1 == 1).count() as u64;
    let evens = n as u64 - odds;
    let runs = if n == 0 {
        0
    } else {
        1 + seq.windows(2).filter(|w| (w[0] ^ w[1]) & 1 == 1).count() as u64
    };

    let degenerate = |reason: String| RunsResult {
        runs,
        evens,
        odds,
        expected_runs: runs as f64,
        variance: 0.0,
        z: 0.0,
        p_two_tailed: 1.0,
        flags: vec![Flag::degenerate("runs", reason)],
    };

    if n < 2 {
        return degenerate(format!("need at least 2 symbols, got {n}"));
    }
    if evens == 0 || odds == 0 {
        return degenerate(format!(
            "single parity class (evens={evens}, odds={odds}); Z fixed at 0"
        ));
    }

    let nf = n as f64;
    let prod = 2.0 * evens as f64 * odds as f64;
    let expected_runs = 1.0 + prod / nf;
    let variance = prod * (prod - nf) / (nf * nf * (nf - 1.0));
    if variance <= 0.0 {
        return degenerate(format!("non-positive variance {variance:.3e}"));
    }

    let z = (runs as f64 - expected_runs) / variance.sqrt();
    let p_two_tailed = erfc(z.abs() / std::f64::consts::SQRT_2);
    RunsResult {
        runs,
        evens,
        odds,
        expected_runs,
        variance,
        z,
        p_two_tailed,
        flags: Vec::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. GAPS
// ═══════════════════════════════════════════════════════════════════════════════

/// Distances between consecutive occurrences of each symbol.
pub fn gaps(seq: &[u32], alphabet: u32) -> GapsResult {
    let m = alphabet.max(1) as usize;
    let mut last: Vec<Option<usize>> = vec![None; m];
    let mut occurrences = vec![0u64; m];
    let mut gap_count = vec![0u64; m];
    let mut gap_sum = vec![0u64; m];

    for (idx, &s) in seq.iter().enumerate() {
        let s = s as usize;
        if s >= m {
            continue;
        }
        occurrences[s] += 1;
        if let Some(prev) = last[s] {
            gap_count[s] += 1;
            gap_sum[s] += (idx - prev) as u64;
        }
        last[s] = Some(idx);
    }

    let per_symbol: Vec<GapStat> = (0..m)
        .map(|s| GapStat {
            occurrences: occurrences[s],
            gaps: gap_count[s],
            mean: (gap_count[s] > 0).then(|| gap_sum[s] as f64 / gap_count[s] as f64),
        })
        .collect();

    let undefined = per_symbol.iter().filter(|g| g.mean.is_none()).count();
    let flags = if undefined > 0 {
        vec![Flag::degenerate(
            "gaps",
            format!("{undefined} symbol(s) occur fewer than twice; mean gap undefined"),
        )]
    } else {
        Vec::new()
    };

    GapsResult { per_symbol, flags }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 4. AUTOCORRELATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Pearson-style autocorrelation of the integer stream for lags `1..=max_lag`.
///
/// The denominator is the full-sequence sum of squared deviations, so every
/// lag shares one normalization.
pub fn autocorrelation(seq: &[u32], max_lag: usize) -> AutocorrResult {
    let n = seq.len();
    let mut flags = Vec::new();
    let zero = |flags: Vec<Flag>| AutocorrResult {
        lags: (1..=max_lag)
            .map(|lag| LagCorrelation {
                lag,
                correlation: 0.0,
            })
            .collect(),
        max_abs_correlation: 0.0,
        max_abs_lag: 1,
        flags,
    };

    if n < 2 {
        flags.push(Flag::degenerate(
            "autocorr",
            format!("need at least 2 symbols, got {n}"),
        ));
        return zero(flags);
    }

    let arr: Vec<f64> = seq.iter().map(|&s| s as f64).collect();
    let mean = arr.iter().sum::<f64>() / n as f64;
    let denom: f64 = arr.iter().map(|x| (x - mean) * (x - mean)).sum();
    if denom <= 0.0 {
        flags.push(Flag::degenerate(
            "autocorr",
            "zero variance (constant sequence); autocorrelation fixed at 0".to_string(),
        ));
        return zero(flags);
    }

    let mut lags = Vec::with_capacity(max_lag);
    let mut max_abs = 0.0f64;
    let mut max_abs_lag = 1;
    let mut short_lags = 0;
    for lag in 1..=max_lag {
        let correlation = if lag >= n {
            short_lags += 1;
            0.0
        } else {
            let num: f64 = (0..n - lag)
                .map(|t| (arr[t] - mean) * (arr[t + lag] - mean))
                .sum();
            num / denom
        };
        if correlation.abs() > max_abs {
            max_abs = correlation.abs();
            max_abs_lag = lag;
        }
        lags.push(LagCorrelation { lag, correlation });
    }
    if short_lags > 0 {
        flags.push(Flag::degenerate(
            "autocorr",
            format!("{short_lags} lag(s) not shorter than N={n}; fixed at 0"),
        ));
    }

    AutocorrResult {
        lags,
        max_abs_correlation: max_abs,
        max_abs_lag,
        flags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 5. COMPRESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// zlib ratio of the canonical text rendering, clamped to `(0, 1]`.
pub fn compression(seq: &[u32], encoding: TextEncoding) -> CompressionResult {
    let text = canonical_text(seq, encoding);
    let mut flags = Vec::new();
    if text.is_empty() {
        flags.push(Flag::degenerate(
            "compress_ratio",
            "empty text; ratio fixed at 1".to_string(),
        ));
        return CompressionResult {
            raw_bytes: 0,
            compressed_bytes: 0,
            ratio: 1.0,
            flags,
        };
    }

    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    let compressed = enc.write_all(&text).and_then(|()| enc.finish());
    let compressed_bytes = match compressed {
        Ok(c) => c.len(),
        Err(e) => {
            flags.push(Flag::degenerate(
                "compress_ratio",
                format!("compressor failed ({e}); ratio fixed at 1"),
            ));
            text.len()
        }
    };

    let mut ratio = compressed_bytes as f64 / text.len() as f64;
    if ratio > 1.0 {
        flags.push(Flag::degenerate(
            "compress_ratio",
            format!(
                "container overhead on {} byte(s) gives ratio {ratio:.3}; clamped to 1",
                text.len()
            ),
        ));
        ratio = 1.0;
    }

    CompressionResult {
        raw_bytes: text.len(),
        compressed_bytes,
        ratio,
        flags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 6. N-GRAM PREDICTOR
// ═══════════════════════════════════════════════════════════════════════════════

fn ngram_order(seq: &[u32], train_len: usize, order: usize, fallback: Option<u32>) -> NgramOrder {
    let mut table: HashMap<&[u32], HashMap<u32, u64>> = HashMap::new();
    for t in order..train_len {
        *table
            .entry(&seq[t - order..t])
            .or_default()
            .entry(seq[t])
            .or_insert(0) += 1;
    }
    let predictions: HashMap<&[u32], u32> = table
        .iter()
        .filter_map(|(ctx, next)| argmax_symbol(next).map(|s| (*ctx, s)))
        .collect();

    let mut correct = 0;
    let mut unseen_contexts = 0;
    for t in train_len..seq.len() {
        let predicted = match predictions.get(&seq[t - order..t]) {
            Some(&s) => Some(s),
            None => {
                unseen_contexts += 1;
                fallback
            }
        };
        if predicted == Some(seq[t]) {
            correct += 1;
        }
    }
    let evaluated = seq.len() - train_len;
    NgramOrder {
        order,
        accuracy: correct as f64 / evaluated as f64,
        evaluated,
        correct,
        unseen_contexts,
    }
}

/// Order-`n` next-symbol prediction accuracy for `n = 1..=3` on an 80/20 split.
pub fn ngram_accuracy(seq: &[u32], alphabet: u32) -> NgramResult {
    let n = seq.len();
    let train_len = n * 4 / 5;
    let baseline = 1.0 / alphabet.max(1) as f64;

    let mut mode_counts: HashMap<u32, u64> = HashMap::new();
    for &s in &seq[..train_len] {
        *mode_counts.entry(s).or_insert(0) += 1;
    }
    let fallback = argmax_symbol(&mode_counts);

    let mut flags = Vec::new();
    let mut orders = Vec::with_capacity(MAX_NGRAM_ORDER);
    for order in 1..=MAX_NGRAM_ORDER {
        if train_len <= order || train_len >= n {
            flags.push(Flag::degenerate(
                "ngram",
                format!("order {order}: split {train_len}/{} too short; accuracy fixed at 0", n - train_len),
            ));
            orders.push(NgramOrder {
                order,
                accuracy: 0.0,
                evaluated: 0,
                correct: 0,
                unseen_contexts: 0,
            });
            continue;
        }
        orders.push(ngram_order(seq, train_len, order, fallback));
    }

    NgramResult {
        orders,
        train_len,
        baseline,
        flags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 7. SCHURPROBE
// ═══════════════════════════════════════════════════════════════════════════════

/// Count pairs `i < j < R` with `(seq[i] + seq[j]) mod M == seq[(i + j) mod R]`.
///
/// Runs in `O(R²)` time with constant state per pair. `R = min(r_cap, N)`;
/// the cap is never extended past `N`.
pub fn schur_probe(seq: &[u32], alphabet: u32, r_cap: usize) -> SchurResult {
    let r = r_cap.min(seq.len());
    let mut flags = Vec::new();
    if r_cap > seq.len() {
        flags.push(Flag::low_confidence(
            "schur",
            format!("R cap {r_cap} exceeds N={}; clamped to {r}", seq.len()),
        ));
    }

    if r < 2 || alphabet < 2 {
        flags.push(Flag::degenerate(
            "schur",
            format!("R={r} leaves no pairs to test; z fixed at 0"),
        ));
        return SchurResult {
            r,
            triples: 0,
            count: 0,
            expected: 0.0,
            variance: 0.0,
            fraction: 0.0,
            z: 0.0,
            first_violation: None,
            flags,
        };
    }

    let window = &seq[..r];
    let m = alphabet as u64;
    let mut count = 0u64;
    let mut first_violation = None;
    for i in 0..r - 1 {
        let a = window[i] as u64;
        for j in i + 1..r {
            let mut k = i + j;
            if k >= r {
                k -= r;
            }
            if (a + window[j] as u64) % m == window[k] as u64 {
                count += 1;
                if first_violation.is_none() {
                    first_violation = Some((i, j));
                }
            }
        }
    }

    let triples = r as u64 * (r as u64 - 1) / 2;
    let expected = triples as f64 / m as f64;
    let p = 1.0 / m as f64;
    let variance = triples as f64 * p * (1.0 - p);
    let z = if variance > 0.0 {
        (count as f64 - expected) / variance.sqrt()
    } else {
        0.0
    };
    log::debug!("schur probe R={r}: {count}/{triples} matches, z={z:+.2}");

    SchurResult {
        r,
        triples,
        count,
        expected,
        variance,
        fraction: count as f64 / triples as f64,
        z,
        first_violation,
        flags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Run all seven probes over one sequence.
pub fn run_battery(
    seq: &[u32],
    alphabet: u32,
    encoding: TextEncoding,
    schur_r_cap: usize,
) -> Battery {
    let t0 = Instant::now();
    let battery = Battery {
        distribution: distribution(seq, alphabet),
        runs: parity_runs(seq),
        gaps: gaps(seq, alphabet),
        autocorrelation: autocorrelation(seq, MAX_LAG),
        compression: compression(seq, encoding),
        ngram: ngram_accuracy(seq, alphabet),
        schur: schur_probe(seq, alphabet, schur_r_cap),
    };
    log::debug!(
        "battery over N={} M={alphabet} finished in {:.3}s",
        seq.len(),
        t0.elapsed().as_secs_f64()
    );
    battery
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform_digits(n: usize, seed: u64) -> Vec<u32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random_range(0..10)).collect()
    }

    fn cycle(n: usize, period: u32) -> Vec<u32> {
        (0..n).map(|i| i as u32 % period).collect()
    }

    #[test]
    fn test_distribution_counts_sum_to_n() {
        let seq = uniform_digits(5000, 1);
        let d = distribution(&seq, 10);
        assert_eq!(d.counts.iter().sum::<u64>(), 5000);
        assert!(d.chi_square >= 0.0);
        assert_eq!(d.degrees_of_freedom, 9);
        assert!(!d.low_confidence());
    }

    #[test]
    fn test_distribution_balanced_is_zero() {
        let d = distribution(&cycle(1000, 10), 10);
        assert_eq!(d.chi_square, 0.0);
        assert!((d.p_value - 1.0).abs() < 1e-9);
        assert!(d.zscores.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_distribution_low_confidence() {
        let d = distribution(&[1, 2, 3, 4], 10);
        assert!(d.low_confidence());
        assert_eq!(d.counts.len(), 10);
        assert_eq!(d.counts[0], 0);
    }

    #[test]
    fn test_runs_alternating_parity() {
        let seq: Vec<u32> = (0..10).map(|i| i % 2).collect();
        let r = parity_runs(&seq);
        assert_eq!(r.runs, 10);
        assert_eq!(r.evens, 5);
        assert_eq!(r.odds, 5);
        assert!((r.expected_runs - 6.0).abs() < 1e-12);
        assert!(r.z > 2.5, "z={}", r.z);
        assert!(r.p_two_tailed < 0.01);
        assert!(r.flags.is_empty());
    }

    #[test]
    fn test_runs_single_class_is_sentinel() {
        let r = parity_runs(&[2, 4, 6, 8, 0]);
        assert_eq!(r.z, 0.0);
        assert_eq!(r.p_two_tailed, 1.0);
        assert_eq!(r.flags[0].kind, FlagKind::Degenerate);
    }

    #[test]
    fn test_runs_too_short() {
        let r = parity_runs(&[3]);
        assert_eq!(r.runs, 1);
        assert_eq!(r.z, 0.0);
        assert!(!r.flags.is_empty());
    }

    #[test]
    fn test_gaps_basic() {
        let g = gaps(&[1, 0, 1, 1], 3);
        assert_eq!(
            g.per_symbol[1],
            GapStat {
                occurrences: 3,
                gaps: 2,
                mean: Some(1.5)
            }
        );
        assert_eq!(g.per_symbol[0].occurrences, 1);
        assert_eq!(g.per_symbol[0].mean, None);
        assert_eq!(g.per_symbol[2].occurrences, 0);
        assert_eq!(g.per_symbol[2].mean, None);
        assert!(g.flags[0].message.starts_with("2 symbol(s)"));
    }

    #[test]
    fn test_autocorr_constant_is_zero() {
        let a = autocorrelation(&[7; 100], MAX_LAG);
        assert_eq!(a.lags.len(), MAX_LAG);
        assert!(a.lags.iter().all(|l| l.correlation == 0.0));
        assert_eq!(a.flags[0].kind, FlagKind::Degenerate);
    }

    #[test]
    fn test_autocorr_alternating() {
        let seq = cycle(100, 2);
        let a = autocorrelation(&seq, MAX_LAG);
        assert!((a.lags[0].correlation + 0.99).abs() < 1e-12);
        assert!((a.lags[1].correlation - 0.98).abs() < 1e-12);
        assert_eq!(a.max_abs_lag, 1);
    }

    #[test]
    fn test_autocorr_short_sequence() {
        let a = autocorrelation(&[1, 2, 3], MAX_LAG);
        assert_eq!(a.lags.len(), MAX_LAG);
        assert_eq!(a.lags[4].correlation, 0.0);
        assert!(a.flags.iter().any(|f| f.message.contains("lag(s)")));
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(canonical_text(&[1, 2, 3], TextEncoding::Digits), b"123");
        assert_eq!(canonical_text(&[10, 2], TextEncoding::Lines), b"10\n2\n");
    }

    #[test]
    fn test_compression_structure_vs_noise() {
        let constant = compression(&[7; 10_000], TextEncoding::Digits);
        let noise = compression(&uniform_digits(10_000, 2), TextEncoding::Digits);
        assert!(constant.ratio < 0.05, "constant ratio {}", constant.ratio);
        assert!(noise.ratio > 0.4, "noise ratio {}", noise.ratio);
        assert!(noise.ratio <= 1.0);
    }

    #[test]
    fn test_compression_tiny_input_clamped() {
        let c = compression(&[3], TextEncoding::Digits);
        assert_eq!(c.ratio, 1.0);
        assert!(c.compressed_bytes > c.raw_bytes);
        assert_eq!(c.flags.len(), 1);
    }

    #[test]
    fn test_ngram_periodic_is_perfect() {
        let n = ngram_accuracy(&cycle(1000, 10), 10);
        assert_eq!(n.train_len, 800);
        for o in &n.orders {
            assert_eq!(o.evaluated, 200);
            assert_eq!(o.accuracy, 1.0, "order {}", o.order);
        }
        assert!((n.baseline - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_ngram_unseen_context_uses_global_mode() {
        // Training is all 5s; evaluation continues with fresh contexts.
        let mut seq = vec![5u32; 8];
        seq.extend([1, 5]);
        let n = ngram_accuracy(&seq, 10);
        let o1 = n.orders[0];
        assert_eq!(o1.evaluated, 2);
        // Context [5] predicts 5 (miss on 1); context [1] is unseen and falls back to 5 (hit).
        assert_eq!(o1.correct, 1);
        assert_eq!(o1.unseen_contexts, 1);
    }

    #[test]
    fn test_ngram_too_short_is_flagged() {
        let n = ngram_accuracy(&[1, 2], 10);
        assert_eq!(n.orders.len(), MAX_NGRAM_ORDER);
        assert!(n.orders.iter().all(|o| o.accuracy == 0.0));
        assert_eq!(n.flags.len(), MAX_NGRAM_ORDER);
    }

    #[test]
    fn test_schur_hand_checked() {
        let s = schur_probe(&[1, 2, 3], 5, 5000);
        assert_eq!(s.r, 3);
        assert_eq!(s.triples, 3);
        assert_eq!(s.count, 0);
        assert_eq!(s.first_violation, None);

        let s = schur_probe(&[0, 1, 1], 2, 3);
        assert_eq!(s.count, 3);
        assert_eq!(s.fraction, 1.0);
        assert_eq!(s.first_violation, Some((0, 1)));
        assert!(s.flags.is_empty());
    }

    #[test]
    fn test_schur_expected_and_z_recompute() {
        let seq = uniform_digits(2000, 3);
        let s = schur_probe(&seq, 10, 1500);
        assert_eq!(s.r, 1500);
        assert_eq!(s.triples, 1500 * 1499 / 2);
        assert_eq!(s.expected, s.triples as f64 / 10.0);
        let var = s.triples as f64 * 0.1 * 0.9;
        let z = (s.count as f64 - s.expected) / var.sqrt();
        assert!((z - s.z).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&s.fraction));
    }

    #[test]
    fn test_schur_cap_clamped_to_n() {
        let s = schur_probe(&[1, 2, 3, 4], 10, 5000);
        assert_eq!(s.r, 4);
        assert_eq!(s.flags[0].kind, FlagKind::LowConfidence);
    }

    #[test]
    fn test_schur_single_symbol() {
        let s = schur_probe(&[4], 10, 5000);
        assert_eq!(s.triples, 0);
        assert_eq!(s.z, 0.0);
        assert_eq!(s.fraction, 0.0);
        assert!(s.flags.iter().any(|f| f.kind == FlagKind::Degenerate));
    }

    #[test]
    fn test_battery_single_symbol_never_panics() {
        let b = run_battery(&[9], 10, TextEncoding::Digits, DEFAULT_SCHUR_R);
        assert_eq!(b.distribution.counts.iter().sum::<u64>(), 1);
        assert_eq!(b.autocorrelation.lags.len(), MAX_LAG);
        assert_eq!(b.ngram.orders.len(), MAX_NGRAM_ORDER);
        assert!(b.flags().count() >= 5);
    }

    #[test]
    fn test_battery_uniform_is_quiet() {
        let seq = uniform_digits(20_000, 4);
        let b = run_battery(&seq, 10, TextEncoding::Digits, 1000);
        assert!(b.autocorrelation.max_abs_correlation < 0.05);
        assert!(b.runs.z.abs() < 5.0);
        assert!((b.ngram.best_accuracy() - 0.1).abs() < 0.03);
        assert!(b.flags().all(|f| f.kind != FlagKind::LowConfidence));
    }
}
