//! Symbol ingestion.
//!
//! Turns raw input bytes into a validated [`SymbolSequence`]:
//! - **digits**: every ASCII `0..9` character is a symbol, everything else is
//!   ignored (newlines, spaces, a leading `3.` of a constant, ...).
//! - **integers**: one signed decimal integer per line, reduced modulo the
//!   declared alphabet. Blank and unparseable lines are skipped.
//!
//! The SHA-256 of the raw bytes travels with the sequence so reports can be
//! tied back to the exact input they were computed from.

use std::fmt;
use std::path::Path;

use digitprobe_tests::TextEncoding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProbeError, Result};

/// Alphabet size of digit mode.
pub const DIGIT_ALPHABET: u32 = 10;

/// Mode label as stored in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeTag {
    Digits,
    Integers,
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digits => write!(f, "digits"),
            Self::Integers => write!(f, "integers"),
        }
    }
}

/// How input is interpreted, carrying the alphabet where it is user-declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Digits,
    Integers { alphabet: u32 },
}

impl Mode {
    /// Integer mode; the alphabet is mandatory and must be at least 2.
    pub fn integers(alphabet: Option<u32>) -> Result<Self> {
        let alphabet = alphabet.ok_or_else(|| {
            ProbeError::contract("integer mode requires a declared alphabet (--alphabet)")
        })?;
        let mode = Self::Integers { alphabet };
        mode.validate()?;
        Ok(mode)
    }

    pub fn alphabet(&self) -> u32 {
        match self {
            Self::Digits => DIGIT_ALPHABET,
            Self::Integers { alphabet } => *alphabet,
        }
    }

    pub fn tag(&self) -> ModeTag {
        match self {
            Self::Digits => ModeTag::Digits,
            Self::Integers { .. } => ModeTag::Integers,
        }
    }

    /// Text rendering used by the compression proxy.
    pub fn text_encoding(&self) -> TextEncoding {
        match self {
            Self::Digits => TextEncoding::Digits,
            Self::Integers { .. } => TextEncoding::Lines,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let m = self.alphabet();
        if m < 2 {
            return Err(ProbeError::contract(format!(
                "alphabet must be >= 2, got {m}"
            )));
        }
        Ok(())
    }
}

/// An immutable, validated sequence of symbols in `[0, M)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSequence {
    mode: Mode,
    symbols: Vec<u32>,
    source_sha256: String,
    max_observed: Option<i64>,
}

impl SymbolSequence {
    /// Parse raw input bytes, keeping at most `limit` symbols.
    pub fn from_bytes(raw: &[u8], mode: Mode, limit: Option<usize>) -> Result<Self> {
        mode.validate()?;
        let limit = limit.unwrap_or(usize::MAX);
        let (symbols, max_observed) = match mode {
            Mode::Digits => (parse_digits(raw, limit), None),
            Mode::Integers { alphabet } => parse_integer_lines(raw, alphabet, limit),
        };
        if symbols.is_empty() {
            return Err(ProbeError::contract(format!(
                "input contains no {} symbols",
                mode.tag()
            )));
        }
        log::debug!(
            "ingested {} {} symbol(s) from {} byte(s)",
            symbols.len(),
            mode.tag(),
            raw.len()
        );
        Ok(Self {
            mode,
            symbols,
            source_sha256: sha256_hex(raw),
            max_observed,
        })
    }

    /// Read and parse a file.
    pub fn from_path(path: &Path, mode: Mode, limit: Option<usize>) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|e| ProbeError::io(path, e))?;
        Self::from_bytes(&raw, mode, limit)
    }

    /// Build from already-reduced symbols. The fingerprint covers the
    /// canonical text rendering of the symbols.
    pub fn from_symbols(symbols: Vec<u32>, mode: Mode) -> Result<Self> {
        mode.validate()?;
        if symbols.is_empty() {
            return Err(ProbeError::contract("symbol sequence is empty"));
        }
        let m = mode.alphabet();
        if let Some((idx, &s)) = symbols.iter().enumerate().find(|&(_, &s)| s >= m) {
            return Err(ProbeError::contract(format!(
                "symbol {s} at index {idx} is outside [0, {m})"
            )));
        }
        let text = digitprobe_tests::canonical_text(&symbols, mode.text_encoding());
        let max_observed = match mode {
            Mode::Digits => None,
            Mode::Integers { .. } => symbols.iter().max().map(|&s| s as i64),
        };
        Ok(Self {
            mode,
            symbols,
            source_sha256: sha256_hex(&text),
            max_observed,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn alphabet(&self) -> u32 {
        self.mode.alphabet()
    }

    pub fn symbols(&self) -> &[u32] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always false for a constructed sequence; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn source_sha256(&self) -> &str {
        &self.source_sha256
    }

    /// Largest raw integer before modular reduction (integer mode only).
    pub fn max_observed(&self) -> Option<i64> {
        self.max_observed
    }
}

fn parse_digits(raw: &[u8], limit: usize) -> Vec<u32> {
    raw.iter()
        .filter(|b| b.is_ascii_digit())
        .take(limit)
        .map(|&b| (b - b'0') as u32)
        .collect()
}

fn parse_integer_lines(raw: &[u8], alphabet: u32, limit: usize) -> (Vec<u32>, Option<i64>) {
    let text = String::from_utf8_lossy(raw);
    let mut symbols = Vec::new();
    let mut max_observed: Option<i64> = None;
    let mut skipped = 0usize;

    for line in text.lines() {
        if symbols.len() >= limit {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match reduce_decimal(line, alphabet) {
            Some(symbol) => {
                let v = raw_value(line);
                max_observed = Some(max_observed.map_or(v, |cur| cur.max(v)));
                symbols.push(symbol);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("skipped {skipped} non-integer line(s)");
    }
    (symbols, max_observed)
}

/// Euclidean remainder of a signed decimal integer of any length modulo `m`.
/// Returns `None` unless `line` is an optional sign followed by ASCII digits.
fn reduce_decimal(line: &str, m: u32) -> Option<u32> {
    let (negative, digits) = match line.as_bytes().first()? {
        b'-' => (true, &line[1..]),
        b'+' => (false, &line[1..]),
        _ => (false, line),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let m = m as u64;
    let r = digits
        .bytes()
        .fold(0u64, |acc, b| (acc * 10 + (b - b'0') as u64) % m);
    let r = if negative { (m - r) % m } else { r };
    Some(r as u32)
}

/// Raw value for `max_observed`, saturating at the `i64` bounds.
fn raw_value(line: &str) -> i64 {
    line.parse::<i64>().unwrap_or(if line.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(s, "{b:02x}");
    }
    s
}
