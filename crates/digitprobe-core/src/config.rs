//! Run configuration consumed by the report assembler.

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// SchurProbe settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchurConfig {
    /// Upper bound on the number of leading symbols the probe examines.
    /// The effective `R` is `min(r_cap, N)`.
    pub r_cap: usize,
}

impl Default for SchurConfig {
    fn default() -> Self {
        Self {
            r_cap: digitprobe_tests::DEFAULT_SCHUR_R,
        }
    }
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeConfig {
    pub schur: SchurConfig,
    /// Analyze only the first `truncate` symbols.
    pub truncate: Option<usize>,
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.schur.r_cap == 0 {
            return Err(ProbeError::contract("SchurProbe cap R must be positive"));
        }
        if self.truncate == Some(0) {
            return Err(ProbeError::contract(
                "truncation length 0 leaves an empty sequence",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ProbeConfig::default();
        assert_eq!(cfg.schur.r_cap, 5000);
        assert_eq!(cfg.truncate, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_cap_and_zero_truncation() {
        let cfg = ProbeConfig {
            schur: SchurConfig { r_cap: 0 },
            truncate: None,
        };
        assert!(cfg.validate().is_err());
        let cfg = ProbeConfig {
            truncate: Some(0),
            ..ProbeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
