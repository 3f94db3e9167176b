//! Solver-wide configuration read by the quantifier engine.

use crate::error::{MbqiError, MbqiResult};
use serde::{Deserialize, Serialize};

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Growth of the per-quantifier counterexample budget after every pass
    pub mbqi_max_cexs: u32,
    /// Seed of the random source used to pick class representatives
    pub random_seed: u64,
    /// Assignment budget of the enumerative oracle per check
    pub oracle_max_assignments: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl SolverConfig {
    /// Create a configuration for quick, shallow checks
    #[must_use]
    pub fn fast() -> Self {
        Self {
            mbqi_max_cexs: 1,
            random_seed: 0,
            oracle_max_assignments: 10_000,
        }
    }

    /// Create a balanced configuration (default)
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            mbqi_max_cexs: 1,
            random_seed: 0,
            oracle_max_assignments: 100_000,
        }
    }

    /// Create a configuration that searches more counterexamples per pass
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            mbqi_max_cexs: 4,
            random_seed: 0,
            oracle_max_assignments: 1_000_000,
        }
    }

    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> MbqiResult<()> {
        if self.mbqi_max_cexs == 0 {
            return Err(MbqiError::InvalidConfig(
                "mbqi_max_cexs must be positive".to_string(),
            ));
        }
        if self.oracle_max_assignments == 0 {
            return Err(MbqiError::InvalidConfig(
                "oracle_max_assignments must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(SolverConfig::fast().validate().is_ok());
        assert!(SolverConfig::balanced().validate().is_ok());
        assert!(SolverConfig::thorough().validate().is_ok());
        assert_eq!(SolverConfig::default(), SolverConfig::balanced());
        assert_eq!(SolverConfig::default().mbqi_max_cexs, 1);
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = SolverConfig {
            mbqi_max_cexs: 0,
            ..SolverConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MbqiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_serde_round_trip_with_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"random_seed": 42}"#).expect("valid json");
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.mbqi_max_cexs, 1);
        let json = serde_json::to_string(&config).expect("serializable");
        let back: SolverConfig = serde_json::from_str(&json).expect("valid json");
        assert_eq!(back, config);
    }
}
