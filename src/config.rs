//! Study configuration and startup validation.
//!
//! All tunable quantities of the power study live here: design sizes, the
//! calibrated latent-model coefficients, replication count, and the
//! significance threshold. Validation is fatal at startup so an invalid
//! configuration (e.g. non-monotonic thresholds, which would produce
//! negative category probabilities) can never reach the simulator.

use crate::design::{Factor, FeatureCodes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    NonPositiveCount(&'static str),
    #[error("threshold intercepts must be strictly decreasing, got {0:?}")]
    NonMonotonicThresholds([f64; 4]),
    #[error("alpha must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),
    #[error("replication count must be positive")]
    ZeroReplications,
}

/// Latent cumulative-link model coefficients used by the data-generating
/// process.
///
/// The defaults are the calibrated values of the study: four strictly
/// decreasing threshold intercepts and six fixed-effect slopes in the
/// canonical `Factor` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCoefficients {
    /// Threshold intercepts b01..b04 (category cut-points, strictly decreasing)
    pub thresholds: [f64; 4],

    /// Fixed-effect slopes, indexed by `Factor` canonical order
    pub slopes: [f64; 6],
}

impl Default for ModelCoefficients {
    fn default() -> Self {
        Self {
            thresholds: [4.0, 1.5, -0.01, -1.0],
            slopes: [1.3, 1.1, 0.5, -0.7, 0.0, -1.5],
        }
    }
}

impl ModelCoefficients {
    pub fn slope(&self, factor: Factor) -> f64 {
        self.slopes[factor.index()]
    }

    /// Fixed-effect part of a row's linear predictor.
    pub fn linear_predictor(&self, features: &FeatureCodes) -> f64 {
        Factor::ALL
            .iter()
            .map(|&f| self.slope(f) * f64::from(features.value(f)))
            .sum()
    }
}

/// Full configuration of a power study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Number of participants per dataset
    pub n_participants: usize,

    /// Number of test-test items (randomized ±1/0 feature codings)
    pub n_test_items: usize,

    /// Number of test-minimally-different items (fixed codings)
    pub n_mindiff_items: usize,

    /// Latent-model coefficients of the data-generating process
    pub coefficients: ModelCoefficients,

    /// Mean of the participant age distribution (rounded to whole years)
    pub age_mean: f64,

    /// Standard deviation of the participant age distribution
    pub age_sd: f64,

    /// Number of independent replications in the study
    pub n_replications: usize,

    /// Seed of the first replication; replication i uses base_seed + i
    pub base_seed: u64,

    /// Significance threshold used for the power tally
    pub alpha: f64,

    /// Cap on whole-dataset regenerations triggered by degenerate items
    pub max_regen_attempts: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            n_participants: 30,
            n_test_items: 15,
            n_mindiff_items: 20,
            coefficients: ModelCoefficients::default(),
            age_mean: 22.0,
            age_sd: 3.0,
            n_replications: 100,
            base_seed: 123,
            alpha: 0.05,
            max_regen_attempts: 1000,
        }
    }
}

impl StudyConfig {
    /// Validate the configuration. Must pass before any dataset is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_participants == 0 {
            return Err(ConfigError::NonPositiveCount("n_participants"));
        }
        if self.n_test_items == 0 {
            return Err(ConfigError::NonPositiveCount("n_test_items"));
        }
        if self.n_mindiff_items == 0 {
            return Err(ConfigError::NonPositiveCount("n_mindiff_items"));
        }
        if !(self.age_sd > 0.0) {
            return Err(ConfigError::NonPositiveCount("age_sd"));
        }
        let t = &self.coefficients.thresholds;
        if !(t[0] > t[1] && t[1] > t[2] && t[2] > t[3]) {
            return Err(ConfigError::NonMonotonicThresholds(*t));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if self.n_replications == 0 {
            return Err(ConfigError::ZeroReplications);
        }
        Ok(())
    }

    pub fn n_items(&self) -> usize {
        self.n_test_items + self.n_mindiff_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = StudyConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.n_items(), 35);
    }

    #[test]
    fn test_default_coefficients() {
        let coefs = ModelCoefficients::default();
        assert_eq!(coefs.thresholds, [4.0, 1.5, -0.01, -1.0]);
        assert_eq!(coefs.slope(Factor::NegEval), 1.3);
        assert_eq!(coefs.slope(Factor::TeDat), 0.0);
        assert_eq!(coefs.slope(Factor::DoubleNeg), -1.5);
    }

    #[test]
    fn test_linear_predictor() {
        let coefs = ModelCoefficients::default();
        let features = FeatureCodes {
            neg_eval: 1,
            focus: -1,
            constituent: 0,
            sequence: 1,
            te_dat: -1,
            double_neg: 0,
        };
        // 1.3 - 1.1 + 0.0 - 0.7 - 0.0 + 0.0
        assert!((coefs.linear_predictor(&features) - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_counts() {
        let cfg = StudyConfig {
            n_participants: 0,
            ..StudyConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveCount("n_participants"))
        ));
    }

    #[test]
    fn test_rejects_non_monotonic_thresholds() {
        let mut cfg = StudyConfig::default();
        cfg.coefficients.thresholds = [4.0, 1.5, 1.5, -1.0];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonMonotonicThresholds(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_alpha() {
        let cfg = StudyConfig {
            alpha: 1.0,
            ..StudyConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidAlpha(_))));
    }

    #[test]
    fn test_rejects_zero_replications() {
        let cfg = StudyConfig {
            n_replications: 0,
            ..StudyConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroReplications)));
    }
}
