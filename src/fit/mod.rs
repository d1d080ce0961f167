//! Cumulative-link model fitting interface.
//!
//! The actual mixed-model estimator is an external capability behind the
//! `ClmmEstimator` trait: fit the fixed formula
//! `y ~ neg_eval + focus + constituent + sequence + te_dat + double_neg
//! + (1|participant) + (1|item)` with flexible thresholds under a given
//! link function, returning labeled estimates and an AIC. This module
//! also owns the four candidate link functions and AIC-based selection.

pub mod analytic;

pub use analytic::AnalyticEstimator;

use crate::design::Factor;
use crate::simulate::Dataset;
use crate::stats::{inv_logit, normal_cdf, normal_pdf, normal_quantile};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Candidate link functions, in canonical comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkFunction {
    Logit,
    LogLog,
    Probit,
    Cloglog,
}

impl LinkFunction {
    pub const ALL: [LinkFunction; 4] = [
        LinkFunction::Logit,
        LinkFunction::LogLog,
        LinkFunction::Probit,
        LinkFunction::Cloglog,
    ];

    pub fn index(self) -> usize {
        match self {
            LinkFunction::Logit => 0,
            LinkFunction::LogLog => 1,
            LinkFunction::Probit => 2,
            LinkFunction::Cloglog => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LinkFunction::Logit => "logit",
            LinkFunction::LogLog => "loglog",
            LinkFunction::Probit => "probit",
            LinkFunction::Cloglog => "cloglog",
        }
    }

    /// Inverse link: latent value to cumulative probability.
    pub fn cdf(self, x: f64) -> f64 {
        match self {
            LinkFunction::Logit => inv_logit(x),
            LinkFunction::LogLog => (-(-x).exp()).exp(),
            LinkFunction::Probit => normal_cdf(x),
            LinkFunction::Cloglog => 1.0 - (-x.exp()).exp(),
        }
    }

    /// Link: cumulative probability to latent value. `p` must lie in (0, 1).
    pub fn quantile(self, p: f64) -> f64 {
        match self {
            LinkFunction::Logit => (p / (1.0 - p)).ln(),
            LinkFunction::LogLog => -(-p.ln()).ln(),
            LinkFunction::Probit => normal_quantile(p),
            LinkFunction::Cloglog => (-(1.0 - p).ln()).ln(),
        }
    }

    /// Derivative of the inverse link.
    pub fn density(self, x: f64) -> f64 {
        match self {
            LinkFunction::Logit => {
                let c = inv_logit(x);
                c * (1.0 - c)
            }
            LinkFunction::LogLog => (-x - (-x).exp()).exp(),
            LinkFunction::Probit => normal_pdf(x),
            LinkFunction::Cloglog => (x - x.exp()).exp(),
        }
    }

    /// Category probabilities over {1..5} under this link, mirroring the
    /// successive-difference construction of the data-generating process.
    pub fn category_probabilities(self, shift: f64, thresholds: &[f64; 4]) -> [f64; 5] {
        let cum = [
            self.cdf(thresholds[0] + shift),
            self.cdf(thresholds[1] + shift),
            self.cdf(thresholds[2] + shift),
            self.cdf(thresholds[3] + shift),
        ];
        [
            (1.0 - cum[0]).max(0.0),
            (cum[0] - cum[1]).max(0.0),
            (cum[1] - cum[2]).max(0.0),
            (cum[2] - cum[3]).max(0.0),
            cum[3],
        ]
    }
}

impl fmt::Display for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum FitError {
    #[error("{link} link did not converge: {reason}")]
    NonConvergence { link: LinkFunction, reason: String },
    #[error("dataset is empty")]
    EmptyDataset,
}

/// One labeled estimate with its Wald standard error and p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    pub estimate: f64,
    pub std_error: f64,
    pub p_value: f64,
}

/// Result of fitting one (dataset, link) pair.
///
/// Thresholds and coefficients are exposed as labeled fields indexed by
/// category boundary and `Factor`, never by positional offsets into an
/// estimator-internal layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub link: LinkFunction,
    /// Flexible threshold estimates for the boundaries 1|2 .. 4|5
    pub thresholds: [CoefficientEstimate; 4],
    /// Fixed-effect estimates, indexed by `Factor` canonical order
    pub coefficients: [CoefficientEstimate; 6],
    pub aic: f64,
}

impl FittedModel {
    pub fn coefficient(&self, factor: Factor) -> &CoefficientEstimate {
        &self.coefficients[factor.index()]
    }
}

/// External cumulative-link mixed-model estimator.
pub trait ClmmEstimator {
    fn fit(&self, dataset: &Dataset, link: LinkFunction) -> Result<FittedModel, FitError>;
}

/// Fit one dataset under every candidate link, in canonical order.
///
/// Non-convergence of a single link is recoverable: the link is skipped
/// with a stderr warning and excluded from AIC comparison. The caller
/// treats an empty result (all four failed) as fatal for the run.
pub fn fit_all_links<E: ClmmEstimator>(estimator: &E, dataset: &Dataset) -> Vec<FittedModel> {
    let mut models = Vec::with_capacity(LinkFunction::ALL.len());
    for link in LinkFunction::ALL {
        match estimator.fit(dataset, link) {
            Ok(model) => models.push(model),
            Err(err) => eprintln!("warning: seed {}: {}", dataset.seed, err),
        }
    }
    models
}

/// Select the fitted model with minimum AIC.
///
/// Ties are broken by canonical link order (logit, loglog, probit,
/// cloglog), regardless of the order of `models`.
pub fn select_best_link(models: &[FittedModel]) -> Option<&FittedModel> {
    let mut best: Option<&FittedModel> = None;
    for link in LinkFunction::ALL {
        for model in models.iter().filter(|m| m.link == link) {
            match best {
                Some(current) if model.aic < current.aic => best = Some(model),
                None => best = Some(model),
                _ => {}
            }
        }
    }
    best
}
