//! Deterministic reference estimator.
//!
//! A full cumulative-link mixed-model optimizer is an external capability
//! (see `ClmmEstimator`); this estimator stands in for it so the pipeline
//! and the study can run end to end without one. It exploits the balanced
//! crossed design: averaging each item's responses over participants
//! cancels the participant intercepts, leaving item means that are ordinary
//! least-squares regressable on the six feature codes with honest
//! item-level standard errors. Slopes are mapped to the latent scale
//! through the link density at thresholds estimated from the marginal
//! cumulative response frequencies, and each link is scored with the
//! multinomial log-likelihood of the observed responses for AIC
//! comparison.

use crate::design::Factor;
use crate::fit::{ClmmEstimator, CoefficientEstimate, FitError, FittedModel, LinkFunction};
use crate::simulate::Dataset;
use crate::stats::two_sided_p;

/// Intercept plus the six factors.
const N_PREDICTORS: usize = 7;

/// Parameter count charged to the AIC: 4 thresholds, 6 slopes, and the two
/// random-intercept variances the latent model carries.
const N_MODEL_PARAMS: usize = 12;

/// Marginal cumulative frequencies are clamped away from {0, 1} so link
/// quantiles stay finite on saturated datasets.
const FREQ_CLAMP: f64 = 1e-6;

const PIVOT_TOL: f64 = 1e-9;

pub struct AnalyticEstimator;

impl ClmmEstimator for AnalyticEstimator {
    fn fit(&self, dataset: &Dataset, link: LinkFunction) -> Result<FittedModel, FitError> {
        if dataset.observations.is_empty() {
            return Err(FitError::EmptyDataset);
        }
        let n_items = dataset.items.len();
        if n_items <= N_PREDICTORS {
            return Err(FitError::NonConvergence {
                link,
                reason: format!("{} items leave no residual degrees of freedom", n_items),
            });
        }

        // Item-level mean responses (participant intercepts average out).
        let mut sums = vec![0.0f64; n_items];
        let mut counts = vec![0.0f64; n_items];
        for obs in &dataset.observations {
            let idx = (obs.item - 1) as usize;
            sums[idx] += f64::from(obs.response);
            counts[idx] += 1.0;
        }
        if counts.iter().any(|&c| c == 0.0) {
            return Err(FitError::NonConvergence {
                link,
                reason: "item without observations".to_string(),
            });
        }
        let means: Vec<f64> = sums.iter().zip(&counts).map(|(s, c)| s / c).collect();

        // Item-level design matrix: intercept plus the six feature codes.
        let x: Vec<[f64; N_PREDICTORS]> = dataset
            .items
            .iter()
            .map(|item| {
                let mut row = [1.0; N_PREDICTORS];
                for f in Factor::ALL {
                    row[1 + f.index()] = f64::from(item.features.value(f));
                }
                row
            })
            .collect();

        // Normal equations and their inverse for Wald standard errors.
        let mut xtx = [[0.0; N_PREDICTORS]; N_PREDICTORS];
        let mut xty = [0.0; N_PREDICTORS];
        for (row, &y) in x.iter().zip(&means) {
            for i in 0..N_PREDICTORS {
                xty[i] += row[i] * y;
                for j in 0..N_PREDICTORS {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        let xtx_inv = invert(&xtx).ok_or_else(|| FitError::NonConvergence {
            link,
            reason: "singular item design matrix".to_string(),
        })?;
        let mut beta = [0.0; N_PREDICTORS];
        for i in 0..N_PREDICTORS {
            for j in 0..N_PREDICTORS {
                beta[i] += xtx_inv[i][j] * xty[j];
            }
        }

        let fitted: Vec<f64> = x.iter().map(|row| dot(row, &beta)).collect();
        let rss: f64 = fitted
            .iter()
            .zip(&means)
            .map(|(f, y)| (y - f) * (y - f))
            .sum();
        let dof = (n_items - N_PREDICTORS) as f64;
        let sigma2 = rss / dof;

        // Flexible thresholds from marginal cumulative frequencies: the
        // latent value whose inverse link reproduces P(y >= j+1).
        let hist = dataset.response_histogram();
        let n_rows = dataset.observations.len() as f64;
        let mut thresholds = [CoefficientEstimate {
            estimate: 0.0,
            std_error: 0.0,
            p_value: 1.0,
        }; 4];
        let mut theta = [0.0; 4];
        for j in 0..4 {
            let above: usize = hist[j + 1..].iter().sum();
            let p = (above as f64 / n_rows).clamp(FREQ_CLAMP, 1.0 - FREQ_CLAMP);
            let estimate = link.quantile(p);
            // Delta method through the link at the estimated cut-point.
            let std_error = (p * (1.0 - p) / n_rows).sqrt() / link.density(estimate).max(1e-12);
            theta[j] = estimate;
            thresholds[j] = CoefficientEstimate {
                estimate,
                std_error,
                p_value: two_sided_p(estimate / std_error),
            };
        }

        // Response-mean change per unit of the latent scale, evaluated at
        // the estimated thresholds. Converts the item-level slopes (response
        // scale) into latent-scale coefficients.
        let dmean_deta: f64 = theta.iter().map(|&t| link.density(t)).sum();
        if dmean_deta < 1e-8 {
            return Err(FitError::NonConvergence {
                link,
                reason: "degenerate response distribution".to_string(),
            });
        }

        let mut coefficients = [CoefficientEstimate {
            estimate: 0.0,
            std_error: 0.0,
            p_value: 1.0,
        }; 6];
        for f in Factor::ALL {
            let k = 1 + f.index();
            let se_response = (sigma2 * xtx_inv[k][k]).sqrt();
            let z = if se_response > 0.0 {
                beta[k] / se_response
            } else {
                return Err(FitError::NonConvergence {
                    link,
                    reason: "zero residual variance".to_string(),
                });
            };
            coefficients[f.index()] = CoefficientEstimate {
                estimate: beta[k] / dmean_deta,
                std_error: se_response / dmean_deta,
                p_value: two_sided_p(z),
            };
        }

        // Multinomial log-likelihood of the observed responses under this
        // link, with item scores centered so the marginal thresholds apply.
        let grand_mean = fitted.iter().sum::<f64>() / n_items as f64;
        let eta: Vec<f64> = fitted
            .iter()
            .map(|m| (m - grand_mean) / dmean_deta)
            .collect();
        let mut loglik = 0.0;
        for obs in &dataset.observations {
            let idx = (obs.item - 1) as usize;
            let probs = link.category_probabilities(eta[idx], &theta);
            loglik += probs[(obs.response - 1) as usize].max(1e-12).ln();
        }
        let aic = -2.0 * loglik + 2.0 * N_MODEL_PARAMS as f64;

        Ok(FittedModel {
            link,
            thresholds,
            coefficients,
            aic,
        })
    }
}

fn dot(a: &[f64; N_PREDICTORS], b: &[f64; N_PREDICTORS]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gauss-Jordan inversion with partial pivoting. Returns `None` when a
/// pivot falls below tolerance (collinear item features).
fn invert(
    matrix: &[[f64; N_PREDICTORS]; N_PREDICTORS],
) -> Option<[[f64; N_PREDICTORS]; N_PREDICTORS]> {
    let n = N_PREDICTORS;
    let mut a = *matrix;
    let mut inv = [[0.0; N_PREDICTORS]; N_PREDICTORS];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < PIVOT_TOL {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}
