//! Small numeric helpers shared by the simulator and the analytic estimator.
//!
//! The normal CDF uses the Abramowitz & Stegun 7.1.26 erf approximation
//! (absolute error < 1.5e-7) and the quantile uses the 26.2.23 rational
//! approximation (absolute error < 4.5e-4), which is ample precision for
//! Wald-style p-values and link quantiles.

use std::f64::consts::{PI, SQRT_2};

/// Inverse logit (standard logistic CDF).
pub fn inv_logit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = ((((1.061405429 * t - 1.453152027) * t + 1.421413741) * t - 0.284496736) * t
        + 0.254829592)
        * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal density.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

// Abramowitz & Stegun 26.2.23: quantile of the upper tail for p in (0, 0.5].
fn upper_tail_quantile(p: f64) -> f64 {
    let t = (-2.0 * p.ln()).sqrt();
    t - (2.515517 + 0.802853 * t + 0.010328 * t * t)
        / (1.0 + 1.432788 * t + 0.189269 * t * t + 0.001308 * t * t * t)
}

/// Standard normal quantile for p in (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0, "quantile domain is (0, 1)");
    if p < 0.5 {
        -upper_tail_quantile(p)
    } else {
        upper_tail_quantile(1.0 - p)
    }
}

/// Two-sided p-value for a standard normal test statistic.
pub fn two_sided_p(z: f64) -> f64 {
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}
