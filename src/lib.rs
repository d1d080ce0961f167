//! Monte Carlo power study for ordinal cumulative-link mixed models.
//!
//! This crate simulates Likert-scale acceptability-judgment experiments from
//! a known latent cumulative-link mixed model with crossed random intercepts
//! (by participant and by item), fits each simulated dataset under four
//! candidate link functions, selects the best-fitting link by AIC, and
//! aggregates link preferences and per-factor statistical power across
//! replications.

pub mod config;
pub mod csvout;
pub mod design;
pub mod fit;
pub mod power;
pub mod report;
pub mod simulate;
pub mod stats;
