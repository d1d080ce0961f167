//! Latent response simulator: the data-generating process of the study.
//!
//! Each row of the cross-joined design receives one ordinal response in
//! {1..5}, drawn from a cumulative-link (logit) mixed model with crossed
//! random intercepts by participant and by item plus a per-row error term.
//! A dataset whose items include an all-zero feature coding is discarded
//! and regenerated from the same random stream.

use crate::config::{ConfigError, StudyConfig};
use crate::design::{Design, Item, Participant};
use crate::stats::inv_logit;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("dataset for seed {seed} still degenerate after {attempts} regeneration attempts")]
    RegenerationLimit { seed: u64, attempts: usize },
}

/// One drawn response for a (participant, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub participant: u32,
    pub item: u32,
    /// Ordinal rating in 1..=5
    pub response: u8,
}

/// A complete simulated dataset, identified by its generating seed.
///
/// Immutable after generation. Observations are ordered participant-major,
/// matching `Design::rows`. Participant and item identifiers are 1-based
/// and sequential, so `id - 1` indexes the corresponding table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub seed: u64,
    pub participants: Vec<Participant>,
    pub items: Vec<Item>,
    pub observations: Vec<Observation>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.observations.len()
    }

    pub fn participant(&self, id: u32) -> &Participant {
        let p = &self.participants[(id - 1) as usize];
        debug_assert_eq!(p.id, id);
        p
    }

    pub fn item(&self, id: u32) -> &Item {
        let item = &self.items[(id - 1) as usize];
        debug_assert_eq!(item.id, id);
        item
    }

    /// Counts of responses 1..5, in order.
    pub fn response_histogram(&self) -> [usize; 5] {
        let mut hist = [0usize; 5];
        for obs in &self.observations {
            hist[(obs.response - 1) as usize] += 1;
        }
        hist
    }
}

/// Category probabilities over {1..5} for one row.
///
/// `shift` is the row's full latent offset (fixed effects + random effects
/// + error). Cumulative probabilities P(y >= j+1) come from the inverse
/// logit of each threshold plus the shift; category probabilities are the
/// successive differences. With strictly decreasing thresholds these are
/// non-negative and sum to 1; the `max(0.0)` only absorbs floating-point
/// cancellation at saturated shifts.
pub fn category_probabilities(shift: f64, thresholds: &[f64; 4]) -> [f64; 5] {
    let cum = [
        inv_logit(thresholds[0] + shift),
        inv_logit(thresholds[1] + shift),
        inv_logit(thresholds[2] + shift),
        inv_logit(thresholds[3] + shift),
    ];
    [
        (1.0 - cum[0]).max(0.0),
        (cum[0] - cum[1]).max(0.0),
        (cum[1] - cum[2]).max(0.0),
        (cum[2] - cum[3]).max(0.0),
        cum[3],
    ]
}

fn draw_category<R: Rng>(rng: &mut R, probs: &[f64; 5]) -> u8 {
    let u: f64 = rng.gen();
    let mut cum = 0.0;
    for (k, p) in probs.iter().enumerate() {
        cum += p;
        if u < cum {
            return (k + 1) as u8;
        }
    }
    5
}

/// Generate one complete dataset for the given seed.
///
/// The RNG is owned by this call and seeded only once; if a generated
/// dataset contains a degenerate item the whole draw (design, random
/// effects, responses) is discarded and generation continues on the same
/// stream. Exceeding `max_regen_attempts` is a fatal error.
pub fn generate_dataset(seed: u64, cfg: &StudyConfig) -> Result<Dataset, SimError> {
    cfg.validate()?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    for _ in 0..cfg.max_regen_attempts {
        let design = Design::generate(&mut rng, cfg);

        let participant_effects: Vec<f64> = (0..design.participants.len())
            .map(|_| rng.sample(StandardNormal))
            .collect();
        let item_effects: Vec<f64> = (0..design.items.len())
            .map(|_| rng.sample(StandardNormal))
            .collect();

        let mut observations = Vec::with_capacity(design.n_rows());
        for (p_idx, participant) in design.participants.iter().enumerate() {
            for (i_idx, item) in design.items.iter().enumerate() {
                let eta = cfg.coefficients.linear_predictor(&item.features);
                let error: f64 = rng.sample(StandardNormal);
                let shift = eta + participant_effects[p_idx] + item_effects[i_idx] + error;
                let probs = category_probabilities(shift, &cfg.coefficients.thresholds);
                observations.push(Observation {
                    participant: participant.id,
                    item: item.id,
                    response: draw_category(&mut rng, &probs),
                });
            }
        }

        if design.items.iter().all(|it| it.features.abs_sum() > 0) {
            return Ok(Dataset {
                seed,
                participants: design.participants,
                items: design.items,
                observations,
            });
        }
        // Degenerate item: reject the whole draw, keep the stream going.
    }

    Err(SimError::RegenerationLimit {
        seed,
        attempts: cfg.max_regen_attempts,
    })
}
