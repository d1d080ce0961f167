//! Experimental design: participants, sentence-pair items, and the
//! long-format cross-join the simulator consumes.
//!
//! The design mimics a psycholinguistic acceptability-judgment task:
//! test-test item pairs carry randomized ±1/0 codings on five contrast
//! features, test-minimally-different pairs carry a fixed coding that only
//! activates the double-negation feature.

use crate::config::StudyConfig;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-effect factors of the model formula, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Factor {
    NegEval,
    Focus,
    Constituent,
    Sequence,
    TeDat,
    DoubleNeg,
}

impl Factor {
    pub const ALL: [Factor; 6] = [
        Factor::NegEval,
        Factor::Focus,
        Factor::Constituent,
        Factor::Sequence,
        Factor::TeDat,
        Factor::DoubleNeg,
    ];

    pub fn index(self) -> usize {
        match self {
            Factor::NegEval => 0,
            Factor::Focus => 1,
            Factor::Constituent => 2,
            Factor::Sequence => 3,
            Factor::TeDat => 4,
            Factor::DoubleNeg => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Factor::NegEval => "neg_eval",
            Factor::Focus => "focus",
            Factor::Constituent => "constituent",
            Factor::Sequence => "sequence",
            Factor::TeDat => "te_dat",
            Factor::DoubleNeg => "double_neg",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer feature coding of one item.
///
/// The five contrast features take values in {-1, 0, 1}; `double_neg` is a
/// 0/1 indicator. An item whose six codes are all zero is degenerate and
/// rejected dataset-wide by the generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCodes {
    pub neg_eval: i8,
    pub focus: i8,
    pub constituent: i8,
    pub sequence: i8,
    pub te_dat: i8,
    pub double_neg: i8,
}

impl FeatureCodes {
    pub fn value(&self, factor: Factor) -> i8 {
        match factor {
            Factor::NegEval => self.neg_eval,
            Factor::Focus => self.focus,
            Factor::Constituent => self.constituent,
            Factor::Sequence => self.sequence,
            Factor::TeDat => self.te_dat,
            Factor::DoubleNeg => self.double_neg,
        }
    }

    /// Sum of absolute feature values; zero means the item carries no
    /// information for contrast estimation.
    pub fn abs_sum(&self) -> i32 {
        Factor::ALL
            .iter()
            .map(|&f| i32::from(self.value(f)).abs())
            .sum()
    }
}

/// Item group within the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    TestTest,
    MinimallyDifferent,
}

impl ItemType {
    pub fn label(self) -> &'static str {
        match self {
            ItemType::TestTest => "test-test",
            ItemType::MinimallyDifferent => "test-minimally-different",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// 1-based sequential identifier, unique within a dataset
    pub id: u32,
    /// Age in whole years, drawn from a rounded normal distribution
    pub age: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// 1-based sequential identifier across both item groups
    pub id: u32,
    pub kind: ItemType,
    pub features: FeatureCodes,
}

/// The fixed experimental design of one dataset: participant and item
/// tables, cross-joined on demand into the long-format table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub participants: Vec<Participant>,
    pub items: Vec<Item>,
}

impl Design {
    /// Build one design from the configured sizes.
    ///
    /// Draw order is fixed (ages, then test-item features in declaration
    /// order) so a seeded RNG reproduces the design byte for byte.
    pub fn generate<R: Rng>(rng: &mut R, cfg: &StudyConfig) -> Design {
        let participants = (1..=cfg.n_participants)
            .map(|id| {
                let z: f64 = rng.sample(StandardNormal);
                Participant {
                    id: id as u32,
                    age: (cfg.age_mean + cfg.age_sd * z).round() as i32,
                }
            })
            .collect();

        let mut items = Vec::with_capacity(cfg.n_items());
        for id in 1..=cfg.n_test_items {
            let features = FeatureCodes {
                neg_eval: rng.gen_range(-1i8..=1),
                focus: rng.gen_range(-1i8..=1),
                constituent: rng.gen_range(-1i8..=1),
                sequence: rng.gen_range(-1i8..=1),
                te_dat: rng.gen_range(-1i8..=1),
                double_neg: 0,
            };
            items.push(Item {
                id: id as u32,
                kind: ItemType::TestTest,
                features,
            });
        }
        for offset in 0..cfg.n_mindiff_items {
            items.push(Item {
                id: (cfg.n_test_items + offset + 1) as u32,
                kind: ItemType::MinimallyDifferent,
                features: FeatureCodes {
                    neg_eval: 0,
                    focus: 0,
                    constituent: 0,
                    sequence: 0,
                    te_dat: 0,
                    double_neg: 1,
                },
            });
        }

        Design {
            participants,
            items,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.participants.len() * self.items.len()
    }

    /// Long-format cross-join in participant-major order. Random-effect
    /// alignment in the simulator depends on this order.
    pub fn rows(&self) -> impl Iterator<Item = (&Participant, &Item)> + '_ {
        let items = &self.items;
        self.participants
            .iter()
            .flat_map(move |p| items.iter().map(move |it| (p, it)))
    }
}
