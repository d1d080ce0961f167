//! Replication driver and power aggregation.
//!
//! Runs the study sequentially over its seed list: generate a dataset, fit
//! it under every candidate link, select the best link by AIC, and tally
//! selected links and per-factor significance. Each replication owns its
//! RNG (seeded from its own seed), so iterations are independent and the
//! loop could be parallelized without shared state.

use crate::config::StudyConfig;
use crate::design::Factor;
use crate::fit::{fit_all_links, select_best_link, ClmmEstimator, FittedModel, LinkFunction};
use crate::simulate::{generate_dataset, Dataset, SimError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("no link function converged for seed {seed}")]
    AllLinksFailed { seed: u64 },
}

/// Ordered collection of independently generated datasets, one per seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRepository {
    datasets: Vec<Dataset>,
}

impl DatasetRepository {
    /// Generate `n_replications` datasets for seeds
    /// `base_seed .. base_seed + n_replications`, in order.
    pub fn generate(cfg: &StudyConfig) -> Result<Self, SimError> {
        cfg.validate()?;
        let mut datasets = Vec::with_capacity(cfg.n_replications);
        for i in 0..cfg.n_replications {
            let seed = cfg.base_seed.wrapping_add(i as u64);
            datasets.push(generate_dataset(seed, cfg)?);
        }
        Ok(Self { datasets })
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Dataset> {
        self.datasets.get(index)
    }

    pub fn by_seed(&self, seed: u64) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.seed == seed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }
}

/// Outcome of one replication: the selected link and the factor p-values
/// read from the selected model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationRecord {
    pub seed: u64,
    pub selected_link: LinkFunction,
    pub selected_aic: f64,
    /// p-values indexed by `Factor` canonical order
    pub p_values: [f64; 6],
    /// How many of the four links converged for this dataset
    pub links_converged: usize,
}

/// Aggregated study results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub config: StudyConfig,
    /// Selected-link counts indexed by `LinkFunction` canonical order
    pub link_frequencies: [usize; 4],
    /// Proportion of replications with p < alpha, indexed by `Factor`
    pub factor_power: [f64; 6],
    /// Selected model of the first replication, kept for the detailed report
    pub first_selected: Option<FittedModel>,
    pub replications: Vec<ReplicationRecord>,
}

impl StudyReport {
    pub fn link_frequency(&self, link: LinkFunction) -> usize {
        self.link_frequencies[link.index()]
    }

    pub fn power(&self, factor: Factor) -> f64 {
        self.factor_power[factor.index()]
    }
}

/// Run the full replication study.
pub fn run_study<E: ClmmEstimator>(
    cfg: &StudyConfig,
    estimator: &E,
) -> Result<StudyReport, StudyError> {
    let repository = DatasetRepository::generate(cfg)?;

    let mut link_frequencies = [0usize; 4];
    let mut significant = [0usize; 6];
    let mut replications = Vec::with_capacity(repository.len());
    let mut first_selected = None;

    for dataset in repository.iter() {
        let models = fit_all_links(estimator, dataset);
        let best = select_best_link(&models).ok_or(StudyError::AllLinksFailed {
            seed: dataset.seed,
        })?;

        link_frequencies[best.link.index()] += 1;
        let mut p_values = [0.0; 6];
        for f in Factor::ALL {
            let p = best.coefficient(f).p_value;
            p_values[f.index()] = p;
            if p < cfg.alpha {
                significant[f.index()] += 1;
            }
        }
        if first_selected.is_none() {
            first_selected = Some(best.clone());
        }
        replications.push(ReplicationRecord {
            seed: dataset.seed,
            selected_link: best.link,
            selected_aic: best.aic,
            p_values,
            links_converged: models.len(),
        });
    }

    let n = cfg.n_replications as f64;
    let factor_power = significant.map(|count| count as f64 / n);

    Ok(StudyReport {
        config: cfg.clone(),
        link_frequencies,
        factor_power,
        first_selected,
        replications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{CoefficientEstimate, FitError};

    fn small_config(n_replications: usize) -> StudyConfig {
        StudyConfig {
            n_participants: 4,
            n_test_items: 3,
            n_mindiff_items: 2,
            n_replications,
            base_seed: 10,
            ..StudyConfig::default()
        }
    }

    fn estimate(p_value: f64) -> CoefficientEstimate {
        CoefficientEstimate {
            estimate: 0.0,
            std_error: 1.0,
            p_value,
        }
    }

    /// Fixed outcomes: logit always wins on AIC; double_neg significant,
    /// everything else null.
    struct StubEstimator;

    impl ClmmEstimator for StubEstimator {
        fn fit(&self, _dataset: &Dataset, link: LinkFunction) -> Result<FittedModel, FitError> {
            let aic = match link {
                LinkFunction::Logit => 100.0,
                _ => 200.0,
            };
            let mut coefficients = [estimate(0.8); 6];
            coefficients[Factor::DoubleNeg.index()] = estimate(0.001);
            Ok(FittedModel {
                link,
                thresholds: [estimate(0.5); 4],
                coefficients,
                aic,
            })
        }
    }

    /// Probit never converges; otherwise identical to `StubEstimator`.
    struct FlakyEstimator;

    impl ClmmEstimator for FlakyEstimator {
        fn fit(&self, dataset: &Dataset, link: LinkFunction) -> Result<FittedModel, FitError> {
            if link == LinkFunction::Probit {
                return Err(FitError::NonConvergence {
                    link,
                    reason: "stub".to_string(),
                });
            }
            StubEstimator.fit(dataset, link)
        }
    }

    struct FailingEstimator;

    impl ClmmEstimator for FailingEstimator {
        fn fit(&self, _dataset: &Dataset, link: LinkFunction) -> Result<FittedModel, FitError> {
            Err(FitError::NonConvergence {
                link,
                reason: "stub".to_string(),
            })
        }
    }

    #[test]
    fn test_repository_is_ordered_by_seed() {
        let cfg = small_config(4);
        let repo = DatasetRepository::generate(&cfg).unwrap();
        assert_eq!(repo.len(), 4);
        assert!(!repo.is_empty());
        for (i, dataset) in repo.iter().enumerate() {
            assert_eq!(dataset.seed, 10 + i as u64);
        }
        assert_eq!(repo.by_seed(12).unwrap().seed, 12);
        assert!(repo.by_seed(99).is_none());
        assert_eq!(repo.get(0).unwrap().seed, 10);
    }

    #[test]
    fn test_study_tallies_links_and_power() {
        let cfg = small_config(5);
        let report = run_study(&cfg, &StubEstimator).unwrap();

        assert_eq!(report.replications.len(), 5);
        assert_eq!(report.link_frequencies, [5, 0, 0, 0]);
        assert_eq!(report.link_frequency(LinkFunction::Logit), 5);
        assert_eq!(report.power(Factor::DoubleNeg), 1.0);
        assert_eq!(report.power(Factor::TeDat), 0.0);

        let first = report.first_selected.as_ref().unwrap();
        assert_eq!(first.link, LinkFunction::Logit);
        assert_eq!(report.replications[0].seed, 10);
        assert_eq!(report.replications[0].links_converged, 4);
    }

    #[test]
    fn test_non_convergent_link_is_skipped() {
        let cfg = small_config(3);
        let report = run_study(&cfg, &FlakyEstimator).unwrap();
        assert!(report
            .replications
            .iter()
            .all(|r| r.links_converged == 3 && r.selected_link == LinkFunction::Logit));
    }

    #[test]
    fn test_all_links_failing_is_fatal() {
        let cfg = small_config(2);
        let err = run_study(&cfg, &FailingEstimator).unwrap_err();
        assert!(matches!(err, StudyError::AllLinksFailed { seed: 10 }));
    }

    #[test]
    fn test_invalid_config_fails_before_fitting() {
        let cfg = StudyConfig {
            n_replications: 0,
            ..small_config(1)
        };
        assert!(matches!(
            run_study(&cfg, &StubEstimator),
            Err(StudyError::Sim(SimError::Config(_)))
        ));
    }
}
