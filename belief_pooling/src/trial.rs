//! A single pooling trial: generate, solve, verify.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use fisher::{verify, ConicSolver, FisherMarket, MarketError};

use crate::generate;
use crate::PoolingConfig;

/// One completed trial, relabeled into pooling terms: budgets are the
/// forecasters' weights, valuations their beliefs, and the equilibrium
/// prices the pooled aggregate forecast.
#[derive(Debug, Clone, Serialize)]
pub struct PoolingTrial {
    pub trial_id: usize,
    pub weights: Vec<f64>,
    pub beliefs: Vec<Vec<f64>>,
    pub aggregates: Vec<f64>,
    /// Worst relative utility error across forecasters
    pub max_rel_error: f64,
    /// Whether verification stayed within the configured tolerance
    pub passed: bool,
}

/// Trial outcome; solver failures skip the trial rather than abort the
/// batch, so one hard instance cannot sink an experiment.
#[derive(Debug, Clone)]
pub enum TrialOutcome {
    Completed(PoolingTrial),
    Skipped { trial_id: usize, reason: String },
}

impl TrialOutcome {
    pub fn completed(&self) -> Option<&PoolingTrial> {
        match self {
            TrialOutcome::Completed(trial) => Some(trial),
            TrialOutcome::Skipped { .. } => None,
        }
    }
}

/// Run one seeded trial. Input errors propagate; a solver failure becomes
/// [`TrialOutcome::Skipped`].
pub fn run_trial(
    trial_id: usize,
    config: &PoolingConfig,
    solver: &dyn ConicSolver,
) -> Result<TrialOutcome, MarketError> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(trial_id as u64));
    let beliefs = generate::random_beliefs(config.num_bidders, config.num_goods, &mut rng);
    let weights = generate::random_weights(config.num_bidders, &mut rng);

    let market = FisherMarket::new(beliefs.clone(), weights.clone())?;
    match market.solve_market(config.family, solver) {
        Ok(eq) => {
            let report = verify(
                &eq.allocation,
                &eq.prices,
                market.valuations(),
                market.budgets(),
                config.family,
                config.tolerance,
            )?;
            log::debug!(
                "trial {trial_id}: aggregates {:?}, max rel error {:.3e}",
                eq.prices,
                report.max_rel_error
            );
            Ok(TrialOutcome::Completed(PoolingTrial {
                trial_id,
                weights,
                beliefs,
                aggregates: eq.prices,
                max_rel_error: report.max_rel_error,
                passed: report.passed,
            }))
        }
        Err(MarketError::SolverFailure(e)) => {
            log::warn!("trial {trial_id} skipped: {e}");
            Ok(TrialOutcome::Skipped {
                trial_id,
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use fisher::ClarabelSolver;

    #[test]
    fn trial_produces_a_pooled_distribution() {
        let config = PoolingConfig::default();
        let outcome = run_trial(0, &config, &ClarabelSolver::new()).unwrap();
        let trial = outcome.completed().expect("trial skipped");

        assert!(trial.passed, "max rel error {}", trial.max_rel_error);
        // normalized weights and beliefs make the aggregate a distribution
        assert_relative_eq!(
            trial.aggregates.iter().sum::<f64>(),
            1.0,
            max_relative = 1e-5
        );
        assert!(trial.aggregates.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn trials_are_reproducible() {
        let config = PoolingConfig::default();
        let solver = ClarabelSolver::new();
        let first = run_trial(3, &config, &solver).unwrap();
        let second = run_trial(3, &config, &solver).unwrap();
        let (first, second) = (
            first.completed().expect("trial skipped"),
            second.completed().expect("trial skipped"),
        );
        assert_eq!(first.weights, second.weights);
        assert_eq!(first.beliefs, second.beliefs);
        for (a, b) in first.aggregates.iter().zip(&second.aggregates) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }
}
