//! Trial batches, serial and parallel.
//!
//! Trials are independent: each owns its market instance and derives its
//! RNG from the trial id, so parallel and serial runs of the same batch
//! produce identical results.

use rayon::prelude::*;

use fisher::{ClarabelSolver, MarketError};

use crate::trial::{run_trial, TrialOutcome};
use crate::PoolingConfig;

/// Run `num_trials` trials one after the other.
pub fn run_batch(
    config: &PoolingConfig,
    num_trials: usize,
) -> Result<Vec<TrialOutcome>, MarketError> {
    let solver = ClarabelSolver::new();
    (0..num_trials)
        .map(|trial_id| run_trial(trial_id, config, &solver))
        .collect()
}

/// Run `num_trials` trials across the rayon thread pool.
pub fn run_batch_parallel(
    config: &PoolingConfig,
    num_trials: usize,
) -> Result<Vec<TrialOutcome>, MarketError> {
    let solver = ClarabelSolver::new();
    (0..num_trials)
        .into_par_iter()
        .map(|trial_id| run_trial(trial_id, config, &solver))
        .collect()
}

/// Aggregate statistics over a batch of trial outcomes.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub num_trials: usize,
    pub completed: usize,
    pub skipped: usize,
    pub all_passed: bool,
    pub mean_rel_error: f64,
    pub worst_rel_error: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[TrialOutcome]) -> Self {
        let completed: Vec<_> = outcomes.iter().filter_map(TrialOutcome::completed).collect();
        let errors: Vec<f64> = completed.iter().map(|t| t.max_rel_error).collect();
        let mean_rel_error = if errors.is_empty() {
            0.0
        } else {
            errors.iter().sum::<f64>() / errors.len() as f64
        };
        let worst_rel_error = errors.iter().copied().fold(0.0, f64::max);

        BatchSummary {
            num_trials: outcomes.len(),
            completed: completed.len(),
            skipped: outcomes.len() - completed.len(),
            all_passed: completed.iter().all(|t| t.passed),
            mean_rel_error,
            worst_rel_error,
        }
    }

    pub fn print_summary(&self) {
        println!("\nBatch summary");
        println!(
            "  Trials: {} ({} completed, {} skipped)",
            self.num_trials, self.completed, self.skipped
        );
        println!(
            "  Verification: {} (mean error {:.3e}, worst {:.3e})",
            if self.all_passed { "all passed" } else { "FAILURES" },
            self.mean_rel_error,
            self.worst_rel_error
        );
    }
}
