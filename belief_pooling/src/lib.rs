//! Belief pooling through Fisher market equilibria.
//!
//! A pool of forecasters reports probabilistic beliefs over a set of
//! outcomes; each forecaster also carries a weight, its share of the pool.
//! Treating beliefs as valuations, weights as budgets and outcomes as
//! goods, the equilibrium prices of the resulting Fisher market are the
//! pooled forecast: the pari-mutuel aggregate of the individual beliefs.
//!
//! This crate is the experiment layer over the `fisher` engine: random
//! instance generation, trial batches (serial and parallel), and result
//! export. Every trial is seeded independently, so batches are
//! reproducible no matter how they are scheduled.

pub mod batch;
pub mod generate;
pub mod output;
pub mod trial;

pub use batch::{run_batch, run_batch_parallel, BatchSummary};
pub use trial::{run_trial, PoolingTrial, TrialOutcome};

use fisher::UtilityFamily;

/// Experiment configuration shared by every trial in a batch.
#[derive(Debug, Clone)]
pub struct PoolingConfig {
    /// Number of forecasters in the pool
    pub num_bidders: usize,
    /// Number of outcomes being forecast
    pub num_goods: usize,
    /// Utility family used for the market formulation
    pub family: UtilityFamily,
    /// Verification tolerance on relative utility error
    pub tolerance: f64,
    /// Base seed; trial k runs on seed + k
    pub seed: u64,
}

impl Default for PoolingConfig {
    fn default() -> Self {
        PoolingConfig {
            num_bidders: 2,
            num_goods: 2,
            family: UtilityFamily::CobbDouglas,
            tolerance: 1e-5,
            seed: 42,
        }
    }
}
