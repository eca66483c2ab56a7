//! Competitive equilibrium computation for Fisher exchange markets.
//!
//! A Fisher market has a fixed unit supply of each divisible good and a set
//! of budget-constrained buyers with heterogeneous utility functions. The
//! engine solves the Eisenberg-Gale family of convex programs for the
//! equilibrium allocation and recovers market-clearing prices from the
//! supply constraints' dual values. The verifier independently recomputes
//! each buyer's utility-maximizing bundle from closed-form Marshallian
//! demand and checks that both computations agree.

use thiserror::Error;

pub mod demand;
pub mod market;
pub mod program;
pub mod solver;
pub mod utility;
pub mod verifier;

pub use demand::{indirect_utility, marshallian_demand};
pub use market::{Equilibrium, FisherMarket};
pub use program::{Cone, ConicProgram, ConicSolution, ConicSolver, SolveError};
pub use solver::ClarabelSolver;
pub use utility::UtilityFamily;
pub use verifier::{verify, BuyerCheck, VerificationReport};

/// Errors surfaced by the market engine and the demand verifier.
///
/// Nothing is retried internally; every failure propagates to the caller,
/// which may choose to resample a trial on [`MarketError::SolverFailure`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketError {
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("buyer {buyer} has non-positive budget {budget}")]
    InvalidBudget { buyer: usize, budget: f64 },

    #[error("buyer {buyer} has negative valuation {value} for good {good}")]
    InvalidValuation { buyer: usize, good: usize, value: f64 },

    #[error("unknown utility family \"{0}\"")]
    InvalidUtilityFamily(String),

    #[error("CES elasticity must lie strictly between 0 and 1, got {0}")]
    InvalidElasticity(f64),

    #[error("solver failure: {0}")]
    SolverFailure(#[from] SolveError),

    #[error("degenerate price vector: a zero-price good carries positive weight")]
    DegeneratePrice,
}
