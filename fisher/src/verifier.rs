//! Independent verification of equilibrium allocations.
//!
//! For each buyer the verifier recomputes the utility-maximizing bundle at
//! the equilibrium prices from closed-form demand, evaluates the utility of
//! the engine's allocation with the same functional, and compares the two.
//! Agreement for every buyer is the system's core correctness property:
//! an allocation nobody wants to trade away from, at prices that clear the
//! market, is a competitive equilibrium.

use serde::Serialize;

use crate::demand::{indirect_utility, marshallian_demand};
use crate::utility::UtilityFamily;
use crate::MarketError;

/// One buyer's comparison of best attainable utility against the utility
/// of the equilibrium allocation.
#[derive(Debug, Clone, Serialize)]
pub struct BuyerCheck {
    pub buyer: usize,
    /// Closed-form optimal bundle at the equilibrium prices
    pub optimal_bundle: Vec<f64>,
    /// Utility of the optimal bundle (the indirect utility)
    pub best_utility: f64,
    /// Utility of the bundle the engine allocated
    pub allocation_utility: f64,
    pub abs_error: f64,
    /// Absolute error over max(1, |best utility|)
    pub rel_error: f64,
}

/// Verification outcome across all buyers.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub checks: Vec<BuyerCheck>,
    pub tolerance: f64,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
    pub passed: bool,
}

impl VerificationReport {
    pub fn print_summary(&self) {
        println!(
            "Verification: {} ({} buyers, tolerance {:e})",
            if self.passed { "PASS" } else { "FAIL" },
            self.checks.len(),
            self.tolerance
        );
        println!(
            "  max error: {:.3e} absolute, {:.3e} relative",
            self.max_abs_error, self.max_rel_error
        );
        for check in self.checks.iter().filter(|c| c.rel_error > self.tolerance) {
            println!(
                "  buyer {}: best {:.6} vs allocated {:.6}",
                check.buyer, check.best_utility, check.allocation_utility
            );
        }
    }
}

/// Check that every buyer's equilibrium bundle is utility-maximizing at
/// the equilibrium prices, within `tolerance` of relative error.
pub fn verify(
    allocation: &[Vec<f64>],
    prices: &[f64],
    valuations: &[Vec<f64>],
    budgets: &[f64],
    family: UtilityFamily,
    tolerance: f64,
) -> Result<VerificationReport, MarketError> {
    if allocation.len() != valuations.len() || valuations.len() != budgets.len() {
        return Err(MarketError::DimensionMismatch {
            context: "allocation vs valuations vs budgets",
            expected: budgets.len(),
            found: allocation.len(),
        });
    }
    for row in allocation.iter().chain(valuations) {
        if row.len() != prices.len() {
            return Err(MarketError::DimensionMismatch {
                context: "matrix row vs prices",
                expected: prices.len(),
                found: row.len(),
            });
        }
    }

    let mut checks = Vec::with_capacity(budgets.len());
    for (i, ((bundle, valuation), &budget)) in allocation
        .iter()
        .zip(valuations)
        .zip(budgets)
        .enumerate()
    {
        let optimal_bundle = marshallian_demand(family, valuation, prices, budget)?;
        let best_utility = indirect_utility(family, valuation, prices, budget)?;
        let allocation_utility = family.bundle_utility(valuation, bundle, prices);
        let abs_error = (best_utility - allocation_utility).abs();
        let rel_error = abs_error / best_utility.abs().max(1.0);
        checks.push(BuyerCheck {
            buyer: i,
            optimal_bundle,
            best_utility,
            allocation_utility,
            abs_error,
            rel_error,
        });
    }

    let max_abs_error = checks.iter().map(|c| c.abs_error).fold(0.0, f64::max);
    let max_rel_error = checks.iter().map(|c| c.rel_error).fold(0.0, f64::max);
    let passed = max_rel_error <= tolerance;
    Ok(VerificationReport {
        checks,
        tolerance,
        max_abs_error,
        max_rel_error,
        passed,
    })
}
