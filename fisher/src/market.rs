//! The market equilibrium engine.
//!
//! For each utility family the non-convex equilibrium problem is rewritten
//! as a concave maximization in the Eisenberg-Gale style: buyer utilities
//! enter the objective through budget-weighted logarithms, so the
//! first-order conditions reproduce every buyer's demand at the prices
//! given by the supply constraints' dual values.

use serde::Serialize;

use crate::program::{ConicProgram, ConicSolver};
use crate::utility::{normalized_weights, UtilityFamily};
use crate::MarketError;

/// A Fisher market instance: one unit of each divisible good on the supply
/// side, budget-constrained buyers on the demand side. Valuations and
/// budgets are fixed at construction and never mutated.
#[derive(Debug, Clone)]
pub struct FisherMarket {
    valuations: Vec<Vec<f64>>,
    budgets: Vec<f64>,
}

/// Equilibrium allocation (buyers x goods) and per-good prices.
#[derive(Debug, Clone, Serialize)]
pub struct Equilibrium {
    pub allocation: Vec<Vec<f64>>,
    pub prices: Vec<f64>,
}

impl Equilibrium {
    /// Money spent by one buyer at the equilibrium prices.
    pub fn buyer_spend(&self, buyer: usize) -> f64 {
        self.allocation[buyer]
            .iter()
            .zip(&self.prices)
            .map(|(x, p)| x * p)
            .sum()
    }

    /// Total amount of one good handed out across all buyers.
    pub fn allocated_supply(&self, good: usize) -> f64 {
        self.allocation.iter().map(|row| row[good]).sum()
    }
}

/// Variable layout shared by all program builders: allocation variables
/// come first, one per (buyer, good) cell, followed by family-specific
/// auxiliaries. Supply row indices map duals back to prices.
struct ProgramLayout {
    supply_rows: Vec<usize>,
}

impl FisherMarket {
    /// Validate and take ownership of a valuation matrix (buyers x goods)
    /// and a budget vector.
    pub fn new(valuations: Vec<Vec<f64>>, budgets: Vec<f64>) -> Result<Self, MarketError> {
        if valuations.len() != budgets.len() {
            return Err(MarketError::DimensionMismatch {
                context: "valuation rows vs budgets",
                expected: budgets.len(),
                found: valuations.len(),
            });
        }
        if valuations.is_empty() || valuations[0].is_empty() {
            return Err(MarketError::DimensionMismatch {
                context: "market size",
                expected: 1,
                found: 0,
            });
        }
        let num_goods = valuations[0].len();
        for (i, row) in valuations.iter().enumerate() {
            if row.len() != num_goods {
                return Err(MarketError::DimensionMismatch {
                    context: "valuation row length",
                    expected: num_goods,
                    found: row.len(),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                if v < 0.0 {
                    return Err(MarketError::InvalidValuation {
                        buyer: i,
                        good: j,
                        value: v,
                    });
                }
            }
        }
        for (i, &b) in budgets.iter().enumerate() {
            if b <= 0.0 {
                return Err(MarketError::InvalidBudget { buyer: i, budget: b });
            }
        }
        Ok(FisherMarket {
            valuations,
            budgets,
        })
    }

    pub fn num_buyers(&self) -> usize {
        self.valuations.len()
    }

    pub fn num_goods(&self) -> usize {
        self.valuations[0].len()
    }

    pub fn valuations(&self) -> &[Vec<f64>] {
        &self.valuations
    }

    pub fn budgets(&self) -> &[f64] {
        &self.budgets
    }

    /// Solve for a competitive equilibrium under the given utility family.
    ///
    /// The solver is injected; pass [`crate::ClarabelSolver`] for the real
    /// backend. Solver failures (infeasible, unbounded, numerical) come
    /// back as [`MarketError::SolverFailure`] and are never retried here.
    pub fn solve_market(
        &self,
        family: UtilityFamily,
        solver: &dyn ConicSolver,
    ) -> Result<Equilibrium, MarketError> {
        family.validate()?;

        let (program, layout) = self.build_program(family);
        log::debug!(
            "{} market: {} buyers, {} goods, {} variables, {} rows",
            family,
            self.num_buyers(),
            self.num_goods(),
            program.num_vars,
            program.rows.len()
        );

        let solution = solver.solve(&program)?;
        if solution.primal.len() != program.num_vars || solution.dual.len() != program.rows.len() {
            return Err(MarketError::SolverFailure(crate::SolveError::new(
                "backend returned a malformed solution",
            )));
        }
        log::debug!("{} market solved, objective {:.6}", family, solution.objective);

        let m = self.num_goods();
        let allocation = (0..self.num_buyers())
            .map(|i| (0..m).map(|j| solution.primal[i * m + j].max(0.0)).collect())
            .collect();
        // dual round-off can leave tiny negative shadow prices
        let prices = layout
            .supply_rows
            .iter()
            .map(|&r| solution.dual[r].max(0.0))
            .collect();

        Ok(Equilibrium { allocation, prices })
    }

    fn build_program(&self, family: UtilityFamily) -> (ConicProgram, ProgramLayout) {
        match family {
            UtilityFamily::Linear => self.linear_program(false),
            UtilityFamily::Quasilinear => self.linear_program(true),
            UtilityFamily::CobbDouglas => self.cobb_douglas_program(),
            UtilityFamily::Leontief => self.leontief_program(),
            UtilityFamily::Ces { rho } => self.ces_program(rho),
        }
    }

    /// maximize sum_i b_i log(u_i) with u_i the buyer's linear utility.
    /// The quasilinear variant lets each buyer retain money d_i >= 0 at a
    /// marginal utility of one: maximize sum_i (b_i log(u_i) - d_i) with
    /// u_i = v_i . x_i + d_i.
    fn linear_program(&self, quasilinear: bool) -> (ConicProgram, ProgramLayout) {
        let n = self.num_buyers();
        let m = self.num_goods();
        let x = |i: usize, j: usize| i * m + j;
        let extra = if quasilinear { n } else { 0 };
        let retained = |i: usize| n * m + i;
        let u = |i: usize| n * m + extra + i;
        let t = |i: usize| n * m + extra + n + i;

        let mut prog = ConicProgram::new(n * m + extra + 2 * n);

        for i in 0..n {
            let mut coeffs = vec![(u(i), 1.0)];
            for j in 0..m {
                if self.valuations[i][j] > 0.0 {
                    coeffs.push((x(i, j), -self.valuations[i][j]));
                }
            }
            if quasilinear {
                coeffs.push((retained(i), -1.0));
            }
            prog.equality(coeffs, 0.0);
        }

        self.nonnegative_allocation(&mut prog, n, m);
        if quasilinear {
            for i in 0..n {
                prog.inequality(vec![(retained(i), -1.0)], 0.0);
                prog.add_cost(retained(i), 1.0);
            }
        }
        let supply_rows = self.supply_rows(&mut prog, n, m);

        for i in 0..n {
            prog.add_cost(t(i), -self.budgets[i]);
            prog.log_hypograph(t(i), u(i));
        }

        (prog, ProgramLayout { supply_rows })
    }

    /// maximize sum_i b_i sum_j w_ij log(x_ij) with w_i the buyer's
    /// normalized weights. Cells with zero weight are pinned to zero so the
    /// allocation matches the closed-form demand exactly.
    fn cobb_douglas_program(&self) -> (ConicProgram, ProgramLayout) {
        let n = self.num_buyers();
        let m = self.num_goods();
        let x = |i: usize, j: usize| i * m + j;

        let weights: Vec<Vec<f64>> = self
            .valuations
            .iter()
            .map(|row| normalized_weights(row))
            .collect();
        let positive: Vec<(usize, usize, f64)> = weights
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, w)| **w > 0.0)
                    .map(move |(j, &w)| (i, j, w))
            })
            .collect();

        let mut prog = ConicProgram::new(n * m + positive.len());

        for i in 0..n {
            for j in 0..m {
                if weights[i][j] == 0.0 {
                    prog.equality(vec![(x(i, j), 1.0)], 0.0);
                }
            }
        }

        self.nonnegative_allocation(&mut prog, n, m);
        let supply_rows = self.supply_rows(&mut prog, n, m);

        for (k, &(i, j, w)) in positive.iter().enumerate() {
            let t = n * m + k;
            prog.add_cost(t, -self.budgets[i] * w);
            prog.log_hypograph(t, x(i, j));
        }

        (prog, ProgramLayout { supply_rows })
    }

    /// maximize sum_i b_i log(u_i) with u_i <= x_ij / v_ij on every good
    /// the buyer requires.
    fn leontief_program(&self) -> (ConicProgram, ProgramLayout) {
        let n = self.num_buyers();
        let m = self.num_goods();
        let x = |i: usize, j: usize| i * m + j;
        let u = |i: usize| n * m + i;
        let t = |i: usize| n * m + n + i;

        let mut prog = ConicProgram::new(n * m + 2 * n);

        self.nonnegative_allocation(&mut prog, n, m);
        for i in 0..n {
            for j in 0..m {
                let v = self.valuations[i][j];
                if v > 0.0 {
                    // v_ij * u_i <= x_ij
                    prog.inequality(vec![(u(i), v), (x(i, j), -1.0)], 0.0);
                }
            }
        }
        let supply_rows = self.supply_rows(&mut prog, n, m);

        for i in 0..n {
            prog.add_cost(t(i), -self.budgets[i]);
            prog.log_hypograph(t(i), u(i));
        }

        (prog, ProgramLayout { supply_rows })
    }

    /// maximize sum_i (b_i / rho) log(sum_j v_ij x_ij^rho). The inner
    /// powers enter through one power-cone variable per positive valuation
    /// cell; x^rho is concave on rho in (0, 1), so the program stays
    /// convex.
    fn ces_program(&self, rho: f64) -> (ConicProgram, ProgramLayout) {
        let n = self.num_buyers();
        let m = self.num_goods();
        let x = |i: usize, j: usize| i * m + j;

        let positive: Vec<(usize, usize, f64)> = self
            .valuations
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, v)| **v > 0.0)
                    .map(move |(j, &v)| (i, j, v))
            })
            .collect();
        let k = positive.len();
        let w = |idx: usize| n * m + idx;
        let u = |i: usize| n * m + k + i;
        let t = |i: usize| n * m + k + n + i;

        let mut prog = ConicProgram::new(n * m + k + 2 * n);

        for i in 0..n {
            let mut coeffs = vec![(u(i), 1.0)];
            for (idx, &(bi, _, v)) in positive.iter().enumerate() {
                if bi == i {
                    coeffs.push((w(idx), -v));
                }
            }
            prog.equality(coeffs, 0.0);
        }

        self.nonnegative_allocation(&mut prog, n, m);
        let supply_rows = self.supply_rows(&mut prog, n, m);

        for (idx, &(i, j, _)) in positive.iter().enumerate() {
            prog.power_hypograph(rho, x(i, j), w(idx));
        }
        for i in 0..n {
            prog.add_cost(t(i), -self.budgets[i] / rho);
            prog.log_hypograph(t(i), u(i));
        }

        (prog, ProgramLayout { supply_rows })
    }

    fn nonnegative_allocation(&self, prog: &mut ConicProgram, n: usize, m: usize) {
        for i in 0..n {
            for j in 0..m {
                prog.inequality(vec![(i * m + j, -1.0)], 0.0);
            }
        }
    }

    /// One unit of each good: sum_i x_ij <= 1. The dual of row j is the
    /// equilibrium price of good j.
    fn supply_rows(&self, prog: &mut ConicProgram, n: usize, m: usize) -> Vec<usize> {
        (0..m)
            .map(|j| {
                let coeffs = (0..n).map(|i| (i * m + j, 1.0)).collect();
                prog.inequality(coeffs, 1.0)
            })
            .collect()
    }
}
