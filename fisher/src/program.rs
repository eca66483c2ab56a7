//! Conic-program representation and the solver capability interface.
//!
//! Programs are written in the standard conic form
//!
//! ```text
//! minimize    c . x
//! subject to  A x + s = b,   s in K
//! ```
//!
//! where K is an ordered product of cones. Each constraint row owns one
//! coordinate of the slack vector s; rows are appended in cone order, so
//! the row list and the cone list always describe the same partition.
//! The engine only ever needs equalities, inequalities, logarithm
//! hypographs (exponential cones) and power terms (power cones).

use thiserror::Error;

/// A cone block covering one or more consecutive constraint rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cone {
    /// n equality rows: a.x = rhs
    Zero(usize),
    /// n inequality rows: a.x <= rhs
    Nonnegative(usize),
    /// Three rows (t, s, u) with s > 0 and s * exp(t / s) <= u
    Exponential,
    /// Three rows (x, s, w) with x, s >= 0 and x^alpha * s^(1 - alpha) >= |w|
    Power(f64),
}

impl Cone {
    /// Number of constraint rows the block spans.
    pub fn dim(&self) -> usize {
        match self {
            Cone::Zero(n) | Cone::Nonnegative(n) => *n,
            Cone::Exponential | Cone::Power(_) => 3,
        }
    }
}

/// One sparse constraint row `a . x + s = rhs`.
#[derive(Debug, Clone)]
pub struct Row {
    /// (variable index, coefficient) pairs; unmentioned variables are zero
    pub coeffs: Vec<(usize, f64)>,
    pub rhs: f64,
}

/// A conic program under construction or ready to solve.
#[derive(Debug, Clone)]
pub struct ConicProgram {
    pub num_vars: usize,
    /// Linear objective, to be minimized
    pub minimize: Vec<f64>,
    pub rows: Vec<Row>,
    pub cones: Vec<Cone>,
}

impl ConicProgram {
    pub fn new(num_vars: usize) -> Self {
        ConicProgram {
            num_vars,
            minimize: vec![0.0; num_vars],
            rows: Vec::new(),
            cones: Vec::new(),
        }
    }

    /// Add `coeff` to the objective coefficient of `var`.
    pub fn add_cost(&mut self, var: usize, coeff: f64) {
        self.minimize[var] += coeff;
    }

    /// Append an equality row `a . x = rhs`; returns its row index.
    pub fn equality(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) -> usize {
        self.rows.push(Row { coeffs, rhs });
        self.push_cone(Cone::Zero(1));
        self.rows.len() - 1
    }

    /// Append an inequality row `a . x <= rhs`; returns its row index.
    pub fn inequality(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) -> usize {
        self.rows.push(Row { coeffs, rhs });
        self.push_cone(Cone::Nonnegative(1));
        self.rows.len() - 1
    }

    /// Constrain `exp(t) <= u`, i.e. `t <= log(u)`, via an exponential cone
    /// with slack (t, 1, u).
    pub fn log_hypograph(&mut self, t: usize, u: usize) {
        self.rows.push(Row {
            coeffs: vec![(t, -1.0)],
            rhs: 0.0,
        });
        self.rows.push(Row {
            coeffs: Vec::new(),
            rhs: 1.0,
        });
        self.rows.push(Row {
            coeffs: vec![(u, -1.0)],
            rhs: 0.0,
        });
        self.cones.push(Cone::Exponential);
    }

    /// Constrain `w <= x^alpha` for `x >= 0` and `alpha` in (0, 1), via a
    /// power cone with slack (x, 1, w).
    pub fn power_hypograph(&mut self, alpha: f64, x: usize, w: usize) {
        self.rows.push(Row {
            coeffs: vec![(x, -1.0)],
            rhs: 0.0,
        });
        self.rows.push(Row {
            coeffs: Vec::new(),
            rhs: 1.0,
        });
        self.rows.push(Row {
            coeffs: vec![(w, -1.0)],
            rhs: 0.0,
        });
        self.cones.push(Cone::Power(alpha));
    }

    /// Total slack dimension across all cone blocks; always equals the row
    /// count for a well-formed program.
    pub fn cone_dim(&self) -> usize {
        self.cones.iter().map(Cone::dim).sum()
    }

    fn push_cone(&mut self, cone: Cone) {
        // merge runs of scalar cones into one block
        match (self.cones.last_mut(), cone) {
            (Some(Cone::Zero(n)), Cone::Zero(k)) => *n += k,
            (Some(Cone::Nonnegative(n)), Cone::Nonnegative(k)) => *n += k,
            _ => self.cones.push(cone),
        }
    }
}

/// Primal and dual values returned by a successful solve.
///
/// `dual[r]` is the multiplier of constraint row `r`; for an inequality it
/// is the standard nonnegative shadow price of its right-hand side.
#[derive(Debug, Clone)]
pub struct ConicSolution {
    pub primal: Vec<f64>,
    pub dual: Vec<f64>,
    pub objective: f64,
}

/// Terminal failure reported by a solver backend: infeasibility,
/// unboundedness, iteration limits or numerical breakdown. Distinct from a
/// solved-but-inaccurate outcome, which backends may still report as
/// success.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{status}")]
pub struct SolveError {
    pub status: String,
}

impl SolveError {
    pub fn new(status: impl Into<String>) -> Self {
        SolveError {
            status: status.into(),
        }
    }
}

/// Capability interface to a black-box conic solver.
///
/// The engine is generic over this trait so program construction and dual
/// extraction can be exercised against a canned backend in tests.
pub trait ConicSolver {
    fn solve(&self, program: &ConicProgram) -> Result<ConicSolution, SolveError>;
}
