//! Default solver backend over the Clarabel interior-point conic solver.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};

use crate::program::{Cone, ConicProgram, ConicSolution, ConicSolver, SolveError};

/// Conic solver backed by Clarabel.
///
/// The solver handle is created inside `solve` and dropped when the call
/// returns, on success and failure alike; instances of this type carry only
/// configuration and are freely shared across threads.
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    verbose: bool,
}

impl ClarabelSolver {
    pub fn new() -> Self {
        ClarabelSolver { verbose: false }
    }

    /// Enable the backend's per-iteration console output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        ClarabelSolver::new()
    }
}

impl ConicSolver for ClarabelSolver {
    fn solve(&self, program: &ConicProgram) -> Result<ConicSolution, SolveError> {
        let num_rows = program.rows.len();
        if num_rows != program.cone_dim() {
            return Err(SolveError::new(format!(
                "malformed program: {} rows but cone dimension {}",
                num_rows,
                program.cone_dim()
            )));
        }

        let mut triplets = Vec::new();
        let mut rhs = Vec::with_capacity(num_rows);
        for (r, row) in program.rows.iter().enumerate() {
            for &(c, v) in &row.coeffs {
                triplets.push((r, c, v));
            }
            rhs.push(row.rhs);
        }
        let a = csc_from_triplets(num_rows, program.num_vars, &triplets);
        // purely linear objective
        let p = CscMatrix::zeros((program.num_vars, program.num_vars));

        let cones: Vec<SupportedConeT<f64>> = program
            .cones
            .iter()
            .map(|cone| match cone {
                Cone::Zero(n) => SupportedConeT::ZeroConeT(*n),
                Cone::Nonnegative(n) => SupportedConeT::NonnegativeConeT(*n),
                Cone::Exponential => SupportedConeT::ExponentialConeT(),
                Cone::Power(alpha) => SupportedConeT::PowerConeT(*alpha),
            })
            .collect();

        let settings = DefaultSettings {
            verbose: self.verbose,
            ..DefaultSettings::default()
        };

        let mut solver =
            DefaultSolver::new(&p, &program.minimize, &a, &rhs, &cones, settings)
                .map_err(|e| SolveError::new(format!("{e:?}")))?;
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved => {}
            SolverStatus::AlmostSolved => {
                log::warn!("solver stopped at reduced accuracy; using its solution");
            }
            other => return Err(SolveError::new(format!("{other:?}"))),
        }

        Ok(ConicSolution {
            primal: solver.solution.x.clone(),
            dual: solver.solution.z.clone(),
            objective: solver.solution.obj_val,
        })
    }
}

/// Assemble a compressed-sparse-column matrix from (row, col, value)
/// triplets. Zero entries are dropped; the builders never emit duplicate
/// coordinates.
fn csc_from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> CscMatrix<f64> {
    let mut by_col: Vec<Vec<(usize, f64)>> = vec![Vec::new(); cols];
    for &(r, c, v) in triplets {
        if v != 0.0 {
            by_col[c].push((r, v));
        }
    }

    let mut colptr = Vec::with_capacity(cols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for col in &mut by_col {
        col.sort_by_key(|&(r, _)| r);
        for &(r, v) in col.iter() {
            rowval.push(r);
            nzval.push(v);
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(rows, cols, colptr, rowval, nzval)
}
