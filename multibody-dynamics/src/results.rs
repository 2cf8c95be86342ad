//! Result types for dynamic multibody analysis

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Convergence record of one solved time step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Index of the time step in the structure history
    pub time_index: usize,
    /// Newton solves performed
    pub iterations: usize,
    /// Final relative correction of the structural unknowns
    pub res: f64,
    /// Final relative correction of the Lagrange multipliers
    pub lm_res: f64,
    /// Active constraint equations
    pub num_lm_eq: usize,
    /// Time step size used
    pub dt: f64,
}

/// How a Newton loop ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewtonOutcome {
    /// Both residuals fell below the tolerance
    Converged { iterations: usize, res: f64, lm_res: f64 },
    /// Iteration limit reached; `iterations` is the index of the last iteration
    NotConverged { iterations: usize, res: f64, lm_res: f64 },
    /// A residual became NaN or infinite
    Diverged { iteration: usize, res: f64, lm_res: f64 },
}

impl NewtonOutcome {
    /// Turn the two failure outcomes into errors
    ///
    /// Returns `(iterations, res, lm_res)` of a converged loop.
    pub fn into_result(self) -> SolverResult<(usize, f64, f64)> {
        match self {
            NewtonOutcome::Converged {
                iterations,
                res,
                lm_res,
            } => Ok((iterations, res, lm_res)),
            NewtonOutcome::NotConverged {
                iterations,
                res,
                lm_res,
            } => Err(SolverError::NotConverged {
                iterations,
                res,
                lm_res,
            }),
            NewtonOutcome::Diverged {
                iteration,
                res,
                lm_res,
            } => Err(SolverError::Diverged(format!(
                "non-finite residual at iteration {} (res = {:e}, LM_res = {:e})",
                iteration, res, lm_res
            ))),
        }
    }
}
