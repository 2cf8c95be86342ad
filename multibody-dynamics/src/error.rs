//! Error types for the multibody solver

use thiserror::Error;

/// Main error type for multibody dynamic analysis
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Body {0} not found in structure")]
    BodyNotFound(usize),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Solver did not converge in {iterations} iterations (res = {res:e}, LM_res = {lm_res:e})")]
    NotConverged {
        iterations: usize,
        res: f64,
        lm_res: f64,
    },

    #[error("Solver diverged: {0}")]
    Diverged(String),

    #[error("Singular system matrix - constraints may be redundant or a body is unrestrained")]
    SingularMatrix,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No time step stored in structure - add an initial step first")]
    NoTimeStep,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SolverError {
    /// Whether this error means the time step itself could not be solved.
    ///
    /// Configuration problems are reported separately since retrying the
    /// step with a different `dt` cannot fix them.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            SolverError::NotConverged { .. } | SolverError::Diverged(_) | SolverError::SingularMatrix
        )
    }
}

/// Result type for multibody solver operations
pub type SolverResult<T> = Result<T, SolverError>;
