//! Dynamic analysis: options, Newmark parameters and the time-step pipeline

mod constraint_forces;
mod layout;
mod newmark;
mod position;
mod state;
mod system;

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

pub use constraint_forces::{compute_forces_constraints, constraint_generalized_forces};
pub use layout::{BodyBlock, DofLayout};
pub use newmark::{NewmarkIntegrator, StepContext};
pub use position::integrate_position;
pub use state::{disp2state, state2disp};
pub use system::{AssembledSystem, GlobalMatrices, SystemAssembler};

/// Options for nonlinear dynamic multibody analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicOptions {
    /// Number of time steps run by `simulate`
    pub num_steps: usize,
    /// Maximum Newton iterations per time step
    pub max_iterations: usize,
    /// Convergence tolerance on the relative correction
    pub min_delta: f64,
    /// Numerical damping of the Newmark scheme
    pub newmark_damp: f64,
    /// Time step size
    pub dt: f64,
    /// Include gravity loads
    pub gravity_on: bool,
    /// Gravity acceleration magnitude
    pub gravity: f64,
    /// Direction opposite to which gravity acts, in the inertial frame
    pub gravity_dir: [f64; 3],
    /// Enable per-iteration progress output
    pub log: bool,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            num_steps: 500,
            max_iterations: 100,
            min_delta: 1e-5,
            newmark_damp: 1e-4,
            dt: 0.01,
            gravity_on: false,
            gravity: 9.81,
            gravity_dir: [0.0, 0.0, 1.0],
            log: false,
        }
    }
}

impl DynamicOptions {
    /// Enable logging
    pub fn with_logging(mut self) -> Self {
        self.log = true;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.min_delta = tol;
        self
    }

    /// Set the time step size
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the number of time steps
    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    /// Set the Newmark numerical damping
    pub fn with_newmark_damp(mut self, damp: f64) -> Self {
        self.newmark_damp = damp;
        self
    }

    /// Turn gravity on with the given magnitude and direction
    pub fn with_gravity(mut self, gravity: f64, dir: [f64; 3]) -> Self {
        self.gravity_on = true;
        self.gravity = gravity;
        self.gravity_dir = dir;
        self
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> SolverResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check option ranges
    pub fn validate(&self) -> SolverResult<()> {
        if self.max_iterations == 0 {
            return Err(SolverError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.min_delta > 0.0) {
            return Err(SolverError::Configuration(format!(
                "min_delta must be positive, got {}",
                self.min_delta
            )));
        }
        check_dt(self.dt)?;
        if !self.newmark_damp.is_finite() {
            return Err(SolverError::Configuration(
                "newmark_damp must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_dt(dt: f64) -> SolverResult<()> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(SolverError::Configuration(format!(
            "dt must be a positive finite number, got {}",
            dt
        )));
    }
    Ok(())
}

/// Newmark-beta coefficients
///
/// `beta` is always derived from `gamma`, which in turn comes from the
/// numerical damping coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewmarkParameters {
    gamma: f64,
    beta: f64,
}

impl NewmarkParameters {
    /// Coefficients for a numerical damping value
    pub fn from_damping(newmark_damp: f64) -> Self {
        let gamma = 0.5 + newmark_damp;
        let beta = 0.25 * (gamma + 0.5) * (gamma + 0.5);
        Self { gamma, beta }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Velocity increment per unit correction, `gamma / (beta dt)`
    pub fn velocity_factor(&self, dt: f64) -> f64 {
        self.gamma / (self.beta * dt)
    }

    /// Acceleration increment per unit correction, `1 / (beta dt²)`
    pub fn acceleration_factor(&self, dt: f64) -> f64 {
        1.0 / (self.beta * dt * dt)
    }
}

impl From<&DynamicOptions> for NewmarkParameters {
    fn from(options: &DynamicOptions) -> Self {
        Self::from_damping(options.newmark_damp)
    }
}
