//! Lagrange-multiplier constraints between bodies
//!
//! Every constraint contributes `equation_count()` scalar equations appended
//! after the structural unknowns. The system assembler only talks to the
//! [`LagrangeConstraint`] capability; which concrete kinds exist is decided
//! by the [`ConstraintCatalogue`].

mod equal_dof;
mod fixed_dof;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::DofLayout;
use crate::elements::{Body, BodyStep};
use crate::error::{SolverError, SolverResult};
use crate::math::{Mat, Vec as MbVec};
use crate::model::MultibodyConfig;

pub use equal_dof::EqualDof;
pub use fixed_dof::FixedDof;

/// Kind of constraint and the unknowns it acts on
///
/// Dof indices are local to the body block: `0..num_dof` are nodal
/// unknowns, `num_dof..num_dof + 10` the frame unknowns of a free body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behaviour", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Rate of one unknown held at zero
    FixedDof { body: usize, dof: usize },
    /// Two unknowns forced to move at the same rate
    EqualDof {
        body_a: usize,
        dof_a: usize,
        body_b: usize,
        dof_b: usize,
    },
}

impl ConstraintKind {
    /// Bodies referenced by the constraint
    pub fn bodies(&self) -> Vec<usize> {
        match *self {
            ConstraintKind::FixedDof { body, .. } => vec![body],
            ConstraintKind::EqualDof { body_a, body_b, .. } => vec![body_a, body_b],
        }
    }
}

/// Configuration entry of one constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    #[serde(flatten)]
    pub kind: ConstraintKind,
    /// Time step index from which the constraint is released
    #[serde(default)]
    pub release_step: Option<usize>,
}

impl ConstraintConfig {
    /// Create a constraint that is never released
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            release_step: None,
        }
    }

    /// Release the constraint from the given time step on
    pub fn released_at(mut self, time_index: usize) -> Self {
        self.release_step = Some(time_index);
        self
    }

    /// Whether the constraint is enforced at a time step
    pub fn is_active(&self, time_index: usize) -> bool {
        self.release_step.map_or(true, |release| time_index < release)
    }
}

/// Everything a constraint may read while assembling its equations
#[derive(Debug, Clone, Copy)]
pub struct ConstraintInput<'a> {
    pub bodies: &'a [Body],
    pub layout: &'a DofLayout,
    /// Full displacement-like state, multipliers included
    pub q: &'a MbVec,
    /// Full velocity-like state, multipliers included
    pub dqdt: &'a MbVec,
    pub lambda: &'a MbVec,
    pub lambda_dot: &'a MbVec,
    pub time_index: usize,
    pub dt: f64,
}

/// Constraint contributions to the augmented system
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintMatrices {
    pub c: Mat,
    pub k: Mat,
    pub q: MbVec,
}

impl ConstraintMatrices {
    /// Zeroed contributions for an augmented system of dimension `size`
    pub fn zeros(size: usize) -> Self {
        Self {
            c: Mat::zeros(size, size),
            k: Mat::zeros(size, size),
            q: MbVec::zeros(size),
        }
    }

    /// Dimension of the augmented system
    pub fn size(&self) -> usize {
        self.q.len()
    }

    /// Check every block against the augmented system dimension
    pub fn check_size(&self, size: usize) -> SolverResult<()> {
        if self.c.shape() != (size, size) || self.k.shape() != (size, size) || self.q.len() != size {
            return Err(SolverError::Configuration(format!(
                "constraint contributions are C {}x{}, K {}x{}, Q {} for a system of {} unknowns",
                self.c.nrows(),
                self.c.ncols(),
                self.k.nrows(),
                self.k.ncols(),
                self.q.len(),
                size
            )));
        }
        Ok(())
    }

    /// Add the velocity-level equation `Σ coef·q̇[dof] = 0` for multiplier `ieq`
    ///
    /// Fills the multiplier row and column of C and the residual terms
    /// `Bᵀ·λ̇` (structural rows) and `B·q̇` (multiplier row).
    pub fn add_velocity_equation(
        &mut self,
        input: &ConstraintInput<'_>,
        ieq: usize,
        terms: &[(usize, f64)],
    ) -> SolverResult<()> {
        let row = input.layout.sys_size() + ieq;
        if row >= self.size() || ieq >= input.lambda_dot.len() {
            return Err(SolverError::Configuration(format!(
                "multiplier {} outside the {} constraint equations",
                ieq,
                input.lambda_dot.len()
            )));
        }

        for &(dof, coef) in terms {
            self.c[(row, dof)] += coef;
            self.c[(dof, row)] += coef;
            self.q[dof] += coef * input.lambda_dot[ieq];
            self.q[row] += coef * input.dqdt[dof];
        }
        Ok(())
    }
}

/// A kinematic constraint enforced with Lagrange multipliers
pub trait LagrangeConstraint: fmt::Debug + Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Number of scalar equations (and multipliers) contributed
    fn equation_count(&self) -> usize;

    /// Add the constraint's damping, stiffness and residual terms
    ///
    /// `first_eq` is the index of the constraint's first multiplier.
    fn assemble(
        &self,
        input: &ConstraintInput<'_>,
        first_eq: usize,
        out: &mut ConstraintMatrices,
    ) -> SolverResult<()>;

    /// Hook run once per converged step, after the frame positions are updated
    fn postprocess(&self, _bodies: &[Body], _steps: &mut [BodyStep]) {
        log::trace!("No postprocessing for {} constraint", self.name());
    }
}

/// Ordered set of active constraints
#[derive(Debug, Default)]
pub struct ConstraintSet {
    constraints: Vec<Box<dyn LagrangeConstraint>>,
    num_lm_eq: usize,
}

impl ConstraintSet {
    /// Build a set from constraint instances, keeping their order
    pub fn new(constraints: Vec<Box<dyn LagrangeConstraint>>) -> Self {
        let num_lm_eq = constraints.iter().map(|c| c.equation_count()).sum();
        Self {
            constraints,
            num_lm_eq,
        }
    }

    /// Total number of Lagrange multiplier equations
    pub fn total_equations(&self) -> usize {
        self.num_lm_eq
    }

    /// Number of active constraints
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether no constraint is active
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Assemble the contributions of all constraints
    ///
    /// The returned blocks have the full augmented dimension
    /// `sys_size + total_equations()`.
    pub fn assemble(&self, input: &ConstraintInput<'_>) -> SolverResult<ConstraintMatrices> {
        let size = input.layout.total_size(self.num_lm_eq);
        if input.q.len() != size || input.dqdt.len() != size {
            return Err(SolverError::Configuration(format!(
                "state has {} entries, constraint system needs {}",
                input.q.len(),
                size
            )));
        }
        if input.lambda.len() != self.num_lm_eq || input.lambda_dot.len() != self.num_lm_eq {
            return Err(SolverError::Configuration(format!(
                "{} multipliers given for {} constraint equations",
                input.lambda.len(),
                self.num_lm_eq
            )));
        }

        let mut out = ConstraintMatrices::zeros(size);
        let mut ieq = 0;
        for constraint in &self.constraints {
            constraint.assemble(input, ieq, &mut out)?;
            out.check_size(size)?;
            ieq += constraint.equation_count();
        }
        Ok(out)
    }

    /// Run the postprocessing hook of every constraint
    pub fn postprocess(&self, bodies: &[Body], steps: &mut [BodyStep]) {
        for constraint in &self.constraints {
            constraint.postprocess(bodies, steps);
        }
    }
}

/// Source of constraint instances for a multibody configuration
pub trait ConstraintCatalogue: fmt::Debug + Send + Sync {
    /// Active constraints of `config` at a time step, in configuration order
    fn initialize(&self, config: &MultibodyConfig, time_index: usize) -> SolverResult<ConstraintSet>;
}

/// Catalogue of the constraint kinds shipped with the crate
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalogue;

impl ConstraintCatalogue for StandardCatalogue {
    fn initialize(&self, config: &MultibodyConfig, time_index: usize) -> SolverResult<ConstraintSet> {
        let constraints = config
            .constraints
            .iter()
            .filter(|c| c.is_active(time_index))
            .map(|c| -> Box<dyn LagrangeConstraint> {
                match c.kind {
                    ConstraintKind::FixedDof { body, dof } => Box::new(FixedDof::new(body, dof)),
                    ConstraintKind::EqualDof {
                        body_a,
                        dof_a,
                        body_b,
                        dof_b,
                    } => Box::new(EqualDof::new(body_a, dof_a, body_b, dof_b)),
                }
            })
            .collect();
        Ok(ConstraintSet::new(constraints))
    }
}
