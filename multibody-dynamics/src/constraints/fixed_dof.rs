//! Fixed dof constraint - one unknown held at zero rate

use super::{ConstraintInput, ConstraintMatrices, LagrangeConstraint};
use crate::error::SolverResult;

/// Holds the rate of a single body unknown at zero
///
/// Applied to the frame velocity unknowns of a free body this clamps the
/// frame; applied to a nodal unknown it acts as a support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDof {
    pub body: usize,
    pub dof: usize,
}

impl FixedDof {
    pub fn new(body: usize, dof: usize) -> Self {
        Self { body, dof }
    }
}

impl LagrangeConstraint for FixedDof {
    fn name(&self) -> &'static str {
        "fixed_dof"
    }

    fn equation_count(&self) -> usize {
        1
    }

    fn assemble(
        &self,
        input: &ConstraintInput<'_>,
        first_eq: usize,
        out: &mut ConstraintMatrices,
    ) -> SolverResult<()> {
        let dof = input.layout.global_dof(self.body, self.dof)?;
        out.add_velocity_equation(input, first_eq, &[(dof, 1.0)])
    }
}
