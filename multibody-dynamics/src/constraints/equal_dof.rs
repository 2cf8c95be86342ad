//! Equal dof constraint - two unknowns moving at the same rate

use super::{ConstraintInput, ConstraintMatrices, LagrangeConstraint};
use crate::error::SolverResult;

/// Forces two unknowns, usually on different bodies, to share their rate
///
/// This is the building block of joints: tying the three translational
/// unknowns of two coincident nodes gives a spherical hinge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualDof {
    pub body_a: usize,
    pub dof_a: usize,
    pub body_b: usize,
    pub dof_b: usize,
}

impl EqualDof {
    pub fn new(body_a: usize, dof_a: usize, body_b: usize, dof_b: usize) -> Self {
        Self {
            body_a,
            dof_a,
            body_b,
            dof_b,
        }
    }
}

impl LagrangeConstraint for EqualDof {
    fn name(&self) -> &'static str {
        "equal_dof"
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
        let a = input.layout.global_dof(self.body_a, self.dof_a)?;
        let b = input.layout.global_dof(self.body_b, self.dof_b)?;
        out.add_velocity_equation(input, first_eq, &[(a, 1.0), (b, -1.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DofLayout;
    use crate::elements::{Body, ForMovement};
    use crate::math::Vec as MbVec;

    fn body(id: usize) -> Body {
        Body {
            id,
            global_nodes: vec![id],
            free_node_mask: vec![true],
            pos_ini: vec![[0.0; 3]],
            psi_ini: vec![[0.0; 3]],
            for_movement: ForMovement::Prescribed,
        }
    }

    #[test]
    fn test_equal_dof_couples_two_bodies() {
        let bodies = vec![body(0), body(1)];
        let layout = DofLayout::from_bodies(&bodies);
        let mut dqdt = MbVec::zeros(14);
        dqdt[0] = 2.0;
        dqdt[6] = 0.5;
        let q = MbVec::zeros(14);
        let lambda = MbVec::zeros(2);
        let lambda_dot = MbVec::from_vec(vec![0.0, 4.0]);
        let input = ConstraintInput {
            bodies: &bodies,
            layout: &layout,
            q: &q,
            dqdt: &dqdt,
            lambda: &lambda,
            lambda_dot: &lambda_dot,
            time_index: 0,
            dt: 0.01,
        };

        let mut out = ConstraintMatrices::zeros(14);
        EqualDof::new(0, 0, 1, 0).assemble(&input, 1, &mut out).unwrap();

        // Second multiplier row
        assert_eq!(out.c[(13, 0)], 1.0);
        assert_eq!(out.c[(13, 6)], -1.0);
        assert_eq!(out.c[(0, 13)], 1.0);
        assert_eq!(out.c[(6, 13)], -1.0);
        assert_eq!(out.q[0], 4.0);
        assert_eq!(out.q[6], -4.0);
        assert_eq!(out.q[13], 1.5);
    }
}
