//! Constraint forces recovered from the converged multipliers

use crate::constraints::{ConstraintInput, ConstraintSet};
use crate::elements::{BodyStep, NODE_DOFS};
use crate::error::SolverResult;
use crate::math::Vec as MbVec;

use super::state::check_bodies;

/// Generalized constraint forces on the structural unknowns
///
/// `F = -C_lm[:, lm]·λ̇ - K_lm[:, lm]·λ`, truncated to `sys_size` entries.
/// Returns `None` when no constraint is active.
pub fn constraint_generalized_forces(
    constraints: &ConstraintSet,
    input: &ConstraintInput<'_>,
) -> SolverResult<Option<MbVec>> {
    if constraints.is_empty() {
        return Ok(None);
    }

    let lm = constraints.assemble(input)?;
    let sys_size = input.layout.sys_size();
    let num_lm_eq = constraints.total_equations();

    let forces = -(lm.c.columns(sys_size, num_lm_eq) * input.lambda_dot)
        - lm.k.columns(sys_size, num_lm_eq) * input.lambda;
    Ok(Some(forces.rows(0, sys_size).into_owned()))
}

/// Store the constraint forces on the body states
///
/// Nodal entries go to the masked nodes in node order, the next 10 entries
/// of a free body to its frame slot. Does nothing without constraints.
pub fn compute_forces_constraints(
    constraints: &ConstraintSet,
    input: &ConstraintInput<'_>,
    steps: &mut [BodyStep],
) -> SolverResult<()> {
    let Some(forces) = constraint_generalized_forces(constraints, input)? else {
        return Ok(());
    };
    check_bodies(input.bodies, steps.iter().map(|s| s.nodes.len()), input.layout)?;

    let forces = forces.as_slice();
    for ((body, step), block) in input
        .bodies
        .iter()
        .zip(steps.iter_mut())
        .zip(input.layout.blocks())
    {
        let mut dof = block.first_dof;
        for inode in body.free_nodes() {
            step.nodes[inode]
                .constraint_forces
                .copy_from_slice(&forces[dof..dof + NODE_DOFS]);
            dof += NODE_DOFS;
        }
        if let Some(range) = block.frame_range() {
            step.frame.constraint_forces.copy_from_slice(&forces[range]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DofLayout;
    use crate::constraints::{ConstraintCatalogue, ConstraintConfig, ConstraintKind, StandardCatalogue};
    use crate::elements::{Body, ForMovement};
    use crate::error::SolverError;
    use crate::model::{BodyConfig, MultibodyConfig};
    use approx::assert_relative_eq;

    fn bodies() -> Vec<Body> {
        vec![
            Body {
                id: 0,
                global_nodes: vec![0, 1],
                free_node_mask: vec![false, true],
                pos_ini: vec![[0.0; 3]; 2],
                psi_ini: vec![[0.0; 3]; 2],
                for_movement: ForMovement::Prescribed,
            },
            Body {
                id: 1,
                global_nodes: vec![2],
                free_node_mask: vec![true],
                pos_ini: vec![[0.0; 3]],
                psi_ini: vec![[0.0; 3]],
                for_movement: ForMovement::Free,
            },
        ]
    }

    #[test]
    fn test_forces_scattered_to_nodes_and_frame() {
        let bodies = bodies();
        let layout = DofLayout::from_bodies(&bodies);
        let config = MultibodyConfig {
            bodies: vec![BodyConfig::default(); 2],
            constraints: vec![
                ConstraintConfig::new(ConstraintKind::FixedDof { body: 0, dof: 1 }),
                ConstraintConfig::new(ConstraintKind::FixedDof { body: 1, dof: 8 }),
            ],
        };
        let set = StandardCatalogue.initialize(&config, 1).unwrap();
        let n = layout.total_size(2);
        let (q, dqdt) = (MbVec::zeros(n), MbVec::zeros(n));
        let lambda = MbVec::zeros(2);
        let lambda_dot = MbVec::from_vec(vec![4.0, -2.5]);
        let input = ConstraintInput {
            bodies: &bodies,
            layout: &layout,
            q: &q,
            dqdt: &dqdt,
            lambda: &lambda,
            lambda_dot: &lambda_dot,
            time_index: 1,
            dt: 0.01,
        };

        let mut steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        compute_forces_constraints(&set, &input, &mut steps).unwrap();

        assert_relative_eq!(steps[0].nodes[1].constraint_forces[1], -4.0);
        assert_eq!(steps[0].nodes[0].constraint_forces, [0.0; 6]);
        // body 1 local dof 8 is frame entry 2
        assert_relative_eq!(steps[1].frame.constraint_forces[2], 2.5);
        assert_eq!(steps[1].nodes[0].constraint_forces, [0.0; 6]);
    }

    #[test]
    fn test_no_constraints_is_noop() {
        let bodies = bodies();
        let layout = DofLayout::from_bodies(&bodies);
        let n = layout.sys_size();
        let (q, dqdt) = (MbVec::zeros(n), MbVec::zeros(n));
        let empty = MbVec::zeros(0);
        let input = ConstraintInput {
            bodies: &bodies,
            layout: &layout,
            q: &q,
            dqdt: &dqdt,
            lambda: &empty,
            lambda_dot: &empty,
            time_index: 1,
            dt: 0.01,
        };

        let mut steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        steps[0].nodes[1].constraint_forces = [7.0; 6];
        let before = steps.clone();

        let set = ConstraintSet::default();
        assert!(constraint_generalized_forces(&set, &input).unwrap().is_none());
        compute_forces_constraints(&set, &input, &mut steps).unwrap();
        assert_eq!(steps, before);
    }

    #[test]
    fn test_missing_node_state_rejected() {
        let bodies = bodies();
        let layout = DofLayout::from_bodies(&bodies);
        let config = MultibodyConfig {
            bodies: vec![BodyConfig::default(); 2],
            constraints: vec![ConstraintConfig::new(ConstraintKind::FixedDof { body: 0, dof: 1 })],
        };
        let set = StandardCatalogue.initialize(&config, 1).unwrap();
        let n = layout.total_size(1);
        let (q, dqdt) = (MbVec::zeros(n), MbVec::zeros(n));
        let lambda = MbVec::zeros(1);
        let lambda_dot = MbVec::from_vec(vec![1.0]);
        let input = ConstraintInput {
            bodies: &bodies,
            layout: &layout,
            q: &q,
            dqdt: &dqdt,
            lambda: &lambda,
            lambda_dot: &lambda_dot,
            time_index: 1,
            dt: 0.01,
        };

        let mut steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        steps[0].nodes.pop();

        let result = compute_forces_constraints(&set, &input, &mut steps);
        assert!(matches!(result, Err(SolverError::Configuration(_))));
    }
}
