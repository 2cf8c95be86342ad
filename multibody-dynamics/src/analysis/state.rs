//! Mapping between per-body states and the flat global state vectors
//!
//! Block of a free body inside `q` / `dqdt` / `dqddt`:
//!
//! ```text
//! [ nodal unknowns (6 per masked node) | frame vel or acc (6) | quat or dquat (4) ]
//! ```
//!
//! The frame entries of `dqddt` hold the `state_ddot` slot verbatim.

use crate::elements::{Body, BodyStep, FrameState, NODE_DOFS};
use crate::error::{SolverError, SolverResult};
use crate::math::Vec as MbVec;

use super::layout::DofLayout;

/// Gather body states into the flat vectors
///
/// Entries past `sys_size` (the Lagrange multipliers) are left untouched.
pub fn disp2state(
    bodies: &[Body],
    steps: &[BodyStep],
    layout: &DofLayout,
    q: &mut MbVec,
    dqdt: &mut MbVec,
    dqddt: &mut MbVec,
) -> SolverResult<()> {
    check_shapes(bodies, steps.iter().map(|s| s.nodes.len()), layout, q, dqdt, dqddt)?;

    for ((body, step), block) in bodies.iter().zip(steps).zip(layout.blocks()) {
        let mut dof = block.first_dof;
        for inode in body.free_nodes() {
            let node = &step.nodes[inode];
            let (d, v, a) = (node.dofs(), node.dofs_dot(), node.dofs_ddot());
            for j in 0..NODE_DOFS {
                q[dof + j] = d[j];
                dqdt[dof + j] = v[j];
                dqddt[dof + j] = a[j];
            }
            dof += NODE_DOFS;
        }

        if let Some(range) = block.frame_range() {
            let frame = &step.frame;
            let start = range.start;
            for j in 0..6 {
                q[start + j] = frame.vel[j];
                dqdt[start + j] = frame.acc[j];
            }
            for j in 0..4 {
                q[start + 6 + j] = frame.quat[j];
                dqdt[start + 6 + j] = frame.dquatdt[j];
            }
            dqddt.rows_mut(start, range.len()).copy_from_slice(&frame.state_ddot);
        }
    }
    Ok(())
}

/// Scatter the flat vectors back onto the body states
pub fn state2disp(
    q: &MbVec,
    dqdt: &MbVec,
    dqddt: &MbVec,
    bodies: &[Body],
    steps: &mut [BodyStep],
    layout: &DofLayout,
) -> SolverResult<()> {
    check_shapes(bodies, steps.iter().map(|s| s.nodes.len()), layout, q, dqdt, dqddt)?;

    for ((body, step), block) in bodies.iter().zip(steps.iter_mut()).zip(layout.blocks()) {
        let mut dof = block.first_dof;
        for inode in body.free_nodes() {
            let range = dof..dof + NODE_DOFS;
            step.nodes[inode].set_dofs(
                &q.as_slice()[range.clone()],
                &dqdt.as_slice()[range.clone()],
                &dqddt.as_slice()[range],
            );
            dof += NODE_DOFS;
        }

        if let Some(range) = block.frame_range() {
            set_frame(
                &mut step.frame,
                &q.as_slice()[range.clone()],
                &dqdt.as_slice()[range.clone()],
                &dqddt.as_slice()[range],
            );
        }
    }
    Ok(())
}

fn set_frame(frame: &mut FrameState, q: &[f64], dqdt: &[f64], dqddt: &[f64]) {
    frame.vel.copy_from_slice(&q[0..6]);
    frame.quat.copy_from_slice(&q[6..10]);
    frame.acc.copy_from_slice(&dqdt[0..6]);
    frame.dquatdt.copy_from_slice(&dqdt[6..10]);
    frame.state_ddot.copy_from_slice(dqddt);
}

fn check_shapes(
    bodies: &[Body],
    node_counts: impl ExactSizeIterator<Item = usize>,
    layout: &DofLayout,
    q: &MbVec,
    dqdt: &MbVec,
    dqddt: &MbVec,
) -> SolverResult<()> {
    check_bodies(bodies, node_counts, layout)?;
    let n = layout.sys_size();
    if q.len() < n || dqdt.len() < n || dqddt.len() < n {
        return Err(SolverError::Configuration(format!(
            "state vectors shorter than the {} structural unknowns",
            n
        )));
    }
    Ok(())
}

/// Check body states and layout blocks against the bodies they describe
pub(super) fn check_bodies(
    bodies: &[Body],
    node_counts: impl ExactSizeIterator<Item = usize>,
    layout: &DofLayout,
) -> SolverResult<()> {
    if node_counts.len() != bodies.len() || layout.blocks().len() != bodies.len() {
        return Err(SolverError::Configuration(format!(
            "{} bodies, {} body states and {} layout blocks",
            bodies.len(),
            node_counts.len(),
            layout.blocks().len()
        )));
    }
    for (body, count) in bodies.iter().zip(node_counts) {
        if body.num_node() != count || body.free_node_mask.len() != count {
            return Err(SolverError::Configuration(format!(
                "body {} has {} nodes but its state holds {}",
                body.id,
                body.num_node(),
                count
            )));
        }
    }
    Ok(())
}
