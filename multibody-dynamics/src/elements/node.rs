//! Node state - kinematics and force outputs of one structural node

use serde::{Deserialize, Serialize};

/// Kinematic state of a node at one time step
///
/// Positions and rotation vectors are expressed in the frame of reference
/// of the body the node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeState {
    /// Position [X, Y, Z]
    pub pos: [f64; 3],
    /// Velocity
    pub pos_dot: [f64; 3],
    /// Acceleration
    pub pos_ddot: [f64; 3],
    /// Cartesian rotation vector
    pub psi: [f64; 3],
    /// First time derivative of the rotation vector
    pub psi_dot: [f64; 3],
    /// Second time derivative of the rotation vector
    pub psi_ddot: [f64; 3],

    /// Applied loads [FX, FY, FZ, MX, MY, MZ]
    pub applied_forces: [f64; 6],
    /// Gravity loads recorded after the last converged step
    #[serde(default)]
    pub gravity_forces: [f64; 6],
    /// Loads exerted by the kinematic constraints (diagnostic output)
    #[serde(default)]
    pub constraint_forces: [f64; 6],
}

impl NodeState {
    /// Create a node at rest at the given position
    pub fn at(pos: [f64; 3]) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    /// Displacement-like unknowns [X, Y, Z, RX, RY, RZ]
    pub fn dofs(&self) -> [f64; 6] {
        join(&self.pos, &self.psi)
    }

    /// Velocity-like unknowns
    pub fn dofs_dot(&self) -> [f64; 6] {
        join(&self.pos_dot, &self.psi_dot)
    }

    /// Acceleration-like unknowns
    pub fn dofs_ddot(&self) -> [f64; 6] {
        join(&self.pos_ddot, &self.psi_ddot)
    }

    /// Overwrite all three kinematic levels from 6-entry slices
    pub(crate) fn set_dofs(&mut self, q: &[f64], dqdt: &[f64], dqddt: &[f64]) {
        self.pos.copy_from_slice(&q[0..3]);
        self.psi.copy_from_slice(&q[3..6]);
        self.pos_dot.copy_from_slice(&dqdt[0..3]);
        self.psi_dot.copy_from_slice(&dqdt[3..6]);
        self.pos_ddot.copy_from_slice(&dqddt[0..3]);
        self.psi_ddot.copy_from_slice(&dqddt[3..6]);
    }
}

fn join(a: &[f64; 3], b: &[f64; 3]) -> [f64; 6] {
    [a[0], a[1], a[2], b[0], b[1], b[2]]
}
