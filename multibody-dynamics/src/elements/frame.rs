//! Frame of reference state of a body

use serde::{Deserialize, Serialize};

use crate::math::{self, Mat3};

/// Number of unknowns a free frame of reference adds to the system
pub const FOR_DOFS: usize = 10;

/// State of the moving frame of reference (A frame) attached to a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    /// Position of the frame origin and its orientation angles
    pub pos: [f64; 6],
    /// Linear and angular velocity, in the A frame
    pub vel: [f64; 6],
    /// Linear and angular acceleration, in the A frame
    pub acc: [f64; 6],
    /// Orientation quaternion [w, x, y, z]
    pub quat: [f64; 4],
    /// Quaternion rate
    pub dquatdt: [f64; 4],
    /// Second-derivative slot of the 10 frame unknowns
    #[serde(default)]
    pub state_ddot: [f64; FOR_DOFS],
    /// Generalized constraint loads on the frame equations (diagnostic output)
    #[serde(default)]
    pub constraint_forces: [f64; FOR_DOFS],
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            pos: [0.0; 6],
            vel: [0.0; 6],
            acc: [0.0; 6],
            quat: [1.0, 0.0, 0.0, 0.0],
            dquatdt: [0.0; 4],
            state_ddot: [0.0; FOR_DOFS],
            constraint_forces: [0.0; FOR_DOFS],
        }
    }
}

impl FrameState {
    /// Rotation from the body frame (A) to the inertial frame (G)
    pub fn cga(&self) -> Mat3 {
        math::quat2rotation(&self.quat)
    }

    /// Angular velocity part of the frame velocity
    pub fn omega(&self) -> [f64; 3] {
        [self.vel[3], self.vel[4], self.vel[5]]
    }
}
