//! Time step states - per body and for the whole structure

use serde::{Deserialize, Serialize};

use super::frame::FrameState;
use super::node::NodeState;
use crate::math::Mat3;
use crate::model::MultibodyConfig;

/// State of one body at one time step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyStep {
    /// Nodal states, in the body's local node order
    pub nodes: Vec<NodeState>,
    /// Frame of reference state
    pub frame: FrameState,
}

impl BodyStep {
    /// Create a body state at rest from undeformed nodal positions
    pub fn at_rest(pos_ini: &[[f64; 3]], psi_ini: &[[f64; 3]]) -> Self {
        let nodes = pos_ini
            .iter()
            .zip(psi_ini)
            .map(|(&pos, &psi)| NodeState {
                psi,
                ..NodeState::at(pos)
            })
            .collect();
        Self {
            nodes,
            frame: FrameState::default(),
        }
    }

    /// Rotation from the body frame to the inertial frame
    pub fn cga(&self) -> Mat3 {
        self.frame.cga()
    }
}

/// State of the complete structure at one time step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuralStep {
    /// Nodal states, in global node order
    pub nodes: Vec<NodeState>,
    /// Frame of reference state of each body
    pub frames: Vec<FrameState>,
    /// Multibody configuration active from this step on (None = initial one)
    #[serde(default)]
    pub mb_config: Option<MultibodyConfig>,
}
