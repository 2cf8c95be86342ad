//! Body - one structural sub-assembly of a multibody structure

use serde::{Deserialize, Serialize};

use super::frame::FOR_DOFS;

/// Unknowns carried by each node selected by the free-dof mask
pub const NODE_DOFS: usize = 6;

/// How the frame of reference of a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForMovement {
    /// Frame motion is imposed; only nodal unknowns are solved for
    #[default]
    Prescribed,
    /// Frame velocity and orientation are unknowns of the system
    Free,
}

/// A body of the multibody structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Position of the body in the structure (0-based)
    pub id: usize,
    /// Indices of the structure nodes that belong to this body, in order
    pub global_nodes: Vec<usize>,
    /// Per-node selector: `true` where the node carries free unknowns
    pub free_node_mask: Vec<bool>,
    /// Undeformed nodal positions
    pub pos_ini: Vec<[f64; 3]>,
    /// Undeformed nodal rotation vectors
    pub psi_ini: Vec<[f64; 3]>,
    /// Frame of reference movement mode
    pub for_movement: ForMovement,
}

impl Body {
    /// Number of nodes in the body
    pub fn num_node(&self) -> usize {
        self.global_nodes.len()
    }

    /// Number of nodes selected by the free-dof mask
    pub fn num_free_nodes(&self) -> usize {
        self.free_node_mask.iter().filter(|&&free| free).count()
    }

    /// Local structural dof count (nodal unknowns only)
    pub fn num_dof(&self) -> usize {
        NODE_DOFS * self.num_free_nodes()
    }

    /// Size of the body's block in the global system
    pub fn block_size(&self) -> usize {
        match self.for_movement {
            ForMovement::Prescribed => self.num_dof(),
            ForMovement::Free => self.num_dof() + FOR_DOFS,
        }
    }

    /// Whether the frame of reference is part of the unknowns
    pub fn is_free(&self) -> bool {
        self.for_movement == ForMovement::Free
    }

    /// Local indices of the nodes selected by the mask, in node order
    pub fn free_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_node_mask
            .iter()
            .enumerate()
            .filter_map(|(i, &free)| if free { Some(i) } else { None })
    }
}
