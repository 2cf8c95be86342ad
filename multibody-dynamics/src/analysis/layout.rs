//! Degree-of-freedom layout of the global multibody system

use std::ops::Range;

use serde::Serialize;

use crate::elements::{Body, FOR_DOFS};
use crate::error::{SolverError, SolverResult};

/// Contiguous block of one body in the global unknowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BodyBlock {
    /// First global index of the block
    pub first_dof: usize,
    /// Nodal unknowns of the body
    pub num_dof: usize,
    /// One past the last global index (frame unknowns included)
    pub last_dof: usize,
    /// Whether the frame of reference unknowns are appended
    pub free: bool,
}

impl BodyBlock {
    /// Number of unknowns in the block
    pub fn size(&self) -> usize {
        self.last_dof - self.first_dof
    }

    /// Global range of the whole block
    pub fn range(&self) -> Range<usize> {
        self.first_dof..self.last_dof
    }

    /// Global range of the nodal unknowns
    pub fn nodal_range(&self) -> Range<usize> {
        self.first_dof..self.first_dof + self.num_dof
    }

    /// Global range of the frame unknowns, if the body is free
    pub fn frame_range(&self) -> Option<Range<usize>> {
        if self.free {
            let start = self.first_dof + self.num_dof;
            Some(start..start + FOR_DOFS)
        } else {
            None
        }
    }
}

/// Partition of the structural unknowns into per-body blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DofLayout {
    blocks: Vec<BodyBlock>,
    sys_size: usize,
}

impl DofLayout {
    /// Lay out the bodies one after another in body order
    pub fn from_bodies(bodies: &[Body]) -> Self {
        let mut blocks = Vec::with_capacity(bodies.len());
        let mut first_dof = 0;
        for body in bodies {
            let last_dof = first_dof + body.block_size();
            blocks.push(BodyBlock {
                first_dof,
                num_dof: body.num_dof(),
                last_dof,
                free: body.is_free(),
            });
            first_dof = last_dof;
        }
        Self {
            blocks,
            sys_size: first_dof,
        }
    }

    /// Total structural unknowns
    pub fn sys_size(&self) -> usize {
        self.sys_size
    }

    /// Dimension of the augmented system for `num_lm_eq` multipliers
    pub fn total_size(&self, num_lm_eq: usize) -> usize {
        self.sys_size + num_lm_eq
    }

    /// Blocks, in body order
    pub fn blocks(&self) -> &[BodyBlock] {
        &self.blocks
    }

    /// Block of a body
    pub fn block(&self, ibody: usize) -> SolverResult<&BodyBlock> {
        self.blocks.get(ibody).ok_or(SolverError::BodyNotFound(ibody))
    }

    /// Global index of a body-local unknown
    pub fn global_dof(&self, ibody: usize, dof: usize) -> SolverResult<usize> {
        let block = self.block(ibody)?;
        if dof >= block.size() {
            return Err(SolverError::Configuration(format!(
                "dof {} out of range for body {} with {} unknowns",
                dof,
                ibody,
                block.size()
            )));
        }
        Ok(block.first_dof + dof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ForMovement;

    fn body(id: usize, free_nodes: usize, for_movement: ForMovement) -> Body {
        Body {
            id,
            global_nodes: (0..free_nodes + 1).collect(),
            free_node_mask: std::iter::once(false)
                .chain(std::iter::repeat(true).take(free_nodes))
                .collect(),
            pos_ini: vec![[0.0; 3]; free_nodes + 1],
            psi_ini: vec![[0.0; 3]; free_nodes + 1],
            for_movement,
        }
    }

    #[test]
    fn test_blocks_are_contiguous() {
        let bodies = vec![
            body(0, 2, ForMovement::Prescribed),
            body(1, 1, ForMovement::Free),
            body(2, 3, ForMovement::Prescribed),
        ];
        let layout = DofLayout::from_bodies(&bodies);

        assert_eq!(layout.blocks()[0].range(), 0..12);
        assert_eq!(layout.blocks()[1].range(), 12..28);
        assert_eq!(layout.blocks()[1].frame_range(), Some(18..28));
        assert_eq!(layout.blocks()[2].range(), 28..46);
        assert_eq!(layout.blocks()[2].frame_range(), None);
        assert_eq!(layout.sys_size(), 46);
        assert_eq!(layout.total_size(3), 49);

        for pair in layout.blocks().windows(2) {
            assert_eq!(pair[0].last_dof, pair[1].first_dof);
        }
    }

    #[test]
    fn test_global_dof() {
        let bodies = vec![body(0, 1, ForMovement::Prescribed), body(1, 1, ForMovement::Free)];
        let layout = DofLayout::from_bodies(&bodies);
        assert_eq!(layout.global_dof(1, 0).unwrap(), 6);
        assert_eq!(layout.global_dof(1, 15).unwrap(), 21);
        assert!(layout.global_dof(1, 16).is_err());
        assert!(matches!(layout.global_dof(2, 0), Err(SolverError::BodyNotFound(2))));
    }
}
