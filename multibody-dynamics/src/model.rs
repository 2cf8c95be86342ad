//! Multibody structure - bodies, configuration and time step history

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintConfig;
use crate::elements::{Body, BodyStep, ForMovement, FrameState, NodeState, StructuralStep};
use crate::error::{SolverError, SolverResult};

/// Per-body settings of the multibody configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Frame of reference movement mode
    #[serde(rename = "FoR_movement", alias = "for_movement")]
    pub for_movement: ForMovement,
}

/// Body relations: movement mode of each body plus the kinematic constraints
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultibodyConfig {
    /// One entry per body, in body order
    pub bodies: Vec<BodyConfig>,
    /// Lagrange constraints between bodies
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}

impl MultibodyConfig {
    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> SolverResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> SolverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Add a constraint
    pub fn with_constraint(mut self, constraint: ConstraintConfig) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Check the configuration against the declared number of bodies
    pub fn validate(&self, num_bodies: usize) -> SolverResult<()> {
        if self.bodies.len() != num_bodies {
            return Err(SolverError::Configuration(format!(
                "multibody configuration describes {} bodies, structure has {}",
                self.bodies.len(),
                num_bodies
            )));
        }
        for constraint in &self.constraints {
            for body in constraint.kind.bodies() {
                if body >= num_bodies {
                    return Err(SolverError::BodyNotFound(body));
                }
            }
        }
        Ok(())
    }
}

/// A multibody structure and the history of its converged time steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    /// Bodies, indexed by position
    bodies: Vec<Body>,
    /// Owning body of each global node
    node_body: Vec<usize>,
    /// Multibody configuration used when a step carries none
    pub ini_mb_config: MultibodyConfig,
    /// Converged time steps, oldest first
    pub timestep_info: Vec<StructuralStep>,
}

impl Structure {
    /// Build a structure from global node arrays
    ///
    /// # Arguments
    /// * `node_body` - Owning body of each node
    /// * `free_node_mask` - `true` for nodes that carry unknowns
    /// * `pos_ini` - Undeformed nodal positions
    /// * `psi_ini` - Undeformed nodal rotation vectors
    /// * `config` - Body relations; must describe exactly the bodies referenced by `node_body`
    pub fn new(
        node_body: Vec<usize>,
        free_node_mask: Vec<bool>,
        pos_ini: Vec<[f64; 3]>,
        psi_ini: Vec<[f64; 3]>,
        config: MultibodyConfig,
    ) -> SolverResult<Self> {
        let num_node = node_body.len();
        if free_node_mask.len() != num_node || pos_ini.len() != num_node || psi_ini.len() != num_node {
            return Err(SolverError::InvalidInput(format!(
                "node arrays disagree in length: {} bodies ids, {} mask entries, {} positions, {} rotations",
                num_node,
                free_node_mask.len(),
                pos_ini.len(),
                psi_ini.len()
            )));
        }

        let num_bodies = config.bodies.len();
        if let Some(&body) = node_body.iter().find(|&&b| b >= num_bodies) {
            return Err(SolverError::BodyNotFound(body));
        }
        config.validate(num_bodies)?;

        let mut bodies: Vec<Body> = config
            .bodies
            .iter()
            .enumerate()
            .map(|(id, body_config)| Body {
                id,
                global_nodes: Vec::new(),
                free_node_mask: Vec::new(),
                pos_ini: Vec::new(),
                psi_ini: Vec::new(),
                for_movement: body_config.for_movement,
            })
            .collect();

        for (inode, &ibody) in node_body.iter().enumerate() {
            let body = &mut bodies[ibody];
            body.global_nodes.push(inode);
            body.free_node_mask.push(free_node_mask[inode]);
            body.pos_ini.push(pos_ini[inode]);
            body.psi_ini.push(psi_ini[inode]);
        }

        let initial = StructuralStep {
            nodes: pos_ini
                .iter()
                .zip(&psi_ini)
                .map(|(&pos, &psi)| NodeState {
                    psi,
                    ..NodeState::at(pos)
                })
                .collect(),
            frames: vec![FrameState::default(); num_bodies],
            mb_config: None,
        };

        Ok(Self {
            bodies,
            node_body,
            ini_mb_config: config,
            timestep_info: vec![initial],
        })
    }

    /// Bodies of the structure
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Get a body by index
    pub fn body(&self, ibody: usize) -> SolverResult<&Body> {
        self.bodies.get(ibody).ok_or(SolverError::BodyNotFound(ibody))
    }

    /// Number of bodies
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Number of nodes
    pub fn num_node(&self) -> usize {
        self.node_body.len()
    }

    /// Total structural unknowns, frame unknowns of free bodies included
    pub fn sys_size(&self) -> usize {
        self.bodies.iter().map(Body::block_size).sum()
    }

    /// Latest converged time step
    pub fn last_step(&self) -> SolverResult<&StructuralStep> {
        self.timestep_info.last().ok_or(SolverError::NoTimeStep)
    }

    /// Mutable access to the latest time step
    pub fn last_step_mut(&mut self) -> SolverResult<&mut StructuralStep> {
        self.timestep_info.last_mut().ok_or(SolverError::NoTimeStep)
    }

    /// Append a converged time step to the history
    pub fn add_step(&mut self, step: StructuralStep) {
        self.timestep_info.push(step);
    }

    /// Configuration in force for a step
    pub fn mb_config_for<'a>(&'a self, step: &'a StructuralStep) -> &'a MultibodyConfig {
        step.mb_config.as_ref().unwrap_or(&self.ini_mb_config)
    }

    /// Split a structural step into independent per-body states
    pub fn split(&self, step: &StructuralStep) -> SolverResult<Vec<BodyStep>> {
        self.check_step(step)?;

        Ok(self
            .bodies
            .iter()
            .map(|body| BodyStep {
                nodes: body.global_nodes.iter().map(|&inode| step.nodes[inode]).collect(),
                frame: step.frames[body.id],
            })
            .collect())
    }

    /// Merge per-body states back into a structural step
    pub fn merge(&self, body_steps: &[BodyStep], step: &mut StructuralStep) -> SolverResult<()> {
        self.check_step(step)?;
        if body_steps.len() != self.bodies.len() {
            return Err(SolverError::InvalidInput(format!(
                "expected {} body states, got {}",
                self.bodies.len(),
                body_steps.len()
            )));
        }

        for (body, body_step) in self.bodies.iter().zip(body_steps) {
            if body_step.nodes.len() != body.num_node() {
                return Err(SolverError::InvalidInput(format!(
                    "body {} state has {} nodes, body has {}",
                    body.id,
                    body_step.nodes.len(),
                    body.num_node()
                )));
            }
            for (&inode, node) in body.global_nodes.iter().zip(&body_step.nodes) {
                step.nodes[inode] = *node;
            }
            step.frames[body.id] = body_step.frame;
        }
        Ok(())
    }

    fn check_step(&self, step: &StructuralStep) -> SolverResult<()> {
        if step.nodes.len() != self.num_node() || step.frames.len() != self.num_bodies() {
            return Err(SolverError::InvalidInput(format!(
                "step holds {} nodes and {} frames, structure has {} nodes and {} bodies",
                step.nodes.len(),
                step.frames.len(),
                self.num_node(),
                self.num_bodies()
            )));
        }
        Ok(())
    }
}
