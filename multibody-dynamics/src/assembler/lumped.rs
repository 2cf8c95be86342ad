//! Lumped mass-spring body model
//!
//! Every masked node is tied to its undeformed configuration by
//! translational and rotational springs and dampers, with an optional cubic
//! hardening term. Free bodies add rigid frame equations:
//!
//! ```text
//! m·a_frame - Σ F_nodes = 0
//! dquat/dt - ½ Ω(ω) quat = 0
//! ```

use serde::{Deserialize, Serialize};

use super::{BodyAssembler, BodyMatrices};
use crate::analysis::DynamicOptions;
use crate::elements::{Body, BodyStep, NODE_DOFS};
use crate::error::{SolverError, SolverResult};
use crate::math::{self, Vec3};

/// Lumped mass/spring/damper model of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumpedMassAssembler {
    /// Translational mass of each node
    pub node_mass: f64,
    /// Rotational inertia of each node
    pub node_inertia: f64,
    /// Translational spring stiffness
    pub stiffness: f64,
    /// Rotational spring stiffness
    pub rotational_stiffness: f64,
    /// Viscous damping on every nodal unknown
    pub damping: f64,
    /// Cubic hardening coefficient (0 = linear springs)
    pub cubic_stiffness: f64,
    /// Rigid mass of a free frame
    pub frame_mass: f64,
    /// Rigid rotational inertia of a free frame
    pub frame_inertia: f64,
}

impl Default for LumpedMassAssembler {
    fn default() -> Self {
        Self {
            node_mass: 1.0,
            node_inertia: 0.1,
            stiffness: 100.0,
            rotational_stiffness: 10.0,
            damping: 0.0,
            cubic_stiffness: 0.0,
            frame_mass: 1.0,
            frame_inertia: 0.1,
        }
    }
}

impl LumpedMassAssembler {
    /// Create a model with the given nodal mass and translational stiffness
    pub fn new(node_mass: f64, stiffness: f64) -> Self {
        Self {
            node_mass,
            stiffness,
            ..Self::default()
        }
    }

    /// Set viscous damping
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the cubic hardening coefficient
    pub fn with_cubic_stiffness(mut self, cubic: f64) -> Self {
        self.cubic_stiffness = cubic;
        self
    }

    /// Set nodal rotational properties
    pub fn with_rotational(mut self, inertia: f64, stiffness: f64) -> Self {
        self.node_inertia = inertia;
        self.rotational_stiffness = stiffness;
        self
    }

    /// Set rigid frame properties
    pub fn with_frame(mut self, mass: f64, inertia: f64) -> Self {
        self.frame_mass = mass;
        self.frame_inertia = inertia;
        self
    }

    fn validate(&self) -> SolverResult<()> {
        let masses = [self.node_mass, self.node_inertia, self.frame_mass, self.frame_inertia];
        if masses.iter().any(|&m| !(m > 0.0)) {
            return Err(SolverError::InvalidInput(
                "lumped masses and inertias must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Gravity acceleration in the body frame (zero when gravity is off)
    fn gravity_acceleration(&self, step: &BodyStep, options: &DynamicOptions) -> Vec3 {
        if !options.gravity_on {
            return Vec3::zeros();
        }
        step.cga().transpose() * Vec3::from(options.gravity_dir) * -options.gravity
    }

    /// Mass and stiffness of nodal unknown `j` (0..6)
    fn nodal_properties(&self, j: usize) -> (f64, f64) {
        if j < 3 {
            (self.node_mass, self.stiffness)
        } else {
            (self.node_inertia, self.rotational_stiffness)
        }
    }

    fn assemble_nodes(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
        size: usize,
    ) -> SolverResult<BodyMatrices> {
        self.validate()?;
        if step.nodes.len() != body.num_node() {
            return Err(SolverError::Configuration(format!(
                "body {} has {} nodes but its state holds {}",
                body.id,
                body.num_node(),
                step.nodes.len()
            )));
        }

        let g = self.gravity_acceleration(step, options);
        let mut out = BodyMatrices::zeros(size);

        for (k, inode) in body.free_nodes().enumerate() {
            let node = &step.nodes[inode];
            let (x, v, a) = (node.dofs(), node.dofs_dot(), node.dofs_ddot());
            let x0 = body.pos_ini[inode].iter().chain(&body.psi_ini[inode]);

            for (j, &x0_j) in x0.enumerate() {
                let row = k * NODE_DOFS + j;
                let (mass, stiffness) = self.nodal_properties(j);
                let dx = x[j] - x0_j;
                let mut f_ext = node.applied_forces[j];
                if j < 3 {
                    f_ext += mass * g[j];
                }

                out.m[(row, row)] = mass;
                out.c[(row, row)] = self.damping;
                out.k[(row, row)] = stiffness + 3.0 * self.cubic_stiffness * dx * dx;
                out.q[row] = mass * a[j]
                    + self.damping * v[j]
                    + stiffness * dx
                    + self.cubic_stiffness * dx * dx * dx
                    - f_ext;
            }
        }
        Ok(out)
    }
}

impl BodyAssembler for LumpedMassAssembler {
    fn assemble_prescribed(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices> {
        self.assemble_nodes(body, step, options, body.num_dof())
    }

    fn assemble_free(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices> {
        let base = body.num_dof();
        let mut out = self.assemble_nodes(body, step, options, body.block_size())?;
        let frame = &step.frame;

        // Rigid frame momentum: resultant of all nodal loads
        let g = self.gravity_acceleration(step, options);
        let mut resultant = [0.0; 6];
        for node in &step.nodes {
            for (r, f) in resultant.iter_mut().zip(&node.applied_forces) {
                *r += f;
            }
        }
        for j in 0..6 {
            let row = base + j;
            let mass = if j < 3 { self.frame_mass } else { self.frame_inertia };
            let mut force = resultant[j];
            if j < 3 {
                force += self.frame_mass * g[j];
            }
            out.c[(row, row)] = mass;
            out.q[row] = mass * frame.acc[j] - force;
        }

        // Quaternion kinematics
        let omega = frame.omega();
        let rate = math::quaternion_rate_matrix(&omega);
        let xi = math::quaternion_omega_jacobian(&frame.quat);
        let quat_rate = rate * nalgebra::Vector4::from(frame.quat) * 0.5;
        let quat_row = base + 6;
        for r in 0..4 {
            out.c[(quat_row + r, quat_row + r)] = 1.0;
            for s in 0..4 {
                out.k[(quat_row + r, quat_row + s)] = -0.5 * rate[(r, s)];
            }
            for s in 0..3 {
                out.k[(quat_row + r, base + 3 + s)] = -0.5 * xi[(r, s)];
            }
            out.q[quat_row + r] = frame.dquatdt[r] - quat_rate[r];
        }

        Ok(out)
    }

    fn correct_gravity_forces(
        &self,
        _body: &Body,
        step: &mut BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<()> {
        let g = self.gravity_acceleration(step, options);
        for node in step.nodes.iter_mut() {
            node.gravity_forces = [
                self.node_mass * g[0],
                self.node_mass * g[1],
                self.node_mass * g[2],
                0.0,
                0.0,
                0.0,
            ];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ForMovement;
    use approx::assert_relative_eq;

    fn body(for_movement: ForMovement) -> Body {
        Body {
            id: 0,
            global_nodes: vec![0, 1],
            free_node_mask: vec![false, true],
            pos_ini: vec![[0.0; 3], [1.0, 0.0, 0.0]],
            psi_ini: vec![[0.0; 3]; 2],
            for_movement,
        }
    }

    #[test]
    fn test_prescribed_blocks() {
        let body = body(ForMovement::Prescribed);
        let mut step = BodyStep::at_rest(&body.pos_ini, &body.psi_ini);
        step.nodes[1].pos = [1.5, 0.0, 0.0];
        step.nodes[1].pos_ddot = [2.0, 0.0, 0.0];
        step.nodes[1].applied_forces = [10.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let model = LumpedMassAssembler::new(2.0, 100.0).with_cubic_stiffness(8.0);
        let out = model
            .assemble_prescribed(&body, &step, &DynamicOptions::default())
            .unwrap();

        out.check_size(0, 6).unwrap();
        assert_relative_eq!(out.m[(0, 0)], 2.0);
        assert_relative_eq!(out.k[(0, 0)], 100.0 + 3.0 * 8.0 * 0.25);
        // 2*2 + 100*0.5 + 8*0.125 - 10
        assert_relative_eq!(out.q[0], 45.0);
        assert_relative_eq!(out.k[(3, 3)], 10.0);
        assert_relative_eq!(out.q[3], 0.0);
    }

    #[test]
    fn test_free_body_at_rest_has_zero_residual() {
        let body = body(ForMovement::Free);
        let step = BodyStep::at_rest(&body.pos_ini, &body.psi_ini);
        let out = LumpedMassAssembler::default()
            .assemble_free(&body, &step, &DynamicOptions::default())
            .unwrap();

        out.check_size(0, 16).unwrap();
        assert_relative_eq!(out.q.norm(), 0.0);
        assert_relative_eq!(out.c[(6, 6)], 1.0);
        assert_relative_eq!(out.c[(12, 12)], 1.0);
        // d(quat rate)/d(omega) at identity: -½ on the vector part
        assert_relative_eq!(out.k[(13, 9)], -0.5);
    }

    #[test]
    fn test_quaternion_residual_spinning_frame() {
        let body = body(ForMovement::Free);
        let mut step = BodyStep::at_rest(&body.pos_ini, &body.psi_ini);
        step.frame.vel = [0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        let out = LumpedMassAssembler::default()
            .assemble_free(&body, &step, &DynamicOptions::default())
            .unwrap();

        // dquat/dt = ½ Ω(ω) q = [0, 0, 0, 1] at identity with ωz = 2
        assert_relative_eq!(out.q[15], -1.0);
        assert_relative_eq!(out.q[12], 0.0);
    }

    #[test]
    fn test_gravity_in_body_frame() {
        let body = body(ForMovement::Prescribed);
        let mut step = BodyStep::at_rest(&body.pos_ini, &body.psi_ini);
        let options = DynamicOptions::default().with_gravity(9.81, [0.0, 0.0, 1.0]);
        let model = LumpedMassAssembler::new(2.0, 100.0);

        let out = model.assemble_prescribed(&body, &step, &options).unwrap();
        assert_relative_eq!(out.q[2], 2.0 * 9.81, epsilon = 1e-12);

        model.correct_gravity_forces(&body, &mut step, &options).unwrap();
        assert_relative_eq!(step.nodes[0].gravity_forces[2], -2.0 * 9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_zero_mass() {
        let body = body(ForMovement::Prescribed);
        let step = BodyStep::at_rest(&body.pos_ini, &body.psi_ini);
        let model = LumpedMassAssembler::new(0.0, 1.0);
        assert!(model
            .assemble_prescribed(&body, &step, &DynamicOptions::default())
            .is_err());
    }
}
