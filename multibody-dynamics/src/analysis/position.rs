//! Translational position update of free frames of reference

use crate::elements::{Body, BodyStep};
use crate::error::{SolverError, SolverResult};
use crate::math::Vec3;

use super::NewmarkParameters;

/// Advance the frame origin of every free body over one time step
///
/// ```text
/// acc = (0.5 - beta)·C_old·a_old + beta·C_new·a_new
/// pos += dt·(C_old·v_old + dt·acc)
/// ```
///
/// `C` rotates frame (A) quantities into the inertial frame. Prescribed
/// bodies are left alone.
pub fn integrate_position(
    bodies: &[Body],
    previous: &[BodyStep],
    current: &mut [BodyStep],
    params: &NewmarkParameters,
    dt: f64,
) -> SolverResult<()> {
    if previous.len() != bodies.len() || current.len() != bodies.len() {
        return Err(SolverError::Configuration(format!(
            "{} bodies, {} previous states and {} current states",
            bodies.len(),
            previous.len(),
            current.len()
        )));
    }

    let beta = params.beta();
    for ((body, old), new) in bodies.iter().zip(previous).zip(current.iter_mut()) {
        if !body.is_free() {
            continue;
        }
        let a_old = Vec3::new(old.frame.acc[0], old.frame.acc[1], old.frame.acc[2]);
        let a_new = Vec3::new(new.frame.acc[0], new.frame.acc[1], new.frame.acc[2]);
        let v_old = Vec3::new(old.frame.vel[0], old.frame.vel[1], old.frame.vel[2]);

        let c_old = old.cga();
        let acc = c_old * a_old * (0.5 - beta) + new.cga() * a_new * beta;
        let vel = c_old * v_old;

        for i in 0..3 {
            new.frame.pos[i] += dt * (vel[i] + dt * acc[i]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ForMovement;
    use approx::assert_relative_eq;

    fn body(for_movement: ForMovement) -> Body {
        Body {
            id: 0,
            global_nodes: vec![0],
            free_node_mask: vec![false],
            pos_ini: vec![[0.0; 3]],
            psi_ini: vec![[0.0; 3]],
            for_movement,
        }
    }

    #[test]
    fn test_free_frame_moves() {
        let bodies = vec![body(ForMovement::Free)];
        let mut old = BodyStep::at_rest(&bodies[0].pos_ini, &bodies[0].psi_ini);
        old.frame.vel = [2.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        old.frame.acc = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut new = old.clone();
        new.frame.acc = [3.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let params = NewmarkParameters::from_damping(0.0);
        let mut current = vec![new];
        integrate_position(&bodies, &[old], &mut current, &params, 0.1).unwrap();

        // acc = 0.25·1 + 0.25·3 = 1; pos = 0.1·(2 + 0.1·1)
        assert_relative_eq!(current[0].frame.pos[0], 0.21, epsilon = 1e-12);
        assert_relative_eq!(current[0].frame.pos[1], 0.0);
    }

    #[test]
    fn test_rotated_frame_velocity() {
        let bodies = vec![body(ForMovement::Free)];
        let mut old = BodyStep::at_rest(&bodies[0].pos_ini, &bodies[0].psi_ini);
        // 90 degrees about z: body x maps to inertial y
        let h = 0.5f64.sqrt();
        old.frame.quat = [h, 0.0, 0.0, h];
        old.frame.vel = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut current = vec![old.clone()];

        let params = NewmarkParameters::from_damping(0.0);
        integrate_position(&bodies, &[old], &mut current, &params, 0.5).unwrap();

        assert_relative_eq!(current[0].frame.pos[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(current[0].frame.pos[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_prescribed_frame_untouched() {
        let bodies = vec![body(ForMovement::Prescribed)];
        let mut old = BodyStep::at_rest(&bodies[0].pos_ini, &bodies[0].psi_ini);
        old.frame.vel = [5.0; 6];
        let mut current = vec![old.clone()];
        let params = NewmarkParameters::from_damping(0.0);
        integrate_position(&bodies, &[old], &mut current, &params, 0.1).unwrap();
        assert_eq!(current[0].frame.pos, [0.0; 6]);
    }
}
