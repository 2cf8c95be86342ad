//! Mathematical utilities for multibody dynamics
//!
//! Dense linear algebra helpers plus the quaternion transforms used by
//! the frame-of-reference equations.

use nalgebra::{DMatrix, DVector, Matrix3, Matrix4, Matrix4x3, Quaternion, UnitQuaternion, Vector3};

pub type Mat = DMatrix<f64>;
pub type Vec = DVector<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Mat4 = Matrix4<f64>;
pub type Vec3 = Vector3<f64>;

/// Solve a linear system using LU decomposition
///
/// Returns `None` when the matrix is singular (a zero pivot appears in U).
pub fn solve_linear_system(a: &Mat, b: &Vec) -> Option<Vec> {
    a.clone().lu().solve(b)
}

/// Largest absolute entry of a sequence of values
///
/// NaN propagates, so a poisoned correction vector is never reported as
/// small. Empty input gives 0.0.
pub fn max_abs<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut max = 0.0_f64;
    for &v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        max = max.max(v.abs());
    }
    max
}

/// Copy a square block into `target` with its top-left corner at `(offset, offset)`
pub fn place_diagonal_block(target: &mut Mat, block: &Mat, offset: usize) {
    let n = block.nrows();
    target
        .view_mut((offset, offset), (n, block.ncols()))
        .copy_from(block);
}

/// Rotation matrix of a quaternion stored as `[w, x, y, z]`
///
/// Maps vectors from the body frame of reference (A) to the inertial
/// frame (G). The quaternion is normalized first.
pub fn quat2rotation(quat: &[f64; 4]) -> Mat3 {
    let q = Quaternion::new(quat[0], quat[1], quat[2], quat[3]);
    UnitQuaternion::from_quaternion(q)
        .to_rotation_matrix()
        .into_inner()
}

/// Matrix `Ω(ω)` such that `dq/dt = ½ Ω(ω) q` for body-frame angular velocity `ω`
#[rustfmt::skip]
pub fn quaternion_rate_matrix(omega: &[f64; 3]) -> Mat4 {
    let [wx, wy, wz] = *omega;
    Mat4::new(
        0.0, -wx, -wy, -wz,
        wx,  0.0,  wz, -wy,
        wy, -wz,  0.0,  wx,
        wz,  wy, -wx,  0.0,
    )
}

/// Matrix `Ξ(q)` with `Ω(ω) q = Ξ(q) ω`, the derivative of the quaternion
/// rate with respect to the angular velocity
#[rustfmt::skip]
pub fn quaternion_omega_jacobian(quat: &[f64; 4]) -> Matrix4x3<f64> {
    let [w, x, y, z] = *quat;
    Matrix4x3::new(
        -x, -y, -z,
         w, -z,  y,
         z,  w, -x,
        -y,  x,  w,
    )
}
