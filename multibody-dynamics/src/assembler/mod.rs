//! Per-body structural assembly
//!
//! The solver never forms element matrices itself. It asks a
//! [`BodyAssembler`] for the mass, damping and stiffness blocks of each body
//! together with its residual.

mod lumped;

use crate::analysis::DynamicOptions;
use crate::elements::{Body, BodyStep};
use crate::error::{SolverError, SolverResult};
use crate::math::{Mat, Vec as MbVec};

pub use lumped::LumpedMassAssembler;

/// Local contribution of one body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMatrices {
    /// Mass matrix
    pub m: Mat,
    /// Damping (gyroscopic) matrix
    pub c: Mat,
    /// Tangent stiffness matrix
    pub k: Mat,
    /// Residual of the body equations
    pub q: MbVec,
}

impl BodyMatrices {
    /// Zeroed matrices for a body block of `size` unknowns
    pub fn zeros(size: usize) -> Self {
        Self {
            m: Mat::zeros(size, size),
            c: Mat::zeros(size, size),
            k: Mat::zeros(size, size),
            q: MbVec::zeros(size),
        }
    }

    /// Check every block against the expected body block size
    pub fn check_size(&self, ibody: usize, size: usize) -> SolverResult<()> {
        let square = |name: &str, m: &Mat| {
            if m.nrows() != size || m.ncols() != size {
                Err(SolverError::Configuration(format!(
                    "body {} {} matrix is {}x{}, expected {}x{}",
                    ibody,
                    name,
                    m.nrows(),
                    m.ncols(),
                    size,
                    size
                )))
            } else {
                Ok(())
            }
        };
        square("mass", &self.m)?;
        square("damping", &self.c)?;
        square("stiffness", &self.k)?;
        if self.q.len() != size {
            return Err(SolverError::Configuration(format!(
                "body {} residual has {} entries, expected {}",
                ibody,
                self.q.len(),
                size
            )));
        }
        Ok(())
    }
}

/// Source of per-body structural matrices
pub trait BodyAssembler {
    /// Matrices of a body whose frame of reference motion is prescribed
    ///
    /// Blocks are `num_dof × num_dof`.
    fn assemble_prescribed(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices>;

    /// Matrices of a body with a free frame of reference
    ///
    /// Blocks are `(num_dof + 10) × (num_dof + 10)`, frame equations last.
    fn assemble_free(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices>;

    /// Refresh the gravity loads stored in a converged body state
    fn correct_gravity_forces(
        &self,
        _body: &Body,
        _step: &mut BodyStep,
        _options: &DynamicOptions,
    ) -> SolverResult<()> {
        Ok(())
    }
}

impl<A: BodyAssembler + ?Sized> BodyAssembler for &A {
    fn assemble_prescribed(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices> {
        (**self).assemble_prescribed(body, step, options)
    }

    fn assemble_free(
        &self,
        body: &Body,
        step: &BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<BodyMatrices> {
        (**self).assemble_free(body, step, options)
    }

    fn correct_gravity_forces(
        &self,
        body: &Body,
        step: &mut BodyStep,
        options: &DynamicOptions,
    ) -> SolverResult<()> {
        (**self).correct_gravity_forces(body, step, options)
    }
}
