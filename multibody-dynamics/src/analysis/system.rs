//! Global augmented system assembly
//!
//! ```text
//! Asys = K + C·gamma/(beta·dt) + M/(beta·dt²)      Asys·Δq = -Q
//! ```
//!
//! Body blocks sit on the diagonal in body order; the Lagrange multiplier
//! rows and columns follow the last body.

use crate::assembler::BodyAssembler;
use crate::constraints::ConstraintCatalogue;
use crate::elements::{Body, BodyStep};
use crate::error::{SolverError, SolverResult};
use crate::math::{self, Mat, Vec as MbVec};
use crate::model::MultibodyConfig;

use super::newmark::StepContext;
use super::{DynamicOptions, NewmarkParameters};

/// Global mass, damping and stiffness matrices plus the residual
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMatrices {
    pub m: Mat,
    pub c: Mat,
    pub k: Mat,
    pub q: MbVec,
    /// Multiplier equations included in the matrices
    pub num_lm_eq: usize,
}

/// Newmark iteration matrix and residual
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSystem {
    pub asys: Mat,
    pub q: MbVec,
    pub num_lm_eq: usize,
}

/// Builds the augmented system from per-body blocks and constraints
pub struct SystemAssembler<'a, A: BodyAssembler + ?Sized> {
    assembler: &'a A,
    catalogue: &'a dyn ConstraintCatalogue,
    options: &'a DynamicOptions,
    params: NewmarkParameters,
}

impl<'a, A: BodyAssembler + ?Sized> SystemAssembler<'a, A> {
    pub fn new(
        assembler: &'a A,
        catalogue: &'a dyn ConstraintCatalogue,
        options: &'a DynamicOptions,
    ) -> Self {
        Self {
            assembler,
            catalogue,
            options,
            params: NewmarkParameters::from(options),
        }
    }

    /// Assemble M, C, K and Q over all bodies and active constraints
    pub fn assemble_matrices(
        &self,
        bodies: &[Body],
        steps: &[BodyStep],
        config: &MultibodyConfig,
        ctx: &StepContext,
    ) -> SolverResult<GlobalMatrices> {
        // Constraints are re-derived on every call
        let constraints = self.catalogue.initialize(config, ctx.time_index)?;
        let num_lm_eq = constraints.total_equations();
        let size = ctx.layout.total_size(num_lm_eq);
        if size != ctx.size() {
            return Err(SolverError::Configuration(format!(
                "system of {} unknowns does not match the {} entry state",
                size,
                ctx.size()
            )));
        }
        if bodies.len() != steps.len() || bodies.len() != ctx.layout.blocks().len() {
            return Err(SolverError::Configuration(format!(
                "{} bodies, {} body states and {} layout blocks",
                bodies.len(),
                steps.len(),
                ctx.layout.blocks().len()
            )));
        }

        let mut m = Mat::zeros(size, size);
        let mut c = Mat::zeros(size, size);
        let mut k = Mat::zeros(size, size);
        let mut q = MbVec::zeros(size);

        for ((body, step), block) in bodies.iter().zip(steps).zip(ctx.layout.blocks()) {
            let local = if body.is_free() {
                self.assembler.assemble_free(body, step, self.options)?
            } else {
                self.assembler.assemble_prescribed(body, step, self.options)?
            };
            local.check_size(body.id, block.size())?;

            math::place_diagonal_block(&mut m, &local.m, block.first_dof);
            math::place_diagonal_block(&mut c, &local.c, block.first_dof);
            math::place_diagonal_block(&mut k, &local.k, block.first_dof);
            q.rows_mut(block.first_dof, block.size()).copy_from(&local.q);
        }

        if !constraints.is_empty() {
            let lm = constraints.assemble(&ctx.constraint_input(bodies))?;
            lm.check_size(size)?;
            c += &lm.c;
            k += &lm.k;
            q += &lm.q;
        }

        Ok(GlobalMatrices { m, c, k, q, num_lm_eq })
    }

    /// Assemble the Newmark iteration matrix and residual
    pub fn assemble(
        &self,
        bodies: &[Body],
        steps: &[BodyStep],
        config: &MultibodyConfig,
        ctx: &StepContext,
    ) -> SolverResult<AssembledSystem> {
        let GlobalMatrices { m, c, k, q, num_lm_eq } =
            self.assemble_matrices(bodies, steps, config, ctx)?;

        let asys = k
            + c * self.params.velocity_factor(ctx.dt)
            + m * self.params.acceleration_factor(ctx.dt);

        Ok(AssembledSystem { asys, q, num_lm_eq })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DofLayout;
    use crate::assembler::LumpedMassAssembler;
    use crate::constraints::{
        ConstraintCatalogue, ConstraintConfig, ConstraintInput, ConstraintKind, ConstraintMatrices,
        ConstraintSet, LagrangeConstraint, StandardCatalogue,
    };
    use crate::elements::ForMovement;
    use crate::model::BodyConfig;
    use approx::assert_relative_eq;

    fn single_node_body(id: usize) -> Body {
        Body {
            id,
            global_nodes: vec![id],
            free_node_mask: vec![true],
            pos_ini: vec![[0.0; 3]],
            psi_ini: vec![[0.0; 3]],
            for_movement: ForMovement::Prescribed,
        }
    }

    fn config(constraints: Vec<ConstraintConfig>) -> MultibodyConfig {
        MultibodyConfig {
            bodies: vec![BodyConfig::default(); 2],
            constraints,
        }
    }

    #[test]
    fn test_iteration_matrix() {
        let bodies = vec![single_node_body(0), single_node_body(1)];
        let steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        let options = DynamicOptions::default().with_newmark_damp(0.0).with_dt(0.1);
        let model = LumpedMassAssembler::new(2.0, 50.0).with_damping(3.0);
        let assembler = SystemAssembler::new(&model, &StandardCatalogue, &options);
        let ctx = StepContext::new(DofLayout::from_bodies(&bodies), 0, 1, 0.1);

        let system = assembler.assemble(&bodies, &steps, &config(Vec::new()), &ctx).unwrap();

        assert_eq!(system.asys.nrows(), 12);
        assert_eq!(system.num_lm_eq, 0);
        // 50 + 3·20 + 2·400
        assert_relative_eq!(system.asys[(6, 6)], 910.0, epsilon = 1e-9);
        assert_relative_eq!(system.asys[(0, 6)], 0.0);
    }

    #[test]
    fn test_multiplier_rows_appended() {
        let bodies = vec![single_node_body(0), single_node_body(1)];
        let steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        let options = DynamicOptions::default();
        let model = LumpedMassAssembler::default();
        let assembler = SystemAssembler::new(&model, &StandardCatalogue, &options);
        let config = config(vec![ConstraintConfig::new(ConstraintKind::EqualDof {
            body_a: 0,
            dof_a: 2,
            body_b: 1,
            dof_b: 2,
        })]);
        let ctx = StepContext::new(DofLayout::from_bodies(&bodies), 1, 1, options.dt);

        let matrices = assembler.assemble_matrices(&bodies, &steps, &config, &ctx).unwrap();
        assert_eq!(matrices.num_lm_eq, 1);
        assert_relative_eq!(matrices.c[(12, 2)], 1.0);
        assert_relative_eq!(matrices.c[(12, 8)], -1.0);
        assert_relative_eq!(matrices.c[(8, 12)], -1.0);
    }

    #[test]
    fn test_state_size_mismatch() {
        let bodies = vec![single_node_body(0), single_node_body(1)];
        let steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        let options = DynamicOptions::default();
        let model = LumpedMassAssembler::default();
        let assembler = SystemAssembler::new(&model, &StandardCatalogue, &options);
        let config = config(vec![ConstraintConfig::new(ConstraintKind::FixedDof { body: 0, dof: 0 })]);
        // State sized without room for the multiplier
        let ctx = StepContext::new(DofLayout::from_bodies(&bodies), 0, 1, options.dt);

        let result = assembler.assemble_matrices(&bodies, &steps, &config, &ctx);
        assert!(matches!(result, Err(SolverError::Configuration(_))));
    }

    /// Constraint whose damping block carries one column too many
    #[derive(Debug)]
    struct WideDamping;

    impl LagrangeConstraint for WideDamping {
        fn name(&self) -> &'static str {
            "wide_damping"
        }

        fn equation_count(&self) -> usize {
            1
        }

        fn assemble(
            &self,
            _input: &ConstraintInput<'_>,
            _first_eq: usize,
            out: &mut ConstraintMatrices,
        ) -> SolverResult<()> {
            let n = out.size();
            out.c = Mat::zeros(n, n + 1);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct WideCatalogue;

    impl ConstraintCatalogue for WideCatalogue {
        fn initialize(&self, _config: &MultibodyConfig, _time_index: usize) -> SolverResult<ConstraintSet> {
            Ok(ConstraintSet::new(vec![Box::new(WideDamping)]))
        }
    }

    #[test]
    fn test_constraint_block_shape_mismatch() {
        let bodies = vec![single_node_body(0), single_node_body(1)];
        let steps: Vec<BodyStep> = bodies
            .iter()
            .map(|b| BodyStep::at_rest(&b.pos_ini, &b.psi_ini))
            .collect();
        let options = DynamicOptions::default();
        let model = LumpedMassAssembler::default();
        let assembler = SystemAssembler::new(&model, &WideCatalogue, &options);
        let ctx = StepContext::new(DofLayout::from_bodies(&bodies), 1, 1, options.dt);

        let result = assembler.assemble_matrices(&bodies, &steps, &config(Vec::new()), &ctx);
        assert!(matches!(result, Err(SolverError::Configuration(_))));
    }

    #[test]
    fn test_constraint_matrices_check_size() {
        let mut lm = ConstraintMatrices::zeros(4);
        assert!(lm.check_size(4).is_ok());
        assert!(lm.check_size(5).is_err());

        lm.k = Mat::zeros(3, 4);
        assert!(matches!(lm.check_size(4), Err(SolverError::Configuration(_))));
    }
}
