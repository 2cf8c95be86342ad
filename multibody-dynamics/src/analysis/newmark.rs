//! Newmark-beta predictor/corrector with Newton-Raphson iterations
//!
//! One time step:
//! 1. Split the structure into body states and gather them into `q`, `dqdt`, `dqddt`
//! 2. Predict the new state from the previous derivatives
//! 3. Iterate: scatter, assemble `Asys·Δq = -Q`, solve, correct
//! 4. Integrate free frame positions, run constraint hooks, recover
//!    constraint forces and merge the bodies back

use log::{debug, info, warn};

use crate::assembler::BodyAssembler;
use crate::constraints::{ConstraintCatalogue, ConstraintInput, StandardCatalogue};
use crate::elements::{Body, BodyStep, StructuralStep};
use crate::error::{SolverError, SolverResult};
use crate::math::{self, Vec as MbVec};
use crate::model::{MultibodyConfig, Structure};
use crate::results::{NewtonOutcome, StepSummary};

use super::constraint_forces::compute_forces_constraints;
use super::layout::DofLayout;
use super::position::integrate_position;
use super::state::{disp2state, state2disp};
use super::system::SystemAssembler;
use super::{check_dt, DynamicOptions, NewmarkParameters};

/// Working state of a single time step
///
/// Flat vectors are laid out `[body 0][body 1]...[multipliers]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepContext {
    pub layout: DofLayout,
    pub time_index: usize,
    pub dt: f64,
    pub num_lm_eq: usize,
    pub q: MbVec,
    pub dqdt: MbVec,
    pub dqddt: MbVec,
    /// Multipliers, the tail of `q`
    pub lambda: MbVec,
    /// Multiplier rates, the tail of `dqdt`
    pub lambda_dot: MbVec,
}

impl StepContext {
    /// Zeroed state sized for `layout` plus `num_lm_eq` multipliers
    pub fn new(layout: DofLayout, num_lm_eq: usize, time_index: usize, dt: f64) -> Self {
        let size = layout.total_size(num_lm_eq);
        Self {
            layout,
            time_index,
            dt,
            num_lm_eq,
            q: MbVec::zeros(size),
            dqdt: MbVec::zeros(size),
            dqddt: MbVec::zeros(size),
            lambda: MbVec::zeros(num_lm_eq),
            lambda_dot: MbVec::zeros(num_lm_eq),
        }
    }

    /// Structural unknowns
    pub fn sys_size(&self) -> usize {
        self.layout.sys_size()
    }

    /// Structural unknowns plus multipliers
    pub fn size(&self) -> usize {
        self.q.len()
    }

    /// Newmark predictor
    pub fn predict(&mut self, params: &NewmarkParameters) {
        let dt = self.dt;
        self.q += &self.dqdt * dt + &self.dqddt * ((0.5 - params.beta()) * dt * dt);
        self.dqdt += &self.dqddt * ((1.0 - params.gamma()) * dt);
        self.dqddt.fill(0.0);
        self.refresh_multipliers();
    }

    /// Newton correction of all three state vectors
    pub fn apply_correction(&mut self, dq: &MbVec, params: &NewmarkParameters) {
        self.q += dq;
        self.dqdt += dq * params.velocity_factor(self.dt);
        self.dqddt += dq * params.acceleration_factor(self.dt);
        self.refresh_multipliers();
    }

    /// Re-slice the multipliers from the tail of the state
    pub fn refresh_multipliers(&mut self) {
        let n = self.sys_size();
        self.lambda = self.q.rows(n, self.num_lm_eq).into_owned();
        self.lambda_dot = self.dqdt.rows(n, self.num_lm_eq).into_owned();
    }

    /// View handed to the constraints
    pub fn constraint_input<'a>(&'a self, bodies: &'a [Body]) -> ConstraintInput<'a> {
        ConstraintInput {
            bodies,
            layout: &self.layout,
            q: &self.q,
            dqdt: &self.dqdt,
            lambda: &self.lambda,
            lambda_dot: &self.lambda_dot,
            time_index: self.time_index,
            dt: self.dt,
        }
    }
}

/// Implicit Newmark-beta integrator for constrained multibody structures
#[derive(Debug)]
pub struct NewmarkIntegrator<A: BodyAssembler> {
    options: DynamicOptions,
    params: NewmarkParameters,
    assembler: A,
    catalogue: Box<dyn ConstraintCatalogue>,
}

impl<A: BodyAssembler> NewmarkIntegrator<A> {
    /// Create an integrator using the standard constraint catalogue
    pub fn new(options: DynamicOptions, assembler: A) -> SolverResult<Self> {
        options.validate()?;
        Ok(Self {
            params: NewmarkParameters::from(&options),
            options,
            assembler,
            catalogue: Box::new(StandardCatalogue),
        })
    }

    /// Replace the constraint catalogue
    pub fn with_catalogue(mut self, catalogue: impl ConstraintCatalogue + 'static) -> Self {
        self.catalogue = Box::new(catalogue);
        self
    }

    pub fn options(&self) -> &DynamicOptions {
        &self.options
    }

    pub fn parameters(&self) -> NewmarkParameters {
        self.params
    }

    /// Solve the step following `previous`
    ///
    /// A `dt` given here replaces the one in the options for this and all
    /// later steps. Returns the converged step without touching the history.
    pub fn run_step(
        &mut self,
        structure: &Structure,
        previous: &StructuralStep,
        time_index: usize,
        dt: Option<f64>,
    ) -> SolverResult<(StructuralStep, StepSummary)> {
        if let Some(dt) = dt {
            check_dt(dt)?;
            self.options.dt = dt;
        }
        let dt = self.options.dt;

        let config = structure.mb_config_for(previous);
        config.validate(structure.num_bodies())?;
        let bodies = structure.bodies();

        let previous_bodies = structure.split(previous)?;
        let mut current = previous_bodies.clone();

        let layout = DofLayout::from_bodies(bodies);
        let num_lm_eq = self.catalogue.initialize(config, time_index)?.total_equations();
        let mut ctx = StepContext::new(layout, num_lm_eq, time_index, dt);

        disp2state(bodies, &current, &ctx.layout, &mut ctx.q, &mut ctx.dqdt, &mut ctx.dqddt)?;
        ctx.predict(&self.params);

        let (iterations, res, lm_res) = self
            .newton(bodies, config, &mut current, &mut ctx)
            .and_then(NewtonOutcome::into_result)
            .map_err(|err| {
                warn!("Time step {} failed: {}", time_index, err);
                err
            })?;

        state2disp(&ctx.q, &ctx.dqdt, &ctx.dqddt, bodies, &mut current, &ctx.layout)?;
        integrate_position(bodies, &previous_bodies, &mut current, &self.params, dt)?;

        let constraints = self.catalogue.initialize(config, time_index)?;
        constraints.postprocess(bodies, &mut current);
        compute_forces_constraints(&constraints, &ctx.constraint_input(bodies), &mut current)?;

        if self.options.gravity_on {
            for (body, step) in bodies.iter().zip(current.iter_mut()) {
                self.assembler.correct_gravity_forces(body, step, &self.options)?;
            }
        }

        let mut step = previous.clone();
        structure.merge(&current, &mut step)?;

        let summary = StepSummary {
            time_index,
            iterations,
            res,
            lm_res,
            num_lm_eq,
            dt,
        };
        info!(
            "Step {}: converged in {} iterations (res = {:e}, LM_res = {:e}, {} LM equations)",
            time_index, iterations, res, lm_res, num_lm_eq
        );
        Ok((step, summary))
    }

    /// Solve the step after the last one in the history and append it
    pub fn step(&mut self, structure: &mut Structure, dt: Option<f64>) -> SolverResult<StepSummary> {
        let previous = structure.last_step()?.clone();
        let time_index = structure.timestep_info.len();
        let (step, summary) = self.run_step(structure, &previous, time_index, dt)?;
        structure.add_step(step);
        Ok(summary)
    }

    /// Run `num_steps` time steps, stopping at the first failure
    pub fn simulate(&mut self, structure: &mut Structure) -> SolverResult<Vec<StepSummary>> {
        info!(
            "Running {} steps with dt = {} (gamma = {}, beta = {})",
            self.options.num_steps,
            self.options.dt,
            self.params.gamma(),
            self.params.beta()
        );
        (0..self.options.num_steps)
            .map(|_| self.step(structure, None))
            .collect()
    }

    fn newton(
        &self,
        bodies: &[Body],
        config: &MultibodyConfig,
        current: &mut [BodyStep],
        ctx: &mut StepContext,
    ) -> SolverResult<NewtonOutcome> {
        let assembler = SystemAssembler::new(&self.assembler, self.catalogue.as_ref(), &self.options);
        let max_iterations = self.options.max_iterations;
        let sys_size = ctx.sys_size();
        let num_lm_eq = ctx.num_lm_eq;

        let mut res = f64::INFINITY;
        let mut lm_res = f64::INFINITY;
        let mut old_dq = 1.0;
        let mut lm_old_dq = 1.0;

        // Iteration `max_iterations - 1` is the limit and solves nothing
        let last_iteration = max_iterations.saturating_sub(1);
        for iteration in 0..last_iteration {
            state2disp(&ctx.q, &ctx.dqdt, &ctx.dqddt, bodies, current, &ctx.layout)?;
            let system = assembler.assemble(bodies, current, config, ctx)?;
            let dq = math::solve_linear_system(&system.asys, &(-&system.q))
                .ok_or(SolverError::SingularMatrix)?;

            let struct_max = math::max_abs(dq.rows(0, sys_size).iter());
            let lm_max = math::max_abs(dq.rows(sys_size, num_lm_eq).iter());
            if !struct_max.is_finite() || !lm_max.is_finite() {
                return Ok(NewtonOutcome::Diverged {
                    iteration,
                    res: struct_max,
                    lm_res: lm_max,
                });
            }

            let mut converged = false;
            if iteration > 0 {
                res = struct_max / old_dq;
                lm_res = if num_lm_eq > 0 { lm_max / lm_old_dq } else { 0.0 };
                if !res.is_finite() || !lm_res.is_finite() {
                    return Ok(NewtonOutcome::Diverged {
                        iteration,
                        res,
                        lm_res,
                    });
                }
                converged = res < self.options.min_delta && lm_res < self.options.min_delta;
            }

            ctx.apply_correction(&dq, &self.params);

            if self.options.log {
                info!(
                    "  iteration {:3}: |dq| = {:e}, res = {:e}, LM_res = {:e}",
                    iteration, struct_max, res, lm_res
                );
            } else {
                debug!(
                    "  iteration {:3}: |dq| = {:e}, res = {:e}, LM_res = {:e}",
                    iteration, struct_max, res, lm_res
                );
            }

            if converged {
                return Ok(NewtonOutcome::Converged {
                    iterations: iteration + 1,
                    res,
                    lm_res,
                });
            }

            if iteration == 0 {
                old_dq = struct_max.max(1.0);
                lm_old_dq = if num_lm_eq > 0 { lm_max.max(1.0) } else { 1.0 };
            }
        }

        Ok(NewtonOutcome::NotConverged {
            iterations: last_iteration,
            res,
            lm_res,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn context() -> StepContext {
        let layout = DofLayout::from_bodies(&[]);
        let mut ctx = StepContext::new(layout, 2, 1, 0.1);
        ctx.q = MbVec::from_vec(vec![1.0, 2.0]);
        ctx.dqdt = MbVec::from_vec(vec![3.0, 4.0]);
        ctx.dqddt = MbVec::from_vec(vec![10.0, -10.0]);
        ctx
    }

    #[test]
    fn test_predictor() {
        let mut ctx = context();
        let params = NewmarkParameters::from_damping(0.0);
        ctx.predict(&params);

        // q + dt·v + 0.25·dt²·a
        assert_relative_eq!(ctx.q[0], 1.0 + 0.3 + 0.025, epsilon = 1e-12);
        assert_relative_eq!(ctx.dqdt[0], 3.0 + 0.5, epsilon = 1e-12);
        assert_eq!(ctx.dqddt[1], 0.0);
        // Everything is a multiplier when there are no bodies
        assert_relative_eq!(ctx.lambda[1], 2.0 + 0.4 - 0.025, epsilon = 1e-12);
        assert_relative_eq!(ctx.lambda_dot[1], 4.0 - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_correction() {
        let mut ctx = context();
        let params = NewmarkParameters::from_damping(0.0);
        ctx.apply_correction(&MbVec::from_vec(vec![0.01, 0.0]), &params);

        assert_relative_eq!(ctx.q[0], 1.01, epsilon = 1e-12);
        assert_relative_eq!(ctx.dqdt[0], 3.0 + 0.2, epsilon = 1e-12);
        assert_relative_eq!(ctx.dqddt[0], 10.0 + 4.0, epsilon = 1e-9);
        assert_relative_eq!(ctx.lambda[0], 1.01, epsilon = 1e-12);
    }
}
