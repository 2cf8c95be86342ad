//! Multibody Dynamics - Newmark-beta nonlinear dynamic solver
//!
//! Implicit time integration of constrained multibody flexible structures:
//! - Bodies with prescribed or free frames of reference
//! - Lagrange-multiplier constraints between bodies
//! - Newton-Raphson iterations inside a Newmark-beta predictor/corrector
//! - Constraint force recovery from the converged multipliers
//!
//! Element matrices come from a [`BodyAssembler`](assembler::BodyAssembler);
//! the crate ships a lumped mass/spring model.
//!
//! ## Example
//! ```rust
//! use multibody_dynamics::prelude::*;
//!
//! // One prescribed body holding two nodes, the first one clamped by its mask
//! let config = MultibodyConfig {
//!     bodies: vec![BodyConfig { for_movement: ForMovement::Prescribed }],
//!     constraints: Vec::new(),
//! };
//! let mut structure = Structure::new(
//!     vec![0, 0],
//!     vec![false, true],
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
//!     vec![[0.0; 3]; 2],
//!     config,
//! )
//! .unwrap();
//!
//! // Push the tip node along z
//! structure.last_step_mut().unwrap().nodes[1].applied_forces[2] = 10.0;
//!
//! let options = DynamicOptions::default().with_dt(0.01).with_num_steps(5);
//! let mut solver = NewmarkIntegrator::new(options, LumpedMassAssembler::default()).unwrap();
//! let summaries = solver.simulate(&mut structure).unwrap();
//!
//! assert_eq!(summaries.len(), 5);
//! assert!(structure.last_step().unwrap().nodes[1].pos[2] > 0.0);
//! ```

pub mod analysis;
pub mod assembler;
pub mod constraints;
pub mod elements;
pub mod error;
pub mod math;
pub mod model;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{DynamicOptions, NewmarkIntegrator, NewmarkParameters};
    pub use crate::assembler::{BodyAssembler, BodyMatrices, LumpedMassAssembler};
    pub use crate::constraints::{
        ConstraintCatalogue, ConstraintConfig, ConstraintKind, LagrangeConstraint,
        StandardCatalogue,
    };
    pub use crate::elements::{Body, BodyStep, ForMovement, FrameState, NodeState, StructuralStep};
    pub use crate::error::{SolverError, SolverResult};
    pub use crate::model::{BodyConfig, MultibodyConfig, Structure};
    pub use crate::results::StepSummary;
}
