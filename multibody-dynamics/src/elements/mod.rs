//! Structural elements module

mod body;
mod frame;
mod node;
mod step;

pub use body::{Body, ForMovement, NODE_DOFS};
pub use frame::{FrameState, FOR_DOFS};
pub use node::NodeState;
pub use step::{BodyStep, StructuralStep};
