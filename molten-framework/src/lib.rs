//! State tracking and frame orchestration on top of `molten-api`: slots and slot groups, pipeline
//! stages, the graphics queue with its state stack, the GPU task queue, and the per-camera render
//! chain driven by `Renderer`.

mod state;
pub use state::*;

mod queue;
pub use queue::*;

mod shader_pass;
pub use shader_pass::ShaderPass;
pub use shader_pass::StateConditions;

pub mod tasks;

pub mod chain;

mod renderer;
pub use renderer::*;

pub use molten_api::MoltenResult;
