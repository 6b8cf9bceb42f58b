//! Per-camera sequencing of render steps.
//!
//! A `RenderChain` is rebuilt for each camera from the camera's flags, then walked front to back.
//! Each link names a `RenderStepKind`, and the step that implements it is fetched from a
//! `RenderStepRegistry`, which creates steps on first use and keeps them for the lifetime of the
//! renderer.

mod passes;
pub use passes::RendererPasses;

mod render_chain;
pub use render_chain::RenderChain;
pub use render_chain::RenderChainLink;

mod render_step;
pub use render_step::RenderContext;
pub use render_step::RenderStep;
pub use render_step::RenderStepFactory;
pub use render_step::RenderStepKind;
pub use render_step::RenderStepRegistry;

mod scene;
pub use scene::Camera;
pub use scene::CameraFlags;
pub use scene::FrameTime;
pub use scene::Scene;
pub use scene::SceneLight;
pub use scene::SceneObject;

mod steps;
pub use steps::FinalizeStep;
pub use steps::GBuffer3DStep;
pub use steps::Immediate3DStep;
pub use steps::LightingStep;
pub use steps::Render2DStep;
pub use steps::StartStep;

mod surfaces;
pub use surfaces::RenderSurfaces;
