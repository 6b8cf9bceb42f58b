use super::{Camera, FrameTime, RenderChainLink, RenderSurfaces, RendererPasses, Scene};
use crate::tasks::GpuTaskQueue;
use crate::GraphicsQueue;
use fnv::FnvHashMap;
use molten_api::{MoltenError, MoltenResult};
use std::collections::hash_map::Entry;

/// Identifies a render step. A chain holds each kind at most once, and the registry caches one
/// step instance per kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderStepKind {
    Start,
    GBuffer3D,
    Render2D,
    Lighting,
    Finalize,
    Immediate3D,
}

/// Everything a step may touch while it renders
pub struct RenderContext<'a> {
    pub queue: &'a mut GraphicsQueue,
    pub tasks: &'a mut GpuTaskQueue,
    pub surfaces: &'a mut RenderSurfaces,
    pub passes: &'a RendererPasses,
    pub frame_index: u64,
}

/// One stage of a render chain.
///
/// Steps are expected to cope with unusable input themselves (for example by skipping a camera
/// with no target) rather than failing. An `Err` aborts the rest of the chain for this camera.
pub trait RenderStep: Send {
    fn kind(&self) -> RenderStepKind;

    /// Record this step's work for `camera`. `link.end_chain()` or `link.set_next()` change which
    /// step runs next.
    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        time: &FrameTime,
        link: &mut RenderChainLink,
    ) -> MoltenResult<()>;
}

pub type RenderStepFactory = Box<dyn Fn() -> Box<dyn RenderStep> + Send>;

/// Creates render steps on demand and keeps them for reuse by every chain built afterwards
#[derive(Default)]
pub struct RenderStepRegistry {
    factories: FnvHashMap<RenderStepKind, RenderStepFactory>,
    steps: FnvHashMap<RenderStepKind, Box<dyn RenderStep>>,
}

impl RenderStepRegistry {
    /// A registry with a factory for each built-in step
    pub fn with_default_steps() -> Self {
        let mut registry = RenderStepRegistry::default();
        super::steps::register_default_steps(&mut registry);
        registry
    }

    /// Sets the factory used for `kind`. A step of that kind that is already cached is dropped so
    /// the next acquire uses the new factory.
    pub fn register_factory<F: Fn() -> Box<dyn RenderStep> + Send + 'static>(
        &mut self,
        kind: RenderStepKind,
        factory: F,
    ) {
        self.factories.insert(kind, Box::new(factory));
        self.steps.remove(&kind);
    }

    pub fn has_factory(
        &self,
        kind: RenderStepKind,
    ) -> bool {
        self.factories.contains_key(&kind)
    }

    /// The cached step for `kind`, created first if needed
    pub fn acquire(
        &mut self,
        kind: RenderStepKind,
    ) -> MoltenResult<&mut dyn RenderStep> {
        let factories = &self.factories;
        match self.steps.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_mut()),
            Entry::Vacant(entry) => {
                let factory = factories.get(&kind).ok_or_else(|| {
                    MoltenError::StringError(format!("No render step registered for {:?}", kind))
                })?;

                let step = (factory)();
                if step.kind() != kind {
                    return Err(MoltenError::StringError(format!(
                        "Factory for {:?} produced a {:?} step",
                        kind,
                        step.kind()
                    )));
                }

                log::debug!("Created render step {:?}", kind);
                Ok(entry.insert(step).as_mut())
            }
        }
    }

    pub fn is_cached(
        &self,
        kind: RenderStepKind,
    ) -> bool {
        self.steps.contains_key(&kind)
    }

    pub fn cached_count(&self) -> usize {
        self.steps.len()
    }

    /// Drop the cached step for `kind`. Returns false if none was cached.
    pub fn release(
        &mut self,
        kind: RenderStepKind,
    ) -> bool {
        self.steps.remove(&kind).is_some()
    }

    pub fn release_all(&mut self) {
        self.steps.clear();
    }
}
