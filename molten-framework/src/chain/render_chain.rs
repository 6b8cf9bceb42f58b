use super::{Camera, FrameTime, RenderContext, RenderStepKind, RenderStepRegistry, Scene};
use molten_api::{MoltenError, MoltenResult};

/// A step's position in a `RenderChain`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderChainLink {
    kind: RenderStepKind,
    index: usize,
    previous: Option<usize>,
    next: Option<usize>,
}

impl RenderChainLink {
    pub fn kind(&self) -> RenderStepKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    /// Continue at `next` (or stop, if None) after the current step. Only later links may be
    /// targeted.
    pub fn set_next(
        &mut self,
        next: Option<usize>,
    ) {
        self.next = next;
    }

    /// Skip every step after this one for the current camera
    pub fn end_chain(&mut self) {
        self.next = None;
    }
}

/// An ordered list of render steps for one camera. Rebuilt with `build` whenever the camera or
/// scene changes (normally once per camera per frame), then walked front to back by `render`.
///
/// Links refer to steps by kind. The step instances themselves live in a `RenderStepRegistry` and
/// are shared by every chain built from it.
#[derive(Debug, Default)]
pub struct RenderChain {
    links: Vec<RenderChainLink>,
    first: Option<usize>,
    last: Option<usize>,
}

impl RenderChain {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reset(&mut self) {
        self.links.clear();
        self.first = None;
        self.last = None;
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn first(&self) -> Option<&RenderChainLink> {
        self.first.map(|index| &self.links[index])
    }

    pub fn last(&self) -> Option<&RenderChainLink> {
        self.last.map(|index| &self.links[index])
    }

    pub fn link(
        &self,
        index: usize,
    ) -> Option<&RenderChainLink> {
        self.links.get(index)
    }

    pub fn kinds(&self) -> impl Iterator<Item = RenderStepKind> + '_ {
        self.links.iter().map(|x| x.kind)
    }

    /// Add a step to the end of the chain. Returns its link index.
    pub fn append(
        &mut self,
        kind: RenderStepKind,
    ) -> usize {
        let index = self.links.len();
        self.links.push(RenderChainLink {
            kind,
            index,
            previous: self.last,
            next: None,
        });

        if let Some(last) = self.last {
            self.links[last].next = Some(index);
        }
        if self.first.is_none() {
            self.first = Some(index);
        }
        self.last = Some(index);
        index
    }

    /// Rebuild the chain for `camera`. Deferred cameras get
    /// Start, GBuffer3D, Render2D, Lighting, Finalize. All others get Start, Immediate3D, Render2D.
    pub fn build(
        &mut self,
        scene: &Scene,
        camera: &Camera,
    ) {
        self.reset();
        self.append(RenderStepKind::Start);
        if camera.is_deferred() {
            self.append(RenderStepKind::GBuffer3D);
            self.append(RenderStepKind::Render2D);
            self.append(RenderStepKind::Lighting);
            self.append(RenderStepKind::Finalize);
        } else {
            self.append(RenderStepKind::Immediate3D);
            self.append(RenderStepKind::Render2D);
        }

        log::trace!(
            "Built {} step chain for camera {} ({} objects, {} sprites, {} lights)",
            self.links.len(),
            camera.name,
            scene.objects.len(),
            scene.sprites.len(),
            scene.lights.len()
        );
    }

    /// Run each step from first to last. Returns the number of steps that ran. The first step to
    /// fail stops the walk and its error is returned.
    #[profiling::function]
    pub fn render(
        &mut self,
        registry: &mut RenderStepRegistry,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        time: &FrameTime,
    ) -> MoltenResult<usize> {
        let mut steps_run = 0;
        let mut current = self.first;
        while let Some(index) = current {
            let mut link = self.links[index];
            let step = registry.acquire(link.kind)?;
            step.render(context, camera, scene, time, &mut link)
                .map_err(|e| {
                    log::error!(
                        "Render step {:?} failed for camera {}: {}",
                        link.kind,
                        camera.name,
                        e
                    );
                    e
                })?;
            steps_run += 1;

            if let Some(next) = link.next {
                if next <= index || next >= self.links.len() {
                    return Err(MoltenError::invalid_operation(format!(
                        "Render step {:?} linked to {}, which is not a later step in the chain",
                        link.kind, next
                    )));
                }
            } else if self.last != Some(index) {
                log::trace!(
                    "Render step {:?} ended the chain for camera {}",
                    link.kind,
                    camera.name
                );
            }

            self.links[index] = link;
            current = link.next;
        }

        Ok(steps_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{RenderStep, RenderSurfaces, RendererPasses};
    use crate::tasks::GpuTaskQueue;
    use crate::GraphicsQueue;
    use crate::GraphicsQueueBeginFlags;
    use molten_api::{MoltenDeviceNull, MoltenFormat};
    use std::sync::{Arc, Mutex};

    const ALL_KINDS: [RenderStepKind; 6] = [
        RenderStepKind::Start,
        RenderStepKind::GBuffer3D,
        RenderStepKind::Render2D,
        RenderStepKind::Lighting,
        RenderStepKind::Finalize,
        RenderStepKind::Immediate3D,
    ];

    #[derive(Clone, Copy)]
    enum Behavior {
        Continue,
        Fail,
        EndChain,
        LinkBackwards,
    }

    struct RecordingStep {
        kind: RenderStepKind,
        behavior: Behavior,
        visited: Arc<Mutex<Vec<RenderStepKind>>>,
    }

    impl RenderStep for RecordingStep {
        fn kind(&self) -> RenderStepKind {
            self.kind
        }

        fn render(
            &mut self,
            _context: &mut RenderContext,
            _camera: &Camera,
            _scene: &Scene,
            _time: &FrameTime,
            link: &mut RenderChainLink,
        ) -> MoltenResult<()> {
            self.visited.lock().unwrap().push(self.kind);
            match self.behavior {
                Behavior::Continue => Ok(()),
                Behavior::Fail => Err("step failed".into()),
                Behavior::EndChain => {
                    link.end_chain();
                    Ok(())
                }
                Behavior::LinkBackwards => {
                    link.set_next(Some(0));
                    Ok(())
                }
            }
        }
    }

    fn recording_registry(
        special: Option<(RenderStepKind, Behavior)>,
    ) -> (RenderStepRegistry, Arc<Mutex<Vec<RenderStepKind>>>) {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let mut registry = RenderStepRegistry::default();
        for kind in ALL_KINDS {
            let behavior = match special {
                Some((special_kind, behavior)) if special_kind == kind => behavior,
                _ => Behavior::Continue,
            };
            let visited = visited.clone();
            registry.register_factory(kind, move || {
                Box::new(RecordingStep {
                    kind,
                    behavior,
                    visited: visited.clone(),
                })
            });
        }
        (registry, visited)
    }

    fn render_chain(
        chain: &mut RenderChain,
        registry: &mut RenderStepRegistry,
        camera: &Camera,
    ) -> MoltenResult<usize> {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Arc::new(MoltenDeviceNull::default());
        let passes = RendererPasses::create_default(&*device).unwrap();
        let mut queue = GraphicsQueue::new(device.clone(), Default::default());
        let mut tasks = GpuTaskQueue::new(device, Default::default());
        let mut surfaces = RenderSurfaces::new(MoltenFormat::R8G8B8A8_UNORM);
        queue.begin(GraphicsQueueBeginFlags::RESET_STATE).unwrap();

        let mut context = RenderContext {
            queue: &mut queue,
            tasks: &mut tasks,
            surfaces: &mut surfaces,
            passes: &passes,
            frame_index: 1,
        };
        chain.render(
            registry,
            &mut context,
            camera,
            &Scene::default(),
            &FrameTime::default(),
        )
    }

    fn deferred_camera() -> Camera {
        Camera::new("deferred").with_flags(crate::chain::CameraFlags::DEFERRED)
    }

    #[test]
    fn test_build_deferred_chain() {
        let mut chain = RenderChain::new();
        chain.build(&Scene::default(), &deferred_camera());

        assert_eq!(
            chain.kinds().collect::<Vec<_>>(),
            vec![
                RenderStepKind::Start,
                RenderStepKind::GBuffer3D,
                RenderStepKind::Render2D,
                RenderStepKind::Lighting,
                RenderStepKind::Finalize,
            ]
        );
        assert_eq!(chain.first().unwrap().kind(), RenderStepKind::Start);
        assert_eq!(chain.last().unwrap().kind(), RenderStepKind::Finalize);
    }

    #[test]
    fn test_build_immediate_chain_replaces_previous_contents() {
        let mut chain = RenderChain::new();
        chain.build(&Scene::default(), &deferred_camera());
        chain.build(&Scene::default(), &Camera::new("immediate"));

        assert_eq!(
            chain.kinds().collect::<Vec<_>>(),
            vec![
                RenderStepKind::Start,
                RenderStepKind::Immediate3D,
                RenderStepKind::Render2D,
            ]
        );

        // Links agree with each other in both directions
        for index in 0..chain.len() {
            let link = chain.link(index).unwrap();
            assert_eq!(link.index(), index);
            assert_eq!(link.previous(), index.checked_sub(1));
            let expected_next = if index + 1 < chain.len() {
                Some(index + 1)
            } else {
                None
            };
            assert_eq!(link.next(), expected_next);
        }
        assert_eq!(chain.last().unwrap().kind(), RenderStepKind::Render2D);
    }

    #[test]
    fn test_render_visits_steps_in_order() {
        let (mut registry, visited) = recording_registry(None);
        let mut chain = RenderChain::new();
        chain.build(&Scene::default(), &deferred_camera());

        let steps_run = render_chain(&mut chain, &mut registry, &deferred_camera()).unwrap();
        assert_eq!(steps_run, 5);
        assert_eq!(
            *visited.lock().unwrap(),
            chain.kinds().collect::<Vec<_>>()
        );
        assert_eq!(registry.cached_count(), 5);
    }

    #[test]
    fn test_failed_step_aborts_rest_of_chain() {
        let (mut registry, visited) =
            recording_registry(Some((RenderStepKind::Render2D, Behavior::Fail)));
        let mut chain = RenderChain::new();
        chain.build(&Scene::default(), &deferred_camera());

        assert!(render_chain(&mut chain, &mut registry, &deferred_camera()).is_err());
        assert_eq!(
            *visited.lock().unwrap(),
            vec![
                RenderStepKind::Start,
                RenderStepKind::GBuffer3D,
                RenderStepKind::Render2D
            ]
        );
    }

    #[test]
    fn test_step_can_end_chain() {
        let (mut registry, visited) =
            recording_registry(Some((RenderStepKind::Start, Behavior::EndChain)));
        let mut chain = RenderChain::new();
        let camera = Camera::new("immediate");
        chain.build(&Scene::default(), &camera);

        assert_eq!(render_chain(&mut chain, &mut registry, &camera).unwrap(), 1);
        assert_eq!(*visited.lock().unwrap(), vec![RenderStepKind::Start]);
    }

    #[test]
    fn test_step_cannot_link_backwards() {
        let (mut registry, visited) =
            recording_registry(Some((RenderStepKind::Immediate3D, Behavior::LinkBackwards)));
        let mut chain = RenderChain::new();
        let camera = Camera::new("immediate");
        chain.build(&Scene::default(), &camera);

        let error = render_chain(&mut chain, &mut registry, &camera).unwrap_err();
        assert!(error.is_invalid_operation());
        assert_eq!(visited.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_registry_reuses_steps_until_released() {
        let created = Arc::new(Mutex::new(0));
        let created_clone = created.clone();
        let mut registry = RenderStepRegistry::default();
        registry.register_factory(RenderStepKind::Lighting, move || {
            *created_clone.lock().unwrap() += 1;
            Box::new(RecordingStep {
                kind: RenderStepKind::Lighting,
                behavior: Behavior::Continue,
                visited: Default::default(),
            })
        });

        registry.acquire(RenderStepKind::Lighting).unwrap();
        registry.acquire(RenderStepKind::Lighting).unwrap();
        assert_eq!(*created.lock().unwrap(), 1);
        assert!(registry.is_cached(RenderStepKind::Lighting));

        assert!(registry.release(RenderStepKind::Lighting));
        assert!(!registry.release(RenderStepKind::Lighting));
        registry.acquire(RenderStepKind::Lighting).unwrap();
        assert_eq!(*created.lock().unwrap(), 2);

        // No factory for this kind
        assert!(registry.acquire(RenderStepKind::Finalize).is_err());
    }

    #[test]
    fn test_registry_rejects_factory_producing_wrong_kind() {
        let mut registry = RenderStepRegistry::default();
        registry.register_factory(RenderStepKind::Start, || {
            Box::new(RecordingStep {
                kind: RenderStepKind::Finalize,
                behavior: Behavior::Continue,
                visited: Default::default(),
            })
        });

        assert!(registry.acquire(RenderStepKind::Start).is_err());
        assert_eq!(registry.cached_count(), 0);
    }
}
