use crate::chain::{
    Camera, FrameTime, RenderChain, RenderContext, RenderStep, RenderStepFactory, RenderStepKind,
    RenderStepRegistry, RenderSurfaces, RendererPasses, Scene,
};
use crate::tasks::{GpuTaskQueue, GpuTaskQueueConfig, GpuTaskQueueContext};
use crate::{
    GraphicsQueue, GraphicsQueueBeginFlags, GraphicsQueueConfig, GraphicsQueueProfiler,
    GraphicsQueueSubmitFlags,
};
use molten_api::{MoltenDevice, MoltenFormat, MoltenResult};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RendererConfig {
    pub graphics_queue: GraphicsQueueConfig,
    pub task_queue: GpuTaskQueueConfig,
    /// Format of the albedo surface deferred cameras render into
    pub gbuffer_format: MoltenFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            graphics_queue: Default::default(),
            task_queue: Default::default(),
            gbuffer_format: MoltenFormat::R8G8B8A8_UNORM,
        }
    }
}

/// What happened during one call to `Renderer::render_frame`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderFrameStats {
    pub frame_index: u64,
    pub cameras_rendered: usize,
    pub cameras_failed: usize,
    pub steps_run: usize,
    pub tasks_run: usize,
    pub profile: GraphicsQueueProfiler,
}

#[derive(Default)]
pub struct RendererBuilder {
    config: RendererConfig,
    passes: Option<RendererPasses>,
    step_factories: Vec<(RenderStepKind, RenderStepFactory)>,
}

impl RendererBuilder {
    pub fn with_config(
        mut self,
        config: RendererConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Use these passes instead of the stock ones
    pub fn with_passes(
        mut self,
        passes: RendererPasses,
    ) -> Self {
        self.passes = Some(passes);
        self
    }

    /// Replace the built-in step for `kind`
    pub fn with_step<F: Fn() -> Box<dyn RenderStep> + Send + 'static>(
        mut self,
        kind: RenderStepKind,
        factory: F,
    ) -> Self {
        self.step_factories.push((kind, Box::new(factory)));
        self
    }

    pub fn build(
        self,
        device: Arc<dyn MoltenDevice>,
    ) -> MoltenResult<Renderer> {
        let passes = match self.passes {
            Some(passes) => passes,
            None => RendererPasses::create_default(&*device)?,
        };

        let mut registry = RenderStepRegistry::with_default_steps();
        for (kind, factory) in self.step_factories {
            registry.register_factory(kind, factory);
        }

        let graphics_queue = GraphicsQueue::new(device.clone(), self.config.graphics_queue.clone());
        let task_queue = GpuTaskQueue::new(device.clone(), self.config.task_queue.clone());
        let surfaces = RenderSurfaces::new(self.config.gbuffer_format);

        log::info!("Created renderer");
        Ok(Renderer {
            device,
            config: self.config,
            graphics_queue,
            task_queue,
            registry,
            chain: RenderChain::new(),
            surfaces,
            passes,
            time: Default::default(),
            frame_index: 0,
            total_profile: Default::default(),
        })
    }
}

/// Renders every camera of a scene once per frame, running the GPU task queue around the
/// cameras. Owns the graphics queue, the task queue, and the render steps.
pub struct Renderer {
    device: Arc<dyn MoltenDevice>,
    config: RendererConfig,
    graphics_queue: GraphicsQueue,
    task_queue: GpuTaskQueue,
    registry: RenderStepRegistry,
    chain: RenderChain,
    surfaces: RenderSurfaces,
    passes: RendererPasses,
    time: FrameTime,
    frame_index: u64,
    total_profile: GraphicsQueueProfiler,
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.registry.release_all();
        self.surfaces.dispose();
    }
}

impl Renderer {
    pub fn device(&self) -> &Arc<dyn MoltenDevice> {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn graphics_queue(&self) -> &GraphicsQueue {
        &self.graphics_queue
    }

    pub fn graphics_queue_mut(&mut self) -> &mut GraphicsQueue {
        &mut self.graphics_queue
    }

    pub fn task_queue(&self) -> &GpuTaskQueue {
        &self.task_queue
    }

    pub fn task_queue_mut(&mut self) -> &mut GpuTaskQueue {
        &mut self.task_queue
    }

    /// For queueing deferred GPU tasks from other threads
    pub fn task_queue_context(&self) -> GpuTaskQueueContext {
        self.task_queue.context()
    }

    pub fn registry(&self) -> &RenderStepRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RenderStepRegistry {
        &mut self.registry
    }

    pub fn surfaces(&self) -> &RenderSurfaces {
        &self.surfaces
    }

    pub fn passes(&self) -> &RendererPasses {
        &self.passes
    }

    /// The chain built for the most recently rendered camera
    pub fn chain(&self) -> &RenderChain {
        &self.chain
    }

    pub fn time(&self) -> &FrameTime {
        &self.time
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Graphics queue counters summed over every frame rendered so far
    pub fn total_profile(&self) -> &GraphicsQueueProfiler {
        &self.total_profile
    }

    /// Record and submit one frame.
    ///
    /// Start-of-frame tasks run first, then each camera's chain in order, then end-of-frame tasks,
    /// and finally the frame's command list is submitted. Uploads drained by the task queue are
    /// submitted by it as their own segment of the frame. A camera whose chain fails is logged and
    /// its state pushes are unwound. The remaining cameras still render.
    #[profiling::function]
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        cameras: &[Camera],
        delta: Duration,
    ) -> MoltenResult<RenderFrameStats> {
        if self.graphics_queue.is_recording() {
            log::warn!("Discarding commands left over from an unfinished frame");
            self.graphics_queue.end()?;
            self.graphics_queue.pop_state_to(0)?;
        }

        self.frame_index += 1;
        self.time.advance(delta);
        self.graphics_queue.profiler_mut().reset();

        let mut stats = RenderFrameStats {
            frame_index: self.frame_index,
            ..Default::default()
        };

        self.graphics_queue
            .begin(GraphicsQueueBeginFlags::RESET_STATE)?;

        stats.tasks_run += self
            .task_queue
            .run_start_of_frame(self.frame_index, Some(&mut self.graphics_queue));

        for camera in cameras {
            profiling::scope!("render camera");
            let depth = self.graphics_queue.state_stack_depth();
            self.chain.build(scene, camera);

            let mut context = RenderContext {
                queue: &mut self.graphics_queue,
                tasks: &mut self.task_queue,
                surfaces: &mut self.surfaces,
                passes: &self.passes,
                frame_index: self.frame_index,
            };

            match self
                .chain
                .render(&mut self.registry, &mut context, camera, scene, &self.time)
            {
                Ok(steps_run) => {
                    stats.cameras_rendered += 1;
                    stats.steps_run += steps_run;
                }
                Err(e) => {
                    log::error!("Camera {} was not rendered: {}", camera.name, e);
                    stats.cameras_failed += 1;
                    self.graphics_queue.pop_state_to(depth)?;
                }
            }
        }

        stats.tasks_run += self
            .task_queue
            .run_end_of_frame(self.frame_index, Some(&mut self.graphics_queue));

        self.graphics_queue
            .submit(GraphicsQueueSubmitFlags::END_OF_FRAME)?;

        stats.profile = *self.graphics_queue.profiler();
        self.total_profile.accumulate(&stats.profile);
        log::trace!("Rendered frame {}: {:?}", self.frame_index, stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{CameraFlags, RenderChainLink, SceneLight, SceneObject};
    use crate::tasks::{BufferUploadTask, GpuTaskCompletion, GpuTaskPriority};
    use molten_api::{
        MoltenBuffer, MoltenBufferDef, MoltenCommand, MoltenDeviceNull, MoltenResourceType,
        MoltenTexture, MoltenTextureDef, MoltenVertexBufferBinding, MoltenVertexFormat,
    };

    fn create_renderer(builder: RendererBuilder) -> (Arc<MoltenDeviceNull>, Renderer) {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Arc::new(MoltenDeviceNull::default());
        let renderer = builder.build(device.clone()).unwrap();
        (device, renderer)
    }

    fn create_target(
        device: &MoltenDeviceNull,
        size: u32,
    ) -> MoltenTexture {
        device
            .create_texture(&MoltenTextureDef::new_2d(
                size,
                size,
                MoltenFormat::R8G8B8A8_UNORM,
                MoltenResourceType::RENDER_TARGET,
            ))
            .unwrap()
    }

    fn create_object(
        device: &MoltenDeviceNull,
        format: MoltenVertexFormat,
    ) -> SceneObject {
        let buffer: MoltenBuffer = device
            .create_buffer(&MoltenBufferDef::for_vertex_data(format.stride as u64 * 3))
            .unwrap();
        SceneObject::new(
            MoltenVertexBufferBinding {
                buffer,
                byte_offset: 0,
                format: Arc::new(format),
            },
            3,
        )
    }

    fn create_scene(device: &MoltenDeviceNull) -> Scene {
        Scene {
            objects: vec![create_object(device, RendererPasses::mesh_vertex_format())],
            sprites: vec![create_object(device, RendererPasses::sprite_vertex_format())],
            lights: vec![SceneLight::new([1.0, 1.0, 1.0, 2.0])],
        }
    }

    fn count_draws(device: &MoltenDeviceNull) -> usize {
        device
            .take_submitted()
            .iter()
            .flat_map(|x| x.commands())
            .filter(|x| matches!(x, MoltenCommand::Draw { .. }))
            .count()
    }

    #[test]
    fn test_deferred_frame() {
        let (device, mut renderer) = create_renderer(RendererBuilder::default());
        let scene = create_scene(&device);
        let camera = Camera::new("main")
            .with_flags(CameraFlags::DEFERRED)
            .with_target(create_target(&device, 8));

        let stats = renderer
            .render_frame(&scene, &[camera], Duration::from_millis(16))
            .unwrap();

        assert_eq!(stats.cameras_rendered, 1);
        assert_eq!(stats.steps_run, 5);
        // Mesh, sprite, one light and the resolve
        assert_eq!(stats.profile.draw_calls, 4);
        assert_eq!(stats.profile.skipped_draws, 0);
        assert_eq!(device.submit_count(), 1);
        assert_eq!(count_draws(&device), 4);

        assert!(!renderer.graphics_queue().is_recording());
        assert_eq!(renderer.graphics_queue().state_stack_depth(), 0);
        assert_eq!(renderer.surfaces().extents().unwrap().width, 8);
        assert_eq!(renderer.chain().len(), 5);
    }

    #[test]
    fn test_surfaces_follow_camera_target_size() {
        let (device, mut renderer) = create_renderer(RendererBuilder::default());
        let scene = create_scene(&device);
        let camera = Camera::new("main")
            .with_flags(CameraFlags::DEFERRED)
            .with_target(create_target(&device, 8));

        renderer
            .render_frame(&scene, &[camera], Duration::from_millis(16))
            .unwrap();
        let albedo = renderer.surfaces().albedo().unwrap().clone();
        let version = albedo.version();

        let camera = Camera::new("main")
            .with_flags(CameraFlags::DEFERRED)
            .with_target(create_target(&device, 16));
        renderer
            .render_frame(&scene, &[camera], Duration::from_millis(16))
            .unwrap();

        // Resized in place rather than recreated
        assert_eq!(renderer.surfaces().albedo(), Some(&albedo));
        assert_eq!(albedo.extents().width, 16);
        assert!(albedo.version() > version);
        assert_eq!(albedo.last_frame_resized(), 2);
        assert_eq!(renderer.total_profile().draw_calls, 8);
    }

    #[test]
    fn test_camera_without_target_is_skipped() {
        let (device, mut renderer) = create_renderer(RendererBuilder::default());
        let scene = create_scene(&device);
        let cameras = [
            Camera::new("no target"),
            Camera::new("disposed target").with_target(create_target(&device, 4)),
            Camera::new("main").with_target(create_target(&device, 4)),
        ];
        cameras[1].target.as_ref().unwrap().dispose();

        let stats = renderer
            .render_frame(&scene, &cameras, Duration::from_millis(16))
            .unwrap();

        assert_eq!(stats.cameras_failed, 0);
        // One start step for each skipped camera, and a full chain for the last
        assert_eq!(stats.steps_run, 1 + 1 + 3);
        assert_eq!(stats.profile.draw_calls, 2);
        assert_eq!(renderer.surfaces().extents(), None);
    }

    struct FailingStep;

    impl RenderStep for FailingStep {
        fn kind(&self) -> RenderStepKind {
            RenderStepKind::Immediate3D
        }

        fn render(
            &mut self,
            context: &mut RenderContext,
            camera: &Camera,
            _scene: &Scene,
            _time: &FrameTime,
            _link: &mut RenderChainLink,
        ) -> MoltenResult<()> {
            context.queue.push_state()?;
            if camera.name == "broken" {
                return Err("broken camera".into());
            }
            context.queue.pop_state()
        }
    }

    #[test]
    fn test_failed_camera_does_not_stop_frame() {
        let (device, mut renderer) = create_renderer(
            RendererBuilder::default()
                .with_step(RenderStepKind::Immediate3D, || Box::new(FailingStep)),
        );
        let cameras = [
            Camera::new("broken").with_target(create_target(&device, 4)),
            Camera::new("main").with_target(create_target(&device, 4)),
        ];

        let stats = renderer
            .render_frame(&Scene::default(), &cameras, Duration::from_millis(16))
            .unwrap();

        assert_eq!(stats.cameras_failed, 1);
        assert_eq!(stats.cameras_rendered, 1);
        assert_eq!(renderer.graphics_queue().state_stack_depth(), 0);
        assert_eq!(device.submit_count(), 1);
    }

    #[test]
    fn test_deferred_tasks_are_recorded_into_the_frame() {
        let (device, mut renderer) = create_renderer(RendererBuilder::default());
        let buffer = device
            .create_buffer(&MoltenBufferDef::for_constant_data(4))
            .unwrap();

        let (on_completed, rx) = GpuTaskCompletion::channel();
        renderer
            .task_queue_context()
            .push(
                GpuTaskPriority::EndOfFrame,
                BufferUploadTask::new(buffer.clone(), 0, vec![1, 2, 3, 4])
                    .with_on_completed(on_completed),
            )
            .unwrap();

        let stats = renderer
            .render_frame(&Scene::default(), &[], Duration::from_millis(16))
            .unwrap();

        assert_eq!(stats.tasks_run, 1);
        assert!(rx.try_recv().unwrap().is_ok());
        // Executed by the device as part of the submitted frame
        assert_eq!(
            device.read_resource(&(&buffer).into(), 0).unwrap(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(renderer.frame_index(), 1);
    }
}
