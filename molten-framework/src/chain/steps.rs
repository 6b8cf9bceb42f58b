//! The render steps every renderer starts with

use super::{
    Camera, FrameTime, RenderChainLink, RenderContext, RenderStep, RenderStepKind,
    RenderStepRegistry, Scene, SceneObject,
};
use crate::{GraphicsQueue, ShaderPass};
use molten_api::{MoltenResult, MoltenShaderStage, MoltenTexture};

pub(super) fn register_default_steps(registry: &mut RenderStepRegistry) {
    registry.register_factory(RenderStepKind::Start, || Box::new(StartStep));
    registry.register_factory(RenderStepKind::GBuffer3D, || Box::new(GBuffer3DStep));
    registry.register_factory(RenderStepKind::Render2D, || Box::new(Render2DStep));
    registry.register_factory(RenderStepKind::Lighting, || Box::new(LightingStep));
    registry.register_factory(RenderStepKind::Finalize, || Box::new(FinalizeStep));
    registry.register_factory(RenderStepKind::Immediate3D, || Box::new(Immediate3DStep));
}

/// Draw each object with `pass`. Objects that fail to bind are logged and skipped. Returns the
/// number of objects drawn.
fn draw_objects(
    queue: &mut GraphicsQueue,
    pass: &ShaderPass,
    objects: &[SceneObject],
) -> MoltenResult<usize> {
    let mut drawn = 0;
    for object in objects {
        queue.set_vertex_buffer(0, Some(object.vertex_buffer.clone()))?;
        queue.set_index_buffer(object.index_buffer.clone());
        queue.set_constant_buffer(MoltenShaderStage::Vertex, 0, object.constants.clone())?;
        queue.set_texture(MoltenShaderStage::Pixel, 0, object.texture.clone())?;
        queue.set_custom_values(object.custom_values);

        let result = if object.index_buffer.is_some() {
            queue.draw_indexed(pass, object.element_count, 0, 0)?
        } else {
            queue.draw(pass, object.element_count, 0)?
        };

        if result.is_successful() {
            drawn += 1;
        } else {
            log::warn!("Object skipped by pass {}: {:?}", pass.name(), result);
        }
    }

    Ok(drawn)
}

/// Runs `f` between a push and a pop of the queue's state. The state is popped even if `f` fails.
fn with_pushed_state<T, F: FnOnce(&mut GraphicsQueue) -> MoltenResult<T>>(
    queue: &mut GraphicsQueue,
    f: F,
) -> MoltenResult<T> {
    queue.push_state()?;
    let result = f(queue);
    queue.pop_state()?;
    result
}

/// Binds and clears the camera target. Ends the chain for cameras with nothing to render into.
pub struct StartStep;

impl RenderStep for StartStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::Start
    }

    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        _scene: &Scene,
        _time: &FrameTime,
        link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        let (target, _) = match camera.renderable_target() {
            Some(target) => target,
            None => {
                log::warn!("Skipping camera {}, it has no usable target", camera.name);
                link.end_chain();
                return Ok(());
            }
        };

        context.queue.set_render_target(0, Some(target.clone()))?;
        context.queue.set_depth_target(None);
        context
            .queue
            .clear_render_target(target, camera.clear_color)
    }
}

/// Draws scene objects into the geometry buffer, resizing the buffer to the camera target first
pub struct GBuffer3DStep;

impl RenderStep for GBuffer3DStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::GBuffer3D
    }

    #[profiling::function]
    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        _time: &FrameTime,
        _link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        let extents = match camera.renderable_target() {
            Some((_, extents)) => extents,
            None => return Ok(()),
        };

        let device = context.queue.device().clone();
        context
            .surfaces
            .ensure_size(extents, &*device, context.tasks)?;

        let (albedo, normal, depth) = match (
            context.surfaces.albedo(),
            context.surfaces.normal(),
            context.surfaces.depth(),
        ) {
            (Some(albedo), Some(normal), Some(depth)) => {
                (albedo.clone(), normal.clone(), depth.clone())
            }
            _ => return Err("geometry buffer surfaces were not created".into()),
        };

        let pass = &context.passes.gbuffer_mesh;
        let drawn = with_pushed_state(context.queue, |queue| {
            queue.set_render_target(0, Some(albedo.clone()))?;
            queue.set_render_target(1, Some(normal.clone()))?;
            queue.set_depth_target(Some(depth));
            queue.clear_render_target(&albedo, [0.0; 4])?;
            queue.clear_render_target(&normal, [0.0; 4])?;
            draw_objects(queue, pass, &scene.objects)
        })?;

        log::trace!("Drew {} objects into the geometry buffer", drawn);
        Ok(())
    }
}

/// Draws sprites. Deferred cameras draw them into the geometry buffer so they are lit along with
/// everything else, other cameras draw them straight into the target.
pub struct Render2DStep;

impl RenderStep for Render2DStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::Render2D
    }

    #[profiling::function]
    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        _time: &FrameTime,
        _link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        if scene.sprites.is_empty() {
            return Ok(());
        }

        let target: Option<MoltenTexture> = if camera.is_deferred() {
            context.surfaces.albedo().cloned()
        } else {
            camera.renderable_target().map(|(target, _)| target.clone())
        };

        let target = match target {
            Some(target) => target,
            None => {
                log::warn!("No target for sprites of camera {}", camera.name);
                return Ok(());
            }
        };

        let pass = &context.passes.sprite;
        let drawn = with_pushed_state(context.queue, |queue| {
            queue.set_render_target(0, Some(target))?;
            queue.set_render_target(1, None)?;
            queue.set_depth_target(None);
            draw_objects(queue, pass, &scene.sprites)
        })?;

        log::trace!("Drew {} sprites", drawn);
        Ok(())
    }
}

/// Accumulates each light into the lighting surface with a fullscreen pass
pub struct LightingStep;

impl RenderStep for LightingStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::Lighting
    }

    #[profiling::function]
    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        _time: &FrameTime,
        _link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        let (albedo, normal, lighting) = match (
            context.surfaces.albedo(),
            context.surfaces.normal(),
            context.surfaces.lighting(),
        ) {
            (Some(albedo), Some(normal), Some(lighting)) => {
                (albedo.clone(), normal.clone(), lighting.clone())
            }
            _ => {
                log::warn!("Camera {} has no geometry buffer to light", camera.name);
                return Ok(());
            }
        };

        let pass = &context.passes.lighting;
        with_pushed_state(context.queue, |queue| {
            queue.set_render_target(0, Some(lighting.clone()))?;
            queue.set_render_target(1, None)?;
            queue.set_depth_target(None);
            queue.clear_render_target(&lighting, [0.0; 4])?;
            queue.set_texture(MoltenShaderStage::Pixel, 0, Some(albedo))?;
            queue.set_texture(MoltenShaderStage::Pixel, 1, Some(normal))?;

            for light in &scene.lights {
                queue.set_constant_buffer(MoltenShaderStage::Pixel, 0, light.constants.clone())?;
                queue.set_custom_values(light.color);
                let result = queue.draw(pass, 3, 0)?;
                if !result.is_successful() {
                    log::warn!("Light skipped by pass {}: {:?}", pass.name(), result);
                }
            }

            Ok(())
        })
    }
}

/// Combines the geometry buffer and the accumulated lighting into the camera target
pub struct FinalizeStep;

impl RenderStep for FinalizeStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::Finalize
    }

    fn render(
        &mut self,
        context: &mut RenderContext,
        camera: &Camera,
        scene: &Scene,
        time: &FrameTime,
        _link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        let target = match camera.renderable_target() {
            Some((target, _)) => target.clone(),
            None => return Ok(()),
        };

        let (albedo, lighting) = match (context.surfaces.albedo(), context.surfaces.lighting()) {
            (Some(albedo), Some(lighting)) => (albedo.clone(), lighting.clone()),
            _ => {
                log::warn!("Camera {} has no geometry buffer to resolve", camera.name);
                return Ok(());
            }
        };

        let pass = &context.passes.composite;
        let result = with_pushed_state(context.queue, |queue| {
            queue.set_render_target(0, Some(target))?;
            queue.set_render_target(1, None)?;
            queue.set_depth_target(None);
            queue.set_texture(MoltenShaderStage::Pixel, 0, Some(albedo))?;
            queue.set_texture(MoltenShaderStage::Pixel, 1, Some(lighting))?;
            queue.set_custom_values([
                time.total().as_secs_f32(),
                time.delta_seconds(),
                scene.lights.len() as f32,
                0.0,
            ]);
            queue.draw(pass, 3, 0)
        })?;

        if !result.is_successful() {
            log::warn!("Camera {} was not resolved: {:?}", camera.name, result);
        }
        Ok(())
    }
}

/// Draws scene objects straight into the camera target
pub struct Immediate3DStep;

impl RenderStep for Immediate3DStep {
    fn kind(&self) -> RenderStepKind {
        RenderStepKind::Immediate3D
    }

    #[profiling::function]
    fn render(
        &mut self,
        context: &mut RenderContext,
        _camera: &Camera,
        scene: &Scene,
        _time: &FrameTime,
        _link: &mut RenderChainLink,
    ) -> MoltenResult<()> {
        let pass = &context.passes.forward_mesh;
        let drawn = with_pushed_state(context.queue, |queue| {
            draw_objects(queue, pass, &scene.objects)
        })?;

        log::trace!("Drew {} objects", drawn);
        Ok(())
    }
}
