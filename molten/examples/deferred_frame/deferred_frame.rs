use log::LevelFilter;

use molten::api::*;
use molten::chain::*;
use molten::framework::{RendererBuilder, RendererConfig};
use molten::tasks::*;
use std::sync::Arc;
use std::time::Duration;

const TARGET_WIDTH: u32 = 320;
const TARGET_HEIGHT: u32 = 180;

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_nanos()
        .filter_level(LevelFilter::Debug)
        .init();

    run().unwrap();
}

fn create_object(
    device: &dyn MoltenDevice,
    vertex_format: MoltenVertexFormat,
    vertex_count: u32,
) -> MoltenResult<SceneObject> {
    let buffer = device.create_buffer(&MoltenBufferDef::for_vertex_data(
        vertex_format.stride as u64 * vertex_count as u64,
    ))?;

    Ok(SceneObject::new(
        MoltenVertexBufferBinding {
            buffer,
            byte_offset: 0,
            format: Arc::new(vertex_format),
        },
        vertex_count,
    ))
}

fn run() -> MoltenResult<()> {
    //
    // The null device keeps resources in memory, which is all the state tracking needs
    //
    let device = Arc::new(MoltenDeviceNull::default());

    let mut renderer = RendererBuilder::default()
        .with_config(RendererConfig {
            gbuffer_format: MoltenFormat::R8G8B8A8_SRGB,
            ..Default::default()
        })
        .build(device.clone())?;

    //
    // Two cameras. The main one goes through the geometry buffer, the overlay draws directly.
    //
    let main_target = device.create_texture(&MoltenTextureDef::new_2d(
        TARGET_WIDTH,
        TARGET_HEIGHT,
        MoltenFormat::B8G8R8A8_UNORM,
        MoltenResourceType::RENDER_TARGET | MoltenResourceType::TEXTURE,
    ))?;
    let overlay_target = device.create_texture(&MoltenTextureDef::new_2d(
        TARGET_WIDTH / 4,
        TARGET_HEIGHT / 4,
        MoltenFormat::B8G8R8A8_UNORM,
        MoltenResourceType::RENDER_TARGET,
    ))?;

    main_target.register_on_resize(|event| {
        log::info!(
            "Main target resized to {:?} on frame {}",
            event.new_def.extents,
            event.frame_index
        );
    });

    let cameras = vec![
        Camera::new("main")
            .with_flags(CameraFlags::DEFERRED)
            .with_target(main_target.clone())
            .with_clear_color([0.1, 0.1, 0.2, 1.0]),
        Camera::new("overlay").with_target(overlay_target),
    ];

    //
    // Scene content. Light parameters live in a constant buffer that is filled from another
    // thread through the task queue context.
    //
    let light_constants = device.create_buffer(&MoltenBufferDef::for_constant_data(32))?;
    let scene = Scene {
        objects: vec![
            create_object(&*device, RendererPasses::mesh_vertex_format(), 36)?,
            create_object(&*device, RendererPasses::mesh_vertex_format(), 3)?
                .with_custom_values([1.0, 0.0, 0.0, 1.0]),
        ],
        sprites: vec![create_object(
            &*device,
            RendererPasses::sprite_vertex_format(),
            6,
        )?],
        lights: vec![SceneLight::new([1.0, 0.9, 0.8, 4.0]).with_constants(
            MoltenConstantBufferBinding {
                buffer: light_constants.clone(),
                byte_offset: 0,
            },
        )],
    };

    let context = renderer.task_queue_context();
    let (upload_completed, upload_rx) = GpuTaskCompletion::channel();
    let upload_buffer = light_constants.clone();
    std::thread::spawn(move || {
        let light_data: Vec<u8> = (0..32).collect();
        context
            .push(
                GpuTaskPriority::StartOfFrame,
                BufferUploadTask::new(upload_buffer, 0, light_data)
                    .with_on_completed(upload_completed),
            )
            .unwrap();
    })
    .join()
    .unwrap();

    for frame in 0..3 {
        profiling::scope!("frame");

        // Pretend the window was resized before the second frame
        if frame == 1 {
            let task = TextureResizeTask::new(
                main_target.clone(),
                MoltenTextureDef::new_2d(
                    TARGET_WIDTH * 2,
                    TARGET_HEIGHT * 2,
                    MoltenFormat::B8G8R8A8_UNORM,
                    MoltenResourceType::RENDER_TARGET | MoltenResourceType::TEXTURE,
                ),
            );
            renderer
                .task_queue_mut()
                .push(GpuTaskPriority::Immediate, task, None)?;
        }

        let stats = renderer.render_frame(&scene, &cameras, Duration::from_millis(16))?;
        log::info!(
            "Frame {}: {} cameras, {} steps, {} draws, {} binds, {} skipped",
            stats.frame_index,
            stats.cameras_rendered,
            stats.steps_run,
            stats.profile.draw_calls,
            stats.profile.bind_commands,
            stats.profile.skipped_draws
        );
    }

    if let Ok(result) = upload_rx.try_recv() {
        log::info!("Light constants uploaded: {:?}", result.is_ok());
    }

    //
    // Read the light constants back to see the upload landed
    //
    let (readback_completed, readback_rx) = GpuTaskCompletion::readback_channel();
    let readback = ReadbackTask::new((&light_constants).into(), 0)
        .with_on_completed(readback_completed);
    renderer
        .task_queue_mut()
        .push(GpuTaskPriority::Immediate, readback, None)?;
    let bytes = readback_rx
        .try_recv()
        .map_err(|_| MoltenError::from("readback did not complete"))??;
    log::info!("Read back {} bytes: {:?}", bytes.len(), &bytes[..8]);

    log::info!(
        "Layout cache holds {} layouts, {} command lists submitted, {} draws in total",
        renderer.graphics_queue().layout_cache().len(),
        device.submit_count(),
        renderer.total_profile().draw_calls
    );

    Ok(())
}
