use crate::tasks::{GpuTaskPriority, GpuTaskQueue};
use molten_api::{
    MoltenDevice, MoltenExtents3D, MoltenFormat, MoltenResourceType, MoltenResult, MoltenTexture,
    MoltenTextureDef,
};

/// Off-screen targets used by deferred cameras. Created on first use and resized (through
/// immediate resize tasks) whenever a camera with a different target size is rendered.
pub struct RenderSurfaces {
    gbuffer_format: MoltenFormat,
    albedo: Option<MoltenTexture>,
    normal: Option<MoltenTexture>,
    lighting: Option<MoltenTexture>,
    depth: Option<MoltenTexture>,
}

impl RenderSurfaces {
    pub fn new(gbuffer_format: MoltenFormat) -> Self {
        RenderSurfaces {
            gbuffer_format,
            albedo: None,
            normal: None,
            lighting: None,
            depth: None,
        }
    }

    pub fn albedo(&self) -> Option<&MoltenTexture> {
        self.albedo.as_ref()
    }

    pub fn normal(&self) -> Option<&MoltenTexture> {
        self.normal.as_ref()
    }

    pub fn lighting(&self) -> Option<&MoltenTexture> {
        self.lighting.as_ref()
    }

    pub fn depth(&self) -> Option<&MoltenTexture> {
        self.depth.as_ref()
    }

    /// Size of the surfaces, None if they haven't been created yet
    pub fn extents(&self) -> Option<MoltenExtents3D> {
        self.albedo.as_ref().map(|x| x.extents())
    }

    fn surface_def(
        format: MoltenFormat,
        extents: MoltenExtents3D,
    ) -> MoltenTextureDef {
        let resource_type = if format.is_depth() {
            MoltenResourceType::DEPTH_STENCIL | MoltenResourceType::TEXTURE
        } else {
            MoltenResourceType::RENDER_TARGET | MoltenResourceType::TEXTURE
        };

        MoltenTextureDef::new_2d(extents.width, extents.height, format, resource_type)
    }

    fn ensure_surface(
        surface: &mut Option<MoltenTexture>,
        format: MoltenFormat,
        extents: MoltenExtents3D,
        device: &dyn MoltenDevice,
        tasks: &mut GpuTaskQueue,
    ) -> MoltenResult<()> {
        let texture_def = Self::surface_def(format, extents);
        let needs_create = surface.as_ref().map_or(true, |x| x.is_disposed());
        if needs_create {
            *surface = Some(device.create_texture(&texture_def)?);
        } else if let Some(texture) = surface {
            if texture.extents() != extents {
                let mut task = tasks.acquire_texture_resize();
                task.texture = Some(texture.clone());
                task.texture_def = texture_def;
                tasks.push(GpuTaskPriority::Immediate, task, None)?;
            }
        }

        Ok(())
    }

    /// Make sure every surface exists and matches `extents`
    pub fn ensure_size(
        &mut self,
        extents: MoltenExtents3D,
        device: &dyn MoltenDevice,
        tasks: &mut GpuTaskQueue,
    ) -> MoltenResult<()> {
        if self.extents() != Some(extents) {
            log::debug!("Sizing render surfaces to {:?}", extents);
        }

        let gbuffer_format = self.gbuffer_format;
        Self::ensure_surface(&mut self.albedo, gbuffer_format, extents, device, tasks)?;
        Self::ensure_surface(
            &mut self.normal,
            MoltenFormat::R16G16B16A16_SFLOAT,
            extents,
            device,
            tasks,
        )?;
        Self::ensure_surface(
            &mut self.lighting,
            MoltenFormat::R16G16B16A16_SFLOAT,
            extents,
            device,
            tasks,
        )?;
        Self::ensure_surface(
            &mut self.depth,
            MoltenFormat::D32_SFLOAT,
            extents,
            device,
            tasks,
        )
    }

    /// Dispose every surface. They are recreated the next time they are needed.
    pub fn dispose(&mut self) {
        for surface in [
            &mut self.albedo,
            &mut self.normal,
            &mut self.lighting,
            &mut self.depth,
        ] {
            if let Some(texture) = surface.take() {
                texture.dispose();
            }
        }
    }
}
