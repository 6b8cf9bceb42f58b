use molten_api::{
    MoltenConstantBufferBinding, MoltenExtents3D, MoltenIndexBufferBinding, MoltenTexture,
    MoltenVertexBufferBinding,
};
use std::time::Duration;

bitflags::bitflags! {
    /// Selects how a camera is rendered
    #[derive(Default)]
    pub struct CameraFlags: u32 {
        /// Render through the geometry buffer and lighting steps instead of drawing directly into
        /// the target
        const DEFERRED = 1 << 0;
    }
}

/// A viewpoint rendered once per frame into its own target
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub flags: CameraFlags,
    pub target: Option<MoltenTexture>,
    pub clear_color: [f32; 4],
}

impl Camera {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Camera {
            name: name.into(),
            flags: CameraFlags::empty(),
            target: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn with_flags(
        mut self,
        flags: CameraFlags,
    ) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_target(
        mut self,
        target: MoltenTexture,
    ) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_clear_color(
        mut self,
        clear_color: [f32; 4],
    ) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn is_deferred(&self) -> bool {
        self.flags.contains(CameraFlags::DEFERRED)
    }

    /// The target, if it exists and can be rendered to. Disposed and zero-sized targets are
    /// treated as missing.
    pub fn renderable_target(&self) -> Option<(&MoltenTexture, MoltenExtents3D)> {
        let target = self.target.as_ref()?;
        if target.is_disposed() {
            return None;
        }

        let extents = target.extents();
        if extents.is_zero_sized() {
            return None;
        }

        Some((target, extents))
    }
}

/// Something drawable: a mesh when placed in `Scene::objects`, a sprite when placed in
/// `Scene::sprites`
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub vertex_buffer: MoltenVertexBufferBinding,
    pub index_buffer: Option<MoltenIndexBufferBinding>,
    /// Index count when `index_buffer` is set, vertex count otherwise
    pub element_count: u32,
    pub constants: Option<MoltenConstantBufferBinding>,
    pub texture: Option<MoltenTexture>,
    pub custom_values: [f32; 4],
}

impl SceneObject {
    pub fn new(
        vertex_buffer: MoltenVertexBufferBinding,
        element_count: u32,
    ) -> Self {
        SceneObject {
            vertex_buffer,
            index_buffer: None,
            element_count,
            constants: None,
            texture: None,
            custom_values: [0.0; 4],
        }
    }

    pub fn with_index_buffer(
        mut self,
        index_buffer: MoltenIndexBufferBinding,
    ) -> Self {
        self.index_buffer = Some(index_buffer);
        self
    }

    pub fn with_constants(
        mut self,
        constants: MoltenConstantBufferBinding,
    ) -> Self {
        self.constants = Some(constants);
        self
    }

    pub fn with_texture(
        mut self,
        texture: MoltenTexture,
    ) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_custom_values(
        mut self,
        custom_values: [f32; 4],
    ) -> Self {
        self.custom_values = custom_values;
        self
    }
}

/// A light applied by the lighting step of deferred cameras
#[derive(Debug, Clone)]
pub struct SceneLight {
    /// rgb color, intensity in alpha
    pub color: [f32; 4],
    /// Position, range and anything else the lighting shader reads for this light
    pub constants: Option<MoltenConstantBufferBinding>,
}

impl SceneLight {
    pub fn new(color: [f32; 4]) -> Self {
        SceneLight {
            color,
            constants: None,
        }
    }

    pub fn with_constants(
        mut self,
        constants: MoltenConstantBufferBinding,
    ) -> Self {
        self.constants = Some(constants);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub sprites: Vec<SceneObject>,
    pub lights: Vec<SceneLight>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.sprites.is_empty() && self.lights.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    total: Duration,
    delta: Duration,
    frame_count: u64,
}

impl FrameTime {
    pub fn advance(
        &mut self,
        delta: Duration,
    ) {
        self.total += delta;
        self.delta = delta;
        self.frame_count += 1;
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
