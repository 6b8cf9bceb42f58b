#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Pixel and vertex element formats. Only the subset the core needs to reason about is listed.
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenFormat {
    UNDEFINED,
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32_UINT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D32_SFLOAT,
}

impl Default for MoltenFormat {
    fn default() -> Self {
        MoltenFormat::UNDEFINED
    }
}

impl MoltenFormat {
    /// Size of a single element/pixel of this format in bytes. UNDEFINED is zero-sized.
    pub fn block_size_in_bytes(self) -> u32 {
        match self {
            MoltenFormat::UNDEFINED => 0,
            MoltenFormat::R8_UNORM => 1,
            MoltenFormat::R8G8B8A8_UNORM
            | MoltenFormat::R8G8B8A8_SRGB
            | MoltenFormat::B8G8R8A8_UNORM
            | MoltenFormat::R32_UINT
            | MoltenFormat::R32_SFLOAT
            | MoltenFormat::D32_SFLOAT => 4,
            MoltenFormat::R16G16B16A16_SFLOAT | MoltenFormat::R32G32_SFLOAT => 8,
            MoltenFormat::R32G32B32_SFLOAT => 12,
            MoltenFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    pub fn is_depth(self) -> bool {
        self == MoltenFormat::D32_SFLOAT
    }
}

/// How vertices are assembled into primitives
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenPrimitiveTopology {
    /// Nothing has been set yet. Never issued to the device.
    Undefined,
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl Default for MoltenPrimitiveTopology {
    fn default() -> Self {
        MoltenPrimitiveTopology::Undefined
    }
}

impl MoltenPrimitiveTopology {
    /// Number of primitives produced by the given number of vertices (or indices)
    pub fn primitive_count(
        self,
        vertex_count: u32,
    ) -> u32 {
        match self {
            MoltenPrimitiveTopology::Undefined => 0,
            MoltenPrimitiveTopology::PointList => vertex_count,
            MoltenPrimitiveTopology::LineList => vertex_count / 2,
            MoltenPrimitiveTopology::LineStrip => vertex_count.saturating_sub(1),
            MoltenPrimitiveTopology::TriangleList => vertex_count / 3,
            MoltenPrimitiveTopology::TriangleStrip => vertex_count.saturating_sub(2),
        }
    }
}

/// The size of index buffer elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenIndexType {
    Uint32,
    Uint16,
}

impl Default for MoltenIndexType {
    fn default() -> Self {
        MoltenIndexType::Uint32
    }
}

/// The pipeline stage a shader runs in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenShaderStage {
    Vertex,
    Geometry,
    Pixel,
    Compute,
}

impl MoltenShaderStage {
    pub const ALL: [MoltenShaderStage; 4] = [
        MoltenShaderStage::Vertex,
        MoltenShaderStage::Geometry,
        MoltenShaderStage::Pixel,
        MoltenShaderStage::Compute,
    ];
}

/// How a mapped resource will be accessed. Determines whether the existing contents are read
/// back and whether the mapped bytes are written back when the mapping is released.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MoltenMapType {
    Read,
    Write,
    ReadWrite,
    /// Previous contents are discarded, the stream starts zeroed
    WriteDiscard,
    /// Caller promises not to overwrite data the GPU may still be using
    WriteNoOverwrite,
}

impl MoltenMapType {
    pub fn reads_existing_contents(self) -> bool {
        !matches!(self, MoltenMapType::WriteDiscard)
    }

    pub fn writes_back(self) -> bool {
        !matches!(self, MoltenMapType::Read)
    }
}

/// Affects image sampling when the image is scaled
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenFilterType {
    Nearest,
    Linear,
}

impl Default for MoltenFilterType {
    fn default() -> Self {
        MoltenFilterType::Nearest
    }
}

/// Affects image sampling for UV coordinates outside the [0, 1] range
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum MoltenAddressMode {
    Mirror,
    Repeat,
    ClampToEdge,
}

impl Default for MoltenAddressMode {
    fn default() -> Self {
        MoltenAddressMode::Repeat
    }
}

/// Width/height/depth of a texture
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct MoltenExtents3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl MoltenExtents3D {
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
    ) -> Self {
        MoltenExtents3D {
            width,
            height,
            depth,
        }
    }

    pub fn is_zero_sized(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

bitflags::bitflags! {
    /// How a resource may be used by the GPU
    #[derive(Default)]
    #[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
    pub struct MoltenResourceType: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const CONSTANT_BUFFER = 1 << 2;
        const TEXTURE = 1 << 3;
        const RENDER_TARGET = 1 << 4;
        const DEPTH_STENCIL = 1 << 5;
        const STAGING = 1 << 6;
    }
}
