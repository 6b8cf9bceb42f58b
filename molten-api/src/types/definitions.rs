#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::{
    MoltenAddressMode, MoltenBuffer, MoltenExtents3D, MoltenFilterType, MoltenFormat,
    MoltenIndexType, MoltenResourceType, MoltenShaderStage,
};
use std::sync::Arc;

/// Information about the device, mostly limits. Stages size their slot groups from these values.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct MoltenDeviceInfo {
    pub max_vertex_buffer_slots: u32,
    pub max_constant_buffer_slots: u32,
    pub max_texture_slots: u32,
    pub max_sampler_slots: u32,
    pub max_render_targets: u32,
}

impl Default for MoltenDeviceInfo {
    fn default() -> Self {
        MoltenDeviceInfo {
            max_vertex_buffer_slots: 16,
            max_constant_buffer_slots: 14,
            max_texture_slots: 16,
            max_sampler_slots: 16,
            max_render_targets: 8,
        }
    }
}

impl MoltenDeviceInfo {
    /// Width of the widest slot group a stage can contain
    pub fn max_slot_group_width(&self) -> u32 {
        self.max_vertex_buffer_slots
            .max(self.max_constant_buffer_slots)
            .max(self.max_texture_slots)
            .max(self.max_sampler_slots)
            .max(self.max_render_targets)
    }
}

/// Used to create a `MoltenBuffer`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct MoltenBufferDef {
    pub size: u64,
    pub resource_type: MoltenResourceType,
}

impl Default for MoltenBufferDef {
    fn default() -> Self {
        MoltenBufferDef {
            size: 0,
            resource_type: MoltenResourceType::VERTEX_BUFFER,
        }
    }
}

impl MoltenBufferDef {
    pub fn for_vertex_data(size: u64) -> Self {
        MoltenBufferDef {
            size,
            resource_type: MoltenResourceType::VERTEX_BUFFER,
        }
    }

    pub fn for_index_data(size: u64) -> Self {
        MoltenBufferDef {
            size,
            resource_type: MoltenResourceType::INDEX_BUFFER,
        }
    }

    pub fn for_constant_data(size: u64) -> Self {
        MoltenBufferDef {
            size,
            resource_type: MoltenResourceType::CONSTANT_BUFFER,
        }
    }
}

/// Used to create a `MoltenTexture`, and to describe the new shape of a texture when it is resized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct MoltenTextureDef {
    pub extents: MoltenExtents3D,
    // Generally 1, 6 for cubemaps
    pub array_length: u32,
    pub mip_count: u32,
    pub format: MoltenFormat,
    pub resource_type: MoltenResourceType,
}

impl Default for MoltenTextureDef {
    fn default() -> Self {
        MoltenTextureDef {
            extents: MoltenExtents3D {
                width: 0,
                height: 0,
                depth: 0,
            },
            array_length: 1,
            mip_count: 1,
            format: MoltenFormat::UNDEFINED,
            resource_type: MoltenResourceType::TEXTURE,
        }
    }
}

impl MoltenTextureDef {
    pub fn new_2d(
        width: u32,
        height: u32,
        format: MoltenFormat,
        resource_type: MoltenResourceType,
    ) -> Self {
        MoltenTextureDef {
            extents: MoltenExtents3D::new(width, height, 1),
            format,
            resource_type,
            ..Default::default()
        }
    }

    pub fn verify(&self) -> Result<(), String> {
        if self.extents.is_zero_sized() {
            return Err(format!("texture extents {:?} are zero-sized", self.extents));
        }

        if self.array_length == 0 || self.mip_count == 0 {
            return Err("texture must have at least one array layer and one mip".to_string());
        }

        if self.format == MoltenFormat::UNDEFINED {
            return Err("texture format is undefined".to_string());
        }

        Ok(())
    }

    pub fn subresource_count(&self) -> u32 {
        self.array_length * self.mip_count
    }

    /// Byte size of a subresource. Subresources are numbered mip-major within each array layer,
    /// so subresource `n` is mip `n % mip_count` of layer `n / mip_count`.
    pub fn subresource_byte_size(
        &self,
        subresource: u32,
    ) -> Option<u64> {
        if subresource >= self.subresource_count() {
            return None;
        }

        let mip = subresource % self.mip_count;
        let width = (self.extents.width >> mip).max(1) as u64;
        let height = (self.extents.height >> mip).max(1) as u64;
        let depth = (self.extents.depth >> mip).max(1) as u64;
        Some(width * height * depth * self.format.block_size_in_bytes() as u64)
    }
}

/// Used to create a `MoltenSampler`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct MoltenSamplerDef {
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub min_filter: MoltenFilterType,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub mag_filter: MoltenFilterType,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub address_mode_u: MoltenAddressMode,
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub address_mode_v: MoltenAddressMode,
}

/// A single element of a shader's input signature. Vertex layouts are matched against these by
/// semantic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenShaderInputElement {
    pub semantic: String,
    pub format: MoltenFormat,
}

/// Describes the vertex inputs a vertex shader expects, in location order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MoltenShaderInputSignature {
    pub elements: Vec<MoltenShaderInputElement>,
}

impl MoltenShaderInputSignature {
    pub fn new(elements: Vec<MoltenShaderInputElement>) -> Self {
        MoltenShaderInputSignature { elements }
    }

    pub fn with_element<T: Into<String>>(
        mut self,
        semantic: T,
        format: MoltenFormat,
    ) -> Self {
        self.elements.push(MoltenShaderInputElement {
            semantic: semantic.into(),
            format,
        });
        self
    }
}

/// Used to create a `MoltenShader`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenShaderDef {
    pub stage: MoltenShaderStage,
    pub entry_point: String,
    /// Only meaningful for vertex shaders
    pub input_signature: Option<MoltenShaderInputSignature>,
}

/// A member of a vertex, at a byte offset within the vertex
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenVertexElement {
    pub semantic: String,
    pub format: MoltenFormat,
    pub byte_offset: u32,
}

/// Describes the layout of the vertices stored in one vertex buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MoltenVertexFormat {
    pub elements: Vec<MoltenVertexElement>,
    pub stride: u32,
    /// If true, the buffer advances per instance rather than per vertex
    pub per_instance: bool,
}

impl MoltenVertexFormat {
    /// Builds a tightly packed format from (semantic, format) pairs
    pub fn packed<T: Into<String>, I: IntoIterator<Item = (T, MoltenFormat)>>(elements: I) -> Self {
        let mut vertex_format = MoltenVertexFormat::default();
        for (semantic, format) in elements {
            vertex_format.elements.push(MoltenVertexElement {
                semantic: semantic.into(),
                format,
                byte_offset: vertex_format.stride,
            });
            vertex_format.stride += format.block_size_in_bytes();
        }
        vertex_format
    }

    pub fn find_element(
        &self,
        semantic: &str,
    ) -> Option<&MoltenVertexElement> {
        self.elements.iter().find(|x| x.semantic == semantic)
    }
}

/// Describes an attribute within a MoltenVertexLayout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenVertexLayoutAttribute {
    /// Format of the attribute
    pub format: MoltenFormat,
    /// Which buffer the attribute is contained in
    pub buffer_index: u32,
    /// Affects what input variable within the shader the attribute is assigned
    pub location: u32,
    /// The byte offset of the attribute within the buffer
    pub byte_offset: u32,
}

/// Describes a buffer that provides vertex attribute data (See MoltenVertexLayout)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenVertexLayoutBuffer {
    pub stride: u32,
    pub per_instance: bool,
}

/// Describes how vertex attributes are laid out within one or more buffers. This is the
/// "input layout" that binds vertex buffer contents to a vertex shader's input signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MoltenVertexLayout {
    pub attributes: Vec<MoltenVertexLayoutAttribute>,
    pub buffers: Vec<MoltenVertexLayoutBuffer>,
}

/// A vertex buffer bound to one input assembler slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenVertexBufferBinding {
    pub buffer: MoltenBuffer,
    pub byte_offset: u64,
    pub format: Arc<MoltenVertexFormat>,
}

/// An index buffer bound to the input assembler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenIndexBufferBinding {
    pub buffer: MoltenBuffer,
    pub byte_offset: u64,
    pub index_type: MoltenIndexType,
}

/// A constant buffer bound to one shader stage slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoltenConstantBufferBinding {
    pub buffer: MoltenBuffer,
    pub byte_offset: u64,
}
