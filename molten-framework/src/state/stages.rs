use super::bind_result::{check_all_live, BindingValue};
use super::{BindError, Slot, SlotGroup, VertexLayoutCache};
use crate::{ShaderPass, StateConditions};
use molten_api::{
    MoltenCommandList, MoltenConstantBufferBinding, MoltenDeviceInfo, MoltenIndexBufferBinding,
    MoltenPrimitiveTopology, MoltenResult, MoltenSampler, MoltenShader, MoltenShaderStage,
    MoltenTexture, MoltenVertexBufferBinding, MoltenVertexLayout,
};
use std::sync::Arc;

/// Shader binding state for one programmable stage: the shader itself plus the constant buffers,
/// textures and samplers it reads.
#[derive(Debug, Clone)]
pub struct ShaderStage {
    stage: MoltenShaderStage,
    shader: Slot<Option<MoltenShader>>,
    constant_buffers: SlotGroup<Option<MoltenConstantBufferBinding>>,
    textures: SlotGroup<Option<MoltenTexture>>,
    samplers: SlotGroup<Option<MoltenSampler>>,
}

impl ShaderStage {
    pub fn new(
        stage: MoltenShaderStage,
        device_info: &MoltenDeviceInfo,
    ) -> Self {
        ShaderStage {
            stage,
            shader: Slot::new(0),
            constant_buffers: SlotGroup::new(device_info.max_constant_buffer_slots),
            textures: SlotGroup::new(device_info.max_texture_slots),
            samplers: SlotGroup::new(device_info.max_sampler_slots),
        }
    }

    // Zero-width stage, only used as a blank to copy into
    pub(crate) fn empty(stage: MoltenShaderStage) -> Self {
        ShaderStage {
            stage,
            shader: Slot::new(0),
            constant_buffers: SlotGroup::new(0),
            textures: SlotGroup::new(0),
            samplers: SlotGroup::new(0),
        }
    }

    pub fn stage(&self) -> MoltenShaderStage {
        self.stage
    }

    pub fn shader(&self) -> &Slot<Option<MoltenShader>> {
        &self.shader
    }

    pub fn constant_buffers(&self) -> &SlotGroup<Option<MoltenConstantBufferBinding>> {
        &self.constant_buffers
    }

    pub fn textures(&self) -> &SlotGroup<Option<MoltenTexture>> {
        &self.textures
    }

    pub fn samplers(&self) -> &SlotGroup<Option<MoltenSampler>> {
        &self.samplers
    }

    pub fn set_shader(
        &mut self,
        shader: Option<MoltenShader>,
    ) {
        self.shader.set_pending(shader);
    }

    pub fn set_constant_buffer(
        &mut self,
        slot: u32,
        binding: Option<MoltenConstantBufferBinding>,
    ) -> MoltenResult<()> {
        self.constant_buffers.set_pending(slot, binding)
    }

    pub fn set_texture(
        &mut self,
        slot: u32,
        texture: Option<MoltenTexture>,
    ) -> MoltenResult<()> {
        self.textures.set_pending(slot, texture)
    }

    pub fn set_sampler(
        &mut self,
        slot: u32,
        sampler: Option<MoltenSampler>,
    ) -> MoltenResult<()> {
        self.samplers.set_pending(slot, sampler)
    }

    /// Issue whatever changed. Returns true if any command was recorded.
    ///
    /// With `validate`, nothing is issued if any pending resource has been disposed.
    pub(crate) fn bind(
        &mut self,
        command_list: &mut MoltenCommandList,
        validate: bool,
    ) -> Result<bool, BindError> {
        if validate {
            self.shader.pending().check_live()?;
            for slot in self.constant_buffers.slots() {
                slot.pending().check_live()?;
            }
            for slot in self.textures.slots() {
                slot.pending().check_live()?;
            }
        }

        Ok(self.bind_pending(command_list))
    }

    pub(crate) fn bind_pending(
        &mut self,
        command_list: &mut MoltenCommandList,
    ) -> bool {
        let stage = self.stage;

        let mut changed = self.shader.bind_infallible(|_, shader| {
            command_list.cmd_bind_shader(stage, shader.clone());
        });

        changed |= self
            .constant_buffers
            .bind_all_infallible(|first_slot, bindings| {
                command_list.cmd_bind_constant_buffers(stage, first_slot, bindings);
            });

        changed |= self
            .textures
            .bind_all_infallible(|first_slot, textures| {
                command_list.cmd_bind_textures(stage, first_slot, textures);
            });

        changed |= self
            .samplers
            .bind_all_infallible(|first_slot, samplers| {
                command_list.cmd_bind_samplers(stage, first_slot, samplers);
            });

        changed
    }

    pub(crate) fn invalidate_bound(&mut self) {
        self.shader.invalidate_bound();
        self.constant_buffers.invalidate_bound();
        self.textures.invalidate_bound();
        self.samplers.invalidate_bound();
    }

    pub(crate) fn reset_pending(&mut self) {
        self.shader.reset_pending();
        self.constant_buffers.reset_pending();
        self.textures.reset_pending();
        self.samplers.reset_pending();
    }

    pub(crate) fn request_bound_of(
        &mut self,
        other: &ShaderStage,
    ) {
        self.shader.request_bound_of(&other.shader);
        self.constant_buffers
            .request_bound_of(&other.constant_buffers);
        self.textures.request_bound_of(&other.textures);
        self.samplers.request_bound_of(&other.samplers);
    }

    pub(crate) fn copy_from(
        &mut self,
        other: &ShaderStage,
    ) {
        self.stage = other.stage;
        self.shader.copy_from(&other.shader);
        self.constant_buffers.copy_from(&other.constant_buffers);
        self.textures.copy_from(&other.textures);
        self.samplers.copy_from(&other.samplers);
    }

    pub(crate) fn clear(&mut self) {
        self.shader.clear();
        self.constant_buffers.clear();
        self.textures.clear();
        self.samplers.clear();
    }

    pub(crate) fn bindings_eq(
        &self,
        other: &ShaderStage,
    ) -> bool {
        self.stage == other.stage
            && self.shader.bindings_eq(&other.shader)
            && self.constant_buffers.bindings_eq(&other.constant_buffers)
            && self.textures.bindings_eq(&other.textures)
            && self.samplers.bindings_eq(&other.samplers)
    }
}

/// The shader stages that participate in a draw, borrowed together so the input assembler can
/// drive them
pub(crate) struct GraphicsShaderStages<'a> {
    pub vertex: &'a mut ShaderStage,
    pub geometry: &'a mut ShaderStage,
    pub pixel: &'a mut ShaderStage,
}

/// Topology, index buffer, vertex buffers and the input layout that ties the vertex buffers to the
/// vertex shader's inputs.
#[derive(Debug, Clone)]
pub struct InputAssemblerStage {
    topology: Slot<MoltenPrimitiveTopology>,
    index_buffer: Slot<Option<MoltenIndexBufferBinding>>,
    vertex_buffers: SlotGroup<Option<MoltenVertexBufferBinding>>,
    input_layout: Slot<Option<Arc<MoltenVertexLayout>>>,
    // Set when the last layout lookup failed, so the next draw looks it up again even though the
    // shader and vertex buffers are already bound
    layout_unresolved: bool,
}

impl InputAssemblerStage {
    pub fn new(device_info: &MoltenDeviceInfo) -> Self {
        InputAssemblerStage {
            topology: Slot::new(0),
            index_buffer: Slot::new(0),
            vertex_buffers: SlotGroup::new(device_info.max_vertex_buffer_slots),
            input_layout: Slot::new(0),
            layout_unresolved: false,
        }
    }

    pub(crate) fn empty() -> Self {
        InputAssemblerStage {
            topology: Slot::new(0),
            index_buffer: Slot::new(0),
            vertex_buffers: SlotGroup::new(0),
            input_layout: Slot::new(0),
            layout_unresolved: false,
        }
    }

    pub fn topology(&self) -> &Slot<MoltenPrimitiveTopology> {
        &self.topology
    }

    pub fn index_buffer(&self) -> &Slot<Option<MoltenIndexBufferBinding>> {
        &self.index_buffer
    }

    pub fn vertex_buffers(&self) -> &SlotGroup<Option<MoltenVertexBufferBinding>> {
        &self.vertex_buffers
    }

    pub fn input_layout(&self) -> &Slot<Option<Arc<MoltenVertexLayout>>> {
        &self.input_layout
    }

    pub fn set_index_buffer(
        &mut self,
        binding: Option<MoltenIndexBufferBinding>,
    ) {
        self.index_buffer.set_pending(binding);
    }

    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        binding: Option<MoltenVertexBufferBinding>,
    ) -> MoltenResult<()> {
        self.vertex_buffers.set_pending(slot, binding)
    }

    /// Reconcile everything a draw with `pass` needs: topology, the pass's shaders (and each
    /// shader stage's resources), the index buffer, the vertex buffers and the input layout.
    ///
    /// The input layout is only looked up again when the vertex shader or the vertex buffers
    /// changed. Returns true if anything was recorded.
    pub(crate) fn bind(
        &mut self,
        pass: &ShaderPass,
        conditions: StateConditions,
        shaders: GraphicsShaderStages,
        layout_cache: &mut VertexLayoutCache,
        command_list: &mut MoltenCommandList,
        validate: bool,
    ) -> Result<bool, BindError> {
        self.topology.set_pending(pass.topology());
        let mut changed = self
            .topology
            .bind(|_, topology| -> Result<(), BindError> {
                command_list.cmd_set_primitive_topology(*topology);
                Ok(())
            })?;

        let vertex_shader = pass
            .shader(MoltenShaderStage::Vertex, conditions)
            .ok_or(BindError::MissingShader(MoltenShaderStage::Vertex))?;
        shaders.vertex.set_shader(Some(vertex_shader.clone()));
        shaders.geometry.set_shader(
            pass.shader(MoltenShaderStage::Geometry, conditions)
                .cloned(),
        );
        shaders
            .pixel
            .set_shader(pass.shader(MoltenShaderStage::Pixel, conditions).cloned());

        let vertex_shader_changed = shaders.vertex.shader().is_dirty();
        changed |= shaders.vertex.bind(command_list, validate)?;
        changed |= shaders.geometry.bind(command_list, validate)?;
        changed |= shaders.pixel.bind(command_list, validate)?;

        changed |= self
            .index_buffer
            .bind(|_, binding| -> Result<(), BindError> {
                if validate {
                    binding.check_live()?;
                }
                command_list.cmd_bind_index_buffer(binding.clone());
                Ok(())
            })?;

        let vertex_buffers_changed = self.vertex_buffers.is_dirty();
        changed |= self
            .vertex_buffers
            .bind_all(|first_slot, bindings| -> Result<(), BindError> {
                if validate {
                    check_all_live(bindings)?;
                }
                command_list.cmd_bind_vertex_buffers(first_slot, bindings);
                Ok(())
            })?;

        if vertex_shader_changed || vertex_buffers_changed || self.layout_unresolved {
            let layout = match vertex_shader.input_signature() {
                Some(signature) if !signature.elements.is_empty() => {
                    let vertex_formats = self
                        .vertex_buffers
                        .slots()
                        .iter()
                        .map(|slot| slot.pending().as_ref().map(|x| &x.format));
                    match layout_cache.get_or_create(vertex_formats, signature) {
                        Ok(layout) => Some(layout),
                        Err(err) => {
                            self.layout_unresolved = true;
                            self.input_layout.set_pending(None);
                            return Err(err);
                        }
                    }
                }
                // Shader generates its own vertices
                _ => None,
            };
            self.layout_unresolved = false;
            self.input_layout.set_pending(layout);
        }

        changed |= self
            .input_layout
            .bind(|_, layout| -> Result<(), BindError> {
                command_list.cmd_bind_input_layout(layout.clone());
                Ok(())
            })?;

        Ok(changed)
    }

    /// Issue pending values as they are, without consulting a pass. Used when restoring state.
    pub(crate) fn bind_pending(
        &mut self,
        command_list: &mut MoltenCommandList,
    ) -> bool {
        let mut changed = self.topology.bind_infallible(|_, topology| {
            command_list.cmd_set_primitive_topology(*topology);
        });
        changed |= self.index_buffer.bind_infallible(|_, binding| {
            command_list.cmd_bind_index_buffer(binding.clone());
        });
        changed |= self
            .vertex_buffers
            .bind_all_infallible(|first_slot, bindings| {
                command_list.cmd_bind_vertex_buffers(first_slot, bindings);
            });
        changed |= self.input_layout.bind_infallible(|_, layout| {
            command_list.cmd_bind_input_layout(layout.clone());
        });
        changed
    }

    pub(crate) fn invalidate_bound(&mut self) {
        self.topology.invalidate_bound();
        self.index_buffer.invalidate_bound();
        self.vertex_buffers.invalidate_bound();
        self.input_layout.invalidate_bound();
    }

    pub(crate) fn reset_pending(&mut self) {
        self.topology.reset_pending();
        self.index_buffer.reset_pending();
        self.vertex_buffers.reset_pending();
        self.input_layout.reset_pending();
    }

    pub(crate) fn request_bound_of(
        &mut self,
        other: &InputAssemblerStage,
    ) {
        self.topology.request_bound_of(&other.topology);
        self.index_buffer.request_bound_of(&other.index_buffer);
        self.vertex_buffers.request_bound_of(&other.vertex_buffers);
        self.input_layout.request_bound_of(&other.input_layout);
        self.layout_unresolved = other.layout_unresolved;
    }

    pub(crate) fn copy_from(
        &mut self,
        other: &InputAssemblerStage,
    ) {
        self.topology.copy_from(&other.topology);
        self.index_buffer.copy_from(&other.index_buffer);
        self.vertex_buffers.copy_from(&other.vertex_buffers);
        self.input_layout.copy_from(&other.input_layout);
        self.layout_unresolved = other.layout_unresolved;
    }

    pub(crate) fn clear(&mut self) {
        self.topology.clear();
        self.index_buffer.clear();
        self.vertex_buffers.clear();
        self.input_layout.clear();
        self.layout_unresolved = false;
    }

    pub(crate) fn bindings_eq(
        &self,
        other: &InputAssemblerStage,
    ) -> bool {
        self.topology.bindings_eq(&other.topology)
            && self.index_buffer.bindings_eq(&other.index_buffer)
            && self.vertex_buffers.bindings_eq(&other.vertex_buffers)
            && self.input_layout.bindings_eq(&other.input_layout)
    }
}

/// Render targets and the depth target
#[derive(Debug, Clone)]
pub struct OutputMergerStage {
    render_targets: SlotGroup<Option<MoltenTexture>>,
    depth_target: Slot<Option<MoltenTexture>>,
}

impl OutputMergerStage {
    pub fn new(device_info: &MoltenDeviceInfo) -> Self {
        OutputMergerStage {
            render_targets: SlotGroup::new(device_info.max_render_targets),
            depth_target: Slot::new(0),
        }
    }

    pub(crate) fn empty() -> Self {
        OutputMergerStage {
            render_targets: SlotGroup::new(0),
            depth_target: Slot::new(0),
        }
    }

    pub fn render_targets(&self) -> &SlotGroup<Option<MoltenTexture>> {
        &self.render_targets
    }

    pub fn depth_target(&self) -> &Slot<Option<MoltenTexture>> {
        &self.depth_target
    }

    pub fn set_render_target(
        &mut self,
        slot: u32,
        target: Option<MoltenTexture>,
    ) -> MoltenResult<()> {
        self.render_targets.set_pending(slot, target)
    }

    pub fn set_depth_target(
        &mut self,
        target: Option<MoltenTexture>,
    ) {
        self.depth_target.set_pending(target);
    }

    pub(crate) fn bind(
        &mut self,
        command_list: &mut MoltenCommandList,
        validate: bool,
    ) -> Result<bool, BindError> {
        if validate {
            for slot in self.render_targets.slots() {
                slot.pending().check_live()?;
            }
            self.depth_target.pending().check_live()?;
        }

        Ok(self.bind_pending(command_list))
    }

    pub(crate) fn bind_pending(
        &mut self,
        command_list: &mut MoltenCommandList,
    ) -> bool {
        let mut changed = self
            .render_targets
            .bind_all_infallible(|first_slot, targets| {
                command_list.cmd_bind_render_targets(first_slot, targets);
            });

        changed |= self.depth_target.bind_infallible(|_, target| {
            command_list.cmd_bind_depth_target(target.clone());
        });

        changed
    }

    pub(crate) fn invalidate_bound(&mut self) {
        self.render_targets.invalidate_bound();
        self.depth_target.invalidate_bound();
    }

    pub(crate) fn reset_pending(&mut self) {
        self.render_targets.reset_pending();
        self.depth_target.reset_pending();
    }

    pub(crate) fn request_bound_of(
        &mut self,
        other: &OutputMergerStage,
    ) {
        self.render_targets.request_bound_of(&other.render_targets);
        self.depth_target.request_bound_of(&other.depth_target);
    }

    pub(crate) fn copy_from(
        &mut self,
        other: &OutputMergerStage,
    ) {
        self.render_targets.copy_from(&other.render_targets);
        self.depth_target.copy_from(&other.depth_target);
    }

    pub(crate) fn clear(&mut self) {
        self.render_targets.clear();
        self.depth_target.clear();
    }

    pub(crate) fn bindings_eq(
        &self,
        other: &OutputMergerStage,
    ) -> bool {
        self.render_targets.bindings_eq(&other.render_targets)
            && self.depth_target.bindings_eq(&other.depth_target)
    }
}
