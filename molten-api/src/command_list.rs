use crate::{
    MoltenBuffer, MoltenConstantBufferBinding, MoltenIndexBufferBinding, MoltenPrimitiveTopology,
    MoltenResource, MoltenSampler, MoltenShader, MoltenShaderStage, MoltenTexture,
    MoltenVertexBufferBinding, MoltenVertexLayout,
};
use std::sync::Arc;

/// A single command recorded into a `MoltenCommandList`. Bind commands carry the complete new
/// value of every slot in the range they cover; `None` unbinds a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MoltenCommand {
    SetPrimitiveTopology(MoltenPrimitiveTopology),
    BindInputLayout(Option<Arc<MoltenVertexLayout>>),
    BindVertexBuffers {
        first_slot: u32,
        bindings: Vec<Option<MoltenVertexBufferBinding>>,
    },
    BindIndexBuffer(Option<MoltenIndexBufferBinding>),
    BindShader {
        stage: MoltenShaderStage,
        shader: Option<MoltenShader>,
    },
    BindConstantBuffers {
        stage: MoltenShaderStage,
        first_slot: u32,
        bindings: Vec<Option<MoltenConstantBufferBinding>>,
    },
    BindTextures {
        stage: MoltenShaderStage,
        first_slot: u32,
        textures: Vec<Option<MoltenTexture>>,
    },
    BindSamplers {
        stage: MoltenShaderStage,
        first_slot: u32,
        samplers: Vec<Option<MoltenSampler>>,
    },
    BindRenderTargets {
        first_slot: u32,
        targets: Vec<Option<MoltenTexture>>,
    },
    BindDepthTarget(Option<MoltenTexture>),
    ClearRenderTarget {
        target: MoltenTexture,
        color: [f32; 4],
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch {
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    },
    CopyResource {
        src: MoltenResource,
        dst: MoltenResource,
    },
    UpdateResource {
        dst: MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: Vec<u8>,
    },
}

impl MoltenCommand {
    /// True for commands that change binding state (as opposed to work or copies)
    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            MoltenCommand::SetPrimitiveTopology(_)
                | MoltenCommand::BindInputLayout(_)
                | MoltenCommand::BindVertexBuffers { .. }
                | MoltenCommand::BindIndexBuffer(_)
                | MoltenCommand::BindShader { .. }
                | MoltenCommand::BindConstantBuffers { .. }
                | MoltenCommand::BindTextures { .. }
                | MoltenCommand::BindSamplers { .. }
                | MoltenCommand::BindRenderTargets { .. }
                | MoltenCommand::BindDepthTarget(_)
        )
    }
}

/// A list of commands recorded by the CPU and submitted to the GPU.
///
/// Commands are plain data. A backend translates them into native API calls when the list is
/// submitted to a `MoltenDevice`, in recorded order.
#[derive(Debug, Clone, Default)]
pub struct MoltenCommandList {
    commands: Vec<MoltenCommand>,
}

impl MoltenCommandList {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn commands(&self) -> &[MoltenCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<MoltenCommand> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn bind_command_count(&self) -> usize {
        self.commands.iter().filter(|x| x.is_bind()).count()
    }

    pub fn push(
        &mut self,
        command: MoltenCommand,
    ) {
        self.commands.push(command);
    }

    pub fn cmd_set_primitive_topology(
        &mut self,
        topology: MoltenPrimitiveTopology,
    ) {
        self.push(MoltenCommand::SetPrimitiveTopology(topology));
    }

    pub fn cmd_bind_input_layout(
        &mut self,
        layout: Option<Arc<MoltenVertexLayout>>,
    ) {
        self.push(MoltenCommand::BindInputLayout(layout));
    }

    pub fn cmd_bind_vertex_buffers(
        &mut self,
        first_slot: u32,
        bindings: &[Option<MoltenVertexBufferBinding>],
    ) {
        self.push(MoltenCommand::BindVertexBuffers {
            first_slot,
            bindings: bindings.to_vec(),
        });
    }

    pub fn cmd_bind_index_buffer(
        &mut self,
        binding: Option<MoltenIndexBufferBinding>,
    ) {
        self.push(MoltenCommand::BindIndexBuffer(binding));
    }

    pub fn cmd_bind_shader(
        &mut self,
        stage: MoltenShaderStage,
        shader: Option<MoltenShader>,
    ) {
        self.push(MoltenCommand::BindShader { stage, shader });
    }

    pub fn cmd_bind_constant_buffers(
        &mut self,
        stage: MoltenShaderStage,
        first_slot: u32,
        bindings: &[Option<MoltenConstantBufferBinding>],
    ) {
        self.push(MoltenCommand::BindConstantBuffers {
            stage,
            first_slot,
            bindings: bindings.to_vec(),
        });
    }

    pub fn cmd_bind_textures(
        &mut self,
        stage: MoltenShaderStage,
        first_slot: u32,
        textures: &[Option<MoltenTexture>],
    ) {
        self.push(MoltenCommand::BindTextures {
            stage,
            first_slot,
            textures: textures.to_vec(),
        });
    }

    pub fn cmd_bind_samplers(
        &mut self,
        stage: MoltenShaderStage,
        first_slot: u32,
        samplers: &[Option<MoltenSampler>],
    ) {
        self.push(MoltenCommand::BindSamplers {
            stage,
            first_slot,
            samplers: samplers.to_vec(),
        });
    }

    pub fn cmd_bind_render_targets(
        &mut self,
        first_slot: u32,
        targets: &[Option<MoltenTexture>],
    ) {
        self.push(MoltenCommand::BindRenderTargets {
            first_slot,
            targets: targets.to_vec(),
        });
    }

    pub fn cmd_bind_depth_target(
        &mut self,
        target: Option<MoltenTexture>,
    ) {
        self.push(MoltenCommand::BindDepthTarget(target));
    }

    pub fn cmd_clear_render_target(
        &mut self,
        target: &MoltenTexture,
        color: [f32; 4],
    ) {
        self.push(MoltenCommand::ClearRenderTarget {
            target: target.clone(),
            color,
        });
    }

    pub fn cmd_draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.push(MoltenCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    pub fn cmd_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.push(MoltenCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    pub fn cmd_dispatch(
        &mut self,
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    ) {
        self.push(MoltenCommand::Dispatch {
            group_count_x,
            group_count_y,
            group_count_z,
        });
    }

    pub fn cmd_copy_resource(
        &mut self,
        src: MoltenResource,
        dst: MoltenResource,
    ) {
        self.push(MoltenCommand::CopyResource { src, dst });
    }

    pub fn cmd_update_resource(
        &mut self,
        dst: MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: Vec<u8>,
    ) {
        self.push(MoltenCommand::UpdateResource {
            dst,
            subresource,
            byte_offset,
            data,
        });
    }

    pub fn cmd_update_buffer(
        &mut self,
        dst: &MoltenBuffer,
        byte_offset: u64,
        data: Vec<u8>,
    ) {
        self.cmd_update_resource(MoltenResource::Buffer(dst.clone()), 0, byte_offset, data);
    }
}
