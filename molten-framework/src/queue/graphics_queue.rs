use super::{GraphicsQueueProfiler, ResourceStream};
use crate::state::{BindError, GraphicsBindResult, GraphicsState, VertexLayoutCache};
use crate::{ShaderPass, StateConditions};
use molten_api::{
    MoltenCommandList, MoltenConstantBufferBinding, MoltenDevice, MoltenError,
    MoltenIndexBufferBinding, MoltenMapType, MoltenPrimitiveTopology, MoltenResource,
    MoltenResult, MoltenSampler, MoltenShaderStage, MoltenTexture, MoltenVertexBufferBinding,
};
use molten_base::FreeList;
use std::sync::Arc;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    #[derive(Default)]
    pub struct GraphicsQueueBeginFlags: u32 {
        /// Pending bindings go back to their defaults instead of carrying over from the previous
        /// recording session
        const RESET_STATE = 1 << 0;
    }
}

bitflags::bitflags! {
    #[derive(Default)]
    pub struct GraphicsQueueSubmitFlags: u32 {
        /// Last submission of the frame. The queue stops recording after submitting.
        const END_OF_FRAME = 1 << 0;
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct GraphicsQueueConfig {
    /// push_state fails once this many entries are on the stack
    pub max_state_stack_depth: usize,
    /// Number of state snapshots allocated up front
    pub initial_snapshot_pool_size: usize,
    /// Refuse to bind resources that have been disposed. The draw is skipped with
    /// `GraphicsBindResult::BindFailed` instead.
    pub validate_bindings: bool,
}

impl Default for GraphicsQueueConfig {
    fn default() -> Self {
        GraphicsQueueConfig {
            max_state_stack_depth: 64,
            initial_snapshot_pool_size: 4,
            validate_bindings: true,
        }
    }
}

/// Records draws, dispatches and copies into a command list while tracking every binding in the
/// pipeline, so that only state that actually changed is recorded.
///
/// A queue is either idle or recording. `begin` starts recording, `submit` hands the recorded
/// commands to the device (and keeps recording into a fresh list unless it was the last
/// submission of the frame) and `end` stops recording and returns the list instead.
///
/// Setting state (`set_vertex_buffer`, `set_texture`, ...) only changes pending values. They are
/// reconciled with what is bound when a draw or dispatch is recorded.
pub struct GraphicsQueue {
    device: Arc<dyn MoltenDevice>,
    config: GraphicsQueueConfig,
    state: GraphicsState,
    state_stack: Vec<GraphicsState>,
    snapshot_pool: FreeList<GraphicsState>,
    layout_cache: VertexLayoutCache,
    command_list: Option<MoltenCommandList>,
    profiler: GraphicsQueueProfiler,
}

impl GraphicsQueue {
    pub fn new(
        device: Arc<dyn MoltenDevice>,
        config: GraphicsQueueConfig,
    ) -> Self {
        let state = GraphicsState::new(device.device_info());
        let snapshot_pool = FreeList::with_capacity(
            config.initial_snapshot_pool_size,
            GraphicsState::empty,
            GraphicsState::clear,
        );

        GraphicsQueue {
            device,
            config,
            state,
            state_stack: Default::default(),
            snapshot_pool,
            layout_cache: Default::default(),
            command_list: None,
            profiler: Default::default(),
        }
    }

    pub fn device(&self) -> &Arc<dyn MoltenDevice> {
        &self.device
    }

    pub fn config(&self) -> &GraphicsQueueConfig {
        &self.config
    }

    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    pub fn layout_cache(&self) -> &VertexLayoutCache {
        &self.layout_cache
    }

    pub fn profiler(&self) -> &GraphicsQueueProfiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut GraphicsQueueProfiler {
        &mut self.profiler
    }

    pub fn is_recording(&self) -> bool {
        self.command_list.is_some()
    }

    pub fn state_stack_depth(&self) -> usize {
        self.state_stack.len()
    }

    /// The list being recorded, if any
    pub fn command_list(&self) -> Option<&MoltenCommandList> {
        self.command_list.as_ref()
    }

    /// The list being recorded. Fails if the queue is idle.
    pub fn command_list_mut(&mut self) -> MoltenResult<&mut MoltenCommandList> {
        Self::recording_list(&mut self.command_list, "command_list_mut")
    }

    fn recording_list<'a>(
        command_list: &'a mut Option<MoltenCommandList>,
        operation: &str,
    ) -> MoltenResult<&'a mut MoltenCommandList> {
        command_list.as_mut().ok_or_else(|| {
            MoltenError::invalid_operation(format!(
                "{} requires the queue to be recording",
                operation
            ))
        })
    }

    //
    // Recording lifecycle
    //
    pub fn begin(
        &mut self,
        flags: GraphicsQueueBeginFlags,
    ) -> MoltenResult<()> {
        if self.command_list.is_some() {
            return Err(MoltenError::invalid_operation(
                "begin called while the queue is already recording",
            ));
        }

        if flags.contains(GraphicsQueueBeginFlags::RESET_STATE) {
            self.state.reset_pending();
        }

        // Nothing is bound on a new command list
        self.state.invalidate_bound();
        let draw_info = self.state.draw_info_mut();
        draw_info.draw_began = false;
        draw_info.reset_draw_values();
        self.command_list = Some(MoltenCommandList::new());
        log::trace!("GraphicsQueue began recording");
        Ok(())
    }

    /// Stop recording and return the recorded commands without submitting them
    pub fn end(&mut self) -> MoltenResult<MoltenCommandList> {
        let command_list = self.command_list.take().ok_or_else(|| {
            MoltenError::invalid_operation("end called while the queue is not recording")
        })?;

        if !self.state_stack.is_empty() {
            log::warn!(
                "GraphicsQueue stopped recording with {} entries on the state stack",
                self.state_stack.len()
            );
        }

        self.state.draw_info_mut().reset_draw_values();
        Ok(command_list)
    }

    /// Hand the recorded commands to the device. Unless `END_OF_FRAME` is set, recording continues
    /// into a new command list (with nothing bound on it).
    pub fn submit(
        &mut self,
        flags: GraphicsQueueSubmitFlags,
    ) -> MoltenResult<()> {
        profiling::scope!("GraphicsQueue::submit");
        let command_list = self.command_list.take().ok_or_else(|| {
            MoltenError::invalid_operation("submit called while the queue is not recording")
        })?;

        log::trace!(
            "GraphicsQueue submitting {} commands ({} binds)",
            command_list.len(),
            command_list.bind_command_count()
        );

        let result = self.device.submit(command_list);
        if result.is_ok() {
            self.profiler.command_lists_submitted += 1;
        }

        if !flags.contains(GraphicsQueueSubmitFlags::END_OF_FRAME) {
            self.state.invalidate_bound();
            self.command_list = Some(MoltenCommandList::new());
        }

        result
    }

    //
    // State stack
    //
    /// Save a complete copy of the current state. Nothing observable changes.
    pub fn push_state(&mut self) -> MoltenResult<()> {
        if self.state_stack.len() >= self.config.max_state_stack_depth {
            return Err(MoltenError::invalid_operation(format!(
                "push_state exceeded the maximum state stack depth of {}",
                self.config.max_state_stack_depth
            )));
        }

        let mut snapshot = self.snapshot_pool.acquire();
        snapshot.copy_from(&self.state);
        self.state_stack.push(snapshot);
        self.profiler.state_pushes += 1;
        Ok(())
    }

    /// Restore the most recently pushed state. While recording, commands are recorded so that the
    /// bindings on the command list match the restored state.
    pub fn pop_state(&mut self) -> MoltenResult<()> {
        let snapshot = self.state_stack.pop().ok_or_else(|| {
            MoltenError::invalid_operation("pop_state called with an empty state stack")
        })?;

        let commands_before = self.command_list.as_ref().map_or(0, |x| x.len());
        self.state
            .restore_from(&snapshot, self.command_list.as_mut());
        let commands_after = self.command_list.as_ref().map_or(0, |x| x.len());
        self.profiler.bind_commands += (commands_after - commands_before) as u64;

        self.snapshot_pool.release(snapshot);
        Ok(())
    }

    /// Pop until the stack holds `depth` entries
    pub fn pop_state_to(
        &mut self,
        depth: usize,
    ) -> MoltenResult<()> {
        while self.state_stack.len() > depth {
            self.pop_state()?;
        }
        Ok(())
    }

    /// Reset every pending binding and the draw info to defaults. Bound state is left alone, the
    /// next draw unbinds whatever is no longer wanted.
    pub fn reset_state(&mut self) {
        self.state.reset_pending();
    }

    //
    // Pending state
    //
    pub fn set_vertex_buffer(
        &mut self,
        slot: u32,
        binding: Option<MoltenVertexBufferBinding>,
    ) -> MoltenResult<()> {
        self.state
            .input_assembler_mut()
            .set_vertex_buffer(slot, binding)
    }

    pub fn set_vertex_buffers(
        &mut self,
        first_slot: u32,
        bindings: &[Option<MoltenVertexBufferBinding>],
    ) -> MoltenResult<()> {
        for (i, binding) in bindings.iter().enumerate() {
            self.set_vertex_buffer(first_slot + i as u32, binding.clone())?;
        }
        Ok(())
    }

    pub fn set_index_buffer(
        &mut self,
        binding: Option<MoltenIndexBufferBinding>,
    ) {
        self.state.input_assembler_mut().set_index_buffer(binding);
    }

    pub fn set_constant_buffer(
        &mut self,
        stage: MoltenShaderStage,
        slot: u32,
        binding: Option<MoltenConstantBufferBinding>,
    ) -> MoltenResult<()> {
        self.state
            .shader_stage_mut(stage)
            .set_constant_buffer(slot, binding)
    }

    pub fn set_texture(
        &mut self,
        stage: MoltenShaderStage,
        slot: u32,
        texture: Option<MoltenTexture>,
    ) -> MoltenResult<()> {
        self.state.shader_stage_mut(stage).set_texture(slot, texture)
    }

    pub fn set_sampler(
        &mut self,
        stage: MoltenShaderStage,
        slot: u32,
        sampler: Option<MoltenSampler>,
    ) -> MoltenResult<()> {
        self.state.shader_stage_mut(stage).set_sampler(slot, sampler)
    }

    pub fn set_render_target(
        &mut self,
        slot: u32,
        target: Option<MoltenTexture>,
    ) -> MoltenResult<()> {
        self.state
            .output_merger_mut()
            .set_render_target(slot, target)
    }

    pub fn set_depth_target(
        &mut self,
        target: Option<MoltenTexture>,
    ) {
        self.state.output_merger_mut().set_depth_target(target);
    }

    pub fn set_custom_values(
        &mut self,
        custom_values: [f32; 4],
    ) {
        self.state.draw_info_mut().custom_values = custom_values;
    }

    pub fn custom_values(&self) -> [f32; 4] {
        self.state.draw_info().custom_values
    }

    /// When set, every dispatch uses these group counts instead of its arguments
    pub fn set_compute_group_override(
        &mut self,
        group_counts: Option<[u32; 3]>,
    ) {
        self.state.draw_info_mut().compute_group_override = group_counts;
    }

    pub fn set_conditions(
        &mut self,
        conditions: StateConditions,
    ) {
        self.state.draw_info_mut().conditions = conditions;
    }

    pub fn conditions(&self) -> StateConditions {
        self.state.draw_info().conditions
    }

    //
    // Draws and dispatches
    //
    fn bind_result(
        profiler: &mut GraphicsQueueProfiler,
        pass: &ShaderPass,
        result: Result<bool, BindError>,
    ) -> GraphicsBindResult {
        match result {
            Ok(_) => GraphicsBindResult::Successful,
            Err(error) => {
                log::debug!("Skipped work with pass {}: {}", pass.name(), error);
                profiler.skipped_draws += 1;
                GraphicsBindResult::from(&error)
            }
        }
    }

    fn bind_graphics_state(
        &mut self,
        pass: &ShaderPass,
    ) -> MoltenResult<GraphicsBindResult> {
        let command_list = Self::recording_list(&mut self.command_list, "draw")?;
        let commands_before = command_list.len();
        let result = self.state.bind_graphics(
            pass,
            &mut self.layout_cache,
            command_list,
            self.config.validate_bindings,
        );
        self.profiler.bind_commands += (command_list.len() - commands_before) as u64;
        Ok(Self::bind_result(&mut self.profiler, pass, result))
    }

    fn record_draw_stats(
        &mut self,
        topology: MoltenPrimitiveTopology,
        element_count: u32,
        instance_count: u32,
    ) {
        self.profiler.draw_calls += 1;
        self.profiler.primitives +=
            topology.primitive_count(element_count) as u64 * instance_count as u64;
        self.state.draw_info_mut().draw_began = true;
    }

    pub fn draw(
        &mut self,
        pass: &ShaderPass,
        vertex_count: u32,
        first_vertex: u32,
    ) -> MoltenResult<GraphicsBindResult> {
        self.draw_instanced(pass, vertex_count, 1, first_vertex, 0)
    }

    /// Reconcile state for `pass` and record a draw. A draw with no vertices or no instances
    /// records nothing and reports success.
    #[profiling::function]
    pub fn draw_instanced(
        &mut self,
        pass: &ShaderPass,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> MoltenResult<GraphicsBindResult> {
        Self::recording_list(&mut self.command_list, "draw")?;
        if vertex_count == 0 || instance_count == 0 {
            return Ok(GraphicsBindResult::Successful);
        }

        let bind_result = self.bind_graphics_state(pass)?;
        if bind_result.is_successful() {
            Self::recording_list(&mut self.command_list, "draw")?.cmd_draw(
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
            self.record_draw_stats(pass.topology(), vertex_count, instance_count);
        }

        Ok(bind_result)
    }

    pub fn draw_indexed(
        &mut self,
        pass: &ShaderPass,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> MoltenResult<GraphicsBindResult> {
        self.draw_indexed_instanced(pass, index_count, 1, first_index, vertex_offset, 0)
    }

    /// Like `draw_instanced`, reading vertices through the bound index buffer. Fails with
    /// `BindFailed` if no index buffer is set.
    #[profiling::function]
    pub fn draw_indexed_instanced(
        &mut self,
        pass: &ShaderPass,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> MoltenResult<GraphicsBindResult> {
        Self::recording_list(&mut self.command_list, "draw_indexed")?;
        if index_count == 0 || instance_count == 0 {
            return Ok(GraphicsBindResult::Successful);
        }

        if self.state.input_assembler().index_buffer().pending().is_none() {
            log::debug!(
                "Skipped indexed draw with pass {}: no index buffer",
                pass.name()
            );
            self.profiler.skipped_draws += 1;
            return Ok(GraphicsBindResult::BindFailed);
        }

        let bind_result = self.bind_graphics_state(pass)?;
        if bind_result.is_successful() {
            Self::recording_list(&mut self.command_list, "draw_indexed")?.cmd_draw_indexed(
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
            self.record_draw_stats(pass.topology(), index_count, instance_count);
        }

        Ok(bind_result)
    }

    /// Reconcile the compute stage for `pass` and record a dispatch. The compute group override,
    /// if set, replaces the group counts. A dispatch with a zero group count records nothing.
    #[profiling::function]
    pub fn dispatch(
        &mut self,
        pass: &ShaderPass,
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    ) -> MoltenResult<GraphicsBindResult> {
        let command_list = Self::recording_list(&mut self.command_list, "dispatch")?;
        let [x, y, z] = self
            .state
            .draw_info()
            .compute_group_override
            .unwrap_or([group_count_x, group_count_y, group_count_z]);

        if x == 0 || y == 0 || z == 0 {
            return Ok(GraphicsBindResult::Successful);
        }

        let commands_before = command_list.len();
        let result = self
            .state
            .bind_compute(pass, command_list, self.config.validate_bindings);
        self.profiler.bind_commands += (command_list.len() - commands_before) as u64;

        let bind_result = Self::bind_result(&mut self.profiler, pass, result);
        if bind_result.is_successful() {
            command_list.cmd_dispatch(x, y, z);
            self.profiler.dispatch_calls += 1;
            self.state.draw_info_mut().draw_began = true;
        }

        Ok(bind_result)
    }

    pub fn clear_render_target(
        &mut self,
        target: &MoltenTexture,
        color: [f32; 4],
    ) -> MoltenResult<()> {
        let command_list = Self::recording_list(&mut self.command_list, "clear_render_target")?;
        if target.is_disposed() {
            return Err(MoltenError::ResourceDisposed(target.id()));
        }

        command_list.cmd_clear_render_target(target, color);
        Ok(())
    }

    //
    // Resource access
    //
    /// Record a full copy of `src` into `dst`
    pub fn copy_resource(
        &mut self,
        src: &MoltenResource,
        dst: &MoltenResource,
    ) -> MoltenResult<()> {
        let command_list = Self::recording_list(&mut self.command_list, "copy_resource")?;
        for resource in [src, dst] {
            if resource.is_disposed() {
                return Err(MoltenError::ResourceDisposed(resource.id()));
            }
        }

        command_list.cmd_copy_resource(src.clone(), dst.clone());
        dst.mark_modified();
        Ok(())
    }

    /// Record a write of `data` into a subresource of `dst` at `byte_offset`
    pub fn update_resource(
        &mut self,
        dst: &MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: &[u8],
    ) -> MoltenResult<()> {
        let command_list = Self::recording_list(&mut self.command_list, "update_resource")?;
        if dst.is_disposed() {
            return Err(MoltenError::ResourceDisposed(dst.id()));
        }

        let size = dst.subresource_byte_size(subresource).ok_or_else(|| {
            MoltenError::invalid_operation(format!(
                "resource {:?} has no subresource {}",
                dst.id(),
                subresource
            ))
        })?;

        let fits = byte_offset
            .checked_add(data.len() as u64)
            .map_or(false, |end| end <= size);
        if !fits {
            return Err(MoltenError::invalid_operation(format!(
                "update of {} bytes at offset {} exceeds subresource size {}",
                data.len(),
                byte_offset,
                size
            )));
        }

        command_list.cmd_update_resource(dst.clone(), subresource, byte_offset, data.to_vec());
        dst.mark_modified();
        Ok(())
    }

    /// Map a subresource for CPU access. The returned stream is positioned at `offset_bytes`.
    ///
    /// A resource can only be mapped once at a time. Mapping it again before `unmap_resource`
    /// fails and changes nothing.
    pub fn map_resource(
        &mut self,
        resource: &MoltenResource,
        subresource: u32,
        offset_bytes: u64,
        map_type: MoltenMapType,
    ) -> MoltenResult<ResourceStream> {
        profiling::scope!("GraphicsQueue::map_resource");
        if resource.is_disposed() {
            return Err(MoltenError::ResourceDisposed(resource.id()));
        }

        let size = resource
            .subresource_byte_size(subresource)
            .ok_or_else(|| {
                MoltenError::invalid_operation(format!(
                    "resource {:?} has no subresource {}",
                    resource.id(),
                    subresource
                ))
            })?;

        if offset_bytes > size {
            return Err(MoltenError::invalid_operation(format!(
                "map offset {} is past the end of a {} byte subresource",
                offset_bytes, size
            )));
        }

        // The mapping belongs to the resource, not the queue, so two queues can't both map it
        if !resource.try_begin_map() {
            return Err(MoltenError::invalid_operation(format!(
                "resource {:?} is already mapped",
                resource.id()
            )));
        }

        let data = if map_type.reads_existing_contents() {
            match self.device.read_resource(resource, subresource) {
                Ok(data) => data,
                Err(e) => {
                    resource.end_map();
                    return Err(e);
                }
            }
        } else {
            vec![0; size as usize]
        };

        Ok(ResourceStream::new(
            resource.clone(),
            subresource,
            map_type,
            data,
            offset_bytes,
        ))
    }

    /// Release a mapping. Unless it was mapped for reading only, the stream's contents are written
    /// to the device and the resource's version is bumped.
    pub fn unmap_resource(
        &mut self,
        stream: ResourceStream,
    ) -> MoltenResult<()> {
        profiling::scope!("GraphicsQueue::unmap_resource");
        let (resource, subresource, map_type, data) = stream.finish();
        if !resource.end_map() {
            return Err(MoltenError::invalid_operation(format!(
                "resource {:?} is not mapped",
                resource.id()
            )));
        }

        if map_type.writes_back() {
            self.device
                .write_resource(&resource, subresource, 0, &data)?;
            resource.mark_modified();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molten_api::{
        MoltenBufferDef, MoltenCommand, MoltenDeviceNull, MoltenFormat, MoltenResourceType,
        MoltenShader, MoltenShaderDef, MoltenShaderInputSignature, MoltenTextureDef,
        MoltenVertexFormat,
    };
    use std::io::{Read, Write};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn create_queue() -> (Arc<MoltenDeviceNull>, GraphicsQueue) {
        init_logging();
        let device = Arc::new(MoltenDeviceNull::default());
        let queue = GraphicsQueue::new(device.clone(), Default::default());
        (device, queue)
    }

    fn position_format() -> Arc<MoltenVertexFormat> {
        Arc::new(MoltenVertexFormat::packed(vec![(
            "POSITION",
            MoltenFormat::R32G32B32_SFLOAT,
        )]))
    }

    fn mesh_pass(device: &MoltenDeviceNull) -> ShaderPass {
        let vertex = device
            .create_shader(&MoltenShaderDef {
                stage: MoltenShaderStage::Vertex,
                entry_point: "vs_main".to_string(),
                input_signature: Some(
                    MoltenShaderInputSignature::default()
                        .with_element("POSITION", MoltenFormat::R32G32B32_SFLOAT),
                ),
            })
            .unwrap();
        let pixel = device
            .create_shader(&MoltenShaderDef {
                stage: MoltenShaderStage::Pixel,
                entry_point: "ps_main".to_string(),
                input_signature: None,
            })
            .unwrap();

        ShaderPass::new("mesh")
            .with_shader(vertex)
            .with_shader(pixel)
    }

    fn compute_pass(device: &MoltenDeviceNull) -> ShaderPass {
        let compute: MoltenShader = device
            .create_shader(&MoltenShaderDef {
                stage: MoltenShaderStage::Compute,
                entry_point: "cs_main".to_string(),
                input_signature: None,
            })
            .unwrap();
        ShaderPass::new("compute").with_shader(compute)
    }

    fn vertex_binding(
        device: &MoltenDeviceNull,
        format: Arc<MoltenVertexFormat>,
    ) -> MoltenVertexBufferBinding {
        MoltenVertexBufferBinding {
            buffer: device
                .create_buffer(&MoltenBufferDef::for_vertex_data(256))
                .unwrap(),
            byte_offset: 0,
            format,
        }
    }

    fn texture(device: &MoltenDeviceNull) -> MoltenTexture {
        device
            .create_texture(&MoltenTextureDef::new_2d(
                4,
                4,
                MoltenFormat::R8G8B8A8_UNORM,
                MoltenResourceType::TEXTURE | MoltenResourceType::RENDER_TARGET,
            ))
            .unwrap()
    }

    fn commands_since(
        queue: &GraphicsQueue,
        start: usize,
    ) -> Vec<MoltenCommand> {
        queue.command_list().unwrap().commands()[start..].to_vec()
    }

    #[test]
    fn test_redundant_state_is_not_rebound() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let format = position_format();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, format)))
            .unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 0, Some(texture(&device)))
            .unwrap();

        assert_eq!(
            queue.draw(&pass, 3, 0).unwrap(),
            GraphicsBindResult::Successful
        );
        let binds_after_first = queue.profiler().bind_commands;
        assert!(binds_after_first > 0);

        let start = queue.command_list().unwrap().len();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());

        // Only the draw itself is recorded the second time
        let recorded = commands_since(&queue, start);
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], MoltenCommand::Draw { .. }));
        assert_eq!(queue.profiler().bind_commands, binds_after_first);
        assert_eq!(queue.profiler().draw_calls, 2);
        assert_eq!(queue.profiler().primitives, 2);
    }

    #[test]
    fn test_vertex_buffer_changes_bind_minimal_range() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let format = position_format();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        let a = vertex_binding(&device, format.clone());
        let b = vertex_binding(&device, format);
        queue.set_vertex_buffer(2, Some(a.clone())).unwrap();
        queue.set_vertex_buffer(5, Some(b.clone())).unwrap();

        let start = queue.command_list().unwrap().len();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());

        let vertex_buffers = queue.state().input_assembler().vertex_buffers();
        assert_eq!(vertex_buffers.first_changed(), Some(2));
        assert_eq!(vertex_buffers.last_changed(), Some(5));

        let recorded = commands_since(&queue, start);
        let bind = recorded
            .iter()
            .find_map(|x| match x {
                MoltenCommand::BindVertexBuffers {
                    first_slot,
                    bindings,
                } => Some((*first_slot, bindings.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(bind.0, 2);
        assert_eq!(bind.1, vec![Some(a), None, None, Some(b)]);
    }

    #[test]
    fn test_pop_restores_pushed_state() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let format = position_format();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, format.clone())))
            .unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 1, Some(texture(&device)))
            .unwrap();
        queue.set_custom_values([1.0, 2.0, 3.0, 4.0]);
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());

        let before = queue.state().clone();
        queue.push_state().unwrap();
        assert!(queue.state().bindings_eq(&before));

        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, format)))
            .unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 1, None)
            .unwrap();
        queue
            .set_render_target(0, Some(texture(&device)))
            .unwrap();
        queue.set_custom_values([0.0; 4]);
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert!(!queue.state().bindings_eq(&before));

        queue.pop_state().unwrap();
        assert!(queue.state().bindings_eq(&before));
        assert_eq!(queue.custom_values(), [1.0, 2.0, 3.0, 4.0]);

        // The command list already matches the restored state
        let start = queue.command_list().unwrap().len();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert_eq!(commands_since(&queue, start).len(), 1);
    }

    #[test]
    fn test_nested_push_pop_across_submit() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let format = position_format();
        let first = texture(&device);
        let second = texture(&device);

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, format.clone())))
            .unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 0, Some(first.clone()))
            .unwrap();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        let outer = queue.state().clone();

        queue.push_state().unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 0, Some(second.clone()))
            .unwrap();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());

        // Everything from here on records into a new command list with nothing bound
        queue.submit(GraphicsQueueSubmitFlags::empty()).unwrap();
        let middle = queue.state().clone();

        queue.push_state().unwrap();
        queue
            .set_texture(MoltenShaderStage::Pixel, 0, None)
            .unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, format)))
            .unwrap();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert!(!queue.state().bindings_eq(&middle));
        assert_eq!(queue.state_stack_depth(), 2);

        queue.pop_state().unwrap();
        assert_eq!(queue.state_stack_depth(), 1);
        assert!(queue.state().bindings_eq(&middle));

        // Nothing of the middle level had been bound on this list yet, so the draw binds it
        let start = queue.command_list().unwrap().len();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        let recorded = commands_since(&queue, start);
        assert!(recorded.iter().any(|x| matches!(
            x,
            MoltenCommand::BindTextures { stage: MoltenShaderStage::Pixel, textures, .. }
                if textures.first() == Some(&Some(second.clone()))
        )));

        queue.pop_state().unwrap();
        assert_eq!(queue.state_stack_depth(), 0);
        assert!(queue.state().bindings_eq(&outer));

        // Restoring recorded the outer bindings, the next draw only draws
        let start = queue.command_list().unwrap().len();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert_eq!(commands_since(&queue, start).len(), 1);
        assert_eq!(
            queue.state().shader_stage(MoltenShaderStage::Pixel).textures().slots()[0].bound(),
            &Some(first)
        );
    }

    #[test]
    fn test_pop_while_idle_restores_directly() {
        let (device, mut queue) = create_queue();
        queue
            .set_texture(MoltenShaderStage::Vertex, 0, Some(texture(&device)))
            .unwrap();
        let before = queue.state().clone();

        queue.push_state().unwrap();
        queue.reset_state();
        assert!(!queue.state().bindings_eq(&before));

        queue.pop_state().unwrap();
        assert!(queue.state().bindings_eq(&before));
        assert!(!queue.is_recording());
    }

    #[test]
    fn test_state_stack_usage_errors() {
        let (_device, mut queue) = create_queue();
        assert!(queue.pop_state().unwrap_err().is_invalid_operation());

        let max_depth = queue.config().max_state_stack_depth;
        for _ in 0..max_depth {
            queue.push_state().unwrap();
        }
        assert!(queue.push_state().unwrap_err().is_invalid_operation());
        assert_eq!(queue.state_stack_depth(), max_depth);

        queue.pop_state_to(1).unwrap();
        assert_eq!(queue.state_stack_depth(), 1);
    }

    #[test]
    fn test_recording_lifecycle() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);

        // Nothing can be recorded while idle
        assert!(queue.draw(&pass, 3, 0).unwrap_err().is_invalid_operation());
        assert!(queue
            .submit(GraphicsQueueSubmitFlags::empty())
            .unwrap_err()
            .is_invalid_operation());
        assert!(queue.end().unwrap_err().is_invalid_operation());

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert!(queue
            .begin(GraphicsQueueBeginFlags::empty())
            .unwrap_err()
            .is_invalid_operation());

        let command_list = queue.end().unwrap();
        assert!(command_list.is_empty());
        assert!(!queue.is_recording());
    }

    #[test]
    fn test_submit_segments() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, position_format())))
            .unwrap();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        queue.submit(GraphicsQueueSubmitFlags::empty()).unwrap();
        assert!(queue.is_recording());

        // The new list has nothing bound, so state is issued again
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert!(queue.command_list().unwrap().bind_command_count() > 0);

        queue
            .submit(GraphicsQueueSubmitFlags::END_OF_FRAME)
            .unwrap();
        assert!(!queue.is_recording());
        assert_eq!(device.submit_count(), 2);
        assert_eq!(queue.profiler().command_lists_submitted, 2);

        let submitted = device.take_submitted();
        assert_eq!(
            submitted[0].bind_command_count(),
            submitted[1].bind_command_count()
        );
    }

    #[test]
    fn test_begin_reset_state_flag() {
        let (device, mut queue) = create_queue();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, position_format())))
            .unwrap();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue.end().unwrap();
        assert!(queue
            .state()
            .input_assembler()
            .vertex_buffers()
            .slot(0)
            .unwrap()
            .pending()
            .is_some());

        queue.begin(GraphicsQueueBeginFlags::RESET_STATE).unwrap();
        assert!(queue
            .state()
            .input_assembler()
            .vertex_buffers()
            .slot(0)
            .unwrap()
            .pending()
            .is_none());
    }

    #[test]
    fn test_missing_shader_skips_draw() {
        let (device, mut queue) = create_queue();
        let pixel_only = ShaderPass::new("pixel_only").with_shader(
            device
                .create_shader(&MoltenShaderDef {
                    stage: MoltenShaderStage::Pixel,
                    entry_point: "ps_main".to_string(),
                    input_signature: None,
                })
                .unwrap(),
        );

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert_eq!(
            queue.draw(&pixel_only, 3, 0).unwrap(),
            GraphicsBindResult::MissingShader(MoltenShaderStage::Vertex)
        );
        assert_eq!(
            queue.dispatch(&pixel_only, 1, 1, 1).unwrap(),
            GraphicsBindResult::MissingShader(MoltenShaderStage::Compute)
        );

        let command_list = queue.end().unwrap();
        assert!(!command_list
            .commands()
            .iter()
            .any(|x| matches!(x, MoltenCommand::Draw { .. } | MoltenCommand::Dispatch { .. })));
    }

    #[test]
    fn test_unsatisfied_vertex_layout_skips_draw() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let uv_only = Arc::new(MoltenVertexFormat::packed(vec![(
            "TEXCOORD",
            MoltenFormat::R32G32_SFLOAT,
        )]));

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, uv_only)))
            .unwrap();
        assert_eq!(
            queue.draw(&pass, 3, 0).unwrap(),
            GraphicsBindResult::InvalidVertexLayout
        );
        assert_eq!(queue.profiler().skipped_draws, 1);
        assert_eq!(queue.profiler().draw_calls, 0);

        // Nothing changed, but the layout still can't be resolved
        assert_eq!(
            queue.draw(&pass, 3, 0).unwrap(),
            GraphicsBindResult::InvalidVertexLayout
        );
        assert_eq!(queue.profiler().skipped_draws, 2);
        assert_eq!(queue.profiler().draw_calls, 0);

        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, position_format())))
            .unwrap();
        assert!(queue.draw(&pass, 3, 0).unwrap().is_successful());
        assert_eq!(queue.profiler().draw_calls, 1);

        let command_list = queue.end().unwrap();
        assert!(command_list
            .commands()
            .iter()
            .any(|x| matches!(x, MoltenCommand::BindInputLayout(Some(_)))));
    }

    #[test]
    fn test_disposed_resources_fail_to_bind() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let binding = vertex_binding(&device, position_format());

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue.set_vertex_buffer(0, Some(binding.clone())).unwrap();
        binding.buffer.dispose();

        assert_eq!(
            queue.draw(&pass, 3, 0).unwrap(),
            GraphicsBindResult::BindFailed
        );

        queue.set_vertex_buffer(0, None).unwrap();
        let target = texture(&device);
        queue.set_render_target(0, Some(target.clone())).unwrap();
        target.dispose();
        assert_eq!(
            queue.draw(&pass, 3, 0).unwrap(),
            GraphicsBindResult::BindFailed
        );
    }

    #[test]
    fn test_zero_sized_work_is_a_no_op() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        let compute = compute_pass(&device);

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert!(queue.draw(&pass, 0, 0).unwrap().is_successful());
        assert!(queue
            .draw_instanced(&pass, 3, 0, 0, 0)
            .unwrap()
            .is_successful());
        assert!(queue
            .dispatch(&compute, 0, 1, 1)
            .unwrap()
            .is_successful());
        assert!(queue.command_list().unwrap().is_empty());
        assert_eq!(queue.profiler().draw_calls, 0);
    }

    #[test]
    fn test_indexed_draw_requires_index_buffer() {
        let (device, mut queue) = create_queue();
        let pass = mesh_pass(&device);
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, position_format())))
            .unwrap();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert_eq!(
            queue.draw_indexed(&pass, 6, 0, 0).unwrap(),
            GraphicsBindResult::BindFailed
        );

        queue.set_index_buffer(Some(MoltenIndexBufferBinding {
            buffer: device
                .create_buffer(&MoltenBufferDef::for_index_data(24))
                .unwrap(),
            byte_offset: 0,
            index_type: Default::default(),
        }));
        assert!(queue
            .draw_indexed(&pass, 6, 0, 0)
            .unwrap()
            .is_successful());
        assert_eq!(queue.profiler().primitives, 2);
    }

    #[test]
    fn test_dispatch_group_override() {
        let (device, mut queue) = create_queue();
        let compute = compute_pass(&device);

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue.set_compute_group_override(Some([4, 2, 1]));
        assert!(queue
            .dispatch(&compute, 1, 1, 1)
            .unwrap()
            .is_successful());

        let command_list = queue.end().unwrap();
        assert_eq!(
            command_list.commands().last(),
            Some(&MoltenCommand::Dispatch {
                group_count_x: 4,
                group_count_y: 2,
                group_count_z: 1,
            })
        );
        assert_eq!(queue.profiler().dispatch_calls, 1);
    }

    #[test]
    fn test_draw_values_reset_by_begin_and_end() {
        let (_device, mut queue) = create_queue();

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue.set_custom_values([1.0, 2.0, 3.0, 4.0]);
        queue.set_compute_group_override(Some([8, 8, 1]));
        queue.end().unwrap();
        assert_eq!(queue.custom_values(), [0.0; 4]);

        // Values set between recordings do not leak into the next one
        queue.set_custom_values([5.0; 4]);
        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        assert_eq!(queue.custom_values(), [0.0; 4]);
        queue.end().unwrap();
    }

    #[test]
    fn test_layout_cache_shared_across_passes() {
        let (device, mut queue) = create_queue();
        let pass_a = mesh_pass(&device);
        let pass_b = mesh_pass(&device);

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue
            .set_vertex_buffer(0, Some(vertex_binding(&device, position_format())))
            .unwrap();
        assert!(queue.draw(&pass_a, 3, 0).unwrap().is_successful());
        let layout_a = queue
            .state()
            .input_assembler()
            .input_layout()
            .bound()
            .clone()
            .unwrap();

        // Different shader object with the same signature maps to the same layout
        assert!(queue.draw(&pass_b, 3, 0).unwrap().is_successful());
        let layout_b = queue
            .state()
            .input_assembler()
            .input_layout()
            .bound()
            .clone()
            .unwrap();

        assert!(Arc::ptr_eq(&layout_a, &layout_b));
        assert_eq!(queue.layout_cache().len(), 1);
    }

    #[test]
    fn test_map_write_and_read_back() {
        let (device, mut queue) = create_queue();
        let buffer = device
            .create_buffer(&MoltenBufferDef::for_constant_data(8))
            .unwrap();
        let resource = MoltenResource::from(&buffer);
        let version = buffer.version();

        let mut stream = queue
            .map_resource(&resource, 0, 2, MoltenMapType::WriteDiscard)
            .unwrap();

        // Mapping twice fails and doesn't disturb the open mapping
        assert!(queue
            .map_resource(&resource, 0, 0, MoltenMapType::Read)
            .unwrap_err()
            .is_invalid_operation());

        stream.write_all(&[1, 2, 3]).unwrap();
        // The stream can't grow past the subresource
        assert!(stream.write_all(&[0; 8]).is_err());
        queue.unmap_resource(stream).unwrap();
        assert!(buffer.version() > version);

        let mut stream = queue
            .map_resource(&resource, 0, 0, MoltenMapType::Read)
            .unwrap();
        let mut contents = Vec::new();
        stream.read_to_end(&mut contents).unwrap();
        assert_eq!(contents[..5], [0, 0, 1, 2, 3]);

        let version = buffer.version();
        queue.unmap_resource(stream).unwrap();
        // Read mappings don't write back
        assert_eq!(buffer.version(), version);
    }

    #[test]
    fn test_resource_maps_once_across_queues() {
        let (device, mut queue) = create_queue();
        let mut other_queue = GraphicsQueue::new(device.clone(), Default::default());
        let resource = MoltenResource::from(
            device
                .create_buffer(&MoltenBufferDef::for_constant_data(8))
                .unwrap(),
        );

        let stream = queue
            .map_resource(&resource, 0, 0, MoltenMapType::Write)
            .unwrap();
        assert!(resource.is_mapped());
        assert!(other_queue
            .map_resource(&resource, 0, 0, MoltenMapType::Read)
            .unwrap_err()
            .is_invalid_operation());

        queue.unmap_resource(stream).unwrap();
        assert!(!resource.is_mapped());

        // A failed map leaves nothing claimed
        assert!(other_queue
            .map_resource(&resource, 0, 9, MoltenMapType::Read)
            .is_err());
        assert!(!resource.is_mapped());

        let stream = other_queue
            .map_resource(&resource, 0, 0, MoltenMapType::Read)
            .unwrap();
        other_queue.unmap_resource(stream).unwrap();
    }

    #[test]
    fn test_update_and_copy_are_recorded() {
        let (device, mut queue) = create_queue();
        let a = MoltenResource::from(
            device
                .create_buffer(&MoltenBufferDef::for_vertex_data(4))
                .unwrap(),
        );
        let b = MoltenResource::from(
            device
                .create_buffer(&MoltenBufferDef::for_vertex_data(4))
                .unwrap(),
        );

        assert!(queue
            .update_resource(&a, 0, 0, &[1, 2, 3, 4])
            .unwrap_err()
            .is_invalid_operation());

        queue.begin(GraphicsQueueBeginFlags::empty()).unwrap();
        queue.update_resource(&a, 0, 0, &[1, 2, 3, 4]).unwrap();
        assert!(queue.update_resource(&a, 0, 2, &[1, 2, 3]).is_err());
        assert!(queue
            .update_resource(&a, 0, u64::MAX, &[1])
            .unwrap_err()
            .is_invalid_operation());
        queue.copy_resource(&a, &b).unwrap();
        queue
            .submit(GraphicsQueueSubmitFlags::END_OF_FRAME)
            .unwrap();

        assert_eq!(device.read_resource(&b, 0).unwrap(), vec![1, 2, 3, 4]);
    }
}
