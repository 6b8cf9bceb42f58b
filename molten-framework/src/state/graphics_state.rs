use super::stages::GraphicsShaderStages;
use super::{
    BindError, InputAssemblerStage, OutputMergerStage, ShaderStage, VertexLayoutCache,
};
use crate::{ShaderPass, StateConditions};
use molten_api::{MoltenCommandList, MoltenDeviceInfo, MoltenShaderStage};

/// Per-draw values that are not bindings but are saved and restored with them
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawInfo {
    /// Four floats made available to shaders through the renderer's per-draw constants
    pub custom_values: [f32; 4],
    /// When set, dispatches use these group counts instead of the ones passed in
    pub compute_group_override: Option<[u32; 3]>,
    pub conditions: StateConditions,
    /// Set once a draw or dispatch has been recorded since the queue began recording
    pub draw_began: bool,
}

impl Default for DrawInfo {
    fn default() -> Self {
        DrawInfo {
            custom_values: [0.0; 4],
            compute_group_override: None,
            conditions: StateConditions::empty(),
            draw_began: false,
        }
    }
}

impl DrawInfo {
    /// Clear the values a draw sets for itself. Conditions belong to the scene and are kept.
    pub(crate) fn reset_draw_values(&mut self) {
        self.custom_values = [0.0; 4];
        self.compute_group_override = None;
    }
}

/// Every pipeline stage of a graphics queue plus the per-draw info. This is also what the state
/// stack saves, a pushed entry is a complete copy of one of these.
#[derive(Debug, Clone)]
pub struct GraphicsState {
    input_assembler: InputAssemblerStage,
    vertex: ShaderStage,
    geometry: ShaderStage,
    pixel: ShaderStage,
    compute: ShaderStage,
    output_merger: OutputMergerStage,
    draw_info: DrawInfo,
}

impl GraphicsState {
    pub fn new(device_info: &MoltenDeviceInfo) -> Self {
        GraphicsState {
            input_assembler: InputAssemblerStage::new(device_info),
            vertex: ShaderStage::new(MoltenShaderStage::Vertex, device_info),
            geometry: ShaderStage::new(MoltenShaderStage::Geometry, device_info),
            pixel: ShaderStage::new(MoltenShaderStage::Pixel, device_info),
            compute: ShaderStage::new(MoltenShaderStage::Compute, device_info),
            output_merger: OutputMergerStage::new(device_info),
            draw_info: Default::default(),
        }
    }

    // Blank state for the snapshot free-list. Takes its shape from whatever is copied into it.
    pub(crate) fn empty() -> Self {
        GraphicsState {
            input_assembler: InputAssemblerStage::empty(),
            vertex: ShaderStage::empty(MoltenShaderStage::Vertex),
            geometry: ShaderStage::empty(MoltenShaderStage::Geometry),
            pixel: ShaderStage::empty(MoltenShaderStage::Pixel),
            compute: ShaderStage::empty(MoltenShaderStage::Compute),
            output_merger: OutputMergerStage::empty(),
            draw_info: Default::default(),
        }
    }

    pub fn input_assembler(&self) -> &InputAssemblerStage {
        &self.input_assembler
    }

    pub fn shader_stage(
        &self,
        stage: MoltenShaderStage,
    ) -> &ShaderStage {
        match stage {
            MoltenShaderStage::Vertex => &self.vertex,
            MoltenShaderStage::Geometry => &self.geometry,
            MoltenShaderStage::Pixel => &self.pixel,
            MoltenShaderStage::Compute => &self.compute,
        }
    }

    pub fn output_merger(&self) -> &OutputMergerStage {
        &self.output_merger
    }

    pub fn draw_info(&self) -> &DrawInfo {
        &self.draw_info
    }

    pub(crate) fn input_assembler_mut(&mut self) -> &mut InputAssemblerStage {
        &mut self.input_assembler
    }

    pub(crate) fn shader_stage_mut(
        &mut self,
        stage: MoltenShaderStage,
    ) -> &mut ShaderStage {
        match stage {
            MoltenShaderStage::Vertex => &mut self.vertex,
            MoltenShaderStage::Geometry => &mut self.geometry,
            MoltenShaderStage::Pixel => &mut self.pixel,
            MoltenShaderStage::Compute => &mut self.compute,
        }
    }

    pub(crate) fn output_merger_mut(&mut self) -> &mut OutputMergerStage {
        &mut self.output_merger
    }

    pub(crate) fn draw_info_mut(&mut self) -> &mut DrawInfo {
        &mut self.draw_info
    }

    /// Reconcile everything a draw with `pass` reads
    pub(crate) fn bind_graphics(
        &mut self,
        pass: &ShaderPass,
        layout_cache: &mut VertexLayoutCache,
        command_list: &mut MoltenCommandList,
        validate: bool,
    ) -> Result<bool, BindError> {
        let shaders = GraphicsShaderStages {
            vertex: &mut self.vertex,
            geometry: &mut self.geometry,
            pixel: &mut self.pixel,
        };

        let mut changed = self.input_assembler.bind(
            pass,
            self.draw_info.conditions,
            shaders,
            layout_cache,
            command_list,
            validate,
        )?;
        changed |= self.output_merger.bind(command_list, validate)?;
        Ok(changed)
    }

    /// Reconcile the compute stage for a dispatch with `pass`
    pub(crate) fn bind_compute(
        &mut self,
        pass: &ShaderPass,
        command_list: &mut MoltenCommandList,
        validate: bool,
    ) -> Result<bool, BindError> {
        let shader = pass
            .shader(MoltenShaderStage::Compute, self.draw_info.conditions)
            .ok_or(BindError::MissingShader(MoltenShaderStage::Compute))?;
        self.compute.set_shader(Some(shader.clone()));
        self.compute.bind(command_list, validate)
    }

    /// Become `snapshot`. When a command list is given, commands are recorded first so that what
    /// is bound on the command list matches what the snapshot had bound.
    pub(crate) fn restore_from(
        &mut self,
        snapshot: &GraphicsState,
        command_list: Option<&mut MoltenCommandList>,
    ) {
        if let Some(command_list) = command_list {
            self.input_assembler
                .request_bound_of(&snapshot.input_assembler);
            self.input_assembler.bind_pending(command_list);

            for stage in MoltenShaderStage::ALL {
                let shader_stage = self.shader_stage_mut(stage);
                shader_stage.request_bound_of(snapshot.shader_stage(stage));
                shader_stage.bind_pending(command_list);
            }

            self.output_merger
                .request_bound_of(&snapshot.output_merger);
            self.output_merger.bind_pending(command_list);
        }

        self.copy_from(snapshot);
    }

    /// Nothing is bound on a fresh command list
    pub(crate) fn invalidate_bound(&mut self) {
        self.input_assembler.invalidate_bound();
        for stage in MoltenShaderStage::ALL {
            self.shader_stage_mut(stage).invalidate_bound();
        }
        self.output_merger.invalidate_bound();
    }

    pub(crate) fn reset_pending(&mut self) {
        self.input_assembler.reset_pending();
        for stage in MoltenShaderStage::ALL {
            self.shader_stage_mut(stage).reset_pending();
        }
        self.output_merger.reset_pending();
        self.draw_info = Default::default();
    }

    pub(crate) fn copy_from(
        &mut self,
        other: &GraphicsState,
    ) {
        self.input_assembler.copy_from(&other.input_assembler);
        self.vertex.copy_from(&other.vertex);
        self.geometry.copy_from(&other.geometry);
        self.pixel.copy_from(&other.pixel);
        self.compute.copy_from(&other.compute);
        self.output_merger.copy_from(&other.output_merger);
        self.draw_info = other.draw_info;
    }

    pub(crate) fn clear(&mut self) {
        self.input_assembler.clear();
        for stage in MoltenShaderStage::ALL {
            self.shader_stage_mut(stage).clear();
        }
        self.output_merger.clear();
        self.draw_info = Default::default();
    }

    /// True if every slot has the same pending and bound values as in `other`, and the draw info
    /// matches
    pub fn bindings_eq(
        &self,
        other: &GraphicsState,
    ) -> bool {
        self.input_assembler
            .bindings_eq(&other.input_assembler)
            && MoltenShaderStage::ALL.iter().all(|stage| {
                self.shader_stage(*stage)
                    .bindings_eq(other.shader_stage(*stage))
            })
            && self.output_merger.bindings_eq(&other.output_merger)
            && self.draw_info == other.draw_info
    }
}
