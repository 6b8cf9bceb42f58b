use molten_api::{MoltenPrimitiveTopology, MoltenShader, MoltenShaderStage};

bitflags::bitflags! {
    /// Conditions the queue is currently rendering under. A pass may provide alternate shaders
    /// for particular conditions.
    #[derive(Default)]
    pub struct StateConditions: u32 {
        const WIREFRAME = 1 << 0;
        const MULTISAMPLE = 1 << 1;
        const INSTANCED = 1 << 2;
    }
}

#[derive(Debug, Clone)]
struct ConditionalShader {
    conditions: StateConditions,
    shader: MoltenShader,
}

/// The shaders and fixed-function settings used to draw with a material. Any stage may be left
/// empty; a draw requires a vertex shader and a dispatch requires a compute shader.
#[derive(Debug, Clone)]
pub struct ShaderPass {
    name: String,
    topology: MoltenPrimitiveTopology,
    shaders: [Option<MoltenShader>; 4],
    conditional_shaders: Vec<ConditionalShader>,
}

fn stage_index(stage: MoltenShaderStage) -> usize {
    match stage {
        MoltenShaderStage::Vertex => 0,
        MoltenShaderStage::Geometry => 1,
        MoltenShaderStage::Pixel => 2,
        MoltenShaderStage::Compute => 3,
    }
}

impl ShaderPass {
    pub fn new<T: Into<String>>(name: T) -> Self {
        ShaderPass {
            name: name.into(),
            topology: MoltenPrimitiveTopology::TriangleList,
            shaders: Default::default(),
            conditional_shaders: Default::default(),
        }
    }

    pub fn with_topology(
        mut self,
        topology: MoltenPrimitiveTopology,
    ) -> Self {
        self.topology = topology;
        self
    }

    /// Sets the shader for the stage the shader was compiled for
    pub fn with_shader(
        mut self,
        shader: MoltenShader,
    ) -> Self {
        let index = stage_index(shader.stage());
        self.shaders[index] = Some(shader);
        self
    }

    /// Use `shader` instead of the default for its stage whenever all of `conditions` are active
    pub fn with_conditional_shader(
        mut self,
        conditions: StateConditions,
        shader: MoltenShader,
    ) -> Self {
        self.conditional_shaders
            .push(ConditionalShader { conditions, shader });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> MoltenPrimitiveTopology {
        self.topology
    }

    /// The shader to use for `stage` under the given conditions. The first matching conditional
    /// shader wins, otherwise the default for the stage is returned.
    pub fn shader(
        &self,
        stage: MoltenShaderStage,
        conditions: StateConditions,
    ) -> Option<&MoltenShader> {
        if !conditions.is_empty() {
            let conditional = self.conditional_shaders.iter().find(|x| {
                x.shader.stage() == stage
                    && !x.conditions.is_empty()
                    && conditions.contains(x.conditions)
            });

            if let Some(conditional) = conditional {
                return Some(&conditional.shader);
            }
        }

        self.shaders[stage_index(stage)].as_ref()
    }
}
