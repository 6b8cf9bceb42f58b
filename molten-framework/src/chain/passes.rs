use crate::{ShaderPass, StateConditions};
use molten_api::{
    MoltenDevice, MoltenFormat, MoltenResult, MoltenShader, MoltenShaderDef,
    MoltenShaderInputSignature, MoltenShaderStage, MoltenVertexFormat,
};

/// The shader passes used by the built-in render steps
#[derive(Debug, Clone)]
pub struct RendererPasses {
    /// Meshes drawn directly into the camera target
    pub forward_mesh: ShaderPass,
    /// Meshes drawn into the geometry buffer
    pub gbuffer_mesh: ShaderPass,
    pub sprite: ShaderPass,
    /// Fullscreen pass run once per light
    pub lighting: ShaderPass,
    /// Fullscreen pass combining the geometry buffer and lighting into the camera target
    pub composite: ShaderPass,
}

fn create_shader(
    device: &dyn MoltenDevice,
    stage: MoltenShaderStage,
    entry_point: &str,
    input_signature: Option<MoltenShaderInputSignature>,
) -> MoltenResult<MoltenShader> {
    device.create_shader(&MoltenShaderDef {
        stage,
        entry_point: entry_point.to_string(),
        input_signature,
    })
}

impl RendererPasses {
    /// Vertex format expected by the mesh passes
    pub fn mesh_vertex_format() -> MoltenVertexFormat {
        MoltenVertexFormat::packed(vec![
            ("POSITION", MoltenFormat::R32G32B32_SFLOAT),
            ("NORMAL", MoltenFormat::R32G32B32_SFLOAT),
            ("TEXCOORD", MoltenFormat::R32G32_SFLOAT),
        ])
    }

    /// Vertex format expected by the sprite pass
    pub fn sprite_vertex_format() -> MoltenVertexFormat {
        MoltenVertexFormat::packed(vec![
            ("POSITION", MoltenFormat::R32G32_SFLOAT),
            ("TEXCOORD", MoltenFormat::R32G32_SFLOAT),
        ])
    }

    /// Creates the stock shaders on `device`
    pub fn create_default(device: &dyn MoltenDevice) -> MoltenResult<Self> {
        let mesh_signature = MoltenShaderInputSignature::default()
            .with_element("POSITION", MoltenFormat::R32G32B32_SFLOAT)
            .with_element("NORMAL", MoltenFormat::R32G32B32_SFLOAT)
            .with_element("TEXCOORD", MoltenFormat::R32G32_SFLOAT);
        let sprite_signature = MoltenShaderInputSignature::default()
            .with_element("POSITION", MoltenFormat::R32G32_SFLOAT)
            .with_element("TEXCOORD", MoltenFormat::R32G32_SFLOAT);

        let mesh_vs = create_shader(
            device,
            MoltenShaderStage::Vertex,
            "mesh_vs",
            Some(mesh_signature),
        )?;
        // Fullscreen triangles are generated from the vertex id, no vertex input
        let fullscreen_vs = create_shader(device, MoltenShaderStage::Vertex, "fullscreen_vs", None)?;
        let wireframe_ps =
            create_shader(device, MoltenShaderStage::Pixel, "wireframe_ps", None)?;

        let forward_mesh = ShaderPass::new("forward_mesh")
            .with_shader(mesh_vs.clone())
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Pixel,
                "forward_ps",
                None,
            )?)
            .with_conditional_shader(StateConditions::WIREFRAME, wireframe_ps.clone());

        let gbuffer_mesh = ShaderPass::new("gbuffer_mesh")
            .with_shader(mesh_vs)
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Pixel,
                "gbuffer_ps",
                None,
            )?)
            .with_conditional_shader(StateConditions::WIREFRAME, wireframe_ps);

        let sprite = ShaderPass::new("sprite")
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Vertex,
                "sprite_vs",
                Some(sprite_signature),
            )?)
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Pixel,
                "sprite_ps",
                None,
            )?);

        let lighting = ShaderPass::new("lighting")
            .with_shader(fullscreen_vs.clone())
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Pixel,
                "lighting_ps",
                None,
            )?);

        let composite = ShaderPass::new("composite")
            .with_shader(fullscreen_vs)
            .with_shader(create_shader(
                device,
                MoltenShaderStage::Pixel,
                "composite_ps",
                None,
            )?);

        Ok(RendererPasses {
            forward_mesh,
            gbuffer_mesh,
            sprite,
            lighting,
            composite,
        })
    }
}
