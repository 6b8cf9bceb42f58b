use crate::{
    MoltenBuffer, MoltenBufferDef, MoltenCommandList, MoltenDeviceInfo, MoltenResource,
    MoltenResult, MoltenSampler, MoltenSamplerDef, MoltenShader, MoltenShaderDef, MoltenTexture,
    MoltenTextureDef,
};

/// The contract a graphics backend implements. Everything above this trait is API-agnostic.
///
/// Devices are shared as `Arc<dyn MoltenDevice>` between the graphics queues and task queues that
/// use them. Each graphics queue records on a single thread, but several queues may submit to the
/// same device concurrently, so implementations must be `Send + Sync`.
pub trait MoltenDevice: Send + Sync {
    /// Limits of the device. Consumed when pipeline stages are constructed.
    fn device_info(&self) -> &MoltenDeviceInfo;

    fn create_buffer(
        &self,
        buffer_def: &MoltenBufferDef,
    ) -> MoltenResult<MoltenBuffer>;

    fn create_texture(
        &self,
        texture_def: &MoltenTextureDef,
    ) -> MoltenResult<MoltenTexture>;

    fn create_sampler(
        &self,
        sampler_def: &MoltenSamplerDef,
    ) -> MoltenResult<MoltenSampler>;

    fn create_shader(
        &self,
        shader_def: &MoltenShaderDef,
    ) -> MoltenResult<MoltenShader>;

    /// Execute a recorded command list. Commands run in recorded order.
    fn submit(
        &self,
        command_list: MoltenCommandList,
    ) -> MoltenResult<()>;

    /// Read the full contents of a subresource. May block until prior GPU work that uses the
    /// resource has completed.
    fn read_resource(
        &self,
        resource: &MoltenResource,
        subresource: u32,
    ) -> MoltenResult<Vec<u8>>;

    /// Write bytes into a subresource starting at `byte_offset`. May block like `read_resource`.
    fn write_resource(
        &self,
        resource: &MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: &[u8],
    ) -> MoltenResult<()>;

    /// Reallocate the native texture with a new shape. Contents are not preserved. This does not
    /// update the `MoltenTexture` handle, callers do that with `MoltenTexture::apply_resize` once
    /// this returns Ok.
    fn resize_texture(
        &self,
        texture: &MoltenTexture,
        texture_def: &MoltenTextureDef,
    ) -> MoltenResult<()>;
}
