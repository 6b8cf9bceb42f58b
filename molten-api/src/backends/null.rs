use crate::*;
use fnv::FnvHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

type SubresourceKey = (MoltenResourceId, u32);

/// A backend that runs entirely in memory. Resource contents are kept in byte vectors, submitted
/// command lists are executed for their copy/update commands and then retained so they can be
/// inspected.
///
/// Useful for tests and for running the state-tracking machinery without a GPU.
pub struct MoltenDeviceNull {
    device_info: MoltenDeviceInfo,
    memory: Mutex<FnvHashMap<SubresourceKey, Vec<u8>>>,
    submitted: Mutex<Vec<MoltenCommandList>>,
    submit_count: AtomicUsize,
    fail_resizes: AtomicBool,
}

impl Default for MoltenDeviceNull {
    fn default() -> Self {
        MoltenDeviceNull::new(MoltenDeviceInfo::default())
    }
}

impl MoltenDeviceNull {
    pub fn new(device_info: MoltenDeviceInfo) -> Self {
        MoltenDeviceNull {
            device_info,
            memory: Default::default(),
            submitted: Default::default(),
            submit_count: AtomicUsize::new(0),
            fail_resizes: AtomicBool::new(false),
        }
    }

    /// When set, `resize_texture` fails with a device error. Used to exercise failure paths.
    pub fn set_fail_resizes(
        &self,
        fail_resizes: bool,
    ) {
        self.fail_resizes.store(fail_resizes, Ordering::Release);
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::Acquire)
    }

    /// Removes and returns every command list submitted so far
    pub fn take_submitted(&self) -> Vec<MoltenCommandList> {
        std::mem::take(&mut *self.submitted.lock().unwrap())
    }

    fn subresource_size(
        resource: &MoltenResource,
        subresource: u32,
    ) -> MoltenResult<usize> {
        resource
            .subresource_byte_size(subresource)
            .map(|x| x as usize)
            .ok_or_else(|| {
                MoltenError::DeviceError(format!(
                    "subresource {} does not exist on resource {:?}",
                    subresource,
                    resource.id()
                ))
            })
    }

    fn check_not_disposed(resource: &MoltenResource) -> MoltenResult<()> {
        if resource.is_disposed() {
            Err(MoltenError::ResourceDisposed(resource.id()))
        } else {
            Ok(())
        }
    }

    fn write_locked(
        memory: &mut FnvHashMap<SubresourceKey, Vec<u8>>,
        resource: &MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: &[u8],
    ) -> MoltenResult<()> {
        Self::check_not_disposed(resource)?;
        let size = Self::subresource_size(resource, subresource)?;
        let range = usize::try_from(byte_offset)
            .ok()
            .and_then(|begin| Some((begin, begin.checked_add(data.len())?)))
            .filter(|(_, end)| *end <= size);
        let (begin, end) = range.ok_or_else(|| {
            MoltenError::DeviceError(format!(
                "write of {} bytes at offset {} exceeds subresource size {}",
                data.len(),
                byte_offset,
                size
            ))
        })?;

        let bytes = memory
            .entry((resource.id(), subresource))
            .or_insert_with(|| vec![0; size]);
        bytes.resize(size, 0);
        bytes[begin..end].copy_from_slice(data);
        Ok(())
    }

    fn execute(
        &self,
        command_list: &MoltenCommandList,
    ) -> MoltenResult<()> {
        let mut memory = self.memory.lock().unwrap();
        for command in command_list.commands() {
            match command {
                MoltenCommand::UpdateResource {
                    dst,
                    subresource,
                    byte_offset,
                    data,
                } => {
                    Self::write_locked(&mut memory, dst, *subresource, *byte_offset, data)?;
                }
                MoltenCommand::CopyResource { src, dst } => {
                    Self::check_not_disposed(src)?;
                    Self::check_not_disposed(dst)?;
                    let src_size = Self::subresource_size(src, 0)?;
                    let dst_size = Self::subresource_size(dst, 0)?;
                    if src_size != dst_size {
                        return Err(MoltenError::DeviceError(format!(
                            "cannot copy {} bytes into a resource of {} bytes",
                            src_size, dst_size
                        )));
                    }

                    let bytes = memory
                        .get(&(src.id(), 0))
                        .cloned()
                        .unwrap_or_else(|| vec![0; src_size]);
                    memory.insert((dst.id(), 0), bytes);
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl MoltenDevice for MoltenDeviceNull {
    fn device_info(&self) -> &MoltenDeviceInfo {
        &self.device_info
    }

    fn create_buffer(
        &self,
        buffer_def: &MoltenBufferDef,
    ) -> MoltenResult<MoltenBuffer> {
        if buffer_def.size == 0 {
            return Err("cannot create a zero-sized buffer".into());
        }

        Ok(MoltenBuffer::new(buffer_def.clone()))
    }

    fn create_texture(
        &self,
        texture_def: &MoltenTextureDef,
    ) -> MoltenResult<MoltenTexture> {
        texture_def.verify()?;
        Ok(MoltenTexture::new(texture_def.clone()))
    }

    fn create_sampler(
        &self,
        sampler_def: &MoltenSamplerDef,
    ) -> MoltenResult<MoltenSampler> {
        Ok(MoltenSampler::new(sampler_def.clone()))
    }

    fn create_shader(
        &self,
        shader_def: &MoltenShaderDef,
    ) -> MoltenResult<MoltenShader> {
        if shader_def.entry_point.is_empty() {
            return Err("shader entry point must not be empty".into());
        }

        Ok(MoltenShader::new(shader_def.clone()))
    }

    fn submit(
        &self,
        command_list: MoltenCommandList,
    ) -> MoltenResult<()> {
        profiling::scope!("MoltenDeviceNull::submit");
        self.execute(&command_list)?;
        log::trace!("Null device executed {} commands", command_list.len());
        self.submit_count.fetch_add(1, Ordering::AcqRel);
        self.submitted.lock().unwrap().push(command_list);
        Ok(())
    }

    fn read_resource(
        &self,
        resource: &MoltenResource,
        subresource: u32,
    ) -> MoltenResult<Vec<u8>> {
        Self::check_not_disposed(resource)?;
        let size = Self::subresource_size(resource, subresource)?;
        let memory = self.memory.lock().unwrap();
        let mut bytes = memory
            .get(&(resource.id(), subresource))
            .cloned()
            .unwrap_or_default();
        bytes.resize(size, 0);
        Ok(bytes)
    }

    fn write_resource(
        &self,
        resource: &MoltenResource,
        subresource: u32,
        byte_offset: u64,
        data: &[u8],
    ) -> MoltenResult<()> {
        let mut memory = self.memory.lock().unwrap();
        Self::write_locked(&mut memory, resource, subresource, byte_offset, data)
    }

    fn resize_texture(
        &self,
        texture: &MoltenTexture,
        texture_def: &MoltenTextureDef,
    ) -> MoltenResult<()> {
        if texture.is_disposed() {
            return Err(MoltenError::ResourceDisposed(texture.id()));
        }

        if self.fail_resizes.load(Ordering::Acquire) {
            return Err(MoltenError::DeviceError(format!(
                "resize of texture {:?} failed",
                texture.id()
            )));
        }

        texture_def.verify()?;

        // Contents are not preserved across a resize
        let id = texture.id();
        self.memory.lock().unwrap().retain(|(x, _), _| *x != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let device = MoltenDeviceNull::default();
        let buffer = device
            .create_buffer(&MoltenBufferDef::for_vertex_data(8))
            .unwrap();
        let resource = MoltenResource::from(&buffer);

        device
            .write_resource(&resource, 0, 2, &[1, 2, 3])
            .unwrap();
        assert_eq!(
            device.read_resource(&resource, 0).unwrap(),
            vec![0, 0, 1, 2, 3, 0, 0, 0]
        );

        // Out of bounds
        assert!(device.write_resource(&resource, 0, 6, &[1, 2, 3]).is_err());
        // No such subresource
        assert!(device.read_resource(&resource, 1).is_err());
    }

    #[test]
    fn test_submit_executes_updates_and_copies() {
        let device = MoltenDeviceNull::default();
        let a = device
            .create_buffer(&MoltenBufferDef::for_vertex_data(4))
            .unwrap();
        let b = device
            .create_buffer(&MoltenBufferDef::for_vertex_data(4))
            .unwrap();

        let mut command_list = MoltenCommandList::new();
        command_list.cmd_update_buffer(&a, 0, vec![9, 8, 7, 6]);
        command_list.cmd_copy_resource((&a).into(), (&b).into());
        device.submit(command_list).unwrap();

        assert_eq!(device.submit_count(), 1);
        assert_eq!(device.read_resource(&(&b).into(), 0).unwrap(), vec![9, 8, 7, 6]);
        assert_eq!(device.take_submitted()[0].len(), 2);
    }

    #[test]
    fn test_resize_failure_injection() {
        let device = MoltenDeviceNull::default();
        let def = MoltenTextureDef::new_2d(
            2,
            2,
            MoltenFormat::R8G8B8A8_UNORM,
            MoltenResourceType::TEXTURE,
        );
        let texture = device.create_texture(&def).unwrap();

        device.set_fail_resizes(true);
        assert!(device.resize_texture(&texture, &def).is_err());
        device.set_fail_resizes(false);
        assert!(device.resize_texture(&texture, &def).is_ok());

        texture.dispose();
        assert!(matches!(
            device.resize_texture(&texture, &def),
            Err(MoltenError::ResourceDisposed(_))
        ));
    }
}
