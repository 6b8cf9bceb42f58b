use molten_api::{
    MoltenBuffer, MoltenCommandList, MoltenDevice, MoltenError, MoltenResource, MoltenResult,
    MoltenTexture, MoltenTextureDef,
};

/// When a task runs
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GpuTaskPriority {
    /// Runs as soon as it is pushed
    Immediate,
    /// Runs when the end-of-frame bucket is drained
    EndOfFrame,
    /// Runs when the start-of-frame bucket is drained, before any rendering for the frame
    StartOfFrame,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GpuTaskKind {
    TextureResize,
    BufferUpload,
    TextureUpload,
    Readback,
}

/// How far a task got when it ran
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum GpuTaskStatus {
    /// Finished, callback fired
    Completed,
    /// Recorded into a command list. Completes once that list is submitted.
    Recorded,
}

/// Called exactly once with the outcome of a task
pub type GpuTaskCallback = Box<dyn FnOnce(MoltenResult<()>) + Send>;

/// Called exactly once with the bytes read by a readback task, or the reason it failed
pub type GpuReadbackCallback = Box<dyn FnOnce(MoltenResult<Vec<u8>>) + Send>;

fn check_live(
    disposed: bool,
    resource_id: molten_api::MoltenResourceId,
) -> MoltenResult<()> {
    if disposed {
        Err(MoltenError::ResourceDisposed(resource_id))
    } else {
        Ok(())
    }
}

fn check_range(
    resource: &MoltenResource,
    subresource: u32,
    byte_offset: u64,
    byte_count: u64,
) -> MoltenResult<()> {
    let size = resource.subresource_byte_size(subresource).ok_or_else(|| {
        MoltenError::StringError(format!(
            "resource {:?} has no subresource {}",
            resource.id(),
            subresource
        ))
    })?;

    let fits = byte_offset
        .checked_add(byte_count)
        .map_or(false, |end| end <= size);
    if !fits {
        return Err(MoltenError::StringError(format!(
            "{} bytes at offset {} do not fit in a {} byte subresource",
            byte_count, byte_offset, size
        )));
    }

    Ok(())
}

fn missing_target(kind: GpuTaskKind) -> MoltenError {
    MoltenError::StringError(format!("{:?} task has no target resource", kind))
}

/// Reallocates a texture with a new shape. On success the texture handle is updated and its
/// resize listeners are notified.
#[derive(Default)]
pub struct TextureResizeTask {
    pub texture: Option<MoltenTexture>,
    pub texture_def: MoltenTextureDef,
    on_completed: Option<GpuTaskCallback>,
}

impl TextureResizeTask {
    pub fn new(
        texture: MoltenTexture,
        texture_def: MoltenTextureDef,
    ) -> Self {
        TextureResizeTask {
            texture: Some(texture),
            texture_def,
            on_completed: None,
        }
    }

    pub fn with_on_completed<F: FnOnce(MoltenResult<()>) + Send + 'static>(
        mut self,
        on_completed: F,
    ) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }

    fn validate(&self) -> MoltenResult<()> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::TextureResize))?;
        check_live(texture.is_disposed(), texture.id())?;
        self.texture_def.verify()?;
        Ok(())
    }

    fn execute(
        &mut self,
        device: &dyn MoltenDevice,
        frame_index: u64,
    ) -> MoltenResult<GpuTaskStatus> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::TextureResize))?;
        device.resize_texture(texture, &self.texture_def)?;
        let version = texture.apply_resize(self.texture_def.clone(), frame_index);
        log::debug!(
            "Resized texture {:?} to {:?} (version {})",
            texture.id(),
            self.texture_def.extents,
            version
        );

        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Ok(()));
        }
        Ok(GpuTaskStatus::Completed)
    }

    fn fail(
        &mut self,
        error: MoltenError,
    ) {
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Err(error));
        }
    }

    pub(crate) fn clear_for_pool(&mut self) {
        self.texture = None;
        self.texture_def = Default::default();
        self.on_completed = None;
    }
}

/// Writes bytes into a buffer
#[derive(Default)]
pub struct BufferUploadTask {
    pub buffer: Option<MoltenBuffer>,
    pub byte_offset: u64,
    pub data: Vec<u8>,
    on_completed: Option<GpuTaskCallback>,
}

impl BufferUploadTask {
    pub fn new(
        buffer: MoltenBuffer,
        byte_offset: u64,
        data: Vec<u8>,
    ) -> Self {
        BufferUploadTask {
            buffer: Some(buffer),
            byte_offset,
            data,
            on_completed: None,
        }
    }

    pub fn with_on_completed<F: FnOnce(MoltenResult<()>) + Send + 'static>(
        mut self,
        on_completed: F,
    ) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }

    fn validate(&self) -> MoltenResult<()> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::BufferUpload))?;
        check_live(buffer.is_disposed(), buffer.id())?;
        check_range(
            &MoltenResource::from(buffer),
            0,
            self.byte_offset,
            self.data.len() as u64,
        )
    }

    fn execute(
        &mut self,
        device: &dyn MoltenDevice,
        command_list: Option<&mut MoltenCommandList>,
    ) -> MoltenResult<GpuTaskStatus> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::BufferUpload))?;

        if let Some(command_list) = command_list {
            command_list.cmd_update_buffer(
                buffer,
                self.byte_offset,
                std::mem::take(&mut self.data),
            );
            return Ok(GpuTaskStatus::Recorded);
        }

        device.write_resource(
            &MoltenResource::from(buffer),
            0,
            self.byte_offset,
            &self.data,
        )?;
        self.complete();
        Ok(GpuTaskStatus::Completed)
    }

    fn complete(&mut self) {
        if let Some(buffer) = &self.buffer {
            buffer.mark_modified();
        }
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Ok(()));
        }
    }

    fn fail(
        &mut self,
        error: MoltenError,
    ) {
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Err(error));
        }
    }

    pub(crate) fn clear_for_pool(&mut self) {
        self.buffer = None;
        self.byte_offset = 0;
        self.data.clear();
        self.on_completed = None;
    }
}

/// Writes bytes into one subresource of a texture
#[derive(Default)]
pub struct TextureUploadTask {
    pub texture: Option<MoltenTexture>,
    pub subresource: u32,
    pub byte_offset: u64,
    pub data: Vec<u8>,
    on_completed: Option<GpuTaskCallback>,
}

impl TextureUploadTask {
    pub fn new(
        texture: MoltenTexture,
        subresource: u32,
        data: Vec<u8>,
    ) -> Self {
        TextureUploadTask {
            texture: Some(texture),
            subresource,
            byte_offset: 0,
            data,
            on_completed: None,
        }
    }

    pub fn with_on_completed<F: FnOnce(MoltenResult<()>) + Send + 'static>(
        mut self,
        on_completed: F,
    ) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }

    fn validate(&self) -> MoltenResult<()> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::TextureUpload))?;
        check_live(texture.is_disposed(), texture.id())?;
        check_range(
            &MoltenResource::from(texture),
            self.subresource,
            self.byte_offset,
            self.data.len() as u64,
        )
    }

    fn execute(
        &mut self,
        device: &dyn MoltenDevice,
        command_list: Option<&mut MoltenCommandList>,
    ) -> MoltenResult<GpuTaskStatus> {
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::TextureUpload))?;
        let resource = MoltenResource::from(texture);

        if let Some(command_list) = command_list {
            command_list.cmd_update_resource(
                resource,
                self.subresource,
                self.byte_offset,
                std::mem::take(&mut self.data),
            );
            return Ok(GpuTaskStatus::Recorded);
        }

        device.write_resource(&resource, self.subresource, self.byte_offset, &self.data)?;
        self.complete();
        Ok(GpuTaskStatus::Completed)
    }

    fn complete(&mut self) {
        if let Some(texture) = &self.texture {
            texture.mark_modified();
        }
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Ok(()));
        }
    }

    fn fail(
        &mut self,
        error: MoltenError,
    ) {
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Err(error));
        }
    }

    pub(crate) fn clear_for_pool(&mut self) {
        self.texture = None;
        self.subresource = 0;
        self.byte_offset = 0;
        self.data.clear();
        self.on_completed = None;
    }
}

/// Reads back a range of a subresource. The bytes reflect the resource as of the moment the task
/// runs. `GpuTaskQueue` submits whatever was recorded before a readback so earlier tasks are
/// visible to it.
#[derive(Default)]
pub struct ReadbackTask {
    pub resource: Option<MoltenResource>,
    pub subresource: u32,
    pub byte_offset: u64,
    /// Read to the end of the subresource when `None`
    pub byte_count: Option<u64>,
    on_completed: Option<GpuReadbackCallback>,
}

impl ReadbackTask {
    pub fn new(
        resource: MoltenResource,
        subresource: u32,
    ) -> Self {
        ReadbackTask {
            resource: Some(resource),
            subresource,
            byte_offset: 0,
            byte_count: None,
            on_completed: None,
        }
    }

    pub fn with_on_completed<F: FnOnce(MoltenResult<Vec<u8>>) + Send + 'static>(
        mut self,
        on_completed: F,
    ) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }

    fn validate(&self) -> MoltenResult<()> {
        let resource = self
            .resource
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::Readback))?;
        check_live(resource.is_disposed(), resource.id())?;
        check_range(
            resource,
            self.subresource,
            self.byte_offset,
            self.byte_count.unwrap_or(0),
        )
    }

    fn execute(
        &mut self,
        device: &dyn MoltenDevice,
    ) -> MoltenResult<GpuTaskStatus> {
        let resource = self
            .resource
            .as_ref()
            .ok_or_else(|| missing_target(GpuTaskKind::Readback))?;
        let mut data = device.read_resource(resource, self.subresource)?;

        let begin = (self.byte_offset as usize).min(data.len());
        let end = match self.byte_count {
            Some(byte_count) => (begin + byte_count as usize).min(data.len()),
            None => data.len(),
        };
        data.truncate(end);
        data.drain(..begin);

        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Ok(data));
        }
        Ok(GpuTaskStatus::Completed)
    }

    fn fail(
        &mut self,
        error: MoltenError,
    ) {
        if let Some(on_completed) = self.on_completed.take() {
            (on_completed)(Err(error));
        }
    }

    pub(crate) fn clear_for_pool(&mut self) {
        self.resource = None;
        self.subresource = 0;
        self.byte_offset = 0;
        self.byte_count = None;
        self.on_completed = None;
    }
}

/// A deferred or immediate piece of GPU work. The set of task kinds is closed, each variant is
/// pooled separately by `GpuTaskPool`.
pub enum GpuTask {
    TextureResize(TextureResizeTask),
    BufferUpload(BufferUploadTask),
    TextureUpload(TextureUploadTask),
    Readback(ReadbackTask),
}

impl GpuTask {
    pub fn kind(&self) -> GpuTaskKind {
        match self {
            GpuTask::TextureResize(_) => GpuTaskKind::TextureResize,
            GpuTask::BufferUpload(_) => GpuTaskKind::BufferUpload,
            GpuTask::TextureUpload(_) => GpuTaskKind::TextureUpload,
            GpuTask::Readback(_) => GpuTaskKind::Readback,
        }
    }

    /// Checks that the task can still run: its resource exists, hasn't been disposed, and the
    /// requested range fits
    pub fn validate(&self) -> MoltenResult<()> {
        match self {
            GpuTask::TextureResize(task) => task.validate(),
            GpuTask::BufferUpload(task) => task.validate(),
            GpuTask::TextureUpload(task) => task.validate(),
            GpuTask::Readback(task) => task.validate(),
        }
    }

    /// Validate and execute the task. Uploads are recorded into `command_list` when one is given
    /// and written through the device otherwise. A recorded task has not fired its callback yet,
    /// `complete_recorded` does that once the list has been submitted. Everything else fires its
    /// callback before returning.
    pub(crate) fn run(
        &mut self,
        device: &dyn MoltenDevice,
        command_list: Option<&mut MoltenCommandList>,
        frame_index: u64,
    ) -> MoltenResult<GpuTaskStatus> {
        profiling::scope!("GpuTask::run");
        let kind = self.kind();

        if let Err(error) = self.validate() {
            log::warn!("Discarding {:?} task that failed validation: {}", kind, error);
            self.fail(error.clone());
            return Err(error);
        }

        let result = match self {
            GpuTask::TextureResize(task) => task.execute(device, frame_index),
            GpuTask::BufferUpload(task) => task.execute(device, command_list),
            GpuTask::TextureUpload(task) => task.execute(device, command_list),
            GpuTask::Readback(task) => task.execute(device),
        };

        if let Err(error) = &result {
            log::error!("{:?} task failed: {}", kind, error);
            self.fail(error.clone());
        }

        result
    }

    /// Finish a task that was recorded, with the outcome of submitting its command list
    pub(crate) fn complete_recorded(
        &mut self,
        result: MoltenResult<()>,
    ) {
        match result {
            Ok(()) => match self {
                GpuTask::BufferUpload(task) => task.complete(),
                GpuTask::TextureUpload(task) => task.complete(),
                // Never recorded
                GpuTask::TextureResize(_) | GpuTask::Readback(_) => {}
            },
            Err(error) => {
                log::error!("{:?} task failed on submit: {}", self.kind(), error);
                self.fail(error);
            }
        }
    }

    fn fail(
        &mut self,
        error: MoltenError,
    ) {
        match self {
            GpuTask::TextureResize(task) => task.fail(error),
            GpuTask::BufferUpload(task) => task.fail(error),
            GpuTask::TextureUpload(task) => task.fail(error),
            GpuTask::Readback(task) => task.fail(error),
        }
    }
}

impl std::fmt::Debug for GpuTask {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("GpuTask").field(&self.kind()).finish()
    }
}

impl From<TextureResizeTask> for GpuTask {
    fn from(task: TextureResizeTask) -> Self {
        GpuTask::TextureResize(task)
    }
}

impl From<BufferUploadTask> for GpuTask {
    fn from(task: BufferUploadTask) -> Self {
        GpuTask::BufferUpload(task)
    }
}

impl From<TextureUploadTask> for GpuTask {
    fn from(task: TextureUploadTask) -> Self {
        GpuTask::TextureUpload(task)
    }
}

impl From<ReadbackTask> for GpuTask {
    fn from(task: ReadbackTask) -> Self {
        GpuTask::Readback(task)
    }
}
