use super::{
    BufferUploadTask, GpuTask, GpuTaskKind, ReadbackTask, TextureResizeTask, TextureUploadTask,
};
use molten_base::FreeList;

/// Free-lists of task objects, one per task kind. Tasks are acquired, filled in, pushed, and
/// returned here by the task queue after they run. A released task never holds on to resources
/// or callbacks.
pub struct GpuTaskPool {
    texture_resize: FreeList<TextureResizeTask>,
    buffer_upload: FreeList<BufferUploadTask>,
    texture_upload: FreeList<TextureUploadTask>,
    readback: FreeList<ReadbackTask>,
}

impl GpuTaskPool {
    pub fn new(initial_size_per_kind: usize) -> Self {
        GpuTaskPool {
            texture_resize: FreeList::with_capacity(
                initial_size_per_kind,
                TextureResizeTask::default,
                TextureResizeTask::clear_for_pool,
            ),
            buffer_upload: FreeList::with_capacity(
                initial_size_per_kind,
                BufferUploadTask::default,
                BufferUploadTask::clear_for_pool,
            ),
            texture_upload: FreeList::with_capacity(
                initial_size_per_kind,
                TextureUploadTask::default,
                TextureUploadTask::clear_for_pool,
            ),
            readback: FreeList::with_capacity(
                initial_size_per_kind,
                ReadbackTask::default,
                ReadbackTask::clear_for_pool,
            ),
        }
    }

    pub fn acquire_texture_resize(&mut self) -> TextureResizeTask {
        self.texture_resize.acquire()
    }

    pub fn acquire_buffer_upload(&mut self) -> BufferUploadTask {
        self.buffer_upload.acquire()
    }

    pub fn acquire_texture_upload(&mut self) -> TextureUploadTask {
        self.texture_upload.acquire()
    }

    pub fn acquire_readback(&mut self) -> ReadbackTask {
        self.readback.acquire()
    }

    pub fn release(
        &mut self,
        task: GpuTask,
    ) {
        match task {
            GpuTask::TextureResize(task) => self.texture_resize.release(task),
            GpuTask::BufferUpload(task) => self.buffer_upload.release(task),
            GpuTask::TextureUpload(task) => self.texture_upload.release(task),
            GpuTask::Readback(task) => self.readback.release(task),
        }
    }

    pub fn num_free(
        &self,
        kind: GpuTaskKind,
    ) -> usize {
        match kind {
            GpuTaskKind::TextureResize => self.texture_resize.num_free(),
            GpuTaskKind::BufferUpload => self.buffer_upload.num_free(),
            GpuTaskKind::TextureUpload => self.texture_upload.num_free(),
            GpuTaskKind::Readback => self.readback.num_free(),
        }
    }

    pub fn num_created(
        &self,
        kind: GpuTaskKind,
    ) -> usize {
        match kind {
            GpuTaskKind::TextureResize => self.texture_resize.num_created(),
            GpuTaskKind::BufferUpload => self.buffer_upload.num_created(),
            GpuTaskKind::TextureUpload => self.texture_upload.num_created(),
            GpuTaskKind::Readback => self.readback.num_created(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molten_api::{MoltenBuffer, MoltenBufferDef};

    #[test]
    fn test_released_tasks_are_scrubbed_and_reused() {
        let mut pool = GpuTaskPool::new(1);
        let mut task = pool.acquire_buffer_upload();
        task.buffer = Some(MoltenBuffer::new(MoltenBufferDef::for_vertex_data(4)));
        task.data.extend_from_slice(&[1, 2, 3]);
        let task = task.with_on_completed(|_| {});

        pool.release(task.into());
        assert_eq!(pool.num_free(GpuTaskKind::BufferUpload), 1);

        let task = pool.acquire_buffer_upload();
        assert!(task.buffer.is_none());
        assert!(task.data.is_empty());
        assert_eq!(pool.num_created(GpuTaskKind::BufferUpload), 1);
    }
}
