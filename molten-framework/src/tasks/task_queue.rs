use super::gpu_task::GpuTaskStatus;
use super::{
    BufferUploadTask, GpuTask, GpuTaskKind, GpuTaskPool, GpuTaskPriority, ReadbackTask,
    TextureResizeTask, TextureUploadTask,
};
use crate::{GraphicsQueue, GraphicsQueueSubmitFlags};
use crossbeam_channel::{Receiver, Sender};
use molten_api::{MoltenDevice, MoltenError, MoltenResult};
use std::collections::VecDeque;
use std::sync::Arc;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct GpuTaskQueueConfig {
    /// Task objects allocated up front for each task kind
    pub initial_pool_size_per_kind: usize,
    /// Upper bound on the tasks run by a single drain of a bucket. Whatever is left stays queued,
    /// in order, for the next drain. Zero means no limit.
    pub max_deferred_tasks_per_drain: usize,
}

impl Default for GpuTaskQueueConfig {
    fn default() -> Self {
        GpuTaskQueueConfig {
            initial_pool_size_per_kind: 4,
            max_deferred_tasks_per_drain: 0,
        }
    }
}

type PendingTask = (GpuTaskPriority, GpuTask);

/// Schedules GPU-affecting work (resizes, uploads, readbacks) relative to the frame.
///
/// Immediate tasks run inside `push`. Deferred tasks wait in a FIFO bucket per priority until
/// `run_start_of_frame` or `run_end_of_frame` drains that bucket. Every task reports its outcome
/// through its callback exactly once. A task that fails (or whose resource was disposed while it
/// waited) reports the error and the drain moves on to the next task.
///
/// When a recording `GraphicsQueue` is passed in, uploads are recorded into its command list and
/// only complete (version bump, callback) once the task queue has submitted that list. A readback
/// submits everything recorded before it first, so it sees the earlier tasks of its bucket.
///
/// Other threads can queue deferred tasks through a `GpuTaskQueueContext`. They are picked up by
/// the next drain.
pub struct GpuTaskQueue {
    device: Arc<dyn MoltenDevice>,
    config: GpuTaskQueueConfig,
    start_of_frame: VecDeque<GpuTask>,
    end_of_frame: VecDeque<GpuTask>,
    // Recorded into the graphics queue's command list, waiting for it to be submitted
    awaiting_submit: Vec<GpuTask>,
    pool: GpuTaskPool,
    pending_task_tx: Sender<PendingTask>,
    pending_task_rx: Receiver<PendingTask>,
    frame_index: u64,
    completed_count: u64,
    failed_count: u64,
}

impl GpuTaskQueue {
    pub fn new(
        device: Arc<dyn MoltenDevice>,
        config: GpuTaskQueueConfig,
    ) -> Self {
        let (pending_task_tx, pending_task_rx) = crossbeam_channel::unbounded();
        let pool = GpuTaskPool::new(config.initial_pool_size_per_kind);

        GpuTaskQueue {
            device,
            config,
            start_of_frame: Default::default(),
            end_of_frame: Default::default(),
            awaiting_submit: Default::default(),
            pool,
            pending_task_tx,
            pending_task_rx,
            frame_index: 0,
            completed_count: 0,
            failed_count: 0,
        }
    }

    pub fn context(&self) -> GpuTaskQueueContext {
        GpuTaskQueueContext {
            pending_task_tx: self.pending_task_tx.clone(),
        }
    }

    pub fn config(&self) -> &GpuTaskQueueConfig {
        &self.config
    }

    pub fn pool(&self) -> &GpuTaskPool {
        &self.pool
    }

    /// Frame index passed to the most recent drain
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count
    }

    /// Number of tasks waiting in the bucket for `priority`. Tasks queued through a context are
    /// not counted until a drain picks them up.
    pub fn pending_count(
        &self,
        priority: GpuTaskPriority,
    ) -> usize {
        match priority {
            GpuTaskPriority::Immediate => 0,
            GpuTaskPriority::StartOfFrame => self.start_of_frame.len(),
            GpuTaskPriority::EndOfFrame => self.end_of_frame.len(),
        }
    }

    pub fn acquire_texture_resize(&mut self) -> TextureResizeTask {
        self.pool.acquire_texture_resize()
    }

    pub fn acquire_buffer_upload(&mut self) -> BufferUploadTask {
        self.pool.acquire_buffer_upload()
    }

    pub fn acquire_texture_upload(&mut self) -> TextureUploadTask {
        self.pool.acquire_texture_upload()
    }

    pub fn acquire_readback(&mut self) -> ReadbackTask {
        self.pool.acquire_readback()
    }

    /// Queue a task, or run it now if it is `Immediate`.
    ///
    /// Immediate uploads are recorded into `graphics_queue` when it is recording and the queue is
    /// submitted before this returns. For immediate tasks the result of running the task is also
    /// returned (the callback has already seen it). Deferred tasks ignore `graphics_queue`, they
    /// use the one passed to the drain.
    pub fn push<T: Into<GpuTask>>(
        &mut self,
        priority: GpuTaskPriority,
        task: T,
        graphics_queue: Option<&mut GraphicsQueue>,
    ) -> MoltenResult<()> {
        let task = task.into();
        match priority {
            GpuTaskPriority::Immediate => {
                let mut graphics_queue = graphics_queue;
                self.run_task(task, graphics_queue.as_deref_mut())?;
                match graphics_queue {
                    Some(graphics_queue) if !self.awaiting_submit.is_empty() => {
                        self.flush(graphics_queue)
                    }
                    _ => Ok(()),
                }
            }
            GpuTaskPriority::StartOfFrame => {
                self.start_of_frame.push_back(task);
                Ok(())
            }
            GpuTaskPriority::EndOfFrame => {
                self.end_of_frame.push_back(task);
                Ok(())
            }
        }
    }

    /// Run the start-of-frame bucket in FIFO order. Returns the number of tasks that ran.
    pub fn run_start_of_frame(
        &mut self,
        frame_index: u64,
        graphics_queue: Option<&mut GraphicsQueue>,
    ) -> usize {
        profiling::scope!("GpuTaskQueue::run_start_of_frame");
        self.frame_index = frame_index;
        self.drain(GpuTaskPriority::StartOfFrame, graphics_queue)
    }

    /// Run the end-of-frame bucket in FIFO order. Returns the number of tasks that ran.
    pub fn run_end_of_frame(
        &mut self,
        frame_index: u64,
        graphics_queue: Option<&mut GraphicsQueue>,
    ) -> usize {
        profiling::scope!("GpuTaskQueue::run_end_of_frame");
        self.frame_index = frame_index;
        self.drain(GpuTaskPriority::EndOfFrame, graphics_queue)
    }

    fn record_outcome(
        &mut self,
        succeeded: bool,
    ) {
        if succeeded {
            self.completed_count += 1;
        } else {
            self.failed_count += 1;
        }
    }

    fn receive_pending_tasks(&mut self) {
        for (priority, task) in self.pending_task_rx.try_iter() {
            match priority {
                GpuTaskPriority::StartOfFrame => self.start_of_frame.push_back(task),
                GpuTaskPriority::EndOfFrame => self.end_of_frame.push_back(task),
                // Rejected by GpuTaskQueueContext::push
                GpuTaskPriority::Immediate => unreachable!(),
            }
        }
    }

    fn pop_task(
        &mut self,
        priority: GpuTaskPriority,
    ) -> Option<GpuTask> {
        match priority {
            GpuTaskPriority::StartOfFrame => self.start_of_frame.pop_front(),
            GpuTaskPriority::EndOfFrame => self.end_of_frame.pop_front(),
            GpuTaskPriority::Immediate => None,
        }
    }

    /// Run one task. A task recorded into the graphics queue waits in `awaiting_submit`, anything
    /// else is finished and back in the pool when this returns.
    fn run_task(
        &mut self,
        mut task: GpuTask,
        graphics_queue: Option<&mut GraphicsQueue>,
    ) -> MoltenResult<()> {
        let mut graphics_queue = graphics_queue.filter(|x| x.is_recording());

        // Reads go straight to the device, so recorded work has to get there first
        if task.kind() == GpuTaskKind::Readback {
            if let Some(graphics_queue) = graphics_queue.as_deref_mut() {
                let has_commands = graphics_queue
                    .command_list()
                    .map_or(false, |x| !x.is_empty());
                if has_commands {
                    // A failed submit is reported to the recorded tasks, the readback still runs
                    let _ = self.flush(graphics_queue);
                }
            }
        }

        let command_list = match graphics_queue {
            Some(graphics_queue) => graphics_queue.command_list_mut().ok(),
            None => None,
        };

        match task.run(&*self.device, command_list, self.frame_index) {
            Ok(GpuTaskStatus::Recorded) => {
                self.awaiting_submit.push(task);
                Ok(())
            }
            Ok(GpuTaskStatus::Completed) => {
                self.record_outcome(true);
                self.pool.release(task);
                Ok(())
            }
            Err(error) => {
                self.record_outcome(false);
                self.pool.release(task);
                Err(error)
            }
        }
    }

    /// Submit the graphics queue and finish every task recorded into it. Recording continues into
    /// a new command list.
    fn flush(
        &mut self,
        graphics_queue: &mut GraphicsQueue,
    ) -> MoltenResult<()> {
        profiling::scope!("GpuTaskQueue::flush");
        let result = graphics_queue.submit(GraphicsQueueSubmitFlags::empty());
        if let Err(error) = &result {
            log::error!("Submitting recorded GPU tasks failed: {}", error);
        }

        let mut awaiting_submit = std::mem::take(&mut self.awaiting_submit);
        for mut task in awaiting_submit.drain(..) {
            task.complete_recorded(result.clone());
            self.record_outcome(result.is_ok());
            self.pool.release(task);
        }
        self.awaiting_submit = awaiting_submit;

        result
    }

    fn drain(
        &mut self,
        priority: GpuTaskPriority,
        mut graphics_queue: Option<&mut GraphicsQueue>,
    ) -> usize {
        self.receive_pending_tasks();

        let queued = self.pending_count(priority);
        let limit = match self.config.max_deferred_tasks_per_drain {
            0 => queued,
            max => queued.min(max),
        };

        let completed_before = self.completed_count;
        let failed_before = self.failed_count;
        let mut ran = 0;
        while ran < limit {
            let task = match self.pop_task(priority) {
                Some(task) => task,
                None => break,
            };

            // Failures were already reported to the task's callback
            let _ = self.run_task(task, graphics_queue.as_deref_mut());
            ran += 1;
        }

        if let Some(graphics_queue) = graphics_queue {
            if !self.awaiting_submit.is_empty() {
                let _ = self.flush(graphics_queue);
            }
        }

        let remaining = self.pending_count(priority);
        if remaining > 0 {
            log::debug!(
                "{} {:?} tasks left queued for the next drain",
                remaining,
                priority
            );
        }

        if ran > 0 {
            log::trace!(
                "Drained {:?} tasks for frame {}: {} completed, {} failed",
                priority,
                self.frame_index,
                self.completed_count - completed_before,
                self.failed_count - failed_before
            );
        }

        ran
    }
}

impl Drop for GpuTaskQueue {
    fn drop(&mut self) {
        self.receive_pending_tasks();
        let abandoned = self.start_of_frame.len() + self.end_of_frame.len();
        if abandoned > 0 {
            log::warn!(
                "GpuTaskQueue dropped with {} tasks that never ran",
                abandoned
            );
        }
    }
}

/// Lets other threads queue deferred tasks on a `GpuTaskQueue`
#[derive(Clone)]
pub struct GpuTaskQueueContext {
    pending_task_tx: Sender<PendingTask>,
}

impl GpuTaskQueueContext {
    /// Queue a deferred task. Immediate tasks can only be pushed on the queue itself.
    pub fn push<T: Into<GpuTask>>(
        &self,
        priority: GpuTaskPriority,
        task: T,
    ) -> MoltenResult<()> {
        if priority == GpuTaskPriority::Immediate {
            return Err(MoltenError::invalid_operation(
                "immediate tasks must be pushed on the GpuTaskQueue",
            ));
        }

        self.pending_task_tx
            .send((priority, task.into()))
            .map_err(|_err| {
                let error = "Could not enqueue GPU task".to_string();
                log::error!("{}", error);
                MoltenError::StringError(error)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::GpuTaskCompletion;
    use crate::GraphicsQueueBeginFlags;
    use molten_api::{
        MoltenBuffer, MoltenBufferDef, MoltenDeviceNull, MoltenFormat, MoltenResource,
        MoltenResourceType, MoltenTexture, MoltenTextureDef,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn create_task_queue(config: GpuTaskQueueConfig) -> (Arc<MoltenDeviceNull>, GpuTaskQueue) {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Arc::new(MoltenDeviceNull::default());
        let tasks = GpuTaskQueue::new(device.clone(), config);
        (device, tasks)
    }

    fn create_recording_queue(device: &Arc<MoltenDeviceNull>) -> GraphicsQueue {
        let mut graphics_queue = GraphicsQueue::new(device.clone(), Default::default());
        graphics_queue
            .begin(GraphicsQueueBeginFlags::empty())
            .unwrap();
        graphics_queue
    }

    fn create_buffer(device: &MoltenDeviceNull) -> MoltenBuffer {
        device
            .create_buffer(&MoltenBufferDef::for_vertex_data(4))
            .unwrap()
    }

    fn create_texture(device: &MoltenDeviceNull) -> MoltenTexture {
        device
            .create_texture(&MoltenTextureDef::new_2d(
                4,
                4,
                MoltenFormat::R8G8B8A8_UNORM,
                MoltenResourceType::TEXTURE,
            ))
            .unwrap()
    }

    #[test]
    fn test_immediate_resize() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let texture = create_texture(&device);

        let resize_events = Arc::new(AtomicUsize::new(0));
        let resize_events_clone = resize_events.clone();
        texture.register_on_resize(move |event| {
            assert_eq!(event.new_def.extents.width, 8);
            resize_events_clone.fetch_add(1, Ordering::SeqCst);
        });

        let (on_completed, rx) = GpuTaskCompletion::channel();
        let mut task = tasks.acquire_texture_resize();
        task.texture = Some(texture.clone());
        task.texture_def =
            MoltenTextureDef::new_2d(8, 8, MoltenFormat::R8G8B8A8_UNORM, MoltenResourceType::TEXTURE);
        let task = task.with_on_completed(on_completed);

        tasks
            .push(GpuTaskPriority::Immediate, task, None)
            .unwrap();

        // Completed before push returned
        assert!(rx.try_recv().unwrap().is_ok());
        assert_eq!(texture.extents().width, 8);
        assert_eq!(resize_events.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.pool().num_free(GpuTaskKind::TextureResize), 4);
    }

    #[test]
    fn test_deferred_tasks_run_in_order() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let buffer = create_buffer(&device);
        let order = Arc::new(Mutex::new(Vec::new()));

        for marker in 0..3u8 {
            let order = order.clone();
            let task = BufferUploadTask::new(buffer.clone(), 0, vec![marker; 4])
                .with_on_completed(move |result| {
                    assert!(result.is_ok());
                    order.lock().unwrap().push(marker);
                });
            tasks
                .push(GpuTaskPriority::EndOfFrame, task, None)
                .unwrap();
        }

        let readback_order = order.clone();
        tasks
            .push(
                GpuTaskPriority::StartOfFrame,
                ReadbackTask::new((&buffer).into(), 0).with_on_completed(move |_| {
                    readback_order.lock().unwrap().push(100);
                }),
                None,
            )
            .unwrap();

        // Nothing runs until its bucket is drained
        assert!(order.lock().unwrap().is_empty());
        assert_eq!(tasks.pending_count(GpuTaskPriority::EndOfFrame), 3);

        assert_eq!(tasks.run_end_of_frame(1, None), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(tasks.pending_count(GpuTaskPriority::StartOfFrame), 1);

        // The last upload wins
        let resource = MoltenResource::from(&buffer);
        assert_eq!(device.read_resource(&resource, 0).unwrap(), vec![2; 4]);
    }

    #[test]
    fn test_disposed_resource_is_reported_and_drain_continues() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let disposed = create_buffer(&device);
        let live = create_buffer(&device);

        let (first_completed, first_rx) = GpuTaskCompletion::channel();
        let (second_completed, second_rx) = GpuTaskCompletion::channel();
        tasks
            .push(
                GpuTaskPriority::StartOfFrame,
                BufferUploadTask::new(disposed.clone(), 0, vec![1; 4])
                    .with_on_completed(first_completed),
                None,
            )
            .unwrap();
        tasks
            .push(
                GpuTaskPriority::StartOfFrame,
                BufferUploadTask::new(live.clone(), 0, vec![1; 4])
                    .with_on_completed(second_completed),
                None,
            )
            .unwrap();

        disposed.dispose();
        assert_eq!(tasks.run_start_of_frame(1, None), 2);

        assert!(matches!(
            first_rx.try_recv().unwrap(),
            Err(MoltenError::ResourceDisposed(id)) if id == disposed.id()
        ));
        assert!(second_rx.try_recv().unwrap().is_ok());
        assert_eq!(tasks.failed_count(), 1);
        assert_eq!(tasks.completed_count(), 1);
    }

    #[test]
    fn test_device_failure_is_reported_once() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let texture = create_texture(&device);
        device.set_fail_resizes(true);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let task = TextureResizeTask::new(
            texture.clone(),
            MoltenTextureDef::new_2d(2, 2, MoltenFormat::R8G8B8A8_UNORM, MoltenResourceType::TEXTURE),
        )
        .with_on_completed(move |result| {
            assert!(result.is_err());
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        tasks.push(GpuTaskPriority::EndOfFrame, task, None).unwrap();
        tasks.run_end_of_frame(1, None);
        tasks.run_end_of_frame(2, None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The handle keeps its old shape
        assert_eq!(texture.extents().width, 4);
    }

    #[test]
    fn test_uploads_complete_when_submitted() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let mut graphics_queue = create_recording_queue(&device);
        let texture = create_texture(&device);
        let version = texture.version();

        let (on_completed, rx) = GpuTaskCompletion::channel();
        tasks
            .push(
                GpuTaskPriority::Immediate,
                TextureUploadTask::new(texture.clone(), 0, vec![7; 64])
                    .with_on_completed(on_completed),
                Some(&mut graphics_queue),
            )
            .unwrap();

        // Recorded, submitted, then completed
        assert!(rx.try_recv().unwrap().is_ok());
        assert_eq!(device.submit_count(), 1);
        assert!(texture.version() > version);
        assert_eq!(
            device.read_resource(&(&texture).into(), 0).unwrap(),
            vec![7; 64]
        );
        assert!(graphics_queue.is_recording());
        assert!(graphics_queue.command_list().unwrap().is_empty());

        // Too much data for the subresource
        assert!(tasks
            .push(
                GpuTaskPriority::Immediate,
                TextureUploadTask::new(texture, 0, vec![7; 65]),
                Some(&mut graphics_queue),
            )
            .is_err());
        assert_eq!(device.submit_count(), 1);
        assert!(graphics_queue.command_list().unwrap().is_empty());
    }

    #[test]
    fn test_readback_sees_earlier_uploads_in_its_bucket() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let mut graphics_queue = create_recording_queue(&device);
        let buffer = create_buffer(&device);
        let order = Arc::new(Mutex::new(Vec::new()));

        let upload_order = order.clone();
        tasks
            .push(
                GpuTaskPriority::EndOfFrame,
                BufferUploadTask::new(buffer.clone(), 0, vec![9; 4]).with_on_completed(
                    move |result| {
                        assert!(result.is_ok());
                        upload_order.lock().unwrap().push("upload");
                    },
                ),
                None,
            )
            .unwrap();

        let (on_completed, rx) = GpuTaskCompletion::readback_channel();
        let readback_order = order.clone();
        tasks
            .push(
                GpuTaskPriority::EndOfFrame,
                ReadbackTask::new((&buffer).into(), 0).with_on_completed(move |result| {
                    readback_order.lock().unwrap().push("readback");
                    on_completed(result);
                }),
                None,
            )
            .unwrap();

        assert_eq!(tasks.run_end_of_frame(1, Some(&mut graphics_queue)), 2);
        assert_eq!(rx.try_recv().unwrap().unwrap(), vec![9; 4]);
        assert_eq!(*order.lock().unwrap(), vec!["upload", "readback"]);
        assert_eq!(device.submit_count(), 1);
        assert_eq!(tasks.completed_count(), 2);
    }

    #[test]
    fn test_out_of_range_offset_is_reported() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let buffer = create_buffer(&device);

        let (first_completed, first_rx) = GpuTaskCompletion::channel();
        let (second_completed, second_rx) = GpuTaskCompletion::channel();
        tasks
            .push(
                GpuTaskPriority::EndOfFrame,
                BufferUploadTask::new(buffer.clone(), u64::MAX, vec![1])
                    .with_on_completed(first_completed),
                None,
            )
            .unwrap();
        tasks
            .push(
                GpuTaskPriority::EndOfFrame,
                BufferUploadTask::new(buffer, 0, vec![1; 4]).with_on_completed(second_completed),
                None,
            )
            .unwrap();

        assert_eq!(tasks.run_end_of_frame(1, None), 2);
        assert!(first_rx.try_recv().unwrap().is_err());
        assert!(second_rx.try_recv().unwrap().is_ok());
        assert_eq!(tasks.failed_count(), 1);
    }

    #[test]
    fn test_tasks_not_from_the_pool_do_not_grow_it() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let buffer = create_buffer(&device);

        for _ in 0..100 {
            tasks
                .push(
                    GpuTaskPriority::Immediate,
                    BufferUploadTask::new(buffer.clone(), 0, vec![1; 4]),
                    None,
                )
                .unwrap();
        }

        assert_eq!(tasks.pool().num_free(GpuTaskKind::BufferUpload), 4);
        assert_eq!(tasks.completed_count(), 100);
    }

    #[test]
    fn test_readback_range() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let buffer = create_buffer(&device);
        let resource = MoltenResource::from(&buffer);
        device
            .write_resource(&resource, 0, 0, &[1, 2, 3, 4])
            .unwrap();

        let (on_completed, rx) = GpuTaskCompletion::readback_channel();
        let mut task = tasks.acquire_readback();
        task.resource = Some(resource);
        task.byte_offset = 1;
        task.byte_count = Some(2);
        let task = task.with_on_completed(on_completed);
        tasks.push(GpuTaskPriority::Immediate, task, None).unwrap();

        assert_eq!(rx.try_recv().unwrap().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_context_push_from_another_thread() {
        let (device, mut tasks) = create_task_queue(Default::default());
        let buffer = create_buffer(&device);
        let context = tasks.context();

        assert!(context
            .push(
                GpuTaskPriority::Immediate,
                BufferUploadTask::new(buffer.clone(), 0, vec![0; 4]),
            )
            .unwrap_err()
            .is_invalid_operation());

        let (on_completed, rx) = GpuTaskCompletion::channel();
        let thread_buffer = buffer.clone();
        std::thread::spawn(move || {
            context
                .push(
                    GpuTaskPriority::StartOfFrame,
                    BufferUploadTask::new(thread_buffer, 0, vec![5; 4])
                        .with_on_completed(on_completed),
                )
                .unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(tasks.run_start_of_frame(1, None), 1);
        assert!(rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn test_drain_limit_leaves_remaining_tasks_queued() {
        let (device, mut tasks) = create_task_queue(GpuTaskQueueConfig {
            max_deferred_tasks_per_drain: 2,
            ..Default::default()
        });
        let buffer = create_buffer(&device);

        for _ in 0..3 {
            tasks
                .push(
                    GpuTaskPriority::EndOfFrame,
                    BufferUploadTask::new(buffer.clone(), 0, vec![1; 4]),
                    None,
                )
                .unwrap();
        }

        assert_eq!(tasks.run_end_of_frame(1, None), 2);
        assert_eq!(tasks.pending_count(GpuTaskPriority::EndOfFrame), 1);
        assert_eq!(tasks.run_end_of_frame(2, None), 1);
        assert_eq!(tasks.pending_count(GpuTaskPriority::EndOfFrame), 0);
    }
}
