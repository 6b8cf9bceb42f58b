//! Deferred and immediate GPU work: texture resizes, uploads and readbacks, scheduled relative to
//! the frame.

mod gpu_task;
pub use gpu_task::BufferUploadTask;
pub use gpu_task::GpuReadbackCallback;
pub use gpu_task::GpuTask;
pub use gpu_task::GpuTaskCallback;
pub use gpu_task::GpuTaskKind;
pub use gpu_task::GpuTaskPriority;
pub use gpu_task::ReadbackTask;
pub use gpu_task::TextureResizeTask;
pub use gpu_task::TextureUploadTask;

mod task_pool;
pub use task_pool::GpuTaskPool;

mod task_queue;
pub use task_queue::GpuTaskQueue;
pub use task_queue::GpuTaskQueueConfig;
pub use task_queue::GpuTaskQueueContext;

mod completion;
pub use completion::GpuTaskCompletion;
