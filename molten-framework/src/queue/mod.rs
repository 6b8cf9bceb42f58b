mod graphics_queue;
pub use graphics_queue::GraphicsQueue;
pub use graphics_queue::GraphicsQueueBeginFlags;
pub use graphics_queue::GraphicsQueueConfig;
pub use graphics_queue::GraphicsQueueSubmitFlags;

mod profiler;
pub use profiler::GraphicsQueueProfiler;

mod resource_stream;
pub use resource_stream::ResourceStream;
