mod slot;
pub use slot::Slot;

mod slot_group;
pub use slot_group::SlotGroup;

mod bind_result;
pub use bind_result::BindError;
pub use bind_result::GraphicsBindResult;

mod vertex_layout_cache;
pub use vertex_layout_cache::VertexLayoutCache;

mod stages;
pub use stages::InputAssemblerStage;
pub use stages::OutputMergerStage;
pub use stages::ShaderStage;

mod graphics_state;
pub use graphics_state::DrawInfo;
pub use graphics_state::GraphicsState;
