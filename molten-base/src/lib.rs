//! Lowest level crate of `molten`. Includes a free-list for reusable objects and ordered callback
//! lists.

mod free_list;
pub use free_list::FreeList;

mod callback_list;
pub use callback_list::CallbackHandle;
pub use callback_list::CallbackList;
