pub use molten_base as base;

pub use molten_api as api;

#[cfg(feature = "framework")]
pub use molten_framework as framework;

#[cfg(feature = "framework")]
pub use molten_framework::chain;

#[cfg(feature = "framework")]
pub use molten_framework::tasks;
