//! API-agnostic device contract for molten.
//!
//! The state-tracking core never talks to a native graphics API directly. It records
//! `MoltenCommand`s into a `MoltenCommandList`, and hands the list to a `MoltenDevice` to execute.
//! Resources (`MoltenBuffer`, `MoltenTexture`, `MoltenSampler`, `MoltenShader`) are cheap,
//! cloneable handles with a stable id and a version counter.
//!
//! A working in-memory backend is provided as `MoltenDeviceNull`.

pub use buffer::*;
pub use command_list::*;
pub use device::*;
pub use error::*;
pub use resource::*;
pub use sampler::*;
pub use shader::*;
pub use texture::*;
pub use types::*;

pub use backends::null;
pub use backends::null::MoltenDeviceNull;

mod backends;
mod types;

mod buffer;
mod command_list;
mod device;
mod error;
mod resource;
mod sampler;
mod shader;
mod texture;
