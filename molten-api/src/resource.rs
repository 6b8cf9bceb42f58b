use crate::{MoltenBuffer, MoltenTexture};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identifier for a GPU object. Ids are never reused within a process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoltenResourceId(u64);

impl MoltenResourceId {
    pub fn next() -> Self {
        static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);
        MoltenResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Either kind of resource that holds data (and so can be mapped, copied, uploaded to, or read
/// back)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoltenResource {
    Buffer(MoltenBuffer),
    Texture(MoltenTexture),
}

impl MoltenResource {
    pub fn id(&self) -> MoltenResourceId {
        match self {
            MoltenResource::Buffer(buffer) => buffer.id(),
            MoltenResource::Texture(texture) => texture.id(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            MoltenResource::Buffer(buffer) => buffer.is_disposed(),
            MoltenResource::Texture(texture) => texture.is_disposed(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            MoltenResource::Buffer(buffer) => buffer.version(),
            MoltenResource::Texture(texture) => texture.version(),
        }
    }

    /// Bump the version counter after a successful mutation. Returns the new version.
    pub fn mark_modified(&self) -> u64 {
        match self {
            MoltenResource::Buffer(buffer) => buffer.mark_modified(),
            MoltenResource::Texture(texture) => texture.mark_modified(),
        }
    }

    /// Claim the resource's single mapping. Returns false if it is already mapped, by anyone.
    pub fn try_begin_map(&self) -> bool {
        match self {
            MoltenResource::Buffer(buffer) => buffer.try_begin_map(),
            MoltenResource::Texture(texture) => texture.try_begin_map(),
        }
    }

    /// Release the mapping. Returns false if the resource was not mapped.
    pub fn end_map(&self) -> bool {
        match self {
            MoltenResource::Buffer(buffer) => buffer.end_map(),
            MoltenResource::Texture(texture) => texture.end_map(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        match self {
            MoltenResource::Buffer(buffer) => buffer.is_mapped(),
            MoltenResource::Texture(texture) => texture.is_mapped(),
        }
    }

    /// Size in bytes of the given subresource, or None if the subresource does not exist
    pub fn subresource_byte_size(
        &self,
        subresource: u32,
    ) -> Option<u64> {
        match self {
            MoltenResource::Buffer(buffer) => {
                if subresource == 0 {
                    Some(buffer.buffer_def().size)
                } else {
                    None
                }
            }
            MoltenResource::Texture(texture) => {
                texture.texture_def().subresource_byte_size(subresource)
            }
        }
    }
}

impl From<MoltenBuffer> for MoltenResource {
    fn from(buffer: MoltenBuffer) -> Self {
        MoltenResource::Buffer(buffer)
    }
}

impl From<&MoltenBuffer> for MoltenResource {
    fn from(buffer: &MoltenBuffer) -> Self {
        MoltenResource::Buffer(buffer.clone())
    }
}

impl From<MoltenTexture> for MoltenResource {
    fn from(texture: MoltenTexture) -> Self {
        MoltenResource::Texture(texture)
    }
}

impl From<&MoltenTexture> for MoltenResource {
    fn from(texture: &MoltenTexture) -> Self {
        MoltenResource::Texture(texture.clone())
    }
}
