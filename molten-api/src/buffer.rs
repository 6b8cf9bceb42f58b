use crate::{MoltenBufferDef, MoltenResourceId};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct MoltenBufferInner {
    id: MoltenResourceId,
    buffer_def: MoltenBufferDef,
    version: AtomicU64,
    disposed: AtomicBool,
    mapped: AtomicBool,
}

/// A buffer that can be used by the GPU. Cloning is cheap and produces another handle to the same
/// buffer. Equality and hashing use the resource id.
///
/// Buffers are created by a `MoltenDevice`.
#[derive(Debug, Clone)]
pub struct MoltenBuffer {
    inner: Arc<MoltenBufferInner>,
}

impl PartialEq for MoltenBuffer {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MoltenBuffer {}

impl Hash for MoltenBuffer {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl MoltenBuffer {
    /// Backends call this after allocating the native buffer
    pub fn new(buffer_def: MoltenBufferDef) -> Self {
        MoltenBuffer {
            inner: Arc::new(MoltenBufferInner {
                id: MoltenResourceId::next(),
                buffer_def,
                version: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                mapped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> MoltenResourceId {
        self.inner.id
    }

    /// Return the metadata used to create the buffer
    pub fn buffer_def(&self) -> &MoltenBufferDef {
        &self.inner.buffer_def
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Bump the version counter after a successful mutation. Returns the new version.
    pub fn mark_modified(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Marks the buffer as no longer usable. Pending work referencing it will fail validation.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            log::trace!("Disposed buffer {:?}", self.inner.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Claim the buffer's single mapping. Returns false if it is already mapped.
    pub fn try_begin_map(&self) -> bool {
        self.inner
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the mapping. Returns false if the buffer was not mapped.
    pub fn end_map(&self) -> bool {
        self.inner.mapped.swap(false, Ordering::AcqRel)
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.mapped.load(Ordering::Acquire)
    }
}
