use crate::{MoltenExtents3D, MoltenFormat, MoltenResourceId, MoltenTextureDef};
use molten_base::{CallbackHandle, CallbackList};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Passed to `on_resize` callbacks after a texture has been resized
#[derive(Debug, Clone)]
pub struct MoltenTextureResizeEvent {
    pub texture_id: MoltenResourceId,
    pub old_def: MoltenTextureDef,
    pub new_def: MoltenTextureDef,
    pub version: u64,
    pub frame_index: u64,
}

#[derive(Debug)]
struct MoltenTextureInner {
    id: MoltenResourceId,
    texture_def: Mutex<MoltenTextureDef>,
    version: AtomicU64,
    last_frame_resized: AtomicU64,
    disposed: AtomicBool,
    mapped: AtomicBool,
    on_resize: Mutex<CallbackList<MoltenTextureResizeEvent>>,
}

/// An image that can be used by the GPU. Cloning is cheap and produces another handle to the same
/// texture. Equality and hashing use the resource id.
///
/// The shape of a texture can change over its lifetime (see `apply_resize`). Consumers that cache
/// dimensions should compare `version()` or `last_frame_resized()` before trusting their copy.
#[derive(Debug, Clone)]
pub struct MoltenTexture {
    inner: Arc<MoltenTextureInner>,
}

impl PartialEq for MoltenTexture {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MoltenTexture {}

impl Hash for MoltenTexture {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl MoltenTexture {
    /// Backends call this after allocating the native texture
    pub fn new(texture_def: MoltenTextureDef) -> Self {
        MoltenTexture {
            inner: Arc::new(MoltenTextureInner {
                id: MoltenResourceId::next(),
                texture_def: Mutex::new(texture_def),
                version: AtomicU64::new(0),
                last_frame_resized: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                mapped: AtomicBool::new(false),
                on_resize: Mutex::new(CallbackList::default()),
            }),
        }
    }

    pub fn id(&self) -> MoltenResourceId {
        self.inner.id
    }

    /// Return the current metadata of the texture. This changes when the texture is resized.
    pub fn texture_def(&self) -> MoltenTextureDef {
        self.inner.texture_def.lock().unwrap().clone()
    }

    pub fn extents(&self) -> MoltenExtents3D {
        self.inner.texture_def.lock().unwrap().extents
    }

    pub fn format(&self) -> MoltenFormat {
        self.inner.texture_def.lock().unwrap().format
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    pub fn last_frame_resized(&self) -> u64 {
        self.inner.last_frame_resized.load(Ordering::Acquire)
    }

    /// Bump the version counter after a successful mutation. Returns the new version.
    pub fn mark_modified(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records that the device resized this texture. Must only be called after the device-level
    /// resize succeeded. Bumps the version, records the frame, and fires `on_resize` callbacks in
    /// registration order. Returns the new version.
    pub fn apply_resize(
        &self,
        new_def: MoltenTextureDef,
        frame_index: u64,
    ) -> u64 {
        let old_def = {
            let mut texture_def = self.inner.texture_def.lock().unwrap();
            std::mem::replace(&mut *texture_def, new_def.clone())
        };

        let version = self.mark_modified();
        self.inner
            .last_frame_resized
            .store(frame_index, Ordering::Release);

        log::trace!(
            "Texture {:?} resized {:?} -> {:?} (version {})",
            self.inner.id,
            old_def.extents,
            new_def.extents,
            version
        );

        let event = MoltenTextureResizeEvent {
            texture_id: self.inner.id,
            old_def,
            new_def,
            version,
            frame_index,
        };

        // Callbacks must not register/unregister on this same texture
        self.inner.on_resize.lock().unwrap().invoke(&event);
        version
    }

    pub fn register_on_resize<F: FnMut(&MoltenTextureResizeEvent) + Send + 'static>(
        &self,
        callback: F,
    ) -> CallbackHandle {
        self.inner.on_resize.lock().unwrap().register(callback)
    }

    pub fn unregister_on_resize(
        &self,
        handle: CallbackHandle,
    ) -> bool {
        self.inner.on_resize.lock().unwrap().unregister(handle)
    }

    /// Marks the texture as no longer usable. Pending work referencing it will fail validation.
    /// Resize callbacks are dropped.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            self.inner.on_resize.lock().unwrap().clear();
            log::trace!("Disposed texture {:?}", self.inner.id);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Claim the texture's single mapping. Returns false if it is already mapped.
    pub fn try_begin_map(&self) -> bool {
        self.inner
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the mapping. Returns false if the texture was not mapped.
    pub fn end_map(&self) -> bool {
        self.inner.mapped.swap(false, Ordering::AcqRel)
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.mapped.load(Ordering::Acquire)
    }
}
