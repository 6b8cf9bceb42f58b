use crate::{MoltenResourceId, MoltenShaderDef, MoltenShaderInputSignature, MoltenShaderStage};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct MoltenShaderInner {
    id: MoltenResourceId,
    shader_def: MoltenShaderDef,
    disposed: AtomicBool,
}

/// A compiled shader for a single pipeline stage
#[derive(Debug, Clone)]
pub struct MoltenShader {
    inner: Arc<MoltenShaderInner>,
}

impl PartialEq for MoltenShader {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MoltenShader {}

impl Hash for MoltenShader {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl MoltenShader {
    pub fn new(shader_def: MoltenShaderDef) -> Self {
        MoltenShader {
            inner: Arc::new(MoltenShaderInner {
                id: MoltenResourceId::next(),
                shader_def,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> MoltenResourceId {
        self.inner.id
    }

    pub fn stage(&self) -> MoltenShaderStage {
        self.inner.shader_def.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.inner.shader_def.entry_point
    }

    pub fn input_signature(&self) -> Option<&MoltenShaderInputSignature> {
        self.inner.shader_def.input_signature.as_ref()
    }

    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}
