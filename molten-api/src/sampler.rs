use crate::{MoltenResourceId, MoltenSamplerDef};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct MoltenSamplerInner {
    id: MoltenResourceId,
    sampler_def: MoltenSamplerDef,
}

/// Configures how images will be sampled by the GPU
#[derive(Debug, Clone)]
pub struct MoltenSampler {
    inner: Arc<MoltenSamplerInner>,
}

impl PartialEq for MoltenSampler {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MoltenSampler {}

impl Hash for MoltenSampler {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl MoltenSampler {
    pub fn new(sampler_def: MoltenSamplerDef) -> Self {
        MoltenSampler {
            inner: Arc::new(MoltenSamplerInner {
                id: MoltenResourceId::next(),
                sampler_def,
            }),
        }
    }

    pub fn id(&self) -> MoltenResourceId {
        self.inner.id
    }

    pub fn sampler_def(&self) -> &MoltenSamplerDef {
        &self.inner.sampler_def
    }
}
