use super::BindError;
use molten_api::{
    MoltenShaderInputSignature, MoltenVertexFormat, MoltenVertexLayout,
    MoltenVertexLayoutAttribute, MoltenVertexLayoutBuffer,
};
use std::sync::Arc;

struct VertexLayoutCacheEntry {
    vertex_formats: Vec<Option<Arc<MoltenVertexFormat>>>,
    signature: MoltenShaderInputSignature,
    layout: Arc<MoltenVertexLayout>,
}

/// Memoizes input layouts by (bound vertex formats, vertex shader input signature).
///
/// Building a layout means matching every input of the shader against the elements of the bound
/// vertex buffers, so it only happens the first time a combination is seen. Lookups return the
/// same `Arc` every time for a given key. Entries are never evicted, the number of distinct
/// combinations in a program is small.
#[derive(Default)]
pub struct VertexLayoutCache {
    entries: Vec<VertexLayoutCacheEntry>,
    key_scratch: Vec<Option<Arc<MoltenVertexFormat>>>,
    hits: u64,
    misses: u64,
}

impl VertexLayoutCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return the layout that feeds `signature` from vertex buffers with the given formats, one
    /// per input assembler slot (`None` for an empty slot). Fails if some input of the signature
    /// is not provided by any of the formats. Failures are not cached.
    pub fn get_or_create<'a, I: IntoIterator<Item = Option<&'a Arc<MoltenVertexFormat>>>>(
        &mut self,
        vertex_formats: I,
        signature: &MoltenShaderInputSignature,
    ) -> Result<Arc<MoltenVertexLayout>, BindError> {
        self.key_scratch.clear();
        self.key_scratch
            .extend(vertex_formats.into_iter().map(|x| x.cloned()));
        while let Some(None) = self.key_scratch.last() {
            self.key_scratch.pop();
        }

        let key = &self.key_scratch;
        let existing = self
            .entries
            .iter()
            .find(|x| x.vertex_formats == *key && x.signature == *signature);

        if let Some(existing) = existing {
            self.hits += 1;
            return Ok(existing.layout.clone());
        }

        let layout = Arc::new(Self::build_layout(&self.key_scratch, signature)?);
        self.misses += 1;
        log::trace!(
            "Created vertex layout with {} attributes over {} buffers",
            layout.attributes.len(),
            layout.buffers.len()
        );

        self.entries.push(VertexLayoutCacheEntry {
            vertex_formats: self.key_scratch.clone(),
            signature: signature.clone(),
            layout: layout.clone(),
        });

        Ok(layout)
    }

    fn build_layout(
        vertex_formats: &[Option<Arc<MoltenVertexFormat>>],
        signature: &MoltenShaderInputSignature,
    ) -> Result<MoltenVertexLayout, BindError> {
        let buffers = vertex_formats
            .iter()
            .map(|vertex_format| match vertex_format {
                Some(vertex_format) => MoltenVertexLayoutBuffer {
                    stride: vertex_format.stride,
                    per_instance: vertex_format.per_instance,
                },
                None => MoltenVertexLayoutBuffer {
                    stride: 0,
                    per_instance: false,
                },
            })
            .collect();

        let mut attributes = Vec::with_capacity(signature.elements.len());
        for (location, input) in signature.elements.iter().enumerate() {
            // First buffer that provides the semantic feeds it
            let found = vertex_formats
                .iter()
                .enumerate()
                .find_map(|(buffer_index, vertex_format)| {
                    vertex_format
                        .as_ref()
                        .and_then(|x| x.find_element(&input.semantic))
                        .map(|element| (buffer_index, element))
                });

            let (buffer_index, element) =
                found.ok_or_else(|| BindError::InvalidVertexLayout(input.semantic.clone()))?;

            attributes.push(MoltenVertexLayoutAttribute {
                format: element.format,
                buffer_index: buffer_index as u32,
                location: location as u32,
                byte_offset: element.byte_offset,
            });
        }

        Ok(MoltenVertexLayout {
            attributes,
            buffers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molten_api::MoltenFormat;

    fn position_normal() -> Arc<MoltenVertexFormat> {
        Arc::new(MoltenVertexFormat::packed(vec![
            ("POSITION", MoltenFormat::R32G32B32_SFLOAT),
            ("NORMAL", MoltenFormat::R32G32B32_SFLOAT),
        ]))
    }

    fn uv() -> Arc<MoltenVertexFormat> {
        Arc::new(MoltenVertexFormat::packed(vec![(
            "TEXCOORD",
            MoltenFormat::R32G32_SFLOAT,
        )]))
    }

    #[test]
    fn test_lookup_returns_identical_layout() {
        let mut cache = VertexLayoutCache::new();
        let signature = MoltenShaderInputSignature::default()
            .with_element("POSITION", MoltenFormat::R32G32B32_SFLOAT)
            .with_element("TEXCOORD", MoltenFormat::R32G32_SFLOAT);

        let a = position_normal();
        let b = uv();
        let first = cache
            .get_or_create(vec![Some(&a), Some(&b)], &signature)
            .unwrap();

        // Structurally equal formats in different allocations share the entry, trailing empty
        // slots don't matter
        let a2 = position_normal();
        let second = cache
            .get_or_create(vec![Some(&a2), Some(&b), None], &signature)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);

        assert_eq!(first.buffers.len(), 2);
        assert_eq!(first.attributes[0].buffer_index, 0);
        assert_eq!(first.attributes[0].byte_offset, 0);
        assert_eq!(first.attributes[1].buffer_index, 1);
        assert_eq!(first.attributes[1].location, 1);
    }

    #[test]
    fn test_missing_semantic_is_rejected() {
        let mut cache = VertexLayoutCache::new();
        let signature = MoltenShaderInputSignature::default()
            .with_element("POSITION", MoltenFormat::R32G32B32_SFLOAT)
            .with_element("COLOR", MoltenFormat::R32G32B32A32_SFLOAT);

        let a = position_normal();
        let result = cache.get_or_create(vec![Some(&a)], &signature);
        match result {
            Err(BindError::InvalidVertexLayout(semantic)) => assert_eq!(semantic, "COLOR"),
            _ => panic!("expected an invalid vertex layout"),
        }
        assert!(cache.is_empty());
    }
}
