//! Cache of objects keyed by resource layout.
use crate::{compat::ResourceSignature, store::ShaderResources};
use std::collections::HashMap;
use tracing::trace;

/// Associates values (pipeline layouts, descriptor set layouts...) to resource layouts.
///
/// Entries are looked up by structural hash, then confirmed with a full comparison, so that two
/// layouts with colliding hashes never share a value.
pub struct LayoutCache<V> {
    entries: HashMap<u64, Vec<(ResourceSignature, V)>>,
}

impl<V> Default for LayoutCache<V> {
    fn default() -> Self {
        LayoutCache {
            entries: HashMap::new(),
        }
    }
}

impl<V> LayoutCache<V> {
    pub fn new() -> LayoutCache<V> {
        LayoutCache::default()
    }

    /// Returns the value associated to a layout compatible with `resources`.
    pub fn get<S>(&self, resources: &ShaderResources<S>) -> Option<&V> {
        self.entries
            .get(&resources.structural_hash())?
            .iter()
            .find(|(sig, _)| sig.matches(resources))
            .map(|(_, v)| v)
    }

    /// Returns the value associated to a layout compatible with `resources`, creating it with
    /// `f` if there is none.
    pub fn get_or_insert_with<S>(
        &mut self,
        resources: &ShaderResources<S>,
        f: impl FnOnce() -> V,
    ) -> &V {
        let hash = resources.structural_hash();
        let bucket = self.entries.entry(hash).or_insert_with(Vec::new);
        let index = match bucket.iter().position(|(sig, _)| sig.matches(resources)) {
            Some(index) => index,
            None => {
                trace!(hash, "new resource layout");
                bucket.push((resources.signature(), f()));
                bucket.len() - 1
            }
        };
        &bucket[index].1
    }

    /// Number of distinct layouts.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }
}
