//! Packed shader resource storage.
use crate::{
    error::ResourceError,
    layout::{CategoryCounts, CategoryLayout},
    resource::{ResourceCategory, ResourceDesc, VariableClassMask},
    ShaderStage,
};
use std::{fmt, sync::Arc};

/// Per-category handlers invoked by `ShaderResources::for_each`.
///
/// Every method receives the resource and its index within the category.
#[allow(unused_variables)]
pub trait ResourceVisitor<'a> {
    fn constant_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn read_only_storage_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn read_write_storage_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn uniform_texel_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn storage_texel_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn sampled_image(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn storage_image(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn atomic_counter(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn separate_image(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
    fn separate_sampler(&mut self, resource: &ResourceDesc<'a>, index: usize) {}
}

/// Resources declared by a shader, grouped by category in a single allocation.
///
/// Built with `ShaderResources::new`. Immutable once built. The static sampler handles are
/// released when this object is dropped.
#[derive(Debug)]
pub struct ShaderResources<'a, S> {
    pub(crate) stage: ShaderStage,
    pub(crate) layout: CategoryLayout,
    /// Descriptors, grouped by category in layout order.
    pub(crate) resources: &'a [ResourceDesc<'a>],
    pub(crate) static_samplers: Box<[Arc<S>]>,
    /// Interned names, each followed by a NUL byte.
    pub(crate) names: &'a str,
}

impl<'a, S> ShaderResources<'a, S> {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn layout(&self) -> &CategoryLayout {
        &self.layout
    }

    /// Number of resources in the category.
    pub fn count(&self, category: ResourceCategory) -> usize {
        self.layout.count(category) as usize
    }

    pub fn total_count(&self) -> usize {
        self.layout.total_count() as usize
    }

    pub fn num_static_samplers(&self) -> usize {
        self.layout.num_static_samplers() as usize
    }

    /// Returns the resource at `index` within `category`.
    ///
    /// The index is only checked against the category size in debug builds. In release builds
    /// an out-of-range index may return a resource of another category.
    pub fn at(&self, category: ResourceCategory, index: usize) -> &ResourceDesc<'a> {
        debug_assert!(
            index < self.count(category),
            "resource index ({}) is out of range for {:?} (count: {})",
            index,
            category,
            self.count(category)
        );
        &self.resources[self.layout.offset(category) as usize + index]
    }

    /// Returns the resource at `index` within `category`, with bounds checking.
    pub fn get(
        &self,
        category: ResourceCategory,
        index: usize,
    ) -> Result<&ResourceDesc<'a>, ResourceError> {
        let count = self.count(category);
        if index >= count {
            return Err(ResourceError::IndexOutOfRange {
                category,
                index,
                count,
            });
        }
        Ok(&self.resources[self.layout.offset(category) as usize + index])
    }

    /// Returns the resource at the given index in the whole descriptor array.
    pub fn at_global(&self, index: usize) -> &ResourceDesc<'a> {
        &self.resources[index]
    }

    /// All resources of the category.
    pub fn resources(&self, category: ResourceCategory) -> &[ResourceDesc<'a>] {
        &self.resources[self.layout.range(category)]
    }

    /// All resources, grouped by category.
    pub fn all_resources(&self) -> &[ResourceDesc<'a>] {
        self.resources
    }

    /// Returns the static sampler assigned to the resource, if any.
    pub fn static_sampler(&self, resource: &ResourceDesc) -> Option<&Arc<S>> {
        if resource.static_sampler_index < 0 {
            return None;
        }
        let index = resource.static_sampler_index as usize;
        debug_assert!(
            index < self.static_samplers.len(),
            "static sampler index ({}) is out of range (count: {})",
            index,
            self.static_samplers.len()
        );
        self.static_samplers.get(index)
    }

    /// Size of the name pool, in bytes.
    pub fn name_pool_size(&self) -> usize {
        self.names.len()
    }

    /// Visits every resource whose variable class is in `allowed`, category by category.
    pub fn for_each(&self, allowed: VariableClassMask, visitor: &mut impl ResourceVisitor<'a>) {
        for &category in ResourceCategory::ALL.iter() {
            for (index, res) in self.resources(category).iter().enumerate() {
                if !allowed.allows(res.variable_class) {
                    continue;
                }
                match category {
                    ResourceCategory::ConstantBuffer => visitor.constant_buffer(res, index),
                    ResourceCategory::ReadOnlyStorageBuffer => {
                        visitor.read_only_storage_buffer(res, index)
                    }
                    ResourceCategory::ReadWriteStorageBuffer => {
                        visitor.read_write_storage_buffer(res, index)
                    }
                    ResourceCategory::UniformTexelBuffer => {
                        visitor.uniform_texel_buffer(res, index)
                    }
                    ResourceCategory::StorageTexelBuffer => {
                        visitor.storage_texel_buffer(res, index)
                    }
                    ResourceCategory::SampledImage => visitor.sampled_image(res, index),
                    ResourceCategory::StorageImage => visitor.storage_image(res, index),
                    ResourceCategory::AtomicCounter => visitor.atomic_counter(res, index),
                    ResourceCategory::SeparateImage => visitor.separate_image(res, index),
                    ResourceCategory::SeparateSampler => visitor.separate_sampler(res, index),
                }
            }
        }
    }

    /// Calls `f` with every resource whose variable class is in `allowed`, along with its
    /// index within its category.
    pub fn for_each_resource(
        &self,
        allowed: VariableClassMask,
        mut f: impl FnMut(&ResourceDesc<'a>, usize),
    ) {
        for &category in ResourceCategory::ALL.iter() {
            self.resources(category)
                .iter()
                .enumerate()
                .filter(|(_, res)| allowed.allows(res.variable_class))
                .for_each(|(index, res)| f(res, index));
        }
    }

    /// Counts the bindable resources whose variable class is in `allowed`.
    ///
    /// Static samplers are not bindable and are skipped.
    pub fn count_resources(&self, allowed: VariableClassMask) -> CategoryCounts {
        let mut counts = CategoryCounts::new();
        self.for_each_resource(allowed, |res, _| {
            if res.category == ResourceCategory::SeparateSampler && res.has_static_sampler() {
                return;
            }
            counts[res.category] += 1;
        });
        counts
    }

    /// Returns a human-readable listing of all resources.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl<'a, S> fmt::Display for ShaderResources<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Shader resources ({:?}): {} resource(s), {} static sampler(s)",
            self.stage,
            self.total_count(),
            self.num_static_samplers()
        )?;
        let mut current = None;
        for (i, res) in self.resources.iter().enumerate() {
            let category = match self.layout.category_of(i) {
                Some(category) => category,
                None => break,
            };
            if current != Some(category) {
                writeln!(f, "  {:?} ({}):", category, self.count(category))?;
                current = Some(category);
            }
            let index = i - self.layout.offset(category) as usize;
            writeln!(f, "    {:2}: {}", index, res)?;
        }
        Ok(())
    }
}
