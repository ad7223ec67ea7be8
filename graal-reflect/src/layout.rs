//! Layout of the packed resource storage.
//!
//! The descriptors and the names of a shader are stored in the arena, as follows:
//!
//! ```text
//! | CBs | RO SBs | RW SBs | UTBs | STBs | SmplImgs | StrgImgs | ACs | SepImgs | SepSmpls | Names |
//! ```
//!
//! Category boundaries are 16-bit offsets into the descriptor array. Static sampler handles are
//! reference-counted and live outside of the arena, in a table indexed from 0.
use crate::{error::ResourceError, resource::ResourceCategory};
use std::{
    alloc,
    ops::{Index, IndexMut, Range},
};

fn round_up(value: usize, multiple: usize) -> usize {
    if multiple == 0 {
        return value;
    }
    let remainder = value % multiple;
    if remainder == 0 {
        return value;
    }
    value + multiple - remainder
}

/// Number of resources in each category.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct CategoryCounts([usize; ResourceCategory::COUNT]);

impl CategoryCounts {
    pub fn new() -> CategoryCounts {
        CategoryCounts::default()
    }

    /// Sum over all categories.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Iterates over `(category, count)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceCategory, usize)> + '_ {
        ResourceCategory::ALL.iter().map(move |&c| (c, self.0[c.index()]))
    }
}

impl Index<ResourceCategory> for CategoryCounts {
    type Output = usize;
    fn index(&self, category: ResourceCategory) -> &usize {
        &self.0[category.index()]
    }
}

impl IndexMut<ResourceCategory> for CategoryCounts {
    fn index_mut(&mut self, category: ResourceCategory) -> &mut usize {
        &mut self.0[category.index()]
    }
}

/// Position of each part of the packed resource storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CategoryLayout {
    /// Start of each category in the descriptor array. The last entry is the total count.
    offsets: [u16; ResourceCategory::COUNT + 1],
    num_static_samplers: u16,
    /// Byte offset of the name pool, right after the descriptor array.
    pub name_pool_start: usize,
    /// Size of the name pool in bytes.
    pub name_pool_size: usize,
    /// Number of arena bytes taken by the descriptors and the name pool, rounded up to the
    /// descriptor alignment.
    pub size: usize,
}

impl CategoryLayout {
    /// Computes the layout of a block holding descriptors of the given memory layout.
    pub fn new(
        counts: &CategoryCounts,
        num_static_samplers: usize,
        name_pool_size: usize,
        descriptor: alloc::Layout,
    ) -> Result<CategoryLayout, ResourceError> {
        let max_offset = u16::MAX as usize;
        let mut offsets = [0u16; ResourceCategory::COUNT + 1];
        let mut offset = 0usize;
        for (category, count) in counts.iter() {
            offset += count;
            if offset > max_offset {
                return Err(ResourceError::LayoutOverflow {
                    what: category_label(category),
                    count: offset,
                });
            }
            offsets[category.index() + 1] = offset as u16;
        }

        if num_static_samplers > max_offset {
            return Err(ResourceError::LayoutOverflow {
                what: "static samplers",
                count: num_static_samplers,
            });
        }

        let name_pool_start = offset * descriptor.size();
        let size = round_up(name_pool_start + name_pool_size, descriptor.align());

        Ok(CategoryLayout {
            offsets,
            num_static_samplers: num_static_samplers as u16,
            name_pool_start,
            name_pool_size,
            size,
        })
    }

    /// Computes the layout for descriptors of type `D`.
    pub fn for_type<D>(
        counts: &CategoryCounts,
        num_static_samplers: usize,
        name_pool_size: usize,
    ) -> Result<CategoryLayout, ResourceError> {
        CategoryLayout::new(
            counts,
            num_static_samplers,
            name_pool_size,
            alloc::Layout::new::<D>(),
        )
    }

    /// Index of the first resource of the category in the descriptor array.
    pub fn offset(&self, category: ResourceCategory) -> u16 {
        self.offsets[category.index()]
    }

    pub fn count(&self, category: ResourceCategory) -> u16 {
        self.offsets[category.index() + 1] - self.offsets[category.index()]
    }

    /// Range of the category in the descriptor array.
    pub fn range(&self, category: ResourceCategory) -> Range<usize> {
        self.offsets[category.index()] as usize..self.offsets[category.index() + 1] as usize
    }

    /// Total number of resources.
    pub fn total_count(&self) -> u16 {
        self.offsets[ResourceCategory::COUNT]
    }

    pub fn num_static_samplers(&self) -> u16 {
        self.num_static_samplers
    }

    /// Returns the category of the resource at the given global index.
    pub fn category_of(&self, global_index: usize) -> Option<ResourceCategory> {
        ResourceCategory::ALL
            .iter()
            .copied()
            .find(|&c| self.range(c).contains(&global_index))
    }
}

fn category_label(category: ResourceCategory) -> &'static str {
    match category {
        ResourceCategory::ConstantBuffer => "constant buffers",
        ResourceCategory::ReadOnlyStorageBuffer => "read-only storage buffers",
        ResourceCategory::ReadWriteStorageBuffer => "read-write storage buffers",
        ResourceCategory::UniformTexelBuffer => "uniform texel buffers",
        ResourceCategory::StorageTexelBuffer => "storage texel buffers",
        ResourceCategory::SampledImage => "sampled images",
        ResourceCategory::StorageImage => "storage images",
        ResourceCategory::AtomicCounter => "atomic counters",
        ResourceCategory::SeparateImage => "separate images",
        ResourceCategory::SeparateSampler => "separate samplers",
    }
}
