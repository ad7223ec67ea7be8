//! Structural comparison and hashing of shader resources.
//!
//! Two sets of resources are compatible when they have the same number of resources in each
//! category and the resources in the same slots have the same shape: array size, category,
//! variable class, and presence of a static sampler. Names are not compared.
use crate::{
    resource::{ResourceCategory, ResourceDesc, VariableBindingClass},
    store::ShaderResources,
};
use fnv::FnvHasher;
use std::hash::Hasher;

/// Shape of a single resource slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SlotShape {
    pub array_size: u16,
    pub category: ResourceCategory,
    pub variable_class: VariableBindingClass,
    pub has_static_sampler: bool,
}

impl<'a> From<&ResourceDesc<'a>> for SlotShape {
    fn from(res: &ResourceDesc<'a>) -> Self {
        SlotShape {
            array_size: res.array_size,
            category: res.category,
            variable_class: res.variable_class,
            has_static_sampler: res.has_static_sampler(),
        }
    }
}

fn write_shape(hasher: &mut FnvHasher, shape: SlotShape) {
    hasher.write_u16(shape.array_size);
    hasher.write_u8(shape.category as u8);
    hasher.write_u8(shape.variable_class as u8);
    hasher.write_u8(shape.has_static_sampler as u8);
}

/// Counts first, then every slot in category order.
fn hash_shapes(counts: impl Iterator<Item = u16>, slots: impl Iterator<Item = SlotShape>) -> u64 {
    let mut hasher = FnvHasher::default();
    for count in counts {
        hasher.write_u16(count);
    }
    for slot in slots {
        write_shape(&mut hasher, slot);
    }
    hasher.finish()
}

/// Owned copy of the binding shape of a `ShaderResources` object.
///
/// Does not borrow the resources, so it can be stored as a cache key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResourceSignature {
    counts: [u16; ResourceCategory::COUNT],
    slots: Box<[SlotShape]>,
}

impl ResourceSignature {
    pub fn new<S>(resources: &ShaderResources<S>) -> ResourceSignature {
        let mut counts = [0u16; ResourceCategory::COUNT];
        for &category in ResourceCategory::ALL.iter() {
            counts[category.index()] = resources.layout().count(category);
        }
        ResourceSignature {
            counts,
            slots: resources.all_resources().iter().map(SlotShape::from).collect(),
        }
    }

    pub fn count(&self, category: ResourceCategory) -> usize {
        self.counts[category.index()] as usize
    }

    pub fn slots(&self) -> &[SlotShape] {
        &self.slots
    }

    /// Same value as `ShaderResources::structural_hash` on the resources this was created from.
    pub fn structural_hash(&self) -> u64 {
        hash_shapes(self.counts.iter().copied(), self.slots.iter().copied())
    }

    /// Returns whether the resources have the shape described by this signature.
    pub fn matches<S>(&self, resources: &ShaderResources<S>) -> bool {
        ResourceCategory::ALL
            .iter()
            .all(|&c| self.count(c) == resources.count(c))
            && self
                .slots
                .iter()
                .zip(resources.all_resources())
                .all(|(&slot, res)| slot == SlotShape::from(res))
    }
}

impl<'a, S> ShaderResources<'a, S> {
    /// Returns whether the resources of `other` have the same binding shape as these.
    ///
    /// Resources are matched by category and position, not by name. Never fails: resources
    /// with different shapes are simply incompatible.
    pub fn is_compatible_with<T>(&self, other: &ShaderResources<T>) -> bool {
        if ResourceCategory::ALL
            .iter()
            .any(|&c| self.count(c) != other.count(c))
        {
            return false;
        }
        self.all_resources()
            .iter()
            .zip(other.all_resources())
            .all(|(a, b)| a.is_compatible_with(b))
    }

    /// Hash of the binding shape.
    ///
    /// Compatible resources have equal hashes. The converse doesn't hold; use this only to
    /// pre-filter before `is_compatible_with`. Stable across runs.
    pub fn structural_hash(&self) -> u64 {
        hash_shapes(
            ResourceCategory::ALL
                .iter()
                .map(|&c| self.layout().count(c)),
            self.all_resources().iter().map(SlotShape::from),
        )
    }

    pub fn signature(&self) -> ResourceSignature {
        ResourceSignature::new(self)
    }
}
