use crate::resource::{ResourceCategory, VariableBindingClass};
use thiserror::Error;

/// Why a sampler matched to an image by name is incompatible with it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SamplerMismatchReason {
    /// The sampler and the image don't have the same variable binding class.
    VariableClass {
        image: VariableBindingClass,
        sampler: VariableBindingClass,
    },
    /// The sampler is an array whose size differs from the image array size.
    ArraySize { image: u16, sampler: u16 },
}

/// Errors produced while building or querying shader resource descriptions.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResourceError {
    /// A category offset or the static sampler count doesn't fit in 16 bits.
    #[error("layout overflow: {count} {what} exceed the maximum offset ({})", u16::MAX)]
    LayoutOverflow { what: &'static str, count: usize },

    /// The sampler matched to an image by name is incompatible with it.
    ///
    /// This is not fatal: the image is left without a static sampler.
    #[error("sampler `{sampler}` cannot be assigned to `{image}`: {reason:?}")]
    SamplerAssignmentMismatch {
        image: String,
        sampler: String,
        reason: SamplerMismatchReason,
    },

    /// Category-relative index out of bounds.
    #[error("resource index {index} is out of range for {category:?} (count: {count})")]
    IndexOutOfRange {
        category: ResourceCategory,
        index: usize,
        count: usize,
    },

    /// A reflected resource declared an array size of zero, or one that doesn't fit in 16 bits.
    #[error("invalid array size for resource `{name}`: {array_size}")]
    InvalidArraySize { name: String, array_size: u32 },
}
