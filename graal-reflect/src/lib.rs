//! Shader resource reflection.
//!
//! Organizes the resource bindings extracted from compiled shaders (uniform buffers, storage
//! buffers, images, samplers...) into a compact, queryable description, and compares these
//! descriptions to find out whether pipeline layouts can be shared.
//!
//! Building a description is done in two passes over the reflected bindings: the first counts
//! resources by category, the second places them in a single array grouped by category. All
//! storage comes from an `Arena` provided by the caller.
mod builder;
mod cache;
mod compat;
mod error;
mod layout;
mod resource;
mod store;

pub use crate::builder::{BuildOutput, ShaderResourcesCreateInfo, StaticSamplerDesc};
pub use crate::cache::LayoutCache;
pub use crate::compat::{ResourceSignature, SlotShape};
pub use crate::error::{ResourceError, SamplerMismatchReason};
pub use crate::layout::{CategoryCounts, CategoryLayout};
pub use crate::resource::{
    BindingModel, RawResource, RawResourceKind, ResourceCategory, ResourceDesc,
    ResourceLocation, VariableBindingClass, VariableClassMask, NO_STATIC_SAMPLER,
};
pub use crate::store::{ResourceVisitor, ShaderResources};

/// An arena allocator used to store shader resource descriptions.
#[derive(Debug, Default)]
pub struct Arena(bumpalo::Bump);

impl Arena {
    pub fn new() -> Arena {
        Arena(bumpalo::Bump::new())
    }

    /// Creates an arena with room for `bytes` bytes.
    ///
    /// A single build takes `CategoryLayout::size` bytes, as returned by `ShaderResources::plan`.
    pub fn with_capacity(bytes: usize) -> Arena {
        Arena(bumpalo::Bump::with_capacity(bytes))
    }
}

/// Shader stage a set of resources belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ShaderStage {
    Unknown,
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}
