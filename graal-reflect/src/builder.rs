//! Construction of `ShaderResources` from reflected bindings.
use crate::{
    error::{ResourceError, SamplerMismatchReason},
    layout::{CategoryCounts, CategoryLayout},
    resource::{
        BindingModel, RawResource, ResourceCategory, ResourceDesc, ResourceLocation,
        VariableBindingClass, NO_STATIC_SAMPLER,
    },
    store::ShaderResources,
    Arena, ShaderStage,
};
use std::{fmt, ops::Range, sync::Arc};
use tracing::{debug, trace, trace_span, warn};

/// A sampler fixed at pipeline creation, bound to the separate sampler with the given name.
pub struct StaticSamplerDesc<S> {
    pub sampler_name: String,
    pub sampler: Arc<S>,
}

impl<S> StaticSamplerDesc<S> {
    pub fn new(sampler_name: impl Into<String>, sampler: Arc<S>) -> StaticSamplerDesc<S> {
        StaticSamplerDesc {
            sampler_name: sampler_name.into(),
            sampler,
        }
    }
}

impl<S> Clone for StaticSamplerDesc<S> {
    fn clone(&self) -> Self {
        StaticSamplerDesc {
            sampler_name: self.sampler_name.clone(),
            sampler: self.sampler.clone(),
        }
    }
}

impl<S> fmt::Debug for StaticSamplerDesc<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StaticSamplerDesc")
            .field("sampler_name", &self.sampler_name)
            .finish()
    }
}

/// Parameters for building shader resources.
#[derive(Debug)]
pub struct ShaderResourcesCreateInfo<S> {
    pub stage: ShaderStage,
    /// Suffix appended to an image name to find the sampler implicitly assigned to it
    /// (`g_Texture` + `_sampler`). `None` disables sampler assignment.
    pub combined_sampler_suffix: Option<String>,
    pub binding_model: BindingModel,
    pub static_samplers: Vec<StaticSamplerDesc<S>>,
}

impl<S> Default for ShaderResourcesCreateInfo<S> {
    fn default() -> Self {
        ShaderResourcesCreateInfo {
            stage: ShaderStage::Unknown,
            combined_sampler_suffix: Some("_sampler".to_string()),
            binding_model: BindingModel::Combined,
            static_samplers: vec![],
        }
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput<'a, S> {
    pub resources: ShaderResources<'a, S>,
    /// Non-fatal problems found while assigning static samplers.
    pub diagnostics: Vec<ResourceError>,
}

/// Result of the counting pass.
struct ResourceCounts {
    categories: CategoryCounts,
    num_static_samplers: usize,
    name_pool_size: usize,
}

fn static_sampler_for<'c, S>(
    create_info: &'c ShaderResourcesCreateInfo<S>,
    name: &str,
) -> Option<&'c StaticSamplerDesc<S>> {
    create_info
        .static_samplers
        .iter()
        .find(|s| s.sampler_name == name)
}

fn count_resources<S>(
    create_info: &ShaderResourcesCreateInfo<S>,
    raw: &[RawResource],
) -> Result<ResourceCounts, ResourceError> {
    let mut counts = ResourceCounts {
        categories: CategoryCounts::new(),
        num_static_samplers: 0,
        name_pool_size: 0,
    };

    for r in raw {
        if r.array_size == 0 || r.array_size > u16::MAX as u32 {
            return Err(ResourceError::InvalidArraySize {
                name: r.name.to_string(),
                array_size: r.array_size,
            });
        }
        let category = r.kind.category(create_info.binding_model);
        counts.categories[category] += 1;
        if category == ResourceCategory::SeparateSampler
            && static_sampler_for(create_info, r.base_name()).is_some()
        {
            counts.num_static_samplers += 1;
        }
        // array subscripts are not stored
        counts.name_pool_size += r.base_name().len() + 1;
    }

    Ok(counts)
}

/// Copies all names into a single pool, returning the pool and the range of each name.
fn intern_names<'a>(
    arena: &'a Arena,
    raw: &[RawResource],
    pool_size: usize,
) -> (&'a str, Vec<Range<usize>>) {
    let mut pool = bumpalo::collections::String::with_capacity_in(pool_size, &arena.0);
    let mut ranges = Vec::with_capacity(raw.len());
    for r in raw {
        let start = pool.len();
        pool.push_str(r.base_name());
        ranges.push(start..pool.len());
        pool.push('\0');
    }
    debug_assert_eq!(pool.len(), pool_size);
    (pool.into_bump_str(), ranges)
}

/// Whether `sampler_name` is `image_name` followed by `suffix`.
fn is_sampler_name(sampler_name: &str, image_name: &str, suffix: &str) -> bool {
    sampler_name.len() == image_name.len() + suffix.len()
        && sampler_name.starts_with(image_name)
        && sampler_name.ends_with(suffix)
}

/// Assigns static samplers to images by name, returning the mismatches between images and the
/// samplers matched to them, static or not.
fn assign_static_samplers(
    layout: &CategoryLayout,
    resources: &mut [ResourceDesc],
    suffix: &str,
) -> Vec<ResourceError> {
    let mut diagnostics = Vec::new();
    let samplers = layout.range(ResourceCategory::SeparateSampler);

    for i in 0..resources.len() {
        if !resources[i].category.accepts_static_sampler() {
            continue;
        }
        let image = resources[i];
        let sampler = match resources[samplers.clone()]
            .iter()
            .find(|s| is_sampler_name(s.name, image.name, suffix))
        {
            Some(sampler) => *sampler,
            None => continue,
        };

        let reason = if sampler.variable_class != image.variable_class {
            Some(SamplerMismatchReason::VariableClass {
                image: image.variable_class,
                sampler: sampler.variable_class,
            })
        } else if sampler.array_size != 1 && sampler.array_size != image.array_size {
            Some(SamplerMismatchReason::ArraySize {
                image: image.array_size,
                sampler: sampler.array_size,
            })
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(
                image = image.name,
                sampler = sampler.name,
                ?reason,
                "sampler is incompatible with the image it is assigned to"
            );
            diagnostics.push(ResourceError::SamplerAssignmentMismatch {
                image: image.name.to_string(),
                sampler: sampler.name.to_string(),
                reason,
            });
            continue;
        }

        if !sampler.has_static_sampler() {
            trace!(
                image = image.name,
                sampler = sampler.name,
                "sampler is not static, leaving unassigned"
            );
            continue;
        }

        resources[i].static_sampler_index = sampler.static_sampler_index;
    }

    diagnostics
}

impl<'a, S> ShaderResources<'a, S> {
    /// Runs the counting pass over the reflected bindings and returns the layout that
    /// `ShaderResources::new` will produce for them.
    ///
    /// `CategoryLayout::size` is the number of arena bytes the build takes, which can be used
    /// to size the arena beforehand (see `Arena::with_capacity`).
    pub fn plan(
        create_info: &ShaderResourcesCreateInfo<S>,
        raw: &[RawResource],
    ) -> Result<CategoryLayout, ResourceError> {
        let counts = count_resources(create_info, raw)?;
        CategoryLayout::for_type::<ResourceDesc>(
            &counts.categories,
            counts.num_static_samplers,
            counts.name_pool_size,
        )
    }

    /// Builds the resource description of a shader from the bindings extracted by a reflector.
    ///
    /// All storage is allocated in `arena`. Resources keep their relative order within
    /// their category. On error, nothing is returned and the arena is left untouched.
    pub fn new(
        arena: &'a Arena,
        create_info: &ShaderResourcesCreateInfo<S>,
        raw: &[RawResource],
    ) -> Result<BuildOutput<'a, S>, ResourceError> {
        let _span = trace_span!("build_shader_resources", stage = ?create_info.stage).entered();

        // --- count
        let layout = Self::plan(create_info, raw)?;
        trace!(
            total = layout.total_count(),
            static_samplers = layout.num_static_samplers(),
            name_pool_size = layout.name_pool_size,
            size = layout.size,
            "shader resource layout"
        );

        // --- construct
        let placeholder = ResourceDesc {
            name: "",
            array_size: 1,
            category: ResourceCategory::ConstantBuffer,
            variable_class: VariableBindingClass::Static,
            static_sampler_index: NO_STATIC_SAMPLER,
            location: ResourceLocation::Unspecified,
        };
        let resources = arena
            .0
            .alloc_slice_fill_copy(layout.total_count() as usize, placeholder);
        let (names, name_ranges) = intern_names(arena, raw, layout.name_pool_size);

        let mut cursors = [0usize; ResourceCategory::COUNT];
        for &category in ResourceCategory::ALL.iter() {
            cursors[category.index()] = layout.offset(category) as usize;
        }

        let mut static_samplers = Vec::with_capacity(layout.num_static_samplers() as usize);
        for (r, name_range) in raw.iter().zip(name_ranges) {
            let category = r.kind.category(create_info.binding_model);
            let name = &names[name_range];

            let mut static_sampler_index = NO_STATIC_SAMPLER;
            if category == ResourceCategory::SeparateSampler {
                if let Some(desc) = static_sampler_for(create_info, name) {
                    static_sampler_index = static_samplers.len() as i32;
                    static_samplers.push(desc.sampler.clone());
                }
            }

            let slot = &mut cursors[category.index()];
            resources[*slot] = ResourceDesc {
                name,
                // checked in count_resources
                array_size: r.array_size as u16,
                category,
                variable_class: r.variable_class,
                static_sampler_index,
                location: r.location,
            };
            *slot += 1;
        }
        debug_assert_eq!(static_samplers.len(), layout.num_static_samplers() as usize);

        for desc in create_info.static_samplers.iter() {
            if !resources[layout.range(ResourceCategory::SeparateSampler)]
                .iter()
                .any(|s| s.name == desc.sampler_name)
            {
                debug!(
                    sampler = desc.sampler_name.as_str(),
                    "static sampler not found in shader"
                );
            }
        }

        // --- resolve static samplers
        let diagnostics = match create_info.combined_sampler_suffix {
            Some(ref suffix) if !suffix.is_empty() => {
                assign_static_samplers(&layout, resources, suffix)
            }
            _ => vec![],
        };

        Ok(BuildOutput {
            resources: ShaderResources {
                stage: create_info.stage,
                layout,
                resources,
                static_samplers: static_samplers.into_boxed_slice(),
                names,
            },
            diagnostics,
        })
    }
}
