use graal_reflect::{
    Arena, BindingModel, LayoutCache, RawResource, RawResourceKind, ResourceCategory,
    ResourceDesc, ResourceError, ResourceLocation, ResourceVisitor, ShaderResources,
    ShaderResourcesCreateInfo, ShaderStage, StaticSamplerDesc, VariableBindingClass,
    VariableClassMask,
};
use std::sync::Arc;

use RawResourceKind as K;
use VariableBindingClass as V;

#[derive(Debug)]
struct Sampler {
    id: u32,
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn create_info(static_samplers: &[(&str, Arc<Sampler>)]) -> ShaderResourcesCreateInfo<Sampler> {
    ShaderResourcesCreateInfo {
        stage: ShaderStage::Fragment,
        static_samplers: static_samplers
            .iter()
            .map(|(name, s)| StaticSamplerDesc::new(*name, s.clone()))
            .collect(),
        ..Default::default()
    }
}

fn build<'a>(
    arena: &'a Arena,
    raw: &[RawResource],
    static_samplers: &[(&str, Arc<Sampler>)],
) -> ShaderResources<'a, Sampler> {
    let out = ShaderResources::new(arena, &create_info(static_samplers), raw).unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    out.resources
}

/// A shader touching every category.
fn all_categories() -> Vec<RawResource<'static>> {
    vec![
        RawResource::new("t_Color", K::CombinedImageSampler, V::Mutable),
        RawResource::new("u_Globals", K::UniformBuffer, V::Static),
        RawResource::new("b_Particles", K::StorageBuffer { read_only: true }, V::Dynamic),
        RawResource::new("b_Output", K::StorageBuffer { read_only: false }, V::Dynamic),
        RawResource::new("u_Object", K::UniformBuffer, V::Dynamic),
        RawResource::new("tb_Lut", K::UniformTexelBuffer, V::Static),
        RawResource::new("tb_Out", K::StorageTexelBuffer, V::Mutable),
        RawResource::new("i_Target", K::StorageImage, V::Mutable),
        RawResource::new("ac_Counter", K::AtomicCounter, V::Static),
        RawResource::new("t_Shadow", K::SeparateImage, V::Mutable).array_size(4),
        RawResource::new("s_Shadow", K::SeparateSampler, V::Mutable),
    ]
}

#[test]
fn packing() {
    init_logging();
    let arena = Arena::new();
    let raw = all_categories();
    let res = build(&arena, &raw, &[]);

    let expected = [
        (ResourceCategory::ConstantBuffer, 2),
        (ResourceCategory::ReadOnlyStorageBuffer, 1),
        (ResourceCategory::ReadWriteStorageBuffer, 1),
        (ResourceCategory::UniformTexelBuffer, 1),
        (ResourceCategory::StorageTexelBuffer, 1),
        (ResourceCategory::SampledImage, 1),
        (ResourceCategory::StorageImage, 1),
        (ResourceCategory::AtomicCounter, 1),
        (ResourceCategory::SeparateImage, 1),
        (ResourceCategory::SeparateSampler, 1),
    ];
    for &(category, count) in expected.iter() {
        assert_eq!(res.count(category), count, "{:?}", category);
        for i in 0..count {
            assert_eq!(res.at(category, i).category, category);
        }
    }
    assert_eq!(res.total_count(), raw.len());
    assert_eq!(res.stage(), ShaderStage::Fragment);

    // category-major order in the global array
    let categories: Vec<_> = (0..res.total_count())
        .map(|i| res.at_global(i).category)
        .collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
    assert_eq!(res.at(ResourceCategory::ConstantBuffer, 1).name, "u_Object");
}

#[test]
fn names_round_trip() {
    let arena = Arena::new();
    let raw = all_categories();
    let res = build(&arena, &raw, &[]);

    for r in raw.iter() {
        let category = r.kind.category(BindingModel::Combined);
        let desc = res
            .resources(category)
            .iter()
            .find(|d| d.name == r.name)
            .unwrap();
        assert_eq!(desc.array_size as u32, r.array_size);
        assert_eq!(desc.variable_class, r.variable_class);
    }

    let shadow = res.at(ResourceCategory::SeparateImage, 0);
    let names: Vec<_> = (0..shadow.array_size).map(|i| shadow.print_name(i)).collect();
    assert_eq!(names, ["t_Shadow[0]", "t_Shadow[1]", "t_Shadow[2]", "t_Shadow[3]"]);
    assert_eq!(res.at(ResourceCategory::StorageImage, 0).print_name(0), "i_Target");
}

#[test]
fn locations_are_carried() {
    let arena = Arena::new();
    let loc = ResourceLocation::Spirv {
        binding_decoration: 42,
        descriptor_set_decoration: 38,
    };
    let raw = [
        RawResource::new("u_Globals", K::UniformBuffer, V::Static).location(loc),
        RawResource::new("t_Color", K::CombinedImageSampler, V::Static).location(
            ResourceLocation::Register {
                bind_point: 3,
                space: 1,
            },
        ),
    ];
    let res = build(&arena, &raw, &[]);
    assert_eq!(res.at(ResourceCategory::ConstantBuffer, 0).location, loc);
    assert_eq!(
        res.at(ResourceCategory::SampledImage, 0).location,
        ResourceLocation::Register {
            bind_point: 3,
            space: 1
        }
    );
}

#[test]
fn compatibility() {
    let (a1, a2, a3, a4, a5) = (
        Arena::new(),
        Arena::new(),
        Arena::new(),
        Arena::new(),
        Arena::new(),
    );

    let raw = all_categories();
    let base = build(&a1, &raw, &[]);
    assert!(base.is_compatible_with(&base));

    // different names, same shape
    let renamed_names: Vec<String> = raw.iter().map(|r| format!("{}_renamed", r.name)).collect();
    let renamed: Vec<_> = raw
        .iter()
        .zip(renamed_names.iter())
        .map(|(r, name)| RawResource {
            name: name.as_str(),
            ..*r
        })
        .collect();
    let renamed = build(&a2, &renamed, &[]);
    assert!(base.is_compatible_with(&renamed));
    assert!(renamed.is_compatible_with(&base));

    // different array size
    let mut resized = raw.clone();
    resized[0].array_size = 2;
    let resized = build(&a3, &resized, &[]);
    assert!(!base.is_compatible_with(&resized));

    // different variable class
    let mut reclassed = raw.clone();
    reclassed[1].variable_class = V::Mutable;
    let reclassed = build(&a4, &reclassed, &[]);
    assert!(!base.is_compatible_with(&reclassed));

    // different counts
    let mut extended = raw.clone();
    extended.push(RawResource::new("u_Extra", K::UniformBuffer, V::Static));
    let extended = build(&a5, &extended, &[]);
    assert!(!base.is_compatible_with(&extended));
    assert!(!extended.is_compatible_with(&base));
}

#[test]
fn compatibility_is_positional() {
    let (a1, a2) = (Arena::new(), Arena::new());
    let a = build(
        &a1,
        &[
            RawResource::new("x", K::UniformBuffer, V::Static),
            RawResource::new("y", K::UniformBuffer, V::Mutable),
        ],
        &[],
    );
    let b = build(
        &a2,
        &[
            RawResource::new("y", K::UniformBuffer, V::Mutable),
            RawResource::new("x", K::UniformBuffer, V::Static),
        ],
        &[],
    );
    assert!(!a.is_compatible_with(&b));
}

#[test]
fn hash_stability() {
    let (a1, a2, a3) = (Arena::new(), Arena::new(), Arena::new());
    let raw = all_categories();
    let first = build(&a1, &raw, &[]);
    let second = build(&a2, &raw, &[]);
    assert_eq!(first.structural_hash(), second.structural_hash());

    // identical descriptor arrays, except for the name addresses
    assert_eq!(first.all_resources(), second.all_resources());
    assert_eq!(first.layout(), second.layout());

    let renamed: Vec<_> = raw
        .iter()
        .map(|r| RawResource {
            name: "same",
            ..*r
        })
        .collect();
    let renamed = build(&a3, &renamed, &[]);
    assert!(first.is_compatible_with(&renamed));
    assert_eq!(first.structural_hash(), renamed.structural_hash());
}

#[test]
fn static_sampler_resolution() {
    init_logging();
    let linear = Arc::new(Sampler { id: 1 });

    let arena = Arena::new();
    let raw = [
        RawResource::new("Tex", K::CombinedImageSampler, V::Mutable),
        RawResource::new("Tex_sampler", K::SeparateSampler, V::Mutable),
    ];
    let res = build(&arena, &raw, &[("Tex_sampler", linear.clone())]);
    let tex = res.at(ResourceCategory::SampledImage, 0);
    let sampler = res.at(ResourceCategory::SeparateSampler, 0);
    assert_eq!(tex.static_sampler_index, sampler.static_sampler_index);
    assert_eq!(tex.static_sampler_index, 0);
    assert!(Arc::ptr_eq(res.static_sampler(tex).unwrap(), &linear));
    assert_eq!(Arc::strong_count(&linear), 2);

    // broken match
    let arena = Arena::new();
    let raw = [
        RawResource::new("Tex", K::CombinedImageSampler, V::Mutable),
        RawResource::new("TexSampler", K::SeparateSampler, V::Mutable),
    ];
    let res2 = build(&arena, &raw, &[("TexSampler", linear.clone())]);
    let tex = res2.at(ResourceCategory::SampledImage, 0);
    assert_eq!(tex.static_sampler_index, -1);
    assert!(res2.static_sampler(tex).is_none());

    drop(res);
    drop(res2);
    assert_eq!(Arc::strong_count(&linear), 1);
}

#[test]
fn layout_overflow() {
    let arena = Arena::new();
    let raw = vec![RawResource::new("cb", K::UniformBuffer, V::Static); u16::MAX as usize + 1];
    let err = ShaderResources::new(&arena, &create_info(&[]), &raw).unwrap_err();
    assert!(matches!(
        err,
        ResourceError::LayoutOverflow {
            what: "constant buffers",
            count: 65536
        }
    ));

    // exactly at the limit is fine
    let res = build(&arena, &raw[1..], &[]);
    assert_eq!(res.count(ResourceCategory::ConstantBuffer), u16::MAX as usize);
}

#[test]
fn scenario_static_sampler_is_not_bindable() {
    init_logging();
    let arena = Arena::new();
    let raw = [
        RawResource::new("Globals", K::UniformBuffer, V::Static),
        RawResource::new("Tex", K::CombinedImageSampler, V::Mutable),
        RawResource::new("Tex_sampler", K::SeparateSampler, V::Mutable),
    ];
    let res = build(&arena, &raw, &[("Tex_sampler", Arc::new(Sampler { id: 3 }))]);

    assert_eq!(res.count(ResourceCategory::ConstantBuffer), 1);
    assert_eq!(res.count(ResourceCategory::SampledImage), 1);
    assert_eq!(res.count(ResourceCategory::SeparateSampler), 1);
    assert_eq!(res.num_static_samplers(), 1);

    let tex = res.at(ResourceCategory::SampledImage, 0);
    assert_eq!(res.static_sampler(tex).unwrap().id, 3);

    let bindable = res.count_resources(VariableClassMask::all());
    assert_eq!(bindable[ResourceCategory::ConstantBuffer], 1);
    assert_eq!(bindable[ResourceCategory::SampledImage], 1);
    assert_eq!(bindable[ResourceCategory::SeparateSampler], 0);
    assert_eq!(bindable.total(), 2);

    let dump = res.dump();
    assert!(dump.contains("'Globals'"));
    assert!(dump.contains("'Tex_sampler'"));
    let lines: Vec<_> = dump.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].contains("1 static sampler(s)"));
    assert_eq!(lines[1], "  ConstantBuffer (1):");
    assert_eq!(lines[3], "  SampledImage (1):");
    assert!(lines[4].contains("static sampler: 0"));
    assert_eq!(lines[5], "  SeparateSampler (1):");
    tracing::info!("\n{}", dump);
}

#[derive(Default)]
struct Collector {
    buffers: Vec<(String, usize)>,
    images: Vec<String>,
    samplers: usize,
}

impl<'a> ResourceVisitor<'a> for Collector {
    fn constant_buffer(&mut self, resource: &ResourceDesc<'a>, index: usize) {
        self.buffers.push((resource.name.to_string(), index));
    }
    fn sampled_image(&mut self, resource: &ResourceDesc<'a>, _index: usize) {
        self.images.push(resource.name.to_string());
    }
    fn separate_image(&mut self, resource: &ResourceDesc<'a>, _index: usize) {
        self.images.push(resource.name.to_string());
    }
    fn separate_sampler(&mut self, _resource: &ResourceDesc<'a>, _index: usize) {
        self.samplers += 1;
    }
}

#[test]
fn filtered_enumeration() {
    let arena = Arena::new();
    let raw = all_categories();
    let res = build(&arena, &raw, &[]);

    let mut all = Collector::default();
    res.for_each(VariableClassMask::from_classes(&[]), &mut all);
    assert_eq!(
        all.buffers,
        [("u_Globals".to_string(), 0), ("u_Object".to_string(), 1)]
    );
    assert_eq!(all.images, ["t_Color", "t_Shadow"]);
    assert_eq!(all.samplers, 1);

    let mut dynamic = Collector::default();
    res.for_each(VariableClassMask::from_classes(&[V::Dynamic]), &mut dynamic);
    // the in-category index is kept when filtering
    assert_eq!(dynamic.buffers, [("u_Object".to_string(), 1)]);
    assert!(dynamic.images.is_empty());

    let mut count = 0;
    res.for_each_resource(VariableClassMask::STATIC | VariableClassMask::MUTABLE, |r, _| {
        assert_ne!(r.variable_class, V::Dynamic);
        count += 1;
    });
    assert_eq!(count, 8);

    let counts = res.count_resources(VariableClassMask::DYNAMIC);
    assert_eq!(counts[ResourceCategory::ReadOnlyStorageBuffer], 1);
    assert_eq!(counts[ResourceCategory::ReadWriteStorageBuffer], 1);
    assert_eq!(counts.total(), 3);
}

#[test]
fn checked_access() {
    let arena = Arena::new();
    let raw = all_categories();
    let res = build(&arena, &raw, &[]);
    assert_eq!(res.get(ResourceCategory::ConstantBuffer, 1).unwrap().name, "u_Object");
    assert_eq!(
        res.get(ResourceCategory::AtomicCounter, 1).unwrap_err(),
        ResourceError::IndexOutOfRange {
            category: ResourceCategory::AtomicCounter,
            index: 1,
            count: 1
        }
    );
}

#[test]
#[cfg(debug_assertions)]
#[should_panic]
fn unchecked_access_asserts_in_debug() {
    let arena = Arena::new();
    let raw = all_categories();
    let res = build(&arena, &raw, &[]);
    res.at(ResourceCategory::ConstantBuffer, 2);
}

#[test]
fn layout_cache_across_threads() {
    let raw = all_categories();
    let cache = std::sync::Mutex::new(LayoutCache::new());

    std::thread::scope(|scope| {
        for i in 0..4u32 {
            let raw = &raw;
            let cache = &cache;
            scope.spawn(move || {
                let arena = Arena::with_capacity(4096);
                let res = build(&arena, raw, &[]);
                cache.lock().unwrap().get_or_insert_with(&res, || i);
            });
        }
    });

    assert_eq!(cache.into_inner().unwrap().len(), 1);
}

#[test]
fn shared_between_threads() {
    let arena = Arena::new();
    let raw = [
        RawResource::new("Tex", K::CombinedImageSampler, V::Mutable),
        RawResource::new("Tex_sampler", K::SeparateSampler, V::Mutable),
    ];
    let res = build(&arena, &raw, &[("Tex_sampler", Arc::new(Sampler { id: 9 }))]);
    let expected = res.structural_hash();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(res.structural_hash(), expected);
                let tex = res.at(ResourceCategory::SampledImage, 0);
                let sampler = res.static_sampler(tex).unwrap().clone();
                assert_eq!(sampler.id, 9);
            });
        }
    });
}
