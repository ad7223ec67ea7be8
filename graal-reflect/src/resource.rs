//! Resource descriptors and the raw bindings they are built from.
use std::{fmt, mem};

/// Category of a shader resource.
///
/// The declaration order is the order of the segments in the packed descriptor array.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum ResourceCategory {
    /// Uniform buffer (constant buffer).
    ConstantBuffer = 0,
    /// Storage buffer declared read-only.
    ReadOnlyStorageBuffer,
    /// Storage buffer with write access.
    ReadWriteStorageBuffer,
    UniformTexelBuffer,
    StorageTexelBuffer,
    /// Image combined with a sampler.
    SampledImage,
    StorageImage,
    AtomicCounter,
    /// Image accessed without a built-in sampler.
    SeparateImage,
    SeparateSampler,
}

impl ResourceCategory {
    /// Number of categories.
    pub const COUNT: usize = 10;

    /// All categories, in layout order.
    pub const ALL: [ResourceCategory; ResourceCategory::COUNT] = [
        ResourceCategory::ConstantBuffer,
        ResourceCategory::ReadOnlyStorageBuffer,
        ResourceCategory::ReadWriteStorageBuffer,
        ResourceCategory::UniformTexelBuffer,
        ResourceCategory::StorageTexelBuffer,
        ResourceCategory::SampledImage,
        ResourceCategory::StorageImage,
        ResourceCategory::AtomicCounter,
        ResourceCategory::SeparateImage,
        ResourceCategory::SeparateSampler,
    ];

    /// Position of the category in the layout order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether resources of this category can be paired with a static sampler.
    pub fn accepts_static_sampler(self) -> bool {
        matches!(
            self,
            ResourceCategory::SampledImage | ResourceCategory::SeparateImage
        )
    }
}

/// How often the resource bound to a variable may change.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum VariableBindingClass {
    /// Bound once, never changes.
    Static = 0,
    /// Can change between shader resource binding objects.
    Mutable,
    /// Can change at any time.
    Dynamic,
}

bitflags::bitflags! {
    /// A set of variable binding classes, used to filter resources during enumeration.
    pub struct VariableClassMask: u32 {
        const STATIC = 1 << VariableBindingClass::Static as u32;
        const MUTABLE = 1 << VariableBindingClass::Mutable as u32;
        const DYNAMIC = 1 << VariableBindingClass::Dynamic as u32;
    }
}

impl VariableClassMask {
    /// Builds a mask from an explicit list of classes. An empty list allows every class.
    pub fn from_classes(classes: &[VariableBindingClass]) -> VariableClassMask {
        if classes.is_empty() {
            return VariableClassMask::all();
        }
        classes
            .iter()
            .fold(VariableClassMask::empty(), |mask, &class| mask | VariableClassMask::from(class))
    }

    pub fn allows(self, class: VariableBindingClass) -> bool {
        self.bits() & (1 << class as u32) != 0
    }
}

impl From<VariableBindingClass> for VariableClassMask {
    fn from(class: VariableBindingClass) -> Self {
        VariableClassMask::from_bits_truncate(1 << class as u32)
    }
}

/// Backend-specific location of a resource. Carried along, never interpreted here.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceLocation {
    Unspecified,
    /// Offsets, in words, of the `Binding` and `DescriptorSet` decorations in the SPIR-V binary.
    /// Used to patch bindings after the layout is known.
    Spirv {
        binding_decoration: u32,
        descriptor_set_decoration: u32,
    },
    /// Register and space in native shader bytecode.
    Register { bind_point: u16, space: u16 },
}

impl Default for ResourceLocation {
    fn default() -> Self {
        ResourceLocation::Unspecified
    }
}

/// Sentinel value of `ResourceDesc::static_sampler_index`.
pub const NO_STATIC_SAMPLER: i32 = -1;

/// Description of a shader-visible resource binding.
///
/// Resource descriptions live in the packed descriptor array of a `ShaderResources` object.
/// They contain no pointers other than the name, which points into the name pool of the same
/// object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ResourceDesc<'a> {
    /// Name of the resource, without any array subscript.
    pub name: &'a str,
    /// Number of array elements (1 for non-arrays).
    pub array_size: u16,
    pub category: ResourceCategory,
    pub variable_class: VariableBindingClass,
    /// Index into the static sampler table, or `NO_STATIC_SAMPLER`.
    ///
    /// For images, the sampler implicitly assigned to the image. For separate samplers,
    /// the slot of the sampler itself if it is static.
    pub static_sampler_index: i32,
    pub location: ResourceLocation,
}

// Descriptors are stored densely in arrays.
const _: () = assert!(mem::size_of::<ResourceDesc<'static>>() % mem::size_of::<usize>() == 0);

impl<'a> ResourceDesc<'a> {
    pub fn has_static_sampler(&self) -> bool {
        self.static_sampler_index >= 0
    }

    /// Returns the name of the given array element: `name[index]` for arrays, `name` otherwise.
    pub fn print_name(&self, index: u16) -> String {
        debug_assert!(index < self.array_size);
        if self.array_size > 1 {
            format!("{}[{}]", self.name, index)
        } else {
            self.name.to_string()
        }
    }

    /// Returns whether two resources occupying the same slot have the same binding shape.
    ///
    /// Names and the identity of the static samplers are not compared.
    pub fn is_compatible_with(&self, other: &ResourceDesc) -> bool {
        self.array_size == other.array_size
            && self.category == other.category
            && self.variable_class == other.variable_class
            && self.has_static_sampler() == other.has_static_sampler()
    }
}

impl<'a> fmt::Display for ResourceDesc<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} '{}' (array size: {}, class: {:?}",
            self.category, self.name, self.array_size, self.variable_class
        )?;
        if self.has_static_sampler() {
            write!(f, ", static sampler: {}", self.static_sampler_index)?;
        }
        write!(f, ")")
    }
}

//--------------------------------------------------------------------------------------------------

/// Kind of binding, as reported by the shader reflector.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RawResourceKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    UniformTexelBuffer,
    StorageTexelBuffer,
    /// Image with a combined sampler (`sampler2D` & co.), or a native texture SRV.
    CombinedImageSampler,
    StorageImage,
    AtomicCounter,
    SeparateImage,
    SeparateSampler,
}

/// How images and samplers are bound by the target backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BindingModel {
    /// Images can be bound together with a sampler.
    Combined,
    /// Images and samplers are always bound separately.
    Separate,
}

impl Default for BindingModel {
    fn default() -> Self {
        BindingModel::Combined
    }
}

impl RawResourceKind {
    /// Returns the category of resources of this kind under the given binding model.
    pub fn category(self, binding_model: BindingModel) -> ResourceCategory {
        match self {
            RawResourceKind::UniformBuffer => ResourceCategory::ConstantBuffer,
            RawResourceKind::StorageBuffer { read_only: true } => {
                ResourceCategory::ReadOnlyStorageBuffer
            }
            RawResourceKind::StorageBuffer { read_only: false } => {
                ResourceCategory::ReadWriteStorageBuffer
            }
            RawResourceKind::UniformTexelBuffer => ResourceCategory::UniformTexelBuffer,
            RawResourceKind::StorageTexelBuffer => ResourceCategory::StorageTexelBuffer,
            RawResourceKind::CombinedImageSampler => match binding_model {
                BindingModel::Combined => ResourceCategory::SampledImage,
                BindingModel::Separate => ResourceCategory::SeparateImage,
            },
            RawResourceKind::StorageImage => ResourceCategory::StorageImage,
            RawResourceKind::AtomicCounter => ResourceCategory::AtomicCounter,
            RawResourceKind::SeparateImage => ResourceCategory::SeparateImage,
            RawResourceKind::SeparateSampler => ResourceCategory::SeparateSampler,
        }
    }
}

/// A resource binding extracted from shader bytecode by a reflector.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawResource<'n> {
    /// Declared name. A trailing array subscript (`name[4]`) is ignored.
    pub name: &'n str,
    /// Number of array elements (1 for non-arrays).
    pub array_size: u32,
    pub kind: RawResourceKind,
    pub variable_class: VariableBindingClass,
    pub location: ResourceLocation,
}

impl<'n> RawResource<'n> {
    pub fn new(
        name: &'n str,
        kind: RawResourceKind,
        variable_class: VariableBindingClass,
    ) -> RawResource<'n> {
        RawResource {
            name,
            array_size: 1,
            kind,
            variable_class,
            location: ResourceLocation::Unspecified,
        }
    }

    pub fn array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    pub fn location(mut self, location: ResourceLocation) -> Self {
        self.location = location;
        self
    }

    /// The declared name without array subscript.
    pub fn base_name(&self) -> &'n str {
        let name = self.name;
        if name.ends_with(']') {
            if let Some(pos) = name.rfind('[') {
                return &name[..pos];
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_mask() {
        let mask = VariableClassMask::from_classes(&[
            VariableBindingClass::Static,
            VariableBindingClass::Dynamic,
        ]);
        assert!(mask.allows(VariableBindingClass::Static));
        assert!(!mask.allows(VariableBindingClass::Mutable));
        assert!(mask.allows(VariableBindingClass::Dynamic));
        assert_eq!(VariableClassMask::from_classes(&[]), VariableClassMask::all());
    }

    #[test]
    fn storage_access_and_binding_model() {
        let ro = RawResourceKind::StorageBuffer { read_only: true };
        let rw = RawResourceKind::StorageBuffer { read_only: false };
        assert_eq!(
            ro.category(BindingModel::Combined),
            ResourceCategory::ReadOnlyStorageBuffer
        );
        assert_eq!(
            rw.category(BindingModel::Combined),
            ResourceCategory::ReadWriteStorageBuffer
        );
        assert_eq!(
            RawResourceKind::CombinedImageSampler.category(BindingModel::Combined),
            ResourceCategory::SampledImage
        );
        assert_eq!(
            RawResourceKind::CombinedImageSampler.category(BindingModel::Separate),
            ResourceCategory::SeparateImage
        );
    }

    #[test]
    fn print_names() {
        let mut desc = ResourceDesc {
            name: "g_Textures",
            array_size: 4,
            category: ResourceCategory::SeparateImage,
            variable_class: VariableBindingClass::Mutable,
            static_sampler_index: NO_STATIC_SAMPLER,
            location: ResourceLocation::Unspecified,
        };
        assert_eq!(desc.print_name(2), "g_Textures[2]");
        desc.array_size = 1;
        assert_eq!(desc.print_name(0), "g_Textures");
    }

    #[test]
    fn base_name_strips_subscript() {
        let raw = RawResource::new(
            "g_Lights[8]",
            RawResourceKind::UniformBuffer,
            VariableBindingClass::Static,
        );
        assert_eq!(raw.base_name(), "g_Lights");
        let raw = RawResource::new("g_Lights", RawResourceKind::UniformBuffer, VariableBindingClass::Static);
        assert_eq!(raw.base_name(), "g_Lights");
    }
}
