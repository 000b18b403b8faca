/// Shader reflection data
///
/// What a compiled shader declares: its descriptor bindings (with buffer
/// member layouts) and its specialization constants. Produced by a
/// `ShaderReflectionSource`, merged across the stages of a pipeline, then
/// checked against host layouts by `ShaderParamBindingTable::bind`.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics::types::ShaderStage;
use crate::shader::primitive::{LayoutRules, PrimitiveKind};
use crate::shader::specialization::SpecConstValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    StorageImage,
    Sampler,
    CombinedImageSampler,
    UniformTexelBuffer,
    StorageTexelBuffer,
    SubpassInput,
    AccelerationStructure,
}

impl BindingType {
    /// Bindings whose content is described by a buffer layout
    pub fn is_buffer(&self) -> bool {
        matches!(self, BindingType::UniformBuffer | BindingType::StorageBuffer)
    }

    pub fn layout_rules(&self) -> Option<LayoutRules> {
        match self {
            BindingType::UniformBuffer => Some(LayoutRules::Std140),
            BindingType::StorageBuffer => Some(LayoutRules::Std430),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    Fixed(u32),
    /// Sized by a specialization constant, `default` being its compiled value
    SpecializationConstant { constant_id: u32, default: u32 },
    /// Unsized, or sized by an expression the reflector could not fold
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReflectedMemberType {
    Scalar(PrimitiveKind),
    Vector { kind: PrimitiveKind, size: u32 },
    Matrix { kind: PrimitiveKind, columns: u32, rows: u32, column_stride: u32 },
    Array { element_type: Box<ReflectedMemberType>, length: ArrayLength, stride: u32 },
    Struct { members: Vec<ReflectedMember> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedMember {
    pub name: String,
    pub offset: u32,
    /// Byte size, 0 when unknown (runtime arrays)
    pub size: u32,
    pub member_type: ReflectedMemberType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub binding_type: BindingType,
    pub stages: ShaderStage,
    /// Descriptor count (1 unless the binding is an array)
    pub array_count: u32,
    /// Buffer block members, empty for non-buffer bindings
    pub members: Vec<ReflectedMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedSpecConstant {
    pub name: String,
    pub constant_id: u32,
    pub default: SpecConstValue,
    pub stages: ShaderStage,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderReflection {
    pub shader_name: String,
    pub bindings: Vec<ReflectedBinding>,
    pub specialization_constants: Vec<ReflectedSpecConstant>,
}

impl ShaderReflection {
    pub fn new(shader_name: impl Into<String>) -> Self {
        Self { shader_name: shader_name.into(), ..Default::default() }
    }

    /// One reflection for a whole pipeline
    ///
    /// A binding declared by several stages appears once with the union of
    /// their stage flags, as does a specialization constant. Two stages
    /// declaring different binding types at one (set, binding) is an error.
    pub fn merge(shader_name: &str, stages: &[ShaderReflection]) -> Result<ShaderReflection> {
        let mut merged = ShaderReflection::new(shader_name);
        let mut binding_slots: FxHashMap<(u32, u32), usize> = FxHashMap::default();
        let mut constant_slots: FxHashMap<u32, usize> = FxHashMap::default();

        for stage in stages {
            for binding in &stage.bindings {
                match binding_slots.get(&(binding.set, binding.binding)) {
                    Some(&index) => {
                        let existing = &mut merged.bindings[index];
                        if existing.binding_type != binding.binding_type {
                            let message = format!(
                                "shader '{}' declares set {} binding {} as both {:?} ('{}') and {:?} ('{}')",
                                shader_name,
                                binding.set,
                                binding.binding,
                                existing.binding_type,
                                existing.name,
                                binding.binding_type,
                                binding.name
                            );
                            crate::rhi_error!("rhi::ShaderReflection", "{}", message);
                            return Err(Error::ShaderBindingMismatch(message));
                        }
                        existing.stages |= binding.stages;
                    }
                    None => {
                        binding_slots.insert((binding.set, binding.binding), merged.bindings.len());
                        merged.bindings.push(binding.clone());
                    }
                }
            }

            for constant in &stage.specialization_constants {
                match constant_slots.get(&constant.constant_id) {
                    Some(&index) => merged.specialization_constants[index].stages |= constant.stages,
                    None => {
                        constant_slots.insert(constant.constant_id, merged.specialization_constants.len());
                        merged.specialization_constants.push(constant.clone());
                    }
                }
            }
        }

        merged.bindings.sort_by_key(|binding| (binding.set, binding.binding));
        merged.specialization_constants.sort_by_key(|constant| constant.constant_id);
        Ok(merged)
    }

    pub fn binding(&self, name: &str) -> Option<&ReflectedBinding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }

    pub fn specialization_constant(&self, name: &str) -> Option<&ReflectedSpecConstant> {
        self.specialization_constants.iter().find(|constant| constant.name == name)
    }

    /// Descriptor set indices in use, sorted
    pub fn descriptor_sets(&self) -> Vec<u32> {
        let mut sets: Vec<u32> = self.bindings.iter().map(|binding| binding.set).collect();
        sets.sort_unstable();
        sets.dedup();
        sets
    }
}

/// Anything able to describe a compiled shader stage
pub trait ShaderReflectionSource {
    fn shader_name(&self) -> &str;

    fn reflect(&self) -> Result<ShaderReflection>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
