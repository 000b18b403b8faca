/// SPIR-V reflection through spirq
///
/// Turns a compiled SPIR-V module into the backend-agnostic
/// `ShaderReflection` consumed by `ShaderParamBindingTable::bind`.

use rhi_core::rhi::graphics::ShaderStage;
use rhi_core::rhi::shader::{
    ArrayLength, BindingType, PrimitiveKind, ReflectedBinding, ReflectedMember, ReflectedMemberType,
    ReflectedSpecConstant, ShaderReflection, ShaderReflectionSource, SpecConstValue,
};
use rhi_core::rhi::{Error, Result};
use rhi_core::{rhi_bail, rhi_debug, rhi_err, rhi_warn};
use rustc_hash::FxHashSet;
use spirq::ty::{DescriptorType, ScalarType, Type};
use spirq::var::Variable;
use crate::spirv_module::SpirvModule;

const SOURCE: &str = "rhi::spirv";

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Split a SPIR-V binary into words
///
/// Modules written with the opposite endianness are byte-swapped.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "SPIR-V binary length {} is not a non-zero multiple of 4",
            bytes.len()
        )));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words[0] {
        SPIRV_MAGIC => {}
        magic if magic.swap_bytes() == SPIRV_MAGIC => {
            words.iter_mut().for_each(|word| *word = word.swap_bytes());
        }
        magic => {
            return Err(Error::InvalidResource(format!(
                "Not a SPIR-V binary (magic 0x{:08x})",
                magic
            )));
        }
    }

    Ok(words)
}

/// Reflect every entry point of a module as one shader stage
pub fn reflect_spirv(name: &str, words: &[u32], stage: ShaderStage) -> Result<ShaderReflection> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| rhi_err!(SOURCE, "SPIR-V reflection of '{}' failed: {:?}", name, e))?;
    let module = SpirvModule::parse(words)?;

    let mut reflection = ShaderReflection::new(name);
    let mut seen_bindings = FxHashSet::default();
    let mut seen_constants = FxHashSet::default();

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                Variable::Descriptor { name: var_name, desc_bind, desc_ty, ty, nbind, .. } => {
                    if !seen_bindings.insert((desc_bind.set(), desc_bind.bind())) {
                        continue;
                    }
                    let Some(binding_type) = binding_type(desc_ty) else {
                        rhi_warn!(SOURCE, "Shader '{}': skipping unsupported descriptor {:?}", name, desc_ty);
                        continue;
                    };
                    let mut members = match binding_type.is_buffer() {
                        true => struct_members(ty)?,
                        false => Vec::new(),
                    };
                    module.restore_spec_lengths(desc_bind.set(), desc_bind.bind(), &mut members);
                    reflection.bindings.push(ReflectedBinding {
                        name: var_name.clone().unwrap_or_default(),
                        set: desc_bind.set(),
                        binding: desc_bind.bind(),
                        binding_type,
                        stages: stage,
                        array_count: (*nbind).max(1),
                        members,
                    });
                }
                Variable::SpecConstant { name: const_name, spec_id, ty, .. } => {
                    if !seen_constants.insert(*spec_id) {
                        continue;
                    }
                    reflection.specialization_constants.push(ReflectedSpecConstant {
                        name: const_name.clone().unwrap_or_default(),
                        constant_id: *spec_id,
                        default: spec_constant_default(ty)?,
                        stages: stage,
                    });
                }
                _ => {}
            }
        }
    }

    // spirq reports the constants without their compiled values
    for scanned in module.spec_constants() {
        match reflection
            .specialization_constants
            .iter_mut()
            .find(|constant| constant.constant_id == scanned.constant_id)
        {
            Some(constant) => constant.default = scanned.default,
            None => reflection.specialization_constants.push(ReflectedSpecConstant {
                name: scanned.name.unwrap_or_default(),
                constant_id: scanned.constant_id,
                default: scanned.default,
                stages: stage,
            }),
        }
    }

    reflection.bindings.sort_by_key(|b| (b.set, b.binding));
    reflection.specialization_constants.sort_by_key(|c| c.constant_id);

    rhi_debug!(
        SOURCE,
        "Reflected '{}': {} bindings, {} specialization constants",
        name,
        reflection.bindings.len(),
        reflection.specialization_constants.len()
    );

    Ok(reflection)
}

fn binding_type(desc_ty: &DescriptorType) -> Option<BindingType> {
    match desc_ty {
        DescriptorType::UniformBuffer() => Some(BindingType::UniformBuffer),
        DescriptorType::StorageBuffer(..) => Some(BindingType::StorageBuffer),
        DescriptorType::CombinedImageSampler() => Some(BindingType::CombinedImageSampler),
        DescriptorType::SampledImage() => Some(BindingType::SampledImage),
        DescriptorType::StorageImage(..) => Some(BindingType::StorageImage),
        DescriptorType::Sampler() => Some(BindingType::Sampler),
        DescriptorType::UniformTexelBuffer() => Some(BindingType::UniformTexelBuffer),
        DescriptorType::StorageTexelBuffer(..) => Some(BindingType::StorageTexelBuffer),
        DescriptorType::InputAttachment(..) => Some(BindingType::SubpassInput),
        DescriptorType::AccelStruct() => Some(BindingType::AccelerationStructure),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn scalar_kind(scalar_ty: &ScalarType) -> Result<PrimitiveKind> {
    match scalar_ty {
        ScalarType::Float { bits: 64 } => Ok(PrimitiveKind::Double),
        ScalarType::Float { .. } => Ok(PrimitiveKind::Float),
        ScalarType::Integer { is_signed: true, .. } => Ok(PrimitiveKind::Int),
        ScalarType::Integer { is_signed: false, .. } => Ok(PrimitiveKind::UInt),
        ScalarType::Boolean => Ok(PrimitiveKind::Bool),
        ScalarType::Void => rhi_bail!(SOURCE, "void has no buffer representation"),
    }
}

/// Placeholder default until the module scan supplies the compiled literal
///
/// Stays the zero of the type for literals the scan cannot decode.
fn spec_constant_default(ty: &Type) -> Result<SpecConstValue> {
    match ty {
        Type::Scalar(scalar_ty) => Ok(SpecConstValue::zero(scalar_kind(scalar_ty)?)),
        other => rhi_bail!(SOURCE, "Specialization constant of non-scalar type {:?}", other),
    }
}

fn member_type(ty: &Type) -> Result<ReflectedMemberType> {
    let reflected = match ty {
        Type::Scalar(s) => ReflectedMemberType::Scalar(scalar_kind(s)?),
        Type::Vector(v) => ReflectedMemberType::Vector { kind: scalar_kind(&v.scalar_ty)?, size: v.nscalar },
        Type::Matrix(m) => ReflectedMemberType::Matrix {
            kind: scalar_kind(&m.vector_ty.scalar_ty)?,
            columns: m.nvector,
            rows: m.vector_ty.nscalar,
            column_stride: m.stride.map(|s| s as u32).unwrap_or(0),
        },
        Type::Array(a) => ReflectedMemberType::Array {
            element_type: Box::new(member_type(&a.element_ty)?),
            length: match a.nelement {
                Some(count) => ArrayLength::Fixed(count),
                None => ArrayLength::Runtime,
            },
            stride: a.stride.map(|s| s as u32).unwrap_or(0),
        },
        Type::Struct(_) => ReflectedMemberType::Struct { members: struct_members(ty)? },
        other => rhi_bail!(SOURCE, "Unsupported buffer member type {:?}", other),
    };
    Ok(reflected)
}

fn struct_members(ty: &Type) -> Result<Vec<ReflectedMember>> {
    let Type::Struct(st) = ty else {
        return Ok(Vec::new());
    };
    st.members
        .iter()
        .map(|m| {
            Ok(ReflectedMember {
                name: m.name.clone().unwrap_or_default(),
                offset: m.offset.unwrap_or(0) as u32,
                size: m.ty.nbyte().map(|s| s as u32).unwrap_or(0),
                member_type: member_type(&m.ty)?,
            })
        })
        .collect()
}

/// One compiled stage of a pipeline
#[derive(Debug, Clone)]
pub struct SpirvShader {
    name: String,
    stage: ShaderStage,
    words: Vec<u32>,
}

impl SpirvShader {
    pub fn from_words(name: impl Into<String>, stage: ShaderStage, words: Vec<u32>) -> Self {
        Self { name: name.into(), stage, words }
    }

    pub fn from_bytes(name: impl Into<String>, stage: ShaderStage, bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_words(name, stage, words_from_bytes(bytes)?))
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl ShaderReflectionSource for SpirvShader {
    fn shader_name(&self) -> &str {
        &self.name
    }

    fn reflect(&self) -> Result<ShaderReflection> {
        reflect_spirv(&self.name, &self.words, self.stage)
    }
}

/// Reflect each stage and merge them into one pipeline description
pub fn reflect_pipeline(name: &str, shaders: &[&dyn ShaderReflectionSource]) -> Result<ShaderReflection> {
    let stages = shaders.iter().map(|shader| shader.reflect()).collect::<Result<Vec<_>>>()?;
    ShaderReflection::merge(name, &stages)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "spirv_reflect_tests.rs"]
mod tests;
