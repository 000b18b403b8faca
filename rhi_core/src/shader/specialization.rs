/// Specialization constants
///
/// Users pick values by constant name (`SpecializationConstants`). Binding a
/// shader resolves them against its reflection into per-id values
/// (`SpecializationValues`), falling back to the default compiled into the
/// shader for every constant left unset.

use std::collections::BTreeMap;
use rustc_hash::FxHashMap;
use crate::graphics::types::ShaderStage;
use crate::shader::primitive::PrimitiveKind;
use crate::shader::reflection::ShaderReflection;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecConstValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
}

impl SpecConstValue {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            SpecConstValue::Bool(_) => PrimitiveKind::Bool,
            SpecConstValue::Int(_) => PrimitiveKind::Int,
            SpecConstValue::UInt(_) => PrimitiveKind::UInt,
            SpecConstValue::Float(_) => PrimitiveKind::Float,
            SpecConstValue::Double(_) => PrimitiveKind::Double,
        }
    }

    /// Zero of the given kind
    pub fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => SpecConstValue::Bool(false),
            PrimitiveKind::Int => SpecConstValue::Int(0),
            PrimitiveKind::UInt => SpecConstValue::UInt(0),
            PrimitiveKind::Float => SpecConstValue::Float(0.0),
            PrimitiveKind::Double => SpecConstValue::Double(0.0),
        }
    }

    /// Value usable as an array length
    pub fn as_dimension(&self) -> Option<u32> {
        match *self {
            SpecConstValue::UInt(value) => Some(value),
            SpecConstValue::Int(value) => u32::try_from(value).ok(),
            _ => None,
        }
    }

    /// Little-endian bytes as handed to pipeline creation
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            SpecConstValue::Bool(value) => (value as u32).to_le_bytes().to_vec(),
            SpecConstValue::Int(value) => value.to_le_bytes().to_vec(),
            SpecConstValue::UInt(value) => value.to_le_bytes().to_vec(),
            SpecConstValue::Float(value) => value.to_le_bytes().to_vec(),
            SpecConstValue::Double(value) => value.to_le_bytes().to_vec(),
        }
    }
}

// ===== NAMED USER VALUES =====

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecializationConstants {
    values: FxHashMap<String, SpecConstValue>,
}

impl SpecializationConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: SpecConstValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: SpecConstValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<SpecConstValue> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Per-id values for every constant `reflection` declares
    ///
    /// Names unknown to the shader are ignored with a warning.
    pub fn resolve(&self, reflection: &ShaderReflection) -> SpecializationValues {
        let mut resolved = SpecializationValues::new();

        for constant in &reflection.specialization_constants {
            let value = match self.get(&constant.name) {
                Some(value) if value.kind() != constant.default.kind() => {
                    crate::rhi_warn!(
                        "rhi::Specialization",
                        "Constant '{}' of shader '{}' is {:?}, got {:?}; keeping the default",
                        constant.name,
                        reflection.shader_name,
                        constant.default.kind(),
                        value.kind()
                    );
                    constant.default
                }
                Some(value) => value,
                None => constant.default,
            };
            resolved.insert_for_stages(constant.constant_id, value, constant.stages);
        }

        for name in self.values.keys() {
            if !reflection.specialization_constants.iter().any(|constant| &constant.name == name) {
                crate::rhi_warn!(
                    "rhi::Specialization",
                    "Shader '{}' has no specialization constant '{}'",
                    reflection.shader_name,
                    name
                );
            }
        }

        resolved
    }
}

// ===== PER-ID VALUES =====

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpecializationEntry {
    value: SpecConstValue,
    stages: ShaderStage,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecializationValues {
    entries: BTreeMap<u32, SpecializationEntry>,
}

impl SpecializationValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value visible to every stage
    pub fn insert(&mut self, constant_id: u32, value: SpecConstValue) {
        self.insert_for_stages(constant_id, value, ShaderStage::all());
    }

    pub fn insert_for_stages(&mut self, constant_id: u32, value: SpecConstValue, stages: ShaderStage) {
        self.entries.insert(constant_id, SpecializationEntry { value, stages });
    }

    pub fn with(mut self, constant_id: u32, value: SpecConstValue) -> Self {
        self.insert(constant_id, value);
        self
    }

    pub fn get(&self, constant_id: u32) -> Option<SpecConstValue> {
        self.entries.get(&constant_id).map(|entry| entry.value)
    }

    /// Value of `constant_id` as an array length
    pub fn dimension(&self, constant_id: u32) -> Option<u32> {
        self.get(constant_id).and_then(|value| value.as_dimension())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (id, value) pairs sorted by id
    pub fn iter(&self) -> impl Iterator<Item = (u32, SpecConstValue)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry.value))
    }

    /// Values visible to `stage`, sorted by id, ready for pipeline creation
    pub fn per_stage(&self, stage: ShaderStage) -> Vec<(u32, SpecConstValue)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.stages.intersects(stage))
            .map(|(id, entry)| (*id, entry.value))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "specialization_tests.rs"]
mod tests;
