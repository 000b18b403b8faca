/// Direct scan of the SPIR-V instructions spirq folds away
///
/// spirq evaluates specialization constants to plain literals: array lengths
/// come out as fixed counts and the constants themselves lose their compiled
/// value. The scan keeps the type graph, the `SpecId` decorations and the
/// literal operands so both can be restored on the reflection.

use rhi_core::rhi::shader::{ArrayLength, ReflectedMember, ReflectedMemberType, SpecConstValue};
use rhi_core::rhi::{Error, Result};
use rustc_hash::FxHashMap;

const HEADER_WORDS: usize = 5;

// ===== OPCODES =====

const OP_NAME: u32 = 5;
const OP_TYPE_BOOL: u32 = 20;
const OP_TYPE_INT: u32 = 21;
const OP_TYPE_FLOAT: u32 = 22;
const OP_TYPE_ARRAY: u32 = 28;
const OP_TYPE_RUNTIME_ARRAY: u32 = 29;
const OP_TYPE_STRUCT: u32 = 30;
const OP_TYPE_POINTER: u32 = 32;
const OP_SPEC_CONSTANT_TRUE: u32 = 48;
const OP_SPEC_CONSTANT_FALSE: u32 = 49;
const OP_SPEC_CONSTANT: u32 = 50;
const OP_VARIABLE: u32 = 59;
const OP_DECORATE: u32 = 71;

const DECORATION_SPEC_ID: u32 = 1;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;

#[derive(Debug, Clone, PartialEq)]
enum TypeDecl {
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Array { element: u32, length: u32 },
    RuntimeArray { element: u32 },
    Struct { members: Vec<u32> },
    Pointer { pointee: u32 },
}

#[derive(Debug, Clone, PartialEq)]
enum SpecLiteral {
    Bool(bool),
    Words(Vec<u32>),
}

#[derive(Debug, Clone)]
struct SpecConstantDecl {
    type_id: u32,
    literal: SpecLiteral,
}

/// Specialization constant as compiled into the module
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScannedSpecConstant {
    pub name: Option<String>,
    pub constant_id: u32,
    pub default: SpecConstValue,
}

#[derive(Debug, Default)]
pub(crate) struct SpirvModule {
    names: FxHashMap<u32, String>,
    spec_ids: FxHashMap<u32, u32>,
    descriptor_sets: FxHashMap<u32, u32>,
    bindings: FxHashMap<u32, u32>,
    types: FxHashMap<u32, TypeDecl>,
    spec_constants: FxHashMap<u32, SpecConstantDecl>,
    /// (result id, pointer type id) in module order
    variables: Vec<(u32, u32)>,
}

impl SpirvModule {
    pub fn parse(words: &[u32]) -> Result<Self> {
        if words.len() < HEADER_WORDS {
            return Err(Error::InvalidResource(format!(
                "SPIR-V module of {} words has no complete header",
                words.len()
            )));
        }

        let mut module = SpirvModule::default();
        let mut cursor = HEADER_WORDS;
        while cursor < words.len() {
            let word_count = (words[cursor] >> 16) as usize;
            let opcode = words[cursor] & 0xffff;
            if word_count == 0 || cursor + word_count > words.len() {
                return Err(Error::InvalidResource(format!(
                    "SPIR-V instruction {} at word {} overruns the module",
                    opcode, cursor
                )));
            }
            module.record(opcode, &words[cursor + 1..cursor + word_count]);
            cursor += word_count;
        }
        Ok(module)
    }

    fn record(&mut self, opcode: u32, operands: &[u32]) {
        match (opcode, operands) {
            (OP_NAME, [target, text @ ..]) => {
                self.names.insert(*target, decode_string(text));
            }
            (OP_DECORATE, [target, DECORATION_SPEC_ID, value, ..]) => {
                self.spec_ids.insert(*target, *value);
            }
            (OP_DECORATE, [target, DECORATION_BINDING, value, ..]) => {
                self.bindings.insert(*target, *value);
            }
            (OP_DECORATE, [target, DECORATION_DESCRIPTOR_SET, value, ..]) => {
                self.descriptor_sets.insert(*target, *value);
            }
            (OP_TYPE_BOOL, [id]) => {
                self.types.insert(*id, TypeDecl::Bool);
            }
            (OP_TYPE_INT, [id, width, signed]) => {
                self.types.insert(*id, TypeDecl::Int { width: *width, signed: *signed != 0 });
            }
            (OP_TYPE_FLOAT, [id, width, ..]) => {
                self.types.insert(*id, TypeDecl::Float { width: *width });
            }
            (OP_TYPE_ARRAY, [id, element, length]) => {
                self.types.insert(*id, TypeDecl::Array { element: *element, length: *length });
            }
            (OP_TYPE_RUNTIME_ARRAY, [id, element]) => {
                self.types.insert(*id, TypeDecl::RuntimeArray { element: *element });
            }
            (OP_TYPE_STRUCT, [id, members @ ..]) => {
                self.types.insert(*id, TypeDecl::Struct { members: members.to_vec() });
            }
            (OP_TYPE_POINTER, [id, _storage, pointee]) => {
                self.types.insert(*id, TypeDecl::Pointer { pointee: *pointee });
            }
            (OP_SPEC_CONSTANT_TRUE | OP_SPEC_CONSTANT_FALSE, [type_id, id]) => {
                let literal = SpecLiteral::Bool(opcode == OP_SPEC_CONSTANT_TRUE);
                self.spec_constants.insert(*id, SpecConstantDecl { type_id: *type_id, literal });
            }
            (OP_SPEC_CONSTANT, [type_id, id, value @ ..]) => {
                let literal = SpecLiteral::Words(value.to_vec());
                self.spec_constants.insert(*id, SpecConstantDecl { type_id: *type_id, literal });
            }
            (OP_VARIABLE, [type_id, id, ..]) => {
                self.variables.push((*id, *type_id));
            }
            _ => {}
        }
    }

    /// Scalar specialization constants carrying a `SpecId`, sorted by id
    ///
    /// Constants whose type has no `SpecConstValue` counterpart (64-bit
    /// integers, half floats) are left out.
    pub fn spec_constants(&self) -> Vec<ScannedSpecConstant> {
        let mut constants: Vec<ScannedSpecConstant> = self
            .spec_constants
            .iter()
            .filter_map(|(id, decl)| {
                Some(ScannedSpecConstant {
                    name: self.names.get(id).cloned(),
                    constant_id: *self.spec_ids.get(id)?,
                    default: self.decode_literal(decl)?,
                })
            })
            .collect();
        constants.sort_by_key(|constant| constant.constant_id);
        constants
    }

    /// (SpecId, compiled length) of an array length operand, if it is a
    /// specialization constant usable as a length
    fn spec_length(&self, length_id: u32) -> Option<(u32, u32)> {
        let decl = self.spec_constants.get(&length_id)?;
        let constant_id = *self.spec_ids.get(&length_id)?;
        let default = self.decode_literal(decl)?.as_dimension()?;
        Some((constant_id, default))
    }

    fn decode_literal(&self, decl: &SpecConstantDecl) -> Option<SpecConstValue> {
        let value = match (self.types.get(&decl.type_id)?, &decl.literal) {
            (TypeDecl::Bool, SpecLiteral::Bool(value)) => SpecConstValue::Bool(*value),
            (TypeDecl::Int { width, signed: true }, SpecLiteral::Words(words)) if matches!(*width, 1..=32) => {
                let shift = 32 - width;
                SpecConstValue::Int(((*words.first()? << shift) as i32) >> shift)
            }
            (TypeDecl::Int { width, signed: false }, SpecLiteral::Words(words)) if matches!(*width, 1..=32) => {
                SpecConstValue::UInt(*words.first()?)
            }
            (TypeDecl::Float { width: 32 }, SpecLiteral::Words(words)) => {
                SpecConstValue::Float(f32::from_bits(*words.first()?))
            }
            (TypeDecl::Float { width: 64 }, SpecLiteral::Words(words)) => {
                let (low, high) = (*words.first()?, *words.get(1)?);
                SpecConstValue::Double(f64::from_bits(u64::from(low) | (u64::from(high) << 32)))
            }
            _ => return None,
        };
        Some(value)
    }

    /// Block struct behind the variable decorated with (`set`, `binding`)
    fn block_struct(&self, set: u32, binding: u32) -> Option<u32> {
        let (_, pointer) = self.variables.iter().find(|(id, _)| {
            self.descriptor_sets.get(id) == Some(&set) && self.bindings.get(id) == Some(&binding)
        })?;
        let TypeDecl::Pointer { pointee } = self.types.get(pointer)? else {
            return None;
        };

        // Descriptor arrays wrap the block itself
        let mut type_id = *pointee;
        loop {
            match self.types.get(&type_id)? {
                TypeDecl::Array { element, .. } | TypeDecl::RuntimeArray { element } => type_id = *element,
                TypeDecl::Struct { .. } => return Some(type_id),
                _ => return None,
            }
        }
    }

    /// Restore specialization-constant lengths on the members of the block
    /// bound at (`set`, `binding`)
    pub fn restore_spec_lengths(&self, set: u32, binding: u32, members: &mut [ReflectedMember]) {
        if let Some(struct_id) = self.block_struct(set, binding) {
            self.restore_struct(struct_id, members);
        }
    }

    fn restore_struct(&self, struct_id: u32, members: &mut [ReflectedMember]) {
        let Some(TypeDecl::Struct { members: member_types }) = self.types.get(&struct_id) else {
            return;
        };
        for (member, type_id) in members.iter_mut().zip(member_types) {
            self.restore_type(*type_id, &mut member.member_type);
        }
    }

    fn restore_type(&self, type_id: u32, member_type: &mut ReflectedMemberType) {
        match (self.types.get(&type_id), member_type) {
            (Some(TypeDecl::Array { element, length: length_id }), ReflectedMemberType::Array { element_type, length, .. }) => {
                if let Some((constant_id, default)) = self.spec_length(*length_id) {
                    *length = ArrayLength::SpecializationConstant { constant_id, default };
                }
                self.restore_type(*element, element_type);
            }
            (Some(TypeDecl::RuntimeArray { element }), ReflectedMemberType::Array { element_type, .. }) => {
                self.restore_type(*element, element_type);
            }
            (Some(TypeDecl::Struct { .. }), ReflectedMemberType::Struct { members }) => {
                self.restore_struct(type_id, members);
            }
            _ => {}
        }
    }
}

/// Nul-terminated UTF-8 packed little-endian into words
fn decode_string(words: &[u32]) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .take_while(|byte| *byte != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "spirv_module_tests.rs"]
mod tests;
