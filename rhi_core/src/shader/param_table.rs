/// Shader parameter binding table
///
/// Maps buffer parameter names to the host layouts that describe them.
/// Built once (usually into a `static OnceLock`), then shared by every
/// shader that uses those parameters. `bind()` checks a shader's reflection
/// against the table and produces the `ShaderParamLayout` used to create
/// descriptor set layouts and to fill buffers.
///
/// A uniform or storage buffer the table does not know about is a
/// configuration error: the shader must never be used to draw.

use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics::types::ShaderStage;
use crate::shader::buffer_layout::{ArrayDimension, BufferLayout, FieldData, FieldLayout, ShaderBufferType};
use crate::shader::primitive::{LayoutRules, PrimitiveKind};
use crate::shader::reflection::{
    ArrayLength, BindingType, ReflectedBinding, ReflectedMember, ReflectedMemberType, ShaderReflection,
};
use crate::shader::specialization::{SpecializationConstants, SpecializationValues};

// ===== LAYOUT SOURCES =====

#[derive(Debug, Clone)]
enum LayoutSource {
    /// Layout of a `ShaderBufferType`, picked per packing rules at bind time
    Typed {
        type_name: &'static str,
        layout: fn(LayoutRules) -> &'static Arc<BufferLayout>,
    },
    /// A layout built by hand, used as is
    Fixed(Arc<BufferLayout>),
}

impl LayoutSource {
    fn layout(&self, rules: LayoutRules) -> Arc<BufferLayout> {
        match self {
            LayoutSource::Typed { layout, .. } => Arc::clone(layout(rules)),
            LayoutSource::Fixed(layout) => Arc::clone(layout),
        }
    }

    fn describe(&self) -> &str {
        match self {
            LayoutSource::Typed { type_name, .. } => type_name,
            LayoutSource::Fixed(layout) => layout.name(),
        }
    }
}

// ===== TABLE =====

#[derive(Debug, Clone, Default)]
pub struct ShaderParamBindingTable {
    entries: FxHashMap<String, LayoutSource>,
}

pub struct ShaderParamBindingTableBuilder {
    entries: FxHashMap<String, LayoutSource>,
}

impl ShaderParamBindingTableBuilder {
    /// Parameter `name` is described by host type `T`
    pub fn buffer<T: ShaderBufferType>(self, name: &str) -> Self {
        self.insert(
            name,
            LayoutSource::Typed {
                type_name: T::TYPE_NAME,
                layout: T::buffer_layout,
            },
        )
    }

    /// Parameter `name` is described by an explicit layout
    pub fn layout(self, name: &str, layout: Arc<BufferLayout>) -> Self {
        self.insert(name, LayoutSource::Fixed(layout))
    }

    pub fn build(self) -> ShaderParamBindingTable {
        ShaderParamBindingTable { entries: self.entries }
    }

    fn insert(mut self, name: &str, source: LayoutSource) -> Self {
        if let Some(existing) = self.entries.get(name) {
            crate::rhi_fatal!(
                "rhi::ShaderParamBindingTable",
                "Parameter '{}' registered twice ('{}' then '{}')",
                name,
                existing.describe(),
                source.describe()
            );
        }
        self.entries.insert(name.to_string(), source);
        self
    }
}

impl ShaderParamBindingTable {
    pub fn builder() -> ShaderParamBindingTableBuilder {
        ShaderParamBindingTableBuilder { entries: FxHashMap::default() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check `reflection` against this table and describe its parameters
    ///
    /// Fails with `ShaderBindingMismatch` when a buffer binding has no entry
    /// or disagrees with its host layout, and with `UnresolvedSpecialization`
    /// when a layout array depends on a constant the shader never declares.
    pub fn bind(&self, reflection: &ShaderReflection, constants: &SpecializationConstants) -> Result<ShaderParamLayout> {
        let specialization = constants.resolve(reflection);
        let mut params = Vec::with_capacity(reflection.bindings.len());
        let mut names: FxHashSet<&str> = FxHashSet::default();

        let mut bindings: Vec<&ReflectedBinding> = reflection.bindings.iter().collect();
        bindings.sort_by_key(|binding| (binding.set, binding.binding));

        for binding in bindings {
            if binding.binding_type == BindingType::SubpassInput {
                crate::rhi_warn!(
                    "rhi::ShaderParamBindingTable",
                    "Shader '{}': subpass input '{}' (set {}, binding {}) is not a bindable parameter, skipped",
                    reflection.shader_name,
                    binding.name,
                    binding.set,
                    binding.binding
                );
                continue;
            }

            if !names.insert(binding.name.as_str()) {
                return Err(mismatch(format!(
                    "shader '{}' declares parameter '{}' more than once",
                    reflection.shader_name, binding.name
                )));
            }

            let buffer_layout = match binding.binding_type.layout_rules() {
                Some(rules) => Some(self.bind_buffer(reflection, binding, rules, &specialization)?),
                None => None,
            };

            params.push(ShaderParam {
                name: binding.name.clone(),
                set: binding.set,
                binding: binding.binding,
                binding_type: binding.binding_type,
                stages: binding.stages,
                array_count: binding.array_count,
                buffer_layout,
            });
        }

        let by_name = params.iter().enumerate().map(|(index, param)| (param.name.clone(), index)).collect();

        crate::rhi_debug!(
            "rhi::ShaderParamBindingTable",
            "Bound shader '{}': {} parameters in {} sets",
            reflection.shader_name,
            params.len(),
            reflection.descriptor_sets().len()
        );

        Ok(ShaderParamLayout {
            shader_name: reflection.shader_name.clone(),
            params,
            by_name,
            specialization,
        })
    }

    fn bind_buffer(
        &self,
        reflection: &ShaderReflection,
        binding: &ReflectedBinding,
        rules: LayoutRules,
        specialization: &SpecializationValues,
    ) -> Result<Arc<BufferLayout>> {
        let Some(source) = self.entries.get(&binding.name) else {
            return Err(mismatch(format!(
                "shader '{}' expects buffer '{}' (set {}, binding {}) but the binding table has no entry for it",
                reflection.shader_name, binding.name, binding.set, binding.binding
            )));
        };

        let layout = source.layout(rules);
        if layout.rules() != rules {
            return Err(mismatch(format!(
                "buffer '{}' of shader '{}' needs {:?} packing, layout '{}' uses {:?}",
                binding.name,
                reflection.shader_name,
                rules,
                layout.name(),
                layout.rules()
            )));
        }

        let layout = layout.specialize(specialization)?;
        validate_members(&layout, &binding.members, &binding.name)?;
        Ok(Arc::new(layout))
    }
}

fn mismatch(message: String) -> Error {
    crate::rhi_error!("rhi::ShaderParamBindingTable", "{}", message);
    Error::ShaderBindingMismatch(message)
}

// ===== VALIDATION =====

/// Every reflected member must exist in `layout` at the same offset with a compatible type
fn validate_members(layout: &BufferLayout, members: &[ReflectedMember], path: &str) -> Result<()> {
    for member in members {
        let member_path = format!("{}.{}", path, member.name);
        let Some(field) = layout.field(&member.name) else {
            return Err(mismatch(format!(
                "'{}' has no field in layout '{}'",
                member_path,
                layout.name()
            )));
        };
        if field.offset != member.offset {
            return Err(mismatch(format!(
                "'{}' is at offset {} in the shader and {} in layout '{}'",
                member_path,
                member.offset,
                field.offset,
                layout.name()
            )));
        }
        validate_type(field, &field.array_dims, &member.member_type, layout.rules(), &member_path)?;
    }
    Ok(())
}

fn validate_type(
    field: &FieldLayout,
    dims: &[ArrayDimension],
    member_type: &ReflectedMemberType,
    rules: LayoutRules,
    path: &str,
) -> Result<()> {
    if let ReflectedMemberType::Array { element_type, length, stride } = member_type {
        let Some((dim, inner)) = dims.split_first() else {
            return Err(mismatch(format!("'{}' is an array in the shader only", path)));
        };
        validate_length(dim, *length, path)?;

        let dimension_index = field.array_dims.len() - dims.len();
        let Some(host_stride) = field.dimension_stride(dimension_index) else {
            return Err(mismatch(format!("'{}' has a host array stride beyond 4 GiB", path)));
        };
        if *stride != 0 && *stride != host_stride {
            return Err(mismatch(format!(
                "'{}' has array stride {} in the shader and {} on the host",
                path, stride, host_stride
            )));
        }
        return validate_type(field, inner, element_type, rules, path);
    }

    if !dims.is_empty() {
        return Err(mismatch(format!("'{}' is an array on the host only", path)));
    }

    match (member_type, &field.data) {
        (ReflectedMemberType::Struct { members }, FieldData::Struct(nested)) => validate_members(nested, members, path),
        (ReflectedMemberType::Struct { .. }, FieldData::Leaf(primitive)) => Err(mismatch(format!(
            "'{}' is a struct in the shader and {:?} on the host",
            path, primitive
        ))),
        (_, FieldData::Struct(nested)) => Err(mismatch(format!(
            "'{}' is {:?} in the shader and struct '{}' on the host",
            path,
            member_type,
            nested.name()
        ))),
        (ReflectedMemberType::Scalar(kind), FieldData::Leaf(primitive)) => {
            check_leaf(path, *kind, 1, 1, primitive.kind, primitive.vec_size, primitive.columns)
        }
        (ReflectedMemberType::Vector { kind, size }, FieldData::Leaf(primitive)) => {
            check_leaf(path, *kind, *size, 1, primitive.kind, primitive.vec_size, primitive.columns)
        }
        (ReflectedMemberType::Matrix { kind, columns, rows, column_stride }, FieldData::Leaf(primitive)) => {
            check_leaf(path, *kind, *rows, *columns, primitive.kind, primitive.vec_size, primitive.columns)?;
            let host_stride = primitive.column_stride(rules);
            if *column_stride != 0 && *column_stride != host_stride {
                return Err(mismatch(format!(
                    "'{}' has matrix stride {} in the shader and {} on the host",
                    path, column_stride, host_stride
                )));
            }
            Ok(())
        }
        (ReflectedMemberType::Array { .. }, _) => Ok(()),
    }
}

fn validate_length(dim: &ArrayDimension, length: ArrayLength, path: &str) -> Result<()> {
    match length {
        ArrayLength::Fixed(count) if count == dim.dimension => Ok(()),
        ArrayLength::Fixed(count) => Err(mismatch(format!(
            "'{}' has {} elements in the shader and {} on the host",
            path, count, dim.dimension
        ))),
        ArrayLength::SpecializationConstant { constant_id, .. }
            if dim.is_specialization_const && dim.specialization_index == constant_id =>
        {
            Ok(())
        }
        ArrayLength::SpecializationConstant { constant_id, .. } => Err(mismatch(format!(
            "'{}' is sized by specialization constant {} in the shader, not on the host",
            path, constant_id
        ))),
        ArrayLength::Runtime => Ok(()),
    }
}

/// Host booleans are 32-bit and reflect as unsigned ints
fn kinds_compatible(shader: PrimitiveKind, host: PrimitiveKind) -> bool {
    shader == host
        || matches!(
            (shader, host),
            (PrimitiveKind::UInt, PrimitiveKind::Bool) | (PrimitiveKind::Bool, PrimitiveKind::UInt)
        )
}

fn check_leaf(
    path: &str,
    kind: PrimitiveKind,
    vec_size: u32,
    columns: u32,
    host_kind: PrimitiveKind,
    host_vec_size: u32,
    host_columns: u32,
) -> Result<()> {
    if kinds_compatible(kind, host_kind) && vec_size == host_vec_size && columns == host_columns {
        return Ok(());
    }
    Err(mismatch(format!(
        "'{}' is {:?}x{}x{} in the shader and {:?}x{}x{} on the host",
        path, kind, columns, vec_size, host_kind, host_columns, host_vec_size
    )))
}

// ===== BOUND LAYOUT =====

#[derive(Debug, Clone)]
pub struct ShaderParam {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub binding_type: BindingType,
    pub stages: ShaderStage,
    pub array_count: u32,
    /// Specialized host layout, for buffer parameters only
    pub buffer_layout: Option<Arc<BufferLayout>>,
}

/// Parameters of one shader, checked against the binding table
#[derive(Debug, Clone)]
pub struct ShaderParamLayout {
    shader_name: String,
    params: Vec<ShaderParam>,
    by_name: FxHashMap<String, usize>,
    specialization: SpecializationValues,
}

impl ShaderParamLayout {
    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    pub fn param(&self, name: &str) -> Option<&ShaderParam> {
        self.by_name.get(name).map(|&index| &self.params[index])
    }

    /// Descriptor set holding `name`
    ///
    /// Optional parameters are looked up this way, so a missing one is only
    /// logged.
    pub fn set_id(&self, name: &str) -> Option<u32> {
        let set = self.param(name).map(|param| param.set);
        if set.is_none() {
            crate::rhi_error!(
                "rhi::ShaderParamLayout",
                "Shader '{}' has no parameter '{}'",
                self.shader_name,
                name
            );
        }
        set
    }

    /// Parameters sorted by (set, binding)
    pub fn params(&self) -> &[ShaderParam] {
        &self.params
    }

    pub fn params_in_set(&self, set: u32) -> impl Iterator<Item = &ShaderParam> + '_ {
        self.params.iter().filter(move |param| param.set == set)
    }

    pub fn descriptor_sets(&self) -> Vec<u32> {
        let mut sets: Vec<u32> = self.params.iter().map(|param| param.set).collect();
        sets.dedup();
        sets
    }

    pub fn buffer_layout(&self, name: &str) -> Option<&Arc<BufferLayout>> {
        self.param(name).and_then(|param| param.buffer_layout.as_ref())
    }

    /// Values of every specialization constant, defaults filled in
    pub fn specialization(&self) -> &SpecializationValues {
        &self.specialization
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "param_table_tests.rs"]
mod tests;
