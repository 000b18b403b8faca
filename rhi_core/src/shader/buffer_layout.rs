/// Buffer layout descriptors
///
/// A `BufferLayout` describes how a host struct maps onto the bytes of a
/// uniform or storage buffer under one set of packing rules. Layouts are
/// immutable once built; `specialize()` produces a new one with every
/// specialization-constant sized array resolved.
///
/// Layouts are normally obtained from a type declared with
/// `shader_buffer_struct!`:
///
/// ```no_run
/// use rhi_core::shader_buffer_struct;
/// use rhi_core::rhi::shader::{LayoutRules, ShaderBufferType};
/// use rhi_core::glam::{Mat4, Vec4};
///
/// shader_buffer_struct! {
///     #[derive(Clone, Copy, Default)]
///     pub struct CameraBlock {
///         pub view_proj: Mat4,
///         pub position: Vec4,
///         #[spec_const(0)]
///         pub cascades: [Vec4; 4],
///     }
/// }
///
/// let layout = CameraBlock::buffer_layout(LayoutRules::Std140);
/// assert_eq!(layout.field("position").map(|f| f.offset), Some(64));
/// ```

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::shader::primitive::{align_to, GpuSlot, LayoutRules, PrimitiveType, ShaderField};
use crate::shader::specialization::SpecializationValues;

// ===== FIELD DESCRIPTION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayDimension {
    /// Element count, the host length until specialized
    pub dimension: u32,
    pub is_specialization_const: bool,
    /// Constant id, meaningful only when `is_specialization_const`
    pub specialization_index: u32,
}

impl ArrayDimension {
    pub fn fixed(dimension: u32) -> Self {
        Self { dimension, is_specialization_const: false, specialization_index: 0 }
    }

    pub fn specialized(placeholder: u32, constant_id: u32) -> Self {
        Self { dimension: placeholder, is_specialization_const: true, specialization_index: constant_id }
    }
}

/// Innermost element of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Leaf(PrimitiveType),
    Struct(Arc<BufferLayout>),
}

impl FieldData {
    /// (alignment, size) of one element, before array rounding
    fn metrics(&self, rules: LayoutRules) -> (u32, u32) {
        match self {
            FieldData::Leaf(primitive) => (primitive.alignment(rules), primitive.size(rules)),
            FieldData::Struct(layout) => (layout.alignment, layout.size.unwrap_or(0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u32,
    /// Stride of one innermost array element (element size for non-arrays)
    pub stride: u32,
    /// `None` while a specialization-constant dimension is unresolved
    pub total_size: Option<u32>,
    /// Outermost first
    pub array_dims: Vec<ArrayDimension>,
    pub data: FieldData,
}

impl FieldLayout {
    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    pub fn has_specialization_dims(&self) -> bool {
        self.array_dims.iter().any(|dim| dim.is_specialization_const)
    }

    /// Byte distance between two consecutive elements of dimension `index`,
    /// `None` if it does not fit in 32 bits
    pub fn dimension_stride(&self, index: usize) -> Option<u32> {
        self.array_dims
            .iter()
            .skip(index + 1)
            .try_fold(self.stride, |stride, dim| stride.checked_mul(dim.dimension))
    }

    /// Nested layout when the element is a struct
    pub fn struct_layout(&self) -> Option<&Arc<BufferLayout>> {
        match &self.data {
            FieldData::Struct(layout) => Some(layout),
            FieldData::Leaf(_) => None,
        }
    }

    pub fn slot(&self, base: usize, rules: LayoutRules) -> GpuSlot<'_> {
        GpuSlot {
            offset: base + self.offset as usize,
            stride: self.stride,
            dims: &self.array_dims,
            data: &self.data,
            rules,
        }
    }
}

// ===== BUFFER LAYOUT =====

#[derive(Debug, Clone, PartialEq)]
pub struct BufferLayout {
    name: String,
    rules: LayoutRules,
    fields: Vec<FieldLayout>,
    alignment: u32,
    size: Option<u32>,
}

impl BufferLayout {
    pub fn builder(name: impl Into<String>, rules: LayoutRules) -> BufferLayoutBuilder {
        BufferLayoutBuilder { name: name.into(), rules, fields: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> LayoutRules {
        self.rules
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// Total byte size, `None` until every specialization dimension is resolved
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn is_resolved(&self) -> bool {
        self.size.is_some()
    }

    /// Copy of this layout with every specialization dimension taken from `values`
    ///
    /// Offsets of the fields after a resized array move accordingly.
    /// Resolving an already resolved layout with the same values gives an
    /// identical layout.
    pub fn specialize(&self, values: &SpecializationValues) -> Result<BufferLayout> {
        let mut fields = self.fields.clone();
        for field in &mut fields {
            for index in 0..field.array_dims.len() {
                let dim = field.array_dims[index];
                if !dim.is_specialization_const {
                    continue;
                }
                let Some(dimension) = values.dimension(dim.specialization_index) else {
                    let message = format!(
                        "no value for specialization constant {} sizing '{}.{}'",
                        dim.specialization_index, self.name, field.name
                    );
                    crate::rhi_error!("rhi::BufferLayout", "{}", message);
                    return Err(Error::UnresolvedSpecialization(message));
                };
                field.array_dims[index].dimension = dimension;
            }
        }

        let Some((alignment, size)) = place_fields(&mut fields, self.rules, true) else {
            let message = format!("layout '{}' exceeds 4 GiB once specialized", self.name);
            crate::rhi_error!("rhi::BufferLayout", "{}", message);
            return Err(Error::InvalidResource(message));
        };
        Ok(BufferLayout {
            name: self.name.clone(),
            rules: self.rules,
            fields,
            alignment,
            size,
        })
    }

    /// Write `value` into `out` following this layout
    ///
    /// `out` must hold at least `size()` bytes. Host arrays longer than a
    /// specialized dimension are truncated; shorter ones leave the tail alone.
    pub fn pack<T: ShaderBufferType>(&self, value: &T, out: &mut [u8]) -> Result<()> {
        let Some(size) = self.size else {
            let message = format!("layout '{}' still has unresolved specialization dimensions", self.name);
            crate::rhi_error!("rhi::BufferLayout", "{}", message);
            return Err(Error::UnresolvedSpecialization(message));
        };
        if out.len() < size as usize {
            let message = format!(
                "destination of {} bytes too small for layout '{}' ({} bytes)",
                out.len(),
                self.name,
                size
            );
            crate::rhi_error!("rhi::BufferLayout", "{}", message);
            return Err(Error::InvalidResource(message));
        }
        let expected = T::buffer_layout(self.rules);
        let same_fields = expected.fields.len() == self.fields.len()
            && expected.fields.iter().zip(&self.fields).all(|(a, b)| a.name == b.name);
        if expected.name != self.name || !same_fields {
            crate::rhi_bail!(
                "rhi::BufferLayout",
                "Type '{}' does not match layout '{}'",
                T::TYPE_NAME,
                self.name
            );
        }

        value.write_fields(self, out, 0);
        Ok(())
    }

    /// Packed bytes of `value`, sized to this layout
    pub fn to_bytes<T: ShaderBufferType>(&self, value: &T) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; self.size.unwrap_or(0) as usize];
        self.pack(value, &mut bytes)?;
        Ok(bytes)
    }
}

// ===== BUILDER =====

pub struct BufferLayoutBuilder {
    name: String,
    rules: LayoutRules,
    fields: Vec<FieldLayout>,
}

impl BufferLayoutBuilder {
    pub fn field<T: ShaderField>(self, name: &str) -> Self {
        self.field_with::<T>(name, None)
    }

    /// Add a field of host type `T`, its outermost dimension optionally
    /// sized by specialization constant `spec_const`
    pub fn field_with<T: ShaderField>(self, name: &str, spec_const: Option<u32>) -> Self {
        let extents = T::array_extents();
        let mut dims: Vec<ArrayDimension> = extents.into_iter().map(ArrayDimension::fixed).collect();

        if let Some(constant_id) = spec_const {
            let Some(outermost) = dims.first_mut() else {
                crate::rhi_fatal!(
                    "rhi::BufferLayout",
                    "Field '{}.{}' is not an array and cannot be sized by specialization constant {}",
                    self.name,
                    name,
                    constant_id
                );
            };
            *outermost = ArrayDimension::specialized(outermost.dimension, constant_id);
        }

        let data = T::field_data(self.rules);
        self.raw_field(name, data, dims)
    }

    /// Add a field from an explicit description
    pub fn raw_field(mut self, name: &str, data: FieldData, array_dims: Vec<ArrayDimension>) -> Self {
        if self.fields.iter().any(|field| field.name == name) {
            crate::rhi_fatal!("rhi::BufferLayout", "Duplicate field '{}' in layout '{}'", name, self.name);
        }
        if let FieldData::Struct(nested) = &data {
            if !nested.is_resolved() {
                crate::rhi_fatal!(
                    "rhi::BufferLayout",
                    "Nested layout '{}' of field '{}.{}' must be fully resolved",
                    nested.name,
                    self.name,
                    name
                );
            }
            if nested.rules != self.rules {
                crate::rhi_fatal!(
                    "rhi::BufferLayout",
                    "Nested layout '{}' of field '{}.{}' uses other packing rules",
                    nested.name,
                    self.name,
                    name
                );
            }
        }

        self.fields.push(FieldLayout {
            name: name.to_string(),
            offset: 0,
            stride: 0,
            total_size: None,
            array_dims,
            data,
        });
        self
    }

    pub fn build(mut self) -> BufferLayout {
        let Some((alignment, size)) = place_fields(&mut self.fields, self.rules, false) else {
            crate::rhi_fatal!("rhi::BufferLayout", "Layout '{}' exceeds 4 GiB", self.name);
        };
        BufferLayout {
            name: self.name,
            rules: self.rules,
            fields: self.fields,
            alignment,
            size,
        }
    }
}

/// Assign offsets and strides in declaration order
///
/// Returns the struct alignment and its padded size, the size being `None`
/// when a specialization dimension is still a placeholder. Returns `None`
/// when an offset or size does not fit in 32 bits.
fn place_fields(fields: &mut [FieldLayout], rules: LayoutRules, resolved: bool) -> Option<(u32, Option<u32>)> {
    let mut offset = 0u32;
    let mut max_alignment = 1u32;
    let mut unresolved = false;

    for field in fields.iter_mut() {
        let (element_alignment, element_size) = field.data.metrics(rules);
        let (alignment, stride, size) = if field.array_dims.is_empty() {
            (element_alignment, element_size, element_size)
        } else {
            let alignment = match rules {
                LayoutRules::Std140 => align_to(element_alignment, 16),
                LayoutRules::Std430 => element_alignment,
            };
            let stride = checked_align(element_size, alignment)?;
            let size = field.array_dims.iter().try_fold(stride, |size, dim| size.checked_mul(dim.dimension))?;
            (alignment, stride, size)
        };

        offset = checked_align(offset, alignment)?;
        field.offset = offset;
        field.stride = stride;
        field.total_size = if field.has_specialization_dims() && !resolved {
            unresolved = true;
            None
        } else {
            Some(size)
        };

        offset = offset.checked_add(size)?;
        max_alignment = max_alignment.max(alignment);
    }

    let alignment = match rules {
        LayoutRules::Std140 => align_to(max_alignment, 16),
        LayoutRules::Std430 => max_alignment,
    };
    let size = match unresolved {
        true => None,
        false => Some(checked_align(offset, alignment)?),
    };
    Some((alignment, size))
}

fn checked_align(value: u32, alignment: u32) -> Option<u32> {
    match alignment {
        0 | 1 => Some(value),
        _ => value.div_ceil(alignment).checked_mul(alignment),
    }
}

// ===== TYPE-DRIVEN LAYOUTS =====

/// A host struct with a known layout per packing rule set
///
/// Implemented by `shader_buffer_struct!`.
pub trait ShaderBufferType: ShaderField + Sized + 'static {
    const TYPE_NAME: &'static str;

    /// Layout for `rules`, built once on first use
    fn buffer_layout(rules: LayoutRules) -> &'static Arc<BufferLayout>;

    /// Write every field relative to `base` following `layout`
    fn write_fields(&self, layout: &BufferLayout, out: &mut [u8], base: usize);
}

/// Declare a struct usable as a shader buffer
///
/// Fields are laid out in declaration order. An array field may carry
/// `#[spec_const(id)]`, in which case its outermost length is given by
/// specialization constant `id` and the host length is only a placeholder.
#[macro_export]
macro_rules! shader_buffer_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[spec_const($spec:literal)])?
                $fvis:vis $fname:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $fname : $fty ),*
        }

        impl $crate::rhi::shader::ShaderBufferType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn buffer_layout(
                rules: $crate::rhi::shader::LayoutRules,
            ) -> &'static ::std::sync::Arc<$crate::rhi::shader::BufferLayout> {
                static STD140: ::std::sync::OnceLock<::std::sync::Arc<$crate::rhi::shader::BufferLayout>> =
                    ::std::sync::OnceLock::new();
                static STD430: ::std::sync::OnceLock<::std::sync::Arc<$crate::rhi::shader::BufferLayout>> =
                    ::std::sync::OnceLock::new();

                let cell = match rules {
                    $crate::rhi::shader::LayoutRules::Std140 => &STD140,
                    $crate::rhi::shader::LayoutRules::Std430 => &STD430,
                };
                cell.get_or_init(|| {
                    let builder = $crate::rhi::shader::BufferLayout::builder(stringify!($name), rules);
                    $(
                        let builder = builder.field_with::<$fty>(
                            stringify!($fname),
                            $crate::__shader_spec_const!($($spec)?),
                        );
                    )*
                    ::std::sync::Arc::new(builder.build())
                })
            }

            fn write_fields(
                &self,
                layout: &$crate::rhi::shader::BufferLayout,
                out: &mut [u8],
                base: usize,
            ) {
                $(
                    if let Some(field) = layout.field(stringify!($fname)) {
                        $crate::rhi::shader::ShaderField::write_gpu(
                            &self.$fname,
                            out,
                            field.slot(base, layout.rules()),
                        );
                    }
                )*
            }
        }

        impl $crate::rhi::shader::ShaderField for $name {
            fn field_data(rules: $crate::rhi::shader::LayoutRules) -> $crate::rhi::shader::FieldData {
                $crate::rhi::shader::FieldData::Struct(::std::sync::Arc::clone(
                    <$name as $crate::rhi::shader::ShaderBufferType>::buffer_layout(rules),
                ))
            }

            fn write_gpu(&self, out: &mut [u8], slot: $crate::rhi::shader::GpuSlot<'_>) {
                if let $crate::rhi::shader::FieldData::Struct(layout) = slot.data {
                    $crate::rhi::shader::ShaderBufferType::write_fields(self, layout, out, slot.offset);
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __shader_spec_const {
    () => {
        ::std::option::Option::None
    };
    ($spec:literal) => {
        ::std::option::Option::Some($spec)
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "buffer_layout_tests.rs"]
mod tests;
