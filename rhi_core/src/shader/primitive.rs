/// Shader-visible primitive types and GPU packing rules
///
/// Offsets and strides follow the std140 (uniform buffers) and std430
/// (storage buffers) rules exactly, independent of host struct padding.
/// Host values are written into GPU layout through `ShaderField`.

use bytemuck::{Pod, Zeroable};
use glam::{DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};
use crate::shader::buffer_layout::{ArrayDimension, FieldData};

// ===== PACKING RULES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutRules {
    /// Uniform buffers: array strides and struct alignment rounded up to 16 bytes
    Std140,
    /// Storage buffers: natural alignment
    Std430,
}

/// Round `value` up to a multiple of `alignment`
pub fn align_to(value: u32, alignment: u32) -> u32 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

// ===== PRIMITIVES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// 32-bit boolean, seen as an unsigned int by shaders
    Bool,
    Int,
    UInt,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn scalar_size(&self) -> u32 {
        match self {
            PrimitiveKind::Double => 8,
            _ => 4,
        }
    }
}

/// Scalar, vector (`vec_size` 2..4) or matrix (`columns` > 1 of `vec_size` rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    pub kind: PrimitiveKind,
    pub vec_size: u32,
    pub columns: u32,
}

impl PrimitiveType {
    pub const fn scalar(kind: PrimitiveKind) -> Self {
        Self { kind, vec_size: 1, columns: 1 }
    }

    pub const fn vector(kind: PrimitiveKind, vec_size: u32) -> Self {
        Self { kind, vec_size, columns: 1 }
    }

    pub const fn matrix(kind: PrimitiveKind, columns: u32, rows: u32) -> Self {
        Self { kind, vec_size: rows, columns }
    }

    pub fn is_matrix(&self) -> bool {
        self.columns > 1
    }

    /// Alignment of one column (or of the whole value when not a matrix)
    pub fn vector_alignment(&self) -> u32 {
        let scalar = self.kind.scalar_size();
        match self.vec_size {
            1 => scalar,
            2 => scalar * 2,
            _ => scalar * 4,
        }
    }

    /// Distance between two matrix columns
    pub fn column_stride(&self, rules: LayoutRules) -> u32 {
        match rules {
            LayoutRules::Std140 => align_to(self.vector_alignment(), 16),
            LayoutRules::Std430 => self.vector_alignment(),
        }
    }

    pub fn alignment(&self, rules: LayoutRules) -> u32 {
        if self.is_matrix() {
            self.column_stride(rules)
        } else {
            self.vector_alignment()
        }
    }

    pub fn size(&self, rules: LayoutRules) -> u32 {
        if self.is_matrix() {
            self.column_stride(rules) * self.columns
        } else {
            self.kind.scalar_size() * self.vec_size
        }
    }
}

/// 32-bit boolean as stored in shader buffers
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Bool32(pub u32);

impl From<bool> for Bool32 {
    fn from(value: bool) -> Self {
        Bool32(value as u32)
    }
}

impl From<Bool32> for bool {
    fn from(value: Bool32) -> Self {
        value.0 != 0
    }
}

// ===== HOST TO GPU MAPPING =====

/// Where a value goes in the destination buffer
#[derive(Debug, Clone, Copy)]
pub struct GpuSlot<'a> {
    /// Byte offset of the value
    pub offset: usize,
    /// Stride of one innermost array element
    pub stride: u32,
    /// Array dimensions still to walk, outermost first
    pub dims: &'a [ArrayDimension],
    pub data: &'a FieldData,
    pub rules: LayoutRules,
}

/// A host type usable as a field of a shader buffer struct
pub trait ShaderField {
    /// Layout data of the innermost element
    fn field_data(rules: LayoutRules) -> FieldData;

    /// Array extents, outermost first, empty for non-arrays
    fn array_extents() -> Vec<u32> {
        Vec::new()
    }

    /// Write this value in GPU layout
    fn write_gpu(&self, out: &mut [u8], slot: GpuSlot<'_>);
}

/// Copy `bytes` at `offset`, silently clipped to the destination
pub(crate) fn write_bytes(out: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(dst) = out.get_mut(offset..offset + bytes.len()) {
        dst.copy_from_slice(bytes);
    }
}

macro_rules! impl_plain_shader_field {
    ($($ty:ty => $prim:expr),* $(,)?) => {
        $(
            impl ShaderField for $ty {
                fn field_data(_rules: LayoutRules) -> FieldData {
                    FieldData::Leaf($prim)
                }

                fn write_gpu(&self, out: &mut [u8], slot: GpuSlot<'_>) {
                    write_bytes(out, slot.offset, bytemuck::bytes_of(self));
                }
            }
        )*
    };
}

impl_plain_shader_field! {
    f32 => PrimitiveType::scalar(PrimitiveKind::Float),
    i32 => PrimitiveType::scalar(PrimitiveKind::Int),
    u32 => PrimitiveType::scalar(PrimitiveKind::UInt),
    f64 => PrimitiveType::scalar(PrimitiveKind::Double),
    Bool32 => PrimitiveType::scalar(PrimitiveKind::Bool),
    Vec2 => PrimitiveType::vector(PrimitiveKind::Float, 2),
    Vec3 => PrimitiveType::vector(PrimitiveKind::Float, 3),
    Vec4 => PrimitiveType::vector(PrimitiveKind::Float, 4),
    IVec2 => PrimitiveType::vector(PrimitiveKind::Int, 2),
    IVec3 => PrimitiveType::vector(PrimitiveKind::Int, 3),
    IVec4 => PrimitiveType::vector(PrimitiveKind::Int, 4),
    UVec2 => PrimitiveType::vector(PrimitiveKind::UInt, 2),
    UVec3 => PrimitiveType::vector(PrimitiveKind::UInt, 3),
    UVec4 => PrimitiveType::vector(PrimitiveKind::UInt, 4),
    DVec2 => PrimitiveType::vector(PrimitiveKind::Double, 2),
    DVec3 => PrimitiveType::vector(PrimitiveKind::Double, 3),
    DVec4 => PrimitiveType::vector(PrimitiveKind::Double, 4),
}

// Matrices are column arrays, each column at its own stride
macro_rules! impl_matrix_shader_field {
    ($($ty:ty => $columns:literal x $rows:literal),* $(,)?) => {
        $(
            impl ShaderField for $ty {
                fn field_data(_rules: LayoutRules) -> FieldData {
                    FieldData::Leaf(PrimitiveType::matrix(PrimitiveKind::Float, $columns, $rows))
                }

                fn write_gpu(&self, out: &mut [u8], slot: GpuSlot<'_>) {
                    let column_stride = PrimitiveType::matrix(PrimitiveKind::Float, $columns, $rows)
                        .column_stride(slot.rules) as usize;
                    for column in 0..$columns {
                        let value = self.col(column);
                        write_bytes(out, slot.offset + column * column_stride, bytemuck::bytes_of(&value));
                    }
                }
            }
        )*
    };
}

impl_matrix_shader_field! {
    Mat2 => 2 x 2,
    Mat3 => 3 x 3,
    Mat4 => 4 x 4,
}

impl<T: ShaderField, const N: usize> ShaderField for [T; N] {
    fn field_data(rules: LayoutRules) -> FieldData {
        T::field_data(rules)
    }

    fn array_extents() -> Vec<u32> {
        let mut extents = vec![N as u32];
        extents.extend(T::array_extents());
        extents
    }

    /// Writes at most as many elements as the (possibly specialized) dimension holds
    fn write_gpu(&self, out: &mut [u8], slot: GpuSlot<'_>) {
        let Some((dimension, inner)) = slot.dims.split_first() else {
            return;
        };
        let inner_count: u32 = inner.iter().map(|dim| dim.dimension).product();
        let element_stride = slot.stride as usize * inner_count as usize;

        for (index, element) in self.iter().take(dimension.dimension as usize).enumerate() {
            element.write_gpu(
                out,
                GpuSlot {
                    offset: slot.offset + index * element_stride,
                    dims: inner,
                    ..slot
                },
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "primitive_tests.rs"]
mod tests;
