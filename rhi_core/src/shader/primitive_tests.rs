use super::*;
use crate::shader::buffer_layout::ArrayDimension;

fn leaf(primitive: PrimitiveType) -> FieldData {
    FieldData::Leaf(primitive)
}

// ============================================================================
// Packing rule tests
// ============================================================================

#[test]
fn test_align_to() {
    assert_eq!(align_to(0, 16), 0);
    assert_eq!(align_to(13, 4), 16);
    assert_eq!(align_to(16, 16), 16);
    assert_eq!(align_to(17, 16), 32);
    assert_eq!(align_to(5, 1), 5);
}

#[test]
fn test_scalar_metrics() {
    let float = PrimitiveType::scalar(PrimitiveKind::Float);
    let double = PrimitiveType::scalar(PrimitiveKind::Double);

    assert_eq!(float.alignment(LayoutRules::Std140), 4);
    assert_eq!(float.size(LayoutRules::Std140), 4);
    assert_eq!(double.alignment(LayoutRules::Std430), 8);
    assert_eq!(double.size(LayoutRules::Std430), 8);
}

#[test]
fn test_vector_metrics() {
    let vec2 = PrimitiveType::vector(PrimitiveKind::Float, 2);
    let vec3 = PrimitiveType::vector(PrimitiveKind::Float, 3);
    let dvec3 = PrimitiveType::vector(PrimitiveKind::Double, 3);

    assert_eq!(vec2.alignment(LayoutRules::Std140), 8);
    assert_eq!(vec2.size(LayoutRules::Std140), 8);
    assert_eq!(vec3.alignment(LayoutRules::Std430), 16);
    assert_eq!(vec3.size(LayoutRules::Std430), 12);
    assert_eq!(dvec3.alignment(LayoutRules::Std430), 32);
    assert_eq!(dvec3.size(LayoutRules::Std430), 24);
}

#[test]
fn test_matrix_metrics_std140() {
    let mat2 = PrimitiveType::matrix(PrimitiveKind::Float, 2, 2);
    let mat3 = PrimitiveType::matrix(PrimitiveKind::Float, 3, 3);
    let mat4 = PrimitiveType::matrix(PrimitiveKind::Float, 4, 4);

    assert_eq!(mat2.column_stride(LayoutRules::Std140), 16);
    assert_eq!(mat2.size(LayoutRules::Std140), 32);
    assert_eq!(mat3.size(LayoutRules::Std140), 48);
    assert_eq!(mat4.size(LayoutRules::Std140), 64);
    assert_eq!(mat4.alignment(LayoutRules::Std140), 16);
}

#[test]
fn test_matrix_metrics_std430() {
    let mat2 = PrimitiveType::matrix(PrimitiveKind::Float, 2, 2);
    let mat3 = PrimitiveType::matrix(PrimitiveKind::Float, 3, 3);

    assert_eq!(mat2.column_stride(LayoutRules::Std430), 8);
    assert_eq!(mat2.size(LayoutRules::Std430), 16);
    assert_eq!(mat2.alignment(LayoutRules::Std430), 8);
    // vec3 columns keep their 16 byte alignment
    assert_eq!(mat3.column_stride(LayoutRules::Std430), 16);
    assert_eq!(mat3.size(LayoutRules::Std430), 48);
}

#[test]
fn test_bool32_conversions() {
    assert_eq!(Bool32::from(true), Bool32(1));
    assert!(!bool::from(Bool32::default()));
    assert_eq!(std::mem::size_of::<Bool32>(), 4);
}

// ============================================================================
// ShaderField tests
// ============================================================================

#[test]
fn test_field_data_of_host_types() {
    assert_eq!(f32::field_data(LayoutRules::Std140), leaf(PrimitiveType::scalar(PrimitiveKind::Float)));
    assert_eq!(UVec3::field_data(LayoutRules::Std140), leaf(PrimitiveType::vector(PrimitiveKind::UInt, 3)));
    assert_eq!(Mat3::field_data(LayoutRules::Std430), leaf(PrimitiveType::matrix(PrimitiveKind::Float, 3, 3)));
    assert_eq!(<[Vec4; 8]>::field_data(LayoutRules::Std140), leaf(PrimitiveType::vector(PrimitiveKind::Float, 4)));
}

#[test]
fn test_array_extents_outermost_first() {
    assert!(f32::array_extents().is_empty());
    assert_eq!(<[f32; 5]>::array_extents(), vec![5]);
    assert_eq!(<[[f32; 3]; 2]>::array_extents(), vec![2, 3]);
}

#[test]
fn test_scalar_write() {
    let data = leaf(PrimitiveType::scalar(PrimitiveKind::Float));
    let mut out = [0u8; 8];

    1.5f32.write_gpu(
        &mut out,
        GpuSlot { offset: 4, stride: 4, dims: &[], data: &data, rules: LayoutRules::Std430 },
    );

    assert_eq!(&out[0..4], &[0, 0, 0, 0]);
    assert_eq!(&out[4..8], &1.5f32.to_le_bytes());
}

#[test]
fn test_matrix_write_uses_column_stride() {
    let data = leaf(PrimitiveType::matrix(PrimitiveKind::Float, 2, 2));
    let mut out = [0u8; 32];
    let matrix = Mat2::from_cols(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));

    matrix.write_gpu(
        &mut out,
        GpuSlot { offset: 0, stride: 32, dims: &[], data: &data, rules: LayoutRules::Std140 },
    );

    assert_eq!(&out[0..4], &1.0f32.to_le_bytes());
    assert_eq!(&out[4..8], &2.0f32.to_le_bytes());
    assert_eq!(&out[8..16], &[0u8; 8]);
    assert_eq!(&out[16..20], &3.0f32.to_le_bytes());
    assert_eq!(&out[20..24], &4.0f32.to_le_bytes());
}

#[test]
fn test_array_write_uses_stride() {
    let data = leaf(PrimitiveType::scalar(PrimitiveKind::UInt));
    let dims = [ArrayDimension::fixed(3)];
    let mut out = [0u8; 48];

    [7u32, 8, 9].write_gpu(
        &mut out,
        GpuSlot { offset: 0, stride: 16, dims: &dims, data: &data, rules: LayoutRules::Std140 },
    );

    assert_eq!(&out[0..4], &7u32.to_le_bytes());
    assert_eq!(&out[16..20], &8u32.to_le_bytes());
    assert_eq!(&out[32..36], &9u32.to_le_bytes());
    assert_eq!(&out[4..16], &[0u8; 12]);
}

#[test]
fn test_array_write_stops_at_dimension() {
    let data = leaf(PrimitiveType::scalar(PrimitiveKind::UInt));
    let dims = [ArrayDimension::specialized(2, 0)];
    let mut out = [0u8; 12];

    [1u32, 2, 3].write_gpu(
        &mut out,
        GpuSlot { offset: 0, stride: 4, dims: &dims, data: &data, rules: LayoutRules::Std430 },
    );

    assert_eq!(&out[0..4], &1u32.to_le_bytes());
    assert_eq!(&out[4..8], &2u32.to_le_bytes());
    assert_eq!(&out[8..12], &[0u8; 4]);
}

#[test]
fn test_nested_array_write() {
    let data = leaf(PrimitiveType::scalar(PrimitiveKind::Float));
    let dims = [ArrayDimension::fixed(2), ArrayDimension::fixed(2)];
    let mut out = [0u8; 16];

    [[1.0f32, 2.0], [3.0, 4.0]].write_gpu(
        &mut out,
        GpuSlot { offset: 0, stride: 4, dims: &dims, data: &data, rules: LayoutRules::Std430 },
    );

    let written: Vec<f32> = out
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    assert_eq!(written, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_write_past_end_is_clipped() {
    let mut out = [0u8; 4];
    write_bytes(&mut out, 2, &[1, 2, 3, 4]);
    assert_eq!(out, [0, 0, 0, 0]);
}
