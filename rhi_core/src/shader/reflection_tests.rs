use super::*;

fn binding(name: &str, set: u32, slot: u32, binding_type: BindingType, stages: ShaderStage) -> ReflectedBinding {
    ReflectedBinding {
        name: name.to_string(),
        set,
        binding: slot,
        binding_type,
        stages,
        array_count: 1,
        members: Vec::new(),
    }
}

fn constant(name: &str, constant_id: u32, stages: ShaderStage) -> ReflectedSpecConstant {
    ReflectedSpecConstant {
        name: name.to_string(),
        constant_id,
        default: SpecConstValue::UInt(1),
        stages,
    }
}

// ============================================================================
// BindingType tests
// ============================================================================

#[test]
fn test_layout_rules_by_binding_type() {
    assert_eq!(BindingType::UniformBuffer.layout_rules(), Some(LayoutRules::Std140));
    assert_eq!(BindingType::StorageBuffer.layout_rules(), Some(LayoutRules::Std430));
    assert_eq!(BindingType::CombinedImageSampler.layout_rules(), None);
    assert!(BindingType::StorageBuffer.is_buffer());
    assert!(!BindingType::UniformTexelBuffer.is_buffer());
}

// ============================================================================
// Merge tests
// ============================================================================

#[test]
fn test_merge_unions_stage_flags() {
    let mut vertex = ShaderReflection::new("mesh.vert");
    vertex.bindings.push(binding("Camera", 0, 0, BindingType::UniformBuffer, ShaderStage::VERTEX));
    vertex.specialization_constants.push(constant("QUALITY", 2, ShaderStage::VERTEX));

    let mut fragment = ShaderReflection::new("mesh.frag");
    fragment.bindings.push(binding("Camera", 0, 0, BindingType::UniformBuffer, ShaderStage::FRAGMENT));
    fragment.bindings.push(binding("Albedo", 1, 0, BindingType::CombinedImageSampler, ShaderStage::FRAGMENT));
    fragment.specialization_constants.push(constant("QUALITY", 2, ShaderStage::FRAGMENT));

    let merged = ShaderReflection::merge("mesh", &[vertex, fragment]).unwrap();

    assert_eq!(merged.shader_name, "mesh");
    assert_eq!(merged.bindings.len(), 2);
    assert_eq!(
        merged.binding("Camera").map(|b| b.stages),
        Some(ShaderStage::VERTEX | ShaderStage::FRAGMENT)
    );
    assert_eq!(merged.specialization_constants.len(), 1);
    assert_eq!(
        merged.specialization_constant("QUALITY").map(|c| c.stages),
        Some(ShaderStage::VERTEX | ShaderStage::FRAGMENT)
    );
}

#[test]
fn test_merge_conflicting_types_fails() {
    let mut vertex = ShaderReflection::new("a.vert");
    vertex.bindings.push(binding("Data", 0, 1, BindingType::UniformBuffer, ShaderStage::VERTEX));
    let mut fragment = ShaderReflection::new("a.frag");
    fragment.bindings.push(binding("Data", 0, 1, BindingType::StorageBuffer, ShaderStage::FRAGMENT));

    let result = ShaderReflection::merge("a", &[vertex, fragment]);

    assert!(matches!(result, Err(Error::ShaderBindingMismatch(_))));
}

#[test]
fn test_merge_sorts_bindings() {
    let mut stage = ShaderReflection::new("s");
    stage.bindings.push(binding("Late", 2, 0, BindingType::Sampler, ShaderStage::FRAGMENT));
    stage.bindings.push(binding("Early", 0, 3, BindingType::Sampler, ShaderStage::FRAGMENT));
    stage.bindings.push(binding("Middle", 0, 5, BindingType::Sampler, ShaderStage::FRAGMENT));

    let merged = ShaderReflection::merge("s", &[stage]).unwrap();
    let names: Vec<&str> = merged.bindings.iter().map(|b| b.name.as_str()).collect();

    assert_eq!(names, vec!["Early", "Middle", "Late"]);
    assert_eq!(merged.descriptor_sets(), vec![0, 2]);
}
