/*!
# RHI SPIR-V

SPIR-V reflection for the RHI core.

Compiled shader stages are reflected with spirq into
`rhi_core::rhi::shader::ShaderReflection`, ready to be merged and checked
against a `ShaderParamBindingTable`.

```no_run
use rhi_core::rhi::graphics::ShaderStage;
use rhi_core::rhi::shader::{ShaderParamBindingTable, SpecializationConstants};
use rhi_spirv::{reflect_pipeline, SpirvShader};

# fn main() -> rhi_core::rhi::Result<()> {
let vs = SpirvShader::from_bytes("forward.vert", ShaderStage::VERTEX, &std::fs::read("forward.vert.spv").unwrap())?;
let fs = SpirvShader::from_bytes("forward.frag", ShaderStage::FRAGMENT, &std::fs::read("forward.frag.spv").unwrap())?;
let reflection = reflect_pipeline("forward", &[&vs, &fs])?;

let table = ShaderParamBindingTable::builder().build();
let layout = table.bind(&reflection, &SpecializationConstants::new())?;
# Ok(())
# }
```
*/

mod spirv_module;
mod spirv_reflect;

pub use spirv_reflect::{reflect_pipeline, reflect_spirv, words_from_bytes, SpirvShader, SPIRV_MAGIC};
