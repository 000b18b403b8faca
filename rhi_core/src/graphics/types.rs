/// Formats, sample counts and usage flags shared by resources and render passes

use bitflags::bitflags;

// ===== PIXEL FORMAT =====

/// Pixel / texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum PixelFormat {
    Undefined,

    // Color formats
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32_UINT,
    R32G32B32A32_SFLOAT,

    // Depth / stencil formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

impl PixelFormat {
    /// Size of one pixel in bytes, 0 for `Undefined`
    pub fn pixel_size(&self) -> u32 {
        match self {
            PixelFormat::Undefined => 0,
            PixelFormat::R8_UNORM => 1,
            PixelFormat::D16_UNORM => 2,
            PixelFormat::R8G8B8A8_UNORM
            | PixelFormat::R8G8B8A8_SRGB
            | PixelFormat::B8G8R8A8_UNORM
            | PixelFormat::B8G8R8A8_SRGB
            | PixelFormat::A2B10G10R10_UNORM
            | PixelFormat::R16G16_SFLOAT
            | PixelFormat::R32_SFLOAT
            | PixelFormat::R32_UINT
            | PixelFormat::D32_FLOAT
            | PixelFormat::D24_UNORM_S8_UINT => 4,
            PixelFormat::R16G16B16A16_SFLOAT | PixelFormat::D32_FLOAT_S8_UINT => 8,
            PixelFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            PixelFormat::D16_UNORM
                | PixelFormat::D32_FLOAT
                | PixelFormat::D24_UNORM_S8_UINT
                | PixelFormat::D32_FLOAT_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, PixelFormat::D24_UNORM_S8_UINT | PixelFormat::D32_FLOAT_S8_UINT)
    }

    pub fn is_srgb(&self) -> bool {
        matches!(self, PixelFormat::R8G8B8A8_SRGB | PixelFormat::B8G8R8A8_SRGB)
    }
}

// ===== SAMPLE COUNT =====

/// MSAA sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SampleCount {
    #[default]
    S1,
    S2,
    S4,
    S8,
    S16,
}

impl SampleCount {
    pub fn count(&self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
        }
    }
}

// ===== ATTACHMENT OPERATIONS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

// ===== IMAGE SHAPE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Image2D,
    Image3D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageViewType {
    View2D,
    View2DArray,
    View3D,
    Cube,
    CubeArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTiling {
    Optimal,
    /// Host visible row-major layout, used for CPU accessible images
    Linear,
}

// ===== SAMPLER STATE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filtering {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

// ===== FLAGS =====

bitflags! {
    /// Shader stages a binding or constant is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

bitflags! {
    /// How shaders access an image
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageShaderUsage: u32 {
        const SAMPLING = 1 << 0;
        const WRITING = 1 << 1;
    }
}

bitflags! {
    /// Usage of a buffer resource
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const UNIFORM_TEXEL = 1 << 4;
        const STORAGE_TEXEL = 1 << 5;
        const VERTEX = 1 << 6;
        const INDEX = 1 << 7;
        const INDIRECT = 1 << 8;
    }
}

bitflags! {
    /// Usage an image is created with, derived during re-initialization
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const INPUT_ATTACHMENT = 1 << 6;
    }
}

bitflags! {
    /// Image creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageCreateFlags: u32 {
        const CUBE_COMPATIBLE = 1 << 0;
        const ARRAY_2D_COMPATIBLE = 1 << 1;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
