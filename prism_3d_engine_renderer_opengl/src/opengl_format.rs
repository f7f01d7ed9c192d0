/// OpenGL conversion tables
///
/// Pure mappings from the engine vocabulary to GL enums. Nothing here
/// touches a context, so every table is testable without a GPU.

use prism_3d_engine::prism3d::device::{
    BlendFactor, BlendFunction, ColorSpace, CubeSide, FrameBufferSlot, IndexType,
    PixelFormat, PixelType, PrimitiveType, ShaderStage, TextureFilter, TextureImageTarget,
    TextureKind, TextureUsage, VertexAttributeType,
};

// ============================================================================
// TEXTURES
// ============================================================================

/// Bind target of a texture object
pub(crate) fn texture_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Texture2 => glow::TEXTURE_2D,
        TextureKind::Texture3 => glow::TEXTURE_3D,
        TextureKind::Cube => glow::TEXTURE_CUBE_MAP,
    }
}

pub(crate) fn cube_side_target(side: CubeSide) -> u32 {
    match side {
        CubeSide::PositiveX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
        CubeSide::NegativeX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
        CubeSide::PositiveY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
        CubeSide::NegativeY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
        CubeSide::PositiveZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
        CubeSide::NegativeZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
    }
}

/// Target naming one 2D image; 3D layers share the volume target
pub(crate) fn image_target(target: TextureImageTarget) -> u32 {
    match target {
        TextureImageTarget::Texture2 => glow::TEXTURE_2D,
        TextureImageTarget::Layer(_) => glow::TEXTURE_3D,
        TextureImageTarget::CubeSide(side) => cube_side_target(side),
    }
}

pub(crate) fn pixel_type(pixel_type: PixelType) -> u32 {
    match pixel_type {
        PixelType::Byte => glow::UNSIGNED_BYTE,
        PixelType::Float16 => glow::HALF_FLOAT,
        PixelType::Float32 => glow::FLOAT,
    }
}

/// Client-side layout of pixel data
pub(crate) fn pixel_format(pixel_format: PixelFormat, usage: TextureUsage) -> u32 {
    if usage == TextureUsage::Depth {
        return glow::DEPTH_COMPONENT;
    }
    match pixel_format.cardinality() {
        1 => glow::RED,
        2 => glow::RG,
        3 => glow::RGB,
        _ => glow::RGBA,
    }
}

/// Storage format of a texture object
///
/// Gamma-encoded byte formats with three or four channels are stored as
/// sRGB; one and two channel formats have no sRGB variant and stay linear.
pub(crate) fn internal_format(pixel_format: PixelFormat, color_space: ColorSpace, usage: TextureUsage) -> u32 {
    if usage == TextureUsage::Depth {
        return match pixel_format.pixel_type() {
            PixelType::Byte => glow::DEPTH_COMPONENT24,
            PixelType::Float16 => glow::DEPTH_COMPONENT16,
            PixelType::Float32 => glow::DEPTH_COMPONENT32F,
        };
    }

    let srgb = color_space == ColorSpace::NonLinear;
    match (pixel_format.pixel_type(), pixel_format.cardinality()) {
        (PixelType::Byte, 1) => glow::R8,
        (PixelType::Byte, 2) => glow::RG8,
        (PixelType::Byte, 3) if srgb => glow::SRGB8,
        (PixelType::Byte, 3) => glow::RGB8,
        (PixelType::Byte, _) if srgb => glow::SRGB8_ALPHA8,
        (PixelType::Byte, _) => glow::RGBA8,
        (PixelType::Float16, 1) => glow::R16F,
        (PixelType::Float16, 2) => glow::RG16F,
        (PixelType::Float16, 3) => glow::RGB16F,
        (PixelType::Float16, _) => glow::RGBA16F,
        (PixelType::Float32, 1) => glow::R32F,
        (PixelType::Float32, 2) => glow::RG32F,
        (PixelType::Float32, 3) => glow::RGB32F,
        (PixelType::Float32, _) => glow::RGBA32F,
    }
}

pub(crate) fn min_filter(filter: TextureFilter, mipmapped: bool) -> u32 {
    match (filter, mipmapped) {
        (TextureFilter::Nearest, false) => glow::NEAREST,
        (TextureFilter::Linear, false) => glow::LINEAR,
        (TextureFilter::Nearest, true) => glow::NEAREST_MIPMAP_NEAREST,
        (TextureFilter::Linear, true) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

pub(crate) fn mag_filter(filter: TextureFilter) -> u32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
    }
}

pub(crate) fn wrap_mode(wrapped: bool) -> u32 {
    if wrapped {
        glow::REPEAT
    } else {
        glow::CLAMP_TO_EDGE
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

pub(crate) fn vertex_attribute_type(attribute_type: VertexAttributeType) -> u32 {
    match attribute_type {
        VertexAttributeType::Int8 => glow::BYTE,
        VertexAttributeType::UInt8 => glow::UNSIGNED_BYTE,
        VertexAttributeType::Int16 => glow::SHORT,
        VertexAttributeType::UInt16 => glow::UNSIGNED_SHORT,
        VertexAttributeType::Int32 => glow::INT,
        VertexAttributeType::UInt32 => glow::UNSIGNED_INT,
        VertexAttributeType::Float16 => glow::HALF_FLOAT,
        VertexAttributeType::Float32 => glow::FLOAT,
    }
}

pub(crate) fn index_type(index_type: IndexType) -> u32 {
    match index_type {
        IndexType::UInt8 => glow::UNSIGNED_BYTE,
        IndexType::UInt16 => glow::UNSIGNED_SHORT,
        IndexType::UInt32 => glow::UNSIGNED_INT,
    }
}

pub(crate) fn primitive_type(primitive: PrimitiveType) -> u32 {
    match primitive {
        PrimitiveType::Triangles => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveType::Lines => glow::LINES,
        PrimitiveType::LineStrip => glow::LINE_STRIP,
        PrimitiveType::Points => glow::POINTS,
    }
}

// ============================================================================
// SHADERS & STATE
// ============================================================================

pub(crate) fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
    }
}

pub(crate) fn blend_function(function: BlendFunction) -> u32 {
    match function {
        BlendFunction::Add => glow::FUNC_ADD,
        BlendFunction::Subtract => glow::FUNC_SUBTRACT,
    }
}

pub(crate) fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SourceColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSourceColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DestinationColor => glow::DST_COLOR,
        BlendFactor::OneMinusDestinationColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SourceAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSourceAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DestinationAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDestinationAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

// ============================================================================
// FRAME BUFFERS
// ============================================================================

pub(crate) fn frame_buffer_attachment(slot: FrameBufferSlot) -> u32 {
    match slot {
        FrameBufferSlot::Color(index) => glow::COLOR_ATTACHMENT0 + index as u32,
        FrameBufferSlot::Depth => glow::DEPTH_ATTACHMENT,
    }
}

/// Name of a `glCheckFramebufferStatus` result
pub(crate) fn frame_buffer_status_name(status: u32) -> &'static str {
    match status {
        glow::FRAMEBUFFER_COMPLETE => "GL_FRAMEBUFFER_COMPLETE",
        glow::FRAMEBUFFER_UNDEFINED => "GL_FRAMEBUFFER_UNDEFINED",
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT",
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER",
        glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_READ_BUFFER",
        glow::FRAMEBUFFER_UNSUPPORTED => "GL_FRAMEBUFFER_UNSUPPORTED",
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE",
        glow::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => "GL_FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS",
        _ => "unknown frame buffer status",
    }
}

/// Name of a `glGetError` code
pub(crate) fn error_name(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "GL_NO_ERROR",
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "unknown error",
    }
}

#[cfg(test)]
#[path = "opengl_format_tests.rs"]
mod tests;
