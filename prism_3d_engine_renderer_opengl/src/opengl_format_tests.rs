//! Unit tests for OpenGL conversion tables
//!
//! Tests pure conversion functions without requiring a GPU.

use super::*;

// ============================================================================
// TEXTURE FORMAT TESTS
// ============================================================================

#[test]
fn test_nonlinear_byte_formats_are_srgb() {
    assert_eq!(
        internal_format(PixelFormat::RGB8, ColorSpace::NonLinear, TextureUsage::Color),
        glow::SRGB8
    );
    assert_eq!(
        internal_format(PixelFormat::RGBA8, ColorSpace::NonLinear, TextureUsage::Color),
        glow::SRGB8_ALPHA8
    );
}

#[test]
fn test_linear_byte_formats() {
    assert_eq!(internal_format(PixelFormat::RGB8, ColorSpace::Linear, TextureUsage::Color), glow::RGB8);
    assert_eq!(internal_format(PixelFormat::RGBA8, ColorSpace::Linear, TextureUsage::Color), glow::RGBA8);
}

#[test]
fn test_single_and_dual_channel_bytes_ignore_color_space() {
    for color_space in [ColorSpace::Linear, ColorSpace::NonLinear] {
        assert_eq!(internal_format(PixelFormat::R8, color_space, TextureUsage::Color), glow::R8);
        assert_eq!(internal_format(PixelFormat::RG8, color_space, TextureUsage::Color), glow::RG8);
    }
}

#[test]
fn test_float_formats() {
    assert_eq!(internal_format(PixelFormat::R16F, ColorSpace::NonLinear, TextureUsage::Color), glow::R16F);
    assert_eq!(internal_format(PixelFormat::RGB16F, ColorSpace::NonLinear, TextureUsage::Color), glow::RGB16F);
    assert_eq!(internal_format(PixelFormat::RGBA16F, ColorSpace::Linear, TextureUsage::Color), glow::RGBA16F);
    assert_eq!(internal_format(PixelFormat::R32F, ColorSpace::Linear, TextureUsage::Color), glow::R32F);
    assert_eq!(internal_format(PixelFormat::RGB32F, ColorSpace::Linear, TextureUsage::Color), glow::RGB32F);
    assert_eq!(internal_format(PixelFormat::RGBA32F, ColorSpace::NonLinear, TextureUsage::Color), glow::RGBA32F);

    let rg32 = PixelFormat::new(PixelType::Float32, 2).unwrap();
    assert_eq!(internal_format(rg32, ColorSpace::Linear, TextureUsage::Color), glow::RG32F);
}

#[test]
fn test_depth_formats() {
    assert_eq!(
        internal_format(PixelFormat::R8, ColorSpace::Linear, TextureUsage::Depth),
        glow::DEPTH_COMPONENT24
    );
    assert_eq!(
        internal_format(PixelFormat::R16F, ColorSpace::Linear, TextureUsage::Depth),
        glow::DEPTH_COMPONENT16
    );
    assert_eq!(
        internal_format(PixelFormat::R32F, ColorSpace::NonLinear, TextureUsage::Depth),
        glow::DEPTH_COMPONENT32F
    );
    assert_eq!(pixel_format(PixelFormat::R32F, TextureUsage::Depth), glow::DEPTH_COMPONENT);
}

#[test]
fn test_client_pixel_layout() {
    assert_eq!(pixel_format(PixelFormat::R8, TextureUsage::Color), glow::RED);
    assert_eq!(pixel_format(PixelFormat::RG8, TextureUsage::Color), glow::RG);
    assert_eq!(pixel_format(PixelFormat::RGB16F, TextureUsage::Color), glow::RGB);
    assert_eq!(pixel_format(PixelFormat::RGBA32F, TextureUsage::Color), glow::RGBA);

    assert_eq!(pixel_type(PixelType::Byte), glow::UNSIGNED_BYTE);
    assert_eq!(pixel_type(PixelType::Float16), glow::HALF_FLOAT);
    assert_eq!(pixel_type(PixelType::Float32), glow::FLOAT);
}

#[test]
fn test_filters_and_wrapping() {
    assert_eq!(min_filter(TextureFilter::Nearest, false), glow::NEAREST);
    assert_eq!(min_filter(TextureFilter::Linear, false), glow::LINEAR);
    assert_eq!(min_filter(TextureFilter::Nearest, true), glow::NEAREST_MIPMAP_NEAREST);
    assert_eq!(min_filter(TextureFilter::Linear, true), glow::LINEAR_MIPMAP_LINEAR);
    assert_eq!(mag_filter(TextureFilter::Nearest), glow::NEAREST);
    assert_eq!(wrap_mode(true), glow::REPEAT);
    assert_eq!(wrap_mode(false), glow::CLAMP_TO_EDGE);
}

#[test]
fn test_texture_targets() {
    assert_eq!(texture_target(TextureKind::Texture2), glow::TEXTURE_2D);
    assert_eq!(texture_target(TextureKind::Texture3), glow::TEXTURE_3D);
    assert_eq!(texture_target(TextureKind::Cube), glow::TEXTURE_CUBE_MAP);

    assert_eq!(image_target(TextureImageTarget::Layer(3)), glow::TEXTURE_3D);
    assert_eq!(
        image_target(TextureImageTarget::CubeSide(CubeSide::NegativeY)),
        glow::TEXTURE_CUBE_MAP_NEGATIVE_Y
    );
}

#[test]
fn test_cube_sides_follow_gl_order() {
    // GL numbers the six side targets consecutively in upload order
    for side in CubeSide::ALL {
        assert_eq!(
            cube_side_target(side),
            glow::TEXTURE_CUBE_MAP_POSITIVE_X + side.index() as u32
        );
    }
}

// ============================================================================
// GEOMETRY TESTS
// ============================================================================

#[test]
fn test_vertex_attribute_types() {
    assert_eq!(vertex_attribute_type(VertexAttributeType::Int8), glow::BYTE);
    assert_eq!(vertex_attribute_type(VertexAttributeType::UInt8), glow::UNSIGNED_BYTE);
    assert_eq!(vertex_attribute_type(VertexAttributeType::Int16), glow::SHORT);
    assert_eq!(vertex_attribute_type(VertexAttributeType::UInt16), glow::UNSIGNED_SHORT);
    assert_eq!(vertex_attribute_type(VertexAttributeType::Int32), glow::INT);
    assert_eq!(vertex_attribute_type(VertexAttributeType::UInt32), glow::UNSIGNED_INT);
    assert_eq!(vertex_attribute_type(VertexAttributeType::Float16), glow::HALF_FLOAT);
    assert_eq!(vertex_attribute_type(VertexAttributeType::Float32), glow::FLOAT);
}

#[test]
fn test_index_and_primitive_types() {
    assert_eq!(index_type(IndexType::UInt8), glow::UNSIGNED_BYTE);
    assert_eq!(index_type(IndexType::UInt16), glow::UNSIGNED_SHORT);
    assert_eq!(index_type(IndexType::UInt32), glow::UNSIGNED_INT);

    assert_eq!(primitive_type(PrimitiveType::Triangles), glow::TRIANGLES);
    assert_eq!(primitive_type(PrimitiveType::TriangleStrip), glow::TRIANGLE_STRIP);
    assert_eq!(primitive_type(PrimitiveType::Lines), glow::LINES);
    assert_eq!(primitive_type(PrimitiveType::LineStrip), glow::LINE_STRIP);
    assert_eq!(primitive_type(PrimitiveType::Points), glow::POINTS);
}

// ============================================================================
// SHADER & STATE TESTS
// ============================================================================

#[test]
fn test_shader_stages() {
    assert_eq!(shader_stage(ShaderStage::Vertex), glow::VERTEX_SHADER);
    assert_eq!(shader_stage(ShaderStage::Fragment), glow::FRAGMENT_SHADER);
    assert_eq!(shader_stage(ShaderStage::Geometry), glow::GEOMETRY_SHADER);
}

#[test]
fn test_blend_tables() {
    assert_eq!(blend_function(BlendFunction::Add), glow::FUNC_ADD);
    assert_eq!(blend_function(BlendFunction::Subtract), glow::FUNC_SUBTRACT);

    assert_eq!(blend_factor(BlendFactor::Zero), glow::ZERO);
    assert_eq!(blend_factor(BlendFactor::One), glow::ONE);
    assert_eq!(blend_factor(BlendFactor::SourceColor), glow::SRC_COLOR);
    assert_eq!(blend_factor(BlendFactor::OneMinusSourceColor), glow::ONE_MINUS_SRC_COLOR);
    assert_eq!(blend_factor(BlendFactor::DestinationColor), glow::DST_COLOR);
    assert_eq!(blend_factor(BlendFactor::OneMinusDestinationColor), glow::ONE_MINUS_DST_COLOR);
    assert_eq!(blend_factor(BlendFactor::SourceAlpha), glow::SRC_ALPHA);
    assert_eq!(blend_factor(BlendFactor::OneMinusSourceAlpha), glow::ONE_MINUS_SRC_ALPHA);
    assert_eq!(blend_factor(BlendFactor::DestinationAlpha), glow::DST_ALPHA);
    assert_eq!(blend_factor(BlendFactor::OneMinusDestinationAlpha), glow::ONE_MINUS_DST_ALPHA);
}

// ============================================================================
// FRAME BUFFER TESTS
// ============================================================================

#[test]
fn test_frame_buffer_attachments() {
    assert_eq!(frame_buffer_attachment(FrameBufferSlot::COLOR0), glow::COLOR_ATTACHMENT0);
    assert_eq!(frame_buffer_attachment(FrameBufferSlot::COLOR3), glow::COLOR_ATTACHMENT3);
    assert_eq!(frame_buffer_attachment(FrameBufferSlot::Color(15)), glow::COLOR_ATTACHMENT15);
    assert_eq!(frame_buffer_attachment(FrameBufferSlot::Depth), glow::DEPTH_ATTACHMENT);
}

#[test]
fn test_status_and_error_names() {
    assert_eq!(frame_buffer_status_name(glow::FRAMEBUFFER_UNSUPPORTED), "GL_FRAMEBUFFER_UNSUPPORTED");
    assert_eq!(
        frame_buffer_status_name(glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT),
        "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
    );
    assert_eq!(frame_buffer_status_name(0), "unknown frame buffer status");

    assert_eq!(error_name(glow::INVALID_OPERATION), "GL_INVALID_OPERATION");
    assert_eq!(error_name(glow::OUT_OF_MEMORY), "GL_OUT_OF_MEMORY");
    assert_eq!(error_name(0xFFFF), "unknown error");
}
