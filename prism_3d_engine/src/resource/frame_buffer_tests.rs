//! Unit tests for FrameBuffer attachment validation

use super::*;
use crate::graphics_device::{NullDeviceProbe, NullGraphicsDevice};
use crate::prism3d::RendererConfig;

// ============================================================================
// Helper Functions
// ============================================================================

fn create_renderer() -> (Renderer, NullDeviceProbe) {
    let device = NullGraphicsDevice::new();
    let probe = device.probe();
    let config = RendererConfig { create_viewport_mesh: false, ..RendererConfig::default() };
    (Renderer::new(device, config).unwrap(), probe)
}

fn color(width: u32, height: u32) -> SharedTexture2 {
    Texture2::new("color", width, height).into_shared()
}

fn depth(width: u32, height: u32) -> SharedTexture2 {
    Texture2::new("depth", width, height)
        .with_pixel_format(PixelFormat::R32F)
        .into_shared()
}

// ============================================================================
// Attachment validation
// ============================================================================

#[test]
fn test_new_frame_buffer() {
    let frame_buffer = FrameBuffer::with_name("gbuffer", 64, 32);

    assert_eq!(frame_buffer.name(), "gbuffer");
    assert_eq!(frame_buffer.width(), 64);
    assert_eq!(frame_buffer.height(), 32);
    assert!(frame_buffer.attachments().is_empty());
    assert!(!frame_buffer.is_uploaded());
}

#[test]
fn test_attach_color_and_depth() {
    let mut frame_buffer = FrameBuffer::new(16, 16);
    let albedo = color(16, 16);
    let normals = color(16, 16);
    let z = depth(16, 16);

    frame_buffer.attach(FrameBufferSlot::COLOR0, &albedo).unwrap();
    frame_buffer.attach(FrameBufferSlot::COLOR1, &normals).unwrap();
    frame_buffer.attach(FrameBufferSlot::Depth, &z).unwrap();

    assert_eq!(frame_buffer.attachments().len(), 3);
    assert_eq!(frame_buffer.attachment(FrameBufferSlot::Depth).unwrap().kind(), AttachmentKind::Texture2);
}

#[test]
fn test_occupied_slot_rejected() {
    let mut frame_buffer = FrameBuffer::new(16, 16);
    let first = color(16, 16);
    let second = color(16, 16);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &first).unwrap();

    let result = frame_buffer.attach(FrameBufferSlot::COLOR0, &second);

    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    assert_eq!(frame_buffer.attachments().len(), 1);
}

#[test]
fn test_size_mismatch_rejected() {
    let mut frame_buffer = FrameBuffer::new(16, 16);

    assert!(frame_buffer.attach(FrameBufferSlot::COLOR0, &color(16, 8)).is_err());
    assert!(frame_buffer.attach(FrameBufferSlot::Depth, &depth(8, 16)).is_err());
    assert!(frame_buffer.attachments().is_empty());
}

#[test]
fn test_depth_requires_single_channel() {
    let mut frame_buffer = FrameBuffer::new(16, 16);

    assert!(frame_buffer.attach(FrameBufferSlot::Depth, &color(16, 16)).is_err());
    assert!(frame_buffer.attachments().is_empty());
}

#[test]
fn test_depth_rejects_layers_and_sides() {
    let mut frame_buffer = FrameBuffer::new(16, 16);
    let volume = Texture3::new("volume", 16, 16, 2)
        .with_pixel_format(PixelFormat::R32F)
        .into_shared();
    let cube = TextureCube::new("cube", 16, 16)
        .with_pixel_format(PixelFormat::R32F)
        .into_shared();

    assert!(frame_buffer.attach_layer(FrameBufferSlot::Depth, 0, &volume).is_err());
    assert!(frame_buffer.attach_side(FrameBufferSlot::Depth, CubeSide::PositiveX, &cube).is_err());
    assert!(frame_buffer.attachments().is_empty());
}

#[test]
fn test_attach_layer_and_side() {
    let mut frame_buffer = FrameBuffer::new(8, 8);
    let volume = Texture3::new("volume", 8, 8, 4).into_shared();
    let cube = TextureCube::new("cube", 8, 8).into_shared();

    assert!(frame_buffer.attach_layer(FrameBufferSlot::COLOR0, 4, &volume).is_err());
    frame_buffer.attach_layer(FrameBufferSlot::COLOR0, 3, &volume).unwrap();
    frame_buffer.attach_side(FrameBufferSlot::COLOR1, CubeSide::NegativeX, &cube).unwrap();

    let layer = frame_buffer.attachment(FrameBufferSlot::COLOR0).unwrap();
    assert_eq!(layer.kind(), AttachmentKind::Texture3Layer);
    assert_eq!(layer.layer(), Some(3));
    assert_eq!(layer.side(), None);

    let side = frame_buffer.attachment(FrameBufferSlot::COLOR1).unwrap();
    assert_eq!(side.kind(), AttachmentKind::CubeSide);
    assert_eq!(side.side(), Some(CubeSide::NegativeX));
}

#[test]
fn test_nonexistent_color_slot_rejected() {
    let mut frame_buffer = FrameBuffer::new(8, 8);

    assert!(frame_buffer.attach(FrameBufferSlot::Color(16), &color(8, 8)).is_err());
}

#[test]
fn test_dropped_texture_leaves_dangling_attachment() {
    let mut frame_buffer = FrameBuffer::new(8, 8);
    let texture = color(8, 8);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &texture).unwrap();
    assert!(!frame_buffer.attachments()[0].is_dangling());

    drop(texture);

    assert!(frame_buffer.attachments()[0].is_dangling());
}

// ============================================================================
// Destroy before mutation
// ============================================================================

#[test]
fn test_attach_destroys_uploaded_frame_buffer() {
    let (renderer, probe) = create_renderer();
    let mut frame_buffer = FrameBuffer::new(8, 8);
    let albedo = color(8, 8);
    let normals = color(8, 8);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &albedo).unwrap();
    renderer.upload_frame_buffer(&mut frame_buffer).unwrap();
    let id = frame_buffer.object().data().unwrap().frame_buffer;

    frame_buffer.attach(FrameBufferSlot::COLOR1, &normals).unwrap();

    assert!(!frame_buffer.is_uploaded());
    assert!(!probe.is_live(id.0));
    // Attached textures keep their GPU copy
    assert!(albedo.lock().unwrap().is_uploaded());
}

#[test]
fn test_failed_attach_keeps_upload() {
    let (renderer, _probe) = create_renderer();
    let mut frame_buffer = FrameBuffer::new(8, 8);
    let albedo = color(8, 8);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &albedo).unwrap();
    renderer.upload_frame_buffer(&mut frame_buffer).unwrap();

    assert!(frame_buffer.attach(FrameBufferSlot::COLOR0, &color(8, 8)).is_err());

    assert!(frame_buffer.is_uploaded());
}
