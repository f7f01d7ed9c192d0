//! Unit tests for RendererObject / RendererData
//!
//! Covers the upload state seen through the object, the RAII release of
//! dropped data and the effect of a renderer shutdown.

use super::*;
use crate::graphics_device::{DeviceCommand, NullGraphicsDevice, NullDeviceProbe};
use crate::renderer::RendererConfig;
use crate::resource::Texture2;

// ============================================================================
// Helper Functions
// ============================================================================

fn create_renderer() -> (Renderer, NullDeviceProbe) {
    let device = NullGraphicsDevice::new();
    let probe = device.probe();
    let config = RendererConfig { create_viewport_mesh: false, ..RendererConfig::default() };
    (Renderer::new(device, config).unwrap(), probe)
}

// ============================================================================
// RendererObject tests
// ============================================================================

#[test]
fn test_new_object_is_not_uploaded() {
    let object: RendererObject<TextureData> = RendererObject::new();

    assert!(!object.is_uploaded());
    assert!(object.data().is_none());
    assert!(object.key().is_none());
    assert!(object.owner().is_none());
}

#[test]
fn test_renderer_of_unuploaded_object_fails() {
    let object: RendererObject<MeshData> = RendererObject::default();

    match object.renderer() {
        Err(Error::InvalidOperation(message)) => assert_eq!(message, "Object is not uploaded to GPU"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_uploaded_object_exposes_renderer_and_data() {
    let (renderer, _probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 4, 4);

    renderer.upload_texture2(&mut texture).unwrap();

    let object = texture.object();
    assert!(object.is_uploaded());
    assert!(object.renderer().unwrap().ptr_eq(&renderer));
    assert_eq!(object.data().unwrap().kind, crate::graphics_device::TextureKind::Texture2);
}

#[test]
fn test_clone_is_not_uploaded() {
    let (renderer, _probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 4, 4);
    renderer.upload_texture2(&mut texture).unwrap();

    let copy = texture.clone();

    assert!(texture.is_uploaded());
    assert!(!copy.is_uploaded());
}

#[test]
fn test_set_as_destroyed_detaches_data() {
    let (renderer, _probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 4, 4);
    renderer.upload_texture2(&mut texture).unwrap();

    renderer.destroy_texture2(&mut texture, false).unwrap();

    assert!(!texture.is_uploaded());
    assert!(texture.object().key().is_none());
}

// ============================================================================
// RendererData lifetime tests
// ============================================================================

#[test]
fn test_dropping_uploaded_resource_releases_gpu_objects() {
    let (renderer, probe) = create_renderer();
    let mut texture = Texture2::new("transient", 4, 4);
    renderer.upload_texture2(&mut texture).unwrap();
    let id = texture.object().data().unwrap().texture;

    drop(texture);

    assert!(!probe.is_live(id.0));
    assert_eq!(probe.count_commands(|command| *command == DeviceCommand::DeleteTexture(id)), 1);
    assert_eq!(renderer.statistics().unwrap().uploaded_resources, 0);
}

#[test]
fn test_shutdown_invalidates_objects() {
    let (renderer, probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 4, 4);
    renderer.upload_texture2(&mut texture).unwrap();

    renderer.shutdown();

    assert!(!texture.is_uploaded());
    assert!(texture.object().renderer().is_err());
    assert_eq!(probe.live_object_count(), 0);

    // Dropping after shutdown must not touch the device again
    probe.clear_commands();
    drop(texture);
    assert!(probe.commands().is_empty());
}

#[test]
fn test_data_outlives_dropped_renderer() {
    let (renderer, probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 4, 4);
    renderer.upload_texture2(&mut texture).unwrap();

    drop(renderer);

    assert!(!texture.is_uploaded());
    assert_eq!(probe.live_object_count(), 0);
}

#[test]
fn test_debug_reports_upload_state() {
    let object: RendererObject<FrameBufferData> = RendererObject::new();
    assert_eq!(format!("{:?}", object), "RendererObject { uploaded: false }");
}
