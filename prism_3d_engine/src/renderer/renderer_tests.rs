//! Unit tests for Renderer
//!
//! Runs the renderer against NullGraphicsDevice and checks the recorded
//! device commands: upload/destroy bookkeeping, failure cleanup, binding
//! state and frame handling.

use super::*;
use crate::graphics_device::{
    BlendMode, DeviceCommand, NullDeviceConfig, NullDeviceProbe, NullGraphicsDevice, PixelFormat,
    ShaderStage,
};
use crate::resource::{ShaderModule, SharedTexture2, UniformType, VertexAttributeSemantic, MeshWriter};

// ============================================================================
// Helper Functions
// ============================================================================

fn create_renderer() -> (Renderer, NullDeviceProbe) {
    create_renderer_with(NullDeviceConfig::default(), RendererConfig::default())
}

fn create_renderer_with(device_config: NullDeviceConfig, config: RendererConfig) -> (Renderer, NullDeviceProbe) {
    let device = NullGraphicsDevice::with_config(device_config);
    let probe = device.probe();
    (Renderer::new(device, config).unwrap(), probe)
}

fn shader(name: &str) -> Shader {
    let mut shader = Shader::new(name);
    shader.add_module(ShaderModule::new(ShaderStage::Vertex, "vert", "void main() {}"));
    shader.add_module(ShaderModule::new(ShaderStage::Fragment, "frag", "void main() {}"));
    shader
}

fn quad() -> Mesh {
    Mesh::viewport_quad().unwrap()
}

fn color_target(size: u32) -> (FrameBuffer, SharedTexture2) {
    let texture = Texture2::new("target", size, size).into_shared();
    let mut frame_buffer = FrameBuffer::with_name("offscreen", size, size);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &texture).unwrap();
    (frame_buffer, texture)
}

fn count(probe: &NullDeviceProbe, filter: impl Fn(&DeviceCommand) -> bool) -> usize {
    probe.count_commands(filter)
}

// ============================================================================
// Creation and shutdown
// ============================================================================

#[test]
fn test_new_renderer_reports_device() {
    let (renderer, _probe) = create_renderer_with(
        NullDeviceConfig { max_texture_units: 8, vendor: "Acme".to_string() },
        RendererConfig { label: "main".to_string(), ..RendererConfig::default() },
    );

    assert_eq!(renderer.label(), "main");
    assert_eq!(renderer.info().vendor, "Acme");
    assert_eq!(renderer.capabilities().max_texture_units, 8);
    assert_eq!(renderer.statistics().unwrap(), RendererStatistics::default());
}

#[test]
fn test_validation_setting_reaches_device() {
    let (_renderer, probe) = create_renderer_with(
        NullDeviceConfig::default(),
        RendererConfig { enable_validation: true, ..RendererConfig::default() },
    );
    assert!(probe.error_checking());

    let (_renderer, probe) = create_renderer_with(
        NullDeviceConfig::default(),
        RendererConfig { enable_validation: false, ..RendererConfig::default() },
    );
    assert!(!probe.error_checking());
}

#[test]
fn test_viewport_mesh_is_uploaded_lazily() {
    let (renderer, probe) = create_renderer();
    assert_eq!(probe.live_object_count(), 0);

    let mut program = shader("post");
    renderer.set_shader(&mut program).unwrap();
    renderer.render_viewport().unwrap();
    renderer.render_viewport().unwrap();

    assert_eq!(probe.draw_calls(), vec![6, 6]);
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::CreateVertexArray { .. })), 1);
}

#[test]
fn test_render_viewport_without_mesh_fails() {
    let (renderer, _probe) = create_renderer_with(
        NullDeviceConfig::default(),
        RendererConfig { create_viewport_mesh: false, ..RendererConfig::default() },
    );

    assert!(matches!(renderer.render_viewport(), Err(Error::InvalidOperation(_))));
}

#[test]
fn test_shutdown_releases_everything() {
    let (renderer, probe) = create_renderer();
    let mut mesh = quad();
    let mut program = shader("basic");
    let (mut frame_buffer, texture) = color_target(4);
    renderer.upload_mesh(&mut mesh).unwrap();
    renderer.upload_shader(&mut program).unwrap();
    renderer.upload_frame_buffer(&mut frame_buffer).unwrap();
    renderer.render_viewport().unwrap();

    renderer.shutdown();

    assert_eq!(probe.live_object_count(), 0);
    assert!(!mesh.is_uploaded());
    assert!(!program.is_uploaded());
    assert!(!frame_buffer.is_uploaded());
    assert!(!texture.lock().unwrap().is_uploaded());
    assert!(!renderer.is_alive());
}

#[test]
fn test_operations_fail_after_shutdown() {
    let (renderer, _probe) = create_renderer();
    renderer.shutdown();
    renderer.shutdown();

    let mut mesh = quad();
    assert!(matches!(renderer.upload_mesh(&mut mesh), Err(Error::InvalidOperation(_))));
    assert!(matches!(renderer.statistics(), Err(Error::InvalidOperation(_))));
    assert!(!mesh.is_uploaded());
}

#[test]
fn test_resource_of_another_renderer_is_rejected() {
    let (first, _first_probe) = create_renderer();
    let (second, second_probe) = create_renderer();
    let mut mesh = quad();
    first.upload_mesh(&mut mesh).unwrap();

    assert!(matches!(second.render_mesh(&mut mesh), Err(Error::InvalidResource(_))));
    assert!(matches!(second.destroy_mesh(&mut mesh), Err(Error::InvalidResource(_))));
    assert!(mesh.is_uploaded());
    assert!(second_probe.draw_calls().is_empty());
}

#[test]
fn test_resource_of_shut_down_renderer_can_move() {
    let (first, _first_probe) = create_renderer();
    let (second, _second_probe) = create_renderer();
    let mut mesh = quad();
    first.upload_mesh(&mut mesh).unwrap();
    first.shutdown();

    second.upload_mesh(&mut mesh).unwrap();

    assert!(mesh.object().renderer().unwrap().ptr_eq(&second));
}

// ============================================================================
// Memory accounting
// ============================================================================

#[test]
fn test_memory_usage_tracks_textures_and_meshes() {
    let (renderer, _probe) = create_renderer();
    let mut texture = Texture2::new("albedo", 8, 8);
    let mut mesh = quad();

    renderer.upload_texture2(&mut texture).unwrap();
    assert_eq!(renderer.statistics().unwrap().memory_usage, 8 * 8 * 4);

    renderer.upload_mesh(&mut mesh).unwrap();
    let mesh_bytes = mesh.vertex_data().len() + mesh.index_data().len();
    assert_eq!(renderer.statistics().unwrap().memory_usage, 8 * 8 * 4 + mesh_bytes);

    renderer.destroy_texture2(&mut texture, false).unwrap();
    renderer.destroy_mesh(&mut mesh).unwrap();
    let statistics = renderer.statistics().unwrap();
    assert_eq!(statistics.memory_usage, 0);
    assert_eq!(statistics.uploaded_resources, 0);
}

// ============================================================================
// Shaders
// ============================================================================

#[test]
fn test_compile_failure_releases_modules() {
    let (renderer, probe) = create_renderer();
    probe.fail_compilation("broken", "0:3: 'vec5' : undeclared identifier");
    let mut program = Shader::new("lighting");
    program.add_module(ShaderModule::new(ShaderStage::Vertex, "lighting.vert", "void main() {}"));
    program.add_module(ShaderModule::new(ShaderStage::Fragment, "lighting.frag", "broken"));

    match renderer.upload_shader(&mut program) {
        Err(Error::ShaderCompileFailed { shader, module, log }) => {
            assert_eq!(shader, "lighting");
            assert_eq!(module, "lighting.frag");
            assert!(log.contains("vec5"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!program.is_uploaded());
    assert_eq!(probe.live_object_count(), 0);
}

#[test]
fn test_link_failure_releases_program() {
    let (renderer, probe) = create_renderer();
    probe.fail_next_link("missing main");
    let mut program = shader("broken");

    assert!(matches!(
        renderer.upload_shader(&mut program),
        Err(Error::ShaderLinkFailed { ref log, .. }) if log == "missing main"
    ));
    assert_eq!(probe.live_object_count(), 0);

    // The failure was one-shot; a retry links
    renderer.upload_shader(&mut program).unwrap();
    assert!(program.is_uploaded());
}

#[test]
fn test_texture_units_follow_declaration_order() {
    let (renderer, _probe) = create_renderer();
    let mut program = shader("material");
    program.add_uniform(Uniform::new("color", UniformType::Vector3)).unwrap();
    program.add_uniform(Uniform::new("diffuse", UniformType::Texture2)).unwrap();
    program.add_uniform(Uniform::new("roughness", UniformType::Float)).unwrap();
    program.add_uniform(Uniform::new("environment", UniformType::TextureCube)).unwrap();

    renderer.upload_shader(&mut program).unwrap();

    assert_eq!(program.uniform("color").unwrap().texture_unit(), None);
    assert_eq!(program.uniform("diffuse").unwrap().texture_unit(), Some(0));
    assert_eq!(program.uniform("roughness").unwrap().texture_unit(), None);
    assert_eq!(program.uniform("environment").unwrap().texture_unit(), Some(1));
}

#[test]
fn test_set_shader_configures_state() {
    let (renderer, probe) = create_renderer();
    let mut program = shader("transparent");
    program.set_blend_mode(BlendMode::ALPHA);
    program.set_depth_tested(false);

    renderer.set_shader(&mut program).unwrap();
    let program_id = program.object().data().unwrap().program;

    let commands = probe.commands();
    assert!(commands.contains(&DeviceCommand::UseProgram(Some(program_id))));
    assert!(commands.contains(&DeviceCommand::SetBlendMode(Some(BlendMode::ALPHA))));
    assert!(commands.contains(&DeviceCommand::SetDepthState { test: false, write: false }));
}

#[test]
fn test_set_shader_reconfigures_every_time() {
    let (renderer, probe) = create_renderer();
    let mut program = shader("opaque");

    renderer.set_shader(&mut program).unwrap();
    renderer.set_shader(&mut program).unwrap();

    assert_eq!(count(&probe, |command| *command == DeviceCommand::SetBlendMode(None)), 2);
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::CreateProgram(_))), 1);
}

#[test]
fn test_set_shader_applies_defaults() {
    let (renderer, probe) = create_renderer();
    let mut program = shader("tinted");
    program.add_uniform(Uniform::with_default("exposure", UniformValue::Float(1.5))).unwrap();

    renderer.set_shader(&mut program).unwrap();

    let location = program.uniform("exposure").unwrap().location().unwrap();
    assert!(probe.commands().contains(&DeviceCommand::SetUniform(location, UniformData::Float(1.5))));
}

// ============================================================================
// Uniforms
// ============================================================================

#[test]
fn test_set_uniform_without_shader_fails() {
    let (renderer, _probe) = create_renderer();
    let uniform = Uniform::new("model", UniformType::Float);

    assert!(matches!(
        renderer.set_uniform(&uniform, &UniformValue::Float(1.0)),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_set_uniform_type_mismatch_fails() {
    let (renderer, _probe) = create_renderer();
    let mut program = shader("basic");
    program.add_uniform(Uniform::new("scale", UniformType::Float)).unwrap();
    renderer.set_shader(&mut program).unwrap();

    let result = renderer.set_uniform(program.uniform("scale").unwrap(), &UniformValue::Int(2));

    match result {
        Err(Error::InvalidOperation(message)) => assert!(message.starts_with("Invalid value for uniform")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_unused_uniform_is_silently_ignored() {
    let (renderer, probe) = create_renderer();
    probe.mark_uniform_unused("debug");
    let mut program = shader("basic");
    program.add_uniform(Uniform::new("debug", UniformType::Int)).unwrap();
    renderer.set_shader(&mut program).unwrap();
    probe.clear_commands();

    renderer.set_uniform(program.uniform("debug").unwrap(), &UniformValue::Int(1)).unwrap();

    assert!(probe.commands().is_empty());
}

#[test]
fn test_texture_uniform_uploads_and_binds() {
    let (renderer, probe) = create_renderer();
    let mut program = shader("textured");
    program.add_uniform(Uniform::new("diffuse", UniformType::Texture2)).unwrap();
    renderer.set_shader(&mut program).unwrap();
    let texture = Texture2::new("albedo", 2, 2).into_shared();

    renderer
        .set_uniform(program.uniform("diffuse").unwrap(), &UniformValue::Texture2(texture.clone()))
        .unwrap();

    let id = texture.lock().unwrap().object().data().unwrap().texture;
    let location = program.uniform("diffuse").unwrap().location().unwrap();
    let commands = probe.commands();
    assert!(commands.contains(&DeviceCommand::SetUniform(location, UniformData::Int(0))));
    assert!(commands.contains(&DeviceCommand::BindTexture { unit: 0, texture: Some(id) }));
}

#[test]
fn test_texture_unit_beyond_hardware_fails() {
    let (renderer, _probe) = create_renderer_with(
        NullDeviceConfig { max_texture_units: 1, ..NullDeviceConfig::default() },
        RendererConfig::default(),
    );
    let mut program = shader("textured");
    program.add_uniform(Uniform::new("first", UniformType::Texture2)).unwrap();
    program.add_uniform(Uniform::new("second", UniformType::Texture2)).unwrap();
    renderer.set_shader(&mut program).unwrap();
    let texture = Texture2::new("albedo", 2, 2).into_shared();

    let result = renderer.set_uniform(program.uniform("second").unwrap(), &UniformValue::Texture2(texture.clone()));

    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    assert!(!texture.lock().unwrap().is_uploaded());
}

#[test]
fn test_texture_uniform_while_texture_locked_fails() {
    let (renderer, _probe) = create_renderer();
    let mut program = shader("textured");
    program.add_uniform(Uniform::new("diffuse", UniformType::Texture2)).unwrap();
    renderer.set_shader(&mut program).unwrap();
    let texture = Texture2::new("albedo", 2, 2).into_shared();
    let value = UniformValue::Texture2(texture.clone());

    let _guard = texture.lock().unwrap();
    let result = renderer.set_uniform(program.uniform("diffuse").unwrap(), &value);

    assert!(matches!(result, Err(Error::InvalidOperation(_))));
}

#[test]
fn test_destroying_bound_shader_clears_binding() {
    let (renderer, _probe) = create_renderer();
    let mut program = shader("basic");
    program.add_uniform(Uniform::new("scale", UniformType::Float)).unwrap();
    renderer.set_shader(&mut program).unwrap();
    let scale = program.uniform("scale").unwrap().clone();

    renderer.destroy_shader(&mut program).unwrap();

    assert!(matches!(
        renderer.set_uniform(&scale, &UniformValue::Float(1.0)),
        Err(Error::InvalidOperation(_))
    ));
}

// ============================================================================
// Meshes
// ============================================================================

#[test]
fn test_mesh_attribute_bindings() {
    let (renderer, probe) = create_renderer();
    let mut mesh = quad();

    renderer.upload_mesh(&mut mesh).unwrap();

    let bindings = probe
        .commands()
        .into_iter()
        .find_map(|command| match command {
            DeviceCommand::CreateVertexArray { attributes, .. } => Some(attributes),
            _ => None,
        })
        .unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!((bindings[0].index, bindings[0].offset, bindings[0].stride), (0, 0, 20));
    assert_eq!((bindings[1].index, bindings[1].offset, bindings[1].cardinality), (1, 12, 2));
    assert!(!bindings[1].integer);
}

#[test]
fn test_render_mesh_counts_draw_calls() {
    let (renderer, probe) = create_renderer();
    let mut mesh = Mesh::with_name("points");
    mesh.set_primitive_type(crate::graphics_device::PrimitiveType::Points);
    let mut writer = MeshWriter::new(&mut mesh);
    writer.add_vertex();
    writer.write_attribute(VertexAttributeSemantic::Position, &[1.0, 2.0, 3.0]).unwrap();
    writer.add_index(0).unwrap();
    writer.finish().unwrap();

    renderer.render_mesh(&mut mesh).unwrap();
    renderer.render_mesh(&mut mesh).unwrap();

    assert_eq!(renderer.statistics().unwrap().draw_calls, 2);
    assert_eq!(probe.draw_calls(), vec![1, 1]);
}

// ============================================================================
// Render targets
// ============================================================================

#[test]
fn test_window_target_sets_viewport() {
    let (renderer, probe) = create_renderer();
    let mut window = Window::new(800, 600);

    renderer.set_target(&mut window).unwrap();

    let commands = probe.commands();
    assert!(commands.contains(&DeviceCommand::BindFrameBuffer(None)));
    assert!(commands.contains(&DeviceCommand::SetViewport(Viewport::from_size(800, 600))));
}

#[test]
fn test_redundant_window_bind_is_skipped() {
    let (renderer, probe) = create_renderer();
    let mut window = Window::new(800, 600);

    renderer.set_target(&mut window).unwrap();
    renderer.set_target(&mut window).unwrap();
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::SetViewport(_))), 1);

    window.resize(1024, 768);
    renderer.set_target(&mut window).unwrap();
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::SetViewport(_))), 2);
}

#[test]
fn test_redundant_binds_kept_when_disabled() {
    let (renderer, probe) = create_renderer_with(
        NullDeviceConfig::default(),
        RendererConfig { skip_redundant_target_binds: false, ..RendererConfig::default() },
    );
    let (mut frame_buffer, _texture) = color_target(4);

    renderer.set_target(&mut frame_buffer).unwrap();
    renderer.set_target(&mut frame_buffer).unwrap();

    let id = frame_buffer.object().data().unwrap().frame_buffer;
    assert_eq!(count(&probe, |command| *command == DeviceCommand::BindFrameBuffer(Some(id))), 2);
}

#[test]
fn test_frame_buffer_target_invalidates_attachment_images() {
    let (renderer, _probe) = create_renderer();
    let (mut frame_buffer, texture) = color_target(2);
    texture
        .lock()
        .unwrap()
        .set_image(Image::new(2, 2, PixelFormat::RGBA8))
        .unwrap();

    renderer.set_target(&mut frame_buffer).unwrap();

    assert!(!texture.lock().unwrap().has_local_image());
}

#[test]
fn test_frame_buffer_upload_orders_depth_first() {
    let (renderer, probe) = create_renderer();
    let mut frame_buffer = FrameBuffer::new(4, 4);
    let normals = Texture2::new("normals", 4, 4).into_shared();
    let albedo = Texture2::new("albedo", 4, 4).into_shared();
    let depth = Texture2::new("depth", 4, 4).with_pixel_format(PixelFormat::R32F).into_shared();
    frame_buffer.attach(FrameBufferSlot::COLOR1, &normals).unwrap();
    frame_buffer.attach(FrameBufferSlot::COLOR0, &albedo).unwrap();
    frame_buffer.attach(FrameBufferSlot::Depth, &depth).unwrap();

    renderer.upload_frame_buffer(&mut frame_buffer).unwrap();

    let slots: Vec<FrameBufferSlot> = probe
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            DeviceCommand::AttachImage { slot, .. } => Some(slot),
            _ => None,
        })
        .collect();
    assert_eq!(slots, vec![FrameBufferSlot::Depth, FrameBufferSlot::COLOR0, FrameBufferSlot::COLOR1]);

    let id = frame_buffer.object().data().unwrap().frame_buffer;
    assert!(probe
        .commands()
        .contains(&DeviceCommand::SetDrawBuffers(id, vec![FrameBufferSlot::COLOR0, FrameBufferSlot::COLOR1])));
    assert_eq!(
        count(&probe, |command| matches!(command, DeviceCommand::CreateTexture { depth_format: true, .. })),
        1
    );
}

#[test]
fn test_incomplete_frame_buffer_fails() {
    let (renderer, probe) = create_renderer();
    probe.fail_frame_buffer_completeness("GL_FRAMEBUFFER_UNSUPPORTED");
    let (mut frame_buffer, _texture) = color_target(4);

    match renderer.set_target(&mut frame_buffer) {
        Err(Error::IncompleteFrameBuffer { frame_buffer: name, status }) => {
            assert_eq!(name, "offscreen");
            assert_eq!(status, "GL_FRAMEBUFFER_UNSUPPORTED");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!frame_buffer.is_uploaded());
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::DeleteFrameBuffer(_))), 1);
}

#[test]
fn test_dangling_attachment_fails_upload() {
    let (renderer, _probe) = create_renderer();
    let (mut frame_buffer, texture) = color_target(4);
    drop(texture);

    assert!(matches!(renderer.upload_frame_buffer(&mut frame_buffer), Err(Error::InvalidResource(_))));
    assert!(!frame_buffer.is_uploaded());
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_begin_frame_resets_state() {
    let (renderer, probe) = create_renderer_with(
        NullDeviceConfig { max_texture_units: 2, ..NullDeviceConfig::default() },
        RendererConfig::default(),
    );
    let mut window = Window::new(640, 480);
    let mut mesh = quad();
    renderer.render_mesh(&mut mesh).unwrap();
    probe.clear_commands();

    renderer.on_begin_frame(&mut window).unwrap();

    let commands = probe.commands();
    assert_eq!(commands[0], DeviceCommand::UseProgram(None));
    assert_eq!(commands[1], DeviceCommand::BindVertexArray(None));
    assert_eq!(count(&probe, |command| matches!(command, DeviceCommand::BindTexture { texture: None, .. })), 6);
    assert!(commands.contains(&DeviceCommand::SetViewport(Viewport::from_size(640, 480))));
    assert_eq!(renderer.statistics().unwrap().draw_calls, 0);
}

#[test]
fn test_end_frame_generates_attachment_mipmaps() {
    let (renderer, probe) = create_renderer();
    let mut window = Window::new(4, 4);
    let (mut frame_buffer, texture) = color_target(4);
    renderer.on_begin_frame(&mut window).unwrap();
    renderer.set_target(&mut frame_buffer).unwrap();
    let id = texture.lock().unwrap().object().data().unwrap().texture;
    probe.clear_commands();

    renderer.on_end_frame().unwrap();
    renderer.on_end_frame().unwrap();

    assert_eq!(probe.commands(), vec![DeviceCommand::GenerateMipmaps(id)]);
}

// ============================================================================
// Deferred release
// ============================================================================

#[test]
fn test_drop_during_operation_is_deferred() {
    let (renderer, probe) = create_renderer();
    let texture = Texture2::new("temporary", 4, 4).into_shared();
    let mut frame_buffer = FrameBuffer::new(4, 4);
    frame_buffer.attach(FrameBufferSlot::COLOR0, &texture).unwrap();
    renderer.upload_frame_buffer(&mut frame_buffer).unwrap();
    let id = texture.lock().unwrap().object().data().unwrap().texture;

    // Queue a release while the renderer lock is held
    let key = texture.lock().unwrap().object().key().unwrap();
    renderer
        .with_core(|_core| {
            renderer.shared.release_dropped(key);
            Ok(())
        })
        .unwrap();

    assert!(!probe.is_live(id.0));
    assert!(renderer.shared.orphans().is_empty());
}
