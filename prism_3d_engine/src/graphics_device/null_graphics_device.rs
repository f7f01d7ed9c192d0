/// Null graphics device (no GPU required)
///
/// Behaves like a driver without drawing anything: ids are allocated
/// monotonically and never reused, objects are tracked so misuse is
/// detected, and every call is recorded as a [`DeviceCommand`]. A
/// [`NullDeviceProbe`] shares the device state so tests can inspect the
/// command log and inject compile/link/completeness failures after the
/// device has been handed to a renderer.

use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec4;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics_device::{
    AttachedImage, BlendMode, BufferId, BufferKind, BuildLog, Capabilities, ClearBuffers,
    CullMode, DeviceInfo, FrameBufferId, FrameBufferSlot, FrameBufferStatus, GraphicsDevice,
    IndexType, PixelFormat, PrimitiveType, ProgramId, ShaderModuleId, ShaderStage, TextureDesc,
    TextureId, TextureImageTarget, TextureKind, UniformData, UniformLocation,
    VertexArrayId, VertexAttributeBinding, Viewport,
};

// ============================================================================
// Configuration
// ============================================================================

/// Limits reported by the null device
#[derive(Debug, Clone)]
pub struct NullDeviceConfig {
    pub max_texture_units: u32,
    pub vendor: String,
}

impl Default for NullDeviceConfig {
    fn default() -> Self {
        Self {
            max_texture_units: 16,
            vendor: "Prism3D".to_string(),
        }
    }
}

// ============================================================================
// Command log
// ============================================================================

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateTexture { texture: TextureId, kind: TextureKind, width: u32, height: u32, depth_format: bool },
    DeleteTexture(TextureId),
    ReadTexturePixels(TextureId, TextureImageTarget),
    BindTexture { unit: u32, texture: Option<TextureId> },
    GenerateMipmaps(TextureId),
    CreateBuffer { buffer: BufferId, kind: BufferKind, size: usize },
    DeleteBuffer(BufferId),
    CreateVertexArray { vertex_array: VertexArrayId, attributes: Vec<VertexAttributeBinding> },
    DeleteVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    CreateShaderModule(ShaderModuleId, ShaderStage),
    DeleteShaderModule(ShaderModuleId),
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    SetUniform(UniformLocation, UniformData),
    CreateFrameBuffer(FrameBufferId),
    AttachImage { frame_buffer: FrameBufferId, slot: FrameBufferSlot, image: AttachedImage },
    CheckFrameBufferStatus(FrameBufferId),
    SetDrawBuffers(FrameBufferId, Vec<FrameBufferSlot>),
    BindFrameBuffer(Option<FrameBufferId>),
    DeleteFrameBuffer(FrameBufferId),
    SetViewport(Viewport),
    SetBlendMode(Option<BlendMode>),
    SetDepthState { test: bool, write: bool },
    SetCullMode(CullMode),
    Clear(Vec4, ClearBuffers),
    DrawIndexed { primitive: PrimitiveType, index_count: u32, index_type: IndexType },
}

// ============================================================================
// Device state
// ============================================================================

#[derive(Debug)]
enum NullObject {
    Texture { kind: TextureKind, images: Vec<Vec<u8>> },
    Buffer,
    VertexArray,
    ShaderModule,
    Program,
    FrameBuffer { attachments: Vec<FrameBufferSlot> },
}

#[derive(Debug, Default)]
struct NullDeviceState {
    next_id: u32,
    objects: FxHashMap<u32, NullObject>,
    commands: Vec<DeviceCommand>,
    bound_vertex_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,
    next_uniform_location: i32,
    error_checking: bool,
    // Failure injection
    compile_failures: Vec<(String, String)>,
    link_failure: Option<String>,
    incomplete_status: Option<String>,
    unused_uniforms: FxHashSet<String>,
}

impl NullDeviceState {
    fn allocate(&mut self, object: NullObject) -> u32 {
        self.next_id += 1;
        self.objects.insert(self.next_id, object);
        self.next_id
    }

    fn release(&mut self, id: u32, what: &str) -> Result<()> {
        self.objects
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::BackendError(format!("{} {} does not exist", what, id)))
    }

    fn require(&self, id: u32, what: &str) -> Result<&NullObject> {
        self.objects
            .get(&id)
            .ok_or_else(|| Error::BackendError(format!("{} {} does not exist", what, id)))
    }
}

// ============================================================================
// NullGraphicsDevice
// ============================================================================

/// Graphics device that performs no rendering
pub struct NullGraphicsDevice {
    config: NullDeviceConfig,
    state: Arc<Mutex<NullDeviceState>>,
}

impl NullGraphicsDevice {
    pub fn new() -> Self {
        Self::with_config(NullDeviceConfig::default())
    }

    pub fn with_config(config: NullDeviceConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(NullDeviceState::default())),
        }
    }

    /// Handle for inspecting this device after it is moved into a renderer
    pub fn probe(&self) -> NullDeviceProbe {
        NullDeviceProbe { state: Arc::clone(&self.state) }
    }

    fn state(&self) -> Result<MutexGuard<'_, NullDeviceState>> {
        lock_state(&self.state)
    }
}

impl Default for NullGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_state(state: &Mutex<NullDeviceState>) -> Result<MutexGuard<'_, NullDeviceState>> {
    state
        .lock()
        .map_err(|_| Error::BackendError("Null device state lock poisoned".to_string()))
}

impl GraphicsDevice for NullGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            vendor: self.config.vendor.clone(),
            renderer: "Null".to_string(),
            version: "0.0".to_string(),
        }
    }

    fn capabilities(&self) -> Result<Capabilities> {
        Ok(Capabilities { max_texture_units: self.config.max_texture_units })
    }

    fn set_error_checking(&mut self, enabled: bool) {
        if let Ok(mut state) = self.state() {
            state.error_checking = enabled;
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        let image_size = desc.width as usize * desc.height as usize * desc.pixel_format.size();
        let images = desc
            .layers
            .iter()
            .map(|layer| match layer {
                Some(bytes) => bytes.to_vec(),
                None => vec![0; image_size],
            })
            .collect();

        let mut state = self.state()?;
        let id = state.allocate(NullObject::Texture { kind: desc.kind, images });
        let texture = TextureId(id);
        state.commands.push(DeviceCommand::CreateTexture {
            texture,
            kind: desc.kind,
            width: desc.width,
            height: desc.height,
            depth_format: desc.usage == crate::graphics_device::TextureUsage::Depth,
        });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureId) -> Result<()> {
        let mut state = self.state()?;
        state.release(texture.0, "Texture")?;
        state.commands.push(DeviceCommand::DeleteTexture(texture));
        Ok(())
    }

    fn read_texture_pixels(
        &mut self,
        texture: TextureId,
        target: TextureImageTarget,
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let mut state = self.state()?;
        let image_index = match target {
            TextureImageTarget::Texture2 => 0,
            TextureImageTarget::Layer(layer) => layer as usize,
            TextureImageTarget::CubeSide(side) => side.index(),
        };
        let expected = width as usize * height as usize * pixel_format.size();
        let pixels = match state.require(texture.0, "Texture")? {
            NullObject::Texture { images, .. } => images
                .get(image_index)
                .cloned()
                .ok_or_else(|| Error::BackendError(format!("{} has no image {:?}", texture, target)))?,
            _ => return Err(Error::BackendError(format!("{} is not a texture", texture))),
        };
        if pixels.len() != expected {
            return Err(Error::BackendError(format!(
                "Read-back of {} expects {} bytes, texture holds {}",
                texture,
                expected,
                pixels.len()
            )));
        }
        state.commands.push(DeviceCommand::ReadTexturePixels(texture, target));
        Ok(pixels)
    }

    fn bind_texture(&mut self, unit: u32, kind: TextureKind, texture: Option<TextureId>) -> Result<()> {
        let mut state = self.state()?;
        if unit >= self.config.max_texture_units {
            return Err(Error::BackendError(format!("Texture unit {} out of range", unit)));
        }
        if let Some(texture) = texture {
            match state.require(texture.0, "Texture")? {
                NullObject::Texture { kind: actual, .. } if *actual == kind => {}
                _ => return Err(Error::BackendError(format!("{} is not a {:?} texture", texture, kind))),
            }
        }
        state.commands.push(DeviceCommand::BindTexture { unit, texture });
        Ok(())
    }

    fn generate_mipmaps(&mut self, texture: TextureId, _kind: TextureKind) -> Result<()> {
        let mut state = self.state()?;
        state.require(texture.0, "Texture")?;
        state.commands.push(DeviceCommand::GenerateMipmaps(texture));
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId> {
        let mut state = self.state()?;
        let buffer = BufferId(state.allocate(NullObject::Buffer));
        state.commands.push(DeviceCommand::CreateBuffer { buffer, kind, size: data.len() });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<()> {
        let mut state = self.state()?;
        state.release(buffer.0, "Buffer")?;
        state.commands.push(DeviceCommand::DeleteBuffer(buffer));
        Ok(())
    }

    fn create_vertex_array(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        attributes: &[VertexAttributeBinding],
    ) -> Result<VertexArrayId> {
        let mut state = self.state()?;
        state.require(vertex_buffer.0, "Buffer")?;
        state.require(index_buffer.0, "Buffer")?;
        let vertex_array = VertexArrayId(state.allocate(NullObject::VertexArray));
        state.commands.push(DeviceCommand::CreateVertexArray {
            vertex_array,
            attributes: attributes.to_vec(),
        });
        Ok(vertex_array)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) -> Result<()> {
        let mut state = self.state()?;
        state.release(vertex_array.0, "Vertex array")?;
        if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
        }
        state.commands.push(DeviceCommand::DeleteVertexArray(vertex_array));
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) -> Result<()> {
        let mut state = self.state()?;
        if let Some(vertex_array) = vertex_array {
            state.require(vertex_array.0, "Vertex array")?;
        }
        state.bound_vertex_array = vertex_array;
        state.commands.push(DeviceCommand::BindVertexArray(vertex_array));
        Ok(())
    }

    fn create_shader_module(&mut self, stage: ShaderStage, source: &str) -> Result<(ShaderModuleId, BuildLog)> {
        let mut state = self.state()?;
        let module = ShaderModuleId(state.allocate(NullObject::ShaderModule));
        state.commands.push(DeviceCommand::CreateShaderModule(module, stage));

        let failure = state
            .compile_failures
            .iter()
            .find(|(marker, _)| source.contains(marker.as_str()))
            .map(|(_, log)| log.clone());
        Ok((module, failure.map_or_else(BuildLog::succeeded, BuildLog::failed)))
    }

    fn delete_shader_module(&mut self, module: ShaderModuleId) -> Result<()> {
        let mut state = self.state()?;
        state.release(module.0, "Shader module")?;
        state.commands.push(DeviceCommand::DeleteShaderModule(module));
        Ok(())
    }

    fn create_program(&mut self, modules: &[ShaderModuleId]) -> Result<(ProgramId, BuildLog)> {
        let mut state = self.state()?;
        for module in modules {
            state.require(module.0, "Shader module")?;
        }
        let program = ProgramId(state.allocate(NullObject::Program));
        state.commands.push(DeviceCommand::CreateProgram(program));
        let log = match state.link_failure.take() {
            Some(log) => BuildLog::failed(log),
            None => BuildLog::succeeded(),
        };
        Ok((program, log))
    }

    fn delete_program(&mut self, program: ProgramId, _modules: &[ShaderModuleId]) -> Result<()> {
        let mut state = self.state()?;
        state.release(program.0, "Program")?;
        if state.current_program == Some(program) {
            state.current_program = None;
        }
        state.commands.push(DeviceCommand::DeleteProgram(program));
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> Result<()> {
        let mut state = self.state()?;
        if let Some(program) = program {
            state.require(program.0, "Program")?;
        }
        state.current_program = program;
        state.commands.push(DeviceCommand::UseProgram(program));
        Ok(())
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<Option<UniformLocation>> {
        let mut state = self.state()?;
        state.require(program.0, "Program")?;
        if state.unused_uniforms.contains(name) {
            return Ok(None);
        }
        let location = UniformLocation(state.next_uniform_location);
        state.next_uniform_location += 1;
        Ok(Some(location))
    }

    fn set_uniform(&mut self, location: UniformLocation, data: UniformData) -> Result<()> {
        let mut state = self.state()?;
        if state.current_program.is_none() {
            return Err(Error::BackendError("No program in use".to_string()));
        }
        state.commands.push(DeviceCommand::SetUniform(location, data));
        Ok(())
    }

    fn create_frame_buffer(&mut self) -> Result<FrameBufferId> {
        let mut state = self.state()?;
        let frame_buffer = FrameBufferId(state.allocate(NullObject::FrameBuffer { attachments: Vec::new() }));
        state.commands.push(DeviceCommand::CreateFrameBuffer(frame_buffer));
        Ok(frame_buffer)
    }

    fn attach_image(&mut self, frame_buffer: FrameBufferId, slot: FrameBufferSlot, image: AttachedImage) -> Result<()> {
        let mut state = self.state()?;
        match state.require(image.texture.0, "Texture")? {
            NullObject::Texture { kind, .. } if *kind == image.target.kind() => {}
            _ => return Err(Error::BackendError(format!("{} does not match {:?}", image.texture, image.target))),
        }
        match state.objects.get_mut(&frame_buffer.0) {
            Some(NullObject::FrameBuffer { attachments }) => attachments.push(slot),
            _ => return Err(Error::BackendError(format!("{} does not exist", frame_buffer))),
        }
        state.commands.push(DeviceCommand::AttachImage { frame_buffer, slot, image });
        Ok(())
    }

    fn frame_buffer_status(&mut self, frame_buffer: FrameBufferId) -> Result<FrameBufferStatus> {
        let mut state = self.state()?;
        let empty = match state.require(frame_buffer.0, "Frame buffer")? {
            NullObject::FrameBuffer { attachments } => attachments.is_empty(),
            _ => return Err(Error::BackendError(format!("{} is not a frame buffer", frame_buffer))),
        };
        state.commands.push(DeviceCommand::CheckFrameBufferStatus(frame_buffer));
        Ok(match (&state.incomplete_status, empty) {
            (Some(status), _) => FrameBufferStatus::Incomplete(status.clone()),
            (None, true) => FrameBufferStatus::Incomplete("missing attachment".to_string()),
            (None, false) => FrameBufferStatus::Complete,
        })
    }

    fn set_draw_buffers(&mut self, frame_buffer: FrameBufferId, slots: &[FrameBufferSlot]) -> Result<()> {
        let mut state = self.state()?;
        state.require(frame_buffer.0, "Frame buffer")?;
        state.commands.push(DeviceCommand::SetDrawBuffers(frame_buffer, slots.to_vec()));
        Ok(())
    }

    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferId>) -> Result<()> {
        let mut state = self.state()?;
        if let Some(frame_buffer) = frame_buffer {
            state.require(frame_buffer.0, "Frame buffer")?;
        }
        state.commands.push(DeviceCommand::BindFrameBuffer(frame_buffer));
        Ok(())
    }

    fn delete_frame_buffer(&mut self, frame_buffer: FrameBufferId) -> Result<()> {
        let mut state = self.state()?;
        state.release(frame_buffer.0, "Frame buffer")?;
        state.commands.push(DeviceCommand::DeleteFrameBuffer(frame_buffer));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.state()?.commands.push(DeviceCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: Option<BlendMode>) -> Result<()> {
        self.state()?.commands.push(DeviceCommand::SetBlendMode(mode));
        Ok(())
    }

    fn set_depth_state(&mut self, test: bool, write: bool) -> Result<()> {
        self.state()?.commands.push(DeviceCommand::SetDepthState { test, write });
        Ok(())
    }

    fn set_cull_mode(&mut self, mode: CullMode) -> Result<()> {
        self.state()?.commands.push(DeviceCommand::SetCullMode(mode));
        Ok(())
    }

    fn clear(&mut self, color: Vec4, buffers: ClearBuffers) -> Result<()> {
        self.state()?.commands.push(DeviceCommand::Clear(color, buffers));
        Ok(())
    }

    fn draw_indexed(&mut self, primitive: PrimitiveType, index_count: u32, index_type: IndexType) -> Result<()> {
        let mut state = self.state()?;
        if state.bound_vertex_array.is_none() {
            return Err(Error::BackendError("Draw issued without a bound vertex array".to_string()));
        }
        state.commands.push(DeviceCommand::DrawIndexed { primitive, index_count, index_type });
        Ok(())
    }
}

// ============================================================================
// NullDeviceProbe
// ============================================================================

/// Shared view into a [`NullGraphicsDevice`]
#[derive(Clone)]
pub struct NullDeviceProbe {
    state: Arc<Mutex<NullDeviceState>>,
}

impl NullDeviceProbe {
    fn state(&self) -> MutexGuard<'_, NullDeviceState> {
        // A poisoned probe only happens after a panicking test; keep reading.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every call recorded so far
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Recorded commands matching `filter`
    pub fn count_commands(&self, filter: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.state().commands.iter().filter(|command| filter(command)).count()
    }

    /// Number of objects currently alive on the device
    pub fn live_object_count(&self) -> usize {
        self.state().objects.len()
    }

    /// Whether an object id is alive
    pub fn is_live(&self, id: u32) -> bool {
        self.state().objects.contains_key(&id)
    }

    /// Index counts of every draw issued, in order
    pub fn draw_calls(&self) -> Vec<u32> {
        self.state()
            .commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::DrawIndexed { index_count, .. } => Some(*index_count),
                _ => None,
            })
            .collect()
    }

    /// Overwrite the pixels of one image, as if it had been rendered to
    pub fn write_texture_pixels(&self, texture: TextureId, image_index: usize, pixels: Vec<u8>) -> bool {
        match self.state().objects.get_mut(&texture.0) {
            Some(NullObject::Texture { images, .. }) => match images.get_mut(image_index) {
                Some(image) => {
                    *image = pixels;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    // ===== FAILURE INJECTION =====

    /// Modules whose source contains `marker` fail to compile with `log`
    pub fn fail_compilation(&self, marker: &str, log: &str) {
        self.state().compile_failures.push((marker.to_string(), log.to_string()));
    }

    /// The next program link fails with `log`
    pub fn fail_next_link(&self, log: &str) {
        self.state().link_failure = Some(log.to_string());
    }

    /// Every completeness check reports `status` until [`reset_failures`](Self::reset_failures)
    pub fn fail_frame_buffer_completeness(&self, status: &str) {
        self.state().incomplete_status = Some(status.to_string());
    }

    /// The linker "optimizes out" uniforms with this name
    /// Whether the renderer asked for driver error checks
    pub fn error_checking(&self) -> bool {
        self.state().error_checking
    }

    pub fn mark_uniform_unused(&self, name: &str) {
        self.state().unused_uniforms.insert(name.to_string());
    }

    pub fn reset_failures(&self) {
        let mut state = self.state();
        state.compile_failures.clear();
        state.link_failure = None;
        state.incomplete_status = None;
        state.unused_uniforms.clear();
    }
}

#[cfg(test)]
#[path = "null_graphics_device_tests.rs"]
mod tests;
