/// Renderer - uploads resources to a graphics device and drives drawing
///
/// The renderer owns one [`GraphicsDevice`] and a registry of every GPU
/// object it created. Resources hold only a key into that registry (see
/// [`RendererObject`](crate::renderer::RendererObject)), so the renderer can
/// release everything deterministically on [`Renderer::shutdown`] and a
/// resource dropped without an explicit destroy still frees its GPU objects.
///
/// `Renderer` is a cheap handle (`Clone`); all clones drive the same device.
/// Calls are serialized on an internal lock and are meant to be issued from
/// the thread owning the graphics context.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use glam::Vec4;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AttachedImage, BufferKind, Capabilities, ClearBuffers, CubeSide, CullMode, DeviceInfo, FrameBufferId,
    FrameBufferSlot, FrameBufferStatus, GraphicsDevice, ProgramId, ShaderModuleId, TextureId,
    TextureImageTarget, TextureKind, TextureUsage, UniformData, UniformLocation,
    VertexAttributeBinding, Viewport,
};
use crate::renderer::{
    FrameBufferData, MeshData, RenderTarget, RendererData, RendererObject, ResourceKey, ShaderData,
    TextureData, Window,
};
use crate::resource::{
    AttachedTexture, FrameBuffer, FrameBufferAttachment, Image, Mesh, Shader, Texture2, Texture3,
    TextureCube, TextureResource, Uniform, UniformValue,
};

const SOURCE: &str = "prism3d::Renderer";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Ask the backend to check for driver errors after each call
    pub enable_validation: bool,
    /// Skip binding a target that is already bound
    pub skip_redundant_target_binds: bool,
    /// Build the full-screen quad drawn by [`Renderer::render_viewport`]
    pub create_viewport_mesh: bool,
    /// Name used in log lines
    pub label: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            skip_redundant_target_binds: true,
            create_viewport_mesh: true,
            label: "Renderer".to_string(),
        }
    }
}

/// Diagnostics counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStatistics {
    /// Bytes of texture and mesh data currently uploaded
    pub memory_usage: usize,
    /// Draw calls issued since the last `on_begin_frame`
    pub draw_calls: u32,
    /// Number of resources currently uploaded
    pub uploaded_resources: usize,
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Device objects owned by one uploaded resource
#[derive(Debug)]
enum GpuHandles {
    Texture(TextureId),
    Mesh(MeshData),
    Shader(ShaderData),
    FrameBuffer(FrameBufferId),
}

#[derive(Debug)]
struct RegisteredResource {
    label: String,
    handles: GpuHandles,
    memory: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundTarget {
    Window { width: u32, height: u32 },
    FrameBuffer(FrameBufferId),
}

/// Attachment whose mipmaps are regenerated at the end of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MipmappedAttachment {
    key: ResourceKey,
    texture: TextureId,
    kind: TextureKind,
}

/// Mutable renderer state, guarded by the renderer lock
pub(crate) struct RendererCore {
    device: Box<dyn GraphicsDevice>,
    config: RendererConfig,
    capabilities: Capabilities,
    link: Weak<RendererShared>,
    registry: SlotMap<ResourceKey, RegisteredResource>,
    memory_usage: usize,
    draw_calls: u32,
    bound_target: Option<BoundTarget>,
    bound_program: Option<ProgramId>,
    mipmapped_attachments: Vec<MipmappedAttachment>,
    viewport_mesh: Option<Mesh>,
}

/// State shared by every `Renderer` clone and weakly referenced by uploaded resources
pub(crate) struct RendererShared {
    core: Mutex<RendererCore>,
    /// Keys of resources dropped while the core was locked
    orphaned: Mutex<Vec<ResourceKey>>,
    alive: AtomicBool,
    label: String,
    capabilities: Capabilities,
    info: DeviceInfo,
}

impl RendererShared {
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Release the registry entry of a resource dropped while uploaded
    ///
    /// Never blocks: if the core is busy (possibly on this very thread) the
    /// key is queued and released when the running operation finishes.
    pub(crate) fn release_dropped(&self, key: ResourceKey) {
        if !self.is_alive() {
            return;
        }
        match self.core.try_lock() {
            Ok(mut core) => {
                if let Err(error) = core.release(key) {
                    crate::engine_warn!(SOURCE, "Failed to release dropped resource: {}", error);
                }
            }
            Err(TryLockError::WouldBlock) => self.orphans().push(key),
            Err(TryLockError::Poisoned(_)) => {}
        }
    }

    fn orphans(&self) -> MutexGuard<'_, Vec<ResourceKey>> {
        self.orphaned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Handle to a renderer
#[derive(Clone)]
pub struct Renderer {
    shared: Arc<RendererShared>,
}

impl Renderer {
    /// Create a renderer driving `device`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the device cannot report its capabilities.
    pub fn new<D: GraphicsDevice + 'static>(mut device: D, config: RendererConfig) -> Result<Self> {
        device.set_error_checking(config.enable_validation);
        let capabilities = device.capabilities().map_err(|error| {
            crate::engine_err!(
                SOURCE,
                Error::InitializationFailed(format!("Cannot query device capabilities: {}", error))
            )
        })?;
        let info = device.info();
        let viewport_mesh = if config.create_viewport_mesh {
            Some(Mesh::viewport_quad()?)
        } else {
            None
        };
        let label = config.label.clone();

        let shared = Arc::new_cyclic(|link| RendererShared {
            core: Mutex::new(RendererCore {
                device: Box::new(device),
                config,
                capabilities,
                link: link.clone(),
                registry: SlotMap::with_key(),
                memory_usage: 0,
                draw_calls: 0,
                bound_target: None,
                bound_program: None,
                mipmapped_attachments: Vec::new(),
                viewport_mesh,
            }),
            orphaned: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
            label,
            capabilities,
            info,
        });

        crate::engine_info!(
            SOURCE,
            "Renderer '{}' created on {} {} ({} texture units)",
            shared.label,
            shared.info.vendor,
            shared.info.renderer,
            capabilities.max_texture_units
        );
        Ok(Self { shared })
    }

    pub(crate) fn from_shared(shared: Arc<RendererShared>) -> Self {
        Self { shared }
    }

    /// Run `f` on the locked core, then release resources dropped meanwhile
    fn with_core<R>(&self, f: impl FnOnce(&mut RendererCore) -> Result<R>) -> Result<R> {
        if !self.shared.is_alive() {
            crate::engine_bail!(SOURCE, "Renderer '{}' has been shut down", self.shared.label);
        }
        let mut core = self
            .shared
            .core
            .lock()
            .map_err(|_| Error::BackendError("Renderer lock poisoned".to_string()))?;
        let result = f(&mut core);
        core.release_orphans(&self.shared);
        result
    }

    // ===== INFORMATION =====

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn capabilities(&self) -> Capabilities {
        self.shared.capabilities
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Whether both handles drive the same renderer
    pub fn ptr_eq(&self, other: &Renderer) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn statistics(&self) -> Result<RendererStatistics> {
        self.with_core(|core| {
            Ok(RendererStatistics {
                memory_usage: core.memory_usage,
                draw_calls: core.draw_calls,
                uploaded_resources: core.registry.len(),
            })
        })
    }

    /// Destroy every uploaded resource and stop accepting calls
    ///
    /// Resources uploaded to this renderer report `is_uploaded() == false`
    /// afterwards. Calling it twice is a no-op.
    pub fn shutdown(&self) {
        if !self.shared.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        match self.shared.core.lock() {
            Ok(mut core) => {
                let count = core.registry.len();
                core.release_all();
                crate::engine_info!(
                    SOURCE,
                    "Renderer '{}' shut down ({} resources released)",
                    self.shared.label,
                    count
                );
            }
            Err(_) => crate::engine_error!(SOURCE, "Renderer '{}' lock poisoned during shutdown", self.shared.label),
        }
        self.shared.orphans().clear();
    }

    // ===== TEXTURES =====

    pub fn upload_texture2(&self, texture: &mut Texture2) -> Result<()> {
        self.with_core(|core| core.upload_texture(texture, TextureUsage::Color))
    }

    pub fn upload_texture3(&self, texture: &mut Texture3) -> Result<()> {
        self.with_core(|core| core.upload_texture(texture, TextureUsage::Color))
    }

    pub fn upload_texture_cube(&self, texture: &mut TextureCube) -> Result<()> {
        self.with_core(|core| core.upload_texture(texture, TextureUsage::Color))
    }

    /// Destroy the GPU copy of a texture
    ///
    /// With `download_image`, images missing from the CPU cache are read
    /// back first so rendered pixels survive the destroy.
    pub fn destroy_texture2(&self, texture: &mut Texture2, download_image: bool) -> Result<()> {
        self.with_core(|core| core.destroy_texture(texture, download_image))
    }

    pub fn destroy_texture3(&self, texture: &mut Texture3, download_image: bool) -> Result<()> {
        self.with_core(|core| core.destroy_texture(texture, download_image))
    }

    pub fn destroy_texture_cube(&self, texture: &mut TextureCube, download_image: bool) -> Result<()> {
        self.with_core(|core| core.destroy_texture(texture, download_image))
    }

    /// Read the pixels of an uploaded 2D texture back from the GPU
    pub fn download_texture2_image(&self, texture: &Texture2) -> Result<Image> {
        self.with_core(|core| core.download_image(texture, TextureImageTarget::Texture2))
    }

    pub fn download_texture3_image(&self, texture: &Texture3, layer: u32) -> Result<Image> {
        if layer >= texture.depth() {
            crate::engine_bail!(
                SOURCE,
                "Layer {} is out of range for texture '{}' of depth {}",
                layer,
                texture.name(),
                texture.depth()
            );
        }
        self.with_core(|core| core.download_image(texture, TextureImageTarget::Layer(layer)))
    }

    pub fn download_texture_cube_image(&self, texture: &TextureCube, side: CubeSide) -> Result<Image> {
        self.with_core(|core| core.download_image(texture, TextureImageTarget::CubeSide(side)))
    }

    // ===== SHADERS =====

    /// Compile, link and resolve the uniforms of a shader
    ///
    /// # Errors
    ///
    /// `ShaderCompileFailed` / `ShaderLinkFailed` carrying the driver log.
    /// Nothing stays allocated on the device after a failure.
    pub fn upload_shader(&self, shader: &mut Shader) -> Result<()> {
        self.with_core(|core| core.upload_shader(shader))
    }

    pub fn destroy_shader(&self, shader: &mut Shader) -> Result<()> {
        self.with_core(|core| core.destroy_shader(shader))
    }

    // ===== MESHES =====

    pub fn upload_mesh(&self, mesh: &mut Mesh) -> Result<()> {
        self.with_core(|core| core.upload_mesh(mesh))
    }

    pub fn destroy_mesh(&self, mesh: &mut Mesh) -> Result<()> {
        self.with_core(|core| {
            let name = mesh.name().to_string();
            core.destroy_object(mesh.object_mut(), &name, "mesh")
        })
    }

    // ===== FRAME BUFFERS =====

    /// Upload a frame buffer and every attached texture
    ///
    /// # Errors
    ///
    /// `InvalidResource` for a dangling attachment, `IncompleteFrameBuffer`
    /// when the device rejects the attachment combination.
    pub fn upload_frame_buffer(&self, frame_buffer: &mut FrameBuffer) -> Result<()> {
        self.with_core(|core| core.upload_frame_buffer(frame_buffer))
    }

    /// Destroy a frame buffer; attached textures stay uploaded
    pub fn destroy_frame_buffer(&self, frame_buffer: &mut FrameBuffer) -> Result<()> {
        self.with_core(|core| {
            let name = frame_buffer.name().to_string();
            core.destroy_object(frame_buffer.object_mut(), &name, "frame buffer")
        })
    }

    // ===== BINDING =====

    /// Render into `target` (a [`Window`] or a [`FrameBuffer`])
    pub fn set_target(&self, target: &mut dyn RenderTarget) -> Result<()> {
        target.bind(self)
    }

    pub(crate) fn set_window_target(&self, window: &Window) -> Result<()> {
        self.with_core(|core| core.bind_window(window.width(), window.height()))
    }

    /// Bind a frame buffer, uploading it first if needed
    ///
    /// The GPU copy of every attached texture becomes authoritative: their
    /// CPU image caches are dropped.
    pub(crate) fn set_frame_buffer_target(&self, frame_buffer: &mut FrameBuffer) -> Result<()> {
        self.with_core(|core| core.bind_frame_buffer(frame_buffer))
    }

    /// Bind a shader, uploading it first if needed, and apply its blend,
    /// depth and default uniform state
    pub fn set_shader(&self, shader: &mut Shader) -> Result<()> {
        self.with_core(|core| core.bind_shader(shader))
    }

    /// Set a uniform of the bound shader
    ///
    /// A uniform the linker optimized out is silently ignored. Texture
    /// values are uploaded if needed and bound to the uniform's unit.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` with no bound shader, for a value of the wrong
    /// type, or for a texture unit beyond the hardware limit.
    pub fn set_uniform(&self, uniform: &Uniform, value: &UniformValue) -> Result<()> {
        self.with_core(|core| core.apply_uniform(uniform, value))
    }

    // ===== DRAWING =====

    /// Draw a mesh with the bound shader, uploading it first if needed
    pub fn render_mesh(&self, mesh: &mut Mesh) -> Result<()> {
        self.with_core(|core| core.draw_mesh(mesh))
    }

    /// Draw the full-screen quad with the bound shader
    pub fn render_viewport(&self) -> Result<()> {
        self.with_core(|core| core.draw_viewport())
    }

    /// Clear the bound target's color buffer, and its depth buffer if `depth`
    pub fn clear(&self, color: Vec4, depth: bool) -> Result<()> {
        let mut buffers = ClearBuffers::COLOR;
        if depth {
            buffers |= ClearBuffers::DEPTH;
        }
        self.with_core(|core| core.device.clear(color, buffers))
    }

    pub fn set_cull_mode(&self, mode: CullMode) -> Result<()> {
        self.with_core(|core| core.device.set_cull_mode(mode))
    }

    // ===== FRAME =====

    /// Reset binding state and bind `target` for a new frame
    pub fn on_begin_frame(&self, target: &mut dyn RenderTarget) -> Result<()> {
        self.with_core(|core| core.reset_frame_state())?;
        self.set_target(target)
    }

    /// Regenerate mipmaps of mipmapped attachments rendered to this frame
    pub fn on_end_frame(&self) -> Result<()> {
        self.with_core(|core| core.finish_frame())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("label", &self.shared.label)
            .field("alive", &self.shared.is_alive())
            .finish()
    }
}

// ============================================================================
// CORE
// ============================================================================

impl RendererCore {
    fn register(&mut self, label: &str, handles: GpuHandles, memory: usize) -> ResourceKey {
        self.memory_usage += memory;
        self.registry.insert(RegisteredResource { label: label.to_string(), handles, memory })
    }

    /// Remove a registry entry and delete its device objects; unknown keys are ignored
    fn release(&mut self, key: ResourceKey) -> Result<()> {
        let Some(entry) = self.registry.remove(key) else {
            return Ok(());
        };
        self.memory_usage = self.memory_usage.saturating_sub(entry.memory);
        crate::engine_trace!(SOURCE, "Releasing '{}'", entry.label);
        self.delete_handles(entry.handles)
    }

    fn delete_handles(&mut self, handles: GpuHandles) -> Result<()> {
        match handles {
            GpuHandles::Texture(texture) => {
                self.mipmapped_attachments.retain(|attachment| attachment.texture != texture);
                self.device.delete_texture(texture)
            }
            GpuHandles::Mesh(data) => {
                let vertex_array = self.device.delete_vertex_array(data.vertex_array);
                let vertex_buffer = self.device.delete_buffer(data.vertex_buffer);
                let index_buffer = self.device.delete_buffer(data.index_buffer);
                vertex_array.and(vertex_buffer).and(index_buffer)
            }
            GpuHandles::Shader(data) => {
                if self.bound_program == Some(data.program) {
                    self.bound_program = None;
                }
                self.device.delete_program(data.program, &data.modules)?;
                for module in data.modules {
                    self.device.delete_shader_module(module)?;
                }
                Ok(())
            }
            GpuHandles::FrameBuffer(frame_buffer) => {
                if self.bound_target == Some(BoundTarget::FrameBuffer(frame_buffer)) {
                    self.bound_target = None;
                }
                self.device.delete_frame_buffer(frame_buffer)
            }
        }
    }

    fn release_all(&mut self) {
        // Its registry entry is released below with the others.
        if let Some(mut mesh) = self.viewport_mesh.take() {
            if let Some(data) = mesh.object_mut().set_as_destroyed() {
                data.into_key();
            }
        }
        let keys: Vec<ResourceKey> = self.registry.keys().collect();
        for key in keys {
            if let Err(error) = self.release(key) {
                crate::engine_warn!(SOURCE, "Failed to release resource: {}", error);
            }
        }
        self.bound_target = None;
        self.bound_program = None;
        self.mipmapped_attachments.clear();
    }

    fn release_orphans(&mut self, shared: &RendererShared) {
        let orphans = mem::take(&mut *shared.orphans());
        for key in orphans {
            if let Err(error) = self.release(key) {
                crate::engine_warn!(SOURCE, "Failed to release dropped resource: {}", error);
            }
        }
    }

    fn attach_data<D>(&self, object: &mut RendererObject<D>, payload: D, key: ResourceKey) {
        object.set_as_uploaded(RendererData::new(payload, key, self.link.clone()));
    }

    /// Whether `object` is uploaded to this renderer
    ///
    /// # Errors
    ///
    /// `InvalidResource` if it is uploaded to another live renderer.
    fn check_owner<D>(&self, object: &RendererObject<D>, name: &str) -> Result<bool> {
        if !object.is_uploaded() {
            return Ok(false);
        }
        if object.is_uploaded_to(&self.link) {
            Ok(true)
        } else {
            Err(crate::engine_err!(
                SOURCE,
                Error::InvalidResource(format!("'{}' is uploaded to another renderer", name))
            ))
        }
    }

    /// Detach and release the GPU data of any resource
    fn destroy_object<D>(&mut self, object: &mut RendererObject<D>, name: &str, kind: &str) -> Result<()> {
        if !self.check_owner(object, name)? {
            // Stale data of a renderer that is gone.
            drop(object.set_as_destroyed());
            return Ok(());
        }
        if let Some(data) = object.set_as_destroyed() {
            self.release(data.into_key())?;
            crate::engine_debug!(SOURCE, "Destroyed {} '{}'", kind, name);
        }
        Ok(())
    }

    // ===== TEXTURES =====

    fn upload_texture<T: TextureResource>(&mut self, texture: &mut T, usage: TextureUsage) -> Result<()> {
        if self.check_owner(texture.texture_object(), texture.texture_name())? {
            return Ok(());
        }

        let desc = texture.describe(usage);
        let id = self.device.create_texture(&desc)?;
        if desc.mipmapped && usage == TextureUsage::Color {
            if let Err(error) = self.device.generate_mipmaps(id, desc.kind) {
                self.discard(|device| device.delete_texture(id));
                return Err(error);
            }
        }
        let kind = desc.kind;
        let memory = desc.byte_size();
        let key = self.register(desc.label, GpuHandles::Texture(id), memory);

        crate::engine_debug!(
            SOURCE,
            "Uploaded {:?} texture '{}' as {} ({} bytes)",
            kind,
            texture.texture_name(),
            id,
            memory
        );
        self.attach_data(texture.texture_object_mut(), TextureData { texture: id, kind }, key);
        Ok(())
    }

    fn destroy_texture<T: TextureResource>(&mut self, texture: &mut T, download_image: bool) -> Result<()> {
        if download_image {
            if let Some(data) = self.owned_texture_data(texture)? {
                for target in texture.missing_images() {
                    let image = self.read_image(texture, data.texture, target)?;
                    texture.store_image(target, image);
                }
            }
        }
        let name = texture.texture_name().to_string();
        self.destroy_object(texture.texture_object_mut(), &name, "texture")
    }

    fn download_image<T: TextureResource>(&mut self, texture: &T, target: TextureImageTarget) -> Result<Image> {
        let Some(data) = self.owned_texture_data(texture)? else {
            crate::engine_bail!(
                SOURCE,
                "Cannot download texture '{}' which is not uploaded",
                texture.texture_name()
            );
        };
        self.read_image(texture, data.texture, target)
    }

    fn owned_texture_data<T: TextureResource>(&self, texture: &T) -> Result<Option<TextureData>> {
        if self.check_owner(texture.texture_object(), texture.texture_name())? {
            Ok(texture.texture_object().data().copied())
        } else {
            Ok(None)
        }
    }

    fn read_image<T: TextureResource>(&mut self, texture: &T, id: TextureId, target: TextureImageTarget) -> Result<Image> {
        let (width, height, pixel_format, color_space) = texture.image_layout();
        let pixels = self.device.read_texture_pixels(id, target, pixel_format, width, height)?;
        crate::engine_trace!(SOURCE, "Downloaded {:?} of texture '{}'", target, texture.texture_name());
        Image::from_pixels(width, height, pixel_format, color_space, pixels)
    }

    // ===== SHADERS =====

    fn upload_shader(&mut self, shader: &mut Shader) -> Result<()> {
        if self.check_owner(shader.object(), shader.name())? {
            return Ok(());
        }

        let mut modules = Vec::with_capacity(shader.modules().len());
        let mut program = None;
        let built = self.build_program(shader, &mut modules, &mut program);
        let resolved = match built {
            Ok(resolved) => resolved,
            Err(error) => {
                if let Some(program) = program {
                    self.discard(|device| device.delete_program(program, &modules));
                }
                for module in &modules {
                    self.discard(|device| device.delete_shader_module(*module));
                }
                return Err(error);
            }
        };
        let Some(program) = program else {
            return Err(Error::BackendError(format!("Shader '{}' produced no program", shader.name())));
        };

        for (uniform, (location, unit)) in shader.uniforms_mut().iter_mut().zip(resolved) {
            uniform.resolve(location, unit);
        }
        let key = self.register(
            shader.name(),
            GpuHandles::Shader(ShaderData { program, modules: modules.clone() }),
            0,
        );
        crate::engine_debug!(SOURCE, "Uploaded shader '{}' as {}", shader.name(), program);
        self.attach_data(shader.object_mut(), ShaderData { program, modules }, key);
        Ok(())
    }

    /// Compile and link; every object created is reported through
    /// `modules` / `program` so the caller can clean up on failure
    fn build_program(
        &mut self,
        shader: &Shader,
        modules: &mut Vec<ShaderModuleId>,
        program: &mut Option<ProgramId>,
    ) -> Result<Vec<(Option<UniformLocation>, Option<u32>)>> {
        for module in shader.modules() {
            let (id, log) = self.device.create_shader_module(module.stage(), module.source())?;
            modules.push(id);
            if !log.success {
                return Err(crate::engine_err!(
                    SOURCE,
                    Error::ShaderCompileFailed {
                        shader: shader.name().to_string(),
                        module: module.name().to_string(),
                        log: log.log,
                    }
                ));
            }
        }

        let (id, log) = self.device.create_program(modules)?;
        *program = Some(id);
        if !log.success {
            return Err(crate::engine_err!(
                SOURCE,
                Error::ShaderLinkFailed { shader: shader.name().to_string(), log: log.log }
            ));
        }

        // Texture units follow declaration order so they survive re-links.
        let mut next_unit = 0;
        let mut resolved = Vec::with_capacity(shader.uniforms().len());
        for uniform in shader.uniforms() {
            let location = self.device.uniform_location(id, uniform.name())?;
            if location.is_none() {
                crate::engine_warn!(
                    SOURCE,
                    "Uniform '{}' is not referenced in shader '{}'",
                    uniform.name(),
                    shader.name()
                );
            }
            let unit = if uniform.uniform_type().is_texture() {
                next_unit += 1;
                Some(next_unit - 1)
            } else {
                None
            };
            resolved.push((location, unit));
        }
        Ok(resolved)
    }

    fn destroy_shader(&mut self, shader: &mut Shader) -> Result<()> {
        let name = shader.name().to_string();
        self.destroy_object(shader.object_mut(), &name, "shader")?;
        shader.uniforms_mut().iter_mut().for_each(Uniform::unresolve);
        Ok(())
    }

    // ===== MESHES =====

    fn upload_mesh(&mut self, mesh: &mut Mesh) -> Result<()> {
        if self.check_owner(mesh.object(), mesh.name())? {
            return Ok(());
        }

        let layout = mesh.vertex_layout();
        let stride = layout.vertex_size() as u32;
        let bindings: Vec<VertexAttributeBinding> = layout
            .attributes()
            .iter()
            .enumerate()
            .map(|(index, attribute)| VertexAttributeBinding {
                index: index as u32,
                attribute_type: attribute.attribute_type(),
                cardinality: attribute.cardinality(),
                stride,
                offset: attribute.offset() as u32,
                integer: attribute.attribute_type().is_integer(),
            })
            .collect();

        let vertex_buffer = self.device.create_buffer(BufferKind::Vertex, mesh.vertex_data())?;
        let index_buffer = match self.device.create_buffer(BufferKind::Index, mesh.index_data()) {
            Ok(buffer) => buffer,
            Err(error) => {
                self.discard(|device| device.delete_buffer(vertex_buffer));
                return Err(error);
            }
        };
        let vertex_array = match self.device.create_vertex_array(vertex_buffer, index_buffer, &bindings) {
            Ok(vertex_array) => vertex_array,
            Err(error) => {
                self.discard(|device| device.delete_buffer(index_buffer));
                self.discard(|device| device.delete_buffer(vertex_buffer));
                return Err(error);
            }
        };

        let data = MeshData { vertex_array, vertex_buffer, index_buffer };
        let memory = mesh.vertex_data().len() + mesh.index_data().len();
        let key = self.register(mesh.name(), GpuHandles::Mesh(data), memory);
        crate::engine_debug!(
            SOURCE,
            "Uploaded mesh '{}' ({} vertices, {} indices)",
            mesh.name(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        self.attach_data(mesh.object_mut(), data, key);
        Ok(())
    }

    // ===== FRAME BUFFERS =====

    fn upload_frame_buffer(&mut self, frame_buffer: &mut FrameBuffer) -> Result<()> {
        if self.check_owner(frame_buffer.object(), frame_buffer.name())? {
            return Ok(());
        }

        let id = self.device.create_frame_buffer()?;
        if let Err(error) = self.attach_all(id, frame_buffer) {
            self.discard(|device| device.delete_frame_buffer(id));
            self.bound_target = None;
            return Err(error);
        }
        // The device may leave the new frame buffer bound.
        self.device.bind_frame_buffer(None)?;
        self.bound_target = None;

        let key = self.register(frame_buffer.name(), GpuHandles::FrameBuffer(id), 0);
        crate::engine_debug!(
            SOURCE,
            "Uploaded frame buffer '{}' as {} ({} attachments)",
            frame_buffer.name(),
            id,
            frame_buffer.attachments().len()
        );
        self.attach_data(frame_buffer.object_mut(), FrameBufferData { frame_buffer: id }, key);
        Ok(())
    }

    fn attach_all(&mut self, id: FrameBufferId, frame_buffer: &FrameBuffer) -> Result<()> {
        let mut ordered: Vec<&FrameBufferAttachment> = frame_buffer.attachments().iter().collect();
        ordered.sort_by_key(|attachment| match attachment.slot() {
            FrameBufferSlot::Depth => (0, 0),
            FrameBufferSlot::Color(index) => (1, index),
        });

        let mut draw_buffers = Vec::new();
        for attachment in ordered {
            let slot = attachment.slot();
            let usage = if slot.is_depth() { TextureUsage::Depth } else { TextureUsage::Color };
            let image = match attachment.texture() {
                AttachedTexture::Texture2(texture) => {
                    self.upload_attached(texture, usage, TextureImageTarget::Texture2, frame_buffer.name(), slot)?
                }
                AttachedTexture::Texture3 { texture, layer } => {
                    self.upload_attached(texture, usage, TextureImageTarget::Layer(*layer), frame_buffer.name(), slot)?
                }
                AttachedTexture::TextureCube { texture, side } => {
                    self.upload_attached(texture, usage, TextureImageTarget::CubeSide(*side), frame_buffer.name(), slot)?
                }
            };
            self.device.attach_image(id, slot, image)?;
            if !slot.is_depth() {
                draw_buffers.push(slot);
            }
        }
        self.device.set_draw_buffers(id, &draw_buffers)?;

        // Once, after every attachment and the draw-buffer list are set.
        if let FrameBufferStatus::Incomplete(status) = self.device.frame_buffer_status(id)? {
            return Err(crate::engine_err!(
                SOURCE,
                Error::IncompleteFrameBuffer { frame_buffer: frame_buffer.name().to_string(), status }
            ));
        }
        Ok(())
    }

    fn upload_attached<T: TextureResource>(
        &mut self,
        texture: &Weak<Mutex<T>>,
        usage: TextureUsage,
        target: TextureImageTarget,
        frame_buffer: &str,
        slot: FrameBufferSlot,
    ) -> Result<AttachedImage> {
        let texture = upgrade_attachment(texture, frame_buffer, slot)?;
        let mut guard = try_lock_texture(&*texture)?;
        self.upload_texture(&mut *guard, usage)?;
        match guard.texture_object().data() {
            Some(data) => Ok(AttachedImage { texture: data.texture, target }),
            None => Err(Error::BackendError(format!(
                "Texture '{}' lost its GPU data during upload",
                guard.texture_name()
            ))),
        }
    }

    // ===== BINDING =====

    fn bind_window(&mut self, width: u32, height: u32) -> Result<()> {
        let target = BoundTarget::Window { width, height };
        if self.config.skip_redundant_target_binds && self.bound_target == Some(target) {
            return Ok(());
        }
        self.device.bind_frame_buffer(None)?;
        self.device.set_viewport(Viewport::from_size(width, height))?;
        self.bound_target = Some(target);
        Ok(())
    }

    fn bind_frame_buffer(&mut self, frame_buffer: &mut FrameBuffer) -> Result<()> {
        if self.check_owner(frame_buffer.object(), frame_buffer.name())? && !self.attachments_uploaded(frame_buffer)? {
            // A mutated attachment lost its GPU copy; rebuild against the new one.
            crate::engine_debug!(
                SOURCE,
                "Rebuilding frame buffer '{}' after an attachment was modified",
                frame_buffer.name()
            );
            let name = frame_buffer.name().to_string();
            self.destroy_object(frame_buffer.object_mut(), &name, "frame buffer")?;
        }
        self.upload_frame_buffer(frame_buffer)?;
        let Some(data) = frame_buffer.object().data().copied() else {
            crate::engine_bail!(SOURCE, "Frame buffer '{}' is not uploaded", frame_buffer.name());
        };

        for attachment in frame_buffer.attachments() {
            let slot = attachment.slot();
            match attachment.texture() {
                AttachedTexture::Texture2(texture) => self.track_attachment(texture, frame_buffer.name(), slot)?,
                AttachedTexture::Texture3 { texture, .. } => self.track_attachment(texture, frame_buffer.name(), slot)?,
                AttachedTexture::TextureCube { texture, .. } => {
                    self.track_attachment(texture, frame_buffer.name(), slot)?
                }
            }
        }

        let target = BoundTarget::FrameBuffer(data.frame_buffer);
        if self.config.skip_redundant_target_binds && self.bound_target == Some(target) {
            return Ok(());
        }
        self.device.bind_frame_buffer(Some(data.frame_buffer))?;
        self.device.set_viewport(Viewport::from_size(frame_buffer.width(), frame_buffer.height()))?;
        self.bound_target = Some(target);
        Ok(())
    }

    /// Whether every attached texture still has its GPU copy on this renderer
    fn attachments_uploaded(&self, frame_buffer: &FrameBuffer) -> Result<bool> {
        for attachment in frame_buffer.attachments() {
            let slot = attachment.slot();
            let uploaded = match attachment.texture() {
                AttachedTexture::Texture2(texture) => self.attachment_uploaded(texture, frame_buffer.name(), slot)?,
                AttachedTexture::Texture3 { texture, .. } => {
                    self.attachment_uploaded(texture, frame_buffer.name(), slot)?
                }
                AttachedTexture::TextureCube { texture, .. } => {
                    self.attachment_uploaded(texture, frame_buffer.name(), slot)?
                }
            };
            if !uploaded {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn attachment_uploaded<T: TextureResource>(
        &self,
        texture: &Weak<Mutex<T>>,
        frame_buffer: &str,
        slot: FrameBufferSlot,
    ) -> Result<bool> {
        let texture = upgrade_attachment(texture, frame_buffer, slot)?;
        let guard = try_lock_texture(&*texture)?;
        Ok(guard.texture_object().is_uploaded_to(&self.link))
    }

    /// Drop the CPU cache of an attached texture and remember it for
    /// end-of-frame mipmap generation
    fn track_attachment<T: TextureResource>(
        &mut self,
        texture: &Weak<Mutex<T>>,
        frame_buffer: &str,
        slot: FrameBufferSlot,
    ) -> Result<()> {
        let texture = upgrade_attachment(texture, frame_buffer, slot)?;
        let mut guard = try_lock_texture(&*texture)?;
        guard.clear_local_images();
        if slot.is_depth() || !guard.texture_mipmapped() {
            return Ok(());
        }
        let object = guard.texture_object();
        if let (Some(key), Some(data)) = (object.key(), object.data()) {
            let attachment = MipmappedAttachment { key, texture: data.texture, kind: data.kind };
            if !self.mipmapped_attachments.contains(&attachment) {
                self.mipmapped_attachments.push(attachment);
            }
        }
        Ok(())
    }

    fn bind_shader(&mut self, shader: &mut Shader) -> Result<()> {
        self.upload_shader(shader)?;
        let Some(program) = shader.object().data().map(|data| data.program) else {
            crate::engine_bail!(SOURCE, "Shader '{}' is not uploaded", shader.name());
        };

        self.device.use_program(Some(program))?;
        self.bound_program = Some(program);

        let blend_mode = shader.blend_mode();
        self.device
            .set_blend_mode(if blend_mode.is_trivial() { None } else { Some(blend_mode) })?;
        self.device.set_depth_state(shader.is_depth_tested(), shader.is_depth_tested())?;

        for uniform in shader.uniforms() {
            if let Some(value) = uniform.default_value() {
                self.apply_uniform(uniform, value)?;
            }
        }
        Ok(())
    }

    fn apply_uniform(&mut self, uniform: &Uniform, value: &UniformValue) -> Result<()> {
        if self.bound_program.is_none() {
            crate::engine_bail!(SOURCE, "Cannot set uniform '{}' without a bound shader", uniform.name());
        }
        if value.uniform_type() != uniform.uniform_type() {
            crate::engine_bail!(
                SOURCE,
                "Invalid value for uniform '{}': expected {:?}, got {:?}",
                uniform.name(),
                uniform.uniform_type(),
                value.uniform_type()
            );
        }
        let Some(location) = uniform.location() else {
            return Ok(());
        };

        match value {
            UniformValue::Texture2(texture) => self.bind_texture_uniform(uniform, location, &**texture),
            UniformValue::Texture3(texture) => self.bind_texture_uniform(uniform, location, &**texture),
            UniformValue::TextureCube(texture) => self.bind_texture_uniform(uniform, location, &**texture),
            plain => match plain.plain_data() {
                Some(data) => self.device.set_uniform(location, data),
                None => Ok(()),
            },
        }
    }

    fn bind_texture_uniform<T: TextureResource>(
        &mut self,
        uniform: &Uniform,
        location: UniformLocation,
        texture: &Mutex<T>,
    ) -> Result<()> {
        let Some(unit) = uniform.texture_unit() else {
            crate::engine_bail!(SOURCE, "Uniform '{}' has no texture unit", uniform.name());
        };
        if unit >= self.capabilities.max_texture_units {
            crate::engine_bail!(
                SOURCE,
                "Cannot bind a texture unit beyond hardware capabilities (unit {} of {} for uniform '{}')",
                unit,
                self.capabilities.max_texture_units,
                uniform.name()
            );
        }

        let mut guard = try_lock_texture(texture)?;
        self.upload_texture(&mut *guard, TextureUsage::Color)?;
        let Some(data) = guard.texture_object().data().copied() else {
            crate::engine_bail!(SOURCE, "Texture '{}' is not uploaded", guard.texture_name());
        };
        self.device.set_uniform(location, UniformData::Int(unit as i32))?;
        self.device.bind_texture(unit, data.kind, Some(data.texture))
    }

    // ===== DRAWING =====

    fn draw_mesh(&mut self, mesh: &mut Mesh) -> Result<()> {
        self.upload_mesh(mesh)?;
        let Some(data) = mesh.object().data().copied() else {
            crate::engine_bail!(SOURCE, "Mesh '{}' is not uploaded", mesh.name());
        };
        self.device.bind_vertex_array(Some(data.vertex_array))?;
        self.device
            .draw_indexed(mesh.primitive_type(), mesh.index_count() as u32, mesh.index_type())?;
        self.draw_calls += 1;
        Ok(())
    }

    fn draw_viewport(&mut self) -> Result<()> {
        let Some(mut mesh) = self.viewport_mesh.take() else {
            crate::engine_bail!(SOURCE, "Renderer was created without a viewport mesh");
        };
        let result = self.draw_mesh(&mut mesh);
        self.viewport_mesh = Some(mesh);
        result
    }

    fn reset_frame_state(&mut self) -> Result<()> {
        self.device.use_program(None)?;
        self.device.bind_vertex_array(None)?;
        for unit in 0..self.capabilities.max_texture_units {
            for kind in [TextureKind::Texture2, TextureKind::Texture3, TextureKind::Cube] {
                self.device.bind_texture(unit, kind, None)?;
            }
        }
        self.device.set_blend_mode(None)?;
        self.device.set_depth_state(true, true)?;

        self.bound_target = None;
        self.bound_program = None;
        self.draw_calls = 0;
        self.mipmapped_attachments.clear();
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        for attachment in mem::take(&mut self.mipmapped_attachments) {
            if self.registry.contains_key(attachment.key) {
                self.device.generate_mipmaps(attachment.texture, attachment.kind)?;
            }
        }
        Ok(())
    }

    /// Run a cleanup call whose failure must not hide the original error
    fn discard(&mut self, cleanup: impl FnOnce(&mut Box<dyn GraphicsDevice>) -> Result<()>) {
        if let Err(error) = cleanup(&mut self.device) {
            crate::engine_warn!(SOURCE, "Cleanup after a failed upload failed: {}", error);
        }
    }
}

impl Drop for RendererCore {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            self.release_all();
        }
    }
}

fn upgrade_attachment<T>(
    texture: &Weak<Mutex<T>>,
    frame_buffer: &str,
    slot: FrameBufferSlot,
) -> Result<Arc<Mutex<T>>> {
    texture.upgrade().ok_or_else(|| {
        crate::engine_err!(
            SOURCE,
            Error::InvalidResource(format!(
                "Texture attached to slot '{}' of frame buffer '{}' no longer exists",
                slot, frame_buffer
            ))
        )
    })
}

/// Lock a texture without blocking; the renderer lock is already held
fn try_lock_texture<T>(texture: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    match texture.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => Err(crate::engine_err!(
            SOURCE,
            Error::InvalidOperation("Texture is locked by its owner while the renderer uses it".to_string())
        )),
        Err(TryLockError::Poisoned(_)) => Err(Error::BackendError("Texture lock poisoned".to_string())),
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
