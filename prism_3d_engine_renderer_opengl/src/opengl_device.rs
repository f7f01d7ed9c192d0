/// OpenGL device - `GraphicsDevice` implementation over a glow context
///
/// The device hands out its own monotonically increasing ids and maps them
/// to glow objects, so the renderer never sees a native handle. A GL
/// context is single-threaded: the device must be driven from the thread
/// that made the context current.

use glow::HasContext;
use prism_3d_engine::glam::Vec4;
use prism_3d_engine::prism3d::device::{
    AttachedImage, BlendMode, BufferId, BufferKind, BuildLog, Capabilities, ClearBuffers, CubeSide, CullMode,
    DeviceInfo, FrameBufferId, FrameBufferSlot, FrameBufferStatus, GraphicsDevice, IndexType,
    PixelFormat, PrimitiveType, ProgramId, ShaderModuleId, ShaderStage, TextureDesc, TextureId,
    TextureImageTarget, TextureKind, TextureUsage, UniformData, UniformLocation,
    VertexArrayId, VertexAttributeBinding, Viewport,
};
use prism_3d_engine::prism3d::{Error, Result};
use rustc_hash::FxHashMap;
use crate::debug;
use crate::opengl_format;

const SOURCE: &str = "prism3d::opengl::Device";

/// Upper bound on errors drained after one call (a lost context reports forever)
const MAX_DRAINED_ERRORS: usize = 32;

/// OpenGL device configuration
#[derive(Debug, Clone)]
pub struct OpenGlDeviceConfig {
    /// Call `glGetError` after every GL call and fail on the first error
    pub check_errors: bool,
}

impl Default for OpenGlDeviceConfig {
    fn default() -> Self {
        Self {
            check_errors: cfg!(debug_assertions) || cfg!(feature = "opengl-validation"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GlTexture {
    texture: glow::Texture,
    kind: TextureKind,
    usage: TextureUsage,
    depth: u32,
}

#[derive(Debug, Clone)]
struct GlUniform {
    program: u32,
    location: glow::UniformLocation,
}

/// OpenGL implementation of [`GraphicsDevice`]
pub struct OpenGlDevice {
    gl: glow::Context,
    check_errors: bool,
    info: DeviceInfo,
    capabilities: Capabilities,
    next_id: u32,
    next_location: i32,
    textures: FxHashMap<u32, GlTexture>,
    buffers: FxHashMap<u32, glow::Buffer>,
    vertex_arrays: FxHashMap<u32, glow::VertexArray>,
    shader_modules: FxHashMap<u32, glow::Shader>,
    programs: FxHashMap<u32, glow::Program>,
    frame_buffers: FxHashMap<u32, glow::Framebuffer>,
    uniforms: FxHashMap<i32, GlUniform>,
    /// Texture bound per (unit, target), restored after internal binds
    texture_bindings: FxHashMap<(u32, u32), u32>,
    active_unit: u32,
}

// SAFETY: the renderer serializes every device call behind its lock, and
// `OpenGlDevice::new` requires those calls to come from the context thread.
unsafe impl Send for OpenGlDevice {}

impl OpenGlDevice {
    /// Wrap a context that is current on the calling thread
    ///
    /// # Threading
    ///
    /// The device is `Send` so the renderer can live in the engine
    /// singleton, but GL calls are only valid on the thread the context is
    /// current on. Every renderer call reaching this device (uploads,
    /// binds, draws, destroys, setters on uploaded resources and the drop
    /// of an uploaded resource, which releases its GL objects on the spot)
    /// must be made from that thread.
    pub fn new(gl: glow::Context, config: OpenGlDeviceConfig) -> Result<Self> {
        let (info, max_texture_units) = unsafe {
            // Errors raised before we took over the context are not ours
            for _ in 0..MAX_DRAINED_ERRORS {
                if gl.get_error() == glow::NO_ERROR {
                    break;
                }
            }

            gl.enable(glow::PROGRAM_POINT_SIZE);
            gl.enable(glow::TEXTURE_CUBE_MAP_SEAMLESS);

            let info = DeviceInfo {
                vendor: gl.get_parameter_string(glow::VENDOR),
                renderer: gl.get_parameter_string(glow::RENDERER),
                version: gl.get_parameter_string(glow::VERSION),
            };
            (info, gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS))
        };

        if max_texture_units <= 0 {
            return Err(prism_3d_engine::engine_err!(
                SOURCE,
                Error::InitializationFailed(format!(
                    "Driver reports {} texture units; is the context current?",
                    max_texture_units
                ))
            ));
        }

        prism_3d_engine::engine_info!(
            SOURCE,
            "OpenGL {} on {} ({}), error checking {}",
            info.version,
            info.renderer,
            info.vendor,
            if config.check_errors { "on" } else { "off" }
        );

        let device = Self {
            gl,
            check_errors: config.check_errors,
            info,
            capabilities: Capabilities { max_texture_units: max_texture_units as u32 },
            next_id: 1,
            next_location: 0,
            textures: FxHashMap::default(),
            buffers: FxHashMap::default(),
            vertex_arrays: FxHashMap::default(),
            shader_modules: FxHashMap::default(),
            programs: FxHashMap::default(),
            frame_buffers: FxHashMap::default(),
            uniforms: FxHashMap::default(),
            texture_bindings: FxHashMap::default(),
            active_unit: 0,
        };
        device.check("initialize")?;
        Ok(device)
    }

    /// Underlying glow context
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Number of GL objects currently owned by the device
    pub fn live_object_count(&self) -> usize {
        self.textures.len()
            + self.buffers.len()
            + self.vertex_arrays.len()
            + self.shader_modules.len()
            + self.programs.len()
            + self.frame_buffers.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Drain the GL error flag after `call`
    fn check(&self, call: &str) -> Result<()> {
        if !self.check_errors && !cfg!(feature = "opengl-validation") {
            return Ok(());
        }

        let mut first = None;
        for _ in 0..MAX_DRAINED_ERRORS {
            let code = unsafe { self.gl.get_error() };
            if code == glow::NO_ERROR {
                break;
            }
            let occurrences = debug::record_gl_error(code, call);
            if occurrences == 1 {
                prism_3d_engine::engine_error!(SOURCE, "{} raised {}", call, opengl_format::error_name(code));
            }
            first.get_or_insert(code);
        }

        match first {
            None => Ok(()),
            Some(glow::OUT_OF_MEMORY) => Err(Error::OutOfMemory),
            Some(code) => Err(Error::BackendError(format!(
                "{} raised {}",
                call,
                opengl_format::error_name(code)
            ))),
        }
    }

    fn texture(&self, texture: TextureId) -> Result<GlTexture> {
        self.textures
            .get(&texture.0)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", texture)))
    }

    fn buffer(&self, buffer: BufferId) -> Result<glow::Buffer> {
        self.buffers
            .get(&buffer.0)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", buffer)))
    }

    fn shader_module(&self, module: ShaderModuleId) -> Result<glow::Shader> {
        self.shader_modules
            .get(&module.0)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", module)))
    }

    fn program(&self, program: ProgramId) -> Result<glow::Program> {
        self.programs
            .get(&program.0)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", program)))
    }

    fn frame_buffer(&self, frame_buffer: FrameBufferId) -> Result<glow::Framebuffer> {
        self.frame_buffers
            .get(&frame_buffer.0)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", frame_buffer)))
    }

    /// Put back whatever the renderer had bound to `target` on the active unit
    fn restore_texture_binding(&self, target: u32) {
        let previous = self
            .texture_bindings
            .get(&(self.active_unit, target))
            .and_then(|id| self.textures.get(id))
            .map(|texture| texture.texture);
        unsafe { self.gl.bind_texture(target, previous) };
    }

    /// Pack the layers of a 3D texture into one volume
    fn volume_data(desc: &TextureDesc<'_>) -> Option<Vec<u8>> {
        if desc.layers.iter().all(Option::is_none) {
            return None;
        }
        let layer_size = desc.width as usize * desc.height as usize * desc.pixel_format.size();
        let mut volume = vec![0u8; layer_size * desc.depth as usize];
        for (layer, pixels) in volume.chunks_exact_mut(layer_size).zip(&desc.layers) {
            if let Some(pixels) = pixels {
                let count = pixels.len().min(layer_size);
                layer[..count].copy_from_slice(&pixels[..count]);
            }
        }
        Some(volume)
    }
}

impl GraphicsDevice for OpenGlDevice {
    // ===== DEVICE =====

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn capabilities(&self) -> Result<Capabilities> {
        Ok(self.capabilities)
    }

    fn set_error_checking(&mut self, enabled: bool) {
        self.check_errors = enabled;
    }

    // ===== TEXTURES =====

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        let target = opengl_format::texture_target(desc.kind);
        let internal_format = opengl_format::internal_format(desc.pixel_format, desc.color_space, desc.usage) as i32;
        let format = opengl_format::pixel_format(desc.pixel_format, desc.usage);
        let ty = opengl_format::pixel_type(desc.pixel_format.pixel_type());
        // Depth textures never get mipmaps
        let mipmapped = desc.mipmapped && desc.usage == TextureUsage::Color;
        let (width, height) = (desc.width as i32, desc.height as i32);

        let texture = unsafe { self.gl.create_texture() }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create texture '{}': {}", desc.label, message))
            )
        })?;

        unsafe {
            self.gl.bind_texture(target, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

            let wrap = opengl_format::wrap_mode(desc.wrapped) as i32;
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MIN_FILTER,
                opengl_format::min_filter(desc.min_filter, mipmapped) as i32,
            );
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MAG_FILTER,
                opengl_format::mag_filter(desc.mag_filter) as i32,
            );
            self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, wrap);
            if desc.kind != TextureKind::Texture2 {
                self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_R, wrap);
            }

            match desc.kind {
                TextureKind::Texture2 => {
                    let pixels = desc.layers.first().copied().flatten();
                    self.gl.tex_image_2d(target, 0, internal_format, width, height, 0, format, ty, pixels);
                }
                TextureKind::Cube => {
                    for side in CubeSide::ALL {
                        let pixels = desc.layers.get(side.index()).copied().flatten();
                        self.gl.tex_image_2d(
                            opengl_format::cube_side_target(side),
                            0,
                            internal_format,
                            width,
                            height,
                            0,
                            format,
                            ty,
                            pixels,
                        );
                    }
                }
                TextureKind::Texture3 => {
                    let volume = Self::volume_data(desc);
                    self.gl.tex_image_3d(
                        target,
                        0,
                        internal_format,
                        width,
                        height,
                        desc.depth as i32,
                        0,
                        format,
                        ty,
                        volume.as_deref(),
                    );
                }
            }
        }
        self.restore_texture_binding(target);

        if let Err(error) = self.check("create_texture") {
            unsafe { self.gl.delete_texture(texture) };
            return Err(error);
        }

        let id = self.allocate_id();
        self.textures.insert(
            id,
            GlTexture { texture, kind: desc.kind, usage: desc.usage, depth: desc.depth },
        );
        prism_3d_engine::engine_trace!(
            SOURCE,
            "Created texture '{}' as {} ({}x{}x{}, {:?})",
            desc.label,
            TextureId(id),
            desc.width,
            desc.height,
            desc.depth,
            desc.kind
        );
        Ok(TextureId(id))
    }

    fn delete_texture(&mut self, texture: TextureId) -> Result<()> {
        let gl_texture = self.texture(texture)?;
        self.textures.remove(&texture.0);
        self.texture_bindings.retain(|_, bound| *bound != texture.0);
        unsafe { self.gl.delete_texture(gl_texture.texture) };
        self.check("delete_texture")
    }

    fn read_texture_pixels(
        &mut self,
        texture: TextureId,
        target: TextureImageTarget,
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let gl_texture = self.texture(texture)?;
        if gl_texture.kind != target.kind() {
            return Err(Error::InvalidResource(format!(
                "{} is a {:?} texture, cannot read {:?}",
                texture, gl_texture.kind, target
            )));
        }

        let bind_target = opengl_format::texture_target(gl_texture.kind);
        let format = opengl_format::pixel_format(pixel_format, gl_texture.usage);
        let ty = opengl_format::pixel_type(pixel_format.pixel_type());
        let image_size = width as usize * height as usize * pixel_format.size();

        let pixels = unsafe {
            self.gl.bind_texture(bind_target, Some(gl_texture.texture));
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);

            match target {
                TextureImageTarget::Layer(layer) => {
                    // GL reads 3D textures whole
                    let mut volume = vec![0u8; image_size * gl_texture.depth as usize];
                    self.gl.get_tex_image(
                        bind_target,
                        0,
                        format,
                        ty,
                        glow::PixelPackData::Slice(&mut volume[..]),
                    );
                    let start = image_size * layer as usize;
                    volume.get(start..start + image_size).map(<[u8]>::to_vec)
                }
                _ => {
                    let mut pixels = vec![0u8; image_size];
                    self.gl.get_tex_image(
                        opengl_format::image_target(target),
                        0,
                        format,
                        ty,
                        glow::PixelPackData::Slice(&mut pixels[..]),
                    );
                    Some(pixels)
                }
            }
        };
        self.restore_texture_binding(bind_target);
        self.check("read_texture_pixels")?;

        pixels.ok_or_else(|| {
            Error::InvalidOperation(format!("{} has no layer {:?}", texture, target))
        })
    }

    fn bind_texture(&mut self, unit: u32, kind: TextureKind, texture: Option<TextureId>) -> Result<()> {
        let target = opengl_format::texture_target(kind);
        let gl_texture = texture.map(|texture| self.texture(texture)).transpose()?;

        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target, gl_texture.map(|texture| texture.texture));
        }
        self.active_unit = unit;
        match texture {
            Some(texture) => self.texture_bindings.insert((unit, target), texture.0),
            None => self.texture_bindings.remove(&(unit, target)),
        };
        self.check("bind_texture")
    }

    fn generate_mipmaps(&mut self, texture: TextureId, kind: TextureKind) -> Result<()> {
        let gl_texture = self.texture(texture)?;
        let target = opengl_format::texture_target(kind);
        unsafe {
            self.gl.bind_texture(target, Some(gl_texture.texture));
            self.gl.generate_mipmap(target);
        }
        self.restore_texture_binding(target);
        self.check("generate_mipmaps")
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create {:?} buffer: {}", kind, message))
            )
        })?;

        // Index buffers are filled through ARRAY_BUFFER too, so the upload
        // leaves the element binding of the bound vertex array alone.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        if let Err(error) = self.check("create_buffer") {
            unsafe { self.gl.delete_buffer(buffer) };
            return Err(error);
        }

        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<()> {
        let gl_buffer = self.buffer(buffer)?;
        self.buffers.remove(&buffer.0);
        unsafe { self.gl.delete_buffer(gl_buffer) };
        self.check("delete_buffer")
    }

    fn create_vertex_array(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        attributes: &[VertexAttributeBinding],
    ) -> Result<VertexArrayId> {
        let vbo = self.buffer(vertex_buffer)?;
        let ibo = self.buffer(index_buffer)?;
        let vertex_array = unsafe { self.gl.create_vertex_array() }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create vertex array: {}", message))
            )
        })?;

        unsafe {
            self.gl.bind_vertex_array(Some(vertex_array));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            for attribute in attributes {
                let ty = opengl_format::vertex_attribute_type(attribute.attribute_type);
                self.gl.enable_vertex_attrib_array(attribute.index);
                if attribute.integer {
                    self.gl.vertex_attrib_pointer_i32(
                        attribute.index,
                        attribute.cardinality as i32,
                        ty,
                        attribute.stride as i32,
                        attribute.offset as i32,
                    );
                } else {
                    self.gl.vertex_attrib_pointer_f32(
                        attribute.index,
                        attribute.cardinality as i32,
                        ty,
                        false,
                        attribute.stride as i32,
                        attribute.offset as i32,
                    );
                }
            }
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        if let Err(error) = self.check("create_vertex_array") {
            unsafe { self.gl.delete_vertex_array(vertex_array) };
            return Err(error);
        }

        let id = self.allocate_id();
        self.vertex_arrays.insert(id, vertex_array);
        Ok(VertexArrayId(id))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) -> Result<()> {
        let gl_vertex_array = self
            .vertex_arrays
            .remove(&vertex_array.0)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", vertex_array)))?;
        unsafe { self.gl.delete_vertex_array(gl_vertex_array) };
        self.check("delete_vertex_array")
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) -> Result<()> {
        let gl_vertex_array = match vertex_array {
            Some(id) => Some(
                self.vertex_arrays
                    .get(&id.0)
                    .copied()
                    .ok_or_else(|| Error::InvalidResource(format!("Unknown {}", id)))?,
            ),
            None => None,
        };
        unsafe { self.gl.bind_vertex_array(gl_vertex_array) };
        self.check("bind_vertex_array")
    }

    // ===== SHADERS =====

    fn create_shader_module(&mut self, stage: ShaderStage, source: &str) -> Result<(ShaderModuleId, BuildLog)> {
        let shader = unsafe { self.gl.create_shader(opengl_format::shader_stage(stage)) }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create {:?} shader: {}", stage, message))
            )
        })?;

        let log = unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            BuildLog {
                success: self.gl.get_shader_compile_status(shader),
                log: self.gl.get_shader_info_log(shader),
            }
        };
        if let Err(error) = self.check("create_shader_module") {
            unsafe { self.gl.delete_shader(shader) };
            return Err(error);
        }

        let id = self.allocate_id();
        self.shader_modules.insert(id, shader);
        Ok((ShaderModuleId(id), log))
    }

    fn delete_shader_module(&mut self, module: ShaderModuleId) -> Result<()> {
        let shader = self.shader_module(module)?;
        self.shader_modules.remove(&module.0);
        unsafe { self.gl.delete_shader(shader) };
        self.check("delete_shader_module")
    }

    fn create_program(&mut self, modules: &[ShaderModuleId]) -> Result<(ProgramId, BuildLog)> {
        let shaders = modules
            .iter()
            .map(|module| self.shader_module(*module))
            .collect::<Result<Vec<_>>>()?;
        let program = unsafe { self.gl.create_program() }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create program: {}", message))
            )
        })?;

        let log = unsafe {
            for shader in &shaders {
                self.gl.attach_shader(program, *shader);
            }
            self.gl.link_program(program);
            BuildLog {
                success: self.gl.get_program_link_status(program),
                log: self.gl.get_program_info_log(program),
            }
        };
        if let Err(error) = self.check("create_program") {
            unsafe { self.gl.delete_program(program) };
            return Err(error);
        }

        let id = self.allocate_id();
        self.programs.insert(id, program);
        Ok((ProgramId(id), log))
    }

    fn delete_program(&mut self, program: ProgramId, modules: &[ShaderModuleId]) -> Result<()> {
        let gl_program = self.program(program)?;
        unsafe {
            for module in modules {
                if let Some(shader) = self.shader_modules.get(&module.0) {
                    self.gl.detach_shader(gl_program, *shader);
                }
            }
            self.gl.delete_program(gl_program);
        }
        self.programs.remove(&program.0);
        self.uniforms.retain(|_, uniform| uniform.program != program.0);
        self.check("delete_program")
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> Result<()> {
        let gl_program = program.map(|program| self.program(program)).transpose()?;
        unsafe { self.gl.use_program(gl_program) };
        self.check("use_program")
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<Option<UniformLocation>> {
        let gl_program = self.program(program)?;
        let location = unsafe { self.gl.get_uniform_location(gl_program, name) };
        self.check("uniform_location")?;

        Ok(location.map(|location| {
            let handle = self.next_location;
            self.next_location += 1;
            self.uniforms.insert(handle, GlUniform { program: program.0, location });
            UniformLocation(handle)
        }))
    }

    fn set_uniform(&mut self, location: UniformLocation, data: UniformData) -> Result<()> {
        let uniform = self
            .uniforms
            .get(&location.0)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown uniform location {}", location.0)))?;
        let gl_location = Some(&uniform.location);

        unsafe {
            match data {
                UniformData::Int(value) => self.gl.uniform_1_i32(gl_location, value),
                UniformData::Float(value) => self.gl.uniform_1_f32(gl_location, value),
                UniformData::Vector2(value) => self.gl.uniform_2_f32(gl_location, value.x, value.y),
                UniformData::Vector3(value) => self.gl.uniform_3_f32(gl_location, value.x, value.y, value.z),
                UniformData::Vector4(value) => {
                    self.gl.uniform_4_f32(gl_location, value.x, value.y, value.z, value.w)
                }
                UniformData::Matrix4(value) => {
                    self.gl.uniform_matrix_4_f32_slice(gl_location, false, &value.to_cols_array())
                }
            }
        }
        self.check("set_uniform")
    }

    // ===== FRAME BUFFERS =====

    fn create_frame_buffer(&mut self) -> Result<FrameBufferId> {
        let frame_buffer = unsafe { self.gl.create_framebuffer() }.map_err(|message| {
            prism_3d_engine::engine_err!(
                SOURCE,
                Error::BackendError(format!("Cannot create frame buffer: {}", message))
            )
        })?;

        let id = self.allocate_id();
        self.frame_buffers.insert(id, frame_buffer);
        Ok(FrameBufferId(id))
    }

    fn attach_image(&mut self, frame_buffer: FrameBufferId, slot: FrameBufferSlot, image: AttachedImage) -> Result<()> {
        let gl_frame_buffer = self.frame_buffer(frame_buffer)?;
        let gl_texture = self.texture(image.texture)?;
        let attachment = opengl_format::frame_buffer_attachment(slot);

        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(gl_frame_buffer));
            match image.target {
                TextureImageTarget::Layer(layer) => self.gl.framebuffer_texture_layer(
                    glow::FRAMEBUFFER,
                    attachment,
                    Some(gl_texture.texture),
                    0,
                    layer as i32,
                ),
                target => self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    opengl_format::image_target(target),
                    Some(gl_texture.texture),
                    0,
                ),
            }
        }
        self.check("attach_image")
    }

    fn frame_buffer_status(&mut self, frame_buffer: FrameBufferId) -> Result<FrameBufferStatus> {
        let gl_frame_buffer = self.frame_buffer(frame_buffer)?;
        let status = unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(gl_frame_buffer));
            self.gl.check_framebuffer_status(glow::FRAMEBUFFER)
        };
        self.check("frame_buffer_status")?;

        Ok(match status {
            glow::FRAMEBUFFER_COMPLETE => FrameBufferStatus::Complete,
            status => FrameBufferStatus::Incomplete(opengl_format::frame_buffer_status_name(status).to_string()),
        })
    }

    fn set_draw_buffers(&mut self, frame_buffer: FrameBufferId, slots: &[FrameBufferSlot]) -> Result<()> {
        let gl_frame_buffer = self.frame_buffer(frame_buffer)?;
        let attachments: Vec<u32> = slots.iter().map(|slot| opengl_format::frame_buffer_attachment(*slot)).collect();

        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(gl_frame_buffer));
            if attachments.is_empty() {
                // Depth-only target
                self.gl.draw_buffer(glow::NONE);
                self.gl.read_buffer(glow::NONE);
            } else {
                self.gl.draw_buffers(&attachments);
            }
        }
        self.check("set_draw_buffers")
    }

    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferId>) -> Result<()> {
        let gl_frame_buffer = frame_buffer.map(|id| self.frame_buffer(id)).transpose()?;
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, gl_frame_buffer) };
        self.check("bind_frame_buffer")
    }

    fn delete_frame_buffer(&mut self, frame_buffer: FrameBufferId) -> Result<()> {
        let gl_frame_buffer = self.frame_buffer(frame_buffer)?;
        self.frame_buffers.remove(&frame_buffer.0);
        unsafe { self.gl.delete_framebuffer(gl_frame_buffer) };
        self.check("delete_frame_buffer")
    }

    // ===== STATE & DRAWING =====

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        unsafe {
            self.gl.viewport(viewport.x, viewport.y, viewport.width as i32, viewport.height as i32);
        }
        self.check("set_viewport")
    }

    fn set_blend_mode(&mut self, mode: Option<BlendMode>) -> Result<()> {
        unsafe {
            match mode {
                Some(mode) => {
                    self.gl.enable(glow::BLEND);
                    self.gl.blend_equation(opengl_format::blend_function(mode.function));
                    self.gl.blend_func(
                        opengl_format::blend_factor(mode.source_factor),
                        opengl_format::blend_factor(mode.destination_factor),
                    );
                }
                None => self.gl.disable(glow::BLEND),
            }
        }
        self.check("set_blend_mode")
    }

    fn set_depth_state(&mut self, test: bool, write: bool) -> Result<()> {
        unsafe {
            if test {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
            self.gl.depth_mask(write);
        }
        self.check("set_depth_state")
    }

    fn set_cull_mode(&mut self, mode: CullMode) -> Result<()> {
        unsafe {
            match mode {
                CullMode::None => self.gl.disable(glow::CULL_FACE),
                CullMode::CounterClockwise => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.front_face(glow::CCW);
                }
                CullMode::Clockwise => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.front_face(glow::CW);
                }
            }
        }
        self.check("set_cull_mode")
    }

    fn clear(&mut self, color: Vec4, buffers: ClearBuffers) -> Result<()> {
        let mut mask = 0;
        if buffers.contains(ClearBuffers::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if buffers.contains(ClearBuffers::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe {
            self.gl.clear_color(color.x, color.y, color.z, color.w);
            self.gl.clear(mask);
        }
        self.check("clear")
    }

    fn draw_indexed(&mut self, primitive: PrimitiveType, index_count: u32, index_type: IndexType) -> Result<()> {
        unsafe {
            self.gl.draw_elements(
                opengl_format::primitive_type(primitive),
                index_count as i32,
                opengl_format::index_type(index_type),
                0,
            );
        }
        self.check("draw_indexed")
    }
}

impl Drop for OpenGlDevice {
    fn drop(&mut self) {
        let leaked = self.live_object_count();
        if leaked == 0 {
            return;
        }
        prism_3d_engine::engine_warn!(SOURCE, "Releasing {} GL objects left alive at device drop", leaked);

        unsafe {
            for (_, frame_buffer) in self.frame_buffers.drain() {
                self.gl.delete_framebuffer(frame_buffer);
            }
            for (_, program) in self.programs.drain() {
                self.gl.delete_program(program);
            }
            for (_, shader) in self.shader_modules.drain() {
                self.gl.delete_shader(shader);
            }
            for (_, vertex_array) in self.vertex_arrays.drain() {
                self.gl.delete_vertex_array(vertex_array);
            }
            for (_, buffer) in self.buffers.drain() {
                self.gl.delete_buffer(buffer);
            }
            for (_, texture) in self.textures.drain() {
                self.gl.delete_texture(texture.texture);
            }
        }
    }
}
