/// GraphicsDevice trait - the seam between the renderer and a graphics API
///
/// The renderer owns exactly one device and drives it from the thread that
/// owns the graphics context. Every object created through a device is
/// identified by an opaque id; ids are never interpreted by the renderer.

use std::fmt;
use glam::Vec4;
use crate::error::Result;
use crate::graphics_device::{
    AttachedImage, BlendMode, BufferKind, BuildLog, ClearBuffers, CullMode, FrameBufferSlot,
    FrameBufferStatus, IndexType, PixelFormat, PrimitiveType, ShaderStage, TextureDesc,
    TextureImageTarget, TextureKind, UniformData, UniformLocation, VertexAttributeBinding,
    Viewport,
};

macro_rules! device_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

device_id!(
    /// Texture object
    TextureId
);
device_id!(
    /// Vertex or index buffer object
    BufferId
);
device_id!(
    /// Vertex array object (attribute layout + bound buffers)
    VertexArrayId
);
device_id!(
    /// Linked shader program
    ProgramId
);
device_id!(
    /// Compiled shader module
    ShaderModuleId
);
device_id!(
    /// Frame buffer object
    FrameBufferId
);

/// Identification strings reported by the driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

/// Hardware limits the renderer validates against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Number of texture units usable by one program
    pub max_texture_units: u32,
}

/// Graphics API backend
///
/// Implemented by `NullGraphicsDevice` (no GPU) and by backend crates
/// such as `prism_3d_engine_renderer_opengl`.
pub trait GraphicsDevice: Send {
    // ===== DEVICE =====

    /// Driver identification
    fn info(&self) -> DeviceInfo;

    /// Hardware limits
    fn capabilities(&self) -> Result<Capabilities>;

    /// Check the driver error flag after every call
    fn set_error_checking(&mut self, _enabled: bool) {}

    // ===== TEXTURES =====

    /// Create and fill a texture object
    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId>;

    fn delete_texture(&mut self, texture: TextureId) -> Result<()>;

    /// Read back one image of a texture as tightly packed pixels
    fn read_texture_pixels(
        &mut self,
        texture: TextureId,
        target: TextureImageTarget,
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>>;

    /// Bind a texture (or nothing) to a texture unit
    fn bind_texture(&mut self, unit: u32, kind: TextureKind, texture: Option<TextureId>) -> Result<()>;

    fn generate_mipmaps(&mut self, texture: TextureId, kind: TextureKind) -> Result<()>;

    // ===== BUFFERS =====

    /// Create a static buffer holding `data`
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferId>;

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<()>;

    /// Create a vertex array describing `attributes` over the given buffers
    fn create_vertex_array(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        attributes: &[VertexAttributeBinding],
    ) -> Result<VertexArrayId>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) -> Result<()>;

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) -> Result<()>;

    // ===== SHADERS =====

    /// Compile one module; the id is returned even when compilation fails
    fn create_shader_module(&mut self, stage: ShaderStage, source: &str) -> Result<(ShaderModuleId, BuildLog)>;

    fn delete_shader_module(&mut self, module: ShaderModuleId) -> Result<()>;

    /// Create a program and link `modules` into it; the id is returned even
    /// when linking fails
    fn create_program(&mut self, modules: &[ShaderModuleId]) -> Result<(ProgramId, BuildLog)>;

    /// Detach `modules` and delete the program
    fn delete_program(&mut self, program: ProgramId, modules: &[ShaderModuleId]) -> Result<()>;

    fn use_program(&mut self, program: Option<ProgramId>) -> Result<()>;

    /// Location of a uniform, `None` when the linker removed it
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<Option<UniformLocation>>;

    /// Set a uniform of the program currently in use
    fn set_uniform(&mut self, location: UniformLocation, data: UniformData) -> Result<()>;

    // ===== FRAME BUFFERS =====

    fn create_frame_buffer(&mut self) -> Result<FrameBufferId>;

    fn attach_image(&mut self, frame_buffer: FrameBufferId, slot: FrameBufferSlot, image: AttachedImage) -> Result<()>;

    fn frame_buffer_status(&mut self, frame_buffer: FrameBufferId) -> Result<FrameBufferStatus>;

    /// Route fragment outputs to the given color slots, in order
    fn set_draw_buffers(&mut self, frame_buffer: FrameBufferId, slots: &[FrameBufferSlot]) -> Result<()>;

    /// Bind a frame buffer, `None` for the window
    fn bind_frame_buffer(&mut self, frame_buffer: Option<FrameBufferId>) -> Result<()>;

    fn delete_frame_buffer(&mut self, frame_buffer: FrameBufferId) -> Result<()>;

    // ===== STATE & DRAWING =====

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Enable blending with `mode`, or disable it with `None`
    fn set_blend_mode(&mut self, mode: Option<BlendMode>) -> Result<()>;

    fn set_depth_state(&mut self, test: bool, write: bool) -> Result<()>;

    fn set_cull_mode(&mut self, mode: CullMode) -> Result<()>;

    fn clear(&mut self, color: Vec4, buffers: ClearBuffers) -> Result<()>;

    /// Draw with the bound vertex array
    fn draw_indexed(&mut self, primitive: PrimitiveType, index_count: u32, index_type: IndexType) -> Result<()>;
}
