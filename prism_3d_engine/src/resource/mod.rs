/// Resource module - CPU-side assets mirrored on the GPU by the renderer

pub mod image;
pub mod texture;
pub mod vertex_layout;
pub mod mesh;
pub mod uniform;
pub mod shader;
pub mod frame_buffer;

pub use image::*;
pub use texture::{SharedTexture2, SharedTexture3, SharedTextureCube, Texture2, Texture3, TextureCube};
pub(crate) use texture::TextureResource;
pub use vertex_layout::*;
pub use mesh::*;
pub use uniform::*;
pub use shader::*;
pub use frame_buffer::*;
