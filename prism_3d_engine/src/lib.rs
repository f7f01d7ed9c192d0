/*!
# Prism 3D Engine

Core types of the Prism 3D renderer: CPU-side resources and the renderer
that mirrors them on the GPU.

Every resource (texture, mesh, shader, frame buffer) is plain CPU data plus
an optional GPU mirror. The renderer uploads a resource lazily the first
time it is bound, destroys the mirror when a setter invalidates it, and
releases everything it created on shutdown.

## Architecture

- **Renderer**: uploads, binds and draws resources through a `GraphicsDevice`
- **GraphicsDevice**: backend seam (OpenGL lives in `prism_3d_engine_renderer_opengl`)
- **NullGraphicsDevice**: backend that records calls, for tests and headless runs
- **RenderTarget**: `Window` or `FrameBuffer`, bound by double dispatch
- **Resources**: `Texture2`, `Texture3`, `TextureCube`, `Mesh`, `Shader`, `FrameBuffer`
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod renderer;
pub mod resource;

// Main prism3d namespace module
pub mod prism3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer handle and configuration
    pub use crate::renderer::{Renderer, RendererConfig, RendererStatistics};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend seam and its vocabulary
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Renderer, GPU mirrors and render targets
    pub mod render {
        pub use crate::renderer::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
