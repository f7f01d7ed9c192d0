/*!
# Prism 3D Engine - OpenGL Backend

OpenGL implementation of the Prism 3D `GraphicsDevice` seam, built on the
glow bindings.

The crate does not create contexts: bring a `glow::Context` that is current
on the calling thread, wrap it in an [`OpenGlDevice`], and hand the device
to the renderer.

```no_run
use prism_3d_engine::prism3d::{Renderer, RendererConfig};
use prism_3d_engine_renderer_opengl::{OpenGlDevice, OpenGlDeviceConfig};

# fn run(gl: glow::Context) -> prism_3d_engine::prism3d::Result<()> {
let device = OpenGlDevice::new(gl, OpenGlDeviceConfig::default())?;
let renderer = Renderer::new(device, RendererConfig::default())?;
# Ok(())
# }
```

Driver errors picked up by `glGetError` are counted process-wide; see
[`gl_error_stats`] and [`print_gl_error_report`].
*/

mod opengl_device;
mod opengl_format;
mod debug;

pub use opengl_device::{OpenGlDevice, OpenGlDeviceConfig};

// Re-export debug utilities
pub use debug::{gl_error_stats, print_gl_error_report, reset_gl_error_stats, GlErrorStats};
