/// RenderTarget trait - a surface the renderer can draw into
///
/// Binding is dispatched by the target itself: a [`Window`] binds the
/// default frame buffer, a [`FrameBuffer`](crate::resource::FrameBuffer)
/// binds its own GPU object.

use crate::error::Result;
use crate::renderer::Renderer;

/// Render target trait
pub trait RenderTarget {
    /// Width of the target in pixels
    fn width(&self) -> u32;

    /// Height of the target in pixels
    fn height(&self) -> u32;

    /// Make this target the destination of subsequent draws
    fn bind(&mut self, renderer: &Renderer) -> Result<()>;
}

/// The window's default frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Window target sized after a winit window's client area
    pub fn from_winit(window: &winit::window::Window) -> Self {
        let size = window.inner_size();
        Self::new(size.width, size.height)
    }

    /// Track a window resize; the next bind applies the new viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl RenderTarget for Window {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bind(&mut self, renderer: &Renderer) -> Result<()> {
        renderer.set_window_target(self)
    }
}
