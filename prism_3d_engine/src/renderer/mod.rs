/// Renderer module - the renderer, GPU mirrors of resources and render targets

pub mod renderer;
pub mod renderer_object;
pub mod render_target;

pub use renderer::{Renderer, RendererConfig, RendererStatistics};
pub(crate) use renderer::RendererShared;
pub use renderer_object::*;
pub use render_target::*;
