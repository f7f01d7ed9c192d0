/// Graphics device module - the backend seam and its vocabulary types

pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod frame_buffer;
pub mod null_graphics_device;

pub use graphics_device::*;
pub use texture::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use frame_buffer::*;
pub use null_graphics_device::{DeviceCommand, NullDeviceConfig, NullDeviceProbe, NullGraphicsDevice};
