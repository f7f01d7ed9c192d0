//! CPU-side pixel storage.

use crate::error::{Error, Result};
use crate::graphics_device::{ColorSpace, PixelFormat};

/// A 2D array of pixels in a given format
///
/// Pixel rows are tightly packed, bottom row first (the GPU convention).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    color_space: ColorSpace,
    pixel_data: Vec<u8>,
}

impl Image {
    /// Create an image with zeroed pixels
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let size = width as usize * height as usize * pixel_format.size();
        Self {
            width,
            height,
            pixel_format,
            color_space: ColorSpace::default(),
            pixel_data: vec![0; size],
        }
    }

    /// Create an image from existing pixels
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `pixel_data` does not hold exactly
    /// `width * height` pixels.
    pub fn from_pixels(
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        color_space: ColorSpace,
        pixel_data: Vec<u8>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * pixel_format.size();
        if pixel_data.len() != expected {
            return Err(Error::InvalidOperation(format!(
                "Image of {}x{} {:?} needs {} bytes, got {}",
                width,
                height,
                pixel_format,
                expected,
                pixel_data.len()
            )));
        }
        Ok(Self { width, height, pixel_format, color_space, pixel_data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn set_color_space(&mut self, color_space: ColorSpace) {
        self.color_space = color_space;
    }

    pub fn pixel_data(&self) -> &[u8] {
        &self.pixel_data
    }

    pub fn pixel_data_mut(&mut self) -> &mut [u8] {
        &mut self.pixel_data
    }

    /// Bytes of one pixel at (x, y), `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let size = self.pixel_format.size();
        let start = (y as usize * self.width as usize + x as usize) * size;
        self.pixel_data.get(start..start + size)
    }

    /// Whether this image can back a texture of the given size and format
    pub fn is_compatible(&self, width: u32, height: u32, pixel_format: PixelFormat) -> bool {
        self.width == width && self.height == height && self.pixel_format == pixel_format
    }
}
