//! Texture resources: `Texture2`, `Texture3` and `TextureCube`.
//!
//! Each texture keeps a CPU-side image cache next to its GPU mirror:
//!
//! - uploading sends cached images (or uninitialized storage) to the GPU
//! - binding an attached texture as a render target invalidates the cache,
//!   making the GPU copy authoritative
//! - `image()` lazily downloads an invalidated image from the GPU
//!
//! Any setter on an uploaded texture destroys the GPU mirror first; the
//! next bind uploads it again. The GPU pixels are not read back, so content
//! rendered into an attached texture must be fetched with `image()` before
//! mutating it. Frame buffers holding the texture are rebuilt on their next
//! bind.

use std::sync::{Arc, Mutex};
use crate::error::Result;
use crate::graphics_device::{
    ColorSpace, CubeSide, PixelFormat, TextureDesc, TextureFilter, TextureImageTarget,
    TextureKind, TextureUsage,
};
use crate::renderer::{RendererObject, TextureData};
use crate::resource::Image;

const SOURCE: &str = "prism3d::Texture";

/// Texture shared between its owner, frame buffer attachments and uniform values
pub type SharedTexture2 = Arc<Mutex<Texture2>>;
/// Shared 3D texture
pub type SharedTexture3 = Arc<Mutex<Texture3>>;
/// Shared cube texture
pub type SharedTextureCube = Arc<Mutex<TextureCube>>;

// ============================================================================
// SHARED SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct TextureSettings {
    pixel_format: PixelFormat,
    color_space: ColorSpace,
    min_filter: TextureFilter,
    mag_filter: TextureFilter,
    mipmapped: bool,
    wrapped: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            color_space: ColorSpace::default(),
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            mipmapped: true,
            wrapped: false,
        }
    }
}

/// Getters and destroy-before-mutate setters common to every texture type
macro_rules! texture_settings_api {
    ($texture:ident, $destroy:ident) => {
        impl $texture {
            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn set_name(&mut self, name: impl Into<String>) {
                self.name = name.into();
            }

            pub fn width(&self) -> u32 {
                self.width
            }

            pub fn height(&self) -> u32 {
                self.height
            }

            pub fn pixel_format(&self) -> PixelFormat {
                self.settings.pixel_format
            }

            pub fn color_space(&self) -> ColorSpace {
                self.settings.color_space
            }

            pub fn min_filter(&self) -> TextureFilter {
                self.settings.min_filter
            }

            pub fn mag_filter(&self) -> TextureFilter {
                self.settings.mag_filter
            }

            pub fn is_mipmapped(&self) -> bool {
                self.settings.mipmapped
            }

            pub fn is_wrapped(&self) -> bool {
                self.settings.wrapped
            }

            pub fn is_uploaded(&self) -> bool {
                self.object.is_uploaded()
            }

            /// GPU mirror of the texture
            pub fn object(&self) -> &RendererObject<TextureData> {
                &self.object
            }

            /// Builder-style pixel format
            pub fn with_pixel_format(mut self, pixel_format: PixelFormat) -> Self {
                self.set_pixel_format(pixel_format);
                self
            }

            /// Change the pixel format; cached images are discarded
            pub fn set_pixel_format(&mut self, pixel_format: PixelFormat) {
                if pixel_format != self.settings.pixel_format {
                    self.destroy_before_mutation();
                    self.settings.pixel_format = pixel_format;
                    self.clear_local_images();
                }
            }

            pub fn set_color_space(&mut self, color_space: ColorSpace) {
                self.destroy_before_mutation();
                self.settings.color_space = color_space;
            }

            pub fn set_min_filter(&mut self, filter: TextureFilter) {
                self.destroy_before_mutation();
                self.settings.min_filter = filter;
            }

            pub fn set_mag_filter(&mut self, filter: TextureFilter) {
                self.destroy_before_mutation();
                self.settings.mag_filter = filter;
            }

            pub fn set_mipmapped(&mut self, mipmapped: bool) {
                self.destroy_before_mutation();
                self.settings.mipmapped = mipmapped;
            }

            /// Repeat (true) or clamp to edge (false)
            pub fn set_wrapped(&mut self, wrapped: bool) {
                self.destroy_before_mutation();
                self.settings.wrapped = wrapped;
            }

            /// Drop the CPU-side image cache so the next `image()` call reads
            /// the GPU copy back
            ///
            /// # Errors
            ///
            /// `InvalidOperation` if the texture is not uploaded (the cache
            /// would be the only copy of the pixels).
            pub fn invalidate_local_images(&mut self) -> Result<()> {
                if !self.object.is_uploaded() {
                    crate::engine_bail!(
                        SOURCE,
                        "Cannot invalidate the local images of texture '{}' which is not uploaded",
                        self.name
                    );
                }
                self.clear_local_images();
                Ok(())
            }

            /// Turn this texture into a shareable handle
            pub fn into_shared(self) -> Arc<Mutex<$texture>> {
                Arc::new(Mutex::new(self))
            }

            /// Release the GPU mirror ahead of a setter; frame buffers
            /// holding this texture re-attach the new upload on their next bind
            fn destroy_before_mutation(&mut self) {
                if let Some(renderer) = self.object.owner() {
                    if let Err(error) = renderer.$destroy(self, false) {
                        crate::engine_warn!(
                            SOURCE,
                            "Failed to destroy texture '{}' before mutation: {}",
                            self.name,
                            error
                        );
                        drop(self.object.set_as_destroyed());
                    }
                }
            }

            fn image_settings(&self) -> (u32, u32, PixelFormat, ColorSpace) {
                (self.width, self.height, self.settings.pixel_format, self.settings.color_space)
            }

            fn check_image(&self, image: &Image) -> Result<()> {
                if !image.is_compatible(self.width, self.height, self.settings.pixel_format) {
                    crate::engine_bail!(
                        SOURCE,
                        "Image of {}x{} {:?} is incompatible with texture '{}' ({}x{} {:?})",
                        image.width(),
                        image.height(),
                        image.pixel_format(),
                        self.name,
                        self.width,
                        self.height,
                        self.settings.pixel_format
                    );
                }
                Ok(())
            }

            fn describe_with<'a>(
                &'a self,
                kind: TextureKind,
                usage: TextureUsage,
                depth: u32,
                layers: Vec<Option<&'a [u8]>>,
            ) -> TextureDesc<'a> {
                TextureDesc {
                    label: &self.name,
                    kind,
                    usage,
                    width: self.width,
                    height: self.height,
                    depth,
                    pixel_format: self.settings.pixel_format,
                    color_space: self.settings.color_space,
                    min_filter: self.settings.min_filter,
                    mag_filter: self.settings.mag_filter,
                    mipmapped: self.settings.mipmapped,
                    wrapped: self.settings.wrapped,
                    layers,
                }
            }
        }
    };
}

/// Renderer-facing view shared by the three texture types
pub(crate) trait TextureResource {
    fn texture_name(&self) -> &str;
    fn texture_object(&self) -> &RendererObject<TextureData>;
    fn texture_object_mut(&mut self) -> &mut RendererObject<TextureData>;
    fn texture_mipmapped(&self) -> bool;
    /// Width, height, pixel format and color space of every image
    fn image_layout(&self) -> (u32, u32, PixelFormat, ColorSpace);
    fn describe(&self, usage: TextureUsage) -> TextureDesc<'_>;
    /// Images with no CPU-side copy
    fn missing_images(&self) -> Vec<TextureImageTarget>;
    fn store_image(&mut self, target: TextureImageTarget, image: Image);
    fn clear_local_images(&mut self);
}

// ============================================================================
// TEXTURE2
// ============================================================================

/// Two-dimensional texture
#[derive(Debug, Clone)]
pub struct Texture2 {
    name: String,
    width: u32,
    height: u32,
    settings: TextureSettings,
    image: Option<Image>,
    object: RendererObject<TextureData>,
}

texture_settings_api!(Texture2, destroy_texture2);

impl Texture2 {
    /// Create a texture with no image; its GPU storage is left uninitialized
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            settings: TextureSettings::default(),
            image: None,
            object: RendererObject::new(),
        }
    }

    /// Create a texture sized and formatted after `image`
    pub fn from_image(name: impl Into<String>, image: Image) -> Self {
        let mut texture = Self::new(name, image.width(), image.height());
        texture.settings.pixel_format = image.pixel_format();
        texture.settings.color_space = image.color_space();
        texture.image = Some(image);
        texture
    }

    /// Pixels of the texture
    ///
    /// Reads the GPU copy back when the local cache was invalidated; a
    /// texture that was never given pixels yields a zeroed image.
    pub fn image(&mut self) -> Result<&Image> {
        let image = match self.image.take() {
            Some(image) => image,
            None if self.object.is_uploaded() => self.object.renderer()?.download_texture2_image(self)?,
            None => Image::new(self.width, self.height, self.settings.pixel_format),
        };
        let image: &Image = self.image.insert(image);
        Ok(image)
    }

    /// Replace the pixels of the texture
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the image size or pixel format differs from the texture's.
    pub fn set_image(&mut self, image: Image) -> Result<()> {
        self.check_image(&image)?;
        self.destroy_before_mutation();
        self.image = Some(image);
        Ok(())
    }

    /// Whether a CPU-side copy of the pixels is cached
    pub fn has_local_image(&self) -> bool {
        self.image.is_some()
    }
}

impl TextureResource for Texture2 {
    fn texture_name(&self) -> &str {
        &self.name
    }

    fn texture_object(&self) -> &RendererObject<TextureData> {
        &self.object
    }

    fn texture_object_mut(&mut self) -> &mut RendererObject<TextureData> {
        &mut self.object
    }

    fn texture_mipmapped(&self) -> bool {
        self.settings.mipmapped
    }

    fn image_layout(&self) -> (u32, u32, PixelFormat, ColorSpace) {
        self.image_settings()
    }

    fn describe(&self, usage: TextureUsage) -> TextureDesc<'_> {
        let pixels = self.image.as_ref().map(Image::pixel_data);
        self.describe_with(TextureKind::Texture2, usage, 1, vec![pixels])
    }

    fn missing_images(&self) -> Vec<TextureImageTarget> {
        if self.image.is_some() {
            Vec::new()
        } else {
            vec![TextureImageTarget::Texture2]
        }
    }

    fn store_image(&mut self, _target: TextureImageTarget, image: Image) {
        self.image = Some(image);
    }

    fn clear_local_images(&mut self) {
        self.image = None;
    }
}

// ============================================================================
// TEXTURE3
// ============================================================================

/// Three-dimensional texture made of `depth` layers
#[derive(Debug, Clone)]
pub struct Texture3 {
    name: String,
    width: u32,
    height: u32,
    depth: u32,
    settings: TextureSettings,
    images: Vec<Option<Image>>,
    object: RendererObject<TextureData>,
}

texture_settings_api!(Texture3, destroy_texture3);

impl Texture3 {
    pub fn new(name: impl Into<String>, width: u32, height: u32, depth: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            depth,
            settings: TextureSettings::default(),
            images: vec![None; depth as usize],
            object: RendererObject::new(),
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn check_layer(&self, layer: u32) -> Result<usize> {
        if layer >= self.depth {
            crate::engine_bail!(
                SOURCE,
                "Layer {} is out of range for texture '{}' of depth {}",
                layer,
                self.name,
                self.depth
            );
        }
        Ok(layer as usize)
    }

    /// Pixels of one layer, downloaded from the GPU when not cached
    pub fn image(&mut self, layer: u32) -> Result<&Image> {
        let index = self.check_layer(layer)?;
        let image = match self.images[index].take() {
            Some(image) => image,
            None if self.object.is_uploaded() => {
                self.object.renderer()?.download_texture3_image(self, layer)?
            }
            None => Image::new(self.width, self.height, self.settings.pixel_format),
        };
        let image: &Image = self.images[index].insert(image);
        Ok(image)
    }

    /// Replace the pixels of one layer
    pub fn set_image(&mut self, layer: u32, image: Image) -> Result<()> {
        let index = self.check_layer(layer)?;
        self.check_image(&image)?;
        self.destroy_before_mutation();
        self.images[index] = Some(image);
        Ok(())
    }
}

impl TextureResource for Texture3 {
    fn texture_name(&self) -> &str {
        &self.name
    }

    fn texture_object(&self) -> &RendererObject<TextureData> {
        &self.object
    }

    fn texture_object_mut(&mut self) -> &mut RendererObject<TextureData> {
        &mut self.object
    }

    fn texture_mipmapped(&self) -> bool {
        self.settings.mipmapped
    }

    fn image_layout(&self) -> (u32, u32, PixelFormat, ColorSpace) {
        self.image_settings()
    }

    fn describe(&self, usage: TextureUsage) -> TextureDesc<'_> {
        let layers = self
            .images
            .iter()
            .map(|image| image.as_ref().map(Image::pixel_data))
            .collect();
        self.describe_with(TextureKind::Texture3, usage, self.depth, layers)
    }

    fn missing_images(&self) -> Vec<TextureImageTarget> {
        (0..self.depth)
            .filter(|layer| self.images[*layer as usize].is_none())
            .map(TextureImageTarget::Layer)
            .collect()
    }

    fn store_image(&mut self, target: TextureImageTarget, image: Image) {
        if let TextureImageTarget::Layer(layer) = target {
            if let Some(slot) = self.images.get_mut(layer as usize) {
                *slot = Some(image);
            }
        }
    }

    fn clear_local_images(&mut self) {
        self.images.iter_mut().for_each(|image| *image = None);
    }
}

// ============================================================================
// TEXTURE CUBE
// ============================================================================

/// Cube texture made of six square-ish sides
#[derive(Debug, Clone)]
pub struct TextureCube {
    name: String,
    width: u32,
    height: u32,
    settings: TextureSettings,
    images: Vec<Option<Image>>,
    object: RendererObject<TextureData>,
}

texture_settings_api!(TextureCube, destroy_texture_cube);

impl TextureCube {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            settings: TextureSettings::default(),
            images: vec![None; CubeSide::ALL.len()],
            object: RendererObject::new(),
        }
    }

    /// Pixels of one side, downloaded from the GPU when not cached
    pub fn image(&mut self, side: CubeSide) -> Result<&Image> {
        let index = side.index();
        let image = match self.images[index].take() {
            Some(image) => image,
            None if self.object.is_uploaded() => {
                self.object.renderer()?.download_texture_cube_image(self, side)?
            }
            None => Image::new(self.width, self.height, self.settings.pixel_format),
        };
        let image: &Image = self.images[index].insert(image);
        Ok(image)
    }

    /// Replace the pixels of one side
    pub fn set_image(&mut self, side: CubeSide, image: Image) -> Result<()> {
        self.check_image(&image)?;
        self.destroy_before_mutation();
        self.images[side.index()] = Some(image);
        Ok(())
    }
}

impl TextureResource for TextureCube {
    fn texture_name(&self) -> &str {
        &self.name
    }

    fn texture_object(&self) -> &RendererObject<TextureData> {
        &self.object
    }

    fn texture_object_mut(&mut self) -> &mut RendererObject<TextureData> {
        &mut self.object
    }

    fn texture_mipmapped(&self) -> bool {
        self.settings.mipmapped
    }

    fn image_layout(&self) -> (u32, u32, PixelFormat, ColorSpace) {
        self.image_settings()
    }

    fn describe(&self, usage: TextureUsage) -> TextureDesc<'_> {
        let layers = self
            .images
            .iter()
            .map(|image| image.as_ref().map(Image::pixel_data))
            .collect();
        self.describe_with(TextureKind::Cube, usage, 1, layers)
    }

    fn missing_images(&self) -> Vec<TextureImageTarget> {
        CubeSide::ALL
            .iter()
            .filter(|side| self.images[side.index()].is_none())
            .map(|side| TextureImageTarget::CubeSide(*side))
            .collect()
    }

    fn store_image(&mut self, target: TextureImageTarget, image: Image) {
        if let TextureImageTarget::CubeSide(side) = target {
            self.images[side.index()] = Some(image);
        }
    }

    fn clear_local_images(&mut self) {
        self.images.iter_mut().for_each(|image| *image = None);
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
