//! Off-screen render target made of texture attachments.
//!
//! A frame buffer references its textures without owning them. Each slot
//! (Color0..Color15, Depth) holds at most one attachment, and every attached
//! texture must match the frame buffer's size. Only single-channel 2D
//! textures can back the Depth slot.
//!
//! Attaching to an uploaded frame buffer destroys its GPU object; the next
//! bind builds a fresh one. Dropping a texture that is still attached
//! leaves a dangling attachment, which fails the next upload with
//! `InvalidResource`.
//!
//! Mutating an attached texture (any of its setters) destroys the texture's
//! GPU copy while the frame buffer stays uploaded. The next bind notices the
//! attachment is gone and rebuilds the frame buffer around a fresh upload of
//! the texture. Pixels rendered into the old copy are lost unless they were
//! read back with `image()` before the mutation.

use std::sync::{Arc, Mutex, Weak};
use crate::error::{Error, Result};
use crate::graphics_device::{CubeSide, FrameBufferSlot, PixelFormat};
use crate::renderer::{FrameBufferData, RenderTarget, Renderer, RendererObject};
use crate::resource::{SharedTexture2, SharedTexture3, SharedTextureCube, Texture2, Texture3, TextureCube};

const SOURCE: &str = "prism3d::FrameBuffer";

/// What an attachment refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Texture2,
    Texture3Layer,
    CubeSide,
}

/// Non-owning reference to the attached texture image
#[derive(Debug, Clone)]
pub enum AttachedTexture {
    Texture2(Weak<Mutex<Texture2>>),
    Texture3 { texture: Weak<Mutex<Texture3>>, layer: u32 },
    TextureCube { texture: Weak<Mutex<TextureCube>>, side: CubeSide },
}

/// Binding of one texture image to one slot
#[derive(Debug, Clone)]
pub struct FrameBufferAttachment {
    slot: FrameBufferSlot,
    texture: AttachedTexture,
}

impl FrameBufferAttachment {
    pub fn slot(&self) -> FrameBufferSlot {
        self.slot
    }

    pub fn kind(&self) -> AttachmentKind {
        match self.texture {
            AttachedTexture::Texture2(_) => AttachmentKind::Texture2,
            AttachedTexture::Texture3 { .. } => AttachmentKind::Texture3Layer,
            AttachedTexture::TextureCube { .. } => AttachmentKind::CubeSide,
        }
    }

    /// Cube side, only for cube attachments
    pub fn side(&self) -> Option<CubeSide> {
        match self.texture {
            AttachedTexture::TextureCube { side, .. } => Some(side),
            _ => None,
        }
    }

    /// Layer, only for 3D texture attachments
    pub fn layer(&self) -> Option<u32> {
        match self.texture {
            AttachedTexture::Texture3 { layer, .. } => Some(layer),
            _ => None,
        }
    }

    pub fn texture(&self) -> &AttachedTexture {
        &self.texture
    }

    /// Whether the attached texture has been dropped
    pub fn is_dangling(&self) -> bool {
        match &self.texture {
            AttachedTexture::Texture2(texture) => texture.strong_count() == 0,
            AttachedTexture::Texture3 { texture, .. } => texture.strong_count() == 0,
            AttachedTexture::TextureCube { texture, .. } => texture.strong_count() == 0,
        }
    }
}

/// Attachable properties read from a texture before validation
struct Candidate<'a> {
    name: &'a str,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    kind: AttachmentKind,
}

/// Off-screen render target
///
/// Binding it re-validates the attachments: a texture that lost its GPU copy
/// since the last bind makes the renderer recreate the frame buffer.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    name: String,
    width: u32,
    height: u32,
    attachments: Vec<FrameBufferAttachment>,
    object: RendererObject<FrameBufferData>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_name("<unnamed>", width, height)
    }

    pub fn with_name(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            attachments: Vec::new(),
            object: RendererObject::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_uploaded(&self) -> bool {
        self.object.is_uploaded()
    }

    /// GPU mirror of the frame buffer
    pub fn object(&self) -> &RendererObject<FrameBufferData> {
        &self.object
    }

    pub(crate) fn object_mut(&mut self) -> &mut RendererObject<FrameBufferData> {
        &mut self.object
    }

    /// Attachments in insertion order
    pub fn attachments(&self) -> &[FrameBufferAttachment] {
        &self.attachments
    }

    pub fn attachment(&self, slot: FrameBufferSlot) -> Option<&FrameBufferAttachment> {
        self.attachments.iter().find(|attachment| attachment.slot == slot)
    }

    /// Attach a 2D texture to `slot`
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the slot is occupied, the size differs from the
    /// frame buffer's, or a multi-channel texture targets the Depth slot.
    /// The attachment list is unchanged on error.
    pub fn attach(&mut self, slot: FrameBufferSlot, texture: &SharedTexture2) -> Result<()> {
        {
            let guard = lock_texture(texture)?;
            self.validate(slot, Candidate {
                name: guard.name(),
                width: guard.width(),
                height: guard.height(),
                pixel_format: guard.pixel_format(),
                kind: AttachmentKind::Texture2,
            })?;
        }
        self.push(slot, AttachedTexture::Texture2(Arc::downgrade(texture)));
        Ok(())
    }

    /// Attach one layer of a 3D texture to a color slot
    pub fn attach_layer(&mut self, slot: FrameBufferSlot, layer: u32, texture: &SharedTexture3) -> Result<()> {
        {
            let guard = lock_texture(texture)?;
            if layer >= guard.depth() {
                crate::engine_bail!(
                    SOURCE,
                    "Layer {} is out of range for texture '{}' of depth {}",
                    layer,
                    guard.name(),
                    guard.depth()
                );
            }
            self.validate(slot, Candidate {
                name: guard.name(),
                width: guard.width(),
                height: guard.height(),
                pixel_format: guard.pixel_format(),
                kind: AttachmentKind::Texture3Layer,
            })?;
        }
        self.push(slot, AttachedTexture::Texture3 { texture: Arc::downgrade(texture), layer });
        Ok(())
    }

    /// Attach one side of a cube texture to a color slot
    pub fn attach_side(&mut self, slot: FrameBufferSlot, side: CubeSide, texture: &SharedTextureCube) -> Result<()> {
        {
            let guard = lock_texture(texture)?;
            self.validate(slot, Candidate {
                name: guard.name(),
                width: guard.width(),
                height: guard.height(),
                pixel_format: guard.pixel_format(),
                kind: AttachmentKind::CubeSide,
            })?;
        }
        self.push(slot, AttachedTexture::TextureCube { texture: Arc::downgrade(texture), side });
        Ok(())
    }

    fn validate(&self, slot: FrameBufferSlot, candidate: Candidate<'_>) -> Result<()> {
        if let FrameBufferSlot::Color(index) = slot {
            if index >= FrameBufferSlot::MAX_COLOR_ATTACHMENTS {
                crate::engine_bail!(SOURCE, "Slot '{}' does not exist", slot);
            }
        }
        if self.attachment(slot).is_some() {
            crate::engine_bail!(
                SOURCE,
                "Slot '{}' of frame buffer '{}' is already occupied",
                slot,
                self.name
            );
        }
        if candidate.width != self.width || candidate.height != self.height {
            crate::engine_bail!(
                SOURCE,
                "Texture '{}' is {}x{} but frame buffer '{}' is {}x{}",
                candidate.name,
                candidate.width,
                candidate.height,
                self.name,
                self.width,
                self.height
            );
        }
        if slot.is_depth() {
            if candidate.kind != AttachmentKind::Texture2 {
                crate::engine_bail!(
                    SOURCE,
                    "Texture '{}' cannot back a depth attachment ({:?})",
                    candidate.name,
                    candidate.kind
                );
            }
            if !candidate.pixel_format.is_depth_compatible() {
                crate::engine_bail!(
                    SOURCE,
                    "Texture '{}' has {} channels; a depth attachment needs one",
                    candidate.name,
                    candidate.pixel_format.cardinality()
                );
            }
        }
        Ok(())
    }

    fn push(&mut self, slot: FrameBufferSlot, texture: AttachedTexture) {
        if let Some(renderer) = self.object.owner() {
            if let Err(error) = renderer.destroy_frame_buffer(self) {
                crate::engine_warn!(SOURCE, "Failed to destroy frame buffer '{}' before mutation: {}", self.name, error);
                drop(self.object.set_as_destroyed());
            }
        }
        self.attachments.push(FrameBufferAttachment { slot, texture });
    }
}

impl RenderTarget for FrameBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bind(&mut self, renderer: &Renderer) -> Result<()> {
        renderer.set_frame_buffer_target(self)
    }
}

fn lock_texture<T>(texture: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    texture
        .lock()
        .map_err(|_| Error::BackendError("Texture lock poisoned".to_string()))
}

#[cfg(test)]
#[path = "frame_buffer_tests.rs"]
mod tests;
