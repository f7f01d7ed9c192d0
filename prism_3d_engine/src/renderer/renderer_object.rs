//! GPU mirror of a CPU-side resource.
//!
//! Every resource type (textures, meshes, shaders, frame buffers) embeds a
//! [`RendererObject`]. The object is empty until a [`Renderer`] uploads the
//! resource; the renderer then attaches a [`RendererData`] carrying the
//! backend payload (`TextureData`, `MeshData`, ...) and a key into its own
//! resource registry.
//!
//! `RendererData` is an RAII guard: dropping it while still armed asks the
//! owning renderer to release the registry entry, which deletes the GPU
//! objects. Explicit destruction disarms the guard first, so a resource is
//! never released twice.

use std::fmt;
use std::sync::{Arc, Weak};
use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferId, FrameBufferId, ProgramId, ShaderModuleId, TextureId, TextureKind, VertexArrayId,
};
use crate::renderer::{Renderer, RendererShared};

slotmap::new_key_type! {
    /// Key of an uploaded resource inside a renderer's registry
    pub struct ResourceKey;
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Backend payload of an uploaded texture (2D, 3D or cube)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureData {
    pub texture: TextureId,
    pub kind: TextureKind,
}

/// Backend payload of an uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshData {
    pub vertex_array: VertexArrayId,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
}

/// Backend payload of an uploaded shader: the program plus its compiled modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderData {
    pub program: ProgramId,
    pub modules: Vec<ShaderModuleId>,
}

/// Backend payload of an uploaded frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBufferData {
    pub frame_buffer: FrameBufferId,
}

// ============================================================================
// RENDERER DATA
// ============================================================================

/// Exclusively owned payload of an uploaded resource
pub struct RendererData<D> {
    payload: D,
    key: ResourceKey,
    renderer: Weak<RendererShared>,
    armed: bool,
}

impl<D> RendererData<D> {
    pub(crate) fn new(payload: D, key: ResourceKey, renderer: Weak<RendererShared>) -> Self {
        Self { payload, key, renderer, armed: true }
    }

    /// Backend payload
    pub fn payload(&self) -> &D {
        &self.payload
    }

    pub(crate) fn key(&self) -> ResourceKey {
        self.key
    }

    /// Disarm the guard and hand the registry key to the caller, who
    /// becomes responsible for releasing it
    pub(crate) fn into_key(mut self) -> ResourceKey {
        self.armed = false;
        self.key
    }

    fn live_renderer(&self) -> Option<Arc<RendererShared>> {
        self.renderer.upgrade().filter(|shared| shared.is_alive())
    }
}

impl<D> Drop for RendererData<D> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(shared) = self.live_renderer() {
            shared.release_dropped(self.key);
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for RendererData<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererData")
            .field("payload", &self.payload)
            .field("key", &self.key)
            .finish()
    }
}

// ============================================================================
// RENDERER OBJECT
// ============================================================================

/// Upload state of a resource
///
/// Cloning an object yields a fresh, non-uploaded object: GPU data is never
/// shared between two resources.
pub struct RendererObject<D> {
    data: Option<RendererData<D>>,
}

impl<D> RendererObject<D> {
    pub fn new() -> Self {
        Self { data: None }
    }

    /// Whether the resource currently has GPU data on a live renderer
    pub fn is_uploaded(&self) -> bool {
        self.data.as_ref().is_some_and(|data| data.live_renderer().is_some())
    }

    /// Renderer the resource is uploaded to
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the resource is not uploaded.
    pub fn renderer(&self) -> Result<Renderer> {
        self.data
            .as_ref()
            .and_then(|data| data.live_renderer())
            .map(Renderer::from_shared)
            .ok_or_else(|| Error::InvalidOperation("Object is not uploaded to GPU".to_string()))
    }

    /// Backend payload, `None` unless uploaded
    pub fn data(&self) -> Option<&D> {
        if self.is_uploaded() {
            self.data.as_ref().map(RendererData::payload)
        } else {
            None
        }
    }

    /// Whether the resource is uploaded to the renderer behind `shared`
    pub(crate) fn is_uploaded_to(&self, shared: &Weak<RendererShared>) -> bool {
        self.is_uploaded()
            && self.data.as_ref().is_some_and(|data| Weak::ptr_eq(&data.renderer, shared))
    }

    pub(crate) fn key(&self) -> Option<ResourceKey> {
        self.data.as_ref().map(RendererData::key)
    }

    /// Attach freshly allocated GPU data
    ///
    /// Stale data left over from a renderer that no longer exists is
    /// dropped; its guard finds no live renderer and does nothing.
    pub(crate) fn set_as_uploaded(&mut self, data: RendererData<D>) {
        self.data = Some(data);
    }

    /// Detach the GPU data, leaving the object in the destroyed state
    pub(crate) fn set_as_destroyed(&mut self) -> Option<RendererData<D>> {
        self.data.take()
    }

    /// The live renderer owning this object, if any (used by setters to
    /// force a destroy before mutating)
    pub(crate) fn owner(&self) -> Option<Renderer> {
        self.renderer().ok()
    }
}

impl<D> Default for RendererObject<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for RendererObject<D> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for RendererObject<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererObject")
            .field("uploaded", &self.is_uploaded())
            .finish()
    }
}

#[cfg(test)]
#[path = "renderer_object_tests.rs"]
mod tests;
