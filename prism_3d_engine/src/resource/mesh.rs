//! Mesh resource: interleaved vertex data plus an index buffer.
//!
//! Vertex and index bytes are opaque to the mesh; their interpretation
//! comes from the [`VertexLayout`] and [`IndexType`]. Both byte buffers are
//! always an exact multiple of their element size, so vertex and index
//! counts are derived rather than stored.
//!
//! # Example
//!
//! ```no_run
//! use prism_3d_engine::prism3d::resource::{Mesh, MeshWriter, VertexAttributeSemantic, VertexLayout};
//!
//! let mut mesh = Mesh::with_name("triangle");
//! mesh.set_vertex_layout(VertexLayout::create_default())?;
//!
//! let mut writer = MeshWriter::new(&mut mesh);
//! for position in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
//!     writer.add_vertex();
//!     writer.write_attribute(VertexAttributeSemantic::Position, &position)?;
//! }
//! writer.add_indices(&[0, 1, 2])?;
//! writer.finish()?;
//! # Ok::<(), prism_3d_engine::prism3d::Error>(())
//! ```

use crate::error::Result;
use crate::graphics_device::{IndexType, PrimitiveType, VertexAttributeType};
use crate::renderer::{MeshData, RendererObject};
use crate::resource::{VertexAttributeSemantic, VertexLayout};

const SOURCE: &str = "prism3d::Mesh";

// ============================================================================
// MESH
// ============================================================================

/// Geometry drawn with a single indexed draw call
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    vertex_layout: VertexLayout,
    index_type: IndexType,
    primitive_type: PrimitiveType,
    vertex_data: Vec<u8>,
    index_data: Vec<u8>,
    object: RendererObject<MeshData>,
}

impl Mesh {
    /// Unnamed mesh with the default vertex layout
    pub fn new() -> Self {
        Self::with_name("<unnamed>")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_layout: VertexLayout::create_default(),
            index_type: IndexType::default(),
            primitive_type: PrimitiveType::default(),
            vertex_data: Vec::new(),
            index_data: Vec::new(),
            object: RendererObject::new(),
        }
    }

    /// Full-screen quad in normalized device coordinates (position + UV)
    pub fn viewport_quad() -> Result<Self> {
        let mut mesh = Self::with_name("Viewport");
        mesh.set_vertex_layout(
            VertexLayout::new()
                .with_attribute(VertexAttributeSemantic::Position, VertexAttributeType::Float32, 3)?
                .with_attribute(VertexAttributeSemantic::TextureCoords0, VertexAttributeType::Float32, 2)?,
        )?;

        let mut writer = MeshWriter::new(&mut mesh);
        for (position, uv) in [
            ([-1.0, -1.0, 0.0], [0.0, 0.0]),
            ([1.0, -1.0, 0.0], [1.0, 0.0]),
            ([1.0, 1.0, 0.0], [1.0, 1.0]),
            ([-1.0, 1.0, 0.0], [0.0, 1.0]),
        ] {
            writer.add_vertex();
            writer.write_attribute(VertexAttributeSemantic::Position, &position)?;
            writer.write_attribute(VertexAttributeSemantic::TextureCoords0, &uv)?;
        }
        writer.add_indices(&[0, 1, 2, 2, 3, 0])?;
        writer.finish()?;
        Ok(mesh)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_uploaded(&self) -> bool {
        self.object.is_uploaded()
    }

    /// GPU mirror of the mesh
    pub fn object(&self) -> &RendererObject<MeshData> {
        &self.object
    }

    pub(crate) fn object_mut(&mut self) -> &mut RendererObject<MeshData> {
        &mut self.object
    }

    // ===== LAYOUT =====

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    /// Change the vertex layout
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the mesh already holds vertex data; clear it first.
    pub fn set_vertex_layout(&mut self, vertex_layout: VertexLayout) -> Result<()> {
        if !self.vertex_data.is_empty() {
            crate::engine_bail!(
                SOURCE,
                "Cannot change the vertex layout of mesh '{}' which has vertex data",
                self.name
            );
        }
        self.destroy_before_mutation();
        self.vertex_layout = vertex_layout;
        Ok(())
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Change the index type
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the mesh already holds index data; clear it first.
    pub fn set_index_type(&mut self, index_type: IndexType) -> Result<()> {
        if !self.index_data.is_empty() {
            crate::engine_bail!(
                SOURCE,
                "Cannot change the index type of mesh '{}' which has index data",
                self.name
            );
        }
        self.destroy_before_mutation();
        self.index_type = index_type;
        Ok(())
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    pub fn set_primitive_type(&mut self, primitive_type: PrimitiveType) {
        self.destroy_before_mutation();
        self.primitive_type = primitive_type;
    }

    // ===== DATA =====

    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// Replace the raw interleaved vertex bytes
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the length is not a multiple of the vertex size.
    pub fn set_vertex_data(&mut self, vertex_data: Vec<u8>) -> Result<()> {
        let vertex_size = self.vertex_layout.vertex_size();
        if !is_exact_multiple(vertex_data.len(), vertex_size) {
            crate::engine_bail!(
                SOURCE,
                "Vertex data of {} bytes is not a multiple of the {}-byte vertex of mesh '{}'",
                vertex_data.len(),
                vertex_size,
                self.name
            );
        }
        self.destroy_before_mutation();
        self.vertex_data = vertex_data;
        Ok(())
    }

    pub fn clear_vertex_data(&mut self) {
        self.destroy_before_mutation();
        self.vertex_data.clear();
    }

    pub fn index_data(&self) -> &[u8] {
        &self.index_data
    }

    /// Replace the raw index bytes
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the length is not a multiple of the index size.
    pub fn set_index_data(&mut self, index_data: Vec<u8>) -> Result<()> {
        let index_size = self.index_type.size();
        if !is_exact_multiple(index_data.len(), index_size) {
            crate::engine_bail!(
                SOURCE,
                "Index data of {} bytes is not a multiple of the {}-byte index of mesh '{}'",
                index_data.len(),
                index_size,
                self.name
            );
        }
        self.destroy_before_mutation();
        self.index_data = index_data;
        Ok(())
    }

    pub fn clear_index_data(&mut self) {
        self.destroy_before_mutation();
        self.index_data.clear();
    }

    pub fn vertex_count(&self) -> usize {
        match self.vertex_layout.vertex_size() {
            0 => 0,
            size => self.vertex_data.len() / size,
        }
    }

    pub fn index_count(&self) -> usize {
        self.index_data.len() / self.index_type.size()
    }

    fn destroy_before_mutation(&mut self) {
        if let Some(renderer) = self.object.owner() {
            if let Err(error) = renderer.destroy_mesh(self) {
                crate::engine_warn!(SOURCE, "Failed to destroy mesh '{}' before mutation: {}", self.name, error);
                drop(self.object.set_as_destroyed());
            }
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

fn is_exact_multiple(length: usize, element_size: usize) -> bool {
    match element_size {
        0 => length == 0,
        size => length % size == 0,
    }
}

// ============================================================================
// MESH WRITER
// ============================================================================

/// Appends vertices and indices to a mesh, converting values to the
/// layout's component types
///
/// Nothing reaches the mesh until [`finish`](Self::finish).
pub struct MeshWriter<'a> {
    mesh: &'a mut Mesh,
    vertex_data: Vec<u8>,
    index_data: Vec<u8>,
    vertex_start: Option<usize>,
}

impl<'a> MeshWriter<'a> {
    /// Start writing after the mesh's existing data
    pub fn new(mesh: &'a mut Mesh) -> Self {
        let vertex_data = mesh.vertex_data.clone();
        let index_data = mesh.index_data.clone();
        Self { mesh, vertex_data, index_data, vertex_start: None }
    }

    /// Append a zeroed vertex and make it current; returns its index
    pub fn add_vertex(&mut self) -> u32 {
        let vertex_size = self.mesh.vertex_layout.vertex_size();
        let start = self.vertex_data.len();
        self.vertex_data.resize(start + vertex_size, 0);
        self.vertex_start = Some(start);
        match vertex_size {
            0 => 0,
            size => (start / size) as u32,
        }
    }

    /// Write up to `cardinality` components of one attribute of the current vertex
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if no vertex was added, the layout lacks the
    /// semantic, or the attribute is Float16.
    pub fn write_attribute(&mut self, semantic: VertexAttributeSemantic, values: &[f32]) -> Result<()> {
        let Some(start) = self.vertex_start else {
            crate::engine_bail!(SOURCE, "Cannot write {:?} before adding a vertex", semantic);
        };
        let Some(attribute) = self.mesh.vertex_layout.attribute(semantic).copied() else {
            crate::engine_bail!(
                SOURCE,
                "Vertex layout of mesh '{}' has no {:?} attribute",
                self.mesh.name,
                semantic
            );
        };

        let component_size = attribute.attribute_type().size();
        for (component, value) in values.iter().take(attribute.cardinality() as usize).enumerate() {
            let offset = start + attribute.offset() + component * component_size;
            let bytes = component_bytes(attribute.attribute_type(), *value)?;
            self.vertex_data[offset..offset + component_size].copy_from_slice(&bytes);
        }
        Ok(())
    }

    /// Append one index
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the value does not fit the mesh's index type.
    pub fn add_index(&mut self, index: u32) -> Result<()> {
        match self.mesh.index_type {
            IndexType::UInt8 => match u8::try_from(index) {
                Ok(value) => self.index_data.push(value),
                Err(_) => crate::engine_bail!(SOURCE, "Index {} does not fit UInt8", index),
            },
            IndexType::UInt16 => match u16::try_from(index) {
                Ok(value) => self.index_data.extend_from_slice(bytemuck::bytes_of(&value)),
                Err(_) => crate::engine_bail!(SOURCE, "Index {} does not fit UInt16", index),
            },
            IndexType::UInt32 => self.index_data.extend_from_slice(bytemuck::bytes_of(&index)),
        }
        Ok(())
    }

    pub fn add_indices(&mut self, indices: &[u32]) -> Result<()> {
        indices.iter().try_for_each(|index| self.add_index(*index))
    }

    /// Commit the written data to the mesh
    pub fn finish(self) -> Result<()> {
        self.mesh.set_vertex_data(self.vertex_data)?;
        self.mesh.set_index_data(self.index_data)
    }
}

fn component_bytes(attribute_type: VertexAttributeType, value: f32) -> Result<Vec<u8>> {
    let bytes = match attribute_type {
        VertexAttributeType::Int8 => bytemuck::bytes_of(&(value as i8)).to_vec(),
        VertexAttributeType::UInt8 => bytemuck::bytes_of(&(value as u8)).to_vec(),
        VertexAttributeType::Int16 => bytemuck::bytes_of(&(value as i16)).to_vec(),
        VertexAttributeType::UInt16 => bytemuck::bytes_of(&(value as u16)).to_vec(),
        VertexAttributeType::Int32 => bytemuck::bytes_of(&(value as i32)).to_vec(),
        VertexAttributeType::UInt32 => bytemuck::bytes_of(&(value as u32)).to_vec(),
        VertexAttributeType::Float32 => bytemuck::bytes_of(&value).to_vec(),
        VertexAttributeType::Float16 => {
            crate::engine_bail!(SOURCE, "Writing Float16 vertex attributes is not supported")
        }
    };
    Ok(bytes)
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
