//! Vertex layout: ordered attributes with byte offsets computed on insertion.

use crate::error::Result;
use crate::graphics_device::VertexAttributeType;

const SOURCE: &str = "prism3d::VertexLayout";

/// Meaning of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    Position,
    Normal,
    Color,
    Tangent,
    Binormal,
    Weight0,
    Weight1,
    Weight2,
    Weight3,
    TextureCoords0,
    TextureCoords1,
    TextureCoords2,
    TextureCoords3,
}

/// One attribute of an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    semantic: VertexAttributeSemantic,
    attribute_type: VertexAttributeType,
    cardinality: u32,
    offset: usize,
}

impl VertexAttribute {
    /// Describe an attribute of `cardinality` components (1-4)
    pub fn new(
        semantic: VertexAttributeSemantic,
        attribute_type: VertexAttributeType,
        cardinality: u32,
    ) -> Result<Self> {
        if !(1..=4).contains(&cardinality) {
            crate::engine_bail!(
                SOURCE,
                "Vertex attribute {:?} has cardinality {}; expected 1 to 4",
                semantic,
                cardinality
            );
        }
        Ok(Self { semantic, attribute_type, cardinality, offset: 0 })
    }

    pub fn semantic(&self) -> VertexAttributeSemantic {
        self.semantic
    }

    pub fn attribute_type(&self) -> VertexAttributeType {
        self.attribute_type
    }

    pub fn cardinality(&self) -> u32 {
        self.cardinality
    }

    /// Byte offset inside one vertex, assigned by the layout
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.attribute_type.size() * self.cardinality as usize
    }
}

/// Ordered attribute list of an interleaved vertex
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    vertex_size: usize,
}

impl VertexLayout {
    /// Empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Position, normal and tangent (Float32x3) followed by texture
    /// coordinates (Float32x2)
    pub fn create_default() -> Self {
        let mut layout = Self::new();
        for (semantic, cardinality) in [
            (VertexAttributeSemantic::Position, 3),
            (VertexAttributeSemantic::Normal, 3),
            (VertexAttributeSemantic::Tangent, 3),
            (VertexAttributeSemantic::TextureCoords0, 2),
        ] {
            layout.push(VertexAttribute {
                semantic,
                attribute_type: VertexAttributeType::Float32,
                cardinality,
                offset: 0,
            });
        }
        layout
    }

    /// Append an attribute after the existing ones
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the layout already has an attribute with the
    /// same semantic.
    pub fn add_attribute(&mut self, attribute: VertexAttribute) -> Result<()> {
        if self.has_attribute(attribute.semantic) {
            crate::engine_bail!(
                SOURCE,
                "Vertex layout already has a {:?} attribute",
                attribute.semantic
            );
        }
        self.push(attribute);
        Ok(())
    }

    /// Builder-style [`add_attribute`](Self::add_attribute)
    pub fn with_attribute(
        mut self,
        semantic: VertexAttributeSemantic,
        attribute_type: VertexAttributeType,
        cardinality: u32,
    ) -> Result<Self> {
        self.add_attribute(VertexAttribute::new(semantic, attribute_type, cardinality)?)?;
        Ok(self)
    }

    fn push(&mut self, mut attribute: VertexAttribute) {
        attribute.offset = self.vertex_size;
        self.vertex_size += attribute.size();
        self.attributes.push(attribute);
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, semantic: VertexAttributeSemantic) -> bool {
        self.attribute(semantic).is_some()
    }

    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attribute| attribute.semantic == semantic)
    }

    /// Size of one vertex in bytes
    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }
}

#[cfg(test)]
#[path = "vertex_layout_tests.rs"]
mod tests;
