/// Vertex/index buffer vocabulary shared by resources and backends

/// Kind of GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Element type of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    UInt8,
    #[default]
    UInt16,
    UInt32,
}

impl IndexType {
    /// Size of one index in bytes
    pub fn size(self) -> usize {
        match self {
            IndexType::UInt8 => 1,
            IndexType::UInt16 => 2,
            IndexType::UInt32 => 4,
        }
    }
}

/// How indices are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float16,
    Float32,
}

impl VertexAttributeType {
    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            VertexAttributeType::Int8 | VertexAttributeType::UInt8 => 1,
            VertexAttributeType::Int16
            | VertexAttributeType::UInt16
            | VertexAttributeType::Float16 => 2,
            VertexAttributeType::Int32
            | VertexAttributeType::UInt32
            | VertexAttributeType::Float32 => 4,
        }
    }

    /// Integer types are bound through the integer attribute path (no normalization)
    pub fn is_integer(self) -> bool {
        !matches!(self, VertexAttributeType::Float16 | VertexAttributeType::Float32)
    }
}

/// GPU description of one vertex attribute inside an interleaved buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeBinding {
    /// Attribute index, sequential in declaration order
    pub index: u32,
    pub attribute_type: VertexAttributeType,
    /// Component count (1-4)
    pub cardinality: u32,
    /// Full vertex size in bytes
    pub stride: u32,
    /// Byte offset inside one vertex
    pub offset: u32,
    /// Bound through the integer path
    pub integer: bool,
}
