/// Shader vocabulary shared by resources and backends

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Pipeline stage of a shader module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

/// Outcome of a compile or link step
///
/// The object is created even when the step fails, so the caller can
/// release it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildLog {
    pub success: bool,
    /// Compiler or linker output (may be non-empty on success)
    pub log: String,
}

impl BuildLog {
    pub fn succeeded() -> Self {
        Self { success: true, log: String::new() }
    }

    pub fn failed(log: impl Into<String>) -> Self {
        Self { success: false, log: log.into() }
    }
}

/// Location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Plain uniform payload uploaded by a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    Int(i32),
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Matrix4(Mat4),
}
