//! Shader uniforms and the values they accept.

use std::fmt;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::graphics_device::{UniformData, UniformLocation};
use crate::resource::{SharedTexture2, SharedTexture3, SharedTextureCube};

/// Declared type of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Int,
    Float,
    Vector2,
    Vector3,
    Vector4,
    Matrix4,
    Color,
    Texture2,
    Texture3,
    TextureCube,
}

impl UniformType {
    /// Texture-typed uniforms are bound through a texture unit
    pub fn is_texture(self) -> bool {
        matches!(self, UniformType::Texture2 | UniformType::Texture3 | UniformType::TextureCube)
    }
}

/// A value assigned to a uniform
#[derive(Clone)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Matrix4(Mat4),
    Color(Vec4),
    Texture2(SharedTexture2),
    Texture3(SharedTexture3),
    TextureCube(SharedTextureCube),
}

impl UniformValue {
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vector2(_) => UniformType::Vector2,
            UniformValue::Vector3(_) => UniformType::Vector3,
            UniformValue::Vector4(_) => UniformType::Vector4,
            UniformValue::Matrix4(_) => UniformType::Matrix4,
            UniformValue::Color(_) => UniformType::Color,
            UniformValue::Texture2(_) => UniformType::Texture2,
            UniformValue::Texture3(_) => UniformType::Texture3,
            UniformValue::TextureCube(_) => UniformType::TextureCube,
        }
    }

    /// Plain payload, `None` for texture values
    pub(crate) fn plain_data(&self) -> Option<UniformData> {
        match self {
            UniformValue::Int(value) => Some(UniformData::Int(*value)),
            UniformValue::Float(value) => Some(UniformData::Float(*value)),
            UniformValue::Vector2(value) => Some(UniformData::Vector2(*value)),
            UniformValue::Vector3(value) => Some(UniformData::Vector3(*value)),
            UniformValue::Vector4(value) | UniformValue::Color(value) => Some(UniformData::Vector4(*value)),
            UniformValue::Matrix4(value) => Some(UniformData::Matrix4(*value)),
            UniformValue::Texture2(_) | UniformValue::Texture3(_) | UniformValue::TextureCube(_) => None,
        }
    }
}

impl fmt::Debug for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.plain_data() {
            Some(data) => write!(f, "{:?}", data),
            None => write!(f, "{:?}(..)", self.uniform_type()),
        }
    }
}

/// Named input of a shader program
///
/// The location and texture unit are resolved when the shader is uploaded.
/// A location of `None` after upload means the linker removed the uniform;
/// setting it is then a silent no-op.
#[derive(Debug, Clone)]
pub struct Uniform {
    name: String,
    uniform_type: UniformType,
    default_value: Option<UniformValue>,
    location: Option<UniformLocation>,
    texture_unit: Option<u32>,
}

impl Uniform {
    pub fn new(name: impl Into<String>, uniform_type: UniformType) -> Self {
        Self {
            name: name.into(),
            uniform_type,
            default_value: None,
            location: None,
            texture_unit: None,
        }
    }

    /// Uniform whose value is applied every time the shader is bound
    pub fn with_default(name: impl Into<String>, value: UniformValue) -> Self {
        let mut uniform = Self::new(name, value.uniform_type());
        uniform.default_value = Some(value);
        uniform
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uniform_type(&self) -> UniformType {
        self.uniform_type
    }

    pub fn default_value(&self) -> Option<&UniformValue> {
        self.default_value.as_ref()
    }

    /// Resolved location, `None` if unresolved or optimized out
    pub fn location(&self) -> Option<UniformLocation> {
        self.location
    }

    /// Texture unit assigned to a texture-typed uniform
    pub fn texture_unit(&self) -> Option<u32> {
        self.texture_unit
    }

    pub(crate) fn resolve(&mut self, location: Option<UniformLocation>, texture_unit: Option<u32>) {
        self.location = location;
        self.texture_unit = texture_unit;
    }

    pub(crate) fn unresolve(&mut self) {
        self.location = None;
    }
}
