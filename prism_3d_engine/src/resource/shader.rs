//! Shader resource: GLSL modules, declared uniforms and fixed-function state.

use crate::error::{Error, Result};
use crate::graphics_device::{BlendMode, ShaderStage};
use crate::renderer::{RendererObject, ShaderData};
use crate::resource::Uniform;

const SOURCE: &str = "prism3d::Shader";

/// One compilation unit of a shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModule {
    stage: ShaderStage,
    name: String,
    source: String,
}

impl ShaderModule {
    pub fn new(stage: ShaderStage, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self { stage, name: name.into(), source: source.into() }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A GPU program
///
/// Uniforms keep their declaration order; texture units are assigned in
/// that order when the shader is uploaded.
#[derive(Debug, Clone)]
pub struct Shader {
    name: String,
    modules: Vec<ShaderModule>,
    uniforms: Vec<Uniform>,
    blend_mode: BlendMode,
    depth_tested: bool,
    object: RendererObject<ShaderData>,
}

impl Shader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
            uniforms: Vec::new(),
            blend_mode: BlendMode::default(),
            depth_tested: true,
            object: RendererObject::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_uploaded(&self) -> bool {
        self.object.is_uploaded()
    }

    /// GPU mirror of the shader
    pub fn object(&self) -> &RendererObject<ShaderData> {
        &self.object
    }

    pub(crate) fn object_mut(&mut self) -> &mut RendererObject<ShaderData> {
        &mut self.object
    }

    pub fn modules(&self) -> &[ShaderModule] {
        &self.modules
    }

    pub fn add_module(&mut self, module: ShaderModule) {
        self.destroy_before_mutation();
        self.modules.push(module);
    }

    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    pub(crate) fn uniforms_mut(&mut self) -> &mut [Uniform] {
        &mut self.uniforms
    }

    /// Declare a uniform
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a uniform with the same name exists.
    pub fn add_uniform(&mut self, uniform: Uniform) -> Result<()> {
        if self.has_uniform(uniform.name()) {
            crate::engine_bail!(
                SOURCE,
                "Shader '{}' already has a uniform named '{}'",
                self.name,
                uniform.name()
            );
        }
        self.destroy_before_mutation();
        self.uniforms.push(uniform);
        Ok(())
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|uniform| uniform.name() == name)
    }

    /// Look up a uniform by name
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if the shader has no such uniform.
    pub fn uniform(&self, name: &str) -> Result<&Uniform> {
        self.uniforms
            .iter()
            .find(|uniform| uniform.name() == name)
            .ok_or_else(|| {
                Error::InvalidOperation(format!("Shader '{}' has no uniform '{}'", self.name, name))
            })
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.destroy_before_mutation();
        self.blend_mode = blend_mode;
    }

    pub fn is_depth_tested(&self) -> bool {
        self.depth_tested
    }

    pub fn set_depth_tested(&mut self, depth_tested: bool) {
        self.destroy_before_mutation();
        self.depth_tested = depth_tested;
    }

    fn destroy_before_mutation(&mut self) {
        if let Some(renderer) = self.object.owner() {
            if let Err(error) = renderer.destroy_shader(self) {
                crate::engine_warn!(SOURCE, "Failed to destroy shader '{}' before mutation: {}", self.name, error);
                drop(self.object.set_as_destroyed());
            }
        }
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
