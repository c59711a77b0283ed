//! Compiled shader stages.

use std::fmt;

/// Pipeline stage a [`ShaderPart`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Runs once per vertex and reads the bound vertex streams.
    Vertex,
    /// Runs once per fragment.
    Pixel,
    /// Runs once per primitive.
    Geometry,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Pixel => "pixel",
            Self::Geometry => "geometry",
        })
    }
}

/// A uniform declared by a shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDeclaration {
    /// Name as written in the shader source.
    pub name: String,
    /// Declared size in bytes, arrays included.
    pub size: u32,
}

/// A varying declared by a shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDeclaration {
    /// Name as written in the shader source.
    pub name: String,
    /// Semantic token, e.g. `TEXCOORD1`.
    pub semantic: String,
    /// True for stage inputs, false for outputs.
    pub is_input: bool,
}

/// One compiled stage plus the reflection data its compiler produced.
///
/// Parts are identified by a nonzero `id`; a program is keyed by the ids of
/// its stages, so two parts with the same id are assumed identical.
#[derive(Debug, Clone)]
pub struct ShaderPart {
    id: u32,
    stage: ShaderStage,
    shader: u32,
    uniforms: Vec<UniformDeclaration>,
    attributes: Vec<AttributeDeclaration>,
}

impl ShaderPart {
    /// Wrap the native shader object `shader`.
    pub fn new(id: u32, stage: ShaderStage, shader: u32) -> Self {
        Self {
            id,
            stage,
            shader,
            uniforms: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Declare a uniform of `size` bytes.
    pub fn with_uniform(mut self, name: impl Into<String>, size: u32) -> Self {
        self.uniforms.push(UniformDeclaration {
            name: name.into(),
            size,
        });
        self
    }

    /// Declare a stage input bound to `semantic`.
    pub fn with_input(mut self, name: impl Into<String>, semantic: impl Into<String>) -> Self {
        self.attributes.push(AttributeDeclaration {
            name: name.into(),
            semantic: semantic.into(),
            is_input: true,
        });
        self
    }

    /// Declare a stage output bound to `semantic`.
    pub fn with_output(mut self, name: impl Into<String>, semantic: impl Into<String>) -> Self {
        self.attributes.push(AttributeDeclaration {
            name: name.into(),
            semantic: semantic.into(),
            is_input: false,
        });
        self
    }

    /// Id used in [`ShaderProgramKey`](super::ShaderProgramKey).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Stage this part runs in.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Native shader object name.
    pub fn shader(&self) -> u32 {
        self.shader
    }

    /// Declared uniforms, in declaration order.
    pub fn uniforms(&self) -> &[UniformDeclaration] {
        &self.uniforms
    }

    /// Declared inputs and outputs.
    pub fn attributes(&self) -> &[AttributeDeclaration] {
        &self.attributes
    }

    /// Stage inputs only.
    pub fn inputs(&self) -> impl Iterator<Item = &AttributeDeclaration> {
        self.attributes.iter().filter(|a| a.is_input)
    }

    /// Total size of every declared uniform.
    pub fn uniform_bytes(&self) -> usize {
        self.uniforms.iter().map(|u| u.size as usize).sum()
    }
}
