//! # L. Spiro Graphics
//!
//! Cross-API vertex buffers and OpenGL shader programs.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`VertexBuffer`] - Vertex data described by element declarations, uploaded
//!   to Direct3D 9, Direct3D 11, OpenGL or Metal
//! - [`RenderContext`] - Stream slots and the per-context input layout cache
//! - [`ShaderProgramManager`] - Linked, shared OpenGL programs with uniform
//!   shadowing
//! - [`backend::dummy`] - A recording device for tests
//!
//! The backend behind [`ActiveVertexBuffer`] is chosen with Cargo features.
//!
//! ## Example
//!
//! ```ignore
//! use lspiro_graphics::{ActiveVertexBuffer, RenderContext, VertexSource};
//! use lspiro_graphics::types::{PrimitiveTopology, VertexBufferUsage, VertexElementDescriptor};
//!
//! let mut buffer = ActiveVertexBuffer::new(device);
//! buffer.create_vertex_buffer(
//!     VertexSource::Copy(bytemuck::cast_slice(&positions)),
//!     &[VertexElementDescriptor::position()],
//!     12,
//!     3,
//!     VertexBufferUsage::Static,
//!     PrimitiveTopology::TriangleList,
//! )?;
//!
//! let mut ctx = RenderContext::new();
//! buffer.set_stream(&mut ctx, 0, 0)?;
//! buffer.render(&mut ctx, 0, 1)?;
//! ```

pub mod backend;
pub mod error;
pub mod math;
pub mod shader;
pub mod types;
pub mod vertex;

// Re-export main types for convenience
pub use backend::{ActiveBackend, DeviceLossRecovery, RenderContext, VertexBufferApi};
pub use error::GraphicsError;
pub use shader::{ShaderPart, ShaderProgram, ShaderProgramManager, ShaderStage, UniformHandle};
pub use types::{
    MapAccess, PrimitiveTopology, SemanticKind, VertexBufferUsage, VertexElementDescriptor,
    VertexElementType,
};
pub use vertex::{
    ActiveVertexBuffer, IndexBufferBase, VertexBuffer, VertexBufferBase, VertexBufferRing,
    VertexSource,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Logs the library version and the backend selected for
/// [`ActiveVertexBuffer`].
pub fn init() {
    log::info!(
        "L. Spiro Graphics v{} initialized ({} backend)",
        VERSION,
        <ActiveBackend as VertexBufferApi>::NAME
    );
}
