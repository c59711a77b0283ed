//! Metal backend.
//!
//! Attributes are addressed by index rather than by name; semantic `S` with
//! usage index `N` lands at [`SemanticKind::attribute_base`] + `N`.
//!
//! [`SemanticKind::attribute_base`]: crate::types::SemanticKind::attribute_base

pub mod native;
mod vertex_buffer;

pub use vertex_buffer::{
    MetalContextState, MetalStream, MetalVertexBuffer, MetalVertexDescriptor,
};

use crate::error::GraphicsError;

use super::NativeHandle;

/// `MTLVertexAttributeDescriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetalVertexAttribute {
    /// Attribute index.
    pub index: u32,
    /// `MTLVertexFormat`.
    pub format: u32,
    /// Byte offset within the vertex.
    pub offset: u32,
    /// Buffer argument index.
    pub buffer_index: u32,
}

/// `MTLVertexBufferLayoutDescriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetalVertexBufferLayout {
    /// Buffer argument index.
    pub buffer_index: u32,
    /// Bytes per vertex.
    pub stride: u32,
    /// `MTLVertexStepFunction`.
    pub step_function: u32,
}

/// The subset of `MTLDevice` and the render command encoder used by vertex buffers.
pub trait MetalDevice: Send + Sync {
    /// `newBufferWithBytes:length:options:`.
    fn new_buffer(&self, data: &[u8], options: u32) -> Result<NativeHandle, GraphicsError>;

    /// Release a buffer.
    fn release_buffer(&self, buffer: NativeHandle);

    /// Copy of `contents`.
    fn buffer_contents(&self, buffer: NativeHandle) -> Option<Vec<u8>>;

    /// Write `data` to `contents` and call `didModifyRange:`.
    fn did_modify_range(&self, buffer: NativeHandle, data: &[u8]);

    /// Build an `MTLVertexDescriptor`.
    fn new_vertex_descriptor(
        &self,
        attributes: &[MetalVertexAttribute],
        layouts: &[MetalVertexBufferLayout],
    ) -> Result<NativeHandle, GraphicsError>;

    /// Release a vertex descriptor.
    fn release_vertex_descriptor(&self, descriptor: NativeHandle);

    /// Select the vertex descriptor used by the next pipeline lookup.
    fn set_vertex_descriptor(&self, descriptor: NativeHandle);

    /// `setVertexBuffer:offset:atIndex:`; `None` unbinds the index.
    fn set_vertex_buffer(&self, buffer: Option<NativeHandle>, offset: u32, index: u32);

    /// `drawPrimitives:vertexStart:vertexCount:`.
    fn draw_primitives(&self, primitive_type: u32, vertex_start: u32, vertex_count: u32);
}
