//! Direct3D 9 backend.
//!
//! Vertex buffers live either in the managed pool, which the runtime restores
//! by itself, or in the default pool, which is lost with the device. Buffers
//! in the default pool implement [`DeviceLossRecovery`](super::DeviceLossRecovery)
//! through the vertex buffer facade.

pub mod native;
mod vertex_buffer;

pub use vertex_buffer::{
    Direct3d9ContextState, Direct3d9Declaration, Direct3d9Stream, Direct3d9VertexBuffer,
};

use crate::error::GraphicsError;

use super::NativeHandle;

/// `D3DVERTEXELEMENT9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3dVertexElement9 {
    /// Stream index.
    pub stream: u16,
    /// Byte offset within the vertex.
    pub offset: u16,
    /// `D3DDECLTYPE`.
    pub ty: u8,
    /// `D3DDECLMETHOD`.
    pub method: u8,
    /// `D3DDECLUSAGE`.
    pub usage: u8,
    /// Usage index.
    pub usage_index: u8,
}

/// The subset of `IDirect3DDevice9` used by vertex buffers.
pub trait D3d9Device: Send + Sync {
    /// Whether the device was created with hardware vertex processing.
    fn supports_hardware_vertex_processing(&self) -> bool;

    /// `CreateVertexBuffer`.
    fn create_vertex_buffer(
        &self,
        length: u32,
        usage: u32,
        pool: u32,
    ) -> Result<NativeHandle, GraphicsError>;

    /// `Release` on a vertex buffer.
    fn release_vertex_buffer(&self, buffer: NativeHandle);

    /// `Lock` the whole buffer; returns its current contents.
    fn lock(&self, buffer: NativeHandle, flags: u32) -> Option<Vec<u8>>;

    /// `Unlock`, writing `data` back when the lock was for writing.
    fn unlock(&self, buffer: NativeHandle, data: Option<&[u8]>);

    /// `CreateVertexDeclaration`.
    fn create_vertex_declaration(
        &self,
        elements: &[D3dVertexElement9],
    ) -> Result<NativeHandle, GraphicsError>;

    /// `Release` on a vertex declaration.
    fn release_vertex_declaration(&self, declaration: NativeHandle);

    /// `SetVertexDeclaration`.
    fn set_vertex_declaration(&self, declaration: NativeHandle);

    /// `SetStreamSource`; `None` unbinds the stream.
    fn set_stream_source(
        &self,
        stream: u32,
        buffer: Option<NativeHandle>,
        offset: u32,
        stride: u32,
    );

    /// `DrawPrimitive`.
    fn draw_primitive(&self, primitive_type: u32, start_vertex: u32, primitive_count: u32);
}
