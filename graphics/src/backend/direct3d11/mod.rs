//! Direct3D 11 backend.

pub mod native;
mod vertex_buffer;

pub use vertex_buffer::{
    Direct3d11ContextState, Direct3d11InputLayout, Direct3d11Stream, Direct3d11VertexBuffer,
};

use crate::error::GraphicsError;

use super::NativeHandle;

/// `D3D11_BUFFER_DESC` for a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3d11BufferDesc {
    /// Size in bytes.
    pub byte_width: u32,
    /// `D3D11_USAGE`.
    pub usage: u32,
    /// `D3D11_BIND_FLAG`.
    pub bind_flags: u32,
    /// `D3D11_CPU_ACCESS_FLAG`.
    pub cpu_access_flags: u32,
}

/// `D3D11_INPUT_ELEMENT_DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3d11InputElementDesc {
    /// HLSL semantic name.
    pub semantic_name: &'static str,
    /// Semantic index.
    pub semantic_index: u32,
    /// `DXGI_FORMAT`.
    pub format: u32,
    /// Input assembler slot.
    pub input_slot: u32,
    /// Byte offset within the vertex.
    pub aligned_byte_offset: u32,
    /// `D3D11_INPUT_CLASSIFICATION`.
    pub input_slot_class: u32,
    /// Instances drawn per element advance; zero for per-vertex data.
    pub instance_data_step_rate: u32,
}

/// Vertex buffer binding for `IASetVertexBuffers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3d11VertexBinding {
    /// Buffer, or `None` to unbind the slot.
    pub buffer: Option<NativeHandle>,
    /// Bytes per vertex.
    pub stride: u32,
    /// Byte offset of the first vertex.
    pub offset: u32,
}

/// The subset of `ID3D11Device` and its immediate context used by vertex buffers.
pub trait D3d11Device: Send + Sync {
    /// `CreateBuffer` with optional initial data.
    fn create_buffer(
        &self,
        desc: &D3d11BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeHandle, GraphicsError>;

    /// `Release` on a buffer.
    fn release_buffer(&self, buffer: NativeHandle);

    /// `Map` the whole buffer; returns its current contents.
    fn map(&self, buffer: NativeHandle, map_type: u32) -> Option<Vec<u8>>;

    /// `Unmap`, writing `data` back when the map was for writing.
    fn unmap(&self, buffer: NativeHandle, data: Option<&[u8]>);

    /// `CreateInputLayout`.
    fn create_input_layout(
        &self,
        elements: &[D3d11InputElementDesc],
    ) -> Result<NativeHandle, GraphicsError>;

    /// `Release` on an input layout.
    fn release_input_layout(&self, layout: NativeHandle);

    /// `IASetInputLayout`.
    fn ia_set_input_layout(&self, layout: NativeHandle);

    /// `IASetVertexBuffers` starting at `start_slot`.
    fn ia_set_vertex_buffers(&self, start_slot: u32, bindings: &[D3d11VertexBinding]);

    /// `IASetPrimitiveTopology`.
    fn ia_set_primitive_topology(&self, topology: u32);

    /// `Draw`.
    fn draw(&self, vertex_count: u32, start_vertex: u32);
}
