//! Direct3D 11 vertex buffer.

use std::fmt;
use std::sync::Arc;

use crate::backend::context::{BackendState, LayoutCache, RenderContext};
use crate::backend::{describe_ids, NativeHandle, StreamSource, VertexBufferApi};
use crate::error::GraphicsError;
use crate::types::{MapAccess, PrimitiveTopology, VertexBufferUsage};
use crate::vertex::{next_resource_id, VertexBufferBase, VertexBufferMapping};

use super::native::*;
use super::{D3d11BufferDesc, D3d11Device, D3d11InputElementDesc, D3d11VertexBinding};

/// A created Direct3D 11 vertex buffer.
///
/// Releases the native buffer when dropped.
pub struct Direct3d11Stream {
    id: u64,
    handle: NativeHandle,
    stride: u32,
    elements: Vec<D3d11InputElementDesc>,
    device: Arc<dyn D3d11Device>,
}

impl Direct3d11Stream {
    /// Native buffer handle.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Input elements with input slot 0.
    pub fn elements(&self) -> &[D3d11InputElementDesc] {
        &self.elements
    }
}

impl StreamSource for Direct3d11Stream {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn stride(&self) -> u32 {
        self.stride
    }
}

impl Drop for Direct3d11Stream {
    fn drop(&mut self) {
        log::trace!("Direct3D 11: releasing buffer {:?}", self.handle);
        self.device.release_buffer(self.handle);
    }
}

impl fmt::Debug for Direct3d11Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Direct3d11Stream")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

/// An input layout covering every active stream.
pub struct Direct3d11InputLayout {
    handle: NativeHandle,
    device: Arc<dyn D3d11Device>,
}

impl Drop for Direct3d11InputLayout {
    fn drop(&mut self) {
        self.device.release_input_layout(self.handle);
    }
}

/// Direct3D 11 per-context state.
#[derive(Default)]
pub struct Direct3d11ContextState {
    layouts: LayoutCache<Direct3d11InputLayout>,
    bound_layout: Option<NativeHandle>,
    topology: Option<u32>,
}

impl BackendState for Direct3d11ContextState {
    fn layout_rebuilds(&self) -> u64 {
        self.layouts.rebuilds()
    }
}

/// Direct3D 11 half of a vertex buffer.
pub struct Direct3d11VertexBuffer {
    device: Arc<dyn D3d11Device>,
    source: Option<Arc<Direct3d11Stream>>,
    desc: Option<D3d11BufferDesc>,
}

impl Direct3d11VertexBuffer {
    /// Description the native buffer was created with.
    pub fn desc(&self) -> Option<&D3d11BufferDesc> {
        self.desc.as_ref()
    }
}

fn buffer_desc(usage: VertexBufferUsage, byte_width: u32) -> D3d11BufferDesc {
    let (usage, cpu_access_flags) = match usage {
        VertexBufferUsage::Static => (D3D11_USAGE_IMMUTABLE, 0),
        VertexBufferUsage::Standard | VertexBufferUsage::Dynamic => {
            (D3D11_USAGE_DYNAMIC, D3D11_CPU_ACCESS_WRITE)
        }
    };
    D3d11BufferDesc {
        byte_width,
        usage,
        bind_flags: D3D11_BIND_VERTEX_BUFFER,
        cpu_access_flags,
    }
}

/// Dynamic buffers only accept discard and no-overwrite writes, so a plain
/// write keeps the contents through `WRITE_NO_OVERWRITE`.
fn map_type(access: MapAccess, usage: u32) -> u32 {
    let write_only = access.contains(MapAccess::WRITE) && !access.contains(MapAccess::READ);
    if access.contains(MapAccess::DISCARD) {
        D3D11_MAP_WRITE_DISCARD
    } else if access.contains(MapAccess::NO_OVERWRITE)
        || (write_only && usage == D3D11_USAGE_DYNAMIC)
    {
        D3D11_MAP_WRITE_NO_OVERWRITE
    } else if access.contains(MapAccess::READ | MapAccess::WRITE) {
        D3D11_MAP_READ_WRITE
    } else if access.contains(MapAccess::WRITE) {
        D3D11_MAP_WRITE
    } else {
        D3D11_MAP_READ
    }
}

fn topology(topology: PrimitiveTopology) -> Option<u32> {
    let native = match topology {
        PrimitiveTopology::PointList => D3D11_PRIMITIVE_TOPOLOGY_POINTLIST,
        PrimitiveTopology::LineList => D3D11_PRIMITIVE_TOPOLOGY_LINELIST,
        PrimitiveTopology::LineStrip => D3D11_PRIMITIVE_TOPOLOGY_LINESTRIP,
        PrimitiveTopology::TriangleList => D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        PrimitiveTopology::TriangleStrip => D3D11_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
        PrimitiveTopology::Undefined => return None,
    };
    Some(native)
}

fn translate(base: &VertexBufferBase<'_>) -> Result<Vec<D3d11InputElementDesc>, GraphicsError> {
    base.elements()
        .iter()
        .map(|element| {
            let format = element.format.format().dxgi.ok_or_else(|| {
                GraphicsError::FeatureNotSupported(format!(
                    "{:?} vertex elements on Direct3D 11",
                    element.format
                ))
            })?;
            Ok(D3d11InputElementDesc {
                semantic_name: element.semantic.token(),
                semantic_index: element.semantic_index,
                format,
                input_slot: 0,
                aligned_byte_offset: element.offset,
                input_slot_class: D3D11_INPUT_PER_VERTEX_DATA,
                instance_data_step_rate: 0,
            })
        })
        .collect()
}

impl VertexBufferApi for Direct3d11VertexBuffer {
    type Device = dyn D3d11Device;
    type Source = Direct3d11Stream;
    type ContextState = Direct3d11ContextState;

    const NAME: &'static str = "Direct3D 11";

    fn new(device: Arc<dyn D3d11Device>) -> Self {
        Self {
            device,
            source: None,
            desc: None,
        }
    }

    fn device(&self) -> &Arc<dyn D3d11Device> {
        &self.device
    }

    fn create_api(&mut self, base: &VertexBufferBase<'_>) -> Result<(), GraphicsError> {
        self.reset_api();

        let elements = translate(base)?;
        let data = base.data().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has no data to upload".to_string())
        })?;
        let byte_width = u32::try_from(data.len()).map_err(|_| {
            GraphicsError::InvalidParameter(format!("{} byte vertex buffer", data.len()))
        })?;
        let desc = buffer_desc(base.usage(), byte_width);
        let handle = self.device.create_buffer(&desc, Some(data))?;

        log::debug!(
            "Direct3D 11: created buffer {:?} ({} bytes, usage {})",
            handle,
            desc.byte_width,
            desc.usage
        );
        self.source = Some(Arc::new(Direct3d11Stream {
            id: next_resource_id(),
            handle,
            stride: base.stride(),
            elements,
            device: Arc::clone(&self.device),
        }));
        self.desc = Some(desc);
        Ok(())
    }

    fn reset_api(&mut self) {
        self.source = None;
        self.desc = None;
    }

    fn source(&self) -> Option<&Arc<Direct3d11Stream>> {
        self.source.as_ref()
    }

    fn map(
        &mut self,
        _base: &VertexBufferBase<'_>,
        access: MapAccess,
    ) -> Option<VertexBufferMapping> {
        let source = self.source.as_ref()?;
        let usage = self.desc.as_ref()?.usage;
        let data = self.device.map(source.handle, map_type(access, usage))?;
        Some(VertexBufferMapping::new(data, access))
    }

    fn unmap(&mut self, mapping: &VertexBufferMapping) {
        if let Some(source) = &self.source {
            let written = mapping.access().is_write().then(|| mapping.as_slice());
            self.device.unmap(source.handle, written);
        }
    }

    fn render_api(
        &mut self,
        base: &VertexBufferBase<'_>,
        ctx: &mut RenderContext<Self>,
        start_vertex: u32,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        let native_topology = topology(base.topology()).ok_or_else(|| {
            GraphicsError::InvalidParameter("cannot draw an undefined topology".to_string())
        })?;
        let resolved = ctx.resolve_streams();
        let state = ctx.state_mut();

        let cached = state.layouts.lookup(&resolved.ids).map(|layout| layout.handle);
        let layout = match cached {
            Some(handle) => handle,
            None => {
                let elements: Vec<D3d11InputElementDesc> = resolved
                    .bound()
                    .flat_map(|stream| {
                        let slot = stream.slot;
                        stream.source.elements.iter().map(move |element| D3d11InputElementDesc {
                            input_slot: slot,
                            ..*element
                        })
                    })
                    .collect();
                let handle = self.device.create_input_layout(&elements)?;
                log::debug!(
                    "Direct3D 11: built input layout {:?} for streams {}",
                    handle,
                    describe_ids(&resolved.ids)
                );
                let layout = Direct3d11InputLayout {
                    handle,
                    device: Arc::clone(&self.device),
                };
                state.layouts.store(resolved.ids.clone(), layout).handle
            }
        };
        if state.bound_layout != Some(layout) {
            self.device.ia_set_input_layout(layout);
            state.bound_layout = Some(layout);
        }

        let bindings: Vec<D3d11VertexBinding> = resolved
            .streams
            .iter()
            .map(|stream| match stream {
                Some(stream) => D3d11VertexBinding {
                    buffer: Some(stream.source.handle),
                    stride: stream.source.stride,
                    offset: stream.offset,
                },
                None => D3d11VertexBinding {
                    buffer: None,
                    stride: 0,
                    offset: 0,
                },
            })
            .collect();
        self.device.ia_set_vertex_buffers(0, &bindings);

        if state.topology != Some(native_topology) {
            self.device.ia_set_primitive_topology(native_topology);
            state.topology = Some(native_topology);
        }

        if total_primitives == 0 {
            return Ok(());
        }
        let vertex_count = base.topology().vertex_count(total_primitives);
        log::trace!("Direct3D 11: drawing {vertex_count} vertices from {start_vertex}");
        self.device.draw(vertex_count, start_vertex);
        Ok(())
    }
}

impl fmt::Debug for Direct3d11VertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Direct3d11VertexBuffer")
            .field("source", &self.source)
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCall, DummyDevice};
    use crate::types::VertexElementDescriptor;
    use crate::vertex::{VertexBuffer, VertexSource};

    fn create<'a>(
        dummy: &Arc<DummyDevice>,
        elements: &[crate::types::VertexElementDescriptor],
        stride: u32,
        usage: VertexBufferUsage,
    ) -> VertexBuffer<'a, Direct3d11VertexBuffer> {
        let mut buffer = VertexBuffer::<Direct3d11VertexBuffer>::new(dummy.clone());
        buffer
            .create_vertex_buffer(
                VertexSource::Reserve,
                elements,
                stride,
                6,
                usage,
                PrimitiveTopology::TriangleList,
            )
            .unwrap();
        buffer
    }

    #[test]
    fn test_buffer_desc() {
        let desc = buffer_desc(VertexBufferUsage::Static, 64);
        assert_eq!(desc.usage, D3D11_USAGE_IMMUTABLE);
        assert_eq!(desc.cpu_access_flags, 0);
        assert_eq!(desc.bind_flags, D3D11_BIND_VERTEX_BUFFER);

        let desc = buffer_desc(VertexBufferUsage::Dynamic, 64);
        assert_eq!(desc.usage, D3D11_USAGE_DYNAMIC);
        assert_eq!(desc.cpu_access_flags, D3D11_CPU_ACCESS_WRITE);

        let desc = buffer_desc(VertexBufferUsage::Standard, 64);
        assert_eq!(desc.usage, D3D11_USAGE_DYNAMIC);
        assert_eq!(desc.cpu_access_flags, D3D11_CPU_ACCESS_WRITE);
    }

    #[test]
    fn test_map_type() {
        let dynamic = D3D11_USAGE_DYNAMIC;
        assert_eq!(map_type(MapAccess::READ, dynamic), D3D11_MAP_READ);
        assert_eq!(map_type(MapAccess::WRITE, dynamic), D3D11_MAP_WRITE_NO_OVERWRITE);
        assert_eq!(map_type(MapAccess::WRITE, D3D11_USAGE_DEFAULT), D3D11_MAP_WRITE);
        assert_eq!(
            map_type(MapAccess::READ | MapAccess::WRITE, dynamic),
            D3D11_MAP_READ_WRITE
        );
        assert_eq!(
            map_type(MapAccess::WRITE | MapAccess::DISCARD, dynamic),
            D3D11_MAP_WRITE_DISCARD
        );
        assert_eq!(
            map_type(MapAccess::WRITE | MapAccess::NO_OVERWRITE, dynamic),
            D3D11_MAP_WRITE_NO_OVERWRITE
        );
    }

    #[test]
    fn test_layout_merges_streams_by_slot() {
        let dummy = DummyDevice::new();
        let mut positions = create(
            &dummy,
            &[VertexElementDescriptor::position()],
            12,
            VertexBufferUsage::Static,
        );
        let texcoords = create(
            &dummy,
            &[VertexElementDescriptor::texcoord(0)],
            8,
            VertexBufferUsage::Static,
        );

        let mut ctx = RenderContext::new();
        positions.set_stream(&mut ctx, 0, 0).unwrap();
        texcoords.set_stream(&mut ctx, 1, 0).unwrap();
        positions.render(&mut ctx, 0, 2).unwrap();

        assert_eq!(
            dummy.count(|call| matches!(call, DummyCall::CreateLayout { elements: 2, .. })),
            1
        );
        assert_eq!(
            dummy.count(|call| matches!(call, DummyCall::Draw { start: 0, vertices: 6 })),
            1
        );
    }

    #[test]
    fn test_topology_set_once() {
        let dummy = DummyDevice::new();
        let mut buffer = create(
            &dummy,
            &[VertexElementDescriptor::position()],
            12,
            VertexBufferUsage::Dynamic,
        );
        let mut ctx = RenderContext::new();
        buffer.set_stream(&mut ctx, 0, 0).unwrap();
        for _ in 0..3 {
            buffer.render(&mut ctx, 0, 1).unwrap();
        }
        assert_eq!(
            dummy.count(|call| matches!(call, DummyCall::SetTopology { .. })),
            1
        );
        assert_eq!(dummy.count(|call| matches!(call, DummyCall::SetLayout { .. })), 1);
    }

    #[test]
    fn test_zero_primitives_binds_without_drawing() {
        let dummy = DummyDevice::new();
        let mut buffer = create(
            &dummy,
            &[VertexElementDescriptor::position()],
            12,
            VertexBufferUsage::Dynamic,
        );
        let mut ctx = RenderContext::new();
        buffer.set_stream(&mut ctx, 0, 0).unwrap();
        buffer.render(&mut ctx, 0, 0).unwrap();
        assert_eq!(dummy.count(|call| matches!(call, DummyCall::SetStream { .. })), 1);
        assert_eq!(dummy.count(|call| matches!(call, DummyCall::Draw { .. })), 0);
    }
}
