//! Direct3D 9 vertex buffer.

use std::fmt;
use std::sync::Arc;

use crate::backend::context::{BackendState, LayoutCache, RenderContext};
use crate::backend::{
    describe_ids, DeviceLossRecovery, NativeHandle, StreamSource, VertexBufferApi,
};
use crate::error::GraphicsError;
use crate::types::{MapAccess, PrimitiveTopology, SemanticKind, VertexBufferUsage};
use crate::vertex::{next_resource_id, VertexBuffer, VertexBufferBase, VertexBufferMapping};

use super::native::*;
use super::{D3d9Device, D3dVertexElement9};

/// A created Direct3D 9 vertex buffer, bindable to a stream.
///
/// Releases the native buffer when dropped.
pub struct Direct3d9Stream {
    id: u64,
    handle: NativeHandle,
    stride: u32,
    elements: Vec<D3dVertexElement9>,
    device: Arc<dyn D3d9Device>,
}

impl Direct3d9Stream {
    /// Native buffer handle.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Declaration elements with stream index 0.
    pub fn elements(&self) -> &[D3dVertexElement9] {
        &self.elements
    }
}

impl StreamSource for Direct3d9Stream {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn stride(&self) -> u32 {
        self.stride
    }
}

impl Drop for Direct3d9Stream {
    fn drop(&mut self) {
        log::trace!("Direct3D 9: releasing vertex buffer {:?}", self.handle);
        self.device.release_vertex_buffer(self.handle);
    }
}

impl fmt::Debug for Direct3d9Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Direct3d9Stream")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

/// A vertex declaration covering every active stream.
pub struct Direct3d9Declaration {
    handle: NativeHandle,
    device: Arc<dyn D3d9Device>,
}

impl Drop for Direct3d9Declaration {
    fn drop(&mut self) {
        self.device.release_vertex_declaration(self.handle);
    }
}

/// Direct3D 9 per-context state.
#[derive(Default)]
pub struct Direct3d9ContextState {
    declarations: LayoutCache<Direct3d9Declaration>,
    bound_declaration: Option<NativeHandle>,
}

impl BackendState for Direct3d9ContextState {
    fn layout_rebuilds(&self) -> u64 {
        self.declarations.rebuilds()
    }
}

/// Direct3D 9 half of a vertex buffer.
pub struct Direct3d9VertexBuffer {
    device: Arc<dyn D3d9Device>,
    source: Option<Arc<Direct3d9Stream>>,
    pool: u32,
    usage: u32,
}

impl Direct3d9VertexBuffer {
    /// Memory pool of the native buffer.
    pub fn pool(&self) -> u32 {
        self.pool
    }

    /// `D3DUSAGE` flags of the native buffer.
    pub fn usage_flags(&self) -> u32 {
        self.usage
    }

    /// Whether the native buffer is lost with the device.
    pub fn is_losable(&self) -> bool {
        self.pool == D3DPOOL_DEFAULT
    }
}

/// Pick the pool and usage flags for a buffer.
///
/// Set-only buffers go to the managed pool. Everything else is dynamic and
/// lives in the default pool.
fn placement(usage: VertexBufferUsage, hardware_vertex_processing: bool) -> (u32, u32) {
    let (pool, mut flags) = if usage.is_set_only() {
        (D3DPOOL_MANAGED, D3DUSAGE_WRITEONLY)
    } else {
        (D3DPOOL_DEFAULT, D3DUSAGE_WRITEONLY | D3DUSAGE_DYNAMIC)
    };
    if !hardware_vertex_processing {
        flags |= D3DUSAGE_SOFTWAREPROCESSING;
    }
    (pool, flags)
}

fn decl_usage(semantic: SemanticKind) -> u8 {
    match semantic {
        SemanticKind::Position => D3DDECLUSAGE_POSITION,
        SemanticKind::BlendWeight => D3DDECLUSAGE_BLENDWEIGHT,
        SemanticKind::BlendIndices => D3DDECLUSAGE_BLENDINDICES,
        SemanticKind::Normal => D3DDECLUSAGE_NORMAL,
        SemanticKind::PointSize => D3DDECLUSAGE_PSIZE,
        SemanticKind::TexCoord => D3DDECLUSAGE_TEXCOORD,
        SemanticKind::Tangent => D3DDECLUSAGE_TANGENT,
        SemanticKind::Binormal => D3DDECLUSAGE_BINORMAL,
        SemanticKind::PositionT => D3DDECLUSAGE_POSITIONT,
        SemanticKind::Color => D3DDECLUSAGE_COLOR,
    }
}

fn primitive_type(topology: PrimitiveTopology) -> Option<u32> {
    match topology {
        PrimitiveTopology::PointList => Some(D3DPT_POINTLIST),
        PrimitiveTopology::LineList => Some(D3DPT_LINELIST),
        PrimitiveTopology::LineStrip => Some(D3DPT_LINESTRIP),
        PrimitiveTopology::TriangleList => Some(D3DPT_TRIANGLELIST),
        PrimitiveTopology::TriangleStrip => Some(D3DPT_TRIANGLESTRIP),
        PrimitiveTopology::Undefined => None,
    }
}

fn lock_flags(access: MapAccess) -> u32 {
    let mut flags = 0;
    if !access.is_write() {
        flags |= D3DLOCK_READONLY;
    }
    if access.contains(MapAccess::DISCARD) {
        flags |= D3DLOCK_DISCARD;
    }
    if access.contains(MapAccess::NO_OVERWRITE) {
        flags |= D3DLOCK_NOOVERWRITE;
    }
    flags
}

fn translate(base: &VertexBufferBase<'_>) -> Result<Vec<D3dVertexElement9>, GraphicsError> {
    base.elements()
        .iter()
        .map(|element| {
            let ty = element.format.format().d3d9.ok_or_else(|| {
                GraphicsError::FeatureNotSupported(format!(
                    "{:?} vertex elements on Direct3D 9",
                    element.format
                ))
            })?;
            let offset = u16::try_from(element.offset).map_err(|_| {
                GraphicsError::InvalidParameter(format!(
                    "element offset {} exceeds the Direct3D 9 limit",
                    element.offset
                ))
            })?;
            let usage_index = u8::try_from(element.semantic_index).map_err(|_| {
                GraphicsError::InvalidParameter(format!(
                    "semantic index {} exceeds the Direct3D 9 limit",
                    element.semantic_index
                ))
            })?;
            Ok(D3dVertexElement9 {
                stream: 0,
                offset,
                ty,
                method: D3DDECLMETHOD_DEFAULT,
                usage: decl_usage(element.semantic),
                usage_index,
            })
        })
        .collect()
}

impl VertexBufferApi for Direct3d9VertexBuffer {
    type Device = dyn D3d9Device;
    type Source = Direct3d9Stream;
    type ContextState = Direct3d9ContextState;

    const NAME: &'static str = "Direct3D 9";

    fn new(device: Arc<dyn D3d9Device>) -> Self {
        Self {
            device,
            source: None,
            pool: D3DPOOL_MANAGED,
            usage: 0,
        }
    }

    fn device(&self) -> &Arc<dyn D3d9Device> {
        &self.device
    }

    fn create_api(&mut self, base: &VertexBufferBase<'_>) -> Result<(), GraphicsError> {
        self.reset_api();

        let elements = translate(base)?;
        let data = base.data().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has no data to upload".to_string())
        })?;
        let (pool, usage) = placement(
            base.usage(),
            self.device.supports_hardware_vertex_processing(),
        );

        let length = u32::try_from(data.len()).map_err(|_| {
            GraphicsError::InvalidParameter(format!("{} byte vertex buffer", data.len()))
        })?;
        let handle = self.device.create_vertex_buffer(length, usage, pool)?;
        let stream = Direct3d9Stream {
            id: next_resource_id(),
            handle,
            stride: base.stride(),
            elements,
            device: Arc::clone(&self.device),
        };
        if self.device.lock(handle, 0).is_none() {
            return Err(GraphicsError::ResourceCreationFailed(
                "could not lock new vertex buffer".to_string(),
            ));
        }
        self.device.unlock(handle, Some(data));

        log::debug!(
            "Direct3D 9: created vertex buffer {:?} ({} bytes, pool {pool}, usage {usage:#x})",
            handle,
            data.len()
        );
        self.pool = pool;
        self.usage = usage;
        self.source = Some(Arc::new(stream));
        Ok(())
    }

    fn reset_api(&mut self) {
        self.source = None;
    }

    fn source(&self) -> Option<&Arc<Direct3d9Stream>> {
        self.source.as_ref()
    }

    fn retains_cpu_copy(&self) -> bool {
        self.is_losable()
    }

    fn map(
        &mut self,
        _base: &VertexBufferBase<'_>,
        access: MapAccess,
    ) -> Option<VertexBufferMapping> {
        let source = self.source.as_ref()?;
        let data = self.device.lock(source.handle, lock_flags(access))?;
        Some(VertexBufferMapping::new(data, access))
    }

    fn unmap(&mut self, mapping: &VertexBufferMapping) {
        if let Some(source) = &self.source {
            let written = mapping.access().is_write().then(|| mapping.as_slice());
            self.device.unlock(source.handle, written);
        }
    }

    fn render_api(
        &mut self,
        base: &VertexBufferBase<'_>,
        ctx: &mut RenderContext<Self>,
        start_vertex: u32,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        let primitive = primitive_type(base.topology()).ok_or_else(|| {
            GraphicsError::InvalidParameter("cannot draw an undefined topology".to_string())
        })?;
        let resolved = ctx.resolve_streams();
        let state = ctx.state_mut();

        let cached = state.declarations.lookup(&resolved.ids).map(|d| d.handle);
        let declaration = match cached {
            Some(handle) => handle,
            None => {
                let elements: Vec<D3dVertexElement9> = resolved
                    .bound()
                    .flat_map(|stream| {
                        let slot = stream.slot as u16;
                        stream.source.elements.iter().map(move |element| D3dVertexElement9 {
                            stream: slot,
                            ..*element
                        })
                    })
                    .collect();
                let handle = self.device.create_vertex_declaration(&elements)?;
                log::debug!(
                    "Direct3D 9: built vertex declaration {:?} for streams {}",
                    handle,
                    describe_ids(&resolved.ids)
                );
                let declaration = Direct3d9Declaration {
                    handle,
                    device: Arc::clone(&self.device),
                };
                state.declarations.store(resolved.ids.clone(), declaration).handle
            }
        };
        if state.bound_declaration != Some(declaration) {
            self.device.set_vertex_declaration(declaration);
            state.bound_declaration = Some(declaration);
        }

        for (slot, stream) in resolved.streams.iter().enumerate() {
            match stream {
                Some(stream) => self.device.set_stream_source(
                    slot as u32,
                    Some(stream.source.handle),
                    stream.offset,
                    stream.source.stride,
                ),
                None => self.device.set_stream_source(slot as u32, None, 0, 0),
            }
        }

        if total_primitives == 0 {
            return Ok(());
        }
        log::trace!(
            "Direct3D 9: drawing {total_primitives} primitives from vertex {start_vertex}"
        );
        self.device
            .draw_primitive(primitive, start_vertex, total_primitives);
        Ok(())
    }
}

impl fmt::Debug for Direct3d9VertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Direct3d9VertexBuffer")
            .field("source", &self.source)
            .field("pool", &self.pool)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

impl DeviceLossRecovery for VertexBuffer<'_, Direct3d9VertexBuffer> {
    fn on_device_lost(&mut self) {
        let (_, api) = self.split_mut();
        if api.is_losable() && api.source.is_some() {
            log::debug!("Direct3D 9: releasing default-pool vertex buffer on device loss");
            api.reset_api();
        }
    }

    fn on_device_reset(&mut self) -> Result<(), GraphicsError> {
        let (base, api) = self.split_mut();
        if api.is_losable() && api.source.is_none() && base.is_configured() {
            log::debug!("Direct3D 9: re-creating default-pool vertex buffer after reset");
            api.create_api(base)?;
        }
        Ok(())
    }
}
