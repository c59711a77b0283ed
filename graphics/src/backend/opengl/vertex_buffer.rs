//! OpenGL vertex buffer.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::context::{BackendState, LayoutCache, RenderContext, ResolvedStreams};
use crate::backend::{describe_ids, StreamSource, VertexBufferApi};
use crate::error::GraphicsError;
use crate::shader::AttributeLocations;
use crate::types::{GlFormat, MapAccess, PrimitiveTopology, SemanticKind};
use crate::vertex::{next_resource_id, VertexBufferBase, VertexBufferMapping};

use super::native::*;
use super::{
    buffer_usage, create_buffer_object, GlAttribSource, GlDevice, GlIndexBuffer, GL_UPLOAD_LOCK,
};

/// One vertex attribute of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlAttribute {
    /// Semantic of the attribute.
    pub semantic: SemanticKind,
    /// Usage index within the semantic.
    pub semantic_index: u32,
    /// Component count and type.
    pub format: GlFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
}

/// An attribute read from a particular stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlAttributeBinding {
    /// Stream slot providing the data.
    pub slot: u32,
    /// The attribute.
    pub attribute: GlAttribute,
}

/// A created OpenGL vertex buffer: a buffer object, or client memory when
/// buffer objects are unavailable.
pub struct GlStream {
    id: u64,
    name: u32,
    stride: u32,
    usage: u32,
    size: usize,
    attributes: Vec<GlAttribute>,
    client: Option<RwLock<Vec<u8>>>,
    device: Arc<dyn GlDevice>,
}

impl GlStream {
    /// Buffer object name; zero for client-side data.
    pub fn name(&self) -> u32 {
        self.name
    }

    /// Whether the data lives in client memory.
    pub fn is_client_side(&self) -> bool {
        self.client.is_some()
    }

    /// Attributes with offsets within one vertex.
    pub fn attributes(&self) -> &[GlAttribute] {
        &self.attributes
    }
}

impl StreamSource for GlStream {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn stride(&self) -> u32 {
        self.stride
    }
}

impl Drop for GlStream {
    fn drop(&mut self) {
        if self.name != 0 {
            log::trace!("OpenGL: deleting buffer {}", self.name);
            self.device.delete_buffer(self.name);
        }
    }
}

impl fmt::Debug for GlStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlStream")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("stride", &self.stride)
            .field("client_side", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

/// OpenGL per-context state.
#[derive(Default)]
pub struct GlContextState {
    layouts: LayoutCache<Arc<[GlAttributeBinding]>>,
    enabled: u64,
    program: u32,
    attributes: Option<Arc<AttributeLocations>>,
}

impl GlContextState {
    /// Currently active program; zero for none.
    pub fn active_program(&self) -> u32 {
        self.program
    }

    /// Bitmask of enabled vertex attribute arrays.
    pub fn enabled_attributes(&self) -> u64 {
        self.enabled
    }

    pub(crate) fn set_program(
        &mut self,
        program: u32,
        attributes: Option<Arc<AttributeLocations>>,
    ) {
        self.program = program;
        self.attributes = attributes;
    }

    fn location(&self, semantic: SemanticKind, index: u32) -> Option<u32> {
        match &self.attributes {
            Some(locations) => locations.location(semantic, index),
            None => Some(semantic.attribute_base() + index),
        }
    }
}

impl BackendState for GlContextState {
    fn layout_rebuilds(&self) -> u64 {
        self.layouts.rebuilds()
    }
}

/// OpenGL half of a vertex buffer.
pub struct OpenGlVertexBuffer {
    device: Arc<dyn GlDevice>,
    source: Option<Arc<GlStream>>,
}

pub(super) fn primitive_mode(topology: PrimitiveTopology) -> Option<u32> {
    match topology {
        PrimitiveTopology::PointList => Some(GL_POINTS),
        PrimitiveTopology::LineList => Some(GL_LINES),
        PrimitiveTopology::LineStrip => Some(GL_LINE_STRIP),
        PrimitiveTopology::TriangleList => Some(GL_TRIANGLES),
        PrimitiveTopology::TriangleStrip => Some(GL_TRIANGLE_STRIP),
        PrimitiveTopology::Undefined => None,
    }
}

fn map_access(access: MapAccess) -> u32 {
    match (access.contains(MapAccess::READ), access.is_write()) {
        (true, true) => GL_READ_WRITE,
        (false, true) => GL_WRITE_ONLY,
        _ => GL_READ_ONLY,
    }
}

fn translate(base: &VertexBufferBase<'_>) -> Result<Vec<GlAttribute>, GraphicsError> {
    base.elements()
        .iter()
        .map(|element| {
            let format = element.format.format().gl.ok_or_else(|| {
                GraphicsError::FeatureNotSupported(format!(
                    "{:?} vertex elements on OpenGL",
                    element.format
                ))
            })?;
            Ok(GlAttribute {
                semantic: element.semantic,
                semantic_index: element.semantic_index,
                format,
                offset: element.offset,
            })
        })
        .collect()
}

impl OpenGlVertexBuffer {
    fn bindings(
        &self,
        state: &mut GlContextState,
        resolved: &ResolvedStreams<GlStream>,
    ) -> Arc<[GlAttributeBinding]> {
        if let Some(bindings) = state.layouts.lookup(&resolved.ids) {
            return Arc::clone(bindings);
        }
        let bindings: Arc<[GlAttributeBinding]> = resolved
            .bound()
            .flat_map(|stream| {
                let slot = stream.slot;
                stream
                    .source
                    .attributes
                    .iter()
                    .map(move |&attribute| GlAttributeBinding { slot, attribute })
            })
            .collect();
        log::debug!(
            "OpenGL: rebuilt {} attribute bindings for streams {}",
            bindings.len(),
            describe_ids(&resolved.ids)
        );
        Arc::clone(state.layouts.store(resolved.ids.clone(), bindings))
    }

    fn apply(
        &self,
        state: &mut GlContextState,
        resolved: &ResolvedStreams<GlStream>,
        bindings: &[GlAttributeBinding],
    ) {
        let mut wanted = 0u64;
        for binding in bindings {
            let Some(Some(stream)) = resolved.streams.get(binding.slot as usize) else {
                continue;
            };
            let attribute = &binding.attribute;
            let Some(location) = state.location(attribute.semantic, attribute.semantic_index)
            else {
                continue;
            };
            if location < u64::BITS {
                wanted |= 1 << location;
            }

            let offset = stream.offset as usize + attribute.offset as usize;
            match &stream.source.client {
                Some(client) => {
                    let data = client.read();
                    let data = data.get(offset..).unwrap_or_default();
                    self.device.vertex_attrib_pointer(
                        location,
                        attribute.format,
                        stream.source.stride,
                        GlAttribSource::Client(data),
                    );
                }
                None => self.device.vertex_attrib_pointer(
                    location,
                    attribute.format,
                    stream.source.stride,
                    GlAttribSource::Buffer {
                        name: stream.source.name,
                        offset,
                    },
                ),
            }
        }

        let changed = wanted ^ state.enabled;
        for location in 0..u64::BITS {
            let bit = 1u64 << location;
            if changed & bit == 0 {
                continue;
            }
            if wanted & bit != 0 {
                self.device.enable_vertex_attrib_array(location);
            } else {
                self.device.disable_vertex_attrib_array(location);
            }
        }
        state.enabled = wanted;
    }

    fn bind_streams(&self, ctx: &mut RenderContext<Self>) {
        let resolved = ctx.resolve_streams();
        let state = ctx.state_mut();
        let bindings = self.bindings(state, &resolved);
        self.apply(state, &resolved, &bindings);
    }

    /// Draw `total_primitives` primitives through `indices`.
    pub fn render_indexed(
        &mut self,
        ctx: &mut RenderContext<Self>,
        indices: &GlIndexBuffer,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        let mode = primitive_mode(indices.base().topology()).ok_or_else(|| {
            GraphicsError::InvalidParameter("cannot draw an undefined topology".to_string())
        })?;
        self.bind_streams(ctx);
        if total_primitives == 0 {
            return Ok(());
        }
        let count = indices
            .base()
            .topology()
            .vertex_count(total_primitives)
            .min(indices.base().count());
        log::trace!("OpenGL: drawing {count} indices");
        indices.draw(mode, count);
        Ok(())
    }
}

impl VertexBufferApi for OpenGlVertexBuffer {
    type Device = dyn GlDevice;
    type Source = GlStream;
    type ContextState = GlContextState;

    const NAME: &'static str = "OpenGL";

    fn new(device: Arc<dyn GlDevice>) -> Self {
        Self {
            device,
            source: None,
        }
    }

    fn device(&self) -> &Arc<dyn GlDevice> {
        &self.device
    }

    fn create_api(&mut self, base: &VertexBufferBase<'_>) -> Result<(), GraphicsError> {
        self.reset_api();

        let attributes = translate(base)?;
        let data = base.data().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has no data to upload".to_string())
        })?;
        let usage = buffer_usage(base.usage());

        let (name, client) =
            match create_buffer_object(&*self.device, GL_ARRAY_BUFFER, data, usage) {
                Some(name) => (name, None),
                None => {
                    let mut copy = Vec::new();
                    copy.try_reserve_exact(data.len())
                        .map_err(|_| GraphicsError::OutOfMemory)?;
                    copy.extend_from_slice(data);
                    (0, Some(RwLock::new(copy)))
                }
            };
        log::debug!(
            "OpenGL: created vertex buffer {} ({} bytes{})",
            name,
            data.len(),
            if client.is_some() { ", client-side" } else { "" }
        );

        self.source = Some(Arc::new(GlStream {
            id: next_resource_id(),
            name,
            stride: base.stride(),
            usage,
            size: data.len(),
            attributes,
            client,
            device: Arc::clone(&self.device),
        }));
        Ok(())
    }

    fn reset_api(&mut self) {
        self.source = None;
    }

    fn source(&self) -> Option<&Arc<GlStream>> {
        self.source.as_ref()
    }

    fn map(
        &mut self,
        _base: &VertexBufferBase<'_>,
        access: MapAccess,
    ) -> Option<VertexBufferMapping> {
        let source = self.source.as_ref()?;
        if let Some(client) = &source.client {
            let data = if access.contains(MapAccess::DISCARD) {
                vec![0; source.size]
            } else {
                client.read().clone()
            };
            return Some(VertexBufferMapping::new(data, access));
        }

        let _upload = GL_UPLOAD_LOCK.lock();
        self.device.bind_buffer(GL_ARRAY_BUFFER, source.name);
        if access.contains(MapAccess::DISCARD) {
            self.device
                .buffer_data(GL_ARRAY_BUFFER, source.size, None, source.usage);
        }
        let data = self.device.map_buffer(GL_ARRAY_BUFFER, map_access(access));
        self.device.bind_buffer(GL_ARRAY_BUFFER, 0);
        Some(VertexBufferMapping::new(data?, access))
    }

    fn unmap(&mut self, mapping: &VertexBufferMapping) {
        let Some(source) = &self.source else {
            return;
        };
        let written = mapping.access().is_write().then(|| mapping.as_slice());
        if let Some(client) = &source.client {
            if let Some(written) = written {
                let mut data = client.write();
                let len = data.len().min(written.len());
                data[..len].copy_from_slice(&written[..len]);
            }
            return;
        }

        let _upload = GL_UPLOAD_LOCK.lock();
        self.device.bind_buffer(GL_ARRAY_BUFFER, source.name);
        if !self.device.unmap_buffer(GL_ARRAY_BUFFER, written) {
            log::warn!("OpenGL: buffer {} contents lost during unmap", source.name);
        }
        self.device.bind_buffer(GL_ARRAY_BUFFER, 0);
    }

    fn end_render_api(&mut self, ctx: &mut RenderContext<Self>) {
        let state = ctx.state_mut();
        for location in 0..u64::BITS {
            if state.enabled & (1 << location) != 0 {
                self.device.disable_vertex_attrib_array(location);
            }
        }
        state.enabled = 0;
    }

    fn render_api(
        &mut self,
        base: &VertexBufferBase<'_>,
        ctx: &mut RenderContext<Self>,
        start_vertex: u32,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        let mode = primitive_mode(base.topology()).ok_or_else(|| {
            GraphicsError::InvalidParameter("cannot draw an undefined topology".to_string())
        })?;
        self.bind_streams(ctx);

        if total_primitives == 0 {
            return Ok(());
        }
        let count = base.topology().vertex_count(total_primitives);
        log::trace!("OpenGL: drawing {count} vertices from {start_vertex}");
        self.device.draw_arrays(mode, start_vertex, count);
        Ok(())
    }
}

impl fmt::Debug for OpenGlVertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenGlVertexBuffer")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
