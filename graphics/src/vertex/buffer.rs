//! Vertex buffer facade.

use std::sync::Arc;

use crate::backend::{ActiveBackend, RenderContext, StreamSource, VertexBufferApi};
use crate::error::GraphicsError;
use crate::types::{MapAccess, PrimitiveTopology, VertexBufferUsage, VertexElementDescriptor};

use super::base::{VertexBufferBase, VertexBufferMapping, VertexSource};

/// Vertex buffer on the backend selected by Cargo features.
pub type ActiveVertexBuffer<'a> = VertexBuffer<'a, ActiveBackend>;

/// A vertex buffer: backend-independent state plus its native resource.
///
/// `'a` bounds data borrowed with [`VertexSource::Borrow`].
///
/// # Example
///
/// ```ignore
/// let mut buffer = VertexBuffer::<OpenGlVertexBuffer>::new(device);
/// buffer.create_vertex_buffer(
///     VertexSource::Copy(bytes),
///     &[VertexElementDescriptor::position()],
///     12,
///     3,
///     VertexBufferUsage::Static,
///     PrimitiveTopology::TriangleList,
/// )?;
/// buffer.set_stream(&mut ctx, 0, 0)?;
/// buffer.render(&mut ctx, 0, 1)?;
/// ```
#[derive(Debug)]
pub struct VertexBuffer<'a, A: VertexBufferApi> {
    base: VertexBufferBase<'a>,
    api: A,
}

impl<'a, A: VertexBufferApi> VertexBuffer<'a, A> {
    /// Create an empty vertex buffer on `device`.
    pub fn new(device: Arc<A::Device>) -> Self {
        Self {
            base: VertexBufferBase::new(),
            api: A::new(device),
        }
    }

    /// Create the buffer from `source`, replacing any previous contents.
    ///
    /// On failure the buffer is left empty. Set-only buffers drop their owned
    /// CPU copy once the native resource holds the data, unless the backend
    /// needs it to recover from device loss.
    pub fn create_vertex_buffer(
        &mut self,
        source: VertexSource<'_, 'a>,
        elements: &[VertexElementDescriptor],
        stride: u32,
        element_count: u32,
        usage: VertexBufferUsage,
        topology: PrimitiveTopology,
    ) -> Result<(), GraphicsError> {
        self.reset();

        let result = self
            .base
            .configure(source, elements, stride, element_count, usage, topology)
            .and_then(|()| self.api.create_api(&self.base));
        if let Err(err) = result {
            log::error!("{}: vertex buffer creation failed: {err}", A::NAME);
            self.reset();
            return Err(err);
        }

        if usage.is_set_only() && !self.api.retains_cpu_copy() {
            self.base.discard_cpu_copy();
        }
        log::debug!(
            "{}: vertex buffer {} holds {element_count} vertices of {stride} bytes ({} primitives)",
            A::NAME,
            self.base.id(),
            self.base.primitive_count()
        );
        Ok(())
    }

    /// Release the native resource and return to the empty state. Idempotent.
    ///
    /// Stream slots bound to this buffer become unreachable.
    pub fn reset(&mut self) {
        self.api.reset_api();
        self.base.reset();
    }

    /// Bind this buffer to `stream`, starting `element_offset` vertices in.
    pub fn set_stream(
        &self,
        ctx: &mut RenderContext<A>,
        stream: usize,
        element_offset: u32,
    ) -> Result<(), GraphicsError> {
        let source = self.api.source().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has not been created".to_string())
        })?;
        let offset = element_offset
            .checked_mul(self.base.stride())
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "element offset {element_offset} overflows"
                ))
            })?;
        ctx.set_stream(stream, source, offset)
    }

    /// Clear every stream slot of `ctx` bound to this buffer.
    pub fn unbind(&self, ctx: &mut RenderContext<A>) -> usize {
        self.resource_id().map_or(0, |id| ctx.release(id))
    }

    /// Map the native buffer. `None` when there is no native resource or the
    /// native map fails.
    pub fn map(&mut self, access: MapAccess) -> Option<VertexBufferMapping> {
        self.api.map(&self.base, access)
    }

    /// Finish a mapping. Written bytes also refresh the owned CPU copy.
    pub fn unmap(&mut self, mapping: VertexBufferMapping) {
        self.api.unmap(&mapping);
        if mapping.access().is_write() {
            if let Some(data) = self.base.data_mut() {
                let len = data.len().min(mapping.len());
                data[..len].copy_from_slice(&mapping.as_slice()[..len]);
            }
        }
    }

    /// Start a render pass.
    pub fn prepare_to_render(&mut self, ctx: &mut RenderContext<A>) {
        self.api.prepare_to_render_api(ctx);
    }

    /// End a render pass.
    pub fn end_render(&mut self, ctx: &mut RenderContext<A>) {
        self.api.end_render_api(ctx);
    }

    /// Draw `total_primitives` primitives of every active stream.
    ///
    /// Must be called on the buffer bound to stream 0. Zero primitives binds
    /// the streams without drawing.
    pub fn render(
        &mut self,
        ctx: &mut RenderContext<A>,
        start_vertex: u32,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        self.check_stream_zero(ctx)?;
        self.api
            .render_api(&self.base, ctx, start_vertex, total_primitives)
    }

    pub(crate) fn check_stream_zero(&self, ctx: &RenderContext<A>) -> Result<(), GraphicsError> {
        let id = self.resource_id().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has not been created".to_string())
        })?;
        if ctx.stream_resource_id(0) != Some(id) {
            return Err(GraphicsError::InvalidParameter(
                "render must go through the buffer bound to stream 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend-independent state.
    pub fn base(&self) -> &VertexBufferBase<'a> {
        &self.base
    }

    /// Backend state.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Both halves at once.
    pub fn split_mut(&mut self) -> (&VertexBufferBase<'a>, &mut A) {
        (&self.base, &mut self.api)
    }

    /// ID of the current native resource.
    pub fn resource_id(&self) -> Option<u64> {
        self.api.source().map(|source| source.resource_id())
    }

    /// Whether a native resource exists.
    pub fn is_created(&self) -> bool {
        self.api.source().is_some()
    }

    /// Number of primitives in the buffer.
    pub fn primitive_count(&self) -> u32 {
        self.base.primitive_count()
    }
}

impl<'a> VertexBuffer<'a, crate::backend::opengl::OpenGlVertexBuffer> {
    /// Draw `total_primitives` primitives through an index buffer.
    pub fn render_indexed(
        &mut self,
        ctx: &mut RenderContext<crate::backend::opengl::OpenGlVertexBuffer>,
        indices: &crate::backend::opengl::GlIndexBuffer,
        total_primitives: u32,
    ) -> Result<(), GraphicsError> {
        self.check_stream_zero(ctx)?;
        self.api.render_indexed(ctx, indices, total_primitives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCall, DummyDevice};
    use crate::backend::opengl::OpenGlVertexBuffer;

    fn triangle() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        bytemuck::cast_slice(&positions).to_vec()
    }

    fn create<'a>(
        dummy: &Arc<DummyDevice>,
        source: VertexSource<'_, 'a>,
        usage: VertexBufferUsage,
    ) -> VertexBuffer<'a, OpenGlVertexBuffer> {
        let mut buffer = VertexBuffer::<OpenGlVertexBuffer>::new(dummy.clone());
        buffer
            .create_vertex_buffer(
                source,
                &[VertexElementDescriptor::position()],
                12,
                3,
                usage,
                PrimitiveTopology::TriangleList,
            )
            .unwrap();
        buffer
    }

    #[test]
    fn test_failed_creation_resets() {
        let dummy = DummyDevice::new();
        let mut buffer = VertexBuffer::<OpenGlVertexBuffer>::new(dummy.clone());
        let result = buffer.create_vertex_buffer(
            VertexSource::Reserve,
            &[VertexElementDescriptor::position()],
            12,
            0,
            VertexBufferUsage::Static,
            PrimitiveTopology::TriangleList,
        );
        assert!(result.is_err());
        assert!(!buffer.is_created());
        assert!(!buffer.base().is_configured());
        assert_eq!(dummy.live_resources(), 0);
    }

    #[test]
    fn test_recreate_releases_previous_resource() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Standard);
        let first = buffer.resource_id();
        buffer
            .create_vertex_buffer(
                VertexSource::Copy(&bytes),
                &[VertexElementDescriptor::position()],
                12,
                3,
                VertexBufferUsage::Standard,
                PrimitiveTopology::TriangleList,
            )
            .unwrap();
        assert_ne!(buffer.resource_id(), first);
        assert_eq!(dummy.live_resources(), 1);
    }

    #[test]
    fn test_set_only_owned_buffer_discards_cpu_copy() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Static);
        assert!(!buffer.base().has_cpu_copy());

        let buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Dynamic);
        assert!(buffer.base().has_cpu_copy());
    }

    #[test]
    fn test_borrowed_buffer_keeps_reference() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut buffer = create(&dummy, VertexSource::Borrow(&bytes), VertexBufferUsage::Static);
        assert!(buffer.base().is_borrowed());
        assert_eq!(buffer.base().data().unwrap().as_ptr(), bytes.as_ptr());

        buffer.reset();
        buffer.reset();
        assert_eq!(bytes, triangle());
    }

    #[test]
    fn test_unmap_refreshes_owned_copy() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Dynamic);
        let mut mapping = buffer.map(MapAccess::WRITE).unwrap();
        mapping.as_mut_slice()[..4].copy_from_slice(&5.0f32.to_ne_bytes());
        buffer.unmap(mapping);
        assert_eq!(&buffer.base().data().unwrap()[..4], &5.0f32.to_ne_bytes());
    }

    #[test]
    fn test_unmap_never_writes_borrowed_data() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut buffer = create(&dummy, VertexSource::Borrow(&bytes), VertexBufferUsage::Dynamic);
        let mut mapping = buffer.map(MapAccess::WRITE).unwrap();
        mapping.as_mut_slice().fill(0xFF);
        buffer.unmap(mapping);
        drop(buffer);
        assert_eq!(bytes, triangle());
    }

    #[test]
    fn test_map_without_resource_fails() {
        let dummy = DummyDevice::new();
        let mut buffer = VertexBuffer::<OpenGlVertexBuffer>::new(dummy);
        assert!(buffer.map(MapAccess::READ).is_none());
    }

    #[test]
    fn test_render_requires_stream_zero() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut a = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Static);
        let mut b = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Static);
        let mut ctx = RenderContext::new();
        a.set_stream(&mut ctx, 0, 0).unwrap();
        b.set_stream(&mut ctx, 1, 0).unwrap();

        assert!(b.render(&mut ctx, 0, 1).is_err());
        a.render(&mut ctx, 0, 1).unwrap();
        assert_eq!(dummy.draws(), 1);
    }

    #[test]
    fn test_set_stream_uses_byte_offset() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let mut buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Static);
        let mut ctx = RenderContext::new();
        buffer.set_stream(&mut ctx, 0, 2).unwrap();
        buffer.render(&mut ctx, 0, 0).unwrap();
        assert_eq!(
            dummy.count(|call| matches!(call, DummyCall::AttributePointer { offset: 24, .. })),
            1
        );
        assert!(buffer.set_stream(&mut ctx, 16, 0).is_err());
    }

    #[test]
    fn test_unbind() {
        let dummy = DummyDevice::new();
        let bytes = triangle();
        let buffer = create(&dummy, VertexSource::Copy(&bytes), VertexBufferUsage::Static);
        let mut ctx = RenderContext::new();
        buffer.set_stream(&mut ctx, 0, 0).unwrap();
        buffer.set_stream(&mut ctx, 3, 0).unwrap();
        assert_eq!(ctx.active_streams(), 4);
        assert_eq!(buffer.unbind(&mut ctx), 2);
        assert_eq!(ctx.active_streams(), 0);
    }
}
