//! Metal vertex buffer.

use std::fmt;
use std::sync::Arc;

use crate::backend::context::{BackendState, LayoutCache, RenderContext};
use crate::backend::{describe_ids, NativeHandle, StreamSource, VertexBufferApi};
use crate::error::GraphicsError;
use crate::types::{MapAccess, PrimitiveTopology, VertexBufferUsage};
use crate::vertex::{next_resource_id, VertexBufferBase, VertexBufferMapping};

use super::native::*;
use super::{MetalDevice, MetalVertexAttribute, MetalVertexBufferLayout};

/// A created Metal buffer.
pub struct MetalStream {
    id: u64,
    handle: NativeHandle,
    stride: u32,
    attributes: Vec<MetalVertexAttribute>,
    device: Arc<dyn MetalDevice>,
}

impl MetalStream {
    /// Native buffer handle.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }
}

impl StreamSource for MetalStream {
    fn resource_id(&self) -> u64 {
        self.id
    }

    fn stride(&self) -> u32 {
        self.stride
    }
}

impl Drop for MetalStream {
    fn drop(&mut self) {
        self.device.release_buffer(self.handle);
    }
}

impl fmt::Debug for MetalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetalStream")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// A vertex descriptor covering every active stream.
pub struct MetalVertexDescriptor {
    handle: NativeHandle,
    device: Arc<dyn MetalDevice>,
}

impl Drop for MetalVertexDescriptor {
    fn drop(&mut self) {
        self.device.release_vertex_descriptor(self.handle);
    }
}

/// Metal per-context state.
#[derive(Default)]
pub struct MetalContextState {
    descriptors: LayoutCache<MetalVertexDescriptor>,
    bound_descriptor: Option<NativeHandle>,
}

impl BackendState for MetalContextState {
    fn layout_rebuilds(&self) -> u64 {
        self.descriptors.rebuilds()
    }
}

/// Metal half of a vertex buffer.
pub struct MetalVertexBuffer {
    device: Arc<dyn MetalDevice>,
    source: Option<Arc<MetalStream>>,
    options: u32,
}

impl MetalVertexBuffer {
    /// Resource options the buffer was created with.
    pub fn resource_options(&self) -> u32 {
        self.options
    }
}

fn resource_options(usage: VertexBufferUsage) -> u32 {
    match usage {
        VertexBufferUsage::Static => MTL_RESOURCE_STORAGE_MODE_MANAGED,
        VertexBufferUsage::Standard => MTL_RESOURCE_STORAGE_MODE_SHARED,
        VertexBufferUsage::Dynamic => {
            MTL_RESOURCE_STORAGE_MODE_SHARED | MTL_RESOURCE_CPU_CACHE_MODE_WRITE_COMBINED
        }
    }
}

fn primitive_type(topology: PrimitiveTopology) -> Option<u32> {
    match topology {
        PrimitiveTopology::PointList => Some(MTL_PRIMITIVE_TYPE_POINT),
        PrimitiveTopology::LineList => Some(MTL_PRIMITIVE_TYPE_LINE),
        PrimitiveTopology::LineStrip => Some(MTL_PRIMITIVE_TYPE_LINE_STRIP),
        PrimitiveTopology::TriangleList => Some(MTL_PRIMITIVE_TYPE_TRIANGLE),
        PrimitiveTopology::TriangleStrip => Some(MTL_PRIMITIVE_TYPE_TRIANGLE_STRIP),
        PrimitiveTopology::Undefined => None,
    }
}

fn translate(base: &VertexBufferBase<'_>) -> Result<Vec<MetalVertexAttribute>, GraphicsError> {
    base.elements()
        .iter()
        .map(|element| {
            let format = element.format.format().metal.ok_or_else(|| {
                GraphicsError::FeatureNotSupported(format!(
                    "{:?} vertex elements on Metal",
                    element.format
                ))
            })?;
            Ok(MetalVertexAttribute {
                index: element.semantic.attribute_base() + element.semantic_index,
                format,
                offset: element.offset,
                buffer_index: 0,
            })
        })
        .collect()
}

impl VertexBufferApi for MetalVertexBuffer {
    type Device = dyn MetalDevice;
    type Source = MetalStream;
    type ContextState = MetalContextState;

    const NAME: &'static str = "Metal";

    fn new(device: Arc<dyn MetalDevice>) -> Self {
        Self {
            device,
            source: None,
            options: 0,
        }
    }

    fn device(&self) -> &Arc<dyn MetalDevice> {
        &self.device
    }

    fn create_api(&mut self, base: &VertexBufferBase<'_>) -> Result<(), GraphicsError> {
        self.reset_api();

        let attributes = translate(base)?;
        let data = base.data().ok_or_else(|| {
            GraphicsError::InvalidParameter("vertex buffer has no data to upload".to_string())
        })?;
        let options = resource_options(base.usage());
        let handle = self.device.new_buffer(data, options)?;
        log::debug!(
            "Metal: created buffer {:?} ({} bytes, options {options:#x})",
            handle,
            data.len()
        );

        self.source = Some(Arc::new(MetalStream {
            id: next_resource_id(),
            handle,
            stride: base.stride(),
            attributes,
            device: Arc::clone(&self.device),
        }));
        self.options = options;
        Ok(())
    }

    fn reset_api(&mut self) {
        self.source = None;
    }

    fn source(&self) -> Option<&Arc<MetalStream>> {
        self.source.as_ref()
    }

    fn map(
        &mut self,
        _base: &VertexBufferBase<'_>,
        access: MapAccess,
    ) -> Option<VertexBufferMapping> {
        let source = self.source.as_ref()?;
        let data = if access.contains(MapAccess::DISCARD) {
            vec![0; self.device.buffer_contents(source.handle)?.len()]
        } else {
            self.device.buffer_contents(source.handle)?
        };
        Some(VertexBufferMapping::new(data, access))
    }

    fn unmap(&mut self, mapping: &VertexBufferMapping) {
        if let Some(source) = &self.source {
            if mapping.access().is_write() {
                self.device.did_modify_range(source.handle, mapping.as_slice());
            }
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

        let cached = state
            .descriptors
            .lookup(&resolved.ids)
            .map(|descriptor| descriptor.handle);
        let descriptor = match cached {
            Some(handle) => handle,
            None => {
                let attributes: Vec<MetalVertexAttribute> = resolved
                    .bound()
                    .flat_map(|stream| {
                        let slot = stream.slot;
                        stream.source.attributes.iter().map(move |attribute| {
                            MetalVertexAttribute {
                                buffer_index: slot,
                                ..*attribute
                            }
                        })
                    })
                    .collect();
                let layouts: Vec<MetalVertexBufferLayout> = resolved
                    .bound()
                    .map(|stream| MetalVertexBufferLayout {
                        buffer_index: stream.slot,
                        stride: stream.source.stride,
                        step_function: MTL_VERTEX_STEP_FUNCTION_PER_VERTEX,
                    })
                    .collect();
                let handle = self.device.new_vertex_descriptor(&attributes, &layouts)?;
                log::debug!(
                    "Metal: built vertex descriptor {:?} for streams {}",
                    handle,
                    describe_ids(&resolved.ids)
                );
                let descriptor = MetalVertexDescriptor {
                    handle,
                    device: Arc::clone(&self.device),
                };
                state
                    .descriptors
                    .store(resolved.ids.clone(), descriptor)
                    .handle
            }
        };
        if state.bound_descriptor != Some(descriptor) {
            self.device.set_vertex_descriptor(descriptor);
            state.bound_descriptor = Some(descriptor);
        }

        for (slot, stream) in resolved.streams.iter().enumerate() {
            match stream {
                Some(stream) => {
                    self.device
                        .set_vertex_buffer(Some(stream.source.handle), stream.offset, slot as u32)
                }
                None => self.device.set_vertex_buffer(None, 0, slot as u32),
            }
        }

        if total_primitives == 0 {
            return Ok(());
        }
        let vertex_count = base.topology().vertex_count(total_primitives);
        log::trace!("Metal: drawing {vertex_count} vertices from {start_vertex}");
        self.device
            .draw_primitives(primitive, start_vertex, vertex_count);
        Ok(())
    }
}

impl fmt::Debug for MetalVertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetalVertexBuffer")
            .field("source", &self.source)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyDevice;
    use crate::types::{SemanticKind, VertexElementDescriptor, VertexElementType};
    use crate::vertex::{VertexBuffer, VertexSource};

    #[test]
    fn test_resource_options() {
        assert_eq!(
            resource_options(VertexBufferUsage::Static),
            MTL_RESOURCE_STORAGE_MODE_MANAGED
        );
        let write_combined = MTL_RESOURCE_CPU_CACHE_MODE_WRITE_COMBINED;
        assert_eq!(
            resource_options(VertexBufferUsage::Dynamic) & write_combined,
            write_combined
        );
    }

    #[test]
    fn test_attribute_indices_follow_semantics() {
        let dummy = DummyDevice::new();
        let mut buffer = VertexBuffer::<MetalVertexBuffer>::new(dummy.clone());
        buffer
            .create_vertex_buffer(
                VertexSource::Reserve,
                &[
                    VertexElementDescriptor::position(),
                    VertexElementDescriptor::texcoord(1),
                ],
                20,
                4,
                VertexBufferUsage::Standard,
                PrimitiveTopology::PointList,
            )
            .unwrap();
        let source = buffer.api().source().unwrap();
        let indices: Vec<u32> = source.attributes.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![0, SemanticKind::TexCoord.attribute_base() + 1]);
        assert_eq!(source.attributes[1].offset, 12);
    }

    #[test]
    fn test_udec3_is_unsupported() {
        let dummy = DummyDevice::new();
        let mut buffer = VertexBuffer::<MetalVertexBuffer>::new(dummy.clone());
        let result = buffer.create_vertex_buffer(
            VertexSource::Reserve,
            &[VertexElementDescriptor::new(
                VertexElementType::UDec3,
                SemanticKind::Normal,
                0,
            )],
            4,
            4,
            VertexBufferUsage::Standard,
            PrimitiveTopology::PointList,
        );
        assert!(matches!(result, Err(GraphicsError::FeatureNotSupported(_))));
        assert!(buffer.resource_id().is_none());
    }

    #[test]
    fn test_discard_map_starts_zeroed() {
        let dummy = DummyDevice::new();
        let bytes = vec![7u8; 48];
        let mut buffer = VertexBuffer::<MetalVertexBuffer>::new(dummy.clone());
        buffer
            .create_vertex_buffer(
                VertexSource::Copy(&bytes),
                &[VertexElementDescriptor::position()],
                12,
                4,
                VertexBufferUsage::Dynamic,
                PrimitiveTopology::PointList,
            )
            .unwrap();
        let mapping = buffer.map(MapAccess::WRITE | MapAccess::DISCARD).unwrap();
        assert!(mapping.as_slice().iter().all(|&b| b == 0));
        buffer.unmap(mapping);
    }
}
