//! OpenGL index buffer.

use std::fmt;
use std::sync::Arc;

use crate::error::GraphicsError;
use crate::vertex::{IndexBufferBase, IndexFormat};

use super::native::*;
use super::{create_buffer_object, GlAttribSource, GlDevice};

/// Index buffer in a buffer object, or in client memory when buffer objects
/// are unavailable.
pub struct GlIndexBuffer {
    device: Arc<dyn GlDevice>,
    base: IndexBufferBase,
    name: u32,
}

impl GlIndexBuffer {
    /// Upload `base` to a new element array buffer.
    ///
    /// Never fails because of the driver: a GL error while creating the buffer
    /// object leaves the indices client-side.
    pub fn new(device: Arc<dyn GlDevice>, base: IndexBufferBase) -> Result<Self, GraphicsError> {
        let name = create_buffer_object(
            &*device,
            GL_ELEMENT_ARRAY_BUFFER,
            base.data(),
            GL_STATIC_DRAW,
        )
        .unwrap_or(0);
        log::debug!(
            "OpenGL: created index buffer {} ({} indices{})",
            name,
            base.count(),
            if name == 0 { ", client-side" } else { "" }
        );
        Ok(Self { device, base, name })
    }

    /// Backend-independent state.
    pub fn base(&self) -> &IndexBufferBase {
        &self.base
    }

    /// Buffer object name; zero for client-side indices.
    pub fn name(&self) -> u32 {
        self.name
    }

    /// Whether the indices live in client memory.
    pub fn is_client_side(&self) -> bool {
        self.name == 0
    }

    fn index_type(&self) -> u32 {
        match self.base.format() {
            IndexFormat::U16 => GL_UNSIGNED_SHORT,
            IndexFormat::U32 => GL_UNSIGNED_INT,
        }
    }

    pub(super) fn draw(&self, mode: u32, count: u32) {
        let indices = if self.is_client_side() {
            GlAttribSource::Client(self.base.data())
        } else {
            GlAttribSource::Buffer {
                name: self.name,
                offset: 0,
            }
        };
        self.device
            .draw_elements(mode, count, self.index_type(), indices);
    }
}

impl Drop for GlIndexBuffer {
    fn drop(&mut self) {
        if self.name != 0 {
            self.device.delete_buffer(self.name);
        }
    }
}

impl fmt::Debug for GlIndexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlIndexBuffer")
            .field("name", &self.name)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyCall, DummyConfig, DummyDevice};
    use crate::types::PrimitiveTopology;
    use crate::vertex::IndexSource;

    fn indices() -> IndexBufferBase {
        IndexBufferBase::new(IndexSource::U16(&[0, 1, 2]), PrimitiveTopology::TriangleList).unwrap()
    }

    #[test]
    fn test_uploads_to_buffer_object() {
        let dummy = DummyDevice::new();
        let buffer = GlIndexBuffer::new(dummy.clone(), indices()).unwrap();
        assert!(!buffer.is_client_side());
        assert_eq!(
            dummy.buffer_contents(u64::from(buffer.name())),
            Some(buffer.base().data().to_vec())
        );

        let name = u64::from(buffer.name());
        drop(buffer);
        assert!(!dummy.is_live(name));
    }

    #[test]
    fn test_gl_error_falls_back_to_client_indices() {
        let dummy = DummyDevice::with_config(DummyConfig {
            gl_buffer_error: true,
            ..DummyConfig::default()
        });
        let buffer = GlIndexBuffer::new(dummy.clone(), indices()).unwrap();
        assert!(buffer.is_client_side());

        buffer.draw(GL_TRIANGLES, 3);
        assert_eq!(
            dummy.count(|call| matches!(call, DummyCall::DrawIndexed { count: 3, client: true })),
            1
        );
    }
}
