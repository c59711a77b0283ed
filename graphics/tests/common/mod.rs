//! Common utilities for vertex buffer integration tests.
//!
//! Every backend runs against the recording [`DummyDevice`], so the same
//! checks can be reused across Direct3D 9, Direct3D 11, OpenGL and Metal.

#![allow(dead_code)]

use std::sync::Arc;

use lspiro_graphics::backend::dummy::{DummyBacked, DummyDevice};
use lspiro_graphics::types::{PrimitiveTopology, VertexBufferUsage, VertexElementDescriptor};
use lspiro_graphics::vertex::{VertexBuffer, VertexSource};

/// Backends available for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Direct3d9,
    Direct3d11,
    OpenGl,
    Metal,
}

/// Route test output through `log` once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Three positions forming one triangle.
pub static TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];

/// Byte view of [`TRIANGLE`].
pub fn triangle_bytes() -> &'static [u8] {
    bytemuck::cast_slice(TRIANGLE.as_slice())
}

/// Two-component texture coordinates for [`TRIANGLE`].
pub static TRIANGLE_UV: [[f32; 2]; 3] = [[0.5, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// An empty vertex buffer on `dummy` for backend `A`.
pub fn empty_buffer<A: DummyBacked>(dummy: &Arc<DummyDevice>) -> VertexBuffer<'static, A> {
    VertexBuffer::new(A::dummy_device(dummy))
}

/// A triangle buffer holding positions only.
pub fn position_buffer<A: DummyBacked>(
    dummy: &Arc<DummyDevice>,
    usage: VertexBufferUsage,
) -> VertexBuffer<'static, A> {
    let mut buffer = empty_buffer::<A>(dummy);
    buffer
        .create_vertex_buffer(
            VertexSource::Copy(triangle_bytes()),
            &[VertexElementDescriptor::position()],
            12,
            3,
            usage,
            PrimitiveTopology::TriangleList,
        )
        .unwrap();
    buffer
}

/// A triangle buffer holding texture coordinates only, for a second stream.
pub fn texcoord_buffer<A: DummyBacked>(dummy: &Arc<DummyDevice>) -> VertexBuffer<'static, A> {
    let mut buffer = empty_buffer::<A>(dummy);
    buffer
        .create_vertex_buffer(
            VertexSource::Copy(bytemuck::cast_slice(TRIANGLE_UV.as_slice())),
            &[VertexElementDescriptor::texcoord(0)],
            8,
            3,
            VertexBufferUsage::Static,
            PrimitiveTopology::TriangleList,
        )
        .unwrap();
    buffer
}
