//! Vertex and index buffers.
//!
//! A [`VertexBuffer`] pairs the backend-independent [`VertexBufferBase`] with
//! the native half of the active backend. Buffers are bound to the stream
//! slots of a [`RenderContext`](crate::backend::RenderContext) and drawn
//! through the buffer bound to stream 0.

mod base;
mod buffer;
mod index;
mod ring;

pub use base::{next_resource_id, VertexBufferBase, VertexBufferMapping, VertexData, VertexSource};
pub use buffer::{ActiveVertexBuffer, VertexBuffer};
pub use index::{IndexBufferBase, IndexFormat, IndexSource};
pub use ring::VertexBufferRing;
