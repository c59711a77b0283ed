//! N-buffered vertex buffers for per-frame streaming.
//!
//! Writing to a buffer the GPU is still reading from stalls the CPU until the
//! GPU is done with it. A vertex buffer ring keeps N independent buffers with
//! identical declarations and hands out the next one each frame, so the
//! buffer written this frame was last used N frames ago.
//!
//! # Example
//!
//! ```ignore
//! let mut ring = VertexBufferRing::<OpenGlVertexBuffer, 3>::new(
//!     &device,
//!     &[VertexElementDescriptor::position(), VertexElementDescriptor::color(0)],
//!     16,
//!     1024,
//!     PrimitiveTopology::TriangleList,
//! )?;
//!
//! // Each frame
//! let buffer = ring.next();
//! if let Some(mut mapping) = buffer.map(MapAccess::WRITE | MapAccess::DISCARD) {
//!     mapping.as_mut_slice()[..particles.len()].copy_from_slice(&particles);
//!     buffer.unmap(mapping);
//! }
//! buffer.set_stream(&mut ctx, 0, 0)?;
//! buffer.render(&mut ctx, 0, count)?;
//! ```

use std::sync::Arc;

use crate::backend::VertexBufferApi;
use crate::error::GraphicsError;
use crate::types::{PrimitiveTopology, VertexBufferUsage, VertexElementDescriptor};

use super::base::VertexSource;
use super::buffer::VertexBuffer;

/// `N` dynamic vertex buffers used round-robin.
///
/// # Thread Safety
///
/// `VertexBufferRing` is NOT thread-safe; it belongs to the thread driving
/// the render context.
pub struct VertexBufferRing<A: VertexBufferApi, const N: usize> {
    buffers: [VertexBuffer<'static, A>; N],
    current: usize,
    frames: u64,
}

impl<A: VertexBufferApi, const N: usize> VertexBufferRing<A, N> {
    /// Create `N` zero-filled dynamic buffers with the same declaration.
    pub fn new(
        device: &Arc<A::Device>,
        elements: &[VertexElementDescriptor],
        stride: u32,
        element_count: u32,
        topology: PrimitiveTopology,
    ) -> Result<Self, GraphicsError> {
        if N == 0 {
            return Err(GraphicsError::InvalidParameter(
                "vertex buffer ring needs at least one buffer".to_string(),
            ));
        }

        let mut buffers: [VertexBuffer<'static, A>; N] =
            std::array::from_fn(|_| VertexBuffer::new(Arc::clone(device)));
        for buffer in &mut buffers {
            buffer.create_vertex_buffer(
                VertexSource::Reserve,
                elements,
                stride,
                element_count,
                VertexBufferUsage::Dynamic,
                topology,
            )?;
        }
        log::debug!("{}: created ring of {N} vertex buffers", A::NAME);

        Ok(Self {
            buffers,
            current: N.saturating_sub(1),
            frames: 0,
        })
    }

    /// Advance to the next buffer and return it.
    pub fn next(&mut self) -> &mut VertexBuffer<'static, A> {
        self.current = (self.current + 1) % N;
        self.frames += 1;
        &mut self.buffers[self.current]
    }

    /// The buffer returned by the last [`next`](Self::next).
    pub fn current(&mut self) -> &mut VertexBuffer<'static, A> {
        &mut self.buffers[self.current]
    }

    /// Index of the current buffer.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of times [`next`](Self::next) was called since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of buffers in the ring.
    pub fn len(&self) -> usize {
        N
    }

    /// Always false; an empty ring cannot be created.
    pub fn is_empty(&self) -> bool {
        N == 0
    }

    /// Restart the rotation so the next buffer is the first one.
    pub fn reset(&mut self) {
        self.current = N.saturating_sub(1);
        self.frames = 0;
    }

    /// Iterate over every buffer.
    pub fn iter(&self) -> impl Iterator<Item = &VertexBuffer<'static, A>> {
        self.buffers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::direct3d11::{D3d11Device, Direct3d11VertexBuffer};
    use crate::backend::dummy::DummyDevice;
    use crate::types::MapAccess;

    fn ring<const N: usize>(
        dummy: &Arc<DummyDevice>,
    ) -> Result<VertexBufferRing<Direct3d11VertexBuffer, N>, GraphicsError> {
        let device: Arc<dyn D3d11Device> = dummy.clone();
        VertexBufferRing::new(
            &device,
            &[VertexElementDescriptor::position()],
            12,
            64,
            PrimitiveTopology::PointList,
        )
    }

    #[test]
    fn test_ring_rotates() {
        let dummy = DummyDevice::new();
        let mut ring = ring::<3>(&dummy).unwrap();
        assert_eq!(ring.len(), 3);

        let ids: Vec<_> = (0..4).map(|_| ring.next().resource_id().unwrap()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_eq!(ids[0], ids[3]);
        assert_eq!(ring.frames(), 4);
        assert_eq!(ring.current_index(), 0);
    }

    #[test]
    fn test_ring_buffers_are_independent() {
        let dummy = DummyDevice::new();
        let mut ring = ring::<2>(&dummy).unwrap();
        assert_eq!(dummy.live_resources(), 2);

        let buffer = ring.next();
        let mut mapping = buffer.map(MapAccess::WRITE | MapAccess::DISCARD).unwrap();
        mapping.as_mut_slice().fill(1);
        buffer.unmap(mapping);

        let other = ring.next();
        let mapping = other.map(MapAccess::WRITE).unwrap();
        assert!(mapping.as_slice().iter().all(|&b| b == 0));
        other.unmap(mapping);
    }

    #[test]
    fn test_ring_reset() {
        let dummy = DummyDevice::new();
        let mut ring = ring::<2>(&dummy).unwrap();
        let first = ring.next().resource_id();
        ring.next();
        ring.reset();
        assert_eq!(ring.next().resource_id(), first);
    }

    #[test]
    fn test_empty_ring_is_rejected() {
        let dummy = DummyDevice::new();
        assert!(ring::<0>(&dummy).is_err());
    }
}
