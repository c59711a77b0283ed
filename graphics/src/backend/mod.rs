//! Native graphics backends.
//!
//! Every backend implements [`VertexBufferApi`] on top of a narrow native
//! device trait. Exactly one backend is active per build, chosen with Cargo
//! features:
//!
//! - `backend-direct3d11`: Direct3D 11 input assembler
//! - `backend-direct3d9`: Direct3D 9 with device-loss recovery
//! - `backend-metal`: Metal render command encoder
//! - `backend-opengl` (default): OpenGL with client-array fallback
//!
//! When several are enabled the first one in this list wins. All backends are
//! always compiled so they can be tested side by side against the recording
//! [`dummy`] device.
//!
//! # Architecture
//!
//! A backend vertex buffer owns its native resource through an
//! `Arc<Self::Source>`. The [`RenderContext`] only ever holds `Weak`
//! references to those sources, so releasing a buffer makes every stream slot
//! that pointed at it unreachable without having to find the context.

pub mod context;
pub mod direct3d11;
pub mod direct3d9;
pub mod dummy;
pub mod metal;
pub mod opengl;

use std::fmt;
use std::sync::Arc;

use crate::error::GraphicsError;
use crate::types::MapAccess;
use crate::vertex::{VertexBufferBase, VertexBufferMapping};

pub use context::{BackendState, BoundStream, LayoutCache, RenderContext, ResolvedStreams};

/// Opaque handle to a native object (buffer, declaration, layout).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

/// A native resource that can be bound to a vertex stream.
pub trait StreamSource: Send + Sync + 'static {
    /// Unique ID of this native resource. A re-created buffer gets a new ID.
    fn resource_id(&self) -> u64;

    /// Bytes between consecutive vertices.
    fn stride(&self) -> u32;
}

/// Backend half of a vertex buffer.
///
/// The backend-independent half is [`VertexBufferBase`]; the
/// [`VertexBuffer`](crate::vertex::VertexBuffer) facade combines the two.
pub trait VertexBufferApi: Sized {
    /// Native device the buffer is created on.
    type Device: ?Sized + Send + Sync;
    /// Native resource bound to stream slots.
    type Source: StreamSource;
    /// Per-context state: cached layouts and whatever else the backend tracks.
    type ContextState: BackendState;

    /// Backend name for logging.
    const NAME: &'static str;

    /// Create an empty backend buffer on `device`.
    fn new(device: Arc<Self::Device>) -> Self;

    /// The native device.
    fn device(&self) -> &Arc<Self::Device>;

    /// Translate the declaration and upload the bytes of `base`.
    ///
    /// Releases any previous native resource first.
    fn create_api(&mut self, base: &VertexBufferBase<'_>) -> Result<(), GraphicsError>;

    /// Release the native resource. Idempotent.
    fn reset_api(&mut self);

    /// The native resource, if created.
    fn source(&self) -> Option<&Arc<Self::Source>>;

    /// Whether the CPU copy must outlive creation even for set-only buffers.
    fn retains_cpu_copy(&self) -> bool {
        false
    }

    /// Map the native buffer into CPU-visible memory.
    fn map(
        &mut self,
        base: &VertexBufferBase<'_>,
        access: MapAccess,
    ) -> Option<VertexBufferMapping>;

    /// Finish a mapping obtained from [`map`](Self::map).
    fn unmap(&mut self, mapping: &VertexBufferMapping);

    /// Called before the first draw of a render pass.
    fn prepare_to_render_api(&mut self, _ctx: &mut RenderContext<Self>) {}

    /// Called after the last draw of a render pass.
    fn end_render_api(&mut self, _ctx: &mut RenderContext<Self>) {}

    /// Bind every active stream and draw `total_primitives` primitives.
    ///
    /// Zero primitives binds without drawing.
    fn render_api(
        &mut self,
        base: &VertexBufferBase<'_>,
        ctx: &mut RenderContext<Self>,
        start_vertex: u32,
        total_primitives: u32,
    ) -> Result<(), GraphicsError>;
}

/// Backends whose native resources can be lost with the device.
pub trait DeviceLossRecovery {
    /// Release resources living in losable memory.
    fn on_device_lost(&mut self);

    /// Re-create resources released by [`on_device_lost`](Self::on_device_lost).
    fn on_device_reset(&mut self) -> Result<(), GraphicsError>;
}

#[cfg(feature = "backend-direct3d11")]
mod active {
    pub type ActiveBackend = super::direct3d11::Direct3d11VertexBuffer;
}

#[cfg(all(feature = "backend-direct3d9", not(feature = "backend-direct3d11")))]
mod active {
    pub type ActiveBackend = super::direct3d9::Direct3d9VertexBuffer;
}

#[cfg(all(
    feature = "backend-metal",
    not(any(feature = "backend-direct3d11", feature = "backend-direct3d9"))
))]
mod active {
    pub type ActiveBackend = super::metal::MetalVertexBuffer;
}

#[cfg(not(any(
    feature = "backend-direct3d11",
    feature = "backend-direct3d9",
    feature = "backend-metal"
)))]
mod active {
    pub type ActiveBackend = super::opengl::OpenGlVertexBuffer;
}

/// Backend selected by Cargo features.
pub use active::ActiveBackend;

/// Format stream resource IDs for log messages.
pub(crate) fn describe_ids(ids: &[u64]) -> String {
    let parts: Vec<String> = ids.iter().map(u64::to_string).collect();
    format!("[{}]", parts.join(", "))
}
