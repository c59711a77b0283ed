//! Vertex buffer integration tests.
//!
//! Each test runs against every backend through the recording dummy device.
//! Tests are parameterized using `rstest`; the backend-generic check is
//! dispatched by [`with_backend!`].
//!
//! # Test Categories
//!
//! - **Draw Tests**: A buffer created, bound and drawn reaches the device
//! - **Layout Cache Tests**: Native layouts are rebuilt only when the bound
//!   stream combination changes
//! - **Lifetime Tests**: Released buffers never leave dangling stream slots
//! - **Data Ownership Tests**: Owned, borrowed and discarded CPU copies

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{empty_buffer, init_logging, position_buffer, texcoord_buffer, triangle_bytes, Backend};
use lspiro_graphics::backend::direct3d11::Direct3d11VertexBuffer;
use lspiro_graphics::backend::direct3d9::Direct3d9VertexBuffer;
use lspiro_graphics::backend::dummy::{DummyBacked, DummyCall, DummyDevice};
use lspiro_graphics::backend::metal::MetalVertexBuffer;
use lspiro_graphics::backend::opengl::OpenGlVertexBuffer;
use lspiro_graphics::backend::RenderContext;
use lspiro_graphics::types::{
    MapAccess, PrimitiveTopology, VertexBufferUsage, VertexElementDescriptor,
};
use lspiro_graphics::vertex::{VertexBuffer, VertexSource};
use lspiro_graphics::GraphicsError;

macro_rules! with_backend {
    ($backend:expr, $check:ident) => {
        match $backend {
            Backend::Direct3d9 => $check::<Direct3d9VertexBuffer>(),
            Backend::Direct3d11 => $check::<Direct3d11VertexBuffer>(),
            Backend::OpenGl => $check::<OpenGlVertexBuffer>(),
            Backend::Metal => $check::<MetalVertexBuffer>(),
        }
    };
}

fn last_draw(dummy: &DummyDevice) -> Option<DummyCall> {
    dummy
        .calls()
        .into_iter()
        .rev()
        .find(|call| matches!(call, DummyCall::Draw { .. }))
}

// ============================================================================
// Draw Tests
// ============================================================================

fn check_triangle_draw<A: DummyBacked>() {
    init_logging();
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::<A>::new();

    buffer.set_stream(&mut ctx, 0, 0).unwrap();
    buffer.prepare_to_render(&mut ctx);
    buffer.render(&mut ctx, 0, buffer.primitive_count()).unwrap();
    buffer.end_render(&mut ctx);

    assert_eq!(dummy.draws(), 1);
    assert_eq!(
        last_draw(&dummy),
        Some(DummyCall::Draw {
            start: 0,
            vertices: 3
        })
    );
    assert_eq!(dummy.stale_handle_uses(), 0);
}

/// A triangle list of three vertices draws one primitive of three vertices.
#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_triangle_draw(#[case] backend: Backend) {
    with_backend!(backend, check_triangle_draw);
}

fn check_zero_primitives_binds_without_drawing<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::<A>::new();

    buffer.set_stream(&mut ctx, 0, 0).unwrap();
    buffer.render(&mut ctx, 0, 0).unwrap();
    assert_eq!(dummy.draws(), 0);
    assert_eq!(ctx.layout_rebuilds(), 1);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_zero_primitives_binds_without_drawing(#[case] backend: Backend) {
    with_backend!(backend, check_zero_primitives_binds_without_drawing);
}

fn check_render_requires_stream_zero<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::<A>::new();

    buffer.set_stream(&mut ctx, 1, 0).unwrap();
    let err = buffer.render(&mut ctx, 0, 1).unwrap_err();
    assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    assert_eq!(dummy.draws(), 0);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_render_requires_stream_zero(#[case] backend: Backend) {
    with_backend!(backend, check_render_requires_stream_zero);
}

// ============================================================================
// Layout Cache Tests
// ============================================================================

fn check_layout_memoized_across_stream_counts<A: DummyBacked>() {
    init_logging();
    let dummy = DummyDevice::new();
    let mut positions = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let texcoords = texcoord_buffer::<A>(&dummy);
    let mut ctx = RenderContext::<A>::new();

    positions.set_stream(&mut ctx, 0, 0).unwrap();
    texcoords.set_stream(&mut ctx, 1, 0).unwrap();
    positions.render(&mut ctx, 0, 1).unwrap();
    positions.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.layout_rebuilds(), 1);

    // One stream, then two again: both configurations stay cached.
    ctx.clear_stream(1);
    positions.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.layout_rebuilds(), 2);

    texcoords.set_stream(&mut ctx, 1, 0).unwrap();
    positions.render(&mut ctx, 0, 1).unwrap();
    ctx.clear_stream(1);
    positions.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.layout_rebuilds(), 2);
    assert_eq!(dummy.draws(), 5);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_layout_memoized_across_stream_counts(#[case] backend: Backend) {
    with_backend!(backend, check_layout_memoized_across_stream_counts);
}

fn check_recreated_buffer_rebuilds_layout<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::<A>::new();

    buffer.set_stream(&mut ctx, 0, 0).unwrap();
    buffer.render(&mut ctx, 0, 1).unwrap();

    let first = buffer.resource_id();
    buffer
        .create_vertex_buffer(
            VertexSource::Copy(triangle_bytes()),
            &[VertexElementDescriptor::position()],
            12,
            3,
            VertexBufferUsage::Static,
            PrimitiveTopology::TriangleList,
        )
        .unwrap();
    assert_ne!(buffer.resource_id(), first);

    buffer.set_stream(&mut ctx, 0, 0).unwrap();
    buffer.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.layout_rebuilds(), 2);
    assert_eq!(dummy.stale_handle_uses(), 0);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_recreated_buffer_rebuilds_layout(#[case] backend: Backend) {
    with_backend!(backend, check_recreated_buffer_rebuilds_layout);
}

// ============================================================================
// Lifetime Tests
// ============================================================================

fn check_stale_slot_is_cleared<A: DummyBacked>() {
    init_logging();
    let dummy = DummyDevice::new();
    let mut positions = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    let mut texcoords = texcoord_buffer::<A>(&dummy);
    let mut ctx = RenderContext::<A>::new();

    positions.set_stream(&mut ctx, 0, 0).unwrap();
    texcoords.set_stream(&mut ctx, 1, 0).unwrap();
    positions.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.active_streams(), 2);

    texcoords.reset();
    assert_eq!(ctx.stream_resource_id(1), None);

    positions.render(&mut ctx, 0, 1).unwrap();
    assert_eq!(ctx.active_streams(), 1);
    assert_eq!(dummy.draws(), 2);
    assert_eq!(dummy.stale_handle_uses(), 0);
}

/// Releasing a buffer that is still bound leaves no dangling slot behind.
#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_stale_slot_is_cleared(#[case] backend: Backend) {
    with_backend!(backend, check_stale_slot_is_cleared);
}

fn check_dropping_releases_every_handle<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    {
        let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Standard);
        let mut ctx = RenderContext::<A>::new();
        buffer.set_stream(&mut ctx, 0, 0).unwrap();
        buffer.render(&mut ctx, 0, 1).unwrap();
        assert!(dummy.live_resources() > 0);
    }
    assert_eq!(dummy.live_resources(), 0);
    assert_eq!(dummy.stale_handle_uses(), 0);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_dropping_releases_every_handle(#[case] backend: Backend) {
    with_backend!(backend, check_dropping_releases_every_handle);
}

fn check_failed_creation_leaves_buffer_empty<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = empty_buffer::<A>(&dummy);
    let err = buffer
        .create_vertex_buffer(
            VertexSource::Copy(triangle_bytes()),
            &[VertexElementDescriptor::position()],
            8,
            3,
            VertexBufferUsage::Static,
            PrimitiveTopology::TriangleList,
        )
        .unwrap_err();
    assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    assert!(!buffer.is_created());
    assert!(!buffer.base().is_configured());
    assert_eq!(dummy.live_resources(), 0);
}

/// A stride smaller than the declared vertex fails before touching the device.
#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_failed_creation_leaves_buffer_empty(#[case] backend: Backend) {
    with_backend!(backend, check_failed_creation_leaves_buffer_empty);
}

// ============================================================================
// Data Ownership Tests
// ============================================================================

fn check_static_copy_is_discarded<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Static);
    assert!(buffer.is_created());
    assert!(!buffer.base().has_cpu_copy());

    let standard = position_buffer::<A>(&dummy, VertexBufferUsage::Standard);
    assert_eq!(standard.base().data(), Some(triangle_bytes()));
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_static_copy_is_discarded(#[case] backend: Backend) {
    with_backend!(backend, check_static_copy_is_discarded);
}

fn check_borrowed_data_is_referenced<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let bytes = triangle_bytes().to_vec();
    let mut buffer = VertexBuffer::<A>::new(A::dummy_device(&dummy));
    buffer
        .create_vertex_buffer(
            VertexSource::Borrow(&bytes),
            &[VertexElementDescriptor::position()],
            12,
            3,
            VertexBufferUsage::Static,
            PrimitiveTopology::TriangleList,
        )
        .unwrap();

    assert!(buffer.base().is_borrowed());
    let data = buffer.base().data().unwrap();
    assert_eq!(data.as_ptr(), bytes.as_ptr());
}

/// Borrowed vertex data is referenced, never copied or released.
#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_borrowed_data_is_referenced(#[case] backend: Backend) {
    with_backend!(backend, check_borrowed_data_is_referenced);
}

fn check_map_write_reaches_native<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<A>(&dummy, VertexBufferUsage::Standard);

    let mut mapping = buffer.map(MapAccess::WRITE).unwrap();
    assert_eq!(mapping.as_slice(), triangle_bytes());
    mapping.as_mut_slice().fill(7);
    buffer.unmap(mapping);

    // A second write mapping without discard sees the previous contents.
    let mapping = buffer.map(MapAccess::WRITE).unwrap();
    assert!(mapping.as_slice().iter().all(|&b| b == 7));
    buffer.unmap(mapping);
    assert!(buffer.base().data().unwrap().iter().all(|&b| b == 7));
    assert_eq!(dummy.stale_handle_uses(), 0);
}

#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_map_write_reaches_native(#[case] backend: Backend) {
    with_backend!(backend, check_map_write_reaches_native);
}

fn check_undefined_topology_is_rejected<A: DummyBacked>() {
    let dummy = DummyDevice::new();
    let mut buffer = empty_buffer::<A>(&dummy);
    buffer
        .create_vertex_buffer(
            VertexSource::Copy(triangle_bytes()),
            &[VertexElementDescriptor::position()],
            12,
            3,
            VertexBufferUsage::Static,
            PrimitiveTopology::Undefined,
        )
        .unwrap();
    let mut ctx = RenderContext::<A>::new();
    buffer.set_stream(&mut ctx, 0, 0).unwrap();

    let err = buffer.render(&mut ctx, 0, 1).unwrap_err();
    assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    assert_eq!(dummy.draws(), 0);
    assert_eq!(
        dummy.count(|call| matches!(call, DummyCall::SetTopology { .. })),
        0
    );
}

/// No backend binds or draws a buffer without a topology.
#[rstest]
#[case::direct3d9(Backend::Direct3d9)]
#[case::direct3d11(Backend::Direct3d11)]
#[case::opengl(Backend::OpenGl)]
#[case::metal(Backend::Metal)]
fn test_undefined_topology_is_rejected(#[case] backend: Backend) {
    with_backend!(backend, check_undefined_topology_is_rejected);
}

// ============================================================================
// Backend-specific
// ============================================================================

#[rstest]
#[case::standard(VertexBufferUsage::Standard)]
#[case::dynamic(VertexBufferUsage::Dynamic)]
fn test_direct3d11_buffers_are_write_only(#[case] usage: VertexBufferUsage) {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<Direct3d11VertexBuffer>(&dummy, usage);

    assert!(buffer.map(MapAccess::READ).is_none());
    assert!(buffer.map(MapAccess::READ | MapAccess::WRITE).is_none());

    let mapping = buffer.map(MapAccess::WRITE | MapAccess::DISCARD).unwrap();
    assert!(mapping.as_slice().iter().all(|&b| b == 0));
    buffer.unmap(mapping);
}

#[test]
fn test_direct3d11_static_buffer_cannot_be_mapped() {
    let dummy = DummyDevice::new();
    let mut buffer = position_buffer::<Direct3d11VertexBuffer>(&dummy, VertexBufferUsage::Static);
    assert!(buffer.map(MapAccess::WRITE).is_none());
    assert!(buffer.map(MapAccess::WRITE | MapAccess::DISCARD).is_none());
}

#[test]
fn test_element_offset_is_applied_per_stream() {
    let dummy = DummyDevice::new();
    let buffer = position_buffer::<Direct3d11VertexBuffer>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::new();
    buffer.set_stream(&mut ctx, 0, 2).unwrap();

    let resolved = ctx.resolve_streams();
    let bound: Vec<_> = resolved.bound().map(|stream| stream.offset).collect();
    assert_eq!(bound, vec![24]);
}

#[test]
fn test_sources_are_shared_with_context() {
    let dummy = DummyDevice::new();
    let buffer = position_buffer::<MetalVertexBuffer>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::new();
    buffer.set_stream(&mut ctx, 0, 0).unwrap();

    let resolved = ctx.resolve_streams();
    let stream = resolved.bound().next().unwrap();
    // The context only holds weak references; resolving borrows a strong one.
    assert_eq!(Arc::strong_count(&stream.source), 2);
}
