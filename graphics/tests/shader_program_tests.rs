//! Shader program integration tests.
//!
//! Programs are linked on the recording dummy device and used together with
//! OpenGL vertex buffers.

mod common;

use std::sync::Arc;

use common::{init_logging, position_buffer, texcoord_buffer};
use lspiro_graphics::backend::dummy::{DummyCall, DummyDevice};
use lspiro_graphics::backend::opengl::{GlDevice, OpenGlVertexBuffer};
use lspiro_graphics::backend::RenderContext;
use lspiro_graphics::math::{Matrix4x4, Vector3};
use lspiro_graphics::shader::{ShaderPart, ShaderProgramManager, ShaderStage, UniformHandle};
use lspiro_graphics::types::VertexBufferUsage;

fn manager(dummy: &Arc<DummyDevice>) -> ShaderProgramManager {
    let device: Arc<dyn GlDevice> = dummy.clone();
    ShaderProgramManager::new(device)
}

fn vertex_part() -> Arc<ShaderPart> {
    Arc::new(
        ShaderPart::new(7, ShaderStage::Vertex, 70)
            .with_uniform("g_mWorldViewProj", 64)
            .with_input("in_uv", "TEXCOORD0")
            .with_input("in_pos", "POSITION")
            .with_output("out_uv", "TEXCOORD0"),
    )
}

fn pixel_part() -> Arc<ShaderPart> {
    Arc::new(
        ShaderPart::new(8, ShaderStage::Pixel, 80)
            .with_uniform("g_vTint", 12)
            .with_input("out_uv", "TEXCOORD0"),
    )
}

fn attribute_pointers(dummy: &DummyDevice) -> Vec<u32> {
    dummy
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DummyCall::AttributePointer { location, .. } => Some(location),
            _ => None,
        })
        .collect()
}

#[test]
fn test_shared_programs_are_reference_counted() {
    init_logging();
    let dummy = DummyDevice::new();
    let mut manager = manager(&dummy);
    let (vs, ps) = (vertex_part(), pixel_part());

    let first = manager.create_shader_program(Some(&vs), Some(&ps), None).unwrap();
    let second = manager.create_shader_program(Some(&vs), Some(&ps), None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(Arc::strong_count(&first), 2);

    assert!(!manager.delete_shader_program(second));
    assert_eq!(Arc::strong_count(&first), 1);
    assert!(dummy.is_live(u64::from(first.program())));

    let name = first.program();
    assert!(manager.delete_shader_program(first));
    assert!(!dummy.is_live(u64::from(name)));
    assert_eq!(manager.delete_unreferenced_shader_programs(), 0);
    assert_eq!(dummy.stale_handle_uses(), 0);
}

#[test]
fn test_uniform_updates_are_shadowed() {
    let dummy = DummyDevice::new();
    let mut manager = manager(&dummy);
    let program = manager
        .create_shader_program(Some(&vertex_part()), Some(&pixel_part()), None)
        .unwrap();

    let wvp = program.get_constant_by_name("g_mWorldViewProj");
    let tint = program.get_constant_by_name("g_vTint");
    assert!(wvp.is_valid() && tint.is_valid());
    assert_eq!(program.get_constant_by_name("g_vMissing"), UniformHandle::INVALID);

    for _ in 0..10 {
        program.set_matrix4x4(wvp, &Matrix4x4::IDENTITY);
        program.set_vector3(tint, &Vector3::new(1.0, 0.0, 0.0));
    }
    let expected = if cfg!(feature = "tools") { 20 } else { 2 };
    assert_eq!(dummy.uniform_uploads(), expected);
}

#[test]
fn test_streams_bind_to_program_inputs() {
    init_logging();
    let dummy = DummyDevice::new();
    let mut manager = manager(&dummy);
    let program = manager
        .create_shader_program(Some(&vertex_part()), Some(&pixel_part()), None)
        .unwrap();
    let locations = program.attribute_locations();
    let position = locations
        .location(lspiro_graphics::SemanticKind::Position, 0)
        .unwrap();

    let mut buffer = position_buffer::<OpenGlVertexBuffer>(&dummy, VertexBufferUsage::Static);
    let mut ctx = RenderContext::<OpenGlVertexBuffer>::new();
    program.activate(&mut ctx);
    buffer.set_stream(&mut ctx, 0, 0).unwrap();
    buffer.render(&mut ctx, 0, 1).unwrap();

    assert_eq!(attribute_pointers(&dummy), vec![position]);
    assert_eq!(ctx.state().enabled_attributes(), 1 << position);
}

#[test]
fn test_unread_streams_are_skipped() {
    let dummy = DummyDevice::new();
    let mut manager = manager(&dummy);
    let vs = Arc::new(ShaderPart::new(1, ShaderStage::Vertex, 10).with_input("in_pos", "POSITION"));
    let program = manager.create_shader_program(Some(&vs), None, None).unwrap();

    let mut positions = position_buffer::<OpenGlVertexBuffer>(&dummy, VertexBufferUsage::Static);
    let texcoords = texcoord_buffer::<OpenGlVertexBuffer>(&dummy);
    let mut ctx = RenderContext::<OpenGlVertexBuffer>::new();
    program.activate(&mut ctx);
    positions.set_stream(&mut ctx, 0, 0).unwrap();
    texcoords.set_stream(&mut ctx, 1, 0).unwrap();
    positions.render(&mut ctx, 0, 1).unwrap();

    assert_eq!(attribute_pointers(&dummy).len(), 1);
    assert_eq!(dummy.draws(), 1);
}

#[test]
fn test_programs_outlive_manager_entries() {
    let dummy = DummyDevice::new();
    let mut manager = manager(&dummy);
    let program = manager
        .create_shader_program(Some(&vertex_part()), Some(&pixel_part()), None)
        .unwrap();
    drop(manager);

    let handle = program.get_constant_by_name("g_vTint");
    program.set_vector3(handle, &Vector3::ONE);
    assert_eq!(dummy.uniform_uploads(), 1);
    drop(program);
    assert_eq!(dummy.live_resources(), 0);
}
