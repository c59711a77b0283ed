//! Recording device for testing and development.
//!
//! [`DummyDevice`] implements every native device trait without touching a
//! GPU. It records each call, tracks which native handles are alive, counts
//! calls that reference released handles, and can be configured to fail the
//! way a real driver does.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::{GlFormat, PrimitiveTopology};

use super::direct3d11::{
    native as dx11, D3d11BufferDesc, D3d11Device, D3d11InputElementDesc, D3d11VertexBinding,
    Direct3d11VertexBuffer,
};
use super::direct3d9::{native as dx9, D3d9Device, D3dVertexElement9, Direct3d9VertexBuffer};
use super::metal::{
    MetalDevice, MetalVertexAttribute, MetalVertexBuffer, MetalVertexBufferLayout,
};
use super::opengl::{native as gl, GlAttribSource, GlDevice, OpenGlVertexBuffer};
use super::{NativeHandle, VertexBufferApi};

/// Failure injection and capabilities of a [`DummyDevice`].
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Reported by `supports_hardware_vertex_processing`.
    pub hardware_vertex_processing: bool,
    /// Buffer creation fails with [`GraphicsError::OutOfMemory`].
    pub fail_buffer_creation: bool,
    /// Layout creation fails with [`GraphicsError::ResourceCreationFailed`].
    pub fail_layout_creation: bool,
    /// `glBufferData` raises `GL_OUT_OF_MEMORY`.
    pub gl_buffer_error: bool,
    /// `glAttachShader` raises `GL_INVALID_OPERATION`.
    pub fail_attach: bool,
    /// Linking fails.
    pub fail_link: bool,
    /// Program info log returned after linking.
    pub info_log: String,
    /// Uniform names reported as inactive (location `-1`).
    pub inactive_uniforms: Vec<String>,
    /// Attribute names reported as inactive (location `-1`).
    pub inactive_attributes: Vec<String>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            hardware_vertex_processing: true,
            fail_buffer_creation: false,
            fail_layout_creation: false,
            gl_buffer_error: false,
            fail_attach: false,
            fail_link: false,
            info_log: String::new(),
            inactive_uniforms: Vec::new(),
            inactive_attributes: Vec::new(),
        }
    }
}

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCall {
    /// A buffer was created.
    CreateBuffer { handle: u64, size: usize },
    /// A buffer object was (re)allocated; `initialized` is false for orphaning.
    BufferData { handle: u64, size: usize, initialized: bool },
    /// A buffer was released.
    ReleaseBuffer { handle: u64 },
    /// A buffer was mapped or locked.
    MapBuffer { handle: u64 },
    /// A buffer was unmapped; `written` when new contents were stored.
    UnmapBuffer { handle: u64, written: bool },
    /// A declaration, input layout or vertex descriptor was created.
    CreateLayout { handle: u64, elements: usize },
    /// A layout was released.
    ReleaseLayout { handle: u64 },
    /// A layout was made current.
    SetLayout { handle: u64 },
    /// A stream slot was bound; `buffer` is `None` for an unbind.
    SetStream {
        slot: u32,
        buffer: Option<u64>,
        offset: u32,
        stride: u32,
    },
    /// The primitive topology was set.
    SetTopology { topology: u32 },
    /// A non-indexed draw.
    Draw { start: u32, vertices: u32 },
    /// An indexed draw.
    DrawIndexed { count: u32, client: bool },
    /// A vertex attribute array was enabled.
    EnableAttribute { location: u32 },
    /// A vertex attribute array was disabled.
    DisableAttribute { location: u32 },
    /// A vertex attribute pointer was set.
    AttributePointer {
        location: u32,
        buffer: Option<u64>,
        offset: usize,
        stride: u32,
        client: bool,
    },
    /// A program was created.
    CreateProgram { program: u32 },
    /// A shader was attached.
    AttachShader { program: u32, shader: u32 },
    /// A program was linked.
    LinkProgram { program: u32 },
    /// A program was deleted.
    DeleteProgram { program: u32 },
    /// A program was made current.
    UseProgram { program: u32 },
    /// A uniform was uploaded.
    Uniform {
        location: i32,
        floats: Vec<f32>,
        ints: Vec<i32>,
    },
}

#[derive(Default)]
struct DummyState {
    config: DummyConfig,
    next_handle: u64,
    calls: Vec<DummyCall>,
    buffers: HashMap<u64, Vec<u8>>,
    /// `(usage, cpu_access_flags)` of Direct3D 11 buffers.
    d3d11_access: HashMap<u64, (u32, u32)>,
    layouts: HashSet<u64>,
    programs: HashMap<u32, HashMap<String, i32>>,
    bound: HashMap<u32, u32>,
    errors: Vec<u32>,
    stale_uses: usize,
}

impl DummyState {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_buffer(&mut self, handle: u64) -> bool {
        let live = self.buffers.contains_key(&handle);
        if !live {
            log::warn!("DummyDevice: use of released buffer {handle}");
            self.stale_uses += 1;
        }
        live
    }

    fn check_layout(&mut self, handle: u64) -> bool {
        let live = self.layouts.contains(&handle);
        if !live {
            log::warn!("DummyDevice: use of released layout {handle}");
            self.stale_uses += 1;
        }
        live
    }

    fn create_buffer(&mut self, data: Vec<u8>) -> Result<u64, GraphicsError> {
        if self.config.fail_buffer_creation {
            return Err(GraphicsError::OutOfMemory);
        }
        let handle = self.allocate();
        self.calls.push(DummyCall::CreateBuffer {
            handle,
            size: data.len(),
        });
        self.buffers.insert(handle, data);
        Ok(handle)
    }

    fn release_buffer(&mut self, handle: u64) {
        if self.check_buffer(handle) {
            self.buffers.remove(&handle);
            self.d3d11_access.remove(&handle);
        }
        self.calls.push(DummyCall::ReleaseBuffer { handle });
    }

    fn read_buffer(&mut self, handle: u64) -> Option<Vec<u8>> {
        if !self.check_buffer(handle) {
            return None;
        }
        self.calls.push(DummyCall::MapBuffer { handle });
        self.buffers.get(&handle).cloned()
    }

    fn write_buffer(&mut self, handle: u64, data: Option<&[u8]>) {
        if !self.check_buffer(handle) {
            return;
        }
        if let (Some(data), Some(contents)) = (data, self.buffers.get_mut(&handle)) {
            let len = contents.len().min(data.len());
            contents[..len].copy_from_slice(&data[..len]);
        }
        self.calls.push(DummyCall::UnmapBuffer {
            handle,
            written: data.is_some(),
        });
    }

    fn create_layout(&mut self, elements: usize) -> Result<u64, GraphicsError> {
        if self.config.fail_layout_creation {
            return Err(GraphicsError::ResourceCreationFailed(
                "dummy layout creation failure".to_string(),
            ));
        }
        let handle = self.allocate();
        self.layouts.insert(handle);
        self.calls.push(DummyCall::CreateLayout { handle, elements });
        Ok(handle)
    }

    fn release_layout(&mut self, handle: u64) {
        if self.check_layout(handle) {
            self.layouts.remove(&handle);
        }
        self.calls.push(DummyCall::ReleaseLayout { handle });
    }

    fn set_layout(&mut self, handle: u64) {
        self.check_layout(handle);
        self.calls.push(DummyCall::SetLayout { handle });
    }

    fn set_stream(&mut self, slot: u32, buffer: Option<u64>, offset: u32, stride: u32) {
        if let Some(handle) = buffer {
            self.check_buffer(handle);
        }
        self.calls.push(DummyCall::SetStream {
            slot,
            buffer,
            offset,
            stride,
        });
    }

    fn bound(&self, target: u32) -> u32 {
        self.bound.get(&target).copied().unwrap_or(0)
    }

    fn uniform(&mut self, location: i32, floats: &[f32], ints: &[i32]) {
        self.calls.push(DummyCall::Uniform {
            location,
            floats: floats.to_vec(),
            ints: ints.to_vec(),
        });
    }
}

/// Recording implementation of every native device trait.
#[derive(Default)]
pub struct DummyDevice {
    state: Mutex<DummyState>,
}

impl DummyDevice {
    /// Create a device with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(DummyConfig::default())
    }

    /// Create a device with `config`.
    pub fn with_config(config: DummyConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DummyState {
                config,
                ..DummyState::default()
            }),
        })
    }

    /// Replace the configuration.
    pub fn set_config(&self, config: DummyConfig) {
        self.state.lock().config = config;
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<DummyCall> {
        self.state.lock().calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DummyCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of native draws recorded.
    pub fn draws(&self) -> usize {
        self.count(|call| matches!(call, DummyCall::Draw { .. } | DummyCall::DrawIndexed { .. }))
    }

    /// Number of uniform uploads recorded.
    pub fn uniform_uploads(&self) -> usize {
        self.count(|call| matches!(call, DummyCall::Uniform { .. }))
    }

    /// Number of live buffers, layouts and programs.
    pub fn live_resources(&self) -> usize {
        let state = self.state.lock();
        state.buffers.len() + state.layouts.len() + state.programs.len()
    }

    /// Whether `handle` names a live buffer, layout or program.
    pub fn is_live(&self, handle: u64) -> bool {
        let state = self.state.lock();
        state.buffers.contains_key(&handle)
            || state.layouts.contains(&handle)
            || u32::try_from(handle).is_ok_and(|name| state.programs.contains_key(&name))
    }

    /// Number of calls that referenced a released handle.
    pub fn stale_handle_uses(&self) -> usize {
        self.state.lock().stale_uses
    }

    /// Current contents of buffer `handle`.
    pub fn buffer_contents(&self, handle: u64) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&handle).cloned()
    }
}

impl std::fmt::Debug for DummyDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DummyDevice")
            .field("calls", &state.calls.len())
            .field("buffers", &state.buffers.len())
            .field("layouts", &state.layouts.len())
            .field("programs", &state.programs.len())
            .finish_non_exhaustive()
    }
}

fn d3d9_topology(primitive_type: u32) -> PrimitiveTopology {
    match primitive_type {
        dx9::D3DPT_POINTLIST => PrimitiveTopology::PointList,
        dx9::D3DPT_LINELIST => PrimitiveTopology::LineList,
        dx9::D3DPT_LINESTRIP => PrimitiveTopology::LineStrip,
        dx9::D3DPT_TRIANGLELIST => PrimitiveTopology::TriangleList,
        dx9::D3DPT_TRIANGLESTRIP => PrimitiveTopology::TriangleStrip,
        _ => PrimitiveTopology::Undefined,
    }
}

// ============================================================================
// Direct3D 9
// ============================================================================

impl D3d9Device for DummyDevice {
    fn supports_hardware_vertex_processing(&self) -> bool {
        self.state.lock().config.hardware_vertex_processing
    }

    fn create_vertex_buffer(
        &self,
        length: u32,
        usage: u32,
        pool: u32,
    ) -> Result<NativeHandle, GraphicsError> {
        log::trace!("DummyDevice: CreateVertexBuffer {length} bytes ({usage:#x}, pool {pool})");
        let handle = self.state.lock().create_buffer(vec![0; length as usize])?;
        Ok(NativeHandle(handle))
    }

    fn release_vertex_buffer(&self, buffer: NativeHandle) {
        self.state.lock().release_buffer(buffer.0);
    }

    fn lock(&self, buffer: NativeHandle, flags: u32) -> Option<Vec<u8>> {
        log::trace!("DummyDevice: Lock {:?} (flags {flags:#x})", buffer);
        self.state.lock().read_buffer(buffer.0)
    }

    fn unlock(&self, buffer: NativeHandle, data: Option<&[u8]>) {
        self.state.lock().write_buffer(buffer.0, data);
    }

    fn create_vertex_declaration(
        &self,
        elements: &[D3dVertexElement9],
    ) -> Result<NativeHandle, GraphicsError> {
        self.state.lock().create_layout(elements.len()).map(NativeHandle)
    }

    fn release_vertex_declaration(&self, declaration: NativeHandle) {
        self.state.lock().release_layout(declaration.0);
    }

    fn set_vertex_declaration(&self, declaration: NativeHandle) {
        self.state.lock().set_layout(declaration.0);
    }

    fn set_stream_source(
        &self,
        stream: u32,
        buffer: Option<NativeHandle>,
        offset: u32,
        stride: u32,
    ) {
        self.state
            .lock()
            .set_stream(stream, buffer.map(|b| b.0), offset, stride);
    }

    fn draw_primitive(&self, primitive_type: u32, start_vertex: u32, primitive_count: u32) {
        let vertices = d3d9_topology(primitive_type).vertex_count(primitive_count);
        self.state.lock().calls.push(DummyCall::Draw {
            start: start_vertex,
            vertices,
        });
    }
}

// ============================================================================
// Direct3D 11
// ============================================================================

/// Map types Direct3D 11 accepts for a buffer description.
fn d3d11_map_allowed(usage: u32, cpu_access: u32, map_type: u32) -> bool {
    let readable = cpu_access & dx11::D3D11_CPU_ACCESS_READ != 0;
    let writable = cpu_access & dx11::D3D11_CPU_ACCESS_WRITE != 0;
    match usage {
        dx11::D3D11_USAGE_DYNAMIC => {
            writable
                && matches!(
                    map_type,
                    dx11::D3D11_MAP_WRITE_DISCARD | dx11::D3D11_MAP_WRITE_NO_OVERWRITE
                )
        }
        dx11::D3D11_USAGE_STAGING => match map_type {
            dx11::D3D11_MAP_READ => readable,
            dx11::D3D11_MAP_WRITE => writable,
            dx11::D3D11_MAP_READ_WRITE => readable && writable,
            _ => false,
        },
        _ => false,
    }
}

impl D3d11Device for DummyDevice {
    fn create_buffer(
        &self,
        desc: &D3d11BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<NativeHandle, GraphicsError> {
        let mut state = self.state.lock();
        let data = match initial_data {
            Some(data) => data.to_vec(),
            None if desc.usage == dx11::D3D11_USAGE_IMMUTABLE => {
                return Err(GraphicsError::InvalidParameter(
                    "immutable buffer without initial data".to_string(),
                ))
            }
            None => vec![0; desc.byte_width as usize],
        };
        let handle = state.create_buffer(data)?;
        state
            .d3d11_access
            .insert(handle, (desc.usage, desc.cpu_access_flags));
        Ok(NativeHandle(handle))
    }

    fn release_buffer(&self, buffer: NativeHandle) {
        self.state.lock().release_buffer(buffer.0);
    }

    fn map(&self, buffer: NativeHandle, map_type: u32) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        if let Some(&(usage, cpu_access)) = state.d3d11_access.get(&buffer.0) {
            if !d3d11_map_allowed(usage, cpu_access, map_type) {
                log::trace!("DummyDevice: Map type {map_type} refused on buffer {:?}", buffer);
                return None;
            }
        }
        let contents = state.read_buffer(buffer.0)?;
        if map_type == dx11::D3D11_MAP_WRITE_DISCARD {
            return Some(vec![0; contents.len()]);
        }
        Some(contents)
    }

    fn unmap(&self, buffer: NativeHandle, data: Option<&[u8]>) {
        self.state.lock().write_buffer(buffer.0, data);
    }

    fn create_input_layout(
        &self,
        elements: &[D3d11InputElementDesc],
    ) -> Result<NativeHandle, GraphicsError> {
        self.state.lock().create_layout(elements.len()).map(NativeHandle)
    }

    fn release_input_layout(&self, layout: NativeHandle) {
        self.state.lock().release_layout(layout.0);
    }

    fn ia_set_input_layout(&self, layout: NativeHandle) {
        self.state.lock().set_layout(layout.0);
    }

    fn ia_set_vertex_buffers(&self, start_slot: u32, bindings: &[D3d11VertexBinding]) {
        let mut state = self.state.lock();
        for (i, binding) in bindings.iter().enumerate() {
            state.set_stream(
                start_slot + i as u32,
                binding.buffer.map(|b| b.0),
                binding.offset,
                binding.stride,
            );
        }
    }

    fn ia_set_primitive_topology(&self, topology: u32) {
        self.state
            .lock()
            .calls
            .push(DummyCall::SetTopology { topology });
    }

    fn draw(&self, vertex_count: u32, start_vertex: u32) {
        self.state.lock().calls.push(DummyCall::Draw {
            start: start_vertex,
            vertices: vertex_count,
        });
    }
}

// ============================================================================
// OpenGL
// ============================================================================

impl GlDevice for DummyDevice {
    fn get_error(&self) -> u32 {
        let mut state = self.state.lock();
        if state.errors.is_empty() {
            gl::GL_NO_ERROR
        } else {
            state.errors.remove(0)
        }
    }

    fn gen_buffer(&self) -> u32 {
        let mut state = self.state.lock();
        match state.create_buffer(Vec::new()) {
            Ok(handle) => handle as u32,
            Err(_) => 0,
        }
    }

    fn delete_buffer(&self, name: u32) {
        self.state.lock().release_buffer(u64::from(name));
    }

    fn bind_buffer(&self, target: u32, name: u32) {
        let mut state = self.state.lock();
        if name != 0 {
            state.check_buffer(u64::from(name));
        }
        state.bound.insert(target, name);
    }

    fn buffer_data(&self, target: u32, size: usize, data: Option<&[u8]>, _usage: u32) {
        let mut state = self.state.lock();
        let name = state.bound(target);
        if state.config.gl_buffer_error {
            state.errors.push(gl::GL_OUT_OF_MEMORY);
            return;
        }
        let handle = u64::from(name);
        if name == 0 || !state.check_buffer(handle) {
            state.errors.push(gl::GL_INVALID_OPERATION);
            return;
        }
        let contents = data.map_or_else(|| vec![0; size], <[u8]>::to_vec);
        state.buffers.insert(handle, contents);
        state.calls.push(DummyCall::BufferData {
            handle,
            size,
            initialized: data.is_some(),
        });
    }

    fn map_buffer(&self, target: u32, _access: u32) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        let name = state.bound(target);
        state.read_buffer(u64::from(name))
    }

    fn unmap_buffer(&self, target: u32, data: Option<&[u8]>) -> bool {
        let mut state = self.state.lock();
        let name = state.bound(target);
        state.write_buffer(u64::from(name), data);
        true
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.state
            .lock()
            .calls
            .push(DummyCall::EnableAttribute { location });
    }

    fn disable_vertex_attrib_array(&self, location: u32) {
        self.state
            .lock()
            .calls
            .push(DummyCall::DisableAttribute { location });
    }

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        _format: GlFormat,
        stride: u32,
        source: GlAttribSource<'_>,
    ) {
        let mut state = self.state.lock();
        let (buffer, offset, client) = match source {
            GlAttribSource::Buffer { name, offset } => {
                state.check_buffer(u64::from(name));
                (Some(u64::from(name)), offset, false)
            }
            GlAttribSource::Client(_) => (None, 0, true),
        };
        state.calls.push(DummyCall::AttributePointer {
            location,
            buffer,
            offset,
            stride,
            client,
        });
    }

    fn draw_arrays(&self, _mode: u32, first: u32, count: u32) {
        self.state.lock().calls.push(DummyCall::Draw {
            start: first,
            vertices: count,
        });
    }

    fn draw_elements(&self, _mode: u32, count: u32, _index_type: u32, indices: GlAttribSource<'_>) {
        let mut state = self.state.lock();
        let client = match indices {
            GlAttribSource::Buffer { name, .. } => {
                state.check_buffer(u64::from(name));
                false
            }
            GlAttribSource::Client(_) => true,
        };
        state.calls.push(DummyCall::DrawIndexed { count, client });
    }

    fn create_program(&self) -> u32 {
        let mut state = self.state.lock();
        let program = state.allocate() as u32;
        state.programs.insert(program, HashMap::new());
        state.calls.push(DummyCall::CreateProgram { program });
        program
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.lock();
        if state.config.fail_attach {
            state.errors.push(gl::GL_INVALID_OPERATION);
            return;
        }
        state.calls.push(DummyCall::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        self.state
            .lock()
            .calls
            .push(DummyCall::LinkProgram { program });
    }

    fn link_status(&self, _program: u32) -> bool {
        !self.state.lock().config.fail_link
    }

    fn program_info_log(&self, _program: u32) -> String {
        self.state.lock().config.info_log.clone()
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.lock();
        if state.programs.remove(&program).is_none() {
            state.stale_uses += 1;
        }
        state.calls.push(DummyCall::DeleteProgram { program });
    }

    fn use_program(&self, program: u32) {
        let mut state = self.state.lock();
        if program != 0 && !state.programs.contains_key(&program) {
            state.stale_uses += 1;
        }
        state.calls.push(DummyCall::UseProgram { program });
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> i32 {
        let mut state = self.state.lock();
        if state.config.inactive_uniforms.iter().any(|n| n == name) {
            return -1;
        }
        let Some(locations) = state.programs.get_mut(&program) else {
            return -1;
        };
        let next = locations.len() as i32;
        *locations.entry(format!("u:{name}")).or_insert(next)
    }

    fn get_attrib_location(&self, program: u32, name: &str) -> i32 {
        let mut state = self.state.lock();
        if state.config.inactive_attributes.iter().any(|n| n == name) {
            return -1;
        }
        let Some(locations) = state.programs.get_mut(&program) else {
            return -1;
        };
        let next = locations.keys().filter(|k| k.starts_with("a:")).count() as i32;
        *locations.entry(format!("a:{name}")).or_insert(next)
    }

    fn uniform_1fv(&self, location: i32, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_2fv(&self, location: i32, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_3fv(&self, location: i32, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_4fv(&self, location: i32, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_1iv(&self, location: i32, values: &[i32]) {
        self.state.lock().uniform(location, &[], values);
    }

    fn uniform_matrix_2fv(&self, location: i32, _transpose: bool, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_matrix_3fv(&self, location: i32, _transpose: bool, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }

    fn uniform_matrix_4fv(&self, location: i32, _transpose: bool, values: &[f32]) {
        self.state.lock().uniform(location, values, &[]);
    }
}

// ============================================================================
// Metal
// ============================================================================

impl MetalDevice for DummyDevice {
    fn new_buffer(&self, data: &[u8], options: u32) -> Result<NativeHandle, GraphicsError> {
        log::trace!("DummyDevice: newBuffer {} bytes (options {options:#x})", data.len());
        self.state.lock().create_buffer(data.to_vec()).map(NativeHandle)
    }

    fn release_buffer(&self, buffer: NativeHandle) {
        self.state.lock().release_buffer(buffer.0);
    }

    fn buffer_contents(&self, buffer: NativeHandle) -> Option<Vec<u8>> {
        self.state.lock().read_buffer(buffer.0)
    }

    fn did_modify_range(&self, buffer: NativeHandle, data: &[u8]) {
        self.state.lock().write_buffer(buffer.0, Some(data));
    }

    fn new_vertex_descriptor(
        &self,
        attributes: &[MetalVertexAttribute],
        _layouts: &[MetalVertexBufferLayout],
    ) -> Result<NativeHandle, GraphicsError> {
        self.state.lock().create_layout(attributes.len()).map(NativeHandle)
    }

    fn release_vertex_descriptor(&self, descriptor: NativeHandle) {
        self.state.lock().release_layout(descriptor.0);
    }

    fn set_vertex_descriptor(&self, descriptor: NativeHandle) {
        self.state.lock().set_layout(descriptor.0);
    }

    fn set_vertex_buffer(&self, buffer: Option<NativeHandle>, offset: u32, index: u32) {
        self.state
            .lock()
            .set_stream(index, buffer.map(|b| b.0), offset, 0);
    }

    fn draw_primitives(&self, _primitive_type: u32, vertex_start: u32, vertex_count: u32) {
        self.state.lock().calls.push(DummyCall::Draw {
            start: vertex_start,
            vertices: vertex_count,
        });
    }
}

// ============================================================================
// Backend adapter
// ============================================================================

/// Backends that can run on a [`DummyDevice`].
pub trait DummyBacked: VertexBufferApi {
    /// View `device` as this backend's native device.
    fn dummy_device(device: &Arc<DummyDevice>) -> Arc<Self::Device>;
}

impl DummyBacked for Direct3d9VertexBuffer {
    fn dummy_device(device: &Arc<DummyDevice>) -> Arc<dyn D3d9Device> {
        device.clone()
    }
}

impl DummyBacked for Direct3d11VertexBuffer {
    fn dummy_device(device: &Arc<DummyDevice>) -> Arc<dyn D3d11Device> {
        device.clone()
    }
}

impl DummyBacked for OpenGlVertexBuffer {
    fn dummy_device(device: &Arc<DummyDevice>) -> Arc<dyn GlDevice> {
        device.clone()
    }
}

impl DummyBacked for MetalVertexBuffer {
    fn dummy_device(device: &Arc<DummyDevice>) -> Arc<dyn MetalDevice> {
        device.clone()
    }
}
