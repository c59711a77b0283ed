//! OpenGL backend.
//!
//! Vertex and index data go into buffer objects when the driver provides
//! them. Any GL error while creating or filling a buffer object is not fatal:
//! the object is deleted and the data is drawn from client-side arrays.
//!
//! Bind state is global to a GL context, so creation and upload are
//! serialized through process-wide locks.

mod index_buffer;
pub mod native;
mod vertex_buffer;

pub use index_buffer::GlIndexBuffer;
pub use vertex_buffer::{
    GlAttribute, GlAttributeBinding, GlContextState, GlStream, OpenGlVertexBuffer,
};

use parking_lot::Mutex;

use crate::types::{GlFormat, VertexBufferUsage};

use native::*;

/// Serializes the check-and-clear of the GL error flag around buffer creation.
static GL_ERROR_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Serializes bind-and-upload sequences.
static GL_UPLOAD_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Upper bound on `glGetError` calls when draining stale errors.
const MAX_QUEUED_ERRORS: usize = 32;

/// Where a vertex attribute or index array reads its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlAttribSource<'a> {
    /// Offset into a buffer object, bound to the matching target first.
    Buffer {
        /// Buffer object name.
        name: u32,
        /// Byte offset.
        offset: usize,
    },
    /// Client-side memory.
    Client(&'a [u8]),
}

/// The subset of an OpenGL context used by vertex buffers and shader programs.
pub trait GlDevice: Send + Sync {
    /// `glGetError`.
    fn get_error(&self) -> u32;

    /// `glGenBuffers` for one name; zero when none is available.
    fn gen_buffer(&self) -> u32;

    /// `glDeleteBuffers` for one name.
    fn delete_buffer(&self, name: u32);

    /// `glBindBuffer`.
    fn bind_buffer(&self, target: u32, name: u32);

    /// `glBufferData`; `None` allocates without initializing (orphaning).
    fn buffer_data(&self, target: u32, size: usize, data: Option<&[u8]>, usage: u32);

    /// `glMapBuffer`; returns the current contents.
    fn map_buffer(&self, target: u32, access: u32) -> Option<Vec<u8>>;

    /// `glUnmapBuffer`, writing `data` back first when present.
    fn unmap_buffer(&self, target: u32, data: Option<&[u8]>) -> bool;

    /// `glEnableVertexAttribArray`.
    fn enable_vertex_attrib_array(&self, location: u32);

    /// `glDisableVertexAttribArray`.
    fn disable_vertex_attrib_array(&self, location: u32);

    /// `glVertexAttribPointer`.
    fn vertex_attrib_pointer(
        &self,
        location: u32,
        format: GlFormat,
        stride: u32,
        source: GlAttribSource<'_>,
    );

    /// `glDrawArrays`.
    fn draw_arrays(&self, mode: u32, first: u32, count: u32);

    /// `glDrawElements`.
    fn draw_elements(&self, mode: u32, count: u32, index_type: u32, indices: GlAttribSource<'_>);

    /// `glCreateProgram`; zero on failure.
    fn create_program(&self) -> u32;

    /// `glAttachShader`. Failures are reported through [`get_error`](Self::get_error).
    fn attach_shader(&self, program: u32, shader: u32);

    /// `glLinkProgram`.
    fn link_program(&self, program: u32);

    /// `GL_LINK_STATUS` of `program`.
    fn link_status(&self, program: u32) -> bool;

    /// `glGetProgramInfoLog`.
    fn program_info_log(&self, program: u32) -> String;

    /// `glDeleteProgram`.
    fn delete_program(&self, program: u32);

    /// `glUseProgram`.
    fn use_program(&self, program: u32);

    /// `glGetUniformLocation`; `-1` when the uniform is not active.
    fn get_uniform_location(&self, program: u32, name: &str) -> i32;

    /// `glGetAttribLocation`; `-1` when the attribute is not active.
    fn get_attrib_location(&self, program: u32, name: &str) -> i32;

    /// `glUniform1fv`.
    fn uniform_1fv(&self, location: i32, values: &[f32]);

    /// `glUniform2fv`.
    fn uniform_2fv(&self, location: i32, values: &[f32]);

    /// `glUniform3fv`.
    fn uniform_3fv(&self, location: i32, values: &[f32]);

    /// `glUniform4fv`.
    fn uniform_4fv(&self, location: i32, values: &[f32]);

    /// `glUniform1iv`.
    fn uniform_1iv(&self, location: i32, values: &[i32]);

    /// `glUniformMatrix2fv`.
    fn uniform_matrix_2fv(&self, location: i32, transpose: bool, values: &[f32]);

    /// `glUniformMatrix3fv`.
    fn uniform_matrix_3fv(&self, location: i32, transpose: bool, values: &[f32]);

    /// `glUniformMatrix4fv`.
    fn uniform_matrix_4fv(&self, location: i32, transpose: bool, values: &[f32]);
}

fn buffer_usage(usage: VertexBufferUsage) -> u32 {
    match usage {
        VertexBufferUsage::Static => GL_STATIC_DRAW,
        VertexBufferUsage::Standard => GL_DYNAMIC_DRAW,
        VertexBufferUsage::Dynamic => GL_STREAM_DRAW,
    }
}

pub(crate) fn drain_errors(device: &dyn GlDevice) {
    for _ in 0..MAX_QUEUED_ERRORS {
        if device.get_error() == GL_NO_ERROR {
            break;
        }
    }
}

/// Create a buffer object on `target` filled with `data`.
///
/// Returns `None` when the driver cannot provide one; the GL error flag is
/// clear again on return either way.
fn create_buffer_object(
    device: &dyn GlDevice,
    target: u32,
    data: &[u8],
    usage: u32,
) -> Option<u32> {
    let _errors = GL_ERROR_LOCK.lock();
    drain_errors(device);

    let name = {
        let _upload = GL_UPLOAD_LOCK.lock();
        let name = device.gen_buffer();
        if name != 0 {
            device.bind_buffer(target, name);
            device.buffer_data(target, data.len(), Some(data), usage);
            device.bind_buffer(target, 0);
        }
        name
    };

    let error = device.get_error();
    if name == 0 || error != GL_NO_ERROR {
        log::warn!(
            "OpenGL: buffer object unavailable (error {error:#x}), using client-side arrays"
        );
        if name != 0 {
            device.delete_buffer(name);
        }
        drain_errors(device);
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::{DummyConfig, DummyDevice};

    #[test]
    fn test_buffer_usage() {
        assert_eq!(buffer_usage(VertexBufferUsage::Static), GL_STATIC_DRAW);
        assert_eq!(buffer_usage(VertexBufferUsage::Standard), GL_DYNAMIC_DRAW);
        assert_eq!(buffer_usage(VertexBufferUsage::Dynamic), GL_STREAM_DRAW);
    }

    #[test]
    fn test_create_buffer_object() {
        let dummy = DummyDevice::new();
        let name = create_buffer_object(&*dummy, GL_ARRAY_BUFFER, &[1, 2, 3], GL_STATIC_DRAW);
        let name = name.unwrap();
        assert_eq!(dummy.buffer_contents(u64::from(name)), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_create_buffer_object_falls_back_on_error() {
        let dummy = DummyDevice::with_config(DummyConfig {
            gl_buffer_error: true,
            ..DummyConfig::default()
        });
        let name = create_buffer_object(&*dummy, GL_ARRAY_BUFFER, &[1, 2, 3], GL_STATIC_DRAW);
        assert!(name.is_none());
        assert_eq!(dummy.live_resources(), 0);
        assert_eq!(GlDevice::get_error(&*dummy), GL_NO_ERROR);
    }
}
