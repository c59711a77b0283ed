//! Linked OpenGL shader programs.
//!
//! A [`ShaderProgram`] owns the native program object linked from up to three
//! [`ShaderPart`]s. Uniform values go through a CPU shadow buffer: a setter
//! only reaches the driver when the value differs from the last one sent
//! (the `tools` feature turns the comparison off).

use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::Mutex;

use crate::backend::opengl::native::GL_NO_ERROR;
use crate::backend::opengl::{drain_errors, GlDevice, OpenGlVertexBuffer};
use crate::backend::RenderContext;
use crate::error::GraphicsError;
use crate::math::{narrow, Matrix2x2, Matrix3x3, Matrix4x4, Real, Vector2, Vector3, Vector4};
use crate::types::SemanticKind;
use crate::vertex::next_resource_id;

use super::manager::ShaderProgramKey;
use super::part::{ShaderPart, ShaderStage};

/// Handle to a uniform of one [`ShaderProgram`].
///
/// Carries the ID of the issuing program, so setters of any other program
/// reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformHandle {
    program: u64,
    index: u32,
}

impl UniformHandle {
    /// Returned for names that are unknown or inactive. Setters ignore it.
    pub const INVALID: Self = Self {
        program: 0,
        index: u32::MAX,
    };

    /// False for [`UniformHandle::INVALID`].
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributeLocation {
    semantic: SemanticKind,
    index: u32,
    location: u32,
}

/// Vertex input locations of a linked program, by semantic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeLocations {
    entries: Vec<AttributeLocation>,
}

impl AttributeLocations {
    /// Location stored for inputs the linker optimized away.
    pub const UNBOUND: u32 = u32::MAX;

    /// Location of the input bound to `semantic`/`index`, if the program reads it.
    pub fn location(&self, semantic: SemanticKind, index: u32) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.semantic == semantic && e.index == index)
            .map(|e| e.location)
            .filter(|&location| location != Self::UNBOUND)
    }

    /// Number of distinct input semantics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the vertex stage reads no inputs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(semantic, index, location)` for every input.
    pub fn iter(&self) -> impl Iterator<Item = (SemanticKind, u32, Option<u32>)> + '_ {
        self.entries.iter().map(|e| {
            (
                e.semantic,
                e.index,
                (e.location != Self::UNBOUND).then_some(e.location),
            )
        })
    }
}

#[derive(Debug)]
struct UniformSlot {
    name: String,
    location: i32,
    offset: usize,
    size: usize,
    dirty: bool,
}

#[derive(Debug, Default)]
struct UniformCache {
    shadow: Vec<u8>,
    slots: Vec<UniformSlot>,
}

/// A linked program plus its uniform shadow buffer.
///
/// # Thread Safety
///
/// Programs are shared through `Arc`. Uniform setters take `&self` and
/// serialize on an internal lock; the GL calls they make still have to come
/// from the thread owning the context.
pub struct ShaderProgram {
    device: Arc<dyn GlDevice>,
    id: u64,
    program: u32,
    key: ShaderProgramKey,
    parts: Vec<Arc<ShaderPart>>,
    attributes: Arc<AttributeLocations>,
    cache: Mutex<UniformCache>,
}

static_assertions::assert_impl_all!(ShaderProgram: Send, Sync);

fn resolve_inputs(
    vertex: Option<&ShaderPart>,
) -> Result<Vec<(String, SemanticKind, u32)>, GraphicsError> {
    let mut inputs: Vec<(String, SemanticKind, u32)> = Vec::new();
    for input in vertex.into_iter().flat_map(ShaderPart::inputs) {
        let (semantic, index) = SemanticKind::parse(&input.semantic).ok_or_else(|| {
            GraphicsError::InvalidSemantic("Vertex shader input semantic invalid".to_string())
        })?;
        if !inputs.iter().any(|(_, s, i)| *s == semantic && *i == index) {
            inputs.push((input.name.clone(), semantic, index));
        }
    }
    Ok(inputs)
}

impl ShaderProgram {
    /// Create, attach and link a program from `parts` (stage order).
    pub(crate) fn link(
        device: Arc<dyn GlDevice>,
        key: ShaderProgramKey,
        parts: Vec<Arc<ShaderPart>>,
    ) -> Result<Self, GraphicsError> {
        let vertex = parts
            .iter()
            .find(|part| part.stage() == ShaderStage::Vertex)
            .map(|part| &**part);
        let inputs = resolve_inputs(vertex)?;

        let name = device.create_program();
        if name == 0 {
            return Err(GraphicsError::ResourceCreationFailed(
                "glCreateProgram returned no program".to_string(),
            ));
        }

        // Deletes the native program if anything below fails.
        let mut program = Self {
            device,
            id: next_resource_id(),
            program: name,
            key,
            parts,
            attributes: Arc::default(),
            cache: Mutex::default(),
        };

        drain_errors(&*program.device);
        for part in &program.parts {
            program.device.attach_shader(name, part.shader());
            let error = program.device.get_error();
            if error != GL_NO_ERROR {
                drain_errors(&*program.device);
                return Err(GraphicsError::ShaderAttachFailed(format!(
                    "{} shader {} (error {error:#x})",
                    part.stage(),
                    part.id()
                )));
            }
        }

        program.device.link_program(name);
        let info_log = program.device.program_info_log(name);
        if !program.device.link_status(name) {
            let message = if info_log.len() > 1 {
                info_log
            } else {
                "Unspecified linker error.".to_string()
            };
            return Err(GraphicsError::ShaderLinkFailed(message));
        }
        if !info_log.trim().is_empty() {
            log::warn!("OpenGL: program {name} linked with messages: {}", info_log.trim_end());
        }

        let shadow_size: usize = program.parts.iter().map(|part| part.uniform_bytes()).sum();
        let mut shadow = Vec::new();
        shadow
            .try_reserve_exact(shadow_size)
            .map_err(|_| GraphicsError::OutOfMemory)?;
        shadow.resize(shadow_size, 0);
        program.cache.get_mut().shadow = shadow;

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(inputs.len())
            .map_err(|_| GraphicsError::OutOfMemory)?;
        for (input, semantic, index) in &inputs {
            let location = program.device.get_attrib_location(name, input);
            entries.push(AttributeLocation {
                semantic: *semantic,
                index: *index,
                location: u32::try_from(location).unwrap_or(AttributeLocations::UNBOUND),
            });
        }
        program.attributes = Arc::new(AttributeLocations { entries });

        log::debug!(
            "OpenGL: linked program {name} ({} stages, {shadow_size} uniform bytes, {} inputs)",
            program.parts.len(),
            inputs.len()
        );
        Ok(program)
    }

    /// Native program name.
    pub fn program(&self) -> u32 {
        self.program
    }

    /// Key of the parts this program was linked from.
    pub fn key(&self) -> ShaderProgramKey {
        self.key
    }

    /// Parts the program was linked from, in stage order.
    pub fn parts(&self) -> &[Arc<ShaderPart>] {
        &self.parts
    }

    /// Vertex input locations resolved at link time.
    pub fn attribute_locations(&self) -> &Arc<AttributeLocations> {
        &self.attributes
    }

    /// Size of the uniform shadow buffer in bytes.
    pub fn shadow_size(&self) -> usize {
        self.cache.lock().shadow.len()
    }

    /// Make this the current program of `ctx`.
    ///
    /// Vertex streams drawn afterwards bind their elements to this program's
    /// input locations.
    pub fn activate(&self, ctx: &mut RenderContext<OpenGlVertexBuffer>) {
        let state = ctx.state_mut();
        if state.active_program() != self.program {
            self.device.use_program(self.program);
        }
        state.set_program(self.program, Some(Arc::clone(&self.attributes)));
    }

    /// Unbind any program from `ctx`.
    pub fn deactivate(ctx: &mut RenderContext<OpenGlVertexBuffer>, device: &dyn GlDevice) {
        let state = ctx.state_mut();
        if state.active_program() != 0 {
            device.use_program(0);
        }
        state.set_program(0, None);
    }

    /// Look up a uniform declared by any stage.
    ///
    /// Returns [`UniformHandle::INVALID`] when no stage declares `name` or the
    /// linker removed it. Repeated lookups return the same handle.
    pub fn get_constant_by_name(&self, name: &str) -> UniformHandle {
        let mut cache = self.cache.lock();
        if let Some(index) = cache.slots.iter().position(|slot| slot.name == name) {
            return self.handle(index);
        }

        let Some(declaration) = self
            .parts
            .iter()
            .flat_map(|part| part.uniforms())
            .find(|uniform| uniform.name == name)
        else {
            log::debug!("OpenGL: program {} declares no uniform `{name}`", self.program);
            return UniformHandle::INVALID;
        };
        let location = self.device.get_uniform_location(self.program, name);
        if location < 0 {
            log::debug!("OpenGL: uniform `{name}` is not active in program {}", self.program);
            return UniformHandle::INVALID;
        }

        let offset = cache.slots.last().map_or(0, |slot| slot.offset + slot.size);
        let size = declaration.size as usize;
        let end = offset + size;
        if end > cache.shadow.len() {
            let grow = end - cache.shadow.len();
            if cache.shadow.try_reserve_exact(grow).is_err() {
                log::error!("OpenGL: no memory to shadow uniform `{name}`");
                return UniformHandle::INVALID;
            }
            cache.shadow.resize(end, 0);
        }
        cache.slots.push(UniformSlot {
            name: name.to_string(),
            location,
            offset,
            size,
            dirty: true,
        });
        self.handle(cache.slots.len() - 1)
    }

    fn handle(&self, index: usize) -> UniformHandle {
        match u32::try_from(index) {
            Ok(index) if index != u32::MAX => UniformHandle {
                program: self.id,
                index,
            },
            _ => UniformHandle::INVALID,
        }
    }

    /// Store `bytes` in the shadow slot of `handle` and call `upload` when
    /// they changed.
    fn update(
        &self,
        handle: UniformHandle,
        bytes: &[u8],
        upload: impl FnOnce(&dyn GlDevice, i32),
    ) -> bool {
        if !handle.is_valid() {
            return false;
        }
        let mut cache = self.cache.lock();
        let UniformCache { shadow, slots } = &mut *cache;
        let slot = match slots.get_mut(handle.index as usize) {
            Some(slot) if handle.program == self.id => slot,
            _ => {
                log::warn!(
                    "OpenGL: uniform handle {} was not issued by program {}",
                    handle.index,
                    self.program
                );
                return false;
            }
        };
        if bytes.len() > slot.size {
            log::warn!(
                "OpenGL: {} bytes do not fit uniform `{}` ({} bytes)",
                bytes.len(),
                slot.name,
                slot.size
            );
            return false;
        }

        let region = &mut shadow[slot.offset..slot.offset + bytes.len()];
        if !cfg!(feature = "tools") && !slot.dirty && region == bytes {
            return true;
        }
        region.copy_from_slice(bytes);
        slot.dirty = false;
        upload(&*self.device, slot.location);
        true
    }

    fn set_floats<T: Pod>(
        &self,
        handle: UniformHandle,
        values: &[T],
        upload: impl FnOnce(&dyn GlDevice, i32, &[f32]),
    ) -> bool {
        let narrowed = narrow(values);
        let floats: &[f32] = &narrowed;
        self.update(handle, bytemuck::cast_slice(floats), |device, location| {
            upload(device, location, floats)
        })
    }

    /// Set a `float` uniform. Returns false for a handle this program did not issue.
    pub fn set_float(&self, handle: UniformHandle, value: Real) -> bool {
        self.set_float_array(handle, std::slice::from_ref(&value))
    }

    /// Set a `float[]` uniform.
    pub fn set_float_array(&self, handle: UniformHandle, values: &[Real]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_1fv(location, floats)
        })
    }

    /// Set an `int` uniform.
    pub fn set_int(&self, handle: UniformHandle, value: i32) -> bool {
        self.set_int_array(handle, std::slice::from_ref(&value))
    }

    /// Set an `int[]` uniform.
    pub fn set_int_array(&self, handle: UniformHandle, values: &[i32]) -> bool {
        self.update(handle, bytemuck::cast_slice(values), |device, location| {
            device.uniform_1iv(location, values)
        })
    }

    /// Set a `bool` uniform. Booleans are sent as integers.
    pub fn set_bool(&self, handle: UniformHandle, value: bool) -> bool {
        self.set_int(handle, i32::from(value))
    }

    /// Array form of [`ShaderProgram::set_bool`].
    pub fn set_bool_array(&self, handle: UniformHandle, values: &[bool]) -> bool {
        let ints: Vec<i32> = values.iter().map(|&value| i32::from(value)).collect();
        self.set_int_array(handle, &ints)
    }

    /// Set a `vec2` uniform.
    pub fn set_vector2(&self, handle: UniformHandle, value: &Vector2) -> bool {
        self.set_vector2_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_vector2`].
    pub fn set_vector2_array(&self, handle: UniformHandle, values: &[Vector2]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_2fv(location, floats)
        })
    }

    /// Set a `vec3` uniform.
    pub fn set_vector3(&self, handle: UniformHandle, value: &Vector3) -> bool {
        self.set_vector3_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_vector3`].
    pub fn set_vector3_array(&self, handle: UniformHandle, values: &[Vector3]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_3fv(location, floats)
        })
    }

    /// Set a `vec4` uniform.
    pub fn set_vector4(&self, handle: UniformHandle, value: &Vector4) -> bool {
        self.set_vector4_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_vector4`].
    pub fn set_vector4_array(&self, handle: UniformHandle, values: &[Vector4]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_4fv(location, floats)
        })
    }

    /// Set a `mat2` uniform.
    pub fn set_matrix2x2(&self, handle: UniformHandle, value: &Matrix2x2) -> bool {
        self.set_matrix2x2_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_matrix2x2`].
    pub fn set_matrix2x2_array(&self, handle: UniformHandle, values: &[Matrix2x2]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_matrix_2fv(location, false, floats)
        })
    }

    /// Set a `mat3` uniform.
    pub fn set_matrix3x3(&self, handle: UniformHandle, value: &Matrix3x3) -> bool {
        self.set_matrix3x3_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_matrix3x3`].
    pub fn set_matrix3x3_array(&self, handle: UniformHandle, values: &[Matrix3x3]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_matrix_3fv(location, false, floats)
        })
    }

    /// Set a `mat4` uniform. Column-major, uploaded untransposed.
    pub fn set_matrix4x4(&self, handle: UniformHandle, value: &Matrix4x4) -> bool {
        self.set_matrix4x4_array(handle, std::slice::from_ref(value))
    }

    /// Array form of [`ShaderProgram::set_matrix4x4`].
    pub fn set_matrix4x4_array(&self, handle: UniformHandle, values: &[Matrix4x4]) -> bool {
        self.set_floats(handle, values, |device, location, floats| {
            device.uniform_matrix_4fv(location, false, floats)
        })
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::debug!("OpenGL: deleting program {}", self.program);
        self.device.delete_program(self.program);
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("program", &self.program)
            .field("key", &self.key)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}
