//! Creation and sharing of shader programs.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::backend::opengl::GlDevice;
use crate::error::GraphicsError;

use super::part::{ShaderPart, ShaderStage};
use super::program::ShaderProgram;

/// Identity of a program: the ids of its parts, zero for an absent stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderProgramKey {
    /// Vertex part id.
    pub vertex: u32,
    /// Pixel part id.
    pub pixel: u32,
    /// Geometry part id.
    pub geometry: u32,
}

impl ShaderProgramKey {
    /// Key of the given parts.
    pub fn from_parts(
        vertex: Option<&Arc<ShaderPart>>,
        pixel: Option<&Arc<ShaderPart>>,
        geometry: Option<&Arc<ShaderPart>>,
    ) -> Self {
        Self {
            vertex: vertex.map_or(0, |part| part.id()),
            pixel: pixel.map_or(0, |part| part.id()),
            geometry: geometry.map_or(0, |part| part.id()),
        }
    }
}

/// Creates shader programs and, with sharing on, hands out one program per
/// combination of parts.
///
/// The manager holds weak references only: a program lives as long as some
/// caller holds its `Arc`. Entries whose program is gone are swept by
/// [`delete_unreferenced_shader_programs`](Self::delete_unreferenced_shader_programs)
/// and replaced on the next request for the same key.
pub struct ShaderProgramManager {
    device: Arc<dyn GlDevice>,
    sharing: bool,
    programs: BTreeMap<ShaderProgramKey, Weak<ShaderProgram>>,
}

fn check_stage(part: Option<&Arc<ShaderPart>>, stage: ShaderStage) -> Result<(), GraphicsError> {
    let Some(part) = part else {
        return Ok(());
    };
    if part.id() == 0 {
        return Err(GraphicsError::InvalidParameter(format!(
            "{stage} shader part has the reserved id 0"
        )));
    }
    if part.stage() != stage {
        return Err(GraphicsError::InvalidParameter(format!(
            "{} shader part {} passed as the {stage} stage",
            part.stage(),
            part.id()
        )));
    }
    Ok(())
}

impl ShaderProgramManager {
    /// A manager with sharing enabled.
    pub fn new(device: Arc<dyn GlDevice>) -> Self {
        Self {
            device,
            sharing: true,
            programs: BTreeMap::new(),
        }
    }

    /// Turn program sharing on or off. Programs already handed out are
    /// unaffected.
    pub fn set_sharing(&mut self, sharing: bool) {
        self.sharing = sharing;
    }

    /// Whether identical part combinations share one program.
    pub fn is_sharing(&self) -> bool {
        self.sharing
    }

    /// Get a program linking the given parts.
    ///
    /// With sharing on, an existing live program for the same parts is
    /// returned instead of linking a new one.
    pub fn create_shader_program(
        &mut self,
        vertex: Option<&Arc<ShaderPart>>,
        pixel: Option<&Arc<ShaderPart>>,
        geometry: Option<&Arc<ShaderPart>>,
    ) -> Result<Arc<ShaderProgram>, GraphicsError> {
        check_stage(vertex, ShaderStage::Vertex)?;
        check_stage(pixel, ShaderStage::Pixel)?;
        check_stage(geometry, ShaderStage::Geometry)?;

        let key = ShaderProgramKey::from_parts(vertex, pixel, geometry);
        if self.sharing {
            if let Some(program) = self.programs.get(&key).and_then(Weak::upgrade) {
                log::trace!("OpenGL: sharing program {} for {key:?}", program.program());
                return Ok(program);
            }
        }

        let parts = [vertex, pixel, geometry]
            .into_iter()
            .flatten()
            .map(Arc::clone)
            .collect();
        let program = ShaderProgram::link(Arc::clone(&self.device), key, parts).map_err(|e| {
            log::error!("OpenGL: failed to create program for {key:?}: {e}");
            e
        })?;
        let program = Arc::new(program);
        if self.sharing {
            self.programs.insert(key, Arc::downgrade(&program));
        }
        Ok(program)
    }

    /// Give up one reference to `program`.
    ///
    /// Returns true when that was the last reference and the native program
    /// was deleted.
    pub fn delete_shader_program(&mut self, program: Arc<ShaderProgram>) -> bool {
        let key = program.key();
        let Some(program) = Arc::into_inner(program) else {
            return false;
        };
        let owned = self
            .programs
            .get(&key)
            .is_some_and(|weak| weak.strong_count() == 0);
        if owned {
            self.programs.remove(&key);
        }
        drop(program);
        true
    }

    /// Forget every entry whose program is no longer referenced.
    ///
    /// Returns the number of entries removed.
    pub fn delete_unreferenced_shader_programs(&mut self) -> usize {
        let before = self.programs.len();
        self.programs.retain(|_, program| program.strong_count() > 0);
        let removed = before - self.programs.len();
        if removed > 0 {
            log::debug!("OpenGL: swept {removed} unreferenced programs");
        }
        removed
    }

    /// The live shared program for `key`, if any.
    pub fn find(&self, key: &ShaderProgramKey) -> Option<Arc<ShaderProgram>> {
        self.programs.get(key).and_then(Weak::upgrade)
    }

    /// Number of tracked entries, live or not.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// True when no program is tracked.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
