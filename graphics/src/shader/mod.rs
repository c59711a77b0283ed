//! OpenGL shader programs.
//!
//! The program layer links compiled [`ShaderPart`]s into [`ShaderProgram`]s
//! and shadows their uniforms on the CPU so redundant updates never reach the
//! driver.
//!
//! # Overview
//!
//! - [`ShaderPart`] - One compiled stage with its uniform and attribute lists
//! - [`ShaderProgram`] - A linked program with uniform setters
//! - [`ShaderProgramManager`] - Creates programs and shares them by part ids
//!
//! # Example
//!
//! ```ignore
//! let mut manager = ShaderProgramManager::new(device);
//! let program = manager.create_shader_program(Some(&vertex), Some(&pixel), None)?;
//!
//! let world = program.get_constant_by_name("g_mWorld");
//! program.activate(&mut ctx);
//! program.set_matrix4x4(world, &transform);
//! ```

mod manager;
mod part;
mod program;

pub use manager::{ShaderProgramKey, ShaderProgramManager};
pub use part::{AttributeDeclaration, ShaderPart, ShaderStage, UniformDeclaration};
pub use program::{AttributeLocations, ShaderProgram, UniformHandle};
