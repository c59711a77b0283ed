//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
///
/// Degraded-capability paths (a driver without buffer objects, a uniform the
/// linker optimised away) are not errors and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The native API refused to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A requested feature is not supported by the backend.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of GPU or CPU memory.
    #[error("out of memory")]
    OutOfMemory,
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// A shader stage could not be attached to a program.
    #[error("shader attach failed: {0}")]
    ShaderAttachFailed(String),
    /// Linking a shader program failed; carries the linker log.
    #[error("shader link failed: {0}")]
    ShaderLinkFailed(String),
    /// A vertex shader input used a semantic the engine does not know.
    #[error("invalid semantic: {0}")]
    InvalidSemantic(String),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
