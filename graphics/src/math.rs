//! Engine real type and the vector/matrix types built on it.
//!
//! The engine works in `f32` by default. With the `double-precision` feature
//! it works in `f64`, and every value sent to a shader goes through [`narrow`]
//! first since shader uniforms are always 32-bit.

use std::borrow::Cow;

use bytemuck::Pod;

#[cfg(not(feature = "double-precision"))]
mod precision {
    /// Engine real type.
    pub type Real = f32;
    /// Two-component engine vector.
    pub type Vector2 = glam::Vec2;
    /// Three-component engine vector.
    pub type Vector3 = glam::Vec3;
    /// Four-component engine vector.
    pub type Vector4 = glam::Vec4;
    /// Column-major 2x2 engine matrix.
    pub type Matrix2x2 = glam::Mat2;
    /// Column-major 3x3 engine matrix.
    pub type Matrix3x3 = glam::Mat3;
    /// Column-major 4x4 engine matrix.
    pub type Matrix4x4 = glam::Mat4;
}

#[cfg(feature = "double-precision")]
mod precision {
    /// Engine real type.
    pub type Real = f64;
    /// Two-component engine vector.
    pub type Vector2 = glam::DVec2;
    /// Three-component engine vector.
    pub type Vector3 = glam::DVec3;
    /// Four-component engine vector.
    pub type Vector4 = glam::DVec4;
    /// Column-major 2x2 engine matrix.
    pub type Matrix2x2 = glam::DMat2;
    /// Column-major 3x3 engine matrix.
    pub type Matrix3x3 = glam::DMat3;
    /// Column-major 4x4 engine matrix.
    pub type Matrix4x4 = glam::DMat4;
}

pub use precision::*;

/// Flatten engine values made of [`Real`] components into `f32`s.
///
/// Borrows when `Real` already is `f32`; otherwise copies into a scratch
/// buffer with a narrowing conversion.
pub(crate) fn narrow<T: Pod>(values: &[T]) -> Cow<'_, [f32]> {
    let reals: &[Real] = bytemuck::cast_slice(values);
    #[cfg(not(feature = "double-precision"))]
    {
        Cow::Borrowed(reals)
    }
    #[cfg(feature = "double-precision")]
    {
        Cow::Owned(reals.iter().map(|&r| r as f32).collect())
    }
}
