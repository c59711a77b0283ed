//! Common types and descriptors for vertex data.
//!
//! This module contains the engine-neutral element formats, semantics,
//! topologies and usage hints, plus the table translating them to each
//! native API.

mod format;
mod vertex;

pub use format::{decode_half_component, ElementFormat, GlFormat, ELEMENT_FORMATS};
pub use vertex::{
    resolve_declaration, MapAccess, PrimitiveTopology, ResolvedDeclaration, SemanticKind,
    VertexBufferUsage, VertexElementDescriptor, VertexElementType, MAX_VERTEX_ELEMENT_COUNT,
    MAX_VERTEX_STREAMS,
};
