//! Engine-neutral vertex declarations, topologies and usage hints.
//!
//! Every backend translates these once, at buffer creation, into its native
//! declaration format through the [`ElementFormat`](super::ElementFormat) table.

use bitflags::bitflags;

use crate::error::GraphicsError;

use super::format::ElementFormat;

/// Maximum number of elements in a single vertex declaration.
pub const MAX_VERTEX_ELEMENT_COUNT: usize = 16;

/// Maximum number of simultaneously bound vertex streams.
pub const MAX_VERTEX_STREAMS: usize = 16;

// ============================================================================
// Element types
// ============================================================================

/// Data type of one vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    /// One 32-bit float.
    Float1,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// One 16-bit float.
    Half1,
    /// Two 16-bit floats.
    Half2,
    /// Three 16-bit floats.
    Half3,
    /// Four 16-bit floats.
    Half4,
    /// Four unsigned bytes.
    UByte4,
    /// Four unsigned bytes normalized to 0..1.
    UByte4N,
    /// Packed BGRA8 color normalized to 0..1.
    Color,
    /// Two signed 16-bit integers.
    Short2,
    /// Four signed 16-bit integers.
    Short4,
    /// Two signed 16-bit integers normalized to -1..1.
    Short2N,
    /// Four signed 16-bit integers normalized to -1..1.
    Short4N,
    /// Two unsigned 16-bit integers normalized to 0..1.
    UShort2N,
    /// Four unsigned 16-bit integers normalized to 0..1.
    UShort4N,
    /// Unsigned 10-10-10-2 packed integers.
    UDec3,
    /// Signed 10-10-10-2 packed integers normalized to -1..1.
    Dec3N,
}

impl VertexElementType {
    /// Every element type, in table order.
    pub const ALL: [Self; 19] = [
        Self::Float1,
        Self::Float2,
        Self::Float3,
        Self::Float4,
        Self::Half1,
        Self::Half2,
        Self::Half3,
        Self::Half4,
        Self::UByte4,
        Self::UByte4N,
        Self::Color,
        Self::Short2,
        Self::Short4,
        Self::Short2N,
        Self::Short4N,
        Self::UShort2N,
        Self::UShort4N,
        Self::UDec3,
        Self::Dec3N,
    ];

    /// Native format descriptors for this element type.
    pub fn format(self) -> &'static ElementFormat {
        ElementFormat::of(self)
    }

    /// Size in bytes of one element of this type.
    pub fn size(self) -> u32 {
        self.format().size
    }
}

// ============================================================================
// Semantics
// ============================================================================

/// Meaning of a vertex element, used to match buffers with shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticKind {
    /// Untransformed position.
    Position,
    /// Skinning blend weights.
    BlendWeight,
    /// Skinning blend indices.
    BlendIndices,
    /// Normal vector.
    Normal,
    /// Point sprite size.
    PointSize,
    /// Texture coordinates.
    TexCoord,
    /// Tangent vector.
    Tangent,
    /// Binormal vector.
    Binormal,
    /// Pre-transformed position.
    PositionT,
    /// Vertex color.
    Color,
}

impl SemanticKind {
    /// Every semantic, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Position,
        Self::BlendWeight,
        Self::BlendIndices,
        Self::Normal,
        Self::PointSize,
        Self::TexCoord,
        Self::Tangent,
        Self::Binormal,
        Self::PositionT,
        Self::Color,
    ];

    /// Shader-level semantic token (HLSL/Cg spelling).
    pub fn token(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::BlendWeight => "BLENDWEIGHT",
            Self::BlendIndices => "BLENDINDICES",
            Self::Normal => "NORMAL",
            Self::PointSize => "PSIZE",
            Self::TexCoord => "TEXCOORD",
            Self::Tangent => "TANGENT",
            Self::Binormal => "BINORMAL",
            Self::PositionT => "POSITIONT",
            Self::Color => "COLOR",
        }
    }

    /// Parse a semantic token such as `TEXCOORD3` into its kind and usage index.
    ///
    /// Matching is case-insensitive. A token without trailing digits has index 0.
    pub fn parse(token: &str) -> Option<(Self, u32)> {
        let digits = token
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let (name, index) = token.split_at(token.len() - digits);
        let index = if index.is_empty() {
            0
        } else {
            index.parse().ok()?
        };
        let kind = Self::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(name))?;
        (index < kind.max_index()).then_some((kind, index))
    }

    /// Number of usage indices available for this semantic.
    pub fn max_index(self) -> u32 {
        match self {
            Self::TexCoord => 8,
            Self::Color => 2,
            _ => 1,
        }
    }

    /// First fixed attribute slot of this semantic.
    ///
    /// Backends without named inputs (Metal attribute indices, OpenGL without
    /// an active program) place `semantic_index` N at `attribute_base() + N`.
    pub fn attribute_base(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Color => 2,
            Self::TexCoord => 4,
            Self::Tangent => 12,
            Self::Binormal => 13,
            Self::BlendWeight => 14,
            Self::BlendIndices => 15,
            Self::PointSize => 16,
            Self::PositionT => 17,
        }
    }
}

// ============================================================================
// Topology and usage
// ============================================================================

/// How a flat vertex sequence is grouped into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// One point per vertex.
    PointList,
    /// Independent lines, two vertices each.
    LineList,
    /// Connected lines sharing endpoints.
    LineStrip,
    /// Independent triangles, three vertices each.
    TriangleList,
    /// Connected triangles sharing edges.
    TriangleStrip,
    /// No topology; every count is zero.
    #[default]
    Undefined,
}

impl PrimitiveTopology {
    /// Number of primitives formed by `vertices` vertices.
    ///
    /// Strip topologies saturate at zero below their minimum vertex count
    /// (`LineStrip` with 0 vertices, `TriangleStrip` with fewer than 2).
    pub fn primitive_count(self, vertices: u32) -> u32 {
        match self {
            Self::PointList => vertices,
            Self::LineList => vertices / 2,
            Self::LineStrip => vertices.saturating_sub(1),
            Self::TriangleList => vertices / 3,
            Self::TriangleStrip => vertices.saturating_sub(2),
            Self::Undefined => 0,
        }
    }

    /// Number of vertices needed to draw `primitives` primitives.
    ///
    /// Inverse of [`primitive_count`](Self::primitive_count) for list
    /// topologies, and for strips with at least two vertices.
    pub fn vertex_count(self, primitives: u32) -> u32 {
        match self {
            Self::PointList => primitives,
            Self::LineList => primitives.saturating_mul(2),
            Self::LineStrip => primitives.saturating_add(1),
            Self::TriangleList => primitives.saturating_mul(3),
            Self::TriangleStrip => primitives.saturating_add(2),
            Self::Undefined => 0,
        }
    }
}

/// How often the CPU rewrites a buffer after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexBufferUsage {
    /// Set once at creation and never written again.
    Static,
    /// Occasionally rewritten.
    #[default]
    Standard,
    /// Rewritten every frame or more often.
    Dynamic,
}

impl VertexBufferUsage {
    /// Whether the contents are fixed at creation.
    pub fn is_set_only(self) -> bool {
        matches!(self, Self::Static)
    }
}

bitflags! {
    /// Access requested when mapping a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapAccess: u32 {
        /// Read back the current contents.
        const READ = 1 << 0;
        /// Write new contents.
        const WRITE = 1 << 1;
        /// Previous contents may be thrown away.
        const DISCARD = 1 << 2;
        /// Caller promises not to touch data in flight.
        const NO_OVERWRITE = 1 << 3;
    }
}

impl MapAccess {
    /// Whether the mapping may modify the buffer.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE | Self::DISCARD | Self::NO_OVERWRITE)
    }
}

// ============================================================================
// Element descriptors
// ============================================================================

/// One element of a vertex declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElementDescriptor {
    /// Data type of the element.
    pub format: VertexElementType,
    /// Byte offset within the vertex. Zero after the first element means
    /// "directly after the previous element".
    pub offset: u32,
    /// Semantic meaning.
    pub semantic: SemanticKind,
    /// Usage index within the semantic (`TEXCOORD1` has index 1).
    pub semantic_index: u32,
}

impl VertexElementDescriptor {
    /// Create an auto-packed element.
    pub fn new(format: VertexElementType, semantic: SemanticKind, semantic_index: u32) -> Self {
        Self {
            format,
            offset: 0,
            semantic,
            semantic_index,
        }
    }

    /// Place the element at an explicit byte offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Float3 position at index 0.
    pub fn position() -> Self {
        Self::new(VertexElementType::Float3, SemanticKind::Position, 0)
    }

    /// Float3 normal at index 0.
    pub fn normal() -> Self {
        Self::new(VertexElementType::Float3, SemanticKind::Normal, 0)
    }

    /// Float2 texture coordinates.
    pub fn texcoord(index: u32) -> Self {
        Self::new(VertexElementType::Float2, SemanticKind::TexCoord, index)
    }

    /// Packed color.
    pub fn color(index: u32) -> Self {
        Self::new(VertexElementType::Color, SemanticKind::Color, index)
    }

    /// Byte offset one past the end of this element.
    pub fn end(&self) -> u32 {
        self.offset + self.format.size()
    }
}

/// A declaration with every auto-pack offset resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResolvedDeclaration {
    /// Elements with final offsets.
    pub elements: Vec<VertexElementDescriptor>,
    /// Bytes covered by the elements of one vertex.
    pub vertex_size: u32,
}

/// Resolve auto-pack offsets and validate a declaration.
///
/// Elements are walked in order. An element after the first whose offset is
/// zero is placed right after its predecessor; explicit offsets move the
/// cursor. Resolved offsets must increase monotonically.
pub fn resolve_declaration(
    elements: &[VertexElementDescriptor],
) -> Result<ResolvedDeclaration, GraphicsError> {
    if elements.len() > MAX_VERTEX_ELEMENT_COUNT {
        return Err(GraphicsError::InvalidParameter(format!(
            "{} vertex elements exceed the maximum of {MAX_VERTEX_ELEMENT_COUNT}",
            elements.len()
        )));
    }

    let mut resolved: Vec<VertexElementDescriptor> = Vec::with_capacity(elements.len());
    let mut cursor = 0u32;
    let mut vertex_size = 0u32;
    for (i, element) in elements.iter().enumerate() {
        if element.semantic_index >= element.semantic.max_index() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{}{} is out of range",
                element.semantic.token(),
                element.semantic_index
            )));
        }

        let offset = if i > 0 && element.offset == 0 {
            cursor
        } else {
            element.offset
        };
        if let Some(previous) = resolved.last() {
            if offset <= previous.offset {
                return Err(GraphicsError::InvalidParameter(format!(
                    "element {i} offset {offset} does not follow the previous element"
                )));
            }
        }

        let element = element.with_offset(offset);
        cursor = element.end();
        vertex_size = vertex_size.max(cursor);
        resolved.push(element);
    }

    Ok(ResolvedDeclaration {
        elements: resolved,
        vertex_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_topologies_round_trip() {
        for topology in [
            PrimitiveTopology::PointList,
            PrimitiveTopology::LineList,
            PrimitiveTopology::TriangleList,
        ] {
            for primitives in 0..64 {
                let vertices = topology.vertex_count(primitives);
                assert_eq!(topology.primitive_count(vertices), primitives);
            }
        }
    }

    #[test]
    fn test_strip_topologies_round_trip_from_two_vertices() {
        for topology in [PrimitiveTopology::LineStrip, PrimitiveTopology::TriangleStrip] {
            for vertices in 2..64 {
                let primitives = topology.primitive_count(vertices);
                assert_eq!(topology.vertex_count(primitives), vertices, "{topology:?}");
            }
        }
    }

    #[test]
    fn test_strip_underflow_is_pinned_to_zero() {
        assert_eq!(PrimitiveTopology::LineStrip.primitive_count(0), 0);
        assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(0), 0);
        assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(1), 0);
        // Not an inverse below the minimum.
        assert_eq!(PrimitiveTopology::LineStrip.vertex_count(0), 1);
    }

    #[test]
    fn test_undefined_topology() {
        assert_eq!(PrimitiveTopology::Undefined.primitive_count(30), 0);
        assert_eq!(PrimitiveTopology::Undefined.vertex_count(30), 0);
    }

    #[test]
    fn test_triangle_pair() {
        assert_eq!(PrimitiveTopology::TriangleList.primitive_count(3), 1);
        assert_eq!(PrimitiveTopology::TriangleList.vertex_count(1), 3);
    }

    #[test]
    fn test_semantic_parse() {
        assert_eq!(
            SemanticKind::parse("TEXCOORD3"),
            Some((SemanticKind::TexCoord, 3))
        );
        assert_eq!(
            SemanticKind::parse("position"),
            Some((SemanticKind::Position, 0))
        );
        assert_eq!(
            SemanticKind::parse("POSITIONT"),
            Some((SemanticKind::PositionT, 0))
        );
        assert_eq!(SemanticKind::parse("PSIZE"), Some((SemanticKind::PointSize, 0)));
        assert_eq!(SemanticKind::parse("TEXCOORD9"), None);
        assert_eq!(SemanticKind::parse("FOG"), None);
    }

    #[test]
    fn test_attribute_bases_do_not_overlap() {
        let mut used = std::collections::HashSet::new();
        for kind in SemanticKind::ALL {
            for index in 0..kind.max_index() {
                assert!(used.insert(kind.attribute_base() + index), "{kind:?}{index}");
            }
        }
    }

    #[test]
    fn test_resolve_auto_pack() {
        let decl = resolve_declaration(&[
            VertexElementDescriptor::position(),
            VertexElementDescriptor::normal(),
            VertexElementDescriptor::texcoord(0),
            VertexElementDescriptor::color(0),
        ])
        .unwrap();
        let offsets: Vec<u32> = decl.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
        assert_eq!(decl.vertex_size, 36);
    }

    #[test]
    fn test_resolve_explicit_offsets_move_cursor() {
        let decl = resolve_declaration(&[
            VertexElementDescriptor::position(),
            VertexElementDescriptor::texcoord(0).with_offset(16),
            VertexElementDescriptor::texcoord(1),
        ])
        .unwrap();
        let offsets: Vec<u32> = decl.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 16, 24]);
        assert_eq!(decl.vertex_size, 32);
    }

    #[test]
    fn test_resolve_rejects_backwards_offsets() {
        let result = resolve_declaration(&[
            VertexElementDescriptor::position().with_offset(8),
            VertexElementDescriptor::normal().with_offset(4),
        ]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_resolve_rejects_too_many_elements() {
        let elements = vec![VertexElementDescriptor::position(); MAX_VERTEX_ELEMENT_COUNT + 1];
        assert!(resolve_declaration(&elements).is_err());
    }

    #[test]
    fn test_map_access_write() {
        assert!(!MapAccess::READ.is_write());
        assert!(MapAccess::DISCARD.is_write());
        assert!((MapAccess::READ | MapAccess::WRITE).is_write());
    }
}
