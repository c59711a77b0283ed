//! Element format table.
//!
//! Maps each [`VertexElementType`] to its byte size and to the native format
//! of every backend. `None` marks a format the backend cannot express.

use crate::backend::direct3d11::native as dx11;
use crate::backend::direct3d9::native as dx9;
use crate::backend::metal::native as mtl;
use crate::backend::opengl::native as gl;

use super::vertex::VertexElementType;

/// OpenGL description of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlFormat {
    /// Component count, or `GL_BGRA` for swizzled colors.
    pub size: i32,
    /// Component data type.
    pub ty: u32,
    /// Whether integer data is normalized.
    pub normalized: bool,
}

/// Native descriptors for one element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementFormat {
    /// The engine element type.
    pub element: VertexElementType,
    /// Size in bytes.
    pub size: u32,
    /// Number of components.
    pub components: u32,
    /// `D3DDECLTYPE` value.
    pub d3d9: Option<u8>,
    /// `DXGI_FORMAT` value.
    pub dxgi: Option<u32>,
    /// OpenGL attribute description.
    pub gl: Option<GlFormat>,
    /// `MTLVertexFormat` value.
    pub metal: Option<u32>,
}

impl ElementFormat {
    /// Look up the table entry for an element type.
    pub fn of(element: VertexElementType) -> &'static ElementFormat {
        let entry = &ELEMENT_FORMATS[element as usize];
        debug_assert_eq!(entry.element, element);
        entry
    }
}

const fn gl_format(size: i32, ty: u32, normalized: bool) -> Option<GlFormat> {
    Some(GlFormat {
        size,
        ty,
        normalized,
    })
}

/// Format table indexed by `VertexElementType as usize`.
pub static ELEMENT_FORMATS: [ElementFormat; 19] = [
    ElementFormat {
        element: VertexElementType::Float1,
        size: 4,
        components: 1,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT1),
        dxgi: Some(dx11::DXGI_FORMAT_R32_FLOAT),
        gl: gl_format(1, gl::GL_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_FLOAT),
    },
    ElementFormat {
        element: VertexElementType::Float2,
        size: 8,
        components: 2,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT2),
        dxgi: Some(dx11::DXGI_FORMAT_R32G32_FLOAT),
        gl: gl_format(2, gl::GL_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_FLOAT2),
    },
    ElementFormat {
        element: VertexElementType::Float3,
        size: 12,
        components: 3,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT3),
        dxgi: Some(dx11::DXGI_FORMAT_R32G32B32_FLOAT),
        gl: gl_format(3, gl::GL_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_FLOAT3),
    },
    ElementFormat {
        element: VertexElementType::Float4,
        size: 16,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT4),
        dxgi: Some(dx11::DXGI_FORMAT_R32G32B32A32_FLOAT),
        gl: gl_format(4, gl::GL_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_FLOAT4),
    },
    ElementFormat {
        element: VertexElementType::Half1,
        size: 2,
        components: 1,
        d3d9: None,
        dxgi: Some(dx11::DXGI_FORMAT_R16_FLOAT),
        gl: gl_format(1, gl::GL_HALF_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_HALF),
    },
    ElementFormat {
        element: VertexElementType::Half2,
        size: 4,
        components: 2,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT16_2),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16_FLOAT),
        gl: gl_format(2, gl::GL_HALF_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_HALF2),
    },
    ElementFormat {
        element: VertexElementType::Half3,
        size: 6,
        components: 3,
        d3d9: None,
        dxgi: None,
        gl: gl_format(3, gl::GL_HALF_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_HALF3),
    },
    ElementFormat {
        element: VertexElementType::Half4,
        size: 8,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_FLOAT16_4),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16B16A16_FLOAT),
        gl: gl_format(4, gl::GL_HALF_FLOAT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_HALF4),
    },
    ElementFormat {
        element: VertexElementType::UByte4,
        size: 4,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_UBYTE4),
        dxgi: Some(dx11::DXGI_FORMAT_R8G8B8A8_UINT),
        gl: gl_format(4, gl::GL_UNSIGNED_BYTE, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_UCHAR4),
    },
    ElementFormat {
        element: VertexElementType::UByte4N,
        size: 4,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_UBYTE4N),
        dxgi: Some(dx11::DXGI_FORMAT_R8G8B8A8_UNORM),
        gl: gl_format(4, gl::GL_UNSIGNED_BYTE, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_UCHAR4_NORMALIZED),
    },
    ElementFormat {
        element: VertexElementType::Color,
        size: 4,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_D3DCOLOR),
        dxgi: Some(dx11::DXGI_FORMAT_B8G8R8A8_UNORM),
        gl: gl_format(gl::GL_BGRA, gl::GL_UNSIGNED_BYTE, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_UCHAR4_NORMALIZED_BGRA),
    },
    ElementFormat {
        element: VertexElementType::Short2,
        size: 4,
        components: 2,
        d3d9: Some(dx9::D3DDECLTYPE_SHORT2),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16_SINT),
        gl: gl_format(2, gl::GL_SHORT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_SHORT2),
    },
    ElementFormat {
        element: VertexElementType::Short4,
        size: 8,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_SHORT4),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16B16A16_SINT),
        gl: gl_format(4, gl::GL_SHORT, false),
        metal: Some(mtl::MTL_VERTEX_FORMAT_SHORT4),
    },
    ElementFormat {
        element: VertexElementType::Short2N,
        size: 4,
        components: 2,
        d3d9: Some(dx9::D3DDECLTYPE_SHORT2N),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16_SNORM),
        gl: gl_format(2, gl::GL_SHORT, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_SHORT2_NORMALIZED),
    },
    ElementFormat {
        element: VertexElementType::Short4N,
        size: 8,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_SHORT4N),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16B16A16_SNORM),
        gl: gl_format(4, gl::GL_SHORT, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_SHORT4_NORMALIZED),
    },
    ElementFormat {
        element: VertexElementType::UShort2N,
        size: 4,
        components: 2,
        d3d9: Some(dx9::D3DDECLTYPE_USHORT2N),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16_UNORM),
        gl: gl_format(2, gl::GL_UNSIGNED_SHORT, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_USHORT2_NORMALIZED),
    },
    ElementFormat {
        element: VertexElementType::UShort4N,
        size: 8,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_USHORT4N),
        dxgi: Some(dx11::DXGI_FORMAT_R16G16B16A16_UNORM),
        gl: gl_format(4, gl::GL_UNSIGNED_SHORT, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_USHORT4_NORMALIZED),
    },
    ElementFormat {
        element: VertexElementType::UDec3,
        size: 4,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_UDEC3),
        dxgi: Some(dx11::DXGI_FORMAT_R10G10B10A2_UINT),
        gl: gl_format(4, gl::GL_UNSIGNED_INT_2_10_10_10_REV, false),
        metal: None,
    },
    ElementFormat {
        element: VertexElementType::Dec3N,
        size: 4,
        components: 4,
        d3d9: Some(dx9::D3DDECLTYPE_DEC3N),
        dxgi: None,
        gl: gl_format(4, gl::GL_INT_2_10_10_10_REV, true),
        metal: Some(mtl::MTL_VERTEX_FORMAT_INT1010102_NORMALIZED),
    },
];

/// Decode the `component`th half-float of a `Half*` element.
pub fn decode_half_component(element: &[u8], component: usize) -> Option<f32> {
    let start = component.checked_mul(2)?;
    let bytes = element.get(start..)?.get(..2)?;
    Some(half::f16::from_le_bytes([bytes[0], bytes[1]]).to_f32())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_element() {
        for element in VertexElementType::ALL {
            assert_eq!(ElementFormat::of(element).element, element);
        }
    }

    #[test]
    fn test_sizes_match_components() {
        for element in VertexElementType::ALL {
            let format = element.format();
            assert!(format.size > 0);
            assert!(format.components >= 1 && format.components <= 4);
        }
        assert_eq!(VertexElementType::Float3.size(), 12);
        assert_eq!(VertexElementType::Half3.size(), 6);
        assert_eq!(VertexElementType::Color.size(), 4);
    }

    #[test]
    fn test_every_element_has_gl_format() {
        for element in VertexElementType::ALL {
            assert!(element.format().gl.is_some(), "{element:?}");
        }
    }

    #[test]
    fn test_backend_gaps() {
        assert!(VertexElementType::Half3.format().d3d9.is_none());
        assert!(VertexElementType::Half3.format().dxgi.is_none());
        assert!(VertexElementType::UDec3.format().metal.is_none());
    }

    #[test]
    fn test_decode_half_component() {
        let values = [half::f16::from_f32(0.5), half::f16::from_f32(-2.0)];
        let bytes: &[u8] = bytemuck::cast_slice(&values);
        assert_eq!(decode_half_component(bytes, 0), Some(0.5));
        assert_eq!(decode_half_component(bytes, 1), Some(-2.0));
        assert_eq!(decode_half_component(bytes, 2), None);
        assert_eq!(decode_half_component(bytes, usize::MAX), None);
        assert_eq!(decode_half_component(bytes, usize::MAX / 2), None);
    }
}
