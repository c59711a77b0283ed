//! Metal constants used by the vertex layer.

// MTLVertexFormat
pub const MTL_VERTEX_FORMAT_UCHAR4: u32 = 3;
pub const MTL_VERTEX_FORMAT_UCHAR4_NORMALIZED: u32 = 9;
pub const MTL_VERTEX_FORMAT_USHORT2_NORMALIZED: u32 = 19;
pub const MTL_VERTEX_FORMAT_USHORT4_NORMALIZED: u32 = 21;
pub const MTL_VERTEX_FORMAT_SHORT2: u32 = 16;
pub const MTL_VERTEX_FORMAT_SHORT4: u32 = 18;
pub const MTL_VERTEX_FORMAT_SHORT2_NORMALIZED: u32 = 22;
pub const MTL_VERTEX_FORMAT_SHORT4_NORMALIZED: u32 = 24;
pub const MTL_VERTEX_FORMAT_HALF2: u32 = 25;
pub const MTL_VERTEX_FORMAT_HALF3: u32 = 26;
pub const MTL_VERTEX_FORMAT_HALF4: u32 = 27;
pub const MTL_VERTEX_FORMAT_FLOAT: u32 = 28;
pub const MTL_VERTEX_FORMAT_FLOAT2: u32 = 29;
pub const MTL_VERTEX_FORMAT_FLOAT3: u32 = 30;
pub const MTL_VERTEX_FORMAT_FLOAT4: u32 = 31;
pub const MTL_VERTEX_FORMAT_INT1010102_NORMALIZED: u32 = 40;
pub const MTL_VERTEX_FORMAT_UCHAR4_NORMALIZED_BGRA: u32 = 42;
pub const MTL_VERTEX_FORMAT_HALF: u32 = 53;

// MTLResourceOptions
pub const MTL_RESOURCE_CPU_CACHE_MODE_WRITE_COMBINED: u32 = 1;
pub const MTL_RESOURCE_STORAGE_MODE_SHARED: u32 = 0;
pub const MTL_RESOURCE_STORAGE_MODE_MANAGED: u32 = 1 << 4;

// MTLVertexStepFunction
pub const MTL_VERTEX_STEP_FUNCTION_PER_VERTEX: u32 = 1;

// MTLPrimitiveType
pub const MTL_PRIMITIVE_TYPE_POINT: u32 = 0;
pub const MTL_PRIMITIVE_TYPE_LINE: u32 = 1;
pub const MTL_PRIMITIVE_TYPE_LINE_STRIP: u32 = 2;
pub const MTL_PRIMITIVE_TYPE_TRIANGLE: u32 = 3;
pub const MTL_PRIMITIVE_TYPE_TRIANGLE_STRIP: u32 = 4;
