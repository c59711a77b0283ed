//! Direct3D 11 constants used by the vertex layer.

// DXGI_FORMAT
pub const DXGI_FORMAT_R32G32B32A32_FLOAT: u32 = 2;
pub const DXGI_FORMAT_R32G32B32_FLOAT: u32 = 6;
pub const DXGI_FORMAT_R16G16B16A16_FLOAT: u32 = 10;
pub const DXGI_FORMAT_R16G16B16A16_UNORM: u32 = 11;
pub const DXGI_FORMAT_R16G16B16A16_SNORM: u32 = 13;
pub const DXGI_FORMAT_R16G16B16A16_SINT: u32 = 14;
pub const DXGI_FORMAT_R32G32_FLOAT: u32 = 16;
pub const DXGI_FORMAT_R10G10B10A2_UINT: u32 = 25;
pub const DXGI_FORMAT_R8G8B8A8_UNORM: u32 = 28;
pub const DXGI_FORMAT_R8G8B8A8_UINT: u32 = 30;
pub const DXGI_FORMAT_R16G16_FLOAT: u32 = 34;
pub const DXGI_FORMAT_R16G16_UNORM: u32 = 35;
pub const DXGI_FORMAT_R16G16_SNORM: u32 = 37;
pub const DXGI_FORMAT_R16G16_SINT: u32 = 38;
pub const DXGI_FORMAT_R32_FLOAT: u32 = 41;
pub const DXGI_FORMAT_R16_FLOAT: u32 = 54;
pub const DXGI_FORMAT_B8G8R8A8_UNORM: u32 = 87;

// D3D11_USAGE
pub const D3D11_USAGE_DEFAULT: u32 = 0;
pub const D3D11_USAGE_IMMUTABLE: u32 = 1;
pub const D3D11_USAGE_DYNAMIC: u32 = 2;
pub const D3D11_USAGE_STAGING: u32 = 3;

// D3D11_BIND_FLAG
pub const D3D11_BIND_VERTEX_BUFFER: u32 = 0x1;

// D3D11_CPU_ACCESS_FLAG
pub const D3D11_CPU_ACCESS_WRITE: u32 = 0x10000;
pub const D3D11_CPU_ACCESS_READ: u32 = 0x20000;

// D3D11_MAP
pub const D3D11_MAP_READ: u32 = 1;
pub const D3D11_MAP_WRITE: u32 = 2;
pub const D3D11_MAP_READ_WRITE: u32 = 3;
pub const D3D11_MAP_WRITE_DISCARD: u32 = 4;
pub const D3D11_MAP_WRITE_NO_OVERWRITE: u32 = 5;

// D3D11_INPUT_CLASSIFICATION
pub const D3D11_INPUT_PER_VERTEX_DATA: u32 = 0;

// D3D11_PRIMITIVE_TOPOLOGY
pub const D3D11_PRIMITIVE_TOPOLOGY_POINTLIST: u32 = 1;
pub const D3D11_PRIMITIVE_TOPOLOGY_LINELIST: u32 = 2;
pub const D3D11_PRIMITIVE_TOPOLOGY_LINESTRIP: u32 = 3;
pub const D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST: u32 = 4;
pub const D3D11_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP: u32 = 5;
