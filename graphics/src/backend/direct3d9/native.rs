//! Direct3D 9 constants used by the vertex layer.

// D3DDECLTYPE
pub const D3DDECLTYPE_FLOAT1: u8 = 0;
pub const D3DDECLTYPE_FLOAT2: u8 = 1;
pub const D3DDECLTYPE_FLOAT3: u8 = 2;
pub const D3DDECLTYPE_FLOAT4: u8 = 3;
pub const D3DDECLTYPE_D3DCOLOR: u8 = 4;
pub const D3DDECLTYPE_UBYTE4: u8 = 5;
pub const D3DDECLTYPE_SHORT2: u8 = 6;
pub const D3DDECLTYPE_SHORT4: u8 = 7;
pub const D3DDECLTYPE_UBYTE4N: u8 = 8;
pub const D3DDECLTYPE_SHORT2N: u8 = 9;
pub const D3DDECLTYPE_SHORT4N: u8 = 10;
pub const D3DDECLTYPE_USHORT2N: u8 = 11;
pub const D3DDECLTYPE_USHORT4N: u8 = 12;
pub const D3DDECLTYPE_UDEC3: u8 = 13;
pub const D3DDECLTYPE_DEC3N: u8 = 14;
pub const D3DDECLTYPE_FLOAT16_2: u8 = 15;
pub const D3DDECLTYPE_FLOAT16_4: u8 = 16;

// D3DDECLMETHOD
pub const D3DDECLMETHOD_DEFAULT: u8 = 0;

// D3DDECLUSAGE
pub const D3DDECLUSAGE_POSITION: u8 = 0;
pub const D3DDECLUSAGE_BLENDWEIGHT: u8 = 1;
pub const D3DDECLUSAGE_BLENDINDICES: u8 = 2;
pub const D3DDECLUSAGE_NORMAL: u8 = 3;
pub const D3DDECLUSAGE_PSIZE: u8 = 4;
pub const D3DDECLUSAGE_TEXCOORD: u8 = 5;
pub const D3DDECLUSAGE_TANGENT: u8 = 6;
pub const D3DDECLUSAGE_BINORMAL: u8 = 7;
pub const D3DDECLUSAGE_POSITIONT: u8 = 9;
pub const D3DDECLUSAGE_COLOR: u8 = 10;

// D3DPOOL
pub const D3DPOOL_DEFAULT: u32 = 0;
pub const D3DPOOL_MANAGED: u32 = 1;

// D3DUSAGE
pub const D3DUSAGE_WRITEONLY: u32 = 0x0000_0008;
pub const D3DUSAGE_SOFTWAREPROCESSING: u32 = 0x0000_0010;
pub const D3DUSAGE_DYNAMIC: u32 = 0x0000_0200;

// D3DLOCK
pub const D3DLOCK_READONLY: u32 = 0x0000_0010;
pub const D3DLOCK_NOOVERWRITE: u32 = 0x0000_1000;
pub const D3DLOCK_DISCARD: u32 = 0x0000_2000;

// D3DPRIMITIVETYPE
pub const D3DPT_POINTLIST: u32 = 1;
pub const D3DPT_LINELIST: u32 = 2;
pub const D3DPT_LINESTRIP: u32 = 3;
pub const D3DPT_TRIANGLELIST: u32 = 4;
pub const D3DPT_TRIANGLESTRIP: u32 = 5;
