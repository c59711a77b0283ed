//! Backend-independent vertex buffer state.
//!
//! [`VertexBufferBase`] holds everything a backend needs to (re)create its
//! native resource: the resolved declaration, stride, count, topology, usage
//! and the CPU-side bytes, which are either owned or borrowed from the caller.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GraphicsError;
use crate::types::{
    resolve_declaration, MapAccess, PrimitiveTopology, VertexBufferUsage,
    VertexElementDescriptor,
};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-wide unique resource ID. IDs are never reused.
pub fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// CPU-side vertex bytes.
///
/// A borrowed buffer can never be written through this type, so the
/// caller's memory is neither freed nor mutated by the vertex layer.
#[derive(Debug, Default)]
pub enum VertexData<'a> {
    /// No CPU copy (never created, reset, or discarded after upload).
    #[default]
    Empty,
    /// Exclusively owned copy.
    Owned(Vec<u8>),
    /// Caller-managed bytes.
    Borrowed(&'a [u8]),
}

impl<'a> VertexData<'a> {
    /// View the bytes, if there are any.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => None,
            Self::Owned(bytes) => Some(bytes),
            Self::Borrowed(bytes) => Some(bytes),
        }
    }

    /// Mutable view; only owned data can be written.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Owned(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Whether the bytes belong to the caller.
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Self::Borrowed(_))
    }

    /// Whether the bytes are an owned copy.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.as_slice().map_or(0, <[u8]>::len)
    }

    /// Whether no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the bytes of a new vertex buffer come from.
///
/// `'s` is the lifetime of data that is only read during creation; `'a` is the
/// lifetime of data the buffer keeps referencing.
#[derive(Debug)]
pub enum VertexSource<'s, 'a> {
    /// Copy the bytes into an owned buffer.
    Copy(&'s [u8]),
    /// Take ownership of an existing allocation.
    Owned(Vec<u8>),
    /// Reserve zeroed owned storage without initializing it from the caller.
    Reserve,
    /// Reference caller-managed bytes without copying.
    Borrow(&'a [u8]),
}

/// CPU-visible contents of a mapped buffer.
///
/// Obtained from `map` and handed back to `unmap`; writes become visible to
/// the GPU only after `unmap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferMapping {
    data: Vec<u8>,
    access: MapAccess,
}

impl VertexBufferMapping {
    /// Wrap mapped bytes.
    pub fn new(data: Vec<u8>, access: MapAccess) -> Self {
        Self { data, access }
    }

    /// Access requested at map time.
    pub fn access(&self) -> MapAccess {
        self.access
    }

    /// Size of the mapped range in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Write the mapped bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Backend-independent vertex buffer state.
#[derive(Debug)]
pub struct VertexBufferBase<'a> {
    id: u64,
    topology: PrimitiveTopology,
    usage: VertexBufferUsage,
    stride: u32,
    element_count: u32,
    elements: Vec<VertexElementDescriptor>,
    vertex_size: u32,
    data: VertexData<'a>,
}

impl<'a> VertexBufferBase<'a> {
    /// Create an empty base with a fresh unique ID.
    pub fn new() -> Self {
        Self {
            id: next_resource_id(),
            topology: PrimitiveTopology::Undefined,
            usage: VertexBufferUsage::Standard,
            stride: 0,
            element_count: 0,
            elements: Vec::new(),
            vertex_size: 0,
            data: VertexData::Empty,
        }
    }

    /// Store a new declaration and its bytes.
    ///
    /// Leaves `self` untouched on error.
    pub(crate) fn configure(
        &mut self,
        source: VertexSource<'_, 'a>,
        elements: &[VertexElementDescriptor],
        stride: u32,
        element_count: u32,
        usage: VertexBufferUsage,
        topology: PrimitiveTopology,
    ) -> Result<(), GraphicsError> {
        let declaration = resolve_declaration(elements)?;
        let size = (stride as usize)
            .checked_mul(element_count as usize)
            .ok_or(GraphicsError::OutOfMemory)?;
        if size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex buffer of {element_count} elements with stride {stride} is empty"
            )));
        }
        if u32::try_from(size).is_err() {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex buffer of {size} bytes exceeds the native 32-bit size limit"
            )));
        }
        if declaration.vertex_size > stride {
            return Err(GraphicsError::InvalidParameter(format!(
                "declaration needs {} bytes per vertex but the stride is {stride}",
                declaration.vertex_size
            )));
        }

        let data = match source {
            VertexSource::Copy(bytes) => {
                let bytes = sized(bytes, size)?;
                let mut owned = Vec::new();
                owned
                    .try_reserve_exact(size)
                    .map_err(|_| GraphicsError::OutOfMemory)?;
                owned.extend_from_slice(bytes);
                VertexData::Owned(owned)
            }
            VertexSource::Owned(mut bytes) => {
                sized(&bytes, size)?;
                bytes.truncate(size);
                VertexData::Owned(bytes)
            }
            VertexSource::Reserve => {
                let mut owned = Vec::new();
                owned
                    .try_reserve_exact(size)
                    .map_err(|_| GraphicsError::OutOfMemory)?;
                owned.resize(size, 0);
                VertexData::Owned(owned)
            }
            VertexSource::Borrow(bytes) => VertexData::Borrowed(sized(bytes, size)?),
        };

        self.topology = topology;
        self.usage = usage;
        self.stride = stride;
        self.element_count = element_count;
        self.elements = declaration.elements;
        self.vertex_size = declaration.vertex_size;
        self.data = data;
        Ok(())
    }

    /// Return to the default-constructed state, keeping the ID.
    pub fn reset(&mut self) {
        self.topology = PrimitiveTopology::Undefined;
        self.usage = VertexBufferUsage::Standard;
        self.stride = 0;
        self.element_count = 0;
        self.elements.clear();
        self.vertex_size = 0;
        self.data = VertexData::Empty;
    }

    /// Drop the owned CPU copy once the native resource has captured it.
    pub(crate) fn discard_cpu_copy(&mut self) {
        if self.data.is_owned() {
            self.data = VertexData::Empty;
        }
    }

    /// Process-wide unique ID of this buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Usage hint.
    pub fn usage(&self) -> VertexBufferUsage {
        self.usage
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of vertices.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    /// Number of primitives, always derived from topology and vertex count.
    pub fn primitive_count(&self) -> u32 {
        self.topology.primitive_count(self.element_count)
    }

    /// Number of elements in the declaration.
    pub fn declaration_count(&self) -> usize {
        self.elements.len()
    }

    /// Declaration with resolved offsets.
    pub fn elements(&self) -> &[VertexElementDescriptor] {
        &self.elements
    }

    /// Bytes covered by the declaration within one vertex.
    pub fn vertex_size(&self) -> u32 {
        self.vertex_size
    }

    /// Total size of the vertex data in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.stride as usize * self.element_count as usize
    }

    /// CPU-side bytes, if still held.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_slice()
    }

    /// Writable CPU-side bytes; `None` when borrowed or discarded.
    pub(crate) fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_mut_slice()
    }

    /// Whether the bytes belong to the caller.
    pub fn is_borrowed(&self) -> bool {
        self.data.is_borrowed()
    }

    /// Whether a CPU copy of the data is available.
    pub fn has_cpu_copy(&self) -> bool {
        !self.data.is_empty()
    }

    /// Bytes of vertex `index`, if the CPU copy is available.
    pub fn vertex_bytes(&self, index: u32) -> Option<&[u8]> {
        if index >= self.element_count {
            return None;
        }
        let start = index as usize * self.stride as usize;
        self.data()?.get(start..start + self.stride as usize)
    }

    /// Whether the buffer currently holds a declaration.
    pub fn is_configured(&self) -> bool {
        self.stride != 0
    }
}

impl Default for VertexBufferBase<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn sized(bytes: &[u8], size: usize) -> Result<&[u8], GraphicsError> {
    bytes.get(..size).ok_or_else(|| {
        GraphicsError::InvalidParameter(format!(
            "{} bytes supplied for a {size}-byte vertex buffer",
            bytes.len()
        ))
    })
}
