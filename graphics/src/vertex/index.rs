//! Index data shared by index buffer backends.

use crate::error::GraphicsError;
use crate::types::PrimitiveTopology;

use super::base::next_resource_id;

/// Width of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Indices handed to [`IndexBufferBase::new`].
#[derive(Debug, Clone, Copy)]
pub enum IndexSource<'s> {
    /// 16-bit indices.
    U16(&'s [u16]),
    /// 32-bit indices.
    U32(&'s [u32]),
}

/// Backend-independent index buffer state. Always owns a copy of its indices.
#[derive(Debug, Clone)]
pub struct IndexBufferBase {
    id: u64,
    format: IndexFormat,
    count: u32,
    topology: PrimitiveTopology,
    data: Vec<u8>,
}

impl IndexBufferBase {
    /// Copy `indices` into a new index buffer.
    pub fn new(
        indices: IndexSource<'_>,
        topology: PrimitiveTopology,
    ) -> Result<Self, GraphicsError> {
        let (format, count, bytes): (_, usize, &[u8]) = match indices {
            IndexSource::U16(indices) => {
                (IndexFormat::U16, indices.len(), bytemuck::cast_slice(indices))
            }
            IndexSource::U32(indices) => {
                (IndexFormat::U32, indices.len(), bytemuck::cast_slice(indices))
            }
        };
        if count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "index buffer is empty".to_string(),
            ));
        }
        let count = u32::try_from(count).map_err(|_| {
            GraphicsError::InvalidParameter(format!("{count} indices exceed the index range"))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|_| GraphicsError::OutOfMemory)?;
        data.extend_from_slice(bytes);

        Ok(Self {
            id: next_resource_id(),
            format,
            count,
            topology,
            data,
        })
    }

    /// Process-wide unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width of one index.
    pub fn format(&self) -> IndexFormat {
        self.format
    }

    /// Number of indices.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Number of primitives the indices form.
    pub fn primitive_count(&self) -> u32 {
        self.topology.primitive_count(self.count)
    }

    /// Raw index bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Index `i`, widened to 32 bits.
    pub fn index(&self, i: u32) -> Option<u32> {
        let size = self.format.size() as usize;
        let start = i as usize * size;
        let bytes = self.data.get(start..start + size)?;
        Some(match self.format {
            IndexFormat::U16 => u32::from(u16::from_ne_bytes([bytes[0], bytes[1]])),
            IndexFormat::U32 => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_indices() {
        let base = IndexBufferBase::new(
            IndexSource::U16(&[0, 1, 2, 2, 1, 3]),
            PrimitiveTopology::TriangleList,
        )
        .unwrap();
        assert_eq!(base.format(), IndexFormat::U16);
        assert_eq!(base.count(), 6);
        assert_eq!(base.primitive_count(), 2);
        assert_eq!(base.data().len(), 12);
        assert_eq!(base.index(5), Some(3));
        assert_eq!(base.index(6), None);
    }

    #[test]
    fn test_u32_indices() {
        let base = IndexBufferBase::new(IndexSource::U32(&[70_000, 1]), PrimitiveTopology::LineList)
            .unwrap();
        assert_eq!(base.format().size(), 4);
        assert_eq!(base.index(0), Some(70_000));
        assert_eq!(base.primitive_count(), 1);
    }

    #[test]
    fn test_empty_is_rejected() {
        let result = IndexBufferBase::new(IndexSource::U16(&[]), PrimitiveTopology::TriangleList);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }
}
