//! Per-context render state: the active-stream table and layout memoization.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::GraphicsError;
use crate::types::MAX_VERTEX_STREAMS;

use super::{StreamSource, VertexBufferApi};

/// Per-context state owned by a backend.
pub trait BackendState: Default {
    /// Number of native layouts built in this context so far.
    fn layout_rebuilds(&self) -> u64;
}

struct StreamSlot<S> {
    source: Weak<S>,
    resource_id: u64,
    offset: u32,
}

/// A live stream taken from the table for one draw.
#[derive(Debug)]
pub struct BoundStream<S> {
    /// The native resource.
    pub source: Arc<S>,
    /// Byte offset of the first vertex.
    pub offset: u32,
    /// Stream slot index.
    pub slot: u32,
}

/// Snapshot of the active-stream table for one draw.
#[derive(Debug)]
pub struct ResolvedStreams<S> {
    /// One entry per slot below the active count; `None` for gaps.
    pub streams: Vec<Option<BoundStream<S>>>,
    /// Resource ID per slot, `0` for gaps. Key of the layout cache.
    pub ids: Vec<u64>,
}

impl<S> ResolvedStreams<S> {
    /// Iterate over the bound streams, skipping gaps.
    pub fn bound(&self) -> impl Iterator<Item = &BoundStream<S>> {
        self.streams.iter().flatten()
    }
}

/// Explicit active-stream table for one graphics context.
///
/// Holds non-owning references to bound stream sources. A source dropped by
/// its buffer is unreachable from here and its slot is cleared on the next
/// [`resolve_streams`](Self::resolve_streams).
pub struct RenderContext<A: VertexBufferApi> {
    slots: Vec<Option<StreamSlot<A::Source>>>,
    active: usize,
    state: A::ContextState,
}

impl<A: VertexBufferApi> RenderContext<A> {
    /// Create a context with every stream slot empty.
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_VERTEX_STREAMS).map(|_| None).collect(),
            active: 0,
            state: A::ContextState::default(),
        }
    }

    /// Bind `source` to stream `slot`, starting `offset` bytes in.
    pub fn set_stream(
        &mut self,
        slot: usize,
        source: &Arc<A::Source>,
        offset: u32,
    ) -> Result<(), GraphicsError> {
        if slot >= MAX_VERTEX_STREAMS {
            return Err(GraphicsError::InvalidParameter(format!(
                "stream {slot} exceeds the maximum of {MAX_VERTEX_STREAMS}"
            )));
        }
        self.slots[slot] = Some(StreamSlot {
            source: Arc::downgrade(source),
            resource_id: source.resource_id(),
            offset,
        });
        self.active = self.active.max(slot + 1);
        Ok(())
    }

    /// Clear stream `slot`.
    pub fn clear_stream(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
            self.shrink();
        }
    }

    /// Clear every slot bound to `resource_id`. Returns how many were cleared.
    pub fn release(&mut self, resource_id: u64) -> usize {
        let mut cleared = 0;
        for entry in &mut self.slots {
            if entry
                .as_ref()
                .is_some_and(|slot| slot.resource_id == resource_id)
            {
                *entry = None;
                cleared += 1;
            }
        }
        self.shrink();
        cleared
    }

    /// Clear every slot.
    pub fn clear_streams(&mut self) {
        for entry in &mut self.slots {
            *entry = None;
        }
        self.active = 0;
    }

    /// Highest bound slot index plus one.
    pub fn active_streams(&self) -> usize {
        self.active
    }

    /// Resource ID bound to `slot`, if its source is still alive.
    pub fn stream_resource_id(&self, slot: usize) -> Option<u64> {
        let entry = self.slots.get(slot)?.as_ref()?;
        (entry.source.strong_count() > 0).then_some(entry.resource_id)
    }

    /// Upgrade every active slot, clearing the ones whose source is gone.
    pub fn resolve_streams(&mut self) -> ResolvedStreams<A::Source> {
        let mut streams = Vec::with_capacity(self.active);
        for (slot, entry) in self.slots.iter_mut().take(self.active).enumerate() {
            let bound = entry.as_ref().and_then(|e| {
                e.source.upgrade().map(|source| BoundStream {
                    source,
                    offset: e.offset,
                    slot: slot as u32,
                })
            });
            if bound.is_none() && entry.is_some() {
                log::debug!("{}: clearing stale stream {slot}", A::NAME);
                *entry = None;
            }
            streams.push(bound);
        }
        self.shrink();
        streams.truncate(self.active);

        let ids = streams
            .iter()
            .map(|s| s.as_ref().map_or(0, |s| s.source.resource_id()))
            .collect();
        ResolvedStreams { streams, ids }
    }

    /// Backend state of this context.
    pub fn state(&self) -> &A::ContextState {
        &self.state
    }

    /// Mutable backend state of this context.
    pub fn state_mut(&mut self) -> &mut A::ContextState {
        &mut self.state
    }

    /// Number of native layouts built in this context so far.
    pub fn layout_rebuilds(&self) -> u64 {
        self.state.layout_rebuilds()
    }

    fn shrink(&mut self) {
        while self.active > 0 && self.slots[self.active - 1].is_none() {
            self.active -= 1;
        }
    }
}

impl<A: VertexBufferApi> Default for RenderContext<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: VertexBufferApi> fmt::Debug for RenderContext<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<Option<u64>> = (0..self.active)
            .map(|slot| self.stream_resource_id(slot))
            .collect();
        f.debug_struct("RenderContext")
            .field("backend", &A::NAME)
            .field("streams", &ids)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Layout cache
// ============================================================================

struct CachedLayout<L> {
    ids: Vec<u64>,
    layout: L,
}

/// Native layouts memoized per active stream count.
///
/// Each stream count has one entry, keyed by the resource IDs of its slots.
/// Alternating between configurations with different stream counts never
/// evicts the other configuration's layout.
pub struct LayoutCache<L> {
    entries: Vec<Option<CachedLayout<L>>>,
    rebuilds: u64,
}

impl<L> LayoutCache<L> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: (0..=MAX_VERTEX_STREAMS).map(|_| None).collect(),
            rebuilds: 0,
        }
    }

    /// Cached layout for exactly this ID combination.
    pub fn lookup(&self, ids: &[u64]) -> Option<&L> {
        self.entries
            .get(ids.len())?
            .as_ref()
            .filter(|entry| entry.ids == ids)
            .map(|entry| &entry.layout)
    }

    /// Replace the entry for `ids.len()` streams, dropping the previous layout.
    pub fn store(&mut self, ids: Vec<u64>, layout: L) -> &L {
        self.rebuilds += 1;
        let index = ids.len();
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        &self.entries[index].insert(CachedLayout { ids, layout }).layout
    }

    /// Number of layouts stored so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Drop every cached layout.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
    }

    /// Number of stream counts with a cached layout.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L> Default for LayoutCache<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> fmt::Debug for LayoutCache<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutCache")
            .field("entries", &self.len())
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}
