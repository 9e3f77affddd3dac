use crate::events::model::PlacementEvent;
use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Page size used when collecting events from a source.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Paging producer of timestamp-ordered placement events.
///
/// `total` may grow between calls: rows appended while a run is collecting are picked up by
/// [`collect_events`] rather than treated as an error.
pub trait EventSource {
    /// Current number of events available.
    fn total(&mut self) -> TimelapseResult<u64>;
    /// Up to `limit` events starting at `offset`, ordered by timestamp.
    fn page(&mut self, offset: u64, limit: usize) -> TimelapseResult<Vec<PlacementEvent>>;
}

/// Drain `source` page by page into one ordered vector.
#[tracing::instrument(skip(source))]
pub fn collect_events(
    source: &mut dyn EventSource,
    page_size: usize,
) -> TimelapseResult<Vec<PlacementEvent>> {
    if page_size == 0 {
        return Err(TimelapseError::validation("page size must be non-zero"));
    }

    let mut total = source.total()?;
    tracing::info!(total, page_size, "collecting placement events");

    let mut out = Vec::with_capacity(total.min(1 << 20) as usize);
    let mut offset = 0u64;
    while offset < total {
        let page = source.page(offset, page_size)?;
        if page.is_empty() {
            tracing::debug!(offset, total, "source returned an empty page, stopping");
            break;
        }
        offset += page.len() as u64;
        out.extend(page);

        total = source.total()?;
        tracing::info!("collected {} of {} events", out.len(), total);
    }

    Ok(out)
}

/// Source backed by an in-memory vector.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    events: Vec<PlacementEvent>,
}

impl MemorySource {
    /// Wrap `events`, stable-sorting them by timestamp.
    pub fn new(mut events: Vec<PlacementEvent>) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self { events }
    }

    /// Append more events (kept in timestamp order).
    pub fn push(&mut self, ev: PlacementEvent) {
        let at = self.events.partition_point(|e| e.timestamp <= ev.timestamp);
        self.events.insert(at, ev);
    }

    /// Borrow the ordered events.
    pub fn events(&self) -> &[PlacementEvent] {
        &self.events
    }
}

impl EventSource for MemorySource {
    fn total(&mut self) -> TimelapseResult<u64> {
        Ok(self.events.len() as u64)
    }

    fn page(&mut self, offset: u64, limit: usize) -> TimelapseResult<Vec<PlacementEvent>> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.events.len());
        let end = start.saturating_add(limit).min(self.events.len());
        Ok(self.events[start..end].to_vec())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/events/source.rs"]
mod tests;
