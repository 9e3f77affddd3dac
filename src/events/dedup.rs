use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::events::model::{Cell, PlacementEvent};

/// Keep only the latest placement per cell, preserving input order of the survivors.
///
/// For each cell the survivor is the first event (in input order) whose timestamp equals the
/// maximum timestamp seen at that cell. Applying this twice is the same as applying it once.
pub fn retain_latest_per_cell(events: &mut Vec<PlacementEvent>) {
    if events.is_empty() {
        return;
    }

    let mut latest: HashMap<Cell, DateTime<Utc>> = HashMap::with_capacity(events.len());
    for ev in events.iter() {
        latest
            .entry(ev.cell())
            .and_modify(|t| {
                if ev.timestamp > *t {
                    *t = ev.timestamp;
                }
            })
            .or_insert(ev.timestamp);
    }

    let mut kept: HashSet<Cell> = HashSet::with_capacity(latest.len());
    events.retain(|ev| {
        let cell = ev.cell();
        if kept.contains(&cell) || latest.get(&cell) != Some(&ev.timestamp) {
            return false;
        }
        kept.insert(cell);
        true
    });
}

/// Non-mutating variant of [`retain_latest_per_cell`].
pub fn latest_per_cell(events: &[PlacementEvent]) -> Vec<PlacementEvent> {
    let mut out = events.to_vec();
    retain_latest_per_cell(&mut out);
    out
}

#[cfg(test)]
#[path = "../../tests/unit/events/dedup.rs"]
mod tests;
