//! The marker index kept by every [`crate::timeline::Timeline`].
//!
//! The source represents markers as a hand-rolled doubly linked list with
//! a hint-guided cursor search, so that repeated queries near the same
//! time are amortized O(1). In idiomatic Rust the ordered-map structure
//! (`BTreeMap`) gives the uniqueness/ordering invariant
//! (`prev.time < time < next.time`) for free and range queries replace
//! the cursor walk; see DESIGN.md for why this substitution is made.

use std::collections::BTreeMap;

use crate::entity::EntityHandle;

/// Entities that start or end at one point in local time.
#[derive(Default)]
pub struct MarkerEntry {
    pub start_entities: Vec<EntityHandle>,
    pub end_entities: Vec<EntityHandle>,
}

/// Ordered, unique-by-time index of structural changes on one timeline.
#[derive(Default)]
pub struct MarkerList {
    markers: BTreeMap<i64, MarkerEntry>,
}

impl MarkerList {
    pub fn new() -> Self {
        MarkerList::default()
    }

    /// Create the marker at `time` if it doesn't exist yet, and return a
    /// mutable reference to it. Markers are never deleted once created.
    pub fn get_or_create(&mut self, time: i64) -> &mut MarkerEntry {
        self.markers.entry(time).or_default()
    }

    /// Return the marker at `time`, if one has been created.
    pub fn get(&self, time: i64) -> Option<&MarkerEntry> {
        self.markers.get(&time)
    }

    /// The nearest marker time strictly past `time` in `forward`
    /// direction, or `None` if there isn't one.
    pub fn next_marker_time(&self, time: i64, forward: bool) -> Option<i64> {
        if forward {
            self.markers.range((time + 1)..).next().map(|(t, _)| *t)
        } else {
            self.markers.range(..time).next_back().map(|(t, _)| *t)
        }
    }

    /// Iterate this marker's `start_entities`/`end_entities` as required
    /// by `loadEntities`, already in the order they must be processed:
    /// reverse insertion order, so that ties resolve the same way on
    /// both forward and backward passes.
    pub fn ordered_starts(&self, time: i64) -> Vec<EntityHandle> {
        self.markers
            .get(&time)
            .map(|m| m.start_entities.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ordered_ends(&self, time: i64) -> Vec<EntityHandle> {
        self.markers
            .get(&time)
            .map(|m| m.end_entities.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.markers.len()
    }
}
