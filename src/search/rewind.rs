//! Checkpointed search.
//!
//! ```text
//! history: [ snapshot 0 | snapshot 1 | ... ]   live: search.cache
//!            ^ reset()                  ^ unvisit() may pop back here
//! ```

use super::{Search, SearchCache};
use crate::LocationId;
use crate::state::State;
use crate::world::Multiworld;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// A `Search` that can rewind to earlier spheres.
///
/// Dereferences to the inner `Search` for everything else.
#[derive(Debug)]
pub struct RewindableSearch<'g> {
    search: Search<'g>,
    /// Snapshots below the live cache, oldest first.
    history: Vec<SearchCache>,
}

impl<'g> RewindableSearch<'g> {
    pub fn new(graph: &'g Multiworld, states: &[State]) -> Self {
        Self::from(Search::new(graph, states))
    }

    /// Save the live cache; later changes only touch the live copy.
    pub fn checkpoint(&mut self) {
        self.history.push(self.search.cache.clone());
    }

    /// Forget that `location` was visited. When it was already visited at the
    /// last checkpoint, that checkpoint becomes live again first.
    ///
    /// Unvisit in reverse sphere order; panics if `location` is not visited.
    pub fn unvisit(&mut self, location: LocationId) {
        assert!(self.search.visited(location), "cannot unvisit a location that was never visited: {location:?}");
        if self.history.last().is_some_and(|previous| previous.visited_locations.contains(&location)) {
            if let Some(previous) = self.history.pop() {
                self.search.cache = previous;
                debug!(depth = self.history.len(), "rewound to checkpoint");
            }
        }
        self.search.cache.visited_locations.remove(&location);
    }

    /// Drop every checkpoint but the first and make it live. Items stay
    /// collected.
    pub fn reset(&mut self) {
        if self.history.is_empty() {
            return;
        }
        self.search.cache = self.history.swap_remove(0);
        self.history.clear();
    }

    /// Number of saved snapshots.
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn into_inner(self) -> Search<'g> {
        self.search
    }
}

impl<'g> From<Search<'g>> for RewindableSearch<'g> {
    fn from(search: Search<'g>) -> Self {
        Self { search, history: Vec::new() }
    }
}

impl<'g> Deref for RewindableSearch<'g> {
    type Target = Search<'g>;

    fn deref(&self) -> &Search<'g> {
        &self.search
    }
}

impl DerefMut for RewindableSearch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.search
    }
}
