use super::Search;
use crate::LocationId;
use std::iter::FusedIterator;

/// Position inside a run of sphere passes over a fixed candidate list.
///
/// Every pass starts with `next_sphere`; the run ends after a full pass that
/// visits nothing. Kept apart from the search so callers can collect items
/// between steps.
#[derive(Debug)]
pub(crate) struct SphereCursor {
    candidates: Vec<LocationId>,
    next: usize,
    found: bool,
    done: bool,
}

impl SphereCursor {
    pub fn new(candidates: Vec<LocationId>) -> Self {
        Self { candidates, next: 0, found: false, done: false }
    }

    pub fn advance(&mut self, search: &mut Search<'_>) -> Option<LocationId> {
        while !self.done {
            if self.next == 0 {
                search.next_sphere();
                self.found = false;
            }
            while let Some(&id) = self.candidates.get(self.next) {
                self.next += 1;
                if search.try_visit(id) {
                    self.found = true;
                    return Some(id);
                }
            }
            self.next = 0;
            self.done = !self.found;
        }
        None
    }
}

/// Reachable, not yet visited locations, produced lazily.
///
/// Each yielded location is marked visited before it is returned. The
/// sequence is finite and cannot be restarted; items are not collected.
#[derive(Debug)]
pub struct ReachableLocations<'s, 'g> {
    search: &'s mut Search<'g>,
    cursor: SphereCursor,
}

impl<'s, 'g> ReachableLocations<'s, 'g> {
    pub(crate) fn new(search: &'s mut Search<'g>, candidates: Vec<LocationId>) -> Self {
        Self { search, cursor: SphereCursor::new(candidates) }
    }
}

impl Iterator for ReachableLocations<'_, '_> {
    type Item = LocationId;

    fn next(&mut self) -> Option<LocationId> {
        self.cursor.advance(self.search)
    }
}

impl FusedIterator for ReachableLocations<'_, '_> {}
