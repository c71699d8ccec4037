//! One generation of search results.

use crate::{Age, EntranceId, LocationId, RegionId, TimeOfDay};
use std::collections::{HashMap, HashSet};

pub type RegionMap = HashMap<RegionId, TimeOfDay>;

/// Frontier queues, discovered regions per age (with the time-of-day bits
/// known to be available there) and the visited locations.
///
/// A clone is an independent snapshot; checkpoints are plain clones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCache {
    pub(crate) child_queue: Vec<EntranceId>,
    pub(crate) adult_queue: Vec<EntranceId>,
    pub(crate) child_regions: RegionMap,
    pub(crate) adult_regions: RegionMap,
    pub(crate) visited_locations: HashSet<LocationId>,
}

impl SearchCache {
    /// Both frontiers start at `roots`, with no time of day known.
    pub(crate) fn seeded(roots: impl IntoIterator<Item = RegionId>, exits: impl Fn(RegionId) -> Vec<EntranceId>) -> Self {
        let mut cache = Self::default();
        for root in roots {
            let exits = exits(root);
            cache.child_queue.extend(&exits);
            cache.adult_queue.extend(exits);
            cache.child_regions.insert(root, TimeOfDay::NONE);
            cache.adult_regions.insert(root, TimeOfDay::NONE);
        }
        cache
    }

    pub fn regions(&self, age: Age) -> &RegionMap {
        match age {
            Age::Child => &self.child_regions,
            Age::Adult => &self.adult_regions,
        }
    }

    pub(crate) fn regions_mut(&mut self, age: Age) -> &mut RegionMap {
        match age {
            Age::Child => &mut self.child_regions,
            Age::Adult => &mut self.adult_regions,
        }
    }

    pub(crate) fn queue_mut(&mut self, age: Age) -> &mut Vec<EntranceId> {
        match age {
            Age::Child => &mut self.child_queue,
            Age::Adult => &mut self.adult_queue,
        }
    }

    /// Exits waiting for a retry as `age`.
    pub fn pending(&self, age: Age) -> &[EntranceId] {
        match age {
            Age::Child => &self.child_queue,
            Age::Adult => &self.adult_queue,
        }
    }

    pub fn visited_locations(&self) -> &HashSet<LocationId> {
        &self.visited_locations
    }
}
