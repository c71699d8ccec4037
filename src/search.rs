//! Incremental reachability search over a compiled `Multiworld`.
//!
//! ```text
//! Search::new(graph, states)
//!    │   seed both frontiers with every world's Root exits
//!    v
//! next_sphere ──> expand_regions(adult), expand_regions(child)
//!    │              - exit rule passes: discover target, queue its exits
//!    │              - new time of day at Root: retry this pass's failures
//!    │              - otherwise: keep the exit for the next call
//!    v
//! iter_reachable_locations / collect_locations
//!    │   visit candidate locations whose region is discovered (adult first)
//!    │   and whose rule passes; loop next_sphere until a pass finds nothing
//!    v
//! can_beat_game, beatable_goals, spot_access, can_reach
//! ```
//!
//! `SearchCache` holds everything a pass mutates. A `Search` owns exactly one
//! live cache; `RewindableSearch` adds a stack of snapshots beneath it.
//!
//! Time of day is discovered lazily: regions are recorded with the bits they
//! provide, and a rule that asks for a time the spot's region does not have
//! yet triggers `Reachability::expand_tod_regions`, which spreads the bits
//! over already discovered regions only.

#[path = "search/cache.rs"]
mod cache;
#[path = "search/goals.rs"]
mod goals;
#[path = "search/iter.rs"]
mod iter;
#[path = "search/metrics.rs"]
mod metrics;
#[path = "search/reach.rs"]
mod reach;
#[path = "search/rewind.rs"]
mod rewind;


pub use cache::{RegionMap, SearchCache};
pub use goals::{CategoryGoals, ValidGoals};
pub use iter::ReachableLocations;
pub use metrics::{PlaythroughMetrics, SphereMetrics};
pub use rewind::RewindableSearch;

use crate::rules::AccessRule;
use crate::state::State;
use crate::world::{Multiworld, PlacedItem};
use crate::{Age, AgeScope, EntranceId, LocationId, RegionId, Spot, TimeOfDay, WorldId};
use iter::SphereCursor;
use reach::Reachability;
use std::collections::{BTreeSet, HashSet};
use tracing::trace;

/// The live region maps and visited set after `next_sphere`.
#[derive(Debug, Clone, Copy)]
pub struct SphereView<'a> {
    pub child_regions: &'a RegionMap,
    pub adult_regions: &'a RegionMap,
    pub visited_locations: &'a HashSet<LocationId>,
}

#[derive(Debug)]
pub struct Search<'g> {
    graph: &'g Multiworld,
    states: Vec<State>,
    cache: SearchCache,
    /// Spare queue buffer, swapped with the frontier on every pass.
    scratch: Vec<EntranceId>,
}

impl<'g> Search<'g> {
    /// Start a search from copies of `states` (one per world, in world order)
    /// and run the first sphere.
    pub fn new(graph: &'g Multiworld, states: &[State]) -> Self {
        assert_eq!(states.len(), graph.worlds().len(), "one state per world is required");
        assert!(
            states.iter().enumerate().all(|(i, state)| state.world().index() == i),
            "states must be given in world order"
        );
        let cache = SearchCache::seeded(graph.worlds().iter().map(|world| world.root()), |root| {
            graph.region(root).exits.clone()
        });
        let mut search = Self { graph, states: states.to_vec(), cache, scratch: Vec::new() };
        search.next_sphere();
        search
    }

    /// Fresh search that has collected `items` and everything reachable with them.
    pub fn max_explore(graph: &'g Multiworld, states: &[State], items: impl IntoIterator<Item = PlacedItem>) -> Self {
        let mut search = Self::new(graph, states);
        search.collect_all(items);
        search.collect_locations(None);
        search
    }

    /// Fresh search that has collected `items` and expanded one sphere.
    pub fn with_items(graph: &'g Multiworld, states: &[State], items: impl IntoIterator<Item = PlacedItem>) -> Self {
        let mut search = Self::new(graph, states);
        search.collect_all(items);
        search.next_sphere();
        search
    }

    /// Independent copy of the states and the live cache. The copy has no
    /// checkpoint history.
    pub fn copy(&self) -> Search<'g> {
        Search { graph: self.graph, states: self.states.clone(), cache: self.cache.clone(), scratch: Vec::new() }
    }

    pub fn graph(&self) -> &'g Multiworld {
        self.graph
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, world: WorldId) -> &State {
        &self.states[world.index()]
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    // --- Items --------------------------------------------------------------

    pub fn collect(&mut self, item: PlacedItem) {
        let entry = self.graph.catalog().entry(item.id);
        self.states[item.world.index()].collect(entry);
    }

    pub fn collect_all(&mut self, items: impl IntoIterator<Item = PlacedItem>) {
        for item in items {
            self.collect(item);
        }
    }

    /// Remove `item` from its world's state. The cache is left as is.
    pub fn uncollect(&mut self, item: PlacedItem) {
        let entry = self.graph.catalog().entry(item.id);
        self.states[item.world.index()].remove(entry);
    }

    // --- Expansion ----------------------------------------------------------

    fn reachability(&mut self) -> Reachability<'_> {
        Reachability {
            graph: self.graph,
            states: &self.states,
            child: &mut self.cache.child_regions,
            adult: &mut self.cache.adult_regions,
        }
    }

    /// Expand both frontiers as far as the current states allow.
    pub fn next_sphere(&mut self) -> SphereView<'_> {
        self.expand_regions(Age::Adult);
        self.expand_regions(Age::Child);
        SphereView {
            child_regions: &self.cache.child_regions,
            adult_regions: &self.cache.adult_regions,
            visited_locations: &self.cache.visited_locations,
        }
    }

    fn expand_regions(&mut self, age: Age) {
        let graph = self.graph;
        let mut queue = std::mem::take(self.cache.queue_mut(age));
        let mut failed = std::mem::take(&mut self.scratch);
        failed.clear();

        let mut i = 0;
        while i < queue.len() {
            let id = queue[i];
            i += 1;
            let exit = graph.entrance(id);
            let Some(target) = exit.connected_region else { continue };
            if self.cache.regions(age).contains_key(&target) {
                continue;
            }
            if !self.reachability().eval(&exit.access_rule, exit.world, exit.parent_region, Some(age), TimeOfDay::NONE) {
                failed.push(id);
                continue;
            }

            let region = graph.region(target);
            let regions = self.cache.regions_mut(age);
            let root = regions.entry(graph.root(exit.world)).or_default();
            if !root.contains(region.provides_time) {
                // New time of day for the world: everything that failed may pass now.
                *root |= region.provides_time;
                queue.append(&mut failed);
            }
            regions.insert(target, region.provides_time);
            queue.extend(region.exits.iter().copied());
            trace!(region = %region.name, ?age, "discovered region");
        }

        queue.clear();
        self.scratch = queue;
        *self.cache.queue_mut(age) = failed;
    }

    /// Mark `id` visited if its region is discovered and its rule passes.
    pub(crate) fn try_visit(&mut self, id: LocationId) -> bool {
        if self.cache.visited_locations.contains(&id) {
            return false;
        }
        let graph = self.graph;
        let location = graph.location(id);
        for age in [Age::Adult, Age::Child] {
            if self.cache.regions(age).contains_key(&location.parent_region)
                && self.reachability().eval(
                    &location.access_rule,
                    location.world,
                    location.parent_region,
                    Some(age),
                    TimeOfDay::NONE,
                )
            {
                self.cache.visited_locations.insert(id);
                return true;
            }
        }
        false
    }

    // --- Locations ----------------------------------------------------------

    /// Lazily visit reachable `candidates`; see [`ReachableLocations`].
    pub fn iter_reachable_locations(
        &mut self,
        candidates: impl IntoIterator<Item = LocationId>,
    ) -> ReachableLocations<'_, 'g> {
        ReachableLocations::new(self, candidates.into_iter().collect())
    }

    /// Visit every reachable candidate (progression locations by default),
    /// collecting each item as soon as it is found.
    pub fn collect_locations(&mut self, candidates: Option<&[LocationId]>) {
        let mut cursor = SphereCursor::new(self.candidates_or_progression(candidates));
        while let Some(id) = cursor.advance(self) {
            if let Some(item) = self.graph.location(id).item {
                self.collect(item);
            }
        }
    }

    /// Like `collect_locations`, without collecting.
    pub fn visit_locations(&mut self, candidates: Option<&[LocationId]>) {
        let mut cursor = SphereCursor::new(self.candidates_or_progression(candidates));
        while cursor.advance(self).is_some() {}
    }

    fn candidates_or_progression(&self, candidates: Option<&[LocationId]>) -> Vec<LocationId> {
        match candidates {
            Some(candidates) if !candidates.is_empty() => candidates.to_vec(),
            _ => self.progression_locations(),
        }
    }

    /// Locations of every world holding an advancement item.
    pub fn progression_locations(&self) -> Vec<LocationId> {
        let catalog = self.graph.catalog();
        self.graph
            .worlds()
            .iter()
            .flat_map(|world| world.locations().iter().copied())
            .filter(|&id| self.graph.location(id).item.is_some_and(|item| catalog.entry(item.id).advancement))
            .collect()
    }

    /// Mark every world's skipped locations visited, yielding them.
    pub fn iter_pseudo_starting_locations(&mut self) -> impl Iterator<Item = LocationId> + '_ {
        let graph = self.graph;
        let visited = &mut self.cache.visited_locations;
        graph.worlds().iter().flat_map(|world| world.skipped().iter().copied()).inspect(move |&id| {
            visited.insert(id);
        })
    }

    pub fn collect_pseudo_starting_items(&mut self) {
        let locations: Vec<_> = self.iter_pseudo_starting_locations().collect();
        for id in locations {
            if let Some(item) = self.graph.location(id).item {
                self.collect(item);
            }
        }
    }

    pub fn visited(&self, location: LocationId) -> bool {
        self.cache.visited_locations.contains(&location)
    }

    // --- Queries ------------------------------------------------------------

    pub fn reachable_regions(&self, scope: AgeScope) -> BTreeSet<RegionId> {
        let child = self.cache.child_regions.keys().copied();
        let adult = self.cache.adult_regions.keys().copied();
        match scope {
            AgeScope::Child => child.collect(),
            AgeScope::Adult => adult.collect(),
            AgeScope::Both => adult.filter(|region| self.cache.child_regions.contains_key(region)).collect(),
            AgeScope::Either => child.chain(adult).collect(),
        }
    }

    /// Whether `region` has been discovered for `scope`, at one of `tod` when
    /// non-empty.
    pub fn can_reach(&mut self, region: RegionId, scope: AgeScope, tod: TimeOfDay) -> bool {
        self.reachability().can_reach(region, scope, tod)
    }

    /// The spot's region is reachable and its rule passes, for `scope`.
    pub fn spot_access(&mut self, spot: Spot, scope: AgeScope, tod: TimeOfDay) -> bool {
        let graph = self.graph;
        let (rule, world, region) = match spot {
            Spot::Location(id) => {
                let location = graph.location(id);
                (&location.access_rule, location.world, location.parent_region)
            }
            Spot::Entrance(id) => {
                let entrance = graph.entrance(id);
                (&entrance.access_rule, entrance.world, entrance.parent_region)
            }
        };
        let mut reach = self.reachability();
        match scope {
            AgeScope::Child => spot_as(&mut reach, rule, world, region, Age::Child, tod),
            AgeScope::Adult => spot_as(&mut reach, rule, world, region, Age::Adult, tod),
            AgeScope::Either => {
                spot_as(&mut reach, rule, world, region, Age::Adult, tod)
                    || spot_as(&mut reach, rule, world, region, Age::Child, tod)
            }
            AgeScope::Both => {
                reach.can_reach(region, AgeScope::Both, tod)
                    && reach.eval(rule, world, region, Some(Age::Adult), tod)
                    && reach.eval(rule, world, region, Some(Age::Child), tod)
            }
        }
    }

    /// `spot_access` for a location of `world` given by name.
    pub fn can_reach_spot(&mut self, world: WorldId, location: &str, scope: AgeScope, tod: TimeOfDay) -> bool {
        match self.graph.location_by_name(world, location) {
            Some(id) => self.spot_access(Spot::Location(id), scope, tod),
            None => false,
        }
    }

    /// Every world has won, now or (with `scan_for_items`) after collecting
    /// everything reachable in a copy of this search.
    pub fn can_beat_game(&self, scan_for_items: bool) -> bool {
        self.can_beat_game_with(scan_for_items, State::won)
    }

    pub fn can_beat_game_with(&self, scan_for_items: bool, predicate: impl Fn(&State) -> bool) -> bool {
        if self.states.iter().all(&predicate) {
            return true;
        }
        if !scan_for_items {
            return false;
        }
        let mut search = self.copy();
        search.collect_locations(None);
        search.states.iter().all(predicate)
    }
}

fn spot_as(
    reach: &mut Reachability<'_>,
    rule: &AccessRule,
    world: WorldId,
    region: RegionId,
    age: Age,
    tod: TimeOfDay,
) -> bool {
    reach.can_reach(region, AgeScope::from(age), tod) && reach.eval(rule, world, region, Some(age), tod)
}
