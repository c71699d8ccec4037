//! Region reachability with lazy time-of-day propagation.
//!
//! Rules ask the search whether the spot's region can be reached at a given
//! time of day while an exit is being expanded, so the oracle borrows the
//! live region maps mutably next to the (shared) item states.

use super::cache::RegionMap;
use crate::rules::{AccessRule, EvalCtx, Reach};
use crate::state::State;
use crate::world::Multiworld;
use crate::{Age, AgeScope, RegionId, TimeOfDay, WorldId};
use tracing::trace;

pub(crate) struct Reachability<'a> {
    pub graph: &'a Multiworld,
    pub states: &'a [State],
    pub child: &'a mut RegionMap,
    pub adult: &'a mut RegionMap,
}

impl Reachability<'_> {
    fn regions(&mut self, age: Age) -> &mut RegionMap {
        match age {
            Age::Child => &mut *self.child,
            Age::Adult => &mut *self.adult,
        }
    }

    /// Evaluate `rule` for a spot of `world` whose parent region is `region`.
    pub fn eval(
        &mut self,
        rule: &AccessRule,
        world: WorldId,
        region: RegionId,
        age: Option<Age>,
        tod: TimeOfDay,
    ) -> bool {
        let states = self.states;
        let state = &states[world.index()];
        rule.eval(&mut EvalCtx { state, region: Some(region), age, tod, reach: self })
    }

    pub fn can_reach(&mut self, region: RegionId, scope: AgeScope, tod: TimeOfDay) -> bool {
        match scope {
            AgeScope::Child => self.can_reach_as(region, Age::Child, tod),
            AgeScope::Adult => self.can_reach_as(region, Age::Adult, tod),
            AgeScope::Both => self.can_reach_as(region, Age::Adult, tod) && self.can_reach_as(region, Age::Child, tod),
            AgeScope::Either => self.can_reach_as(region, Age::Adult, tod) || self.can_reach_as(region, Age::Child, tod),
        }
    }

    fn can_reach_as(&mut self, region: RegionId, age: Age, tod: TimeOfDay) -> bool {
        match self.regions(age).get(&region).copied() {
            None => false,
            Some(bits) if tod.is_empty() || bits.intersects(tod) => true,
            Some(_) => self.expand_tod_regions(region, age, tod),
        }
    }

    /// Spread `tod` over already discovered regions of `goal`'s world, starting
    /// from the ones that have it. Never discovers new regions.
    fn expand_tod_regions(&mut self, goal: RegionId, age: Age, tod: TimeOfDay) -> bool {
        let graph = self.graph;
        let world = graph.region(goal).world;
        let mut queue: Vec<_> = self
            .regions(age)
            .iter()
            .filter(|&(&region, bits)| bits.intersects(tod) && graph.region(region).world == world)
            .flat_map(|(&region, _)| graph.region(region).exits.iter().copied())
            .collect();

        let mut i = 0;
        while i < queue.len() {
            let exit = graph.entrance(queue[i]);
            i += 1;
            let Some(target) = exit.connected_region else { continue };
            let missing = match self.regions(age).get(&target) {
                Some(bits) => !bits.contains(tod),
                None => false,
            };
            if !missing || !self.eval(&exit.access_rule, exit.world, exit.parent_region, Some(age), tod) {
                continue;
            }
            if let Some(bits) = self.regions(age).get_mut(&target) {
                *bits |= tod;
            }
            trace!(region = %graph.region(target).name, ?tod, "time of day reaches region");
            if target == goal {
                return true;
            }
            queue.extend(graph.region(target).exits.iter().copied());
        }
        false
    }
}

impl Reach for Reachability<'_> {
    fn can_reach(&mut self, region: RegionId, age: Option<Age>, tod: TimeOfDay) -> bool {
        Reachability::can_reach(self, region, AgeScope::from(age), tod)
    }
}
