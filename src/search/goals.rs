//! Goal-category checks used by the hint system.

use super::Search;
use crate::WorldId;
use crate::state::State;
use std::collections::BTreeMap;

/// Which worlds meet which goals of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryGoals {
    /// Goal name -> worlds whose state fully meets it. Every goal of a tested
    /// world is listed, met or not.
    pub goals: BTreeMap<String, Vec<WorldId>>,
    /// World -> goals it already meets.
    pub by_world: BTreeMap<WorldId, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidGoals {
    pub categories: BTreeMap<String, CategoryGoals>,
    /// Every world has won.
    pub way_of_the_hero: bool,
}

impl Search<'_> {
    /// Test the named goal categories against the current states, optionally
    /// for one world only.
    pub fn test_category_goals<I>(&self, categories: I, world_filter: Option<WorldId>) -> ValidGoals
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut valid = ValidGoals::default();
        for name in categories {
            let name = name.as_ref();
            let result = valid.categories.entry(name.to_string()).or_default();
            for state in self.states.iter().filter(|state| world_filter.is_none_or(|world| state.world() == world)) {
                let world = state.world();
                let met = result.by_world.entry(world).or_default();
                let Some(category) = state.context().goals.iter().find(|category| category.name == name) else {
                    continue;
                };
                for goal in &category.goals {
                    let worlds = result.goals.entry(goal.name.clone()).or_default();
                    if goal.items.iter().all(|item| state.has_full_item_goal(item)) {
                        worlds.push(world);
                        met.push(goal.name.clone());
                    }
                }
            }
        }
        valid
    }

    /// Goals met after collecting everything reachable (in a copy).
    pub fn beatable_goals<I>(&self, categories: I) -> ValidGoals
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut search = self.copy();
        search.collect_locations(None);
        search.beatable_goals_fast(categories, None)
    }

    /// Goals met by the current states, without exploring.
    pub fn beatable_goals_fast<I>(&self, categories: I, world_filter: Option<WorldId>) -> ValidGoals
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut valid = self.test_category_goals(categories, world_filter);
        valid.way_of_the_hero = self.states.iter().all(State::won);
        valid
    }
}
