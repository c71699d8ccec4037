//! Per-world item counters.
//!
//! A [`State`] is the only mutable input of a compiled rule. It holds one
//! `u32` per catalog id plus a shared, read-only [`StateContext`] with the
//! group tables and goals of its world.

use crate::WorldId;
use crate::catalog::{Catalog, ItemEntry, ItemGroups, ItemId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One item requirement of a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGoal {
    pub name: String,
    pub item: ItemId,
    /// Count needed for the goal to be partially met (hint-worthy).
    pub minimum: u32,
    /// Count needed for the goal to be fully met.
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    pub name: String,
    pub items: Vec<ItemGoal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCategory {
    pub name: String,
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinCondition {
    /// Collect the Triforce event.
    Triforce(Option<ItemId>),
    /// Collect `goal` Triforce Pieces.
    TriforceHunt { piece: Option<ItemId>, goal: u32 },
}

/// World-level tables shared by every `State` of that world.
#[derive(Debug, Clone)]
pub struct StateContext {
    pub world: WorldId,
    pub groups: ItemGroups,
    /// Key ring -> boss key granted with it.
    pub keyring_boss_keys: HashMap<ItemId, ItemId>,
    pub win: WinCondition,
    pub goals: Vec<GoalCategory>,
}

impl StateContext {
    pub fn new(world: WorldId, groups: ItemGroups) -> Self {
        let win = WinCondition::Triforce(groups.triforce);
        Self { world, groups, keyring_boss_keys: HashMap::new(), win, goals: Vec::new() }
    }
}

#[derive(Debug, Clone)]
pub struct State {
    items: Vec<u32>,
    context: Arc<StateContext>,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.world() == other.world() && self.prog_counts().eq(other.prog_counts())
    }
}

impl Eq for State {}

impl State {
    pub fn new(context: Arc<StateContext>, capacity: usize) -> Self {
        Self { items: vec![0; capacity], context }
    }

    pub fn world(&self) -> WorldId {
        self.context.world
    }

    pub fn context(&self) -> &StateContext {
        &self.context
    }

    // --- Mutation -----------------------------------------------------------

    pub fn collect(&mut self, entry: &ItemEntry) {
        if !entry.advancement {
            return;
        }
        match entry.alias {
            Some((target, n)) => self.bump(target, n),
            None => self.bump(entry.id, 1),
        }
        if let Some(&bk) = self.context.keyring_boss_keys.get(&entry.id) {
            self.set(bk, 1);
        }
    }

    pub fn remove(&mut self, entry: &ItemEntry) {
        if !entry.advancement {
            return;
        }
        let (id, n) = entry.alias.unwrap_or((entry.id, 1));
        if let Some(count) = self.items.get_mut(id.index()) {
            *count = count.saturating_sub(n);
        }
        if let Some(&bk) = self.context.keyring_boss_keys.get(&entry.id) {
            self.set(bk, 0);
        }
    }

    fn bump(&mut self, id: ItemId, n: u32) {
        let slot = self.slot(id);
        *slot = slot.saturating_add(n);
    }

    fn set(&mut self, id: ItemId, n: u32) {
        *self.slot(id) = n;
    }

    fn slot(&mut self, id: ItemId) -> &mut u32 {
        if id.index() >= self.items.len() {
            self.items.resize(id.index() + 1, 0);
        }
        &mut self.items[id.index()]
    }

    // --- Queries ------------------------------------------------------------

    pub fn item_count(&self, id: ItemId) -> u32 {
        self.items.get(id.index()).copied().unwrap_or(0)
    }

    pub fn has(&self, id: ItemId, count: u32) -> bool {
        self.item_count(id) >= count
    }

    pub fn has_any_of(&self, ids: &[ItemId]) -> bool {
        ids.iter().any(|&id| self.item_count(id) > 0)
    }

    pub fn has_all_of(&self, ids: &[ItemId]) -> bool {
        ids.iter().all(|&id| self.item_count(id) > 0)
    }

    pub fn count_of(&self, ids: &[ItemId]) -> u32 {
        ids.iter().map(|&id| self.item_count(id)).sum()
    }

    fn count_group(&self, ids: impl IntoIterator<Item = ItemId>) -> u32 {
        ids.into_iter().map(|id| self.item_count(id)).sum()
    }

    /// Any bottle, or a second Ruto's Letter (the first one is delivered).
    pub fn has_bottle(&self) -> bool {
        let groups = &self.context.groups;
        self.has_any_of(&groups.bottles) || groups.rutos_letter.is_some_and(|letter| self.has(letter, 2))
    }

    pub fn heart_count(&self) -> u32 {
        self.context.groups.piece_of_heart.map_or(0, |poh| self.item_count(poh)) / 4 + 3
    }

    pub fn has_hearts(&self, count: u32) -> bool {
        self.heart_count() >= count
    }

    pub fn has_medallions(&self, count: u32) -> bool {
        self.count_group(self.context.groups.medallions.iter().copied()) >= count
    }

    pub fn has_stones(&self, count: u32) -> bool {
        self.count_group(self.context.groups.stones.iter().copied()) >= count
    }

    pub fn has_dungeon_rewards(&self, count: u32) -> bool {
        self.count_group(self.context.groups.dungeon_rewards()) >= count
    }

    pub fn has_ocarina_buttons(&self, count: u32) -> bool {
        self.count_group(self.context.groups.ocarina_buttons.iter().copied()) >= count
    }

    pub fn won(&self) -> bool {
        match self.context.win {
            WinCondition::Triforce(item) => item.is_some_and(|id| self.has(id, 1)),
            WinCondition::TriforceHunt { piece, goal } => piece.is_some_and(|id| self.has(id, goal)),
        }
    }

    pub fn has_item_goal(&self, goal: &ItemGoal) -> bool {
        self.has(goal.item, goal.minimum)
    }

    pub fn has_full_item_goal(&self, goal: &ItemGoal) -> bool {
        self.has(goal.item, goal.quantity)
    }

    pub fn has_all_item_goals(&self) -> bool {
        self.context
            .goals
            .iter()
            .flat_map(|category| &category.goals)
            .flat_map(|goal| &goal.items)
            .all(|item| self.has_full_item_goal(item))
    }

    fn prog_counts(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.items.iter().copied().enumerate().filter(|&(_, n)| n > 0)
    }

    /// Non-zero counters by display name.
    pub fn prog_items(&self, catalog: &Catalog) -> BTreeMap<String, u32> {
        self.prog_counts()
            .filter_map(|(i, n)| catalog.get(ItemId::from_index(i)).map(|entry| (entry.name.clone(), n)))
            .collect()
    }
}
