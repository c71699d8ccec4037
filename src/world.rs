//! Region / entrance / location arena and the two-phase rule build.
//!
//! ```text
//! add_world / add_region / add_exit / add_location      (graph only, rule text kept)
//!          │
//!          │  compile_rules
//!          │    - connect exits by target name
//!          │    - phase 1: compile every spot's rule, per world
//!          v
//!   RuleLedger: declared events + delayed at()/here() subrules
//!          │
//!          │  finish_rules  (worklist until empty)
//!          │    - compile subrule in its target region
//!          │    - never-true subrules are dropped
//!          │    - others become internal event locations
//!          v
//!   immutable Multiworld, shared by every Search
//! ```
//!
//! Handles are indices into the arena vectors and are global across worlds;
//! every entry records the world it belongs to.

use crate::catalog::{Catalog, ItemDef, ItemId};
use crate::rules::{AccessRule, Anchor, CompileError, HelperRegistry, RuleCache, RuleCompiler, RuleLedger};
use crate::settings::Settings;
use crate::state::{GoalCategory, State, StateContext, WinCondition};
use crate::{EntranceId, LocationId, RegionId, TimeOfDay, WorldId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Location kind of events and subrule locations.
const EVENT_KIND: &str = "Event";

/// Per-world configuration the compiler and the item state read.
#[derive(Debug, Clone, Default)]
pub struct WorldProfile {
    pub settings: Settings,
    /// World attributes (`dungeon_mq`, `skipped_trials`, ...), looked up after
    /// settings.
    pub attributes: Settings,
    /// Whether time-of-day checks are real; when off they fold to true.
    pub ensure_tod_access: bool,
    /// Song name -> ocarina notes (`A < ^ v >`).
    pub song_notes: BTreeMap<String, String>,
    /// Dungeons whose small key ring also grants the boss key.
    pub keyring_give_bk: BTreeSet<String>,
    pub shortcut_regions: BTreeSet<String>,
    pub goals: Vec<GoalCategory>,
}

impl WorldProfile {
    pub fn new(settings: Settings) -> Self {
        Self { settings, ..Self::default() }
    }

    pub fn with_attributes(mut self, attributes: Settings) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_tod_access(mut self, enabled: bool) -> Self {
        self.ensure_tod_access = enabled;
        self
    }

    pub fn with_song(mut self, song: impl Into<String>, notes: impl Into<String>) -> Self {
        self.song_notes.insert(song.into(), notes.into());
        self
    }

    pub fn with_keyring_boss_key(mut self, dungeon: impl Into<String>) -> Self {
        self.keyring_give_bk.insert(dungeon.into());
        self
    }

    pub fn with_shortcut_region(mut self, region: impl Into<String>) -> Self {
        self.shortcut_regions.insert(region.into());
        self
    }

    pub fn with_goals(mut self, goals: Vec<GoalCategory>) -> Self {
        self.goals = goals;
        self
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub id: WorldId,
    pub profile: WorldProfile,
    root: RegionId,
    region_names: HashMap<String, RegionId>,
    location_names: HashMap<String, LocationId>,
    locations: Vec<LocationId>,
    skipped: Vec<LocationId>,
    ledger: RuleLedger,
}

impl World {
    pub fn root(&self) -> RegionId {
        self.root
    }

    /// Locations of this world, in creation order (subrule events last).
    pub fn locations(&self) -> &[LocationId] {
        &self.locations
    }

    /// Locations whose items are handed out at the start.
    pub fn skipped(&self) -> &[LocationId] {
        &self.skipped
    }

    pub fn ledger(&self) -> &RuleLedger {
        &self.ledger
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub world: WorldId,
    pub exits: Vec<EntranceId>,
    pub entrances: Vec<EntranceId>,
    pub locations: Vec<LocationId>,
    pub provides_time: TimeOfDay,
}

#[derive(Debug, Clone)]
pub struct Entrance {
    pub name: String,
    pub world: WorldId,
    pub parent_region: RegionId,
    /// Region name the exit leads to, resolved by `compile_rules`.
    pub target: String,
    pub connected_region: Option<RegionId>,
    pub access_rule: AccessRule,
    pub rule_text: String,
}

/// An item and the world whose state collects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlacedItem {
    pub id: ItemId,
    pub world: WorldId,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub kind: String,
    pub world: WorldId,
    pub parent_region: RegionId,
    pub access_rule: AccessRule,
    pub rule_text: String,
    pub item: Option<PlacedItem>,
    /// Created by the compiler for a subrule.
    pub internal: bool,
    pub locked: bool,
    pub always: bool,
    pub never: bool,
}

#[derive(Debug, Default)]
pub struct Multiworld {
    catalog: Catalog,
    worlds: Vec<World>,
    regions: Vec<Region>,
    entrances: Vec<Entrance>,
    locations: Vec<Location>,
    rules: RuleCache,
}

impl Multiworld {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, ..Self::default() }
    }

    // --- Building -----------------------------------------------------------

    /// Add a world with its `Root` region.
    pub fn add_world(&mut self, profile: WorldProfile) -> WorldId {
        let id = WorldId::from_index(self.worlds.len());
        let root = RegionId::from_index(self.regions.len());
        self.regions.push(Region {
            name: "Root".to_string(),
            world: id,
            exits: Vec::new(),
            entrances: Vec::new(),
            locations: Vec::new(),
            provides_time: TimeOfDay::NONE,
        });
        self.worlds.push(World {
            id,
            profile,
            root,
            region_names: HashMap::from([("Root".to_string(), root)]),
            location_names: HashMap::new(),
            locations: Vec::new(),
            skipped: Vec::new(),
            ledger: RuleLedger::default(),
        });
        id
    }

    /// Add a region, or return the existing one of that name.
    pub fn add_region(&mut self, world: WorldId, name: &str, provides_time: TimeOfDay) -> RegionId {
        if let Some(&id) = self.worlds[world.index()].region_names.get(name) {
            self.regions[id.index()].provides_time |= provides_time;
            return id;
        }
        let id = RegionId::from_index(self.regions.len());
        self.regions.push(Region {
            name: name.to_string(),
            world,
            exits: Vec::new(),
            entrances: Vec::new(),
            locations: Vec::new(),
            provides_time,
        });
        self.worlds[world.index()].region_names.insert(name.to_string(), id);
        id
    }

    /// Exit from `region` to the region named `target` of the same world.
    pub fn add_exit(&mut self, region: RegionId, name: &str, target: &str, rule_text: &str) -> EntranceId {
        let id = EntranceId::from_index(self.entrances.len());
        let parent = &mut self.regions[region.index()];
        parent.exits.push(id);
        self.entrances.push(Entrance {
            name: name.to_string(),
            world: parent.world,
            parent_region: region,
            target: target.to_string(),
            connected_region: None,
            access_rule: AccessRule::always(),
            rule_text: rule_text.to_string(),
        });
        id
    }

    pub fn add_location(&mut self, region: RegionId, name: &str, kind: &str, rule_text: &str) -> LocationId {
        let world = self.regions[region.index()].world;
        self.push_location(Location {
            name: name.to_string(),
            kind: kind.to_string(),
            world,
            parent_region: region,
            access_rule: AccessRule::always(),
            rule_text: rule_text.to_string(),
            item: None,
            internal: false,
            locked: false,
            always: false,
            never: false,
        })
    }

    /// An event location holding the event item of the same name.
    pub fn add_event(&mut self, region: RegionId, name: &str, rule_text: &str) -> LocationId {
        let item = self.catalog.declare_event(name);
        let location = self.add_location(region, name, EVENT_KIND, rule_text);
        let world = self.regions[region.index()].world;
        let entry = &mut self.locations[location.index()];
        entry.item = Some(PlacedItem { id: item, world });
        entry.locked = true;
        self.worlds[world.index()].ledger.note_event(name);
        location
    }

    pub fn place_item(&mut self, location: LocationId, item: ItemId, world: WorldId) {
        self.locations[location.index()].item = Some(PlacedItem { id: item, world });
    }

    pub fn set_skipped(&mut self, location: LocationId) {
        let world = self.locations[location.index()].world;
        let skipped = &mut self.worlds[world.index()].skipped;
        if !skipped.contains(&location) {
            skipped.push(location);
        }
    }

    /// Declare an item after construction.
    pub fn declare_item(&mut self, def: ItemDef) -> ItemId {
        self.catalog.declare(def)
    }

    fn push_location(&mut self, location: Location) -> LocationId {
        let id = LocationId::from_index(self.locations.len());
        self.regions[location.parent_region.index()].locations.push(id);
        let world = &mut self.worlds[location.world.index()];
        world.location_names.insert(location.name.clone(), id);
        world.locations.push(id);
        self.locations.push(location);
        id
    }

    // --- Rule build ---------------------------------------------------------

    /// Connect exits, compile every rule, then resolve subrules.
    pub fn compile_rules(&mut self, helpers: &HelperRegistry) -> Result<(), CompileError> {
        self.connect_exits()?;

        let Multiworld { catalog, worlds, regions, entrances, locations, rules } = self;
        for world in worlds.iter_mut() {
            let mut compiler = RuleCompiler::new(catalog, &world.profile, helpers, rules, &mut world.ledger);
            for entrance in entrances.iter_mut().filter(|e| e.world == world.id) {
                let anchor = Anchor::new(&entrance.name, &regions[entrance.parent_region.index()].name);
                entrance.access_rule = compiler.compile(&entrance.rule_text, Some(&anchor))?;
            }
            for location in locations.iter_mut().filter(|l| l.world == world.id && !l.internal) {
                let anchor = Anchor::new(&location.name, &regions[location.parent_region.index()].name)
                    .with_kind(&location.kind);
                let rule = compiler.compile(&location.rule_text, Some(&anchor))?;
                location.always = rule.is_always();
                location.never = rule.is_never();
                location.access_rule = rule;
            }
            debug!(world = world.id.index(), pending = world.ledger.pending(), "compiled world rules");
        }

        self.finish_rules(helpers)
    }

    /// Resolve delayed subrules until none are left. Each one becomes an
    /// internal event location in its target region, unless its rule can
    /// never pass.
    pub fn finish_rules(&mut self, helpers: &HelperRegistry) -> Result<(), CompileError> {
        for index in 0..self.worlds.len() {
            loop {
                let delayed = self.worlds[index].ledger.take_delayed();
                if delayed.is_empty() {
                    break;
                }
                for subrule in delayed {
                    let world = &self.worlds[index];
                    let Some(&region) = world.region_names.get(&subrule.region) else {
                        return Err(CompileError::UnknownRegion { spot: subrule.event, region: subrule.region });
                    };
                    let world_id = world.id;
                    let anchor = Anchor::new(&subrule.event, &subrule.region).with_kind(EVENT_KIND);

                    let Multiworld { catalog, worlds, rules, .. } = self;
                    let world = &mut worlds[index];
                    let mut compiler = RuleCompiler::new(catalog, &world.profile, helpers, rules, &mut world.ledger);
                    let rule = compiler.compile_ast(&subrule.ast, Some(&anchor))?;

                    if rule.is_never() {
                        debug!(event = %subrule.event, "dropped subrule that can never pass");
                        continue;
                    }
                    self.push_location(Location {
                        name: subrule.event,
                        kind: EVENT_KIND.to_string(),
                        world: world_id,
                        parent_region: region,
                        always: rule.is_always(),
                        never: false,
                        rule_text: subrule.ast.to_string(),
                        access_rule: rule,
                        item: Some(PlacedItem { id: subrule.id, world: world_id }),
                        internal: true,
                        locked: true,
                    });
                }
            }
        }
        Ok(())
    }

    fn connect_exits(&mut self) -> Result<(), CompileError> {
        for index in 0..self.entrances.len() {
            let entrance = &self.entrances[index];
            let world = &self.worlds[entrance.world.index()];
            let Some(&target) = world.region_names.get(&entrance.target) else {
                return Err(CompileError::UnknownRegion { spot: entrance.name.clone(), region: entrance.target.clone() });
            };
            self.entrances[index].connected_region = Some(target);
            let entrance_id = EntranceId::from_index(index);
            let target = &mut self.regions[target.index()];
            if !target.entrances.contains(&entrance_id) {
                target.entrances.push(entrance_id);
            }
        }
        Ok(())
    }

    /// One empty `State` per world, in world order.
    pub fn initial_states(&self) -> Vec<State> {
        let groups = self.catalog.groups();
        self.worlds
            .iter()
            .map(|world| {
                let profile = &world.profile;
                let mut context = StateContext::new(world.id, groups.clone());
                context.keyring_boss_keys = self
                    .catalog
                    .iter()
                    .filter_map(|entry| {
                        let dungeon = entry.keyring_dungeon.as_ref().filter(|d| profile.keyring_give_bk.contains(*d))?;
                        Some((entry.id, self.catalog.boss_key(dungeon)?))
                    })
                    .collect();
                if profile.settings.flag("triforce_hunt") {
                    let goal = profile.settings.int("triforce_goal_per_world").unwrap_or(1);
                    context.win = WinCondition::TriforceHunt {
                        piece: groups.triforce_piece,
                        goal: u32::try_from(goal).unwrap_or(0),
                    };
                }
                context.goals = profile.goals.clone();
                State::new(Arc::new(context), self.catalog.len())
            })
            .collect()
    }

    // --- Queries ------------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rule_cache(&self) -> &RuleCache {
        &self.rules
    }

    pub fn worlds(&self) -> &[World] {
        &self.worlds
    }

    pub fn world(&self, id: WorldId) -> &World {
        &self.worlds[id.index()]
    }

    pub fn root(&self, world: WorldId) -> RegionId {
        self.worlds[world.index()].root
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn entrance(&self, id: EntranceId) -> &Entrance {
        &self.entrances[id.index()]
    }

    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.index()]
    }

    pub fn region_by_name(&self, world: WorldId, name: &str) -> Option<RegionId> {
        self.worlds.get(world.index())?.region_names.get(name).copied()
    }

    pub fn location_by_name(&self, world: WorldId, name: &str) -> Option<LocationId> {
        self.worlds.get(world.index())?.location_names.get(name).copied()
    }

    pub fn locations(&self) -> impl Iterator<Item = (LocationId, &Location)> {
        self.locations.iter().enumerate().map(|(i, location)| (LocationId::from_index(i), location))
    }
}
