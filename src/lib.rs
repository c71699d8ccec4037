//! Logic core of a multiworld randomizer.
//!
//! The crate answers one question, over and over, as fast as it can: given
//! the items collected so far in every world, which regions and locations can
//! be reached right now?
//!
//! ```text
//! Catalog + Settings + helper macros
//!          │
//!          │  Multiworld::compile_rules      (world.rs, rules/*)
//!          │    - parse rule text to an Ast
//!          │    - lower + fold to Expr IR
//!          │    - compile to cached AccessRule closures
//!          │    - resolve deferred subrule events
//!          v
//!   immutable Multiworld ──┐
//!                          │  Search::new / next_sphere   (search/*)
//!   initial States ────────┤    - expand adult + child frontiers
//!                          │    - propagate time-of-day on demand
//!                          v
//!            reachable regions / locations, spheres, beatability
//! ```
//!
//! Rules are pure functions of `(state, spot, age, tod)` plus time-of-day
//! answers from the search, so a compiled `Multiworld` can be shared by any
//! number of searches.
//!
//! ## Debugging
//!
//! The library emits `tracing` events (`debug!` for events, dropped subrules
//! and sphere summaries, `trace!` for individual region discoveries). Install
//! any subscriber to see them.

#[macro_use]
mod macros;
mod api;
mod catalog;
mod rules;
mod search;
mod settings;
mod state;
mod world;

pub use api::{Playthrough, collection_spheres, playthrough};
pub use catalog::{Catalog, ItemClass, ItemDef, ItemEntry, ItemGroups, ItemId, escape_name};
pub use rules::{
    AccessRule, Anchor, Ast, BinOp, BoolOp, Builtin, CmpOp, CompileError, EvalCtx, Expr, Helper, HelperRegistry,
    NoReach, Operand, Reach, RuleCache, RuleCompiler, RuleLedger, parse_rule,
};
pub use search::{
    CategoryGoals, PlaythroughMetrics, ReachableLocations, RegionMap, RewindableSearch, Search, SearchCache,
    SphereMetrics, SphereView, ValidGoals,
};
pub use settings::{Settings, Value};
pub use state::{Goal, GoalCategory, ItemGoal, State, StateContext, WinCondition};
pub use world::{Entrance, Location, Multiworld, PlacedItem, Region, World, WorldProfile};

// --- Handles -----------------------------------------------------------------

handle!(
    /// One concurrently generated world.
    WorldId
);
handle!(
    /// A region in the multiworld arena.
    RegionId
);
handle!(
    /// A directed exit between two regions.
    EntranceId
);
handle!(
    /// An item-holding spot (including internal event locations).
    LocationId
);

/// Something a rule can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spot {
    Location(LocationId),
    Entrance(EntranceId),
}

// --- Age ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Age {
    Child,
    Adult,
}

impl Age {
    /// Lowercase name, as compared against `age == 'adult'` in rule text.
    pub fn as_str(self) -> &'static str {
        match self {
            Age::Child => "child",
            Age::Adult => "adult",
        }
    }
}

/// Which ages a reachability query must hold for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeScope {
    Child,
    Adult,
    Both,
    Either,
}

impl From<Age> for AgeScope {
    fn from(age: Age) -> Self {
        match age {
            Age::Child => AgeScope::Child,
            Age::Adult => AgeScope::Adult,
        }
    }
}

impl From<Option<Age>> for AgeScope {
    fn from(age: Option<Age>) -> Self {
        age.map_or(AgeScope::Either, AgeScope::from)
    }
}

// --- Time of day -------------------------------------------------------------

bitflags::bitflags! {
    /// Time-of-day bits a region provides or a rule asks for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TimeOfDay: u8 {
        const DAY   = 1 << 0;
        const DAMPE = 1 << 1;
    }
}

impl TimeOfDay {
    pub const NONE: Self = Self::empty();
    /// Night access is modelled as Dampé's hours.
    pub const NIGHT: Self = Self::DAMPE;
    pub const ALL: Self = Self::all();
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self::NONE
    }
}
