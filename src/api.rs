use crate::search::{PlaythroughMetrics, Search, SphereMetrics};
use crate::world::Multiworld;
use crate::{Age, LocationId};
use std::time::Instant;
use tracing::debug;

/// Sphere-by-sphere exploration result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playthrough {
    /// Locations in the order they became reachable, one list per sphere.
    pub spheres: Vec<Vec<LocationId>>,
    pub metrics: PlaythroughMetrics,
    /// Every world had won once nothing else was reachable.
    pub beatable: bool,
}

/// Split exploration of `candidates` into collection spheres.
///
/// Each round gathers every reachable candidate without collecting anything,
/// then collects the whole round. Items found in a sphere therefore never
/// unlock locations of the same sphere. A `RewindableSearch` can be passed
/// through its `DerefMut` to keep checkpoints around the call.
pub fn collection_spheres(search: &mut Search<'_>, candidates: &[LocationId]) -> Playthrough {
    let total_start = Instant::now();
    let mut remaining = candidates.to_vec();
    let mut playthrough = Playthrough::default();

    loop {
        let sphere_start = Instant::now();
        let sphere: Vec<LocationId> = search.iter_reachable_locations(remaining.iter().copied()).collect();
        let duration = sphere_start.elapsed();
        if sphere.is_empty() {
            break;
        }

        let graph = search.graph();
        for &id in &sphere {
            if let Some(item) = graph.location(id).item {
                search.collect(item);
            }
        }
        remaining.retain(|id| !sphere.contains(id));

        let cache = search.cache();
        let metrics = SphereMetrics {
            duration,
            locations: sphere.len(),
            child_regions: cache.regions(Age::Child).len(),
            adult_regions: cache.regions(Age::Adult).len(),
        };
        debug!(
            sphere = playthrough.spheres.len(),
            locations = metrics.locations,
            elapsed_us = duration.as_micros() as u64,
            "collected sphere"
        );
        playthrough.metrics.spheres.push(metrics);
        playthrough.spheres.push(sphere);
    }

    playthrough.beatable = search.can_beat_game(false);
    playthrough.metrics.total = total_start.elapsed();
    playthrough
}

/// Playthrough of a compiled multiworld from its initial states, over every
/// progression location.
///
/// # Example
/// ```
/// use sphere_logic::{Catalog, HelperRegistry, ItemDef, Multiworld, WorldProfile, playthrough};
/// use sphere_logic::TimeOfDay;
///
/// let mut catalog = Catalog::new();
/// let bow = catalog.declare(ItemDef::advancement("Bow"));
/// let triforce = catalog.declare(ItemDef::advancement("Triforce"));
///
/// let mut graph = Multiworld::new(catalog);
/// let world = graph.add_world(WorldProfile::default());
/// let field = graph.add_region(world, "Field", TimeOfDay::NONE);
/// graph.add_exit(graph.root(world), "Root -> Field", "Field", "");
/// let chest = graph.add_location(field, "Chest", "Chest", "");
/// let target = graph.add_location(field, "Target", "NPC", "Bow");
/// graph.place_item(chest, bow, world);
/// graph.place_item(target, triforce, world);
/// graph.compile_rules(&HelperRegistry::new()).unwrap();
///
/// let result = playthrough(&graph);
/// assert_eq!(result.spheres, vec![vec![chest], vec![target]]);
/// assert!(result.beatable);
/// ```
pub fn playthrough(graph: &Multiworld) -> Playthrough {
    let mut search = Search::new(graph, &graph.initial_states());
    let candidates = search.progression_locations();
    collection_spheres(&mut search, &candidates)
}
