//! Playthrough metrics.
//!
//! Collected by [`crate::collection_spheres`], one entry per sphere, to
//! observe how exploration cost grows over a playthrough.

use std::time::Duration;

/// Timing and size of one collection sphere.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SphereMetrics {
    /// Elapsed time spent finding the sphere (not collecting it).
    pub duration: Duration,
    /// Locations visited in the sphere.
    pub locations: usize,
    /// Regions discovered as child once the sphere was found.
    pub child_regions: usize,
    /// Regions discovered as adult once the sphere was found.
    pub adult_regions: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaythroughMetrics {
    /// Total elapsed time for the whole playthrough.
    pub total: Duration,
    pub spheres: Vec<SphereMetrics>,
}

impl PlaythroughMetrics {
    /// Locations visited over all spheres.
    pub fn locations(&self) -> usize {
        self.spheres.iter().map(|sphere| sphere.locations).sum()
    }

    pub fn slowest(&self) -> Option<&SphereMetrics> {
        self.spheres.iter().max_by_key(|sphere| sphere.duration)
    }
}
