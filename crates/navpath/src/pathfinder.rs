use std::collections::HashMap;

use glam::Vec3A;
use rand::Rng;

use crate::{
    ClampedStep, ClosestNode, GroupId, Path, PathError, TriMesh, TriangleId, Zone, ZoneBuildError,
    ZoneConfig,
};

/// Holds the loaded [`Zone`]s by name and answers queries against them.
///
/// Zones are never modified in place. Loading a zone under an existing name replaces the old one wholesale.
#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    zones: HashMap<String, Zone>,
}

impl Pathfinder {
    /// Creates a pathfinder without any zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a zone from raw geometry. Shorthand for [`Zone::build`].
    pub fn create_zone(trimesh: &TriMesh, config: &ZoneConfig) -> Result<Zone, ZoneBuildError> {
        Zone::build(trimesh, config)
    }

    /// Registers `zone` under `name`, returning the zone it replaces.
    pub fn set_zone_data(&mut self, name: impl Into<String>, zone: Zone) -> Option<Zone> {
        let name = name.into();
        tracing::debug!(
            "Setting zone {name:?} with {} groups",
            zone.groups().len()
        );
        self.zones.insert(name, zone)
    }

    /// Returns the zone registered under `name`.
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    /// Unregisters the zone under `name`.
    pub fn remove_zone(&mut self, name: &str) -> Option<Zone> {
        self.zones.remove(name)
    }

    /// Iterates over the names of all registered zones.
    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// See [`Zone::group_of`]. `None` for unknown zones.
    pub fn get_group(&self, zone: &str, point: Vec3A) -> Option<GroupId> {
        self.zone(zone)?.group_of(point)
    }

    /// See [`Zone::closest_node`]. `None` for unknown zones.
    pub fn get_closest_node(&self, point: Vec3A, zone: &str, group: GroupId) -> Option<ClosestNode> {
        self.zone(zone)?.closest_node(point, group)
    }

    /// See [`Zone::snap`]. `None` for unknown zones.
    pub fn snap(&self, zone: &str, point: Vec3A) -> Option<ClosestNode> {
        self.zone(zone)?.snap(point)
    }

    /// See [`Zone::find_path`].
    pub fn find_path(
        &self,
        start: Vec3A,
        end: Vec3A,
        zone: &str,
        group: GroupId,
    ) -> Result<Path, PathError> {
        self.zone(zone)
            .ok_or_else(|| PathError::UnknownZone(zone.to_string()))?
            .find_path(start, end, group)
    }

    /// See [`Zone::random_node`]. `None` for unknown zones.
    pub fn get_random_node<R: Rng + ?Sized>(
        &self,
        zone: &str,
        group: GroupId,
        near: Option<(Vec3A, f32)>,
        rng: &mut R,
    ) -> Option<Vec3A> {
        self.zone(zone)?.random_node(group, near, rng)
    }

    /// See [`Zone::clamp_step`]. `None` for unknown zones.
    pub fn clamp_step(
        &self,
        start: Vec3A,
        end: Vec3A,
        node: TriangleId,
        zone: &str,
    ) -> Option<ClampedStep> {
        self.zone(zone)?.clamp_step(start, end, node)
    }
}
