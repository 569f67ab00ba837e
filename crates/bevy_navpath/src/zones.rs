//! Building zones from entities marked with [`NavmeshSource`].

use std::collections::BTreeSet;

use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_reflect::prelude::*;
use navpath::Zone;

use crate::{NavZones, NavmeshSourceBackend, NavpathConfig};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<DirtyZones>();
    app.add_event::<ZoneLoaded>();
    app.add_observer(mark_replaced_zone_dirty);
    app.add_observer(mark_inserted_zone_dirty);
    app.add_systems(PreUpdate, load_dirty_zones);
}

/// Marks an entity's geometry as walkable surface of the zone called [`Self::zone`].
///
/// All sources sharing a zone name are merged into one zone. The zone is (re)built once the geometry of every
/// one of them is available, and again whenever a source of that zone is inserted, replaced or removed.
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect)]
pub struct NavmeshSource {
    /// The key the built zone is stored under in [`NavZones`].
    pub zone: String,
}

impl NavmeshSource {
    /// Creates a source for the zone called `zone`.
    pub fn new(zone: impl Into<String>) -> Self {
        Self { zone: zone.into() }
    }
}

/// Sent whenever a zone was (re)built from its [`NavmeshSource`]s and installed in [`NavZones`].
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct ZoneLoaded {
    /// The name of the zone.
    pub zone: String,
}

/// Names of the zones whose sources changed since they were last built.
#[derive(Resource, Debug, Default, Deref, DerefMut)]
struct DirtyZones(BTreeSet<String>);

fn mark_replaced_zone_dirty(
    trigger: Trigger<OnReplace, NavmeshSource>,
    sources: Query<&NavmeshSource>,
    mut dirty: ResMut<DirtyZones>,
) {
    if let Ok(source) = sources.get(trigger.target()) {
        dirty.insert(source.zone.clone());
    }
}

fn mark_inserted_zone_dirty(
    trigger: Trigger<OnInsert, NavmeshSource>,
    sources: Query<&NavmeshSource>,
    mut dirty: ResMut<DirtyZones>,
) {
    if let Ok(source) = sources.get(trigger.target()) {
        dirty.insert(source.zone.clone());
    }
}

fn load_dirty_zones(world: &mut World) {
    let dirty = std::mem::take(&mut world.resource_mut::<DirtyZones>().0);
    if dirty.is_empty() {
        return;
    }
    let Some(backend) = world.get_resource::<NavmeshSourceBackend>().copied() else {
        tracing::error!(
            "Cannot build zones {dirty:?}: no navmesh source backend set. Did you forget to add `Mesh3dNavmeshPlugin`?"
        );
        return;
    };
    let config = world.resource::<NavpathConfig>().0.clone();

    let mut sources = world.query::<&NavmeshSource>();
    let mut still_loading = BTreeSet::new();
    for name in dirty {
        if !sources.iter(world).any(|source| source.zone == name) {
            if world.resource_mut::<NavZones>().remove_zone(&name).is_some() {
                tracing::debug!("Removed zone {name:?}: it has no sources left");
            }
            continue;
        }

        let trimesh = match world.run_system_with(*backend, name.clone()) {
            Ok(Some(trimesh)) => trimesh,
            Ok(None) => {
                still_loading.insert(name);
                continue;
            }
            Err(err) => {
                tracing::error!("Navmesh source backend failed for zone {name:?}: {err}");
                continue;
            }
        };

        match Zone::build(&trimesh, &config) {
            Ok(zone) => {
                tracing::debug!(
                    "Built zone {name:?} with {} triangles in {} groups",
                    zone.triangles().len(),
                    zone.groups().len()
                );
                world.resource_mut::<NavZones>().set_zone_data(name.clone(), zone);
                world.send_event(ZoneLoaded { zone: name });
            }
            Err(err) => {
                tracing::error!("Failed to build zone {name:?}: {err}");
            }
        }
    }
    world.resource_mut::<DirtyZones>().extend(still_loading);
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec3A};
    use navpath::TriMesh;

    use super::*;
    use crate::{NavpathApp as _, NavpathPlugin};

    fn floor(In(zone): In<String>) -> Option<TriMesh> {
        let size = if zone == "big" { 10.0 } else { 1.0 };
        Some(TriMesh::from_triangles([
            [Vec3::ZERO, Vec3::new(0.0, 0.0, size), Vec3::new(size, 0.0, 0.0)],
            [
                Vec3::new(size, 0.0, 0.0),
                Vec3::new(0.0, 0.0, size),
                Vec3::new(size, 0.0, size),
            ],
        ]))
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(NavpathPlugin::default());
        app.set_navmesh_source_backend(floor);
        app
    }

    fn loaded_zones(app: &App) -> Vec<String> {
        let events = app.world().resource::<Events<ZoneLoaded>>();
        events
            .get_cursor()
            .read(events)
            .map(|loaded| loaded.zone.clone())
            .collect()
    }

    #[test]
    fn sources_build_zones() {
        let mut app = app();
        app.world_mut().spawn(NavmeshSource::new("big"));
        app.update();

        assert_eq!(loaded_zones(&app), ["big"]);
        let zones = app.world().resource::<NavZones>();
        assert!(zones.get_group("big", Vec3A::new(8.0, 0.0, 8.0)).is_some());
    }

    #[test]
    fn renaming_a_source_moves_the_zone() {
        let mut app = app();
        let entity = app.world_mut().spawn(NavmeshSource::new("big")).id();
        app.update();

        app.world_mut()
            .entity_mut(entity)
            .insert(NavmeshSource::new("small"));
        app.update();

        let zones = app.world().resource::<NavZones>();
        assert!(zones.zone("big").is_none());
        assert!(zones.get_group("small", Vec3A::new(0.5, 0.0, 0.5)).is_some());
        assert!(zones.get_group("small", Vec3A::new(8.0, 0.0, 8.0)).is_none());
    }

    #[test]
    fn despawning_the_last_source_removes_the_zone() {
        let mut app = app();
        let entity = app.world_mut().spawn(NavmeshSource::new("big")).id();
        app.update();
        assert!(app.world().resource::<NavZones>().zone("big").is_some());

        app.world_mut().despawn(entity);
        app.update();
        assert!(app.world().resource::<NavZones>().zone("big").is_none());
    }

    #[test]
    fn zones_wait_for_their_geometry() {
        fn loading(In(_): In<String>) -> Option<TriMesh> {
            None
        }
        let mut app = App::new();
        app.add_plugins(NavpathPlugin::default());
        app.set_navmesh_source_backend(loading);
        app.world_mut().spawn(NavmeshSource::new("big"));
        app.update();
        app.update();

        assert!(loaded_zones(&app).is_empty());
        assert!(app.world().resource::<NavZones>().zone("big").is_none());
        assert!(app.world().resource::<DirtyZones>().contains("big"));
    }
}
