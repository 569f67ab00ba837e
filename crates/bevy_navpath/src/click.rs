//! Click-to-path: two clicks on the navmesh, the first picking the start and the second the end of a path.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_reflect::prelude::*;
use glam::Vec3A;
use navpath::GroupId;

use crate::{
    NavZones,
    queue::{NavpathSystems, PathQueue, PathRequest},
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ClickPath>();
    app.add_event::<NavmeshClick>();
    app.add_systems(Update, read_clicks.in_set(NavpathSystems::ReadClicks));
}

/// A click on the navmesh of a zone.
///
/// Host code sends these after ray casting the cursor against its scene,
/// in the order the clicks happened. They are consumed during [`NavpathSystems::ReadClicks`].
#[derive(Event, Debug, Clone, PartialEq)]
pub struct NavmeshClick {
    /// The zone the click is meant for.
    pub zone: String,
    /// Where the ray hit the scene. Snapped onto the navmesh before use.
    pub point: Vec3A,
}

/// Which endpoint the next valid [`NavmeshClick`] picks.
///
/// Clicks that cannot be snapped onto the navmesh are ignored and leave the state unchanged.
/// The second click queues a [`PathRequest`] whose group is the one found for the start point,
/// and whose answer arrives as a [`PathComputed`](crate::queue::PathComputed) or
/// [`PathFailed`](crate::queue::PathFailed) in the same frame.
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect)]
pub enum ClickPath {
    /// The next click picks the start.
    #[default]
    Idle,
    /// A start was picked, the next click picks the end.
    AwaitingEnd {
        /// The zone the start was picked in.
        zone: String,
        /// The start, snapped onto the navmesh.
        start: Vec3A,
        /// The group the start lies in.
        group: GroupId,
    },
}

fn read_clicks(
    mut clicks: EventReader<NavmeshClick>,
    mut state: ResMut<ClickPath>,
    zones: Res<NavZones>,
    mut queue: ResMut<PathQueue>,
) {
    for click in clicks.read() {
        let Some(snapped) = zones.snap(&click.zone, click.point) else {
            tracing::warn!(
                "Clicked point {} is not walkable in zone {:?}",
                click.point,
                click.zone
            );
            continue;
        };

        *state = match std::mem::take(&mut *state) {
            ClickPath::AwaitingEnd { zone, start, group } if zone == click.zone => {
                tracing::debug!("Path end {} in group {:?}", snapped.position, snapped.group);
                queue.push_back(PathRequest {
                    zone,
                    start,
                    end: snapped.position,
                    group,
                });
                ClickPath::Idle
            }
            previous => {
                if let ClickPath::AwaitingEnd { zone, .. } = previous {
                    tracing::debug!(
                        "Start in zone {zone:?} dropped by a click in zone {:?}",
                        click.zone
                    );
                }
                tracing::debug!("Path start {} in group {:?}", snapped.position, snapped.group);
                ClickPath::AwaitingEnd {
                    zone: click.zone.clone(),
                    start: snapped.position,
                    group: snapped.group,
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use navpath::PathError;

    use super::*;
    use crate::queue::{
        PathComputed, PathFailed,
        tests::{read, square_app},
    };

    fn click(app: &mut App, x: f32, z: f32) {
        app.world_mut().send_event(NavmeshClick {
            zone: "level1".to_string(),
            point: Vec3A::new(x, 0.0, z),
        });
    }

    #[test]
    fn two_clicks_make_a_path() {
        let mut app = square_app();
        click(&mut app, 1.0, 1.0);
        app.update();
        assert_eq!(
            *app.world().resource::<ClickPath>(),
            ClickPath::AwaitingEnd {
                zone: "level1".to_string(),
                start: Vec3A::new(1.0, 0.0, 1.0),
                group: GroupId(0),
            }
        );

        click(&mut app, 3.0, 3.0);
        app.update();
        assert_eq!(*app.world().resource::<ClickPath>(), ClickPath::Idle);
        let computed = read::<PathComputed>(&app);
        assert_eq!(computed.len(), 1);
        assert_eq!(
            computed[0].path.waypoints,
            [Vec3A::new(1.0, 0.0, 1.0), Vec3A::new(3.0, 0.0, 3.0)]
        );
    }

    #[test]
    fn clicking_the_start_twice_gives_no_traversable_path() {
        let mut app = square_app();
        click(&mut app, 2.0, 1.0);
        click(&mut app, 2.0, 1.0);
        app.update();

        assert_eq!(*app.world().resource::<ClickPath>(), ClickPath::Idle);
        let computed = read::<PathComputed>(&app);
        assert_eq!(computed.len(), 1);
        assert_eq!(computed[0].path.waypoints, [Vec3A::new(2.0, 0.0, 1.0)]);
        assert!(!computed[0].path.is_traversable());
        assert!(read::<PathFailed>(&app).is_empty());
    }

    #[test]
    fn clicks_off_the_mesh_are_ignored() {
        let mut app = square_app();
        click(&mut app, 100.0, 100.0);
        app.update();
        assert_eq!(*app.world().resource::<ClickPath>(), ClickPath::Idle);

        click(&mut app, 1.0, 1.0);
        click(&mut app, -100.0, 1.0);
        app.update();
        assert!(matches!(
            *app.world().resource::<ClickPath>(),
            ClickPath::AwaitingEnd { .. }
        ));
        assert!(read::<PathComputed>(&app).is_empty());
    }

    #[test]
    fn each_path_uses_the_group_of_its_own_start() {
        let mut app = square_app();
        // A first path on the square.
        click(&mut app, 1.0, 1.0);
        click(&mut app, 3.0, 3.0);
        // Then one on the platform, which is group 1.
        click(&mut app, 11.0, 1.0);
        click(&mut app, 12.0, 0.5);
        app.update();

        let computed = read::<PathComputed>(&app);
        assert_eq!(computed.len(), 2);
        assert_eq!(computed[0].request.group, GroupId(0));
        assert_eq!(computed[1].request.group, GroupId(1));
        assert!(read::<PathFailed>(&app).is_empty());
    }

    #[test]
    fn paths_between_groups_fail() {
        let mut app = square_app();
        click(&mut app, 1.0, 1.0);
        click(&mut app, 11.0, 1.0);
        app.update();

        assert_eq!(*app.world().resource::<ClickPath>(), ClickPath::Idle);
        let failed = read::<PathFailed>(&app);
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].error,
            PathError::GroupMismatch {
                requested: GroupId(0),
                start: GroupId(0),
                end: GroupId(1),
            }
        );
    }
}
