//! Queueing path queries and receiving their results as events.

use std::collections::VecDeque;

use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::{prelude::*, system::SystemParam};
use glam::Vec3A;
use navpath::{GroupId, Path, PathError};

use crate::NavZones;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<PathQueue>();
    app.add_event::<PathComputed>();
    app.add_event::<PathFailed>();
    app.add_systems(Update, answer_path_requests.in_set(NavpathSystems::AnswerQueries));
    app.configure_sets(
        Update,
        NavpathSystems::ReadClicks.before(NavpathSystems::AnswerQueries),
    );
}

/// The system sets of the crate, run in [`Update`] in the order listed.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavpathSystems {
    /// Turns [`NavmeshClick`](crate::click::NavmeshClick)s into [`PathRequest`]s.
    ReadClicks,
    /// Drains the [`PathQueue`].
    AnswerQueries,
}

/// A path query against one zone, as passed to [`Pathfinder::find_path`](navpath::Pathfinder::find_path).
#[derive(Debug, Clone, PartialEq)]
pub struct PathRequest {
    /// The name of the zone to search.
    pub zone: String,
    /// Where the path starts.
    pub start: Vec3A,
    /// Where the path should end.
    pub end: Vec3A,
    /// The group both endpoints must lie in.
    pub group: GroupId,
}

/// Sent when a [`PathRequest`] was answered with a path.
///
/// When start and end snap to the same point the path holds a single waypoint
/// and [`Path::is_traversable`] is `false`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PathComputed {
    /// The request this answers.
    pub request: PathRequest,
    /// The path found.
    pub path: Path,
}

/// Sent when a [`PathRequest`] could not be answered.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PathFailed {
    /// The request this answers.
    pub request: PathRequest,
    /// Why no path was found.
    pub error: PathError,
}

/// System parameter for queueing path queries.
#[derive(SystemParam)]
pub struct PathQueries<'w> {
    queue: ResMut<'w, PathQueue>,
}

impl PathQueries<'_> {
    /// Queue a path query.
    /// Queued queries are answered in FIFO order during [`NavpathSystems::AnswerQueries`] of the same frame,
    /// with either a [`PathComputed`] or a [`PathFailed`] event.
    pub fn request(&mut self, request: PathRequest) {
        self.queue.push_back(request);
    }
}

/// Path queries waiting to be answered.
#[derive(Resource, Debug, Default, Deref, DerefMut)]
pub struct PathQueue(pub VecDeque<PathRequest>);

fn answer_path_requests(
    mut queue: ResMut<PathQueue>,
    zones: Res<NavZones>,
    mut computed: EventWriter<PathComputed>,
    mut failed: EventWriter<PathFailed>,
) {
    for request in queue.drain(..) {
        match zones.find_path(request.start, request.end, &request.zone, request.group) {
            Ok(path) => {
                if !path.is_traversable() {
                    tracing::warn!(
                        "No valid path in zone {:?} from {} to {}: start and end coincide",
                        request.zone,
                        request.start,
                        request.end
                    );
                }
                computed.write(PathComputed { request, path });
            }
            Err(error) => {
                tracing::warn!("No path in zone {:?}: {error}", request.zone);
                failed.write(PathFailed { request, error });
            }
        }
    }
}
