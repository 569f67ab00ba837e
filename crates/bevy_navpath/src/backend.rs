use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::{prelude::*, system::SystemId};
use navpath::TriMesh;

/// The current backend registered through [`NavpathApp::set_navmesh_source_backend`].
///
/// The backend receives the name of a zone and returns the merged world-space geometry of all
/// [`NavmeshSource`](crate::zones::NavmeshSource)s of that zone, or `None` while any of them is still loading.
#[derive(Resource, Clone, Copy, Deref, DerefMut)]
pub struct NavmeshSourceBackend(pub SystemId<In<String>, Option<TriMesh>>);

/// Extension used to implement [`NavpathApp::set_navmesh_source_backend`] on [`App`]
pub trait NavpathApp {
    /// Set the backend for collecting the geometry of navmesh sources. Only one backend can be set at a time.
    /// Setting a backend will replace any existing backend. By default, no backend is set.
    fn set_navmesh_source_backend<M>(
        &mut self,
        system: impl IntoSystem<In<String>, Option<TriMesh>, M> + 'static,
    ) -> &mut App;
}

impl NavpathApp for App {
    fn set_navmesh_source_backend<M>(
        &mut self,
        system: impl IntoSystem<In<String>, Option<TriMesh>, M> + 'static,
    ) -> &mut App {
        let id = self.register_system(system);
        self.world_mut().insert_resource(NavmeshSourceBackend(id));
        self
    }
}
