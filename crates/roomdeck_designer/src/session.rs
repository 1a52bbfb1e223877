use std::path::PathBuf;

use chrono::{DateTime, Utc};
use roomdeck::{DataPath, DataPathType, Directory, EngineSettings, FileKvStore, KeyValueStore};
use scenebud::RenderSurface;
use tracing::{debug, info};

use crate::asset_source::{AssetSource, DefaultAssetSource};
use crate::catalog::{Catalog, CatalogItem};
use crate::codec::{self, DesignState, ReplayPlan, RoomConfiguration};
use crate::config_store::ConfigStore;
use crate::error::{DesignError, Result};
use crate::loading_state::LoadingState;
use crate::metrics::RoomMetrics;
use crate::model_cache::ModelCache;
use crate::placement::{
    AddStatus, PlacedFurnitureItem, PlacementConfig, PlacementEngine, PlacementEvent, SavedPlacement,
};
use crate::pointer::{PointerButton, PointerEvent, PointerHub, PointerSubscription};
use crate::remote_mirror::RemoteMirror;
use crate::room::RoomSpec;
use crate::room_shell::RoomShell;
use crate::scene_host::SceneHost;

/// What a drag that started on empty space does to the camera.
#[derive(Debug, Copy, Clone, PartialEq)]
enum CameraGesture {
    Orbit { x: f32, y: f32 },
    Pan { x: f32, y: f32 },
}

/// Everything one design view needs, owned in one place: the scene, the
/// room shell, placed furniture, the model cache and persistence.
/// Several sessions can live side by side; dropping one releases all of
/// its scene resources and pointer listeners.
pub struct DesignSession {
    settings: EngineSettings,
    catalog: Catalog,
    host: Option<SceneHost>,
    shell: Option<RoomShell>,
    room: RoomSpec,
    pointer: PointerHub,
    subscription: Option<PointerSubscription>,
    gesture: Option<CameraGesture>,
    cache: ModelCache,
    placement: PlacementEngine,
    store: ConfigStore,
    mirror: RemoteMirror,
    name: String,
    project_id: Option<String>,
    config_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    deferred: Vec<SavedPlacement>,
}

impl DesignSession {
    pub fn new(
        settings: EngineSettings,
        catalog: Catalog,
        source: Box<dyn AssetSource>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let room = RoomSpec::default();
        Self {
            cache: ModelCache::new(source, settings.load_timeout_secs),
            placement: PlacementEngine::new(PlacementConfig::from_settings(&settings), room.dimensions),
            mirror: RemoteMirror::new(settings.remote_endpoint.clone()),
            store: ConfigStore::new(store),
            settings,
            catalog,
            host: None,
            shell: None,
            room,
            pointer: PointerHub::new(),
            subscription: None,
            gesture: None,
            name: "Untitled room".to_owned(),
            project_id: None,
            config_id: None,
            created_at: None,
            deferred: Vec::new(),
        }
    }

    /// A session backed by the local data directory: models are read
    /// relative to `asset_dir`, downloads are cached under the data path
    /// and configurations are stored there too.
    pub fn from_data_path(
        path: &DataPath,
        settings: EngineSettings,
        catalog: Catalog,
        asset_dir: PathBuf,
    ) -> Self {
        let cache_dir = settings
            .model_cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.path(DataPathType::ModelCache));
        let source = DefaultAssetSource::new(asset_dir, cache_dir);
        let store = FileKvStore::new(Directory::new(path.path(DataPathType::Rooms)));
        Self::new(settings, catalog, Box::new(source), Box::new(store))
    }

    pub fn set_project(&mut self, name: impl Into<String>, project_id: Option<String>) {
        self.name = name.into();
        self.project_id = project_id;
    }

    /// Attach a render surface and build the room. Mounting again tears
    /// down the previous scene first.
    pub fn mount(&mut self, surface: Box<dyn RenderSurface>, spec: RoomSpec) -> Result<()> {
        spec.validate()?;
        if self.host.is_some() {
            self.teardown();
        }

        let mut host = SceneHost::new(surface, &spec.dimensions);
        let mut shell = RoomShell::build(
            &mut host.world,
            spec.dimensions,
            spec.wall_color,
            spec.floor_color,
            self.settings.floor_thickness,
        );
        shell.set_openings(&mut host.world, &spec.openings);
        self.placement.set_room(&mut host.world, spec.dimensions);

        self.subscription = Some(self.pointer.subscribe());
        self.host = Some(host);
        self.shell = Some(shell);
        self.room = spec;
        info!("design session mounted");
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.host.is_some()
    }

    /// Bring the scene in line with a new room description, doing only
    /// the work that changed.
    pub fn apply_spec(&mut self, spec: RoomSpec) -> Result<()> {
        spec.validate()?;
        let (Some(host), Some(shell)) = (self.host.as_mut(), self.shell.as_mut()) else {
            return Err(DesignError::SceneNotReady);
        };

        if spec.dimensions != self.room.dimensions {
            shell.rebuild(&mut host.world, spec.dimensions);
            self.placement.set_room(&mut host.world, spec.dimensions);
            host.frame_room(&spec.dimensions);
        }
        if spec.wall_color != shell.wall_color() {
            shell.set_wall_color(&mut host.world, spec.wall_color);
        }
        if spec.floor_color != shell.floor_color() {
            shell.set_floor_color(&mut host.world, spec.floor_color);
        }
        if !shell.openings().eq(spec.openings.iter()) {
            shell.set_openings(&mut host.world, &spec.openings);
        }

        self.room = spec;
        Ok(())
    }

    /// Where the host window sends pointer input.
    pub fn pointer_hub(&self) -> &PointerHub {
        &self.pointer
    }

    pub fn add_item(&mut self, catalog_id: &str, now: f64) -> Result<AddStatus> {
        let item = self
            .catalog
            .get(catalog_id)
            .cloned()
            .ok_or_else(|| DesignError::UnknownCatalogItem(catalog_id.to_owned()))?;
        self.add_catalog_item(&item, now)
    }

    pub fn add_catalog_item(&mut self, item: &CatalogItem, now: f64) -> Result<AddStatus> {
        self.placement
            .add(self.host.as_mut(), &mut self.cache, item, now)
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        match self.host.as_mut() {
            Some(host) => self.placement.remove(host, id),
            None => false,
        }
    }

    pub fn rotate_item(&mut self, id: &str) -> Result<f32> {
        let host = self.host.as_mut().ok_or(DesignError::SceneNotReady)?;
        self.placement.rotate(host, id)
    }

    pub fn clear_all(&mut self) {
        if let Some(host) = self.host.as_mut() {
            self.placement.clear_all(host);
        }
        self.deferred.clear();
    }

    pub fn clear_model_cache(&mut self) {
        self.cache.clear_cache();
    }

    /// Per-frame step: route pointer input, apply finished loads, advance
    /// bulk restores and settle remote mirror requests.
    pub fn update(&mut self, now: f64) -> Vec<PlacementEvent> {
        self.handle_pointer_events();
        let events = self
            .placement
            .update(self.host.as_mut(), &mut self.cache, now);
        self.mirror.poll();
        events
    }

    fn handle_pointer_events(&mut self) {
        let Some(subscription) = self.subscription.as_ref() else {
            return;
        };
        let events: Vec<PointerEvent> = subscription.drain().collect();
        let Some(host) = self.host.as_mut() else {
            return;
        };

        for event in events {
            match event {
                PointerEvent::Down { x, y, button } => {
                    let hit = match button {
                        PointerButton::Primary => self.placement.pointer_down(host, x, y),
                        _ => None,
                    };
                    if hit.is_none() {
                        self.gesture = Some(match button {
                            PointerButton::Primary => CameraGesture::Orbit { x, y },
                            _ => CameraGesture::Pan { x, y },
                        });
                    }
                }
                PointerEvent::Move { x, y } => {
                    if self.placement.pointer_move(host, x, y) {
                        continue;
                    }
                    match self.gesture {
                        Some(CameraGesture::Orbit { x: px, y: py }) => {
                            host.on_orbit_drag(x - px, y - py);
                            self.gesture = Some(CameraGesture::Orbit { x, y });
                        }
                        Some(CameraGesture::Pan { x: px, y: py }) => {
                            host.on_orbit_pan(x - px, y - py);
                            self.gesture = Some(CameraGesture::Pan { x, y });
                        }
                        None => {}
                    }
                }
                PointerEvent::Up { .. } => {
                    self.placement.pointer_up(host);
                    self.gesture = None;
                }
                PointerEvent::Wheel { delta } => host.on_orbit_scroll(delta),
            }
        }
    }

    /// Draw a frame. Returns the number of draws.
    pub fn render(&mut self) -> Result<usize> {
        let host = self.host.as_mut().ok_or(DesignError::SceneNotReady)?;
        Ok(host.render())
    }

    /// Snapshot the layout and store it. The remote mirror is attempted
    /// afterwards and never fails the save.
    pub fn save(&mut self, now: DateTime<Utc>) -> Result<RoomConfiguration> {
        let config = codec::serialize(
            &DesignState {
                config_id: self.config_id.as_deref(),
                name: &self.name,
                project_id: self.project_id.as_deref(),
                room: &self.room,
                items: self.placement.items(),
                created_at: self.created_at,
            },
            now,
        );

        let saved = self.store.persist(config, now)?;
        self.config_id = Some(saved.id.clone());
        self.created_at = Some(saved.created_at);

        if !self.mirror.push(&saved) {
            debug!("no remote mirror for {}", saved.id);
        }
        Ok(saved)
    }

    /// Restore the configuration saved for a project: room and non-3D items
    /// right away, 3D items held until [`load_models`](Self::load_models).
    pub fn load_for_project(&mut self, project_id: &str) -> Result<Option<ReplayPlan>> {
        let Some(config) = self.store.find_by_project(project_id)? else {
            info!("no saved configuration for project {project_id}");
            return Ok(None);
        };
        let plan = codec::deserialize(&config)?;
        self.apply_plan(&plan)?;
        Ok(Some(plan))
    }

    pub fn apply_plan(&mut self, plan: &ReplayPlan) -> Result<()> {
        if self.host.is_none() {
            return Err(DesignError::SceneNotReady);
        }
        self.clear_all();
        self.apply_spec(plan.room.clone())?;

        for saved in &plan.immediate {
            self.placement.add_placeholder(self.host.as_mut(), saved)?;
        }
        self.deferred = plan.deferred.clone();

        self.name = plan.name.clone();
        self.project_id = plan.project_id.clone();
        self.config_id = Some(plan.config_id.clone());
        self.created_at = Some(plan.created_at);
        Ok(())
    }

    /// Start loading the 3D items of the last restored configuration.
    /// Returns how many were queued.
    pub fn load_models(&mut self, now: f64) -> Result<usize> {
        if self.deferred.is_empty() {
            return Ok(0);
        }
        let count = self.deferred.len();
        let deferred = std::mem::take(&mut self.deferred);
        if let Err(err) = self
            .placement
            .begin_load_many(self.host.as_mut(), deferred.clone(), now)
        {
            self.deferred = deferred;
            return Err(err);
        }
        Ok(count)
    }

    /// Remote mirror requests that have not reported back yet.
    pub fn mirror_in_flight(&self) -> usize {
        self.mirror.in_flight()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn items(&self) -> &[PlacedFurnitureItem] {
        self.placement.items()
    }

    pub fn placement(&self) -> &PlacementEngine {
        &self.placement
    }

    pub fn metrics(&self) -> RoomMetrics {
        RoomMetrics::compute(self.placement.items(), &self.room.dimensions)
    }

    pub fn loading_state(&self) -> &LoadingState {
        self.placement.loading_state()
    }

    pub fn room(&self) -> &RoomSpec {
        &self.room
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn host(&self) -> Option<&SceneHost> {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> Option<&mut SceneHost> {
        self.host.as_mut()
    }

    pub fn shell(&self) -> Option<&RoomShell> {
        self.shell.as_ref()
    }

    /// Dispose the scene and detach from pointer input. The session can
    /// be mounted again afterwards; the model cache survives.
    pub fn teardown(&mut self) {
        self.clear_all();
        if let (Some(host), Some(shell)) = (self.host.as_mut(), self.shell.take()) {
            shell.dispose(&mut host.world);
        }
        self.host = None;
        self.subscription = None;
        self.gesture = None;
        info!("design session torn down");
    }
}
