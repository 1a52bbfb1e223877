//! Adding, dragging, rotating and removing furniture in the room.

use std::collections::VecDeque;
use std::sync::Arc;

use roomdeck::EngineSettings;
use scenebud::glam::{Quat, Vec3};
use scenebud::{Aabb, Geometry, Material, MeshBinding, ModelTemplate, NodeId, Transform, World};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogItem, Dimensions};
use crate::error::{DesignError, Result};
use crate::loading_state::LoadingState;
use crate::model_cache::{LoadOutcome, LoadPoll, ModelCache, RequestId};
use crate::room::RoomDimensions;
use crate::scene_host::SceneHost;

const PLACEHOLDER_COLOR: scenebud::Color = scenebud::Color::new(0.72, 0.7, 0.68);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacementConfig {
    pub floor_thickness: f32,
    pub floor_epsilon: f32,
    /// Radians added per rotate.
    pub rotation_step: f32,
    pub bulk_item_delay_secs: f64,
}

impl PlacementConfig {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            floor_thickness: settings.floor_thickness,
            floor_epsilon: settings.floor_epsilon,
            rotation_step: settings.rotation_step_degrees.to_radians(),
            bulk_item_delay_secs: settings.bulk_item_delay_secs,
        }
    }

    /// Height items rest at: the floor surface plus clearance.
    pub fn floor_level(&self) -> f32 {
        self.floor_thickness + self.floor_epsilon
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemVisual {
    Model,
    /// Catalog-sized box for items without a 3D model.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct PlacedFurnitureItem {
    pub id: String,
    pub catalog: CatalogItem,
    pub position: Vec3,
    pub rotation_y: f32,
    pub applied_scale: f32,
    pub floor_offset: f32,
    /// World bounds as of the last update to this item.
    pub bounds: Aabb,
    pub node: NodeId,
    pub visual: ItemVisual,
}

fn item_transform(position: Vec3, rotation_y: f32, scale: f32) -> Transform {
    Transform {
        translation: position,
        rotation: Quat::from_rotation_y(rotation_y),
        scale: Vec3::splat(scale),
    }
}

impl PlacedFurnitureItem {
    fn transform(&self) -> Transform {
        item_transform(self.position, self.rotation_y, self.applied_scale)
    }
}

/// A previously saved item to put back into the room.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPlacement {
    pub id: Option<String>,
    pub catalog: CatalogItem,
    pub position: Vec3,
    pub rotation_y: f32,
    pub applied_scale: Option<f32>,
    pub floor_offset: Option<f32>,
}

impl SavedPlacement {
    pub fn new(catalog: CatalogItem, position: Vec3) -> Self {
        Self {
            id: None,
            catalog,
            position,
            rotation_y: 0.0,
            applied_scale: None,
            floor_offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { item_id: String, offset: Vec3 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddStatus {
    Placed(String),
    /// The model is loading. A `Placed` event follows from `update`.
    Pending(RequestId),
}

#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub loaded: Vec<PlacedFurnitureItem>,
    /// One `"<item name>: <reason>"` entry per item that could not be restored.
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug)]
pub enum PlacementEvent {
    Placed { id: String, catalog_id: String },
    AddFailed { catalog_id: String, error: DesignError },
    BatchFinished(BatchResult),
}

struct PendingAdd {
    request: RequestId,
    item: CatalogItem,
}

struct BulkJob {
    queue: VecDeque<SavedPlacement>,
    current: Option<(RequestId, SavedPlacement)>,
    next_start_at: f64,
    result: BatchResult,
}

/// Uniform scale that fits `source` inside `target` on every axis.
/// Degenerate axes are ignored; all-degenerate models keep their size.
pub fn fit_scale(target: &Dimensions, source: Vec3) -> f32 {
    [
        (target.width, source.x),
        (target.height, source.y),
        (target.depth, source.z),
    ]
    .into_iter()
    .filter(|(t, s)| *s > f32::EPSILON && *t > 0.0)
    .map(|(t, s)| t / s)
    .reduce(f32::min)
    .unwrap_or(1.0)
}

/// Owns every placed item and the interaction state around them.
pub struct PlacementEngine {
    config: PlacementConfig,
    room: RoomDimensions,
    items: Vec<PlacedFurnitureItem>,
    drag: DragState,
    selected: Option<String>,
    loading: LoadingState,
    pending: Vec<PendingAdd>,
    bulk: Option<BulkJob>,
}

impl PlacementEngine {
    pub fn new(config: PlacementConfig, room: RoomDimensions) -> Self {
        Self {
            config,
            room,
            items: Vec::new(),
            drag: DragState::Idle,
            selected: None,
            loading: LoadingState::default(),
            pending: Vec::new(),
            bulk: None,
        }
    }

    pub fn items(&self) -> &[PlacedFurnitureItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&PlacedFurnitureItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn loading_state(&self) -> &LoadingState {
        &self.loading
    }

    pub fn is_bulk_loading(&self) -> bool {
        self.bulk.is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn room(&self) -> RoomDimensions {
        self.room
    }

    /// Adopt new room dimensions, pulling items back inside if the room
    /// shrank.
    pub fn set_room(&mut self, world: &mut World, room: RoomDimensions) {
        self.room = room;
        for idx in 0..self.items.len() {
            let p = self.items[idx].position;
            self.move_item_to(world, idx, p.x, p.z);
        }
    }

    /// Add a catalog item with a 3D model to the room.
    pub fn add(
        &mut self,
        host: Option<&mut SceneHost>,
        cache: &mut ModelCache,
        item: &CatalogItem,
        now: f64,
    ) -> Result<AddStatus> {
        let Some(host) = host else {
            return Err(DesignError::SceneNotReady);
        };

        if self.bulk.is_some() {
            return Err(DesignError::ConcurrentLoadConflict);
        }

        let Some(path) = item.model_path() else {
            return Err(DesignError::UnsupportedAsset(item.name.clone()));
        };

        match cache.request(path, &item.name, now) {
            LoadPoll::Ready(template) => {
                let id = self.place_model(&mut host.world, item, &template, None);
                Ok(AddStatus::Placed(id))
            }
            LoadPoll::Pending(request) => {
                if self.pending.is_empty() {
                    self.loading.begin(0);
                }
                self.loading.start_item(&item.name);
                self.pending.push(PendingAdd {
                    request,
                    item: item.clone(),
                });
                Ok(AddStatus::Pending(request))
            }
            LoadPoll::Failed(err) => Err(err),
        }
    }

    /// Place a catalog-sized box for an item that has no 3D model.
    pub fn add_placeholder(
        &mut self,
        host: Option<&mut SceneHost>,
        saved: &SavedPlacement,
    ) -> Result<String> {
        let Some(host) = host else {
            return Err(DesignError::SceneNotReady);
        };
        Ok(self.place_placeholder(&mut host.world, saved))
    }

    fn unique_id(&self, preferred: Option<&str>) -> String {
        match preferred {
            Some(id) if !id.is_empty() && self.get(id).is_none() => id.to_owned(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    /// Top of the highest placed item whose footprint contains (x, z).
    fn support_height(&self, x: f32, z: f32, exclude: Option<&str>) -> Option<f32> {
        self.items
            .iter()
            .filter(|i| Some(i.id.as_str()) != exclude)
            .map(|i| i.bounds)
            .filter(|b| b.min.x <= x && x <= b.max.x && b.min.z <= z && z <= b.max.z)
            .map(|b| b.max.y)
            .reduce(f32::max)
    }

    /// Where the bottom of this item should sit when centred on (x, z).
    fn rest_height(&self, item: &CatalogItem, x: f32, z: f32, exclude: Option<&str>) -> f32 {
        let floor = self.config.floor_level();
        if let Some(mount) = item.placement.preferred_mount_height() {
            return (mount - item.dimensions.height * 0.5).max(floor);
        }
        if item.placement.may_rest_on_surface()
            && let Some(top) = self.support_height(x, z, exclude)
        {
            return top.max(floor);
        }
        floor
    }

    fn clamp_to_room(&self, dims: &Dimensions, x: f32, z: f32) -> (f32, f32) {
        let (hw, hl) = self.room.half_extents();
        let limit_x = (hw - dims.width * 0.5).max(0.0);
        let limit_z = (hl - dims.depth * 0.5).max(0.0);
        (x.clamp(-limit_x, limit_x), z.clamp(-limit_z, limit_z))
    }

    fn place_model(
        &mut self,
        world: &mut World,
        item: &CatalogItem,
        template: &ModelTemplate,
        saved: Option<&SavedPlacement>,
    ) -> String {
        let source = template.bounds();
        let applied_scale = saved
            .and_then(|s| s.applied_scale)
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or_else(|| fit_scale(&item.dimensions, source.size()));

        let (x, z) = match saved {
            Some(s) => self.clamp_to_room(&item.dimensions, s.position.x, s.position.z),
            None => (0.0, 0.0),
        };

        let floor_offset = saved
            .and_then(|s| s.floor_offset)
            .filter(|f| f.is_finite())
            .unwrap_or_else(|| -source.min.y * applied_scale + self.rest_height(item, x, z, None));

        let position = Vec3::new(x, floor_offset, z);
        let rotation_y = saved.map(|s| s.rotation_y).unwrap_or(0.0);
        let node = template.instantiate(
            world,
            item_transform(position, rotation_y, applied_scale),
            None,
        );

        let placed = PlacedFurnitureItem {
            id: self.unique_id(saved.and_then(|s| s.id.as_deref())),
            catalog: item.clone(),
            position,
            rotation_y,
            applied_scale,
            floor_offset,
            bounds: world.subtree_bounds(node).unwrap_or_else(Aabb::empty),
            node,
            visual: ItemVisual::Model,
        };

        info!(
            "placed '{}' ({}) scale {:.3} at ({:.2}, {:.3}, {:.2})",
            item.name, placed.id, applied_scale, x, floor_offset, z
        );

        let id = placed.id.clone();
        self.items.push(placed);
        id
    }

    fn place_placeholder(&mut self, world: &mut World, saved: &SavedPlacement) -> String {
        let item = &saved.catalog;
        let dims = item.dimensions;
        let (x, z) = self.clamp_to_room(&dims, saved.position.x, saved.position.z);
        let floor_offset = saved
            .floor_offset
            .filter(|f| f.is_finite())
            .unwrap_or_else(|| self.rest_height(item, x, z, None));

        let position = Vec3::new(x, floor_offset, z);
        let root = world.create_group(
            item.name.clone(),
            item_transform(position, saved.rotation_y, 1.0),
            None,
        );
        let mesh = MeshBinding {
            geometry: world.resources.add_geometry(Arc::new(Geometry::cuboid(
                dims.width,
                dims.height,
                dims.depth,
            ))),
            material: world
                .resources
                .add_material(Material::solid(item.name.clone(), PLACEHOLDER_COLOR).with_roughness(0.8)),
            cast_shadow: true,
            receive_shadow: true,
        };
        world.create_mesh(
            "placeholder",
            mesh,
            Transform::from_translation(Vec3::new(0.0, dims.height * 0.5, 0.0)),
            Some(root),
        );

        let placed = PlacedFurnitureItem {
            id: self.unique_id(saved.id.as_deref()),
            catalog: item.clone(),
            position,
            rotation_y: saved.rotation_y,
            applied_scale: 1.0,
            floor_offset,
            bounds: world.subtree_bounds(root).unwrap_or_else(Aabb::empty),
            node: root,
            visual: ItemVisual::Placeholder,
        };

        info!("placed placeholder for '{}' ({})", item.name, placed.id);
        let id = placed.id.clone();
        self.items.push(placed);
        id
    }

    /// Move item `idx` to (x, z), clamped into the room, and re-seat it so
    /// its lowest point rests at its rest height.
    fn move_item_to(&mut self, world: &mut World, idx: usize, x: f32, z: f32) {
        let (x, z) = self.clamp_to_room(&self.items[idx].catalog.dimensions, x, z);
        let moving = &self.items[idx];
        let rest = self.rest_height(&moving.catalog, x, z, Some(moving.id.as_str()));

        let item = &mut self.items[idx];
        item.position.x = x;
        item.position.z = z;
        world.set_local_transform(item.node, item.transform());

        if let Some(bounds) = world.subtree_bounds(item.node) {
            item.position.y += rest - bounds.min.y;
            item.floor_offset = item.position.y;
            world.set_local_transform(item.node, item.transform());
        }
        item.bounds = world.subtree_bounds(item.node).unwrap_or(item.bounds);
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    /// Begin a drag if the pointer is over an item. Returns the id of the
    /// item hit, which also becomes the selection.
    pub fn pointer_down(&mut self, host: &mut SceneHost, x: f32, y: f32) -> Option<String> {
        let ray = host.screen_ray(x, y);
        let roots: Vec<NodeId> = self.items.iter().map(|i| i.node).collect();

        let Some(hit) = host.world.raycast(&ray, &roots) else {
            self.selected = None;
            return None;
        };
        let idx = self.items.iter().position(|i| i.node == hit.root)?;
        let item = &self.items[idx];

        host.set_navigation_enabled(false);
        let offset = hit.point - item.position;
        debug!("drag start on '{}' offset {offset:?}", item.id);

        self.selected = Some(item.id.clone());
        self.drag = DragState::Dragging {
            item_id: item.id.clone(),
            offset,
        };
        self.selected.clone()
    }

    /// Follow the pointer across the floor while dragging. Returns true if
    /// an item moved.
    pub fn pointer_move(&mut self, host: &mut SceneHost, x: f32, y: f32) -> bool {
        let DragState::Dragging { item_id, offset } = &self.drag else {
            return false;
        };
        let Some(idx) = self.index_of(item_id) else {
            return false;
        };
        let offset = *offset;

        let ray = host.screen_ray(x, y);
        let Some(point) = ray.intersect_horizontal_plane(0.0) else {
            return false;
        };
        let candidate = point - offset;
        self.move_item_to(&mut host.world, idx, candidate.x, candidate.z);
        true
    }

    /// End any drag and give navigation back to the camera.
    pub fn pointer_up(&mut self, host: &mut SceneHost) -> bool {
        let was_dragging = matches!(self.drag, DragState::Dragging { .. });
        if was_dragging {
            debug!("drag end");
        }
        self.drag = DragState::Idle;
        host.set_navigation_enabled(true);
        was_dragging
    }

    /// Turn an item by one rotation step about Y. Returns the new yaw.
    pub fn rotate(&mut self, host: &mut SceneHost, id: &str) -> Result<f32> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| DesignError::UnknownItem(id.to_owned()))?;

        let item = &mut self.items[idx];
        item.rotation_y += self.config.rotation_step;
        host.world.set_local_transform(item.node, item.transform());
        item.bounds = host.world.subtree_bounds(item.node).unwrap_or(item.bounds);
        Ok(item.rotation_y)
    }

    /// Remove an item and dispose everything it owns. Unknown or already
    /// removed ids return false and dispose nothing.
    pub fn remove(&mut self, host: &mut SceneHost, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let item = self.items.remove(idx);
        self.dispose_item(&mut host.world, &item);

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if matches!(&self.drag, DragState::Dragging { item_id, .. } if item_id == id) {
            self.drag = DragState::Idle;
            host.set_navigation_enabled(true);
        }
        true
    }

    fn dispose_item(&self, world: &mut World, item: &PlacedFurnitureItem) {
        match world.remove_node(item.node) {
            Some(report) => debug!(
                "disposed '{}': {} nodes, {} geometries, {} materials, {} textures",
                item.id, report.nodes, report.geometries, report.materials, report.textures
            ),
            None => {
                error!("item '{}' had no live scene node", item.id);
                debug_assert!(false, "placed item node disposed twice");
            }
        }
    }

    /// Remove every item and forget pending loads. Cached models stay.
    pub fn clear_all(&mut self, host: &mut SceneHost) {
        let items = std::mem::take(&mut self.items);
        for item in &items {
            self.dispose_item(&mut host.world, item);
        }
        info!("cleared {} items", items.len());

        self.pending.clear();
        self.bulk = None;
        self.loading.reset();
        self.selected = None;
        self.drag = DragState::Idle;
        host.set_navigation_enabled(true);
    }

    /// Start restoring saved items one after another. Progress happens in
    /// [`update`](Self::update), which emits `BatchFinished` at the end.
    pub fn begin_load_many(
        &mut self,
        host: Option<&mut SceneHost>,
        saved: Vec<SavedPlacement>,
        now: f64,
    ) -> Result<()> {
        if host.is_none() {
            return Err(DesignError::SceneNotReady);
        }
        if self.bulk.is_some() {
            return Err(DesignError::ConcurrentLoadConflict);
        }

        info!("restoring {} items", saved.len());
        self.loading.begin(saved.len());
        self.bulk = Some(BulkJob {
            queue: saved.into(),
            current: None,
            next_start_at: now,
            result: BatchResult::default(),
        });
        Ok(())
    }

    /// Apply finished loads and advance a running bulk restore. Call once
    /// per frame.
    pub fn update(
        &mut self,
        mut host: Option<&mut SceneHost>,
        cache: &mut ModelCache,
        now: f64,
    ) -> Vec<PlacementEvent> {
        let mut events = Vec::new();

        for outcome in cache.poll(now, &mut self.loading) {
            self.apply_outcome(host.as_deref_mut(), outcome, now, &mut events);
        }

        if self.bulk.is_some() {
            self.advance_bulk(host.as_deref_mut(), cache, now, &mut events);
        } else if self.pending.is_empty() && self.loading.is_loading {
            self.loading.finish();
        }

        events
    }

    fn apply_outcome(
        &mut self,
        mut host: Option<&mut SceneHost>,
        outcome: LoadOutcome,
        now: f64,
        events: &mut Vec<PlacementEvent>,
    ) {
        let request = outcome.request();

        // single adds waiting on this request
        let (waiting, rest): (Vec<PendingAdd>, Vec<PendingAdd>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.request == request);
        self.pending = rest;

        for pending in waiting {
            let result = match (&outcome, host.as_deref_mut()) {
                (LoadOutcome::Loaded { template, .. }, Some(host)) => {
                    Ok(self.place_model(&mut host.world, &pending.item, template, None))
                }
                (LoadOutcome::Loaded { .. }, None) => Err(DesignError::SceneNotReady),
                (LoadOutcome::Failed { error, .. }, _) => Err(same_error(error)),
            };

            self.loading.complete_item(outcome.path(), result.is_ok());
            match result {
                Ok(id) => events.push(PlacementEvent::Placed {
                    id,
                    catalog_id: pending.item.id,
                }),
                Err(error) => {
                    warn!("could not add '{}': {error}", pending.item.name);
                    events.push(PlacementEvent::AddFailed {
                        catalog_id: pending.item.id,
                        error,
                    });
                }
            }
        }

        // the bulk item currently loading
        let current = match self.bulk.as_mut() {
            Some(job) if job.current.as_ref().is_some_and(|(r, _)| *r == request) => {
                job.next_start_at = now + self.config.bulk_item_delay_secs;
                job.current.take()
            }
            _ => None,
        };

        if let Some((_, saved)) = current {
            let result = match (&outcome, host) {
                (LoadOutcome::Loaded { template, .. }, Some(host)) => {
                    Ok(self.place_model(&mut host.world, &saved.catalog, template, Some(&saved)))
                }
                (LoadOutcome::Loaded { .. }, None) => Err(DesignError::SceneNotReady),
                (LoadOutcome::Failed { error, .. }, _) => Err(same_error(error)),
            };
            self.finish_bulk_item(&saved, result);
        }
    }

    fn finish_bulk_item(&mut self, saved: &SavedPlacement, result: Result<String>) {
        let path = saved.catalog.model_path().unwrap_or_default().to_owned();
        self.loading.complete_item(&path, result.is_ok());

        let loaded = match &result {
            Ok(id) => self.get(id).cloned(),
            Err(_) => None,
        };

        let Some(job) = self.bulk.as_mut() else {
            return;
        };
        match (result, loaded) {
            (Ok(_), Some(item)) => job.result.loaded.push(item),
            (Ok(id), None) => {
                error!("restored item '{id}' vanished before it was recorded");
            }
            (Err(err), _) => {
                warn!("could not restore '{}': {err}", saved.catalog.name);
                job.result.errors.push(format!("{}: {err}", saved.catalog.name));
            }
        }
    }

    fn advance_bulk(
        &mut self,
        mut host: Option<&mut SceneHost>,
        cache: &mut ModelCache,
        now: f64,
        events: &mut Vec<PlacementEvent>,
    ) {
        let Some(job) = self.bulk.as_mut() else {
            return;
        };
        if job.current.is_some() || now < job.next_start_at {
            return;
        }

        let Some(saved) = job.queue.pop_front() else {
            if let Some(job) = self.bulk.take() {
                info!(
                    "restore finished: {} loaded, {} failed",
                    job.result.loaded.len(),
                    job.result.errors.len()
                );
                self.loading.finish();
                events.push(PlacementEvent::BatchFinished(job.result));
            }
            return;
        };
        job.next_start_at = now + self.config.bulk_item_delay_secs;
        self.loading.start_item(&saved.catalog.name);

        let Some(path) = saved.catalog.model_path() else {
            let result = match host.as_deref_mut() {
                Some(host) => Ok(self.place_placeholder(&mut host.world, &saved)),
                None => Err(DesignError::SceneNotReady),
            };
            self.finish_bulk_item(&saved, result);
            return;
        };

        match cache.request(path, &saved.catalog.name, now) {
            LoadPoll::Ready(template) => {
                let result = match host {
                    Some(host) => Ok(self.place_model(
                        &mut host.world,
                        &saved.catalog,
                        &template,
                        Some(&saved),
                    )),
                    None => Err(DesignError::SceneNotReady),
                };
                self.finish_bulk_item(&saved, result);
            }
            LoadPoll::Pending(request) => {
                if let Some(job) = self.bulk.as_mut() {
                    job.current = Some((request, saved));
                }
            }
            LoadPoll::Failed(err) => self.finish_bulk_item(&saved, Err(err)),
        }
    }
}

/// Load outcomes are shared by every waiter on the same request, so each
/// gets its own copy of the error.
fn same_error(error: &DesignError) -> DesignError {
    match error {
        DesignError::LoadTimeout { path, secs } => DesignError::LoadTimeout {
            path: path.clone(),
            secs: *secs,
        },
        DesignError::LoadFailure { path, reason } => DesignError::LoadFailure {
            path: path.clone(),
            reason: reason.clone(),
        },
        DesignError::PreviouslyFailed(path) => DesignError::PreviouslyFailed(path.clone()),
        other => DesignError::load_failure("", other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_source::MemoryAssetSource;
    use crate::catalog::PlacementPolicy;
    use crate::test_util::{box_glb, box_glb_lifted};
    use scenebud::NullSurface;

    fn host() -> SceneHost {
        SceneHost::new(Box::new(NullSurface::new(800, 600)), &RoomDimensions::default())
    }

    fn table() -> CatalogItem {
        CatalogItem::new("coffee_table", "Oak Coffee Table", Dimensions::new(2.2, 1.45, 1.7))
            .with_model("table.glb")
            .with_price(349.0)
    }

    fn engine() -> PlacementEngine {
        PlacementEngine::new(PlacementConfig::default(), RoomDimensions::default())
    }

    fn cache_with(path: &str, bytes: Vec<u8>) -> ModelCache {
        ModelCache::new(Box::new(MemoryAssetSource::new().with_asset(path, bytes)), 45.0)
    }

    /// Add and drive updates until the item is placed.
    fn add_now(
        engine: &mut PlacementEngine,
        host: &mut SceneHost,
        cache: &mut ModelCache,
        item: &CatalogItem,
    ) -> String {
        match engine.add(Some(&mut *host), cache, item, 0.0).unwrap() {
            AddStatus::Placed(id) => id,
            AddStatus::Pending(_) => {
                for event in engine.update(Some(&mut *host), cache, 0.0) {
                    if let PlacementEvent::Placed { id, .. } = event {
                        return id;
                    }
                }
                panic!("item was not placed");
            }
        }
    }

    #[test]
    fn fit_scale_takes_smallest_ratio() {
        let target = Dimensions::new(2.2, 1.45, 1.7);
        assert!((fit_scale(&target, Vec3::splat(2.0)) - 0.725).abs() < 1e-6);
        assert_eq!(fit_scale(&target, Vec3::ZERO), 1.0);
        // flat model: height ignored
        assert!((fit_scale(&target, Vec3::new(4.4, 0.0, 1.0)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fitted_model_never_exceeds_target() {
        let target = Dimensions::new(0.85, 0.9, 0.85);
        for size in [
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(10.0, 0.5, 0.2),
        ] {
            let s = fit_scale(&target, size);
            let scaled = size * s;
            assert!(scaled.x <= target.width + 1e-5);
            assert!(scaled.y <= target.height + 1e-5);
            assert!(scaled.z <= target.depth + 1e-5);
        }
    }

    #[test]
    fn added_item_rests_on_floor() {
        let mut host = host();
        let mut engine = engine();
        // source model floats 0.5 above its origin
        let mut cache = cache_with("table.glb", box_glb_lifted(2.0, 2.0, 2.0, 0.5));

        let id = add_now(&mut engine, &mut host, &mut cache, &table());
        let item = engine.get(&id).unwrap();

        assert!((item.applied_scale - 0.725).abs() < 1e-5);
        assert!((item.bounds.min.y - 0.101).abs() < 1e-4);
        assert!((item.floor_offset - (-0.5 * 0.725 + 0.101)).abs() < 1e-4);
        assert_eq!(item.visual, ItemVisual::Model);
    }

    #[test]
    fn surface_items_rest_on_supporting_item() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(2.0, 2.0, 2.0));
        let table_id = add_now(&mut engine, &mut host, &mut cache, &table());
        let table_top = engine.get(&table_id).unwrap().bounds.max.y;
        assert!(table_top > 1.0);

        let lamp = CatalogItem::new("table_lamp", "Lamp", Dimensions::new(0.3, 0.5, 0.3))
            .with_placement(PlacementPolicy::Surface);
        let lamp_id = engine
            .add_placeholder(Some(&mut host), &SavedPlacement::new(lamp, Vec3::new(0.2, 0.0, 0.1)))
            .unwrap();
        let lamp_bounds = engine.get(&lamp_id).unwrap().bounds;
        assert!((lamp_bounds.min.y - table_top).abs() < 1e-4);

        // floor items ignore what is underneath
        let crate_box = CatalogItem::new("crate", "Crate", Dimensions::new(0.4, 0.4, 0.4));
        let crate_id = engine
            .add_placeholder(Some(&mut host), &SavedPlacement::new(crate_box, Vec3::ZERO))
            .unwrap();
        assert!((engine.get(&crate_id).unwrap().bounds.min.y - 0.101).abs() < 1e-4);
    }

    #[test]
    fn surface_item_drops_to_floor_when_moved_off_support() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(2.0, 2.0, 2.0));
        let table_id = add_now(&mut engine, &mut host, &mut cache, &table());
        let table_top = engine.get(&table_id).unwrap().bounds.max.y;

        let plant = CatalogItem::new("potted_plant", "Plant", Dimensions::new(0.5, 1.4, 0.5))
            .with_placement(PlacementPolicy::Flexible);
        let plant_id = engine
            .add_placeholder(Some(&mut host), &SavedPlacement::new(plant, Vec3::new(3.0, 0.0, 3.0)))
            .unwrap();
        let idx = engine.index_of(&plant_id).unwrap();
        assert!((engine.items()[idx].bounds.min.y - 0.101).abs() < 1e-4);

        engine.move_item_to(&mut host.world, idx, 0.0, 0.0);
        assert!((engine.items()[idx].bounds.min.y - table_top).abs() < 1e-4);

        engine.move_item_to(&mut host.world, idx, -3.0, 3.0);
        assert!((engine.items()[idx].bounds.min.y - 0.101).abs() < 1e-4);
    }

    #[test]
    fn non_model_items_are_rejected() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = ModelCache::new(Box::new(MemoryAssetSource::new()), 45.0);
        let rug = CatalogItem::new("rug", "Rug", Dimensions::new(2.0, 0.02, 1.5));

        assert!(matches!(
            engine.add(Some(&mut host), &mut cache, &rug, 0.0),
            Err(DesignError::UnsupportedAsset(_))
        ));
        assert!(matches!(
            engine.add(None, &mut cache, &table(), 0.0),
            Err(DesignError::SceneNotReady)
        ));
        assert_eq!(cache.fetch_count(), 0);
    }

    #[test]
    fn rotation_is_periodic() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(2.0, 1.0, 1.0));
        let id = add_now(&mut engine, &mut host, &mut cache, &table());

        let node = engine.get(&id).unwrap().node;
        let before = host.world.compute_world_matrix(node).unwrap();
        let bounds = engine.get(&id).unwrap().bounds;

        for _ in 0..8 {
            engine.rotate(&mut host, &id).unwrap();
        }
        let after = host.world.compute_world_matrix(node).unwrap();
        assert!(before.abs_diff_eq(after, 1e-4));
        let b = engine.get(&id).unwrap().bounds;
        assert!((b.min - bounds.min).length() < 1e-4);
        assert!((b.max - bounds.max).length() < 1e-4);

        assert!(matches!(
            engine.rotate(&mut host, "nope"),
            Err(DesignError::UnknownItem(_))
        ));
    }

    #[test]
    fn remove_is_idempotent_and_disposes() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(1.0, 1.0, 1.0));
        let empty = host.world.resources.counts();

        let id = add_now(&mut engine, &mut host, &mut cache, &table());
        assert_ne!(host.world.resources.counts(), empty);

        assert!(engine.remove(&mut host, &id));
        assert_eq!(host.world.resources.counts(), empty);
        assert!(!engine.remove(&mut host, &id));
        assert!(!engine.remove(&mut host, "never-existed"));
        assert_eq!(host.world.resources.counts(), empty);
    }

    #[test]
    fn drag_clamps_to_room_and_stays_on_floor() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(2.0, 1.0, 2.0));
        let item = CatalogItem::new("t", "Table", Dimensions::new(2.0, 0.75, 2.0)).with_model("table.glb");
        let id = add_now(&mut engine, &mut host, &mut cache, &item);

        host.render();
        let (sx, sy) = host.node_screen_position(engine.get(&id).unwrap().node).unwrap();
        assert_eq!(engine.pointer_down(&mut host, sx, sy), Some(id.clone()));
        assert!(!host.navigation_enabled());
        assert_eq!(engine.selected_item(), Some(id.as_str()));

        // far past the east wall
        let (tx, ty) = host.project(Vec3::new(20.0, 0.0, 0.0)).unwrap();
        assert!(engine.pointer_move(&mut host, tx, ty));

        let placed = engine.get(&id).unwrap();
        assert!((placed.position.x - 2.5).abs() < 1e-4);
        assert!((placed.bounds.min.y - 0.101).abs() < 1e-4);

        assert!(engine.pointer_up(&mut host));
        assert!(host.navigation_enabled());
        assert_eq!(engine.drag_state(), &DragState::Idle);
        assert!(!engine.pointer_move(&mut host, sx, sy));
    }

    #[test]
    fn oversized_footprint_clamps_to_center() {
        let mut engine = engine();
        let huge = Dimensions::new(9.0, 1.0, 10.0);
        assert_eq!(engine.clamp_to_room(&huge, 3.0, -2.0), (0.0, 0.0));
        engine.room = RoomDimensions::new(12.0, 12.0, 3.0).unwrap();
        assert_eq!(engine.clamp_to_room(&huge, 3.0, -2.0), (1.5, -1.0));
    }

    #[test]
    fn pointer_down_on_empty_space_clears_selection() {
        let mut host = host();
        let mut engine = engine();
        assert_eq!(engine.pointer_down(&mut host, 5.0, 5.0), None);
        assert!(host.navigation_enabled());
        assert_eq!(engine.selected_item(), None);
    }

    #[test]
    fn clear_all_keeps_cache() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(1.0, 1.0, 1.0));
        add_now(&mut engine, &mut host, &mut cache, &table());
        add_now(&mut engine, &mut host, &mut cache, &table());
        assert_eq!(engine.items().len(), 2);

        engine.clear_all(&mut host);
        assert!(engine.items().is_empty());
        assert_eq!(host.world.resources.counts(), Default::default());
        assert!(cache.is_cached("table.glb"));
        assert_eq!(engine.loading_state(), &LoadingState::default());
    }

    #[test]
    fn bulk_restore_blocks_single_adds() {
        let mut host = host();
        let mut engine = engine();
        let mut cache = cache_with("table.glb", box_glb(1.0, 1.0, 1.0));

        engine
            .begin_load_many(
                Some(&mut host),
                vec![SavedPlacement::new(table(), Vec3::ZERO)],
                0.0,
            )
            .unwrap();
        assert!(matches!(
            engine.add(Some(&mut host), &mut cache, &table(), 0.0),
            Err(DesignError::ConcurrentLoadConflict)
        ));
        assert!(matches!(
            engine.begin_load_many(Some(&mut host), Vec::new(), 0.0),
            Err(DesignError::ConcurrentLoadConflict)
        ));
    }

    #[test]
    fn placeholder_uses_catalog_size() {
        let mut host = host();
        let mut engine = engine();
        let rug = CatalogItem::new("rug", "Rug", Dimensions::new(2.0, 0.02, 1.5));
        let id = engine
            .add_placeholder(Some(&mut host), &SavedPlacement::new(rug, Vec3::new(1.0, 0.0, 1.0)))
            .unwrap();

        let item = engine.get(&id).unwrap();
        assert_eq!(item.visual, ItemVisual::Placeholder);
        assert!((item.bounds.size() - Vec3::new(2.0, 0.02, 1.5)).length() < 1e-4);
        assert!((item.bounds.min.y - 0.101).abs() < 1e-4);
    }
}
