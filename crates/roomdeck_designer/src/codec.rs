//! Saving a layout to a versioned snapshot and replaying it.

use chrono::{DateTime, Utc};
use scenebud::Color;
use scenebud::glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{AssetKind, CatalogItem, Dimensions, PlacementPolicy};
use crate::error::{DesignError, Result};
use crate::metrics::total_cost;
use crate::placement::{ItemVisual, PlacedFurnitureItem, SavedPlacement};
use crate::room::{Opening, RoomDimensions, RoomSpec, Wall};

/// Current schema version written by [`serialize`].
pub const CONFIG_VERSION: u64 = 2;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

/// What it took to fit a model into its catalog size, so a reload can
/// reproduce the exact placement without refitting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlbData {
    pub applied_scale: f32,
    pub floor_offset: f32,
    pub bounding_box: BoundingBox,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SavedFurniture {
    pub id: String,
    pub catalog_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub category: String,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub asset_path: Option<String>,
    #[serde(default)]
    pub asset_kind: AssetKind,
    pub price: f64,
    #[serde(default)]
    pub placement: PlacementPolicy,
    pub position: Point3,
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default)]
    pub glb: Option<GlbData>,
}

impl SavedFurniture {
    pub fn from_placed(item: &PlacedFurnitureItem, now: DateTime<Utc>) -> Self {
        let glb = match item.visual {
            ItemVisual::Model => Some(GlbData {
                applied_scale: item.applied_scale,
                floor_offset: item.floor_offset,
                bounding_box: BoundingBox {
                    min: item.bounds.min.into(),
                    max: item.bounds.max.into(),
                },
                recorded_at: now,
            }),
            ItemVisual::Placeholder => None,
        };

        Self {
            id: item.id.clone(),
            catalog_id: item.catalog.id.clone(),
            name: item.catalog.name.clone(),
            item_type: item.catalog.item_type.clone(),
            category: item.catalog.category.clone(),
            dimensions: item.catalog.dimensions,
            asset_path: item.catalog.asset_path.clone(),
            asset_kind: item.catalog.asset_kind,
            price: item.catalog.price,
            placement: item.catalog.placement,
            position: item.position.into(),
            rotation_y: item.rotation_y,
            glb,
        }
    }

    pub fn catalog_item(&self) -> CatalogItem {
        CatalogItem {
            id: self.catalog_id.clone(),
            name: self.name.clone(),
            item_type: self.item_type.clone(),
            category: self.category.clone(),
            dimensions: self.dimensions,
            asset_path: self.asset_path.clone(),
            asset_kind: self.asset_kind,
            price: self.price,
            placement: self.placement,
        }
    }

    pub fn to_placement(&self) -> SavedPlacement {
        SavedPlacement {
            id: Some(self.id.clone()),
            catalog: self.catalog_item(),
            position: self.position.into(),
            rotation_y: self.rotation_y,
            applied_scale: self.glb.as_ref().map(|g| g.applied_scale),
            floor_offset: self.glb.as_ref().map(|g| g.floor_offset),
        }
    }
}

/// A persisted room layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoomConfiguration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub room_dimensions: RoomDimensions,
    pub wall_color: String,
    pub floor_color: String,
    #[serde(default)]
    pub doors: Vec<Opening>,
    #[serde(default)]
    pub windows: Vec<Opening>,
    #[serde(default)]
    pub placed_furniture: Vec<SavedFurniture>,
    pub total_cost: f64,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomConfiguration {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        parse_configuration(serde_json::from_str(json)?)
    }
}

/// The live state a snapshot is taken from.
pub struct DesignState<'a> {
    /// Id of the configuration being updated, if this is a re-save.
    pub config_id: Option<&'a str>,
    pub name: &'a str,
    pub project_id: Option<&'a str>,
    pub room: &'a RoomSpec,
    pub items: &'a [PlacedFurnitureItem],
    pub created_at: Option<DateTime<Utc>>,
}

pub fn serialize(state: &DesignState<'_>, now: DateTime<Utc>) -> RoomConfiguration {
    let config = RoomConfiguration {
        id: state
            .config_id
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: state.name.to_owned(),
        project_id: state.project_id.map(str::to_owned),
        room_dimensions: state.room.dimensions,
        wall_color: state.room.wall_color.to_hex(),
        floor_color: state.room.floor_color.to_hex(),
        doors: state.room.doors().cloned().collect(),
        windows: state.room.windows().cloned().collect(),
        placed_furniture: state
            .items
            .iter()
            .map(|i| SavedFurniture::from_placed(i, now))
            .collect(),
        total_cost: total_cost(state.items),
        version: CONFIG_VERSION,
        created_at: state.created_at.unwrap_or(now),
        updated_at: now,
    };
    debug!(
        "serialized configuration {} with {} items",
        config.id,
        config.placed_furniture.len()
    );
    config
}

/// Everything needed to put a saved layout back.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPlan {
    pub config_id: String,
    pub name: String,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub room: RoomSpec,
    /// Items without a 3D model; placed right away.
    pub immediate: Vec<SavedPlacement>,
    /// Items with a 3D model; placed when the user asks to load models.
    pub deferred: Vec<SavedPlacement>,
}

fn parse_color(field: &str, hex: &str) -> Result<Color> {
    Color::from_hex(hex).ok_or_else(|| DesignError::Decode(format!("bad {field} '{hex}'")))
}

pub fn deserialize(config: &RoomConfiguration) -> Result<ReplayPlan> {
    if config.version != CONFIG_VERSION {
        return Err(DesignError::UnsupportedVersion(config.version));
    }
    config.room_dimensions.validate()?;

    let mut room = RoomSpec::new(config.room_dimensions).with_colors(
        parse_color("wall_color", &config.wall_color)?,
        parse_color("floor_color", &config.floor_color)?,
    );
    room.openings = config
        .doors
        .iter()
        .chain(config.windows.iter())
        .cloned()
        .collect();

    let (deferred, immediate): (Vec<SavedPlacement>, Vec<SavedPlacement>) = config
        .placed_furniture
        .iter()
        .map(SavedFurniture::to_placement)
        .partition(|p| p.catalog.is_3d());

    info!(
        "replaying configuration {}: {} immediate, {} deferred",
        config.id,
        immediate.len(),
        deferred.len()
    );

    Ok(ReplayPlan {
        config_id: config.id.clone(),
        name: config.name.clone(),
        project_id: config.project_id.clone(),
        created_at: config.created_at,
        room,
        immediate,
        deferred,
    })
}

/// Read a stored configuration of any known schema version. Snapshots
/// without a version are version 1 and get migrated.
pub fn parse_configuration(value: Value) -> Result<RoomConfiguration> {
    let version = match value.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| DesignError::Decode(format!("bad version {v}")))?,
    };

    match version {
        1 => {
            let legacy: LegacyConfiguration = serde_json::from_value(value)?;
            Ok(legacy.migrate())
        }
        CONFIG_VERSION => Ok(serde_json::from_value(value)?),
        other => Err(DesignError::UnsupportedVersion(other)),
    }
}

// version 1: camelCase keys, flat [x, y, z] positions, no fit data

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyConfiguration {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    project_id: Option<String>,
    room_dimensions: RoomDimensions,
    #[serde(default = "legacy_wall_color")]
    wall_color: String,
    #[serde(default = "legacy_floor_color")]
    floor_color: String,
    #[serde(default)]
    doors: Vec<LegacyOpening>,
    #[serde(default)]
    windows: Vec<LegacyOpening>,
    #[serde(default)]
    placed_furniture: Vec<LegacyFurniture>,
    #[serde(default)]
    total_cost: f64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

fn legacy_wall_color() -> String {
    crate::room::DEFAULT_WALL_COLOR.to_owned()
}

fn legacy_floor_color() -> String {
    crate::room::DEFAULT_FLOOR_COLOR.to_owned()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyOpening {
    id: String,
    wall: Wall,
    position: f32,
    width: f32,
    height: f32,
    #[serde(default)]
    sill_height: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyFurniture {
    id: String,
    furniture_id: String,
    name: String,
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default)]
    category: String,
    dimensions: Dimensions,
    #[serde(default)]
    model_url: Option<String>,
    #[serde(default)]
    price: f64,
    position: [f32; 3],
    #[serde(default)]
    rotation: f32,
}

impl LegacyConfiguration {
    fn migrate(self) -> RoomConfiguration {
        info!("migrating configuration {} from version 1", self.id);

        let door = |o: LegacyOpening| Opening::door(o.id, o.wall, o.position, o.width, o.height);
        let window = |o: LegacyOpening| {
            let sill = o.sill_height.unwrap_or(0.9);
            Opening::window(o.id, o.wall, o.position, o.width, o.height, sill)
        };

        let created_at = self.created_at.unwrap_or_default();
        RoomConfiguration {
            id: self.id,
            name: self.name,
            project_id: self.project_id,
            room_dimensions: self.room_dimensions,
            wall_color: self.wall_color,
            floor_color: self.floor_color,
            doors: self.doors.into_iter().map(door).collect(),
            windows: self.windows.into_iter().map(window).collect(),
            placed_furniture: self
                .placed_furniture
                .into_iter()
                .map(LegacyFurniture::migrate)
                .collect(),
            total_cost: self.total_cost,
            version: CONFIG_VERSION,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        }
    }
}

impl LegacyFurniture {
    fn migrate(self) -> SavedFurniture {
        let model_url = self.model_url.filter(|u| !u.trim().is_empty());
        let asset_kind = if model_url.is_some() {
            AssetKind::Model3d
        } else {
            AssetKind::None
        };
        let [x, y, z] = self.position;

        SavedFurniture {
            id: self.id,
            catalog_id: self.furniture_id,
            name: self.name,
            item_type: self.item_type,
            category: self.category,
            dimensions: self.dimensions,
            asset_path: model_url,
            asset_kind,
            price: self.price,
            placement: PlacementPolicy::Floor,
            position: Point3 { x, y, z },
            rotation_y: self.rotation,
            glb: None,
        }
    }
}
