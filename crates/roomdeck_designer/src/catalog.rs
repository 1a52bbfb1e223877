//! Static furniture catalog.

use serde::{Deserialize, Serialize};

use crate::error::Result;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

/// Height above the floor that wall-mounted items hang at.
pub const WALL_MOUNT_HEIGHT: f32 = 1.5;

/// Target size of a catalog item, in meters.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn footprint_area(&self) -> f32 {
        self.width * self.depth
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Model3d,
    Image,
    #[default]
    None,
}

/// Where an item may legally rest.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    #[default]
    Floor,
    Wall,
    Surface,
    Flexible,
}

impl PlacementPolicy {
    /// Surface and flexible items may sit on top of a supporting item.
    pub fn may_rest_on_surface(&self) -> bool {
        matches!(self, PlacementPolicy::Surface | PlacementPolicy::Flexible)
    }

    pub fn preferred_mount_height(&self) -> Option<f32> {
        match self {
            PlacementPolicy::Wall => Some(WALL_MOUNT_HEIGHT),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
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
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, dimensions: Dimensions) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type: "furniture".to_string(),
            category: "general".to_string(),
            dimensions,
            asset_path: None,
            asset_kind: AssetKind::None,
            price: 0.0,
            placement: PlacementPolicy::Floor,
        }
    }

    pub fn with_model(mut self, path: impl Into<String>) -> Self {
        self.asset_path = Some(path.into());
        self.asset_kind = AssetKind::Model3d;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    /// The model path, if this item is backed by a loadable 3D asset.
    pub fn model_path(&self) -> Option<&str> {
        if self.asset_kind != AssetKind::Model3d {
            return None;
        }
        self.asset_path.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn is_3d(&self) -> bool {
        self.model_path().is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// The demo catalog bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
