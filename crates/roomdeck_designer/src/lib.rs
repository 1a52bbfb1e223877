//! Roomdeck designer: interactive 3D room layouts
//!
//! A room is a parametric shell (floor, four walls, ceiling, doors and
//! windows) that furniture from a catalog is dropped into. Models are
//! fetched and decoded in the background, fitted to their catalog size
//! and kept on the floor while the user drags and rotates them. Layouts
//! round-trip through a versioned JSON configuration.

mod asset_source;
mod catalog;
mod codec;
mod config_store;
mod error;
mod loading_state;
mod metrics;
mod model_cache;
mod placement;
mod pointer;
mod remote_mirror;
mod room;
mod room_shell;
mod scene_host;
mod session;

#[cfg(test)]
mod test_util;

pub use asset_source::{
    AssetSource, DefaultAssetSource, FetchResult, MemoryAssetSource, PendingFetch,
    StalledAssetSource, StalledHandle,
};
pub use catalog::{AssetKind, Catalog, CatalogItem, Dimensions, PlacementPolicy};
pub use codec::{
    BoundingBox, CONFIG_VERSION, DesignState, GlbData, Point3, ReplayPlan, RoomConfiguration,
    SavedFurniture, deserialize, parse_configuration, serialize,
};
pub use config_store::ConfigStore;
pub use error::{DesignError, Result};
pub use loading_state::LoadingState;
pub use metrics::{RoomMetrics, total_cost};
pub use model_cache::{LoadOutcome, LoadPoll, ModelCache, RequestId};
pub use placement::{
    AddStatus, BatchResult, DragState, ItemVisual, PlacedFurnitureItem, PlacementConfig,
    PlacementEngine, PlacementEvent, SavedPlacement, fit_scale,
};
pub use pointer::{PointerButton, PointerEvent, PointerHub, PointerSubscription};
pub use remote_mirror::{RemoteMirror, build_request};
pub use room::{
    DEFAULT_FLOOR_COLOR, DEFAULT_WALL_COLOR, MAX_ROOM_HEIGHT, MIN_ROOM_HEIGHT, Opening, OpeningKind,
    RoomDimensions, RoomSpec, Wall,
};
pub use room_shell::{RoomShell, opening_transform};
pub use scene_host::SceneHost;
pub use session::DesignSession;
