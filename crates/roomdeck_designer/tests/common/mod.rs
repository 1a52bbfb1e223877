#![allow(dead_code)]

#[path = "../../src/test_util.rs"]
mod fixture;

pub use fixture::{box_glb, box_glb_lifted};

use roomdeck::{EngineSettings, KeyValueStore, MemoryKvStore};
use roomdeck_designer::{
    AssetSource, BatchResult, Catalog, DesignSession, MemoryAssetSource, PlacementEvent, RoomSpec,
};
use scenebud::NullSurface;

pub const TABLE_GLB: &str = "models/coffee_table.glb";
pub const SOFA_GLB: &str = "models/sofa_3_seat.glb";
pub const ARMCHAIR_GLB: &str = "models/armchair.glb";

/// Every builtin model except the sofa.
pub fn furniture_source() -> MemoryAssetSource {
    MemoryAssetSource::new()
        .with_asset(TABLE_GLB, box_glb(2.0, 2.0, 2.0))
        .with_asset(ARMCHAIR_GLB, box_glb(1.0, 1.0, 1.0))
}

pub fn mounted_session_with(
    source: impl AssetSource + 'static,
    store: impl KeyValueStore + 'static,
) -> DesignSession {
    let catalog = Catalog::builtin().expect("builtin catalog");
    let mut session = DesignSession::new(
        EngineSettings::default(),
        catalog,
        Box::new(source),
        Box::new(store),
    );
    session
        .mount(Box::new(NullSurface::new(800, 600)), RoomSpec::default())
        .expect("mount");
    session
}

pub fn mounted_session(source: impl AssetSource + 'static) -> DesignSession {
    mounted_session_with(source, MemoryKvStore::default())
}

/// Step the session from `start` in small increments, collecting events
/// until `done` says stop or the step budget runs out.
pub fn drive_until(
    session: &mut DesignSession,
    start: f64,
    mut done: impl FnMut(&PlacementEvent) -> bool,
) -> Vec<PlacementEvent> {
    let mut events = Vec::new();
    for step in 0..400 {
        let now = start + step as f64 * 0.05;
        for event in session.update(now) {
            let stop = done(&event);
            events.push(event);
            if stop {
                return events;
            }
        }
    }
    panic!("session never settled: {events:?}");
}

/// Drive a bulk restore to completion and return its result.
pub fn finish_batch(session: &mut DesignSession, start: f64) -> BatchResult {
    let events = drive_until(session, start, |e| {
        matches!(e, PlacementEvent::BatchFinished(_))
    });
    match events.into_iter().last() {
        Some(PlacementEvent::BatchFinished(result)) => result,
        other => panic!("expected a finished batch, got {other:?}"),
    }
}

/// Add a catalog item and run updates until it lands. Returns its id.
pub fn place(session: &mut DesignSession, catalog_id: &str) -> String {
    match session.add_item(catalog_id, 0.0).expect("add") {
        roomdeck_designer::AddStatus::Placed(id) => id,
        roomdeck_designer::AddStatus::Pending(_) => {
            let events = drive_until(session, 0.0, |e| matches!(e, PlacementEvent::Placed { .. }));
            match events.into_iter().last() {
                Some(PlacementEvent::Placed { id, .. }) => id,
                other => panic!("expected placement, got {other:?}"),
            }
        }
    }
}
