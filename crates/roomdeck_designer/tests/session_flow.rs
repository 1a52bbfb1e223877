mod common;

use common::*;
use pretty_assertions::assert_eq;
use roomdeck::{Directory, FileKvStore, MemoryKvStore};
use roomdeck_designer::{
    AddStatus, Catalog, DesignError, DesignSession, MemoryAssetSource, Opening, PlacementEvent,
    PointerButton, PointerEvent, ReplayPlan, RoomDimensions, RoomSpec, SavedPlacement,
    StalledAssetSource, Wall,
};
use scenebud::glam::Vec3;
use scenebud::{Color, NullSurface};

fn at(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&chrono::Utc)
}

#[test]
fn coffee_table_is_fitted_and_rests_on_floor() {
    let source = MemoryAssetSource::new().with_asset(TABLE_GLB, box_glb_lifted(2.0, 2.0, 2.0, 0.5));
    let mut session = mounted_session(source);

    let id = place(&mut session, "coffee_table");
    let item = session.placement().get(&id).unwrap();

    assert!((item.applied_scale - 0.725).abs() < 1e-5);
    let size = item.bounds.size();
    assert!(size.x <= 2.2 + 1e-4 && size.y <= 1.45 + 1e-4 && size.z <= 1.7 + 1e-4);
    assert!((item.bounds.min.y - 0.101).abs() < 1e-4);
    assert!(!session.loading_state().is_loading);
}

#[test]
fn repeated_adds_fetch_once() {
    let source = furniture_source();
    let fetches = source.fetch_counter();
    let mut session = mounted_session(source);

    let first = place(&mut session, "coffee_table");
    let second = match session.add_item("coffee_table", 1.0).unwrap() {
        AddStatus::Placed(id) => id,
        AddStatus::Pending(_) => panic!("cached model should place immediately"),
    };

    assert_ne!(first, second);
    assert_eq!(session.items().len(), 2);
    assert_eq!(session.cache().fetch_count(), 1);
    assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn dragging_past_a_wall_stops_at_the_wall() {
    let mut session = mounted_session(furniture_source());
    let id = place(&mut session, "coffee_table");
    session.render().unwrap();

    let node = session.placement().get(&id).unwrap().node;
    let host = session.host().unwrap();
    let (sx, sy) = host.node_screen_position(node).unwrap();
    let (tx, ty) = host.project(Vec3::new(20.0, 0.0, 0.0)).unwrap();

    let hub = session.pointer_hub();
    hub.dispatch(PointerEvent::Down {
        x: sx,
        y: sy,
        button: PointerButton::Primary,
    });
    hub.dispatch(PointerEvent::Move { x: tx, y: ty });
    session.update(0.1);
    assert!(!session.host().unwrap().navigation_enabled());

    let item = session.placement().get(&id).unwrap();
    // half width 3.5 minus half the table's 2.2
    assert!((item.position.x - 2.4).abs() < 1e-4);
    assert!((item.bounds.min.y - 0.101).abs() < 1e-4);

    session
        .pointer_hub()
        .dispatch(PointerEvent::Up { x: tx, y: ty });
    session.update(0.2);
    assert!(session.host().unwrap().navigation_enabled());
    assert_eq!(session.placement().selected_item(), Some(id.as_str()));
}

#[test]
fn dragging_empty_space_orbits_the_camera() {
    let mut session = mounted_session(MemoryAssetSource::new());
    session.render().unwrap();
    let eye = session.host().unwrap().camera().eye;

    let hub = session.pointer_hub();
    hub.dispatch(PointerEvent::Down {
        x: 5.0,
        y: 5.0,
        button: PointerButton::Primary,
    });
    hub.dispatch(PointerEvent::Move { x: 85.0, y: 5.0 });
    hub.dispatch(PointerEvent::Up { x: 85.0, y: 5.0 });
    session.update(0.0);

    let moved = session.host().unwrap().camera().eye;
    assert!((moved - eye).length() > 1e-3);
    assert_eq!(session.placement().selected_item(), None);
}

#[test]
fn eight_rotations_come_full_circle() {
    let mut session = mounted_session(furniture_source());
    let id = place(&mut session, "coffee_table");
    let before = session.placement().get(&id).unwrap().bounds;

    let mut yaw = 0.0;
    for _ in 0..8 {
        yaw = session.rotate_item(&id).unwrap();
    }
    assert!((yaw - std::f32::consts::TAU).abs() < 1e-4);

    let after = session.placement().get(&id).unwrap().bounds;
    assert!((after.min - before.min).length() < 1e-4);
    assert!((after.max - before.max).length() < 1e-4);
}

#[test]
fn remove_twice_is_harmless() {
    let mut session = mounted_session(furniture_source());
    let id = place(&mut session, "armchair");

    assert!(session.remove_item(&id));
    assert!(!session.remove_item(&id));
    assert!(session.items().is_empty());
    assert_eq!(session.metrics().item_count, 0);
}

#[test]
fn layout_survives_save_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let store = || FileKvStore::new(Directory::new(dir.path().to_path_buf()));

    let spec = RoomSpec::new(RoomDimensions::new(5.0, 6.0, 2.8).unwrap())
        .with_colors(
            Color::from_hex("#ddeeff").unwrap(),
            Color::from_hex("#604020").unwrap(),
        )
        .with_opening(Opening::door("door-1", Wall::South, 2.0, 0.9, 2.1))
        .with_opening(Opening::window("win-1", Wall::East, 1.0, 1.2, 1.0, 0.9));

    let mut first = mounted_session_with(furniture_source(), store());
    first.set_project("Living room", Some("proj-1".to_owned()));
    first.apply_spec(spec.clone()).unwrap();

    let table = place(&mut first, "coffee_table");
    first.rotate_item(&table).unwrap();
    let saved_item = first.placement().get(&table).unwrap().clone();
    let saved = first.save(at("2026-03-01T10:00:00Z")).unwrap();
    assert_eq!(saved.total_cost, 349.0);
    drop(first);

    let mut second = mounted_session_with(furniture_source(), store());
    let plan = second.load_for_project("proj-1").unwrap().unwrap();
    assert_eq!(plan.config_id, saved.id);
    assert_eq!(plan.room, spec);
    assert_eq!(second.room(), &spec);
    assert_eq!(second.shell().unwrap().opening_count(), 2);
    assert!(second.items().is_empty());
    assert_eq!(second.deferred_count(), 1);

    assert_eq!(second.load_models(0.0).unwrap(), 1);
    let result = finish_batch(&mut second, 0.0);
    assert!(!result.is_partial());

    let restored = second.placement().get(&table).unwrap();
    assert!((restored.position - saved_item.position).length() < 1e-4);
    assert!((restored.rotation_y - saved_item.rotation_y).abs() < 1e-6);
    assert!((restored.applied_scale - saved_item.applied_scale).abs() < 1e-6);

    // saving again updates the same record
    let resaved = second.save(at("2026-03-02T10:00:00Z")).unwrap();
    assert_eq!(resaved.id, saved.id);
    assert_eq!(resaved.created_at, saved.created_at);
}

fn saved(id: &str, catalog: &Catalog, catalog_id: &str, x: f32) -> SavedPlacement {
    let mut placement = SavedPlacement::new(catalog.get(catalog_id).unwrap().clone(), Vec3::new(x, 0.0, 0.0));
    placement.id = Some(id.to_owned());
    placement
}

fn plan(session: &DesignSession) -> ReplayPlan {
    let catalog = session.catalog();
    ReplayPlan {
        config_id: "cfg-1".to_owned(),
        name: "Restored".to_owned(),
        project_id: None,
        created_at: at("2026-01-01T00:00:00Z"),
        room: RoomSpec::default(),
        immediate: vec![saved("rug", catalog, "area_rug", 0.0)],
        deferred: vec![
            saved("1", catalog, "coffee_table", -1.0),
            saved("2", catalog, "sofa_3_seat", 0.0),
            saved("3", catalog, "armchair", 1.5),
        ],
    }
}

#[test]
fn bulk_restore_keeps_going_after_a_failure() {
    let mut session = mounted_session(furniture_source());
    let plan = plan(&session);
    session.apply_plan(&plan).unwrap();
    assert_eq!(session.items().len(), 1);

    assert_eq!(session.load_models(0.0).unwrap(), 3);
    let result = finish_batch(&mut session, 0.0);

    let loaded: Vec<&str> = result.loaded.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(loaded, vec!["1", "3"]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Three Seat Sofa: "));
    assert!(result.is_partial());

    assert_eq!(session.items().len(), 3);
    assert!(!session.loading_state().is_loading);
    assert!(session.loading_state().failed_paths.contains(SOFA_GLB));
}

#[test]
fn single_adds_wait_for_bulk_restore() {
    let mut session = mounted_session(furniture_source());
    let plan = plan(&session);
    session.apply_plan(&plan).unwrap();
    session.load_models(0.0).unwrap();

    assert!(matches!(
        session.add_item("armchair", 0.0),
        Err(DesignError::ConcurrentLoadConflict)
    ));

    finish_batch(&mut session, 0.0);
    assert!(session.add_item("armchair", 30.0).is_ok());
}

#[test]
fn stalled_download_times_out() {
    let mut session = mounted_session(StalledAssetSource::default());
    assert!(matches!(
        session.add_item("coffee_table", 0.0).unwrap(),
        AddStatus::Pending(_)
    ));
    assert!(session.loading_state().is_loading);

    assert!(session.update(44.0).is_empty());
    let events = session.update(45.0);
    assert!(matches!(
        events.as_slice(),
        [PlacementEvent::AddFailed {
            error: DesignError::LoadTimeout { .. },
            ..
        }]
    ));
    assert!(session.items().is_empty());

    assert!(matches!(
        session.add_item("coffee_table", 46.0),
        Err(DesignError::PreviouslyFailed(_))
    ));
    session.clear_model_cache();
    assert!(session.add_item("coffee_table", 47.0).is_ok());
}

#[test]
fn unmounted_session_refuses_scene_work() {
    let mut session = DesignSession::new(
        Default::default(),
        Catalog::builtin().unwrap(),
        Box::new(furniture_source()),
        Box::new(MemoryKvStore::default()),
    );

    assert!(matches!(
        session.add_item("coffee_table", 0.0),
        Err(DesignError::SceneNotReady)
    ));
    assert!(matches!(session.render(), Err(DesignError::SceneNotReady)));
    assert!(!session.remove_item("anything"));
    assert!(matches!(
        session.add_item("no_such_thing", 0.0),
        Err(DesignError::UnknownCatalogItem(_))
    ));
    assert_eq!(session.cache().fetch_count(), 0);
}

#[test]
fn non_model_items_are_not_added() {
    let mut session = mounted_session(furniture_source());
    assert!(matches!(
        session.add_item("area_rug", 0.0),
        Err(DesignError::UnsupportedAsset(_))
    ));
    assert!(matches!(
        session.add_item("wall_art", 0.0),
        Err(DesignError::UnsupportedAsset(_))
    ));
}

#[test]
fn shrinking_the_room_pulls_items_inside() {
    let mut session = mounted_session(furniture_source());
    let id = place(&mut session, "armchair");

    session.render().unwrap();
    let node = session.placement().get(&id).unwrap().node;
    let host = session.host().unwrap();
    let (sx, sy) = host.node_screen_position(node).unwrap();
    let (tx, ty) = host.project(Vec3::new(20.0, 0.0, 0.0)).unwrap();

    let hub = session.pointer_hub();
    hub.dispatch(PointerEvent::Down {
        x: sx,
        y: sy,
        button: PointerButton::Primary,
    });
    hub.dispatch(PointerEvent::Move { x: tx, y: ty });
    hub.dispatch(PointerEvent::Up { x: tx, y: ty });
    session.update(0.0);
    assert!((session.items()[0].position.x - (3.5 - 0.425)).abs() < 1e-4);

    let smaller = RoomSpec::new(RoomDimensions::new(4.0, 4.0, 2.5).unwrap());
    session.apply_spec(smaller).unwrap();
    let item = &session.items()[0];
    assert!((item.position.x - (2.0 - 0.425)).abs() < 1e-4);
    assert!((item.bounds.min.y - 0.101).abs() < 1e-4);
    assert_eq!(session.shell().unwrap().dimensions().width, 4.0);
}

#[test]
fn openings_outside_their_wall_are_refused() {
    let mut session = mounted_session(furniture_source());
    let before = session.room().clone();

    let spec = RoomSpec::new(RoomDimensions::new(4.0, 5.0, 2.5).unwrap())
        .with_opening(Opening::window("win-1", Wall::North, 3.8, 1.2, 1.0, 0.9));
    assert!(matches!(
        session.apply_spec(spec),
        Err(DesignError::InvalidOpening { .. })
    ));
    assert_eq!(session.room(), &before);
    assert_eq!(session.shell().unwrap().openings().count(), 0);

    let fitted = RoomSpec::new(RoomDimensions::new(4.0, 5.0, 2.5).unwrap())
        .with_opening(Opening::window("win-1", Wall::North, 3.0, 1.2, 1.0, 0.9));
    session.apply_spec(fitted).unwrap();
    assert_eq!(session.shell().unwrap().openings().count(), 1);
}

#[test]
fn teardown_releases_scene_and_listeners() {
    let mut session = mounted_session(furniture_source());
    place(&mut session, "armchair");
    assert_eq!(session.pointer_hub().listener_count(), 1);

    session.teardown();
    assert!(!session.is_mounted());
    assert!(session.items().is_empty());
    assert_eq!(session.pointer_hub().listener_count(), 0);
    assert!(session.cache().is_cached(ARMCHAIR_GLB));

    session
        .mount(Box::new(NullSurface::new(640, 480)), RoomSpec::default())
        .unwrap();
    assert_eq!(session.pointer_hub().listener_count(), 1);
    assert!(matches!(
        session.add_item("armchair", 0.0).unwrap(),
        AddStatus::Placed(_)
    ));
}
