mod args;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use args::Args;
use roomdeck::{DataPath, DataPathType, SettingsHandler};
use roomdeck_designer::{Catalog, DesignError, DesignSession, PlacementEvent, RoomSpec};
use scenebud::NullSurface;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);

fn setup_logging(path: &DataPath) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_appender::{
        non_blocking,
        rolling::{RollingFileAppender, Rotation},
    };
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        path.path(DataPathType::Log),
        format!("roomdeck-{}.log", env!("CARGO_PKG_VERSION")),
    );
    let (non_blocking_writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_writer);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("roomdeck=info,roomdeck_designer=info,scenebud=info")
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    guard
}

fn load_catalog(path: Option<&str>) -> Result<Catalog, DesignError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| DesignError::Storage(roomdeck::Error::Io(e)))?;
            Catalog::from_json(&json)
        }
        None => Catalog::builtin(),
    }
}

/// Run frames until nothing is loading, or give up after `limit`.
fn settle(session: &mut DesignSession, clock: &Instant, limit: Duration) -> Vec<PlacementEvent> {
    let deadline = Instant::now() + limit;
    let mut events = Vec::new();

    loop {
        events.extend(session.update(clock.elapsed().as_secs_f64()));
        let busy = session.loading_state().is_loading || session.placement().is_bulk_loading();
        if !busy || Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(FRAME);
    }

    events
}

fn report(events: &[PlacementEvent]) {
    for event in events {
        match event {
            PlacementEvent::Placed { id, catalog_id } => info!("placed {catalog_id} as {id}"),
            PlacementEvent::AddFailed { catalog_id, error } => {
                warn!("could not add {catalog_id}: {error}")
            }
            PlacementEvent::BatchFinished(result) => {
                info!(
                    "restore finished: {} loaded, {} failed",
                    result.loaded.len(),
                    result.errors.len()
                );
                for err in &result.errors {
                    warn!("  {err}");
                }
            }
        }
    }
}

fn run(args: Args) -> Result<(), DesignError> {
    let base_path = args
        .datapath
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(DataPath::default_base_or_cwd);
    let path = DataPath::new(&base_path);

    let _guard = setup_logging(&path);

    let mut settings_handler = SettingsHandler::new(&path).load();
    if args.endpoint.is_some() {
        settings_handler.set_remote_endpoint(args.endpoint.clone());
    }
    let settings = settings_handler.settings();
    let timeout = Duration::from_secs_f64(settings.load_timeout_secs + 5.0);

    let catalog = load_catalog(args.catalog.as_deref())?;
    info!("catalog has {} items", catalog.len());

    let asset_dir = args
        .assets
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut session = DesignSession::from_data_path(&path, settings, catalog, asset_dir);
    session.set_project(
        args.save.clone().unwrap_or_else(|| "Untitled room".to_owned()),
        args.project.clone(),
    );

    let spec = RoomSpec::new(args.room.unwrap_or_default());
    session.mount(Box::new(NullSurface::new(1280, 720)), spec)?;

    let clock = Instant::now();

    if let Some(project) = args.project.as_deref()
        && session.load_for_project(project)?.is_some()
        && session.load_models(clock.elapsed().as_secs_f64())? > 0
    {
        report(&settle(&mut session, &clock, timeout));
    }

    if let Some(room) = args.room {
        let spec = RoomSpec {
            dimensions: room,
            ..session.room().clone()
        };
        session.apply_spec(spec)?;
    }

    for catalog_id in &args.add {
        if let Err(err) = session.add_item(catalog_id, clock.elapsed().as_secs_f64()) {
            error!("could not add {catalog_id}: {err}");
            continue;
        }
        report(&settle(&mut session, &clock, timeout));
    }

    let draws = session.render()?;
    let metrics = session.metrics();
    println!(
        "{} items, {:.2} m² covered ({:.1}%), total {:.2}, {} draws",
        metrics.item_count, metrics.covered_area, metrics.coverage_percent, metrics.total_cost, draws
    );

    if args.save.is_some() {
        let saved = session.save(chrono::Utc::now())?;
        println!("saved configuration {}", saved.id);

        let deadline = Instant::now() + Duration::from_secs(5);
        while session.mirror_in_flight() > 0 && Instant::now() < deadline {
            std::thread::sleep(FRAME);
            session.update(clock.elapsed().as_secs_f64());
        }
    }

    session.teardown();
    Ok(())
}

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let (args, unrecognized) = Args::parse(&argv);
    for arg in &unrecognized {
        eprintln!("ignoring unrecognized argument {arg}");
    }

    if let Err(err) = run(args) {
        error!("{err}");
        eprintln!("roomdeck: {err}");
        std::process::exit(1);
    }
}
