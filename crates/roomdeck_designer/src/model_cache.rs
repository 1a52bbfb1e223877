use std::collections::{HashMap, HashSet};
use std::path::Path;

use scenebud::ModelTemplate;
use tracing::{debug, info, warn};

use crate::asset_source::{AssetSource, FetchResult, PendingFetch};
use crate::error::DesignError;
use crate::loading_state::LoadingState;

/// Identifies one fetch. Ids are never reused, so a result that arrives
/// for an abandoned id has nowhere to go.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RequestId(u64);

#[derive(Debug)]
pub enum LoadPoll {
    /// Template was cached; this is a private copy.
    Ready(ModelTemplate),
    /// A fetch is underway. Watch [`ModelCache::poll`] for this id.
    Pending(RequestId),
    Failed(DesignError),
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        request: RequestId,
        path: String,
        template: ModelTemplate,
    },
    Failed {
        request: RequestId,
        path: String,
        error: DesignError,
    },
}

impl LoadOutcome {
    pub fn request(&self) -> RequestId {
        match self {
            LoadOutcome::Loaded { request, .. } | LoadOutcome::Failed { request, .. } => *request,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            LoadOutcome::Loaded { path, .. } | LoadOutcome::Failed { path, .. } => path,
        }
    }
}

struct CacheEntry {
    template: ModelTemplate,
    loaded_at: f64,
}

struct InFlight {
    request: RequestId,
    display_name: String,
    started_at: f64,
    fetch: PendingFetch,
}

/// Decoded model templates keyed by asset path.
///
/// Loading is fire-and-poll: [`request`](Self::request) never blocks, and
/// [`poll`](Self::poll), called once per frame, is the only place where
/// finished fetches are decoded and stored. A path that fails (or times
/// out) is remembered and not retried until [`clear_cache`](Self::clear_cache).
pub struct ModelCache {
    source: Box<dyn AssetSource>,
    templates: HashMap<String, CacheEntry>,
    failed: HashSet<String>,
    in_flight: HashMap<String, InFlight>,
    timeout_secs: f64,
    next_request: u64,
    fetch_count: usize,
}

impl ModelCache {
    pub fn new(source: Box<dyn AssetSource>, timeout_secs: f64) -> Self {
        Self {
            source,
            templates: HashMap::new(),
            failed: HashSet::new(),
            in_flight: HashMap::new(),
            timeout_secs,
            next_request: 0,
            fetch_count: 0,
        }
    }

    /// Request a template by asset path.
    ///
    /// - Cached paths: `Ready` with a clone, no I/O.
    /// - Paths that failed before: `Failed(PreviouslyFailed)`.
    /// - Paths already loading: `Pending` with the existing id.
    /// - Anything else starts a fetch and returns `Pending`.
    pub fn request(&mut self, path: &str, display_name: &str, now: f64) -> LoadPoll {
        if let Some(entry) = self.templates.get(path) {
            debug!("model cache hit: {path}");
            return LoadPoll::Ready(entry.template.clone());
        }

        if self.failed.contains(path) {
            return LoadPoll::Failed(DesignError::PreviouslyFailed(path.to_owned()));
        }

        if let Some(in_flight) = self.in_flight.get(path) {
            return LoadPoll::Pending(in_flight.request);
        }

        let request = RequestId(self.next_request);
        self.next_request += 1;
        self.fetch_count += 1;

        info!("loading model '{display_name}' from {path}");
        let fetch = self.source.fetch(path);
        self.in_flight.insert(
            path.to_owned(),
            InFlight {
                request,
                display_name: display_name.to_owned(),
                started_at: now,
                fetch,
            },
        );

        LoadPoll::Pending(request)
    }

    /// Apply finished fetches and expire stale ones.
    pub fn poll(&mut self, now: f64, loading: &mut LoadingState) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();

        let mut paths: Vec<String> = self.in_flight.keys().cloned().collect();
        paths.sort();

        for path in paths {
            let (is_ready, timed_out) = {
                let Some(in_flight) = self.in_flight.get(&path) else {
                    continue;
                };
                loading.set_progress(&in_flight.display_name, in_flight.fetch.progress());
                (
                    in_flight.fetch.promise.ready().is_some(),
                    now - in_flight.started_at >= self.timeout_secs,
                )
            };

            if is_ready {
                if let Some(in_flight) = self.in_flight.remove(&path) {
                    let request = in_flight.request;
                    let result = in_flight.fetch.promise.block_and_take();
                    outcomes.push(self.finish_load(request, path, result, now));
                }
            } else if timed_out && let Some(in_flight) = self.in_flight.remove(&path) {
                // dropping the fetch drops the promise; a late send goes nowhere
                warn!(
                    "model load for {path} timed out after {}s",
                    self.timeout_secs
                );
                self.failed.insert(path.clone());
                outcomes.push(LoadOutcome::Failed {
                    request: in_flight.request,
                    error: DesignError::LoadTimeout {
                        path: path.clone(),
                        secs: self.timeout_secs,
                    },
                    path,
                });
            }
        }

        outcomes
    }

    fn finish_load(
        &mut self,
        request: RequestId,
        path: String,
        result: FetchResult,
        now: f64,
    ) -> LoadOutcome {
        match result.and_then(|bytes| decode_template(&path, &bytes)) {
            Ok(template) => {
                info!(
                    "loaded model {path} ({} meshes)",
                    template.mesh_count()
                );
                self.templates.insert(
                    path.clone(),
                    CacheEntry {
                        template: template.clone(),
                        loaded_at: now,
                    },
                );
                LoadOutcome::Loaded {
                    request,
                    path,
                    template,
                }
            }
            Err(reason) => {
                warn!("model load failed for {path}: {reason}");
                self.failed.insert(path.clone());
                LoadOutcome::Failed {
                    request,
                    error: DesignError::load_failure(&path, reason),
                    path,
                }
            }
        }
    }

    /// Drop every cached template and forget past failures. In-flight
    /// loads are left alone.
    pub fn clear_cache(&mut self) {
        info!(
            "clearing model cache ({} templates, {} failed)",
            self.templates.len(),
            self.failed.len()
        );
        self.templates.clear();
        self.failed.clear();
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.templates.contains_key(path)
    }

    pub fn has_failed(&self, path: &str) -> bool {
        self.failed.contains(path)
    }

    pub fn is_in_flight(&self, path: &str) -> bool {
        self.in_flight.contains_key(path)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// When the cached template for `path` finished loading.
    pub fn loaded_at(&self, path: &str) -> Option<f64> {
        self.templates.get(path).map(|e| e.loaded_at)
    }

    /// Number of fetches started through the asset source.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn timeout_secs(&self) -> f64 {
        self.timeout_secs
    }
}

fn decode_template(path: &str, bytes: &[u8]) -> Result<ModelTemplate, String> {
    let name = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");

    let mut template = scenebud::decode_gltf(bytes, name).map_err(|e| e.to_string())?;
    if template.bounds().is_empty() {
        return Err("model has no geometry".to_string());
    }
    template.normalize();
    Ok(template)
}
