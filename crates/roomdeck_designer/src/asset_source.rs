//! Where model bytes come from.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use poll_promise::{Promise, Sender};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

pub type FetchResult = Result<Vec<u8>, String>;

/// A fetch that completes on some other thread. `progress` is 0-100 and
/// only meaningful while bytes are streaming.
pub struct PendingFetch {
    pub promise: Promise<FetchResult>,
    pub progress: Arc<AtomicU8>,
}

impl PendingFetch {
    pub fn new(promise: Promise<FetchResult>, progress: Arc<AtomicU8>) -> Self {
        Self { promise, progress }
    }

    /// A fetch whose result is already known.
    pub fn ready(result: FetchResult) -> Self {
        Self {
            promise: Promise::from_ready(result),
            progress: Arc::new(AtomicU8::new(100)),
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }
}

pub trait AssetSource {
    /// Begin fetching the bytes behind `path`. Must not block.
    fn fetch(&mut self, path: &str) -> PendingFetch;
}

/// Returns true if `url` is an HTTP or HTTPS URL.
fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Compute on-disk cache path: `<cache_dir>/<sha256(url)>.<ext>`.
fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let ext = Path::new(url)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("glb");

    cache_dir.join(format!("{hash}.{ext}"))
}

fn read_file(path: &Path) -> FetchResult {
    let bytes = std::fs::read(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    if bytes.is_empty() {
        return Err(format!("{} is empty", path.display()));
    }
    Ok(bytes)
}

/// Atomic write: .tmp then rename
fn write_cache(target_path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = target_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("mkdir: {e}"))?;
    }
    let tmp_path = target_path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes).map_err(|e| format!("write: {e}"))?;
    std::fs::rename(&tmp_path, target_path).map_err(|e| format!("rename: {e}"))?;
    Ok(())
}

/// Local files are read on a worker thread, relative to `base_dir`.
/// HTTP/HTTPS URLs are streamed via `ehttp` and cached to disk under a
/// sha256-hashed filename; later fetches of the same URL read the cache.
pub struct DefaultAssetSource {
    base_dir: PathBuf,
    cache_dir: PathBuf,
}

impl DefaultAssetSource {
    pub fn new(base_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            base_dir,
            cache_dir,
        }
    }

    fn fetch_local(&self, path: &Path) -> PendingFetch {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        let progress = Arc::new(AtomicU8::new(0));
        let done = progress.clone();
        let promise = Promise::spawn_thread("roomdeck_asset_read", move || {
            let result = read_file(&path);
            done.store(100, Ordering::Relaxed);
            result
        });
        PendingFetch::new(promise, progress)
    }

    fn fetch_remote(&self, url: &str) -> PendingFetch {
        let target_path = cache_path(&self.cache_dir, url);
        if target_path.exists() {
            info!("Model cache hit: {}", url);
            return self.fetch_local(&target_path);
        }

        info!("Downloading model: {}", url);
        let (sender, promise) = Promise::new();
        let progress = Arc::new(AtomicU8::new(0));
        let stream = StreamState {
            sender: Mutex::new(Some(sender)),
            body: Mutex::new(Vec::new()),
            expected: AtomicUsize::new(0),
            progress: progress.clone(),
            target_path,
            url: url.to_owned(),
        };

        ehttp::streaming::fetch(ehttp::Request::get(url), move |part| stream.on_part(part));

        PendingFetch::new(promise, progress)
    }
}

impl AssetSource for DefaultAssetSource {
    fn fetch(&mut self, path: &str) -> PendingFetch {
        if is_remote(path) {
            self.fetch_remote(path)
        } else {
            self.fetch_local(Path::new(path))
        }
    }
}

/// Accumulates a streamed download and reports progress as it goes.
struct StreamState {
    sender: Mutex<Option<Sender<FetchResult>>>,
    body: Mutex<Vec<u8>>,
    expected: AtomicUsize,
    progress: Arc<AtomicU8>,
    target_path: PathBuf,
    url: String,
}

impl StreamState {
    fn finish(&self, result: FetchResult) {
        if let Ok(mut sender) = self.sender.lock()
            && let Some(sender) = sender.take()
        {
            sender.send(result);
        }
    }

    fn on_part(&self, part: ehttp::Result<ehttp::streaming::Part>) -> ControlFlow<()> {
        let part = match part {
            Ok(part) => part,
            Err(e) => {
                self.finish(Err(format!("HTTP error: {e}")));
                return ControlFlow::Break(());
            }
        };

        match part {
            ehttp::streaming::Part::Response(response) => {
                if !response.ok {
                    self.finish(Err(format!(
                        "HTTP {}: {}",
                        response.status, response.status_text
                    )));
                    return ControlFlow::Break(());
                }
                let expected = response
                    .headers
                    .get("content-length")
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                self.expected.store(expected, Ordering::Relaxed);
                ControlFlow::Continue(())
            }

            // an empty chunk marks the end of the body
            ehttp::streaming::Part::Chunk(chunk) if chunk.is_empty() => {
                let body = match self.body.lock() {
                    Ok(mut body) => std::mem::take(&mut *body),
                    Err(_) => {
                        self.finish(Err("download buffer poisoned".to_string()));
                        return ControlFlow::Break(());
                    }
                };

                if body.is_empty() {
                    self.finish(Err("Empty response body".to_string()));
                    return ControlFlow::Break(());
                }

                if let Err(e) = write_cache(&self.target_path, &body) {
                    // still usable this session, just not cached
                    warn!("could not cache {}: {e}", self.url);
                } else {
                    info!("Cached {} bytes for {}", body.len(), self.url);
                }

                self.progress.store(100, Ordering::Relaxed);
                self.finish(Ok(body));
                ControlFlow::Break(())
            }

            ehttp::streaming::Part::Chunk(chunk) => {
                let received = match self.body.lock() {
                    Ok(mut body) => {
                        body.extend_from_slice(&chunk);
                        body.len()
                    }
                    Err(_) => return ControlFlow::Break(()),
                };

                let expected = self.expected.load(Ordering::Relaxed);
                if expected > 0 {
                    let pct = (received.saturating_mul(100) / expected).min(99) as u8;
                    self.progress.store(pct, Ordering::Relaxed);
                }
                ControlFlow::Continue(())
            }
        }
    }
}

/// Serves bytes from memory. Useful for bundled assets and for tests;
/// counts how many fetches it has served.
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.assets.insert(path.into(), bytes);
        self
    }

    /// Shared counter of fetches served so far.
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&mut self, path: &str) -> PendingFetch {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        PendingFetch::ready(
            self.assets
                .get(path)
                .cloned()
                .ok_or_else(|| "HTTP 404: Not Found".to_string()),
        )
    }
}

type StalledSenders = Arc<Mutex<Vec<Sender<FetchResult>>>>;

/// Never completes on its own. Lets callers exercise load timeouts, and
/// deliver the bytes late through a [`StalledHandle`].
#[derive(Default)]
pub struct StalledAssetSource {
    senders: StalledSenders,
}

impl StalledAssetSource {
    /// A handle that stays usable after the source is boxed away.
    pub fn handle(&self) -> StalledHandle {
        StalledHandle {
            senders: self.senders.clone(),
        }
    }
}

#[derive(Clone)]
pub struct StalledHandle {
    senders: StalledSenders,
}

impl StalledHandle {
    /// Complete every stalled fetch now with the given bytes. Returns how
    /// many were released.
    pub fn release_all(&self, bytes: &[u8]) -> usize {
        let Ok(mut senders) = self.senders.lock() else {
            return 0;
        };
        let released = senders.len();
        for sender in senders.drain(..) {
            sender.send(Ok(bytes.to_vec()));
        }
        released
    }
}

impl AssetSource for StalledAssetSource {
    fn fetch(&mut self, _path: &str) -> PendingFetch {
        let (sender, promise) = Promise::new();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(sender);
        }
        PendingFetch::new(promise, Arc::new(AtomicU8::new(0)))
    }
}
