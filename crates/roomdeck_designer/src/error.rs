/// Errors surfaced by the design engine. Every fallible operation
/// resolves to one of these; nothing is swallowed.
#[derive(thiserror::Error, Debug)]
pub enum DesignError {
    #[error("the scene is not ready yet")]
    SceneNotReady,

    #[error("'{0}' has no loadable 3D model")]
    UnsupportedAsset(String),

    #[error("loading '{path}' timed out after {secs}s")]
    LoadTimeout { path: String, secs: f64 },

    #[error("failed to load '{path}': {reason}")]
    LoadFailure { path: String, reason: String },

    #[error("'{0}' failed to load earlier; clear the model cache to retry")]
    PreviouslyFailed(String),

    #[error("another bulk load is already in progress")]
    ConcurrentLoadConflict,

    #[error("invalid room dimensions: {0}")]
    InvalidDimensions(String),

    #[error("opening {id} does not fit: {reason}")]
    InvalidOpening { id: String, reason: String },

    #[error("no placed item with id {0}")]
    UnknownItem(String),

    #[error("no catalog item with id {0}")]
    UnknownCatalogItem(String),

    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(u64),

    #[error("could not decode configuration: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(#[from] roomdeck::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DesignError {
    pub fn load_failure(path: &str, reason: impl Into<String>) -> Self {
        DesignError::LoadFailure {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DesignError>;
