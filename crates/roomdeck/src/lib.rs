mod error;
mod settings;
pub mod storage;

pub use error::Error;
pub use settings::{EngineSettings, SettingsHandler};
pub use storage::{DataPath, DataPathType, Directory, FileKvStore, KeyValueStore, MemoryKvStore};

pub type Result<T> = std::result::Result<T, Error>;
