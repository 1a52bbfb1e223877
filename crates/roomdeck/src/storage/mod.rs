mod file_storage;
mod kv_store;

pub use file_storage::{DataPath, DataPathType, Directory, delete_file, write_file};
pub use kv_store::{FileKvStore, KeyValueStore, MemoryKvStore};
