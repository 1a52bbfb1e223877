use std::collections::HashMap;

use tracing::debug;

use super::file_storage::{Directory, delete_file, write_file};
use crate::Result;

/// Small string key-value store used for locally persisted state.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed.
    fn remove(&mut self, key: &str) -> Result<bool>;
}

/// One file per key under a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileKvStore {
    directory: Directory,
}

impl FileKvStore {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }

    fn file_name(key: &str) -> String {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{safe}.json")
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.directory.get_file(&Self::file_name(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        debug!("kv set '{key}' ({} bytes)", value.len());
        write_file(&self.directory.file_path, &Self::file_name(key), value)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        match delete_file(&self.directory.file_path, &Self::file_name(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
