use chrono::{DateTime, Utc};
use roomdeck::KeyValueStore;
use serde_json::Value;
use tracing::{info, warn};

use crate::codec::{CONFIG_VERSION, RoomConfiguration, parse_configuration};
use crate::error::Result;

const CONFIGURATIONS_KEY: &str = "room_configurations";

/// Saved room configurations, kept as one JSON list under a single key.
///
/// Entries this build cannot read (newer schema versions) are skipped on
/// lookup but preserved when the list is rewritten.
pub struct ConfigStore {
    store: Box<dyn KeyValueStore>,
}

impl ConfigStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load_raw(&self) -> Result<Vec<Value>> {
        match self.store.get(CONFIGURATIONS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_raw(&mut self, entries: &[Value]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store.set(CONFIGURATIONS_KEY, &json)?;
        Ok(())
    }

    fn entry_id(entry: &Value) -> Option<&str> {
        entry.get("id").and_then(Value::as_str)
    }

    /// Owning project of a stored entry, whatever its schema version.
    fn entry_project(entry: &Value) -> Option<String> {
        if let Ok(config) = parse_configuration(entry.clone()) {
            return config.project_id;
        }
        ["project_id", "projectId"]
            .into_iter()
            .find_map(|key| entry.get(key).and_then(Value::as_str))
            .map(str::to_owned)
    }

    /// Every readable configuration.
    pub fn list(&self) -> Result<Vec<RoomConfiguration>> {
        let mut out = Vec::new();
        for entry in self.load_raw()? {
            let id = Self::entry_id(&entry).unwrap_or("?").to_owned();
            match parse_configuration(entry) {
                Ok(config) => out.push(config),
                Err(err) => warn!("skipping stored configuration {id}: {err}"),
            }
        }
        Ok(out)
    }

    pub fn get(&self, id: &str) -> Result<Option<RoomConfiguration>> {
        Ok(self.list()?.into_iter().find(|c| c.id == id))
    }

    /// The configuration linked to a project, if any.
    pub fn find_by_project(&self, project_id: &str) -> Result<Option<RoomConfiguration>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|c| c.project_id.as_deref() == Some(project_id)))
    }

    /// Insert or update by id, stamping `updated_at` and the schema
    /// version. A project keeps at most one configuration: saving a new
    /// one for the same project replaces the old.
    pub fn persist(
        &mut self,
        mut config: RoomConfiguration,
        now: DateTime<Utc>,
    ) -> Result<RoomConfiguration> {
        config.updated_at = now;
        config.version = CONFIG_VERSION;

        let mut entries = self.load_raw()?;
        entries.retain(|entry| {
            let same_id = Self::entry_id(entry) == Some(config.id.as_str());
            let same_project = config.project_id.is_some()
                && Self::entry_project(entry).as_deref() == config.project_id.as_deref();
            !(same_id || same_project)
        });
        entries.push(serde_json::to_value(&config)?);
        self.save_raw(&entries)?;

        info!(
            "saved configuration {} ({} items)",
            config.id,
            config.placed_furniture.len()
        );
        Ok(config)
    }

    /// Returns whether anything was deleted.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let mut entries = self.load_raw()?;
        let before = entries.len();
        entries.retain(|entry| Self::entry_id(entry) != Some(id));
        if entries.len() == before {
            return Ok(false);
        }
        self.save_raw(&entries)?;
        info!("deleted configuration {id}");
        Ok(true)
    }
}
