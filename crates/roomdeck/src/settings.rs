use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::storage::{DataPath, DataPathType, Directory, write_file};

const SETTINGS_FILE: &str = "designer.json";

const DEFAULT_LOAD_TIMEOUT_SECS: f64 = 45.0;
const DEFAULT_FLOOR_THICKNESS: f32 = 0.1;
const DEFAULT_FLOOR_EPSILON: f32 = 0.001;
const DEFAULT_ROTATION_STEP_DEGREES: f32 = 45.0;
const DEFAULT_BULK_ITEM_DELAY_SECS: f64 = 0.15;

fn default_load_timeout_secs() -> f64 {
    DEFAULT_LOAD_TIMEOUT_SECS
}

fn default_floor_thickness() -> f32 {
    DEFAULT_FLOOR_THICKNESS
}

fn default_floor_epsilon() -> f32 {
    DEFAULT_FLOOR_EPSILON
}

fn default_rotation_step_degrees() -> f32 {
    DEFAULT_ROTATION_STEP_DEGREES
}

fn default_bulk_item_delay_secs() -> f64 {
    DEFAULT_BULK_ITEM_DELAY_SECS
}

/// Tunables for the design engine.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct EngineSettings {
    /// Seconds before an in-flight model load is abandoned.
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: f64,
    #[serde(default = "default_floor_thickness")]
    pub floor_thickness: f32,
    /// Clearance between a placed item and the floor surface.
    #[serde(default = "default_floor_epsilon")]
    pub floor_epsilon: f32,
    #[serde(default = "default_rotation_step_degrees")]
    pub rotation_step_degrees: f32,
    #[serde(default = "default_bulk_item_delay_secs")]
    pub bulk_item_delay_secs: f64,
    /// Create/update room endpoint for the remote mirror.
    #[serde(default)]
    pub remote_endpoint: Option<String>,
    /// Overrides the on-disk model cache location.
    #[serde(default)]
    pub model_cache_dir: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            load_timeout_secs: default_load_timeout_secs(),
            floor_thickness: default_floor_thickness(),
            floor_epsilon: default_floor_epsilon(),
            rotation_step_degrees: default_rotation_step_degrees(),
            bulk_item_delay_secs: default_bulk_item_delay_secs(),
            remote_endpoint: None,
            model_cache_dir: None,
        }
    }
}

pub struct SettingsHandler {
    directory: Directory,
    current_settings: Option<EngineSettings>,
}

impl SettingsHandler {
    pub fn new(path: &DataPath) -> Self {
        let directory = Directory::new(path.path(DataPathType::Setting));

        Self {
            directory,
            current_settings: None,
        }
    }

    pub fn load(mut self) -> Self {
        match self.directory.get_file(SETTINGS_FILE) {
            Ok(contents_str) => match serde_json::from_str::<EngineSettings>(&contents_str) {
                Ok(settings) => {
                    info!("loaded engine settings");
                    self.current_settings = Some(settings);
                }
                Err(err) => {
                    error!("Invalid settings format ({err}). Using defaults");
                    self.current_settings = Some(EngineSettings::default());
                }
            },
            Err(_) => {
                info!("no settings file, using defaults");
                self.current_settings = Some(EngineSettings::default());
            }
        }

        self
    }

    pub fn settings(&self) -> EngineSettings {
        self.current_settings.clone().unwrap_or_default()
    }

    pub fn get_settings_mut(&mut self) -> &mut EngineSettings {
        self.current_settings.get_or_insert_with(EngineSettings::default)
    }

    /// Returns whether the settings were written.
    pub fn try_save_settings(&mut self) -> bool {
        let settings = self.get_settings_mut().clone();
        let serialized = match serde_json::to_string_pretty(&settings) {
            Ok(s) => s,
            Err(err) => {
                error!("could not serialize settings: {err}");
                return false;
            }
        };

        match write_file(&self.directory.file_path, SETTINGS_FILE, &serialized) {
            Ok(()) => {
                info!("wrote engine settings");
                true
            }
            Err(err) => {
                error!("could not write settings: {err}");
                false
            }
        }
    }

    pub fn update_batch<F>(&mut self, update_fn: F)
    where
        F: FnOnce(&mut EngineSettings),
    {
        let settings = self.get_settings_mut();
        update_fn(settings);
        self.try_save_settings();
    }

    pub fn set_remote_endpoint(&mut self, endpoint: Option<String>) {
        self.get_settings_mut().remote_endpoint = endpoint;
        self.try_save_settings();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let handler = SettingsHandler::new(&DataPath::new(tmp.path())).load();
        assert_eq!(handler.settings(), EngineSettings::default());
        assert_eq!(handler.settings().load_timeout_secs, 45.0);
        assert_eq!(handler.settings().rotation_step_degrees, 45.0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = DataPath::new(tmp.path());
        write_file(
            &path.path(DataPathType::Setting),
            SETTINGS_FILE,
            r#"{ "floor_thickness": 0.2 }"#,
        )
        .unwrap();

        let settings = SettingsHandler::new(&path).load().settings();
        assert_eq!(settings.floor_thickness, 0.2);
        assert_eq!(settings.floor_epsilon, DEFAULT_FLOOR_EPSILON);
        assert_eq!(settings.remote_endpoint, None);
    }

    #[test]
    fn saved_settings_reload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = DataPath::new(tmp.path());

        let mut handler = SettingsHandler::new(&path).load();
        handler.update_batch(|s| {
            s.bulk_item_delay_secs = 0.5;
            s.remote_endpoint = Some("https://example.com/rooms".to_string());
        });

        let reloaded = SettingsHandler::new(&path).load().settings();
        assert_eq!(reloaded.bulk_item_delay_secs, 0.5);
        assert_eq!(
            reloaded.remote_endpoint.as_deref(),
            Some("https://example.com/rooms")
        );
    }

    #[test]
    fn corrupt_file_falls_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = DataPath::new(tmp.path());
        write_file(&path.path(DataPathType::Setting), SETTINGS_FILE, "{ nope").unwrap();

        assert_eq!(
            SettingsHandler::new(&path).load().settings(),
            EngineSettings::default()
        );
    }
}
