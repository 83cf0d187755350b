use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::settings::error::Result;
use crate::settings::types::PipelineSettings;

/// Environment variable naming the settings file used by the binary.
pub const SETTINGS_ENV: &str = "EDGE_PREVIEW_SETTINGS";

/// Persistent pipeline settings backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<PipelineSettings>,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// Unreadable or invalid files are logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let data = match Self::load(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), "falling back to default settings: {e}");
                PipelineSettings::default()
            }
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Settings path from [`SETTINGS_ENV`], if set.
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::var_os(SETTINGS_ENV).map(PathBuf::from)
    }

    /// Load settings from a JSON file, returning defaults on a missing file.
    pub fn load(path: &Path) -> Result<PipelineSettings> {
        if !path.exists() {
            return Ok(PipelineSettings::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings: PipelineSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        data.validate()?;
        let json = serde_json::to_string_pretty(&data)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current settings.
    pub fn get(&self) -> PipelineSettings {
        self.data.lock().clone()
    }

    /// Apply `f` to the settings. The change is kept only if the result
    /// validates; it is not written to disk until [`save`](Self::save).
    pub fn update(&self, f: impl FnOnce(&mut PipelineSettings)) -> Result<()> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        f(&mut next);
        next.validate()?;
        *data = next;
        Ok(())
    }
}
