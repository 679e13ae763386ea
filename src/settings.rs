use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::CompositorOpts;
use crate::foundation::error::{WatermarkError, WmResult};
use crate::store::backend::{DEFAULT_STORAGE_KEY, JsonFileBackend};
use crate::store::config_store::WatermarkConfigStore;

/// File-backed settings for embedding applications and the `zopmark` binary.
///
/// Every field is optional in the JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the persisted watermark configs.
    pub store_dir: PathBuf,
    /// Storage key of the config list inside `store_dir`.
    pub storage_key: String,
    /// Compositor options.
    pub compositor: CompositorOpts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".zopmark"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            compositor: CompositorOpts::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> WmResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            WatermarkError::validation(format!("open settings JSON '{}': {e}", path.display()))
        })?;
        let settings: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            WatermarkError::validation(format!("parse settings JSON '{}': {e}", path.display()))
        })?;
        settings.compositor.validate()?;
        Ok(settings)
    }

    /// Open the JSON-file store these settings point at.
    pub fn open_store(&self) -> WmResult<WatermarkConfigStore<JsonFileBackend>> {
        let backend = JsonFileBackend::new(&self.store_dir, self.storage_key.as_str())?;
        Ok(WatermarkConfigStore::open(backend))
    }
}
