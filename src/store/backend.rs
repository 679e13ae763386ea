use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use crate::foundation::error::{WatermarkError, WmResult};
use crate::model::watermark::WatermarkConfig;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "watermarks";

/// Storage capability behind [`crate::WatermarkConfigStore`].
///
/// Implementations own the medium (disk, embedded database, remote store). Each `save*` call
/// must replace the previous value atomically: a concurrent `load*` sees either the old or the
/// new value, never a mix.
pub trait ConfigBackend: Send + Sync {
    /// Load the persisted config sequence, in list order.
    fn load(&self) -> WmResult<Vec<WatermarkConfig>>;
    /// Replace the persisted config sequence.
    fn save(&self, configs: &[WatermarkConfig]) -> WmResult<()>;
    /// Load the persisted active id.
    fn load_active(&self) -> WmResult<Option<String>>;
    /// Replace the persisted active id.
    fn save_active(&self, active: Option<&str>) -> WmResult<()>;
}

/// JSON files in a directory, one per storage key.
///
/// `<dir>/<key>.json` holds the config array and nothing else; the active id lives in
/// `<dir>/<key>.active.json`.
#[derive(Clone, Debug)]
pub struct JsonFileBackend {
    dir: PathBuf,
    storage_key: String,
}

impl JsonFileBackend {
    /// Create a backend rooted at `dir` for `storage_key`.
    pub fn new(dir: impl Into<PathBuf>, storage_key: impl Into<String>) -> WmResult<Self> {
        let storage_key = storage_key.into();
        if storage_key.is_empty()
            || storage_key.contains(['/', '\\'])
            || storage_key.starts_with('.')
        {
            return Err(WatermarkError::validation(format!(
                "invalid storage key '{storage_key}'"
            )));
        }
        Ok(Self {
            dir: dir.into(),
            storage_key,
        })
    }

    /// Path of the config array file.
    pub fn configs_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.storage_key))
    }

    /// Path of the active id file.
    pub fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.active.json", self.storage_key))
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> WmResult<T> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(WatermarkError::persistence(format!(
                    "read '{}': {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            WatermarkError::persistence(format!("malformed data in '{}': {e}", path.display()))
        })
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, path: &Path, value: &T) -> WmResult<()> {
        write_atomic(&self.dir, path, value)
            .map_err(|e| WatermarkError::persistence(format!("{e:#}")))
    }
}

fn write_atomic<T: serde::Serialize + ?Sized>(
    dir: &Path,
    path: &Path,
    value: &T,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create store directory '{}'", dir.display()))?;
    let json = serde_json::to_vec_pretty(value).context("serialize store data")?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in '{}'", dir.display()))?;
    tmp.write_all(&json).context("write temp store file")?;
    tmp.as_file().sync_all().context("sync temp store file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace '{}'", path.display()))?;
    Ok(())
}

impl ConfigBackend for JsonFileBackend {
    fn load(&self) -> WmResult<Vec<WatermarkConfig>> {
        Self::read_json(&self.configs_path())
    }

    fn save(&self, configs: &[WatermarkConfig]) -> WmResult<()> {
        self.write_json(&self.configs_path(), configs)
    }

    fn load_active(&self) -> WmResult<Option<String>> {
        Self::read_json(&self.active_path())
    }

    fn save_active(&self, active: Option<&str>) -> WmResult<()> {
        self.write_json(&self.active_path(), &active)
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    configs: Vec<WatermarkConfig>,
    active: Option<String>,
}

/// Process-local backend. Clones share the same storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut InMemoryState) -> R) -> WmResult<R> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| WatermarkError::persistence("in-memory store lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

impl ConfigBackend for InMemoryBackend {
    fn load(&self) -> WmResult<Vec<WatermarkConfig>> {
        self.with_state(|s| s.configs.clone())
    }

    fn save(&self, configs: &[WatermarkConfig]) -> WmResult<()> {
        self.with_state(|s| s.configs = configs.to_vec())
    }

    fn load_active(&self) -> WmResult<Option<String>> {
        self.with_state(|s| s.active.clone())
    }

    fn save_active(&self, active: Option<&str>) -> WmResult<()> {
        self.with_state(|s| s.active = active.map(str::to_owned))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/backend.rs"]
mod tests;
