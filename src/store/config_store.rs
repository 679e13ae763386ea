use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::error::{WatermarkError, WmResult};
use crate::model::watermark::WatermarkConfig;
use crate::store::backend::ConfigBackend;

/// Outcome of persisting a store mutation.
///
/// The in-memory effect of a mutation is applied regardless of this value.
#[derive(Debug)]
#[must_use]
pub enum PersistStatus {
    /// The backend accepted the new state.
    Persisted,
    /// The backend failed; the in-memory state remains authoritative for this session.
    Failed(WatermarkError),
}

impl PersistStatus {
    /// Return `true` for [`PersistStatus::Persisted`].
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

#[derive(Clone, Debug, Default)]
struct StoreState {
    configs: Vec<WatermarkConfig>,
    active: Option<String>,
}

impl StoreState {
    fn position(&self, id: &str) -> Option<usize> {
        self.configs.iter().position(|c| c.id == id)
    }
}

/// Named watermark configs plus the single active selection.
///
/// Every mutation is applied in memory first and then written through to the backend. Readers
/// take a shared lock and always observe a complete state.
pub struct WatermarkConfigStore<B: ConfigBackend> {
    backend: B,
    state: RwLock<StoreState>,
}

impl<B: ConfigBackend> WatermarkConfigStore<B> {
    /// Load the store from `backend`.
    ///
    /// Unreadable or malformed persisted data is logged and treated as an empty store.
    #[tracing::instrument(skip_all)]
    pub fn open(backend: B) -> Self {
        let loaded = backend.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding persisted watermark configs");
            Vec::new()
        });

        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(loaded.len());
        for cfg in loaded {
            if let Err(e) = cfg.validate() {
                tracing::warn!(error = %e, "dropping invalid persisted watermark config");
                continue;
            }
            if !seen.insert(cfg.id.clone()) {
                tracing::warn!(id = %cfg.id, "dropping duplicate persisted watermark config");
                continue;
            }
            configs.push(cfg);
        }

        let mut state = StoreState {
            configs,
            active: None,
        };
        match backend.load_active() {
            Ok(Some(id)) if state.position(&id).is_some() => state.active = Some(id),
            Ok(Some(id)) => {
                let e = WatermarkError::config_not_found(&id);
                tracing::debug!(error = %e, "resetting active watermark");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "discarding persisted active watermark"),
        }

        tracing::debug!(
            configs = state.configs.len(),
            active = ?state.active,
            "watermark store loaded"
        );
        Self {
            backend,
            state: RwLock::new(state),
        }
    }

    /// Borrow the storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Insert `config`, or replace the entry with the same id in place, and make it active.
    pub fn save(&self, config: WatermarkConfig) -> WmResult<PersistStatus> {
        config.validate()?;

        let mut state = self.write();
        let id = config.id.clone();
        match state.position(&id) {
            Some(i) => state.configs[i] = config,
            None => state.configs.push(config),
        }
        state.active = Some(id);
        tracing::info!(id = ?state.active, "watermark saved");
        Ok(self.persist(&state, true))
    }

    /// Remove the config with `id`. Deleting the active config resets the selection to none.
    pub fn delete(&self, id: &str) -> WmResult<PersistStatus> {
        let mut state = self.write();
        let i = state
            .position(id)
            .ok_or_else(|| WatermarkError::config_not_found(id))?;
        state.configs.remove(i);

        let was_active = state.active.as_deref() == Some(id);
        if was_active {
            state.active = None;
        }
        tracing::info!(id, was_active, "watermark deleted");
        Ok(self.persist(&state, was_active))
    }

    /// Set the active config, or clear it with `None`.
    pub fn select(&self, id: Option<&str>) -> WmResult<PersistStatus> {
        let mut state = self.write();
        if let Some(id) = id
            && state.position(id).is_none()
        {
            return Err(WatermarkError::config_not_found(id));
        }
        state.active = id.map(str::to_owned);
        tracing::info!(active = ?state.active, "watermark selected");
        let status = match self.backend.save_active(state.active.as_deref()) {
            Ok(()) => PersistStatus::Persisted,
            Err(e) => Self::report(e),
        };
        Ok(status)
    }

    /// All configs in creation/save order.
    pub fn list(&self) -> Vec<WatermarkConfig> {
        self.read().configs.clone()
    }

    /// Look up a config by id.
    pub fn get(&self, id: &str) -> Option<WatermarkConfig> {
        let state = self.read();
        state.position(id).map(|i| state.configs[i].clone())
    }

    /// The active id, if any.
    pub fn active_id(&self) -> Option<String> {
        self.read().active.clone()
    }

    /// Resolve the active selection, or `None` for "no watermark".
    pub fn get_active(&self) -> Option<WatermarkConfig> {
        let state = self.read();
        let id = state.active.as_deref()?;
        match state.position(id) {
            Some(i) => Some(state.configs[i].clone()),
            None => {
                let e = WatermarkError::config_not_found(id);
                tracing::debug!(error = %e, "no active watermark");
                None
            }
        }
    }

    fn persist(&self, state: &StoreState, include_active: bool) -> PersistStatus {
        let mut result = self.backend.save(&state.configs);
        if include_active {
            let active = self.backend.save_active(state.active.as_deref());
            result = result.and(active);
        }
        match result {
            Ok(()) => PersistStatus::Persisted,
            Err(e) => Self::report(e),
        }
    }

    fn report(e: WatermarkError) -> PersistStatus {
        tracing::warn!(error = %e, "watermark store not persisted; keeping in-memory state");
        PersistStatus::Failed(e)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/config_store.rs"]
mod tests;
