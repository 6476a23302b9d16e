//! Session context: typed access to provider configs and the active
//! selection, on top of an injected [`KeyValueStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::selection::ACTIVE_PROVIDER_KEY;
use shared::{ActiveSelection, ProviderConfig, ProviderKind};
use tracing::{debug, warn};

use crate::error::{DispatchError, StoreError};
use crate::store::KeyValueStore;

/// Key for the local backend's bearer token.
pub const API_TOKEN_KEY: &str = "local:apiToken";

/// Everything a send reads, captured once at the start of the send.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub selection: ActiveSelection,
    pub configs: BTreeMap<ProviderKind, ProviderConfig>,
}

impl Snapshot {
    pub fn config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.configs.get(&kind)
    }
}

#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn KeyValueStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Stored config for `kind`. Unparseable JSON reads as "no config".
    pub fn load_config(&self, kind: ProviderKind) -> Result<Option<ProviderConfig>, StoreError> {
        let Some(raw) = self.store.get(&kind.storage_key())? else {
            return Ok(None);
        };
        match serde_json::from_str::<Option<ProviderConfig>>(&raw) {
            Ok(cfg) => Ok(cfg),
            Err(e) => {
                warn!(provider = %kind, "ignoring unreadable provider config: {}", e);
                Ok(None)
            }
        }
    }

    /// Normalize `name` and replace its whole stored record.
    pub fn save_config(
        &self,
        name: &str,
        config: ProviderConfig,
    ) -> Result<ProviderKind, DispatchError> {
        let kind = ProviderKind::from_name(name)
            .ok_or_else(|| DispatchError::UnknownProvider(name.trim().to_string()))?;
        let config = config.normalized();
        let encoded = serde_json::to_string(&config).map_err(StoreError::from)?;
        self.store.set(&kind.storage_key(), &encoded)?;
        debug!(provider = %kind, "saved provider config");
        Ok(kind)
    }

    pub fn selection(&self) -> Result<ActiveSelection, StoreError> {
        let provider = self
            .store
            .get(ACTIVE_PROVIDER_KEY)?
            .and_then(|name| ProviderKind::from_name(&name));
        let mut selection = ActiveSelection {
            provider,
            ..Default::default()
        };
        for kind in ProviderKind::ALL {
            if let Some(model) = self.store.get(&kind.model_key())? {
                if !model.trim().is_empty() {
                    selection.models.insert(kind, model.trim().to_string());
                }
            }
        }
        Ok(selection)
    }

    /// Make `kind` the active provider.
    pub fn select_provider(&self, kind: ProviderKind) -> Result<(), StoreError> {
        self.store.set(ACTIVE_PROVIDER_KEY, kind.display_name())?;
        debug!(provider = %kind, "active provider changed");
        Ok(())
    }

    /// Remember `model` for `kind` and make `kind` active, as the model
    /// picker does.
    pub fn pick_model(&self, kind: ProviderKind, model: &str) -> Result<(), StoreError> {
        self.store.set(&kind.model_key(), model.trim())?;
        self.select_provider(kind)
    }

    pub fn clear_selection(&self) -> Result<(), StoreError> {
        self.store.remove(ACTIVE_PROVIDER_KEY)
    }

    pub fn api_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(API_TOKEN_KEY)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let selection = self.selection()?;
        let mut configs = BTreeMap::new();
        for kind in ProviderKind::ALL {
            if let Some(cfg) = self.load_config(kind)? {
                configs.insert(kind, cfg);
            }
        }
        Ok(Snapshot { selection, configs })
    }

    /// "Provider • model" line for the current selection. Falls back to
    /// Ollama and the configured default model like the composer badge.
    pub fn badge(&self) -> Result<String, StoreError> {
        let selection = self.selection()?;
        let kind = selection.provider.unwrap_or(ProviderKind::Ollama);
        let model = match selection.picked_model(kind) {
            Some(m) => Some(m.to_string()),
            None => self
                .load_config(kind)?
                .and_then(|c| c.default_model().map(str::to_string)),
        };
        Ok(match model {
            Some(m) => format!("{} • {}", kind, m),
            None => kind.to_string(),
        })
    }
}
