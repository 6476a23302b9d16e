//! The provider/model pair the user has chosen for new sends.

use std::collections::BTreeMap;

use crate::provider::ProviderKind;

/// Key holding the active provider's display name.
pub const ACTIVE_PROVIDER_KEY: &str = "chat:provider";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveSelection {
    /// Explicitly chosen provider, if any
    pub provider: Option<ProviderKind>,
    /// Last-picked model per provider
    pub models: BTreeMap<ProviderKind, String>,
}

impl ActiveSelection {
    pub fn with_provider(mut self, kind: ProviderKind) -> Self {
        self.provider = Some(kind);
        self
    }

    pub fn with_model(mut self, kind: ProviderKind, model: impl Into<String>) -> Self {
        self.models.insert(kind, model.into());
        self
    }

    /// Last-picked model for `kind`, ignoring blanks.
    pub fn picked_model(&self, kind: ProviderKind) -> Option<&str> {
        self.models
            .get(&kind)
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
    }
}
