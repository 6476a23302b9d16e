use shared::settings::DispatcherSettings;
use shared::{ChatRequest, ProviderConfig, ProviderKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::catalog;
use crate::error::DispatchError;
use crate::payload::{self, NO_PROVIDER_MESSAGE};
use crate::probe::{self, ProbeReport};
use crate::reply::normalize_reply;
use crate::session::{SessionContext, Snapshot};
use crate::transport::{select_transport, ChatTransport, NativeBridge};

/// Where a send is in its life. Terminal phases return to `Idle`; there
/// is no retry phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Validating,
    Dispatching,
    Rejected,
    Succeeded,
    Failed,
}

/// Outcome of one send, ready for the conversation view.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatResult {
    Reply(String),
    Failed(DispatchError),
}

impl ChatResult {
    /// Text to display; never empty.
    pub fn text(&self) -> String {
        match self {
            ChatResult::Reply(text) if text.is_empty() => "No response".to_string(),
            ChatResult::Reply(text) => text.clone(),
            ChatResult::Failed(err) => err.to_string(),
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, ChatResult::Reply(_))
    }

    /// Terminal phase this result ended in.
    pub fn phase(&self) -> SendPhase {
        match self {
            ChatResult::Reply(_) => SendPhase::Succeeded,
            ChatResult::Failed(
                DispatchError::ConfigIncomplete(_)
                | DispatchError::EmptyPrompt
                | DispatchError::UnknownProvider(_),
            ) => SendPhase::Rejected,
            ChatResult::Failed(_) => SendPhase::Failed,
        }
    }
}

pub type FallbackPredicate = fn(ProviderKind, &ProviderConfig) -> bool;

/// One entry of the implicit fallback cascade.
#[derive(Clone, Copy)]
pub struct FallbackRule {
    pub kind: ProviderKind,
    pub predicate: FallbackPredicate,
}

impl FallbackRule {
    /// Usable when the required fields and a default model are set.
    pub fn configured(kind: ProviderKind) -> Self {
        Self {
            kind,
            predicate: |kind, cfg| cfg.is_complete_for(kind) && cfg.default_model().is_some(),
        }
    }
}

/// The provider/model a send resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub kind: ProviderKind,
    pub model: String,
    pub via_fallback: bool,
}

pub struct Dispatcher {
    session: SessionContext,
    settings: DispatcherSettings,
    backend: BackendClient,
    transport: Arc<dyn ChatTransport>,
    fallback: Vec<FallbackRule>,
}

impl Dispatcher {
    /// The bridge, when given, carries every chat; HTTP is used otherwise.
    pub fn new(
        session: SessionContext,
        settings: DispatcherSettings,
        bridge: Option<Arc<dyn NativeBridge>>,
    ) -> Self {
        let token = settings.api_token.clone().or_else(|| match session.api_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("could not read local api token: {}", e);
                None
            }
        });
        let backend = BackendClient::new(&settings.backend_url).with_token(token);
        let transport = select_transport(bridge, backend.clone(), settings.chat_timeout());
        let fallback = settings
            .fallback_order
            .iter()
            .copied()
            .map(FallbackRule::configured)
            .collect();
        Self {
            session,
            settings,
            backend,
            transport,
            fallback,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_fallback(mut self, rules: Vec<FallbackRule>) -> Self {
        self.fallback = rules;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Pick the provider/model for a send. An explicit selection is used
    /// as is, or rejected with what it lacks; the fallback cascade only
    /// applies when nothing is selected.
    pub fn select(&self, snapshot: &Snapshot) -> Result<Selected, DispatchError> {
        if let Some(kind) = snapshot.selection.provider {
            let cfg = snapshot.config(kind).cloned().unwrap_or_default();
            let missing = cfg.missing_fields(kind);
            if !missing.is_empty() {
                warn!(provider = %kind, "selected provider is missing settings");
                return Err(DispatchError::ConfigIncomplete(
                    payload::missing_fields_message(kind, &missing),
                ));
            }
            let model = snapshot
                .selection
                .picked_model(kind)
                .or_else(|| cfg.default_model())
                .ok_or_else(|| {
                    warn!(provider = %kind, "selected provider has no model");
                    DispatchError::ConfigIncomplete(payload::missing_model_message(kind))
                })?;
            return Ok(Selected {
                kind,
                model: model.to_string(),
                via_fallback: false,
            });
        }

        for rule in &self.fallback {
            let Some(cfg) = snapshot.config(rule.kind) else {
                continue;
            };
            if !(rule.predicate)(rule.kind, cfg) {
                continue;
            }
            if let Some(model) = cfg.default_model() {
                debug!(provider = %rule.kind, "using fallback provider");
                return Ok(Selected {
                    kind: rule.kind,
                    model: model.to_string(),
                    via_fallback: true,
                });
            }
        }

        Err(DispatchError::ConfigIncomplete(NO_PROVIDER_MESSAGE.to_string()))
    }

    /// Validate and build the request without sending it.
    pub fn prepare(&self, prompt: &str, snapshot: &Snapshot) -> Result<ChatRequest, DispatchError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DispatchError::EmptyPrompt);
        }
        let selected = self.select(snapshot)?;
        let cfg = snapshot.config(selected.kind).cloned().unwrap_or_default();
        payload::build_request(selected.kind, &selected.model, prompt, &cfg)
    }

    /// Send `prompt` to the resolved provider. Every outcome, including
    /// rejections and transport failures, comes back as a [`ChatResult`].
    pub async fn send(&self, prompt: &str) -> ChatResult {
        debug!(phase = ?SendPhase::Validating, "send started");
        let snapshot = match self.session.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(phase = ?SendPhase::Failed, "could not read settings: {}", e);
                return ChatResult::Failed(e.into());
            }
        };
        let request = match self.prepare(prompt, &snapshot) {
            Ok(request) => request,
            Err(e) => {
                info!(phase = ?SendPhase::Rejected, "send rejected: {}", e);
                return ChatResult::Failed(e);
            }
        };

        info!(
            phase = ?SendPhase::Dispatching,
            provider = %request.provider,
            model = %request.model,
            transport = self.transport.name(),
            "dispatching chat"
        );
        let result = match self.transport.send(&request.to_payload()).await {
            Ok(body) => ChatResult::Reply(normalize_reply(&body)),
            Err(e) => {
                warn!(provider = %request.provider, "chat send failed: {}", e.reason());
                ChatResult::Failed(e)
            }
        };
        debug!(phase = ?result.phase(), "send finished");
        result
    }

    /// Test the saved configuration of `kind`. On success the provider
    /// becomes the active selection; a failed test changes nothing.
    pub async fn test_connection(&self, kind: ProviderKind) -> ProbeReport {
        match self.session.load_config(kind) {
            Ok(cfg) => self.test_config(kind, &cfg.unwrap_or_default()).await,
            Err(e) => ProbeReport::failed(kind, e.to_string()),
        }
    }

    /// Test an unsaved configuration, as typed into the panel.
    pub async fn test_config(&self, kind: ProviderKind, config: &ProviderConfig) -> ProbeReport {
        let report = probe::probe(&self.backend, kind, config, self.settings.probe_timeout()).await;
        if report.ok {
            if let Err(e) = self.session.select_provider(kind) {
                warn!(provider = %kind, "could not promote tested provider: {}", e);
            }
        }
        report
    }

    pub async fn list_models(&self, kind: ProviderKind) -> Result<Vec<String>, DispatchError> {
        let cfg = self.session.load_config(kind)?.unwrap_or_default();
        catalog::list_models(&self.backend, kind, &cfg, self.settings.probe_timeout()).await
    }

    pub async fn health(&self) -> bool {
        self.backend.health(self.settings.health_timeout()).await
    }
}
