//! Connection tests: one cheap request per provider kind to check stored
//! credentials before they are used for chat.

use serde::Serialize;
use serde_json::{json, Value};
use shared::provider::AZURE_DEFAULT_API_VERSION;
use shared::{CredentialShape, ProviderConfig, ProviderKind};
use std::time::Duration;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub provider: ProviderKind,
    pub ok: bool,
    /// "OK • 3 models" on success, the failure reason otherwise
    pub message: String,
    /// Per-step notes (Ollama only): "version: HTTP 404", "tags: OK"
    pub diagnostics: Vec<String>,
}

impl ProbeReport {
    fn passed(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            ok: true,
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn failed(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self {
            provider,
            ok: false,
            message: reason.into(),
            diagnostics: Vec::new(),
        }
    }

    fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Line shown under the configuration card.
    pub fn summary(&self) -> String {
        if self.ok {
            self.message.clone()
        } else {
            format!("Failed • {}", self.message)
        }
    }
}

fn model_count(body: &Value) -> usize {
    ["models", "tags"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_array))
        .map(Vec::len)
        .unwrap_or(0)
}

fn probe_model(kind: ProviderKind, config: &ProviderConfig) -> String {
    let model = config
        .default_model()
        .or(kind.spec().probe_model)
        .unwrap_or_default();
    model.strip_prefix("models/").unwrap_or(model).to_string()
}

/// Run the connection test for `kind` with `config`. Never errors: every
/// outcome is a report.
pub async fn probe(
    backend: &BackendClient,
    kind: ProviderKind,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let report = match kind {
        ProviderKind::Ollama => probe_ollama(backend, config, timeout).await,
        ProviderKind::GoogleAi => probe_google(backend, config, timeout).await,
        ProviderKind::OpenRouter => probe_openrouter(backend, config, timeout).await,
        _ => match kind.spec().credential {
            CredentialShape::Deployment => probe_deployment(backend, kind, config, timeout).await,
            _ => probe_chat(backend, kind, config, timeout).await,
        },
    };
    debug!(provider = %kind, ok = report.ok, "connection test finished");
    report
}

async fn probe_ollama(
    backend: &BackendClient,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let kind = ProviderKind::Ollama;
    let Some(base) = config.base() else {
        return ProbeReport::failed(kind, "Base URL required");
    };
    let query = [("base", base)];
    let mut diag = Vec::new();

    let version_err = match backend.get_json("/api/ollama/version", &query, timeout).await {
        Ok(body) => {
            diag.push("version: OK".to_string());
            let version = body.get("version").and_then(Value::as_str).unwrap_or("Ollama");
            return ProbeReport::passed(kind, format!("OK • {}", version)).with_diagnostics(diag);
        }
        Err(e) => e,
    };
    diag.push(format!("version: {}", version_err.reason()));

    // The tag listing also proves connectivity on builds without /api/version.
    match backend.get_json("/api/ollama/tags", &query, timeout).await {
        Ok(body) => {
            diag.push("tags: OK".to_string());
            ProbeReport::passed(kind, format!("OK • {} models", model_count(&body)))
                .with_diagnostics(diag)
        }
        Err(DispatchError::Upstream { status }) => {
            diag.push(format!("tags: HTTP {}", status));
            ProbeReport::failed(kind, version_err.reason()).with_diagnostics(diag)
        }
        Err(_) => {
            diag.push("tags: error".to_string());
            ProbeReport::failed(kind, version_err.reason()).with_diagnostics(diag)
        }
    }
}

async fn probe_google(
    backend: &BackendClient,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let kind = ProviderKind::GoogleAi;
    let Some(api_key) = config.api_key.as_deref() else {
        return ProbeReport::failed(kind, "API Key required");
    };
    let body = json!({
        "apiKey": api_key,
        "model": probe_model(kind, config),
        "prompt": "ping",
    });
    match backend.post_json("/api/googleai/generate", &body, timeout).await {
        Ok(_) => ProbeReport::passed(kind, "OK • generateContent"),
        Err(e) => ProbeReport::failed(kind, e.reason()),
    }
}

async fn probe_openrouter(
    backend: &BackendClient,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let kind = ProviderKind::OpenRouter;
    let Some(api_key) = config.api_key.as_deref() else {
        return ProbeReport::failed(kind, "API Key required");
    };
    match backend
        .get_json("/api/openrouter/models", &[("apiKey", api_key)], timeout)
        .await
    {
        Ok(body) => ProbeReport::passed(kind, format!("OK • {} models", model_count(&body))),
        Err(e) => ProbeReport::failed(kind, e.reason()),
    }
}

async fn probe_chat(
    backend: &BackendClient,
    kind: ProviderKind,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let Some(api_key) = config.api_key.as_deref() else {
        return ProbeReport::failed(kind, "API Key required");
    };
    let body = json!({
        "provider": kind.wire_id(),
        "apiKey": api_key,
        "model": probe_model(kind, config),
        "prompt": "ping",
    });
    match backend.post_json("/api/chat", &body, timeout).await {
        Ok(_) => ProbeReport::passed(kind, "OK • chat"),
        Err(e) => ProbeReport::failed(kind, e.reason()),
    }
}

async fn probe_deployment(
    backend: &BackendClient,
    kind: ProviderKind,
    config: &ProviderConfig,
    timeout: Duration,
) -> ProbeReport {
    let (Some(endpoint), Some(api_key), Some(deployment)) =
        (config.base(), config.api_key.as_deref(), config.default_model())
    else {
        return ProbeReport::failed(kind, "Endpoint, API Key, and Deployment required");
    };
    let api_version = config
        .api_version
        .as_deref()
        .unwrap_or(AZURE_DEFAULT_API_VERSION);
    let body = json!({
        "provider": kind.wire_id(),
        "model": deployment,
        "prompt": "ping",
        "azure": {
            "endpoint": endpoint,
            "apiKey": api_key,
            "apiVersion": api_version,
        },
    });
    match backend.post_json("/api/chat", &body, timeout).await {
        Ok(_) => ProbeReport::passed(kind, "OK • chat"),
        Err(e) => ProbeReport::failed(kind, e.reason()),
    }
}
