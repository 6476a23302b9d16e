//! Model listing through the backend's provider proxies.

use serde_json::Value;
use shared::{ProviderConfig, ProviderKind};
use std::time::Duration;

use crate::backend::BackendClient;
use crate::error::DispatchError;

fn strip_models_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

fn string_list(body: &Value) -> Vec<String> {
    body.get("models")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Ollama's tag listing: `{models: [{name}|{tag}]}`.
fn ollama_names(body: &Value) -> Vec<String> {
    body.get("models")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|m| {
                    m.get("name")
                        .or_else(|| m.get("tag"))
                        .and_then(Value::as_str)
                })
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Models the provider offers. Kinds without a listing proxy return an
/// empty list.
pub async fn list_models(
    backend: &BackendClient,
    kind: ProviderKind,
    config: &ProviderConfig,
    timeout: Duration,
) -> Result<Vec<String>, DispatchError> {
    match kind {
        ProviderKind::Ollama => {
            let base = config.base().ok_or_else(|| {
                DispatchError::ConfigIncomplete("Missing Ollama Base URL".into())
            })?;
            let body = backend
                .get_json("/api/ollama/tags", &[("base", base)], timeout)
                .await?;
            Ok(ollama_names(&body))
        }
        ProviderKind::GoogleAi => {
            let key = config.api_key.as_deref().ok_or_else(|| {
                DispatchError::ConfigIncomplete("Missing Google AI API Key".into())
            })?;
            let body = backend
                .get_json("/api/googleai/models", &[("apiKey", key)], timeout)
                .await?;
            Ok(string_list(&body)
                .iter()
                .map(|m| strip_models_prefix(m).to_string())
                .collect())
        }
        ProviderKind::OpenRouter => {
            let key = config.api_key.as_deref().ok_or_else(|| {
                DispatchError::ConfigIncomplete("Missing OpenRouter API Key".into())
            })?;
            let body = backend
                .get_json("/api/openrouter/models", &[("apiKey", key)], timeout)
                .await?;
            Ok(string_list(&body))
        }
        _ => Ok(Vec::new()),
    }
}
