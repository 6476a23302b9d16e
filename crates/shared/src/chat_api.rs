//! Request shape sent to the unified chat endpoint.

use serde_json::{json, Map, Number, Value};

use crate::provider::{ProviderConfig, ProviderKind};

/// How the backend reaches the upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderAccess {
    Local {
        base: String,
    },
    ApiKey {
        api_key: String,
    },
    Deployment {
        endpoint: String,
        api_key: String,
        api_version: String,
    },
}

/// Optional generation parameters. Only finite values are ever sent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tuning {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

impl Tuning {
    pub fn from_config(cfg: &ProviderConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            top_p: cfg.top_p,
        }
    }

    fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(n) = self.temperature.and_then(Number::from_f64) {
            map.insert("temperature".into(), Value::Number(n));
        }
        if let Some(n) = self.max_tokens {
            map.insert("maxTokens".into(), Value::Number(n.into()));
        }
        if let Some(n) = self.top_p.and_then(Number::from_f64) {
            map.insert("topP".into(), Value::Number(n));
        }
    }
}

/// One send, built fresh from the stored config and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub prompt: String,
    pub access: ProviderAccess,
    pub tuning: Tuning,
}

impl ChatRequest {
    /// JSON body for `POST /api/chat` (and the native bridge).
    pub fn to_payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("provider".into(), json!(self.provider.wire_id()));
        map.insert("model".into(), json!(self.model));
        map.insert("prompt".into(), json!(self.prompt));
        match &self.access {
            ProviderAccess::Local { base } => {
                map.insert("base".into(), json!(base));
            }
            ProviderAccess::ApiKey { api_key } => {
                map.insert("apiKey".into(), json!(api_key));
            }
            ProviderAccess::Deployment {
                endpoint,
                api_key,
                api_version,
            } => {
                map.insert(
                    "azure".into(),
                    json!({
                        "endpoint": endpoint,
                        "apiKey": api_key,
                        "apiVersion": api_version,
                    }),
                );
            }
        }
        self.tuning.write_into(&mut map);
        Value::Object(map)
    }
}
