//! Provider kinds and their persisted configuration.
//!
//! Provider names typed by users ("LM Studio", "google gemini", ...) are
//! normalized once into a closed [`ProviderKind`]. Everything the dispatcher
//! needs to know about a kind (required fields, credential shape, wire id)
//! is carried as data in [`KindSpec`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Supported chat providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// Local engine (Ollama, LM Studio) reached through a base URL
    Ollama,
    GoogleAi,
    OpenRouter,
    OpenAi,
    Anthropic,
    Mistral,
    Groq,
    Cohere,
    /// Hosted deployment that needs endpoint + key + api version
    AzureOpenAi,
}

/// How a kind authenticates against its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialShape {
    /// `{base}` only, no credential
    BaseUrl,
    /// `{apiKey}`
    ApiKey,
    /// nested `{azure: {endpoint, apiKey, apiVersion}}`
    Deployment,
}

/// A configuration field that must be populated before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    BaseUrl,
    ApiKey,
    ApiVersion,
}

/// Static description of one provider kind.
#[derive(Debug)]
pub struct KindSpec {
    pub display_name: &'static str,
    /// Provider id understood by the backend's `/api/chat`
    pub wire_id: &'static str,
    pub credential: CredentialShape,
    pub required: &'static [RequiredField],
    /// Used in "Please choose ... from the model selector."
    pub model_noun: &'static str,
    /// Model used by the connection test when none is configured
    pub probe_model: Option<&'static str>,
}

const KEY_ONLY: &[RequiredField] = &[RequiredField::ApiKey];

static OLLAMA: KindSpec = KindSpec {
    display_name: "Ollama",
    wire_id: "ollama",
    credential: CredentialShape::BaseUrl,
    required: &[RequiredField::BaseUrl],
    model_noun: "an Ollama model",
    probe_model: None,
};
static GOOGLE_AI: KindSpec = KindSpec {
    display_name: "Google AI",
    wire_id: "googleai",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "a Gemini model",
    probe_model: Some("gemini-1.5-flash-latest"),
};
static OPEN_ROUTER: KindSpec = KindSpec {
    display_name: "OpenRouter",
    wire_id: "openrouter",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "an OpenRouter model",
    probe_model: None,
};
static OPEN_AI: KindSpec = KindSpec {
    display_name: "OpenAI",
    wire_id: "openai",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "an OpenAI model",
    probe_model: Some("gpt-4o-mini"),
};
static ANTHROPIC: KindSpec = KindSpec {
    display_name: "Anthropic",
    wire_id: "anthropic",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "an Anthropic model",
    probe_model: Some("claude-3-5-sonnet-latest"),
};
static MISTRAL: KindSpec = KindSpec {
    display_name: "Mistral",
    wire_id: "mistral",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "a Mistral model",
    probe_model: Some("mistral-large-latest"),
};
static GROQ: KindSpec = KindSpec {
    display_name: "Groq",
    wire_id: "groq",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "a Groq model",
    probe_model: Some("llama-3.1-70b-versatile"),
};
static COHERE: KindSpec = KindSpec {
    display_name: "Cohere",
    wire_id: "cohere",
    credential: CredentialShape::ApiKey,
    required: KEY_ONLY,
    model_noun: "a Cohere model",
    probe_model: Some("command-r-plus"),
};
static AZURE_OPENAI: KindSpec = KindSpec {
    display_name: "Azure OpenAI",
    wire_id: "azure_openai",
    credential: CredentialShape::Deployment,
    required: &[
        RequiredField::BaseUrl,
        RequiredField::ApiKey,
        RequiredField::ApiVersion,
    ],
    model_noun: "an Azure OpenAI deployment",
    probe_model: None,
};

/// Api version the backend assumes for Azure when none is given.
pub const AZURE_DEFAULT_API_VERSION: &str = "2025-03-01-preview";

impl ProviderKind {
    pub const ALL: [ProviderKind; 9] = [
        ProviderKind::Ollama,
        ProviderKind::GoogleAi,
        ProviderKind::OpenRouter,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Mistral,
        ProviderKind::Groq,
        ProviderKind::Cohere,
        ProviderKind::AzureOpenAi,
    ];

    pub fn spec(self) -> &'static KindSpec {
        match self {
            ProviderKind::Ollama => &OLLAMA,
            ProviderKind::GoogleAi => &GOOGLE_AI,
            ProviderKind::OpenRouter => &OPEN_ROUTER,
            ProviderKind::OpenAi => &OPEN_AI,
            ProviderKind::Anthropic => &ANTHROPIC,
            ProviderKind::Mistral => &MISTRAL,
            ProviderKind::Groq => &GROQ,
            ProviderKind::Cohere => &COHERE,
            ProviderKind::AzureOpenAi => &AZURE_OPENAI,
        }
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    pub fn wire_id(self) -> &'static str {
        self.spec().wire_id
    }

    /// Key under which this provider's [`ProviderConfig`] is stored.
    pub fn storage_key(self) -> String {
        format!("provider:{}", self.display_name())
    }

    /// Key under which the last-picked model for this provider is stored.
    pub fn model_key(self) -> String {
        format!("chat:model:{}", self.display_name())
    }

    /// Normalize a free-text provider name. Case-insensitive; aliases such
    /// as "LM Studio" collapse into the Ollama bucket.
    pub fn from_name(name: &str) -> Option<Self> {
        let n = name.trim().to_lowercase();
        if n.is_empty() {
            return None;
        }
        // Order matters: "azure openai" must not land on OpenAi.
        const ALIASES: &[(&[&str], ProviderKind)] = &[
            (&["ollama", "lm studio", "lmstudio"], ProviderKind::Ollama),
            (&["google", "gemini", "googleai"], ProviderKind::GoogleAi),
            (&["openrouter", "open router"], ProviderKind::OpenRouter),
            (&["azure"], ProviderKind::AzureOpenAi),
            (&["anthropic", "claude"], ProviderKind::Anthropic),
            (&["mistral"], ProviderKind::Mistral),
            (&["groq"], ProviderKind::Groq),
            (&["cohere"], ProviderKind::Cohere),
            (&["openai", "open ai"], ProviderKind::OpenAi),
        ];
        ALIASES
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| n.contains(needle)))
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for ProviderKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ProviderKind::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown provider: {}", name)))
    }
}

impl RequiredField {
    /// User-facing label. Azure calls its base URL an "Endpoint".
    pub fn label(self, kind: ProviderKind) -> &'static str {
        match (self, kind) {
            (RequiredField::BaseUrl, ProviderKind::AzureOpenAi) => "Endpoint",
            (RequiredField::BaseUrl, _) => "Base URL",
            (RequiredField::ApiKey, _) => "API Key",
            (RequiredField::ApiVersion, _) => "API Version",
        }
    }
}

/// Per-provider settings as saved from the configuration panel.
///
/// Stored as camelCase JSON. Reads are lenient: blank strings are treated as
/// absent and tuning values accept numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(
        default,
        alias = "defModel",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_model: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_float", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, deserialize_with = "lenient_float", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub parallel: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub openai_org: Option<String>,
}

impl ProviderConfig {
    /// Trim every text field, drop blanks and strip a trailing `/` from the
    /// base URL. Applied on save.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            base_url: clean(self.base_url).map(|u| u.trim_end_matches('/').to_string()),
            api_key: clean(self.api_key),
            default_model: clean(self.default_model),
            api_version: clean(self.api_version),
            temperature: self.temperature.filter(|v| v.is_finite()),
            max_tokens: self.max_tokens,
            top_p: self.top_p.filter(|v| v.is_finite()),
            vision_model: clean(self.vision_model),
            keep_alive: clean(self.keep_alive),
            parallel: clean(self.parallel),
            openai_org: clean(self.openai_org),
        }
    }

    pub fn has(&self, field: RequiredField) -> bool {
        let value = match field {
            RequiredField::BaseUrl => &self.base_url,
            RequiredField::ApiKey => &self.api_key,
            RequiredField::ApiVersion => &self.api_version,
        };
        value.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Required fields of `kind` that are not populated.
    pub fn missing_fields(&self, kind: ProviderKind) -> Vec<RequiredField> {
        kind.spec()
            .required
            .iter()
            .copied()
            .filter(|f| !self.has(*f))
            .collect()
    }

    pub fn is_complete_for(&self, kind: ProviderKind) -> bool {
        self.missing_fields(kind).is_empty()
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref().filter(|m| !m.trim().is_empty())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|b| b.trim().trim_end_matches('/'))
            .filter(|b| !b.is_empty())
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn number_of(value: Option<Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number_of(Option::<Value>::deserialize(deserializer)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let n = number_of(Option::<Value>::deserialize(deserializer)?);
    Ok(n.filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases_collapse() {
        assert_eq!(ProviderKind::from_name("LM Studio"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::from_name("ollama (local)"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::from_name("Google Generative AI"), Some(ProviderKind::GoogleAi));
        assert_eq!(ProviderKind::from_name("gemini"), Some(ProviderKind::GoogleAi));
        assert_eq!(ProviderKind::from_name("Open Router"), Some(ProviderKind::OpenRouter));
        assert_eq!(ProviderKind::from_name("Azure OpenAI"), Some(ProviderKind::AzureOpenAi));
        assert_eq!(ProviderKind::from_name("OPENAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::from_name("  "), None);
        assert_eq!(ProviderKind::from_name("watsonx"), None);
    }

    #[test]
    fn test_storage_keys_use_display_name() {
        assert_eq!(ProviderKind::from_name("lmstudio").map(|k| k.storage_key()), Some("provider:Ollama".to_string()));
        assert_eq!(ProviderKind::GoogleAi.model_key(), "chat:model:Google AI");
    }

    #[test]
    fn test_kind_serde_uses_display_name() {
        let s = serde_json::to_string(&ProviderKind::OpenRouter).unwrap();
        assert_eq!(s, "\"OpenRouter\"");
        let k: ProviderKind = serde_json::from_str("\"lm studio\"").unwrap();
        assert_eq!(k, ProviderKind::Ollama);
        assert!(serde_json::from_str::<ProviderKind>("\"nope\"").is_err());
    }

    #[test]
    fn test_config_reads_legacy_panel_json() {
        let raw = json!({
            "baseUrl": "http://localhost:11434/",
            "apiKey": "",
            "defModel": "llama3",
            "temperature": "0.7",
            "maxTokens": "512",
            "topP": "abc",
            "keepAlive": ""
        });
        let cfg: ProviderConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.default_model(), Some("llama3"));
        assert_eq!(cfg.temperature, Some(0.7));
        assert_eq!(cfg.max_tokens, Some(512));
        assert_eq!(cfg.top_p, None);
        assert_eq!(cfg.keep_alive, None);
        assert_eq!(cfg.base(), Some("http://localhost:11434"));
    }

    #[test]
    fn test_max_tokens_rejects_fractions() {
        let cfg: ProviderConfig = serde_json::from_value(json!({"maxTokens": 12.5})).unwrap();
        assert_eq!(cfg.max_tokens, None);
    }

    #[test]
    fn test_missing_fields_per_kind() {
        let cfg = ProviderConfig {
            api_key: Some("k".into()),
            ..Default::default()
        };
        assert!(cfg.is_complete_for(ProviderKind::Groq));
        assert_eq!(cfg.missing_fields(ProviderKind::Ollama), vec![RequiredField::BaseUrl]);
        assert_eq!(
            cfg.missing_fields(ProviderKind::AzureOpenAi),
            vec![RequiredField::BaseUrl, RequiredField::ApiVersion]
        );
    }

    #[test]
    fn test_normalized_trims_and_drops_blanks() {
        let cfg = ProviderConfig {
            base_url: Some(" http://h:1/ ".into()),
            api_key: Some("   ".into()),
            default_model: Some(" m ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(cfg.base_url.as_deref(), Some("http://h:1"));
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.default_model.as_deref(), Some("m"));
        let encoded = serde_json::to_value(&cfg).unwrap();
        assert_eq!(encoded, json!({"baseUrl": "http://h:1", "defaultModel": "m"}));
    }
}
