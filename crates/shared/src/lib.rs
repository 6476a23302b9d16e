pub mod chat_api;
pub mod provider;
pub mod selection;

pub use chat_api::{ChatRequest, ProviderAccess, Tuning};
pub use provider::{CredentialShape, ProviderConfig, ProviderKind, RequiredField};
pub use selection::ActiveSelection;

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::env;
    use std::time::Duration;

    use crate::provider::ProviderKind;

    fn default_backend_url() -> String {
        "http://127.0.0.1:8000".into()
    }

    fn default_chat_timeout() -> u64 {
        60
    }

    fn default_probe_timeout() -> u64 {
        12
    }

    fn default_health_timeout() -> u64 {
        3
    }

    fn default_fallback_order() -> Vec<ProviderKind> {
        vec![
            ProviderKind::Ollama,
            ProviderKind::GoogleAi,
            ProviderKind::OpenRouter,
        ]
    }

    /// Knobs for the dispatcher. Everything has a default so an empty
    /// settings file is valid.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DispatcherSettings {
        /// Where the local backend listens (serves `/api/chat` and proxies)
        #[serde(default = "default_backend_url")]
        pub backend_url: String,
        #[serde(default = "default_chat_timeout")]
        pub chat_timeout_secs: u64,
        /// Connection tests and model listing
        #[serde(default = "default_probe_timeout")]
        pub probe_timeout_secs: u64,
        #[serde(default = "default_health_timeout")]
        pub health_timeout_secs: u64,
        /// Providers tried, in order, when no explicit selection is usable
        #[serde(default = "default_fallback_order")]
        pub fallback_order: Vec<ProviderKind>,
        /// Bearer token for the local backend; the stored `local:apiToken`
        /// is used when this is unset
        #[serde(default)]
        pub api_token: Option<String>,
    }

    impl DispatcherSettings {
        /// Defaults overlaid with `ZEEK_BACKEND_URL` / `ZEEK_API_TOKEN`.
        pub fn from_env() -> Self {
            let mut settings = Self::default();
            if let Ok(url) = env::var("ZEEK_BACKEND_URL") {
                if !url.trim().is_empty() {
                    settings.backend_url = url.trim().to_string();
                }
            }
            if let Ok(token) = env::var("ZEEK_API_TOKEN") {
                if !token.trim().is_empty() {
                    settings.api_token = Some(token.trim().to_string());
                }
            }
            settings
        }

        pub fn chat_timeout(&self) -> Duration {
            Duration::from_secs(self.chat_timeout_secs)
        }

        pub fn probe_timeout(&self) -> Duration {
            Duration::from_secs(self.probe_timeout_secs)
        }

        pub fn health_timeout(&self) -> Duration {
            Duration::from_secs(self.health_timeout_secs)
        }
    }

    impl Default for DispatcherSettings {
        fn default() -> Self {
            Self {
                backend_url: default_backend_url(),
                chat_timeout_secs: default_chat_timeout(),
                probe_timeout_secs: default_probe_timeout(),
                health_timeout_secs: default_health_timeout(),
                fallback_order: default_fallback_order(),
                api_token: None,
            }
        }
    }

}
