//! Building a [`ChatRequest`] from a stored config, and the instructional
//! messages shown when a config cannot be used.

use shared::{ChatRequest, CredentialShape, ProviderAccess, ProviderConfig, ProviderKind, RequiredField, Tuning};

use crate::error::DispatchError;

/// "Please set Google AI API Key in Model Hub."
pub fn missing_fields_message(kind: ProviderKind, missing: &[RequiredField]) -> String {
    let labels: Vec<&str> = missing.iter().map(|f| f.label(kind)).collect();
    let joined = match labels.as_slice() {
        [] => "configuration".to_string(),
        [one] => one.to_string(),
        [a, b] => format!("{} and {}", a, b),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    };
    format!("Please set {} {} in Model Hub.", kind, joined)
}

/// "Please choose a Gemini model from the model selector."
pub fn missing_model_message(kind: ProviderKind) -> String {
    format!("Please choose {} from the model selector.", kind.spec().model_noun)
}

pub const NO_PROVIDER_MESSAGE: &str = "Please configure a provider first in Model Hub.";

/// Build the request for `kind`. Fails before any IO when a required field
/// or the model is missing.
pub fn build_request(
    kind: ProviderKind,
    model: &str,
    prompt: &str,
    config: &ProviderConfig,
) -> Result<ChatRequest, DispatchError> {
    let missing = config.missing_fields(kind);
    if !missing.is_empty() {
        return Err(DispatchError::ConfigIncomplete(missing_fields_message(kind, &missing)));
    }
    let model = model.trim();
    if model.is_empty() {
        return Err(DispatchError::ConfigIncomplete(missing_model_message(kind)));
    }

    let field = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
    let access = match kind.spec().credential {
        CredentialShape::BaseUrl => ProviderAccess::Local {
            base: config.base().unwrap_or_default().to_string(),
        },
        CredentialShape::ApiKey => ProviderAccess::ApiKey {
            api_key: field(&config.api_key),
        },
        CredentialShape::Deployment => ProviderAccess::Deployment {
            endpoint: config.base().unwrap_or_default().to_string(),
            api_key: field(&config.api_key),
            api_version: field(&config.api_version),
        },
    };

    Ok(ChatRequest {
        provider: kind,
        model: model.to_string(),
        prompt: prompt.to_string(),
        access,
        tuning: Tuning::from_config(config),
    })
}
