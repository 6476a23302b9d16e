use thiserror::Error;

/// Why a send or probe did not produce a reply.
///
/// The `Display` text is what the conversation view shows; none of these
/// escape [`crate::Dispatcher::send`] as an `Err`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Required field missing; the message tells the user what to set.
    #[error("{0}")]
    ConfigIncomplete(String),
    /// Network, timeout or bridge failure.
    #[error("Error: Failed to generate: {0}")]
    Transport(String),
    /// Non-2xx from the backend.
    #[error("Error: HTTP {status}")]
    Upstream { status: u16 },
    #[error("Type a message first")]
    EmptyPrompt,
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Error: Could not read saved settings: {0}")]
    Store(String),
}

impl DispatchError {
    /// Short reason without the "Error:" framing, used by connection tests.
    pub fn reason(&self) -> String {
        match self {
            DispatchError::ConfigIncomplete(msg) => msg.clone(),
            DispatchError::Transport(reason) => reason.clone(),
            DispatchError::Upstream { status } => format!("HTTP {}", status),
            DispatchError::EmptyPrompt => "empty prompt".to_string(),
            DispatchError::UnknownProvider(name) => format!("Unknown provider: {}", name),
            DispatchError::Store(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        DispatchError::Store(err.to_string())
    }
}
