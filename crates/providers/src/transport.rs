//! The two ways a chat payload leaves the process: an in-process native
//! bridge, or HTTP to the backend's unified `/api/chat`. Exactly one is used
//! per dispatcher; there is no failover between them.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::DispatchError;

/// Function-call equivalent of `POST /api/chat`, provided by the host
/// runtime when it has one.
///
/// Returning a [`DispatchError`] inside the `anyhow::Error` keeps its
/// meaning (e.g. `Upstream { status }`); anything else is a transport
/// failure.
#[async_trait]
pub trait NativeBridge: Send + Sync {
    async fn chat(&self, payload: Value) -> anyhow::Result<Value>;
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, payload: &Value) -> Result<Value, DispatchError>;
}

pub struct HttpTransport {
    backend: BackendClient,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(backend: BackendClient, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, payload: &Value) -> Result<Value, DispatchError> {
        self.backend.post_json("/api/chat", payload, self.timeout).await
    }
}

pub struct BridgeTransport {
    bridge: Arc<dyn NativeBridge>,
    timeout: Duration,
}

impl BridgeTransport {
    pub fn new(bridge: Arc<dyn NativeBridge>, timeout: Duration) -> Self {
        Self { bridge, timeout }
    }
}

#[async_trait]
impl ChatTransport for BridgeTransport {
    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn send(&self, payload: &Value) -> Result<Value, DispatchError> {
        match tokio::time::timeout(self.timeout, self.bridge.chat(payload.clone())).await {
            Err(_) => Err(DispatchError::Transport("Timeout".to_string())),
            Ok(Ok(body)) => Ok(body),
            Ok(Err(err)) => Err(match err.downcast_ref::<DispatchError>() {
                Some(known) => known.clone(),
                None => DispatchError::Transport(err.to_string()),
            }),
        }
    }
}

/// Prefer the bridge when the runtime offers one, else HTTP.
pub fn select_transport(
    bridge: Option<Arc<dyn NativeBridge>>,
    backend: BackendClient,
    timeout: Duration,
) -> Arc<dyn ChatTransport> {
    match bridge {
        Some(bridge) => {
            debug!("chat transport: native bridge");
            Arc::new(BridgeTransport::new(bridge, timeout))
        }
        None => {
            debug!(backend = backend.base_url(), "chat transport: http");
            Arc::new(HttpTransport::new(backend, timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, Canned, EchoBridge};
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    struct Failing(anyhow::Error);

    #[async_trait]
    impl NativeBridge for Failing {
        async fn chat(&self, _payload: Value) -> anyhow::Result<Value> {
            Err(anyhow!("{}", self.0))
        }
    }

    struct Status(u16);

    #[async_trait]
    impl NativeBridge for Status {
        async fn chat(&self, _payload: Value) -> anyhow::Result<Value> {
            Err(DispatchError::Upstream { status: self.0 }.into())
        }
    }

    struct Stalled;

    #[async_trait]
    impl NativeBridge for Stalled {
        async fn chat(&self, _payload: Value) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_bridge_preferred_over_http() {
        // Nothing is listening here; a request would fail.
        let backend = BackendClient::new("http://127.0.0.1:9");
        let bridge = EchoBridge::new(json!({"output": "from bridge"}));
        let as_dyn: Arc<dyn NativeBridge> = bridge.clone();
        let transport = select_transport(Some(as_dyn), backend, Duration::from_secs(1));
        assert_eq!(transport.name(), "bridge");
        let body = transport.send(&json!({"prompt": "hi"})).await.unwrap();
        assert_eq!(body["output"], "from bridge");
        assert_eq!(bridge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_used_without_bridge() {
        let (url, rx) = serve(vec![Canned::json(200, r#"{"response":"hey"}"#)]);
        let transport = select_transport(None, BackendClient::new(&url), Duration::from_secs(5));
        assert_eq!(transport.name(), "http");
        let body = transport.send(&json!({"prompt": "hi"})).await.unwrap();
        assert_eq!(body, json!({"response": "hey"}));
        let seen = rx.recv().unwrap();
        assert_eq!(seen.method, "POST");
        assert_eq!(seen.path, "/api/chat");
    }

    #[tokio::test]
    async fn test_bridge_errors_are_mapped() {
        let t = BridgeTransport::new(Arc::new(Failing(anyhow!("socket closed"))), Duration::from_secs(1));
        assert_eq!(
            t.send(&json!({})).await.unwrap_err(),
            DispatchError::Transport("socket closed".into())
        );

        let t = BridgeTransport::new(Arc::new(Status(503)), Duration::from_secs(1));
        assert_eq!(
            t.send(&json!({})).await.unwrap_err(),
            DispatchError::Upstream { status: 503 }
        );
    }

    #[tokio::test]
    async fn test_bridge_times_out() {
        let t = BridgeTransport::new(Arc::new(Stalled), Duration::from_millis(50));
        assert_eq!(
            t.send(&json!({})).await.unwrap_err(),
            DispatchError::Transport("Timeout".into())
        );
    }
}
