//! HTTP access to the local backend (`/api/chat` and the proxy routes used
//! by connection tests and model listing).

use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use crate::error::DispatchError;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        let req = self.http.post(self.url(path)).json(body).timeout(timeout);
        let resp = self.authorize(req).send().await.map_err(transport_error)?;
        debug!(path, status = resp.status().as_u16(), "backend POST");
        read_json(resp).await
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, DispatchError> {
        let req = self.http.get(self.url(path)).query(query).timeout(timeout);
        let resp = self.authorize(req).send().await.map_err(transport_error)?;
        debug!(path, status = resp.status().as_u16(), "backend GET");
        read_json(resp).await
    }

    /// `GET /api/health`; any 2xx counts as healthy.
    pub async fn health(&self, timeout: Duration) -> bool {
        let req = self.http.get(self.url("/api/health")).timeout(timeout);
        match self.authorize(req).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("backend health check failed: {}", e);
                false
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Transport("Timeout".to_string())
    } else {
        DispatchError::Transport(err.to_string())
    }
}

/// Non-2xx becomes [`DispatchError::Upstream`]. A 2xx body that is not JSON
/// is kept as a plain string so it can still be shown.
async fn read_json(resp: Response) -> Result<Value, DispatchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DispatchError::Upstream {
            status: status.as_u16(),
        });
    }
    let text = resp.text().await.map_err(transport_error)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, Canned};
    use serde_json::json;

    #[tokio::test]
    async fn test_post_json_sends_bearer_token() {
        let (url, rx) = serve(vec![Canned::json(200, r#"{"output":"ok"}"#)]);
        let backend = BackendClient::new(&url).with_token(Some("tok".into()));
        let body = backend
            .post_json("/api/chat", &json!({"a": 1}), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, json!({"output": "ok"}));
        let seen = rx.recv().unwrap();
        assert_eq!(seen.path, "/api/chat");
        assert_eq!(seen.body, r#"{"a":1}"#);
        assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_non_success_maps_to_upstream() {
        let (url, _rx) = serve(vec![Canned::json(502, r#"{"detail":"bad gateway"}"#)]);
        let err = BackendClient::new(&url)
            .get_json("/api/ollama/tags", &[("base", "http://x")], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Upstream { status: 502 });
    }

    #[tokio::test]
    async fn test_query_is_encoded() {
        let (url, rx) = serve(vec![Canned::json(200, "{}")]);
        BackendClient::new(&url)
            .get_json(
                "/api/ollama/version",
                &[("base", "http://localhost:11434")],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        let seen = rx.recv().unwrap();
        assert_eq!(seen.path, "/api/ollama/version?base=http%3A%2F%2Flocalhost%3A11434");
        assert_eq!(seen.authorization, None);
    }

    #[tokio::test]
    async fn test_plain_text_body_is_kept() {
        let (url, _rx) = serve(vec![Canned::json(200, "pong")]);
        let body = BackendClient::new(&url)
            .post_json("/api/chat", &json!({}), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, json!("pong"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let (url, _rx) = serve(vec![Canned::json(200, "{}").delayed(Duration::from_millis(1500))]);
        let err = BackendClient::new(&url)
            .post_json("/api/chat", &json!({}), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Transport("Timeout".into()));
    }

    #[tokio::test]
    async fn test_health() {
        let (url, _rx) = serve(vec![Canned::json(200, r#"{"status":"ok"}"#)]);
        assert!(BackendClient::new(&url).health(Duration::from_secs(3)).await);
        // nothing listens on port 9 locally
        assert!(!BackendClient::new("http://127.0.0.1:9").health(Duration::from_secs(1)).await);
    }
}
