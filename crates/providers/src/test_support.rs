//! Throwaway local HTTP server and fakes shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::DispatchError;
use crate::transport::{ChatTransport, NativeBridge};

/// A response the test server hands out, in order.
pub struct Canned {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// What the server saw for one request.
#[derive(Debug)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub body: String,
    pub authorization: Option<String>,
}

/// Serve `responses` one per request on an ephemeral port. Returns the base
/// URL and a channel of the requests received.
pub fn serve(responses: Vec<Canned>) -> (String, Receiver<Seen>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server.server_addr().to_ip().expect("ip listener");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for canned in responses {
            let Ok(mut req) = server.recv() else {
                return;
            };
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let authorization = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            let _ = tx.send(Seen {
                method: req.method().to_string(),
                path: req.url().to_string(),
                body,
                authorization,
            });
            if let Some(delay) = canned.delay {
                thread::sleep(delay);
            }
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("static header");
            let resp = tiny_http::Response::from_string(canned.body)
                .with_status_code(canned.status)
                .with_header(header);
            let _ = req.respond(resp);
        }
    });
    (format!("http://{}", addr), rx)
}

/// Transport that records payloads and answers from a script.
pub struct FakeTransport {
    pub calls: AtomicUsize,
    pub payloads: Mutex<Vec<Value>>,
    answer: Mutex<Box<dyn FnMut() -> Result<Value, DispatchError> + Send>>,
}

impl FakeTransport {
    pub fn replying(body: Value) -> Arc<Self> {
        Self::with(move || Ok(body.clone()))
    }

    pub fn failing(err: DispatchError) -> Arc<Self> {
        Self::with(move || Err(err.clone()))
    }

    pub fn with(answer: impl FnMut() -> Result<Value, DispatchError> + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            answer: Mutex::new(Box::new(answer)),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<Value> {
        self.payloads.lock().last().cloned()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn send(&self, payload: &Value) -> Result<Value, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().push(payload.clone());
        let mut answer = self.answer.lock();
        (*answer)()
    }
}

/// In-process bridge answering with a fixed body.
pub struct EchoBridge {
    pub calls: AtomicUsize,
    pub reply: Value,
}

impl EchoBridge {
    pub fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }
}

#[async_trait]
impl NativeBridge for EchoBridge {
    async fn chat(&self, _payload: Value) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}
