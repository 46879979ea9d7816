//! In-process fake of the bakery backend for integration tests.
#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bakery_client::api::{ApiClient, ClientConfig};
use bakery_client::config::SessionExpiryPolicy;
use bakery_client::session::SessionStore;
use bakery_client::storage::{KeyValueStore, MemoryStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(value: Value) -> Self {
        Self::with_status(200, value)
    }

    pub fn with_status(status: u16, value: Value) -> Self {
        Self {
            status,
            body: serde_json::to_vec(&value).unwrap(),
            content_type: "application/json",
            delay: None,
        }
    }

    pub fn raw(status: u16, body: &[u8], content_type: &'static str) -> Self {
        Self {
            status,
            body: body.to_vec(),
            content_type,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = Arc<dyn Fn(&SeenRequest) -> Reply + Send + Sync>;

#[derive(Clone)]
struct BackendState {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    responder: Responder,
}

pub struct FakeBackend {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&SeenRequest) -> Reply + Send + Sync + 'static,
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            seen: Arc::clone(&seen),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            seen,
            server,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> SeenRequest {
        self.requests().last().cloned().expect("no request reached the backend")
    }

    pub fn client(&self) -> (ApiClient, SessionStore) {
        self.client_with(ClientConfig::new(&self.base_url))
    }

    pub fn client_with(&self, config: ClientConfig) -> (ApiClient, SessionStore) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = SessionStore::new(store);
        let client = ApiClient::new(config, session.clone()).unwrap();
        (client, session)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
    }

    pub fn config_with_policy(&self, policy: SessionExpiryPolicy) -> ClientConfig {
        self.config().with_policy(policy)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let request = SeenRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: text(header::AUTHORIZATION),
        content_type: text(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.seen.lock().unwrap().push(request.clone());

    let reply = (state.responder)(&request);
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    (
        StatusCode::from_u16(reply.status).unwrap(),
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
        .into_response()
}
