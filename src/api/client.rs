use crate::api::endpoint::{Endpoint, EndpointRegistry};
use crate::api::envelope::Envelope;
use crate::api::error::{ApiError, ApiResult, BusinessFailure, TransportError, TransportKind};
use crate::config::{ApiConfig, Config, SessionExpiryPolicy};
use crate::session::SessionStore;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest slice of a non-envelope error body kept in the error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub content_type: String,
    pub timeout: Option<Duration>,
    pub on_unauthorized: SessionExpiryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            content_type: "application/json".to_string(),
            timeout: Some(Duration::from_secs(30)),
            on_unauthorized: SessionExpiryPolicy::ClearToken,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: SessionExpiryPolicy) -> Self {
        self.on_unauthorized = policy;
        self
    }
}

impl From<&ApiConfig> for ClientConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.resolved_base_url().to_string(),
            content_type: api.content_type.clone(),
            timeout: (api.timeout_secs > 0).then(|| Duration::from_secs(api.timeout_secs)),
            on_unauthorized: api.on_unauthorized,
        }
    }
}

/// Shared request facility for every backend operation.
///
/// Attaches the bearer token (read fresh from the session store on every
/// call), POSTs JSON to a registered endpoint and turns the response into
/// either the envelope or an [`ApiError`]. Clones share the connection pool
/// and the session store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Arc<EndpointRegistry>,
    session: SessionStore,
    content_type: HeaderValue,
    on_unauthorized: SessionExpiryPolicy,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SessionStore) -> ApiResult<Self> {
        let endpoints = EndpointRegistry::new(&config.base_url).map_err(ApiError::Config)?;
        let content_type = HeaderValue::from_str(&config.content_type)
            .map_err(|e| ApiError::Config(format!("Invalid content type: {}", e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Config(format!("Cannot build HTTP client: {}", e)))?;

        debug!(target: "api", "Client for {} (timeout {:?})", endpoints.base_url(), config.timeout);

        Ok(Self {
            http,
            endpoints: Arc::new(endpoints),
            session,
            content_type,
            on_unauthorized: config.on_unauthorized,
        })
    }

    pub fn from_config(config: &Config, session: SessionStore) -> ApiResult<Self> {
        Self::new(ClientConfig::from(&config.api), session)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// POST `body` and return the envelope of a successful operation
    pub async fn post_envelope<B>(&self, endpoint: Endpoint, body: &B) -> ApiResult<Envelope>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::Encode {
            endpoint,
            message: e.to_string(),
        })?;

        let request = self
            .http
            .post(self.endpoints.url(endpoint).clone())
            .header(CONTENT_TYPE, self.content_type.clone())
            .body(payload);
        let request = self.authorize(request)?;

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(endpoint, e.into())),
        };
        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.transport_failure(endpoint, e.into())),
        };

        debug!(target: "api", "{} -> HTTP {} ({} bytes)", endpoint, status.as_u16(), body.len());
        self.interpret(endpoint, status, &body)
    }

    /// The `obj` payload exactly as sent, `Null` when absent
    pub async fn call_value<B>(&self, endpoint: Endpoint, body: &B) -> ApiResult<Value>
    where
        B: Serialize + ?Sized,
    {
        Ok(self.post_envelope(endpoint, body).await?.into_payload())
    }

    pub async fn call<T, B>(&self, endpoint: Endpoint, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let payload = self.call_value(endpoint, body).await?;
        serde_json::from_value(payload).map_err(|e| {
            warn!(target: "api", "{} payload did not decode: {}", endpoint, e);
            ApiError::Decode {
                endpoint,
                message: e.to_string(),
            }
        })
    }

    /// For operations that only report success
    pub async fn call_unit<B>(&self, endpoint: Endpoint, body: &B) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.post_envelope(endpoint, body).await.map(|_| ())
    }

    /// Authenticated GET of a server-provided file link (report PDFs).
    /// Relative links resolve against the base URL.
    pub async fn fetch_bytes(&self, link: &str) -> ApiResult<Vec<u8>> {
        let url = self.endpoints.resolve(link).map_err(ApiError::Config)?;
        let request = self.authorize(self.http.get(url.clone()))?;

        let response = request.send().await.map_err(|e| {
            let err = TransportError::from(e);
            warn!(target: "api", "GET {} failed: {}", url, err);
            ApiError::Transport(err)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.session_expired());
        }
        if !status.is_success() {
            warn!(target: "api", "GET {} -> HTTP {}", url, status.as_u16());
            return Err(ApiError::Transport(TransportError::new(
                TransportKind::Status(status.as_u16()),
                format!("download of {} refused", url),
            )));
        }

        let bytes = response.bytes().await?;
        debug!(target: "api", "GET {} -> {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Request interceptor: bearer token when the session has one
    fn authorize(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        match self.session.token()? {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::Config("Stored token is not a valid header value".to_string()))?;
                Ok(request.header(AUTHORIZATION, value))
            }
            None => {
                debug!(target: "api", "No session token, sending unauthenticated request");
                Ok(request)
            }
        }
    }

    /// Response interpretation. A JSON object body is always read as an
    /// envelope, so `status: false` is a business failure whatever the HTTP
    /// code; 401 goes through the session expiry policy first.
    fn interpret(&self, endpoint: Endpoint, status: StatusCode, body: &[u8]) -> ApiResult<Envelope> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.session_expired());
        }

        let envelope = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(Envelope::from_value);

        match envelope {
            Some(envelope) if envelope.is_success() => Ok(envelope),
            Some(envelope) => {
                let failure = BusinessFailure {
                    endpoint: Some(endpoint),
                    http_status: status.as_u16(),
                    sub_info: envelope.sub_info(),
                    message: envelope.message.clone(),
                    obj: envelope.obj,
                };
                info!(target: "api", "{} business failure: {}", endpoint, failure);
                Err(ApiError::Business(failure))
            }
            None if status.is_success() => Err(self.transport_failure(
                endpoint,
                TransportError::new(TransportKind::Body, "response body is not a JSON object"),
            )),
            None => Err(self.transport_failure(
                endpoint,
                TransportError::new(
                    TransportKind::Status(status.as_u16()),
                    body_excerpt(body),
                ),
            )),
        }
    }

    fn transport_failure(&self, endpoint: Endpoint, err: TransportError) -> ApiError {
        warn!(target: "api", "{} transport failure: {}", endpoint, err);
        ApiError::Transport(err)
    }

    fn session_expired(&self) -> ApiError {
        match self.on_unauthorized {
            SessionExpiryPolicy::ClearToken => {
                warn!(target: "session", "Backend rejected the session, clearing stored token");
                if let Err(e) = self.session.clear() {
                    return ApiError::Storage(e);
                }
            }
            SessionExpiryPolicy::Keep => {
                warn!(target: "session", "Backend rejected the session, keeping stored token");
            }
        }
        ApiError::SessionExpired
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.endpoints.base_url().as_str())
            .field("on_unauthorized", &self.on_unauthorized)
            .finish_non_exhaustive()
    }
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() > MAX_ERROR_BODY {
        let cut: String = text.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn client(policy: SessionExpiryPolicy) -> ApiClient {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        ApiClient::new(
            ClientConfig::new("http://127.0.0.1:9").with_policy(policy),
            session,
        )
        .unwrap()
    }

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn success_envelope_passes_through() {
        let client = client(SessionExpiryPolicy::ClearToken);
        let obj = json!([{"product": "rye", "qty": 12}]);
        let envelope = client
            .interpret(Endpoint::StockData, StatusCode::OK, &body(json!({"status": true, "obj": obj})))
            .unwrap();
        assert_eq!(envelope.into_payload(), obj);
    }

    #[test]
    fn false_or_missing_status_is_business_failure_for_any_code() {
        let client = client(SessionExpiryPolicy::ClearToken);
        for code in [StatusCode::OK, StatusCode::BAD_REQUEST, StatusCode::INTERNAL_SERVER_ERROR] {
            let err = client
                .interpret(Endpoint::AddStock, code, &body(json!({"status": false, "sub_info": "dup"})))
                .unwrap_err();
            assert!(err.is_business(), "{code}: {err:?}");
            assert_eq!(err.sub_info(), Some("dup"));

            let err = client
                .interpret(Endpoint::AddStock, code, &body(json!({"obj": {}})))
                .unwrap_err();
            assert!(err.is_business(), "{code}: {err:?}");
        }
    }

    #[test]
    fn non_envelope_bodies_are_transport_failures() {
        let client = client(SessionExpiryPolicy::ClearToken);

        let err = client
            .interpret(Endpoint::StockParams, StatusCode::OK, b"<html>oops</html>")
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError { kind: TransportKind::Body, .. })));

        let err = client
            .interpret(Endpoint::StockParams, StatusCode::BAD_GATEWAY, b"upstream down")
            .unwrap_err();
        match err {
            ApiError::Transport(t) => {
                assert_eq!(t.kind, TransportKind::Status(502));
                assert_eq!(t.message, "upstream down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unauthorized_clears_token_under_clear_policy() {
        let client = client(SessionExpiryPolicy::ClearToken);
        client.session().set_token("stale").unwrap();

        let err = client
            .interpret(Endpoint::StockData, StatusCode::UNAUTHORIZED, &body(json!({"status": false})))
            .unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert_eq!(client.session().token().unwrap(), None);
    }

    #[test]
    fn unauthorized_keeps_token_under_keep_policy() {
        let client = client(SessionExpiryPolicy::Keep);
        client.session().set_token("stale").unwrap();

        let err = client
            .interpret(Endpoint::StockData, StatusCode::UNAUTHORIZED, b"")
            .unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert_eq!(client.session().token().unwrap().as_deref(), Some("stale"));
    }

    #[test]
    fn config_errors_surface_at_construction() {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        let err = ApiClient::new(ClientConfig::new("nowhere"), session.clone()).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let mut config = ClientConfig::new("http://localhost");
        config.content_type = "bad\nvalue".to_string();
        assert!(matches!(ApiClient::new(config, session), Err(ApiError::Config(_))));
    }

    #[test]
    fn client_config_from_api_section() {
        let mut api = ApiConfig::default();
        api.timeout_secs = 0;
        api.base_url = Some("http://10.0.2.2:8000".to_string());
        let config = ClientConfig::from(&api);
        assert_eq!(config.timeout, None);
        assert_eq!(config.base_url, "http://10.0.2.2:8000");
    }

    #[tokio::test]
    async fn unencodable_body_is_an_encode_error() {
        let client = client(SessionExpiryPolicy::ClearToken);
        // JSON object keys must be strings
        let body: std::collections::BTreeMap<(i64, i64), i64> = [((1, 2), 3)].into_iter().collect();

        let err = client.call_unit(Endpoint::AddStock, &body).await.unwrap_err();
        assert!(matches!(err, ApiError::Encode { endpoint: Endpoint::AddStock, .. }), "{err:?}");
        assert!(!err.user_message().contains("Configuration"));
    }

    #[test]
    fn long_error_bodies_are_trimmed() {
        let long = "x".repeat(500);
        let excerpt = body_excerpt(long.as_bytes());
        assert_eq!(excerpt.len(), MAX_ERROR_BODY + 3);
        assert!(excerpt.ends_with("..."));
    }
}
