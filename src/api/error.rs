use crate::api::endpoint::Endpoint;
use crate::storage::StorageError;
use serde_json::Value;
use std::fmt;

/// Why a request never produced an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    /// Non-2xx response whose body was not an envelope
    Status(u16),
    /// 2xx response whose body could not be read as a JSON object
    Body,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportKind::Timeout => write!(f, "timed out: {}", self.message),
            TransportKind::Connect => write!(f, "connection failed: {}", self.message),
            TransportKind::Status(code) => write!(f, "HTTP {}: {}", code, self.message),
            TransportKind::Body => write!(f, "malformed response: {}", self.message),
            TransportKind::Other => write!(f, "{}", self.message),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else if let Some(status) = err.status() {
            TransportKind::Status(status.as_u16())
        } else if err.is_decode() || err.is_body() {
            TransportKind::Body
        } else {
            TransportKind::Other
        };
        TransportError::new(kind, err.to_string())
    }
}

/// A transport-successful response whose envelope said the operation failed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BusinessFailure {
    pub endpoint: Option<Endpoint>,
    pub http_status: u16,
    pub sub_info: Option<String>,
    pub message: Option<String>,
    pub obj: Option<Value>,
}

impl fmt::Display for BusinessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(endpoint) = self.endpoint {
            write!(f, "{} rejected", endpoint)?;
        } else {
            write!(f, "operation rejected")?;
        }
        if let Some(sub_info) = &self.sub_info {
            write!(f, " ({})", sub_info)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(TransportError),

    #[error("{0}")]
    Business(BusinessFailure),

    #[error("session expired")]
    SessionExpired,

    #[error("unexpected payload from {endpoint}: {message}")]
    Decode { endpoint: Endpoint, message: String },

    #[error("could not encode {endpoint} request: {message}")]
    Encode { endpoint: Endpoint, message: String },

    #[error("local storage: {0}")]
    Storage(#[from] StorageError),

    #[error("client configuration: {0}")]
    Config(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.into())
    }
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_business(&self) -> bool {
        matches!(self, ApiError::Business(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(TransportError {
                kind: TransportKind::Timeout,
                ..
            })
        )
    }

    pub fn sub_info(&self) -> Option<&str> {
        match self {
            ApiError::Business(failure) => failure.sub_info.as_deref(),
            _ => None,
        }
    }

    /// The one place errors become text a user sees
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(err) => match err.kind {
                TransportKind::Timeout => {
                    "The server took too long to answer. Check your connection and try again."
                        .to_string()
                }
                TransportKind::Connect => {
                    "Network unreachable. Check your connection and try again.".to_string()
                }
                TransportKind::Status(code) if code >= 500 => {
                    format!("The server had a problem (HTTP {}). Try again later.", code)
                }
                TransportKind::Status(code) => format!("Request refused (HTTP {}).", code),
                TransportKind::Body => "The server sent an unreadable response.".to_string(),
                TransportKind::Other => format!("Network error: {}", err.message),
            },
            ApiError::Business(failure) => business_message(failure),
            ApiError::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            ApiError::Decode { endpoint, .. } => {
                format!("The server sent data this version cannot read ({}).", endpoint)
            }
            ApiError::Encode { endpoint, .. } => {
                format!("The {} request could not be prepared from the given input.", endpoint)
            }
            ApiError::Storage(err) => format!("Could not access local data: {}", err),
            ApiError::Config(message) => format!("Configuration problem: {}", message),
        }
    }
}

fn business_message(failure: &BusinessFailure) -> String {
    let specific = match failure.sub_info.as_deref() {
        Some("wrong_password") | Some("wrong_current_password") => {
            Some("The current password is wrong.")
        }
        Some("invalid_credentials") | Some("wrong_credentials") => {
            Some("Wrong username or password.")
        }
        Some("user_exists") | Some("already_exists") => Some("That user already exists."),
        Some("not_found") => Some("The record no longer exists."),
        Some("not_admin") | Some("forbidden") => {
            Some("Only administrators can do this.")
        }
        _ => None,
    };

    match (specific, &failure.message) {
        (Some(text), _) => text.to_string(),
        (None, Some(message)) if !message.trim().is_empty() => {
            format!("Operation rejected: {}", message.trim())
        }
        _ => "Operation rejected by the server.".to_string(),
    }
}
