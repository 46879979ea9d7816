//! Backend API client and wire models
//!
//! Everything that touches HTTP lives here: the endpoint registry, the
//! response envelope, the error taxonomy and the shared client.

pub mod client;
pub mod endpoint;
pub mod envelope;
pub mod error;

pub use client::{ApiClient, ClientConfig};
pub use endpoint::{Endpoint, EndpointRegistry};
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult, BusinessFailure, TransportError, TransportKind};
