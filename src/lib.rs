pub mod api;
pub mod config;
pub mod local_state;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult, ClientConfig, Endpoint};
pub use session::SessionStore;
