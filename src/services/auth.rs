use crate::api::{ApiClient, ApiError, ApiResult, Endpoint, Envelope};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SwitchUserRequest {
    user_id: i64,
}

/// What a successful sign-in left in the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedIn {
    pub admin: bool,
}

pub async fn login(client: &ApiClient, credentials: &Credentials) -> ApiResult<SignedIn> {
    let envelope = client.post_envelope(Endpoint::Login, credentials).await?;
    let signed_in = store_session(client, Endpoint::Login, &envelope)?;
    info!(target: "session", "Logged in as {} (admin: {})", credentials.username, signed_in.admin);
    Ok(signed_in)
}

/// `None` when the account was created but the backend did not sign it in
pub async fn register(client: &ApiClient, registration: &Registration) -> ApiResult<Option<SignedIn>> {
    let envelope = client.post_envelope(Endpoint::Register, registration).await?;
    if envelope.access_token.as_deref().map_or(true, str::is_empty) {
        info!(target: "session", "Registered {} without a session", registration.username);
        return Ok(None);
    }
    store_session(client, Endpoint::Register, &envelope).map(Some)
}

/// Administrators can continue as another user; the backend issues a new token
pub async fn switch_user(client: &ApiClient, user_id: i64) -> ApiResult<SignedIn> {
    let envelope = client
        .post_envelope(Endpoint::SwitchUser, &SwitchUserRequest { user_id })
        .await?;
    store_session(client, Endpoint::SwitchUser, &envelope)
}

/// Local only; the backend has no logout operation
pub fn logout(client: &ApiClient) -> ApiResult<()> {
    client.session().clear()?;
    info!(target: "session", "Logged out");
    Ok(())
}

/// A wrong current password comes back as a business failure with
/// `sub_info` set (usually `wrong_password`)
pub async fn change_password(client: &ApiClient, change: &PasswordChange) -> ApiResult<()> {
    client.call_unit(Endpoint::ChangePassword, change).await
}

fn store_session(client: &ApiClient, endpoint: Endpoint, envelope: &Envelope) -> ApiResult<SignedIn> {
    let token = envelope
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Decode {
            endpoint,
            message: "success response without access_token".to_string(),
        })?;

    let admin = envelope.is_admin();
    client.session().set_credentials(token, admin)?;
    Ok(SignedIn { admin })
}
