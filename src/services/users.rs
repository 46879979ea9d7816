use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::services::{ById, NoParams};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Sent as 0/1 or a boolean
    #[serde(default, deserialize_with = "flag")]
    pub admin_status: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub async fn list_users(client: &ApiClient) -> ApiResult<Vec<User>> {
    client.call(Endpoint::UserList, &NoParams::default()).await
}

/// The signed-in user
pub async fn current_user(client: &ApiClient) -> ApiResult<User> {
    client.call(Endpoint::UserInfo, &NoParams::default()).await
}

pub async fn delete_user(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.call_unit(Endpoint::DeleteUser, &ById { id }).await
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    })
}
