use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::services::{ById, NoParams};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A day the bakery is closed or runs a special schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHoliday {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub async fn list_holidays(client: &ApiClient) -> ApiResult<Vec<Holiday>> {
    client.call(Endpoint::HolidayList, &NoParams::default()).await
}

pub async fn add_holiday(client: &ApiClient, holiday: &NewHoliday) -> ApiResult<()> {
    client.call_unit(Endpoint::AddHoliday, holiday).await
}

pub async fn delete_holiday(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.call_unit(Endpoint::DeleteHoliday, &ById { id }).await
}
