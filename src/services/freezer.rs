use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::local_state::DeviceLocation;
use crate::services::{ById, DateRange, NoParams};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freezer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub min_temperature: Option<f64>,
    #[serde(default)]
    pub max_temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Freezer {
    /// Whether a reading falls outside the configured limits.
    /// Unset limits never trigger.
    pub fn is_out_of_range(&self, temperature: f64) -> bool {
        self.min_temperature.map_or(false, |min| temperature < min)
            || self.max_temperature.map_or(false, |max| temperature > max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFreezer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub freezer_id: i64,
    pub temperature: f64,
    #[serde(default)]
    pub recorded_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A temperature log entry, optionally stamped with where it was taken
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub freezer_id: i64,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl TemperatureReading {
    pub fn new(freezer_id: i64, temperature: f64) -> Self {
        Self {
            freezer_id,
            temperature,
            latitude: None,
            longitude: None,
        }
    }

    pub fn at(mut self, location: Option<&DeviceLocation>) -> Self {
        if let Some(location) = location {
            self.latitude = Some(location.latitude);
            self.longitude = Some(location.longitude);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureQuery {
    pub freezer_id: i64,
    #[serde(flatten)]
    pub range: DateRange,
}

pub async fn list_freezers(client: &ApiClient) -> ApiResult<Vec<Freezer>> {
    client.call(Endpoint::FreezerList, &NoParams::default()).await
}

pub async fn add_freezer(client: &ApiClient, freezer: &NewFreezer) -> ApiResult<()> {
    client.call_unit(Endpoint::AddFreezer, freezer).await
}

pub async fn delete_freezer(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.call_unit(Endpoint::DeleteFreezer, &ById { id }).await
}

pub async fn temperature_log(client: &ApiClient, query: &TemperatureQuery) -> ApiResult<Vec<TemperatureRecord>> {
    client.call(Endpoint::FreezerTemperatureList, query).await
}

pub async fn log_temperature(client: &ApiClient, reading: &TemperatureReading) -> ApiResult<()> {
    client.call_unit(Endpoint::AddFreezerTemperature, reading).await
}
