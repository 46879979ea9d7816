//! Production guessing. The forecast itself is computed server-side; these
//! calls only fetch the numbers, so payloads stay as raw JSON.

use crate::api::{ApiClient, ApiResult, Endpoint};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuessQuery {
    pub date: NaiveDate,
    /// Cached weather snapshot, forwarded when the caller has a fresh one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Value>,
}

impl GuessQuery {
    pub fn for_date(date: NaiveDate) -> Self {
        Self { date, weather: None }
    }

    pub fn with_weather(mut self, weather: Option<Value>) -> Self {
        self.weather = weather;
        self
    }
}

/// Suggested quantities per product for the given day
pub async fn guessing_data(client: &ApiClient, query: &GuessQuery) -> ApiResult<Value> {
    client.call_value(Endpoint::GuessingData, query).await
}

pub async fn production_plan(client: &ApiClient, query: &GuessQuery) -> ApiResult<Value> {
    client.call_value(Endpoint::ProductionPlan, query).await
}
