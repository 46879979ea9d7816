use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::services::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What was left over and thrown away for one product at closing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOfDayLine {
    pub product_id: i64,
    pub remaining: f64,
    #[serde(default)]
    pub wasted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOfDayEntry {
    pub date: NaiveDate,
    pub items: Vec<EndOfDayLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOfDayItem {
    pub product_id: i64,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub produced: Option<f64>,
    #[serde(default)]
    pub remaining: Option<f64>,
    #[serde(default)]
    pub wasted: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EndOfDayItem {
    /// Produced minus remaining, when both are known
    pub fn sold(&self) -> Option<f64> {
        match (self.produced, self.remaining) {
            (Some(produced), Some(remaining)) => Some((produced - remaining).max(0.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOfDayReport {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: NaiveDate,
    #[serde(default)]
    pub items: Vec<EndOfDayItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub async fn end_of_day_list(client: &ApiClient, range: &DateRange) -> ApiResult<Vec<EndOfDayReport>> {
    client.call(Endpoint::EndOfDayListData, range).await
}

pub async fn submit_end_of_day(client: &ApiClient, entry: &EndOfDayEntry) -> ApiResult<()> {
    client.call_unit(Endpoint::EndOfData, entry).await
}
