use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::services::{DateRange, NoParams};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Form parameters for stock entry: the products that can be counted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StockParams {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub date: NaiveDate,
    pub items: Vec<StockLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StockEntry {
    /// Lines with a zero quantity are dropped; counts can't be negative
    pub fn new(date: NaiveDate, items: Vec<StockLine>) -> Result<Self, String> {
        if let Some(bad) = items.iter().find(|l| !l.quantity.is_finite() || l.quantity < 0.0) {
            return Err(format!(
                "Invalid quantity {} for product {}",
                bad.quantity, bad.product_id
            ));
        }
        let items: Vec<StockLine> = items.into_iter().filter(|l| l.quantity > 0.0).collect();
        if items.is_empty() {
            return Err("Stock entry has no quantities".to_string());
        }
        Ok(Self {
            date,
            items,
            note: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub product_id: i64,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub async fn stock_params(client: &ApiClient) -> ApiResult<StockParams> {
    client.call(Endpoint::StockParams, &NoParams::default()).await
}

pub async fn add_stock(client: &ApiClient, entry: &StockEntry) -> ApiResult<()> {
    client.call_unit(Endpoint::AddStock, entry).await
}

pub async fn stock_data(client: &ApiClient, range: &DateRange) -> ApiResult<Vec<StockRecord>> {
    client.call(Endpoint::StockData, range).await
}
