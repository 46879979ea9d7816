use crate::api::{ApiClient, ApiResult, Endpoint};
use crate::services::{ById, DateRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: f64,
}

/// Order details as entered on the order form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub delivery_date: NaiveDate,
    pub items: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OrderDetails {
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("Customer name is required".to_string());
        }
        if self.items.is_empty() {
            return Err("An order needs at least one item".to_string());
        }
        if let Some(line) = self.items.iter().find(|l| !l.quantity.is_finite() || l.quantity <= 0.0) {
            return Err(format!("Quantity for product {} must be positive", line.product_id));
        }
        Ok(())
    }

    pub fn total_quantity(&self) -> f64 {
        self.items.iter().map(|l| l.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOrder {
    pub id: i64,
    #[serde(flatten)]
    pub details: OrderDetails,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdate<'a> {
    pub id: i64,
    #[serde(flatten)]
    pub details: &'a OrderDetails,
}

pub async fn list_orders(client: &ApiClient, range: &DateRange) -> ApiResult<Vec<CustomOrder>> {
    client.call(Endpoint::CustomOrderList, range).await
}

pub async fn add_order(client: &ApiClient, order: &OrderDetails) -> ApiResult<()> {
    client.call_unit(Endpoint::AddCustomOrder, order).await
}

pub async fn update_order(client: &ApiClient, id: i64, order: &OrderDetails) -> ApiResult<()> {
    client
        .call_unit(Endpoint::UpdateCustomOrder, &OrderUpdate { id, details: order })
        .await
}

pub async fn delete_order(client: &ApiClient, id: i64) -> ApiResult<()> {
    client.call_unit(Endpoint::DeleteCustomOrder, &ById { id }).await
}
