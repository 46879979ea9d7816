use crate::api::{ApiClient, ApiError, ApiResult, Endpoint};
use crate::services::DateRange;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Stock,
    EndOfDay,
    Freezer,
    Orders,
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stock" => Ok(ReportKind::Stock),
            "end_of_day" | "eod" => Ok(ReportKind::EndOfDay),
            "freezer" => Ok(ReportKind::Freezer),
            "orders" => Ok(ReportKind::Orders),
            other => Err(format!("Unknown report kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportQuery {
    pub report_type: ReportKind,
    #[serde(flatten)]
    pub range: DateRange,
}

/// Aggregated report rows; the shape is server-defined
pub async fn report_data(client: &ApiClient, query: &ReportQuery) -> ApiResult<Value> {
    client.call_value(Endpoint::ReportData, query).await
}

/// Ask the backend to render the report and return the PDF location
pub async fn report_pdf_link(client: &ApiClient, query: &ReportQuery) -> ApiResult<String> {
    let payload = client.call_value(Endpoint::ReportPdf, query).await?;
    pdf_link(&payload).ok_or_else(|| ApiError::Decode {
        endpoint: Endpoint::ReportPdf,
        message: format!("no PDF link in {}", payload),
    })
}

/// Render the report and download the PDF bytes
pub async fn download_report_pdf(client: &ApiClient, query: &ReportQuery) -> ApiResult<Vec<u8>> {
    let link = report_pdf_link(client, query).await?;
    debug!(target: "api", "Downloading report from {}", link);
    client.fetch_bytes(&link).await
}

/// The backend sends either the link itself or `{ "url": ... }`
fn pdf_link(payload: &Value) -> Option<String> {
    let link = match payload {
        Value::String(s) => s.as_str(),
        Value::Object(map) => ["url", "link", "path", "file"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))?,
        _ => return None,
    };
    let link = link.trim();
    (!link.is_empty()).then(|| link.to_string())
}
