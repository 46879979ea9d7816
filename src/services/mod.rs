//! Typed backend operations
//!
//! One async function per backend operation, grouped by resource. Each one
//! is a thin wrapper over [`ApiClient`](crate::api::ApiClient), so envelope
//! handling and error mapping live in a single place.

pub mod auth;
pub mod custom_order;
pub mod end_of_day;
pub mod freezer;
pub mod holiday;
pub mod production;
pub mod report;
pub mod stock;
pub mod users;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body for operations addressed by record id (deletes, lookups)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ById {
    pub id: i64,
}

/// Inclusive date window used by list and report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `end` is before `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self {
            start_date: start,
            end_date: end,
        })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start_date: day,
            end_date: day,
        }
    }
}

/// Empty JSON object body for parameterless reads
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_range_serializes_as_iso_dates() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            json!({"start_date": "2024-03-01", "end_date": "2024-03-31"})
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(DateRange::new(a, b).is_none());
        assert_eq!(DateRange::single_day(a).end_date, a);
    }

    #[test]
    fn no_params_is_an_empty_object() {
        assert_eq!(serde_json::to_string(&NoParams::default()).unwrap(), "{}");
    }
}
