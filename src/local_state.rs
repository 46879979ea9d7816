//! Device-local state that is not part of the session: last known location,
//! the cached weather snapshot and the selected UI language.

use crate::storage::{KeyValueStore, StorageError, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const LOCATION_KEY: &str = "last_location";
pub const WEATHER_KEY: &str = "weather_snapshot";
pub const LANGUAGE_KEY: &str = "language";

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub data: Value,
}

impl WeatherSnapshot {
    pub fn new(data: Value) -> Self {
        Self {
            fetched_at: Utc::now(),
            data,
        }
    }

    /// A snapshot fetched in the future (clock skew) is never fresh
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age >= Duration::zero() && age <= max_age
    }
}

#[derive(Clone)]
pub struct LocalState {
    store: Arc<dyn KeyValueStore>,
}

impl LocalState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn location(&self) -> StorageResult<Option<DeviceLocation>> {
        self.get_json(LOCATION_KEY)
    }

    pub fn set_location(&self, location: &DeviceLocation) -> StorageResult<()> {
        self.set_json(LOCATION_KEY, location)
    }

    pub fn weather(&self) -> StorageResult<Option<WeatherSnapshot>> {
        self.get_json(WEATHER_KEY)
    }

    pub fn set_weather(&self, snapshot: &WeatherSnapshot) -> StorageResult<()> {
        self.set_json(WEATHER_KEY, snapshot)
    }

    /// Cached weather, only if younger than `max_age`
    pub fn fresh_weather(&self, max_age: Duration) -> StorageResult<Option<WeatherSnapshot>> {
        Ok(self
            .weather()?
            .filter(|snapshot| snapshot.is_fresh(max_age, Utc::now())))
    }

    pub fn language(&self) -> StorageResult<String> {
        Ok(self
            .store
            .get(LANGUAGE_KEY)?
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }

    pub fn set_language(&self, language: &str) -> StorageResult<()> {
        self.store.set(LANGUAGE_KEY, language.trim())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(target: "storage", "Ignoring unreadable value under '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.set(key, &raw)
    }
}
