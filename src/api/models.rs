//! Request and response bodies for the HTTP API
//!
//! Price endpoints report EUR/MWh with a ct/kWh companion value
//! (`price_kwh = price * 0.1`). Export endpoints expose the current register
//! table and refresh bookkeeping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::export::{RefreshState, TickOutcome};
use crate::observability::MetricsSnapshot;
use crate::registers::{AddressRange, RegisterValue, Transform};

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableDatesResponse {
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyPrice {
    pub hour: u8,
    pub price: f64,
    pub price_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPricesResponse {
    pub date: NaiveDate,
    pub prices: Vec<HourlyPrice>,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct PresenceUpdate {
    pub present: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkStatsResponse {
    pub total_devices: usize,
    pub present_devices: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportRegistersResponse {
    pub generation: u64,
    pub built_at: Option<DateTime<Utc>>,
    pub values: BTreeMap<u16, RegisterValue>,
}

#[derive(Debug, Serialize)]
pub struct ExportStatusResponse {
    #[serde(flatten)]
    pub state: RefreshState,
    pub stale: bool,
    pub generation: u64,
    pub refresh_interval_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct MapEntryResponse {
    pub address: u16,
    pub key: String,
    pub transform: Transform,
}

#[derive(Debug, Serialize)]
pub struct AddressMapResponse {
    pub range: AddressRange,
    pub entries: Vec<MapEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: TickOutcome,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
