use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::registers::FactKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Price,
    Presence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    EurPerMwh,
    /// 1.0 present, 0.0 absent
    Flag,
}

/// One time-stamped scalar fact as seen by the exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFact {
    pub category: Category,
    pub key: FactKey,
    pub value: f64,
    pub unit: Unit,
    pub observed_at: DateTime<Utc>,
}

/// Hourly spot price row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub hour: u8,
    /// EUR/MWh
    pub price: f64,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl PriceRecord {
    pub fn to_fact(&self, key: FactKey) -> SnapshotFact {
        SnapshotFact {
            category: Category::Price,
            key,
            value: self.price,
            unit: Unit::EurPerMwh,
            observed_at: self.created_at,
        }
    }
}

/// Inventory entry for a network device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: u32,
    pub name: String,
    pub mac: String,
    pub manufacturer: String,
    /// `None` until presence has been reported
    #[serde(default)]
    pub present: Option<bool>,
    #[serde(default)]
    pub presence_updated_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn presence_fact(&self) -> Option<SnapshotFact> {
        let present = self.present?;
        let observed_at = self.presence_updated_at?;
        Some(SnapshotFact {
            category: Category::Presence,
            key: FactKey::Presence { device_id: self.id },
            value: if present { 1.0 } else { 0.0 },
            unit: Unit::Flag,
            observed_at,
        })
    }
}

/// Device fields supplied by clients; id and presence are managed by the store
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub mac: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
}
