//! Snapshot fact storage
//!
//! Prices and the device inventory live in Fjall partitions. The exporter
//! only sees them through [`FactStore`], a read-only view answering "what
//! is the current value of this fact" relative to a calendar day.

pub mod error;
pub mod fjall_store;
pub mod memory;
pub mod models;
pub mod partitions;
pub mod vendor;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::registers::{Day, FactKey};

pub use error::{Result, StoreError};
pub use fjall_store::{FjallStore, StoreStats};
pub use memory::MemoryStore;
pub use models::{Category, Device, DeviceSpec, PriceRecord, SnapshotFact, Unit};
pub use vendor::manufacturer_for_mac;

/// Read-only view of current snapshot facts
///
/// `Ok(None)` means the fact is missing. An `Err` means the store could not
/// answer at all.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn get_fact(&self, key: &FactKey, as_of: NaiveDate) -> Result<Option<SnapshotFact>>;
}

/// Calendar date a relative day refers to
pub fn fact_date(day: Day, as_of: NaiveDate) -> Option<NaiveDate> {
    as_of.checked_add_days(Days::new(day.offset_days()))
}
