use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::{Result, StoreError};
use super::models::{Device, PriceRecord, SnapshotFact};
use super::{FactStore, fact_date};
use crate::registers::FactKey;

/// In-process fact store for tests and dry runs
///
/// Can be switched into an unavailable state where every read fails, which
/// is how refresh failure paths are exercised.
#[derive(Debug)]
pub struct MemoryStore {
    prices: RwLock<BTreeMap<(NaiveDate, u8), PriceRecord>>,
    devices: RwLock<HashMap<u32, Device>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(BTreeMap::new()),
            devices: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn put_price(&self, record: PriceRecord) -> Result<()> {
        let mut prices = self
            .prices
            .write()
            .map_err(|_| StoreError::Unavailable("price map poisoned".to_string()))?;
        prices.insert((record.date, record.hour), record);
        Ok(())
    }

    pub fn put_device(&self, device: Device) -> Result<()> {
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StoreError::Unavailable("device map poisoned".to_string()))?;
        devices.insert(device.id, device);
        Ok(())
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn get_fact(&self, key: &FactKey, as_of: NaiveDate) -> Result<Option<SnapshotFact>> {
        self.check_available()?;

        match *key {
            FactKey::Price { day, hour } => {
                let Some(date) = fact_date(day, as_of) else {
                    return Ok(None);
                };
                let prices = self
                    .prices
                    .read()
                    .map_err(|_| StoreError::Unavailable("price map poisoned".to_string()))?;
                Ok(prices.get(&(date, hour)).map(|record| record.to_fact(*key)))
            }
            FactKey::Presence { device_id } => {
                let devices = self
                    .devices
                    .read()
                    .map_err(|_| StoreError::Unavailable("device map poisoned".to_string()))?;
                Ok(devices.get(&device_id).and_then(Device::presence_fact))
            }
        }
    }
}
