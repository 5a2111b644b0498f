use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::models::{Device, DeviceSpec, PriceRecord, SnapshotFact};
use super::partitions::{
    decode_device_key, decode_price_key, encode_device_key, encode_price_key,
    encode_price_prefix,
};
use super::vendor::manufacturer_for_mac;
use super::{FactStore, fact_date};
use crate::registers::FactKey;

/// Fjall-backed persistent storage for prices and the device inventory
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    prices: PartitionHandle,
    devices: PartitionHandle,
    // Serializes id allocation and read-modify-write of device rows
    device_lock: Arc<Mutex<()>>,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let prices = keyspace.open_partition("prices", PartitionCreateOptions::default())?;
        let devices = keyspace.open_partition("devices", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            prices,
            devices,
            device_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Store or replace one hourly price
    pub fn put_price(&self, record: &PriceRecord) -> Result<()> {
        if record.hour > 23 {
            return Err(StoreError::InvalidKey(format!("hour {}", record.hour)));
        }
        let key = encode_price_key(record.date, record.hour);
        let value = serde_json::to_vec(record)?;
        self.prices.insert(key, value)?;
        debug!(date = %record.date, hour = record.hour, price = record.price, "Upserted price");
        Ok(())
    }

    pub fn put_prices(&self, records: &[PriceRecord]) -> Result<usize> {
        for record in records {
            self.put_price(record)?;
        }
        Ok(records.len())
    }

    pub fn price(&self, date: NaiveDate, hour: u8) -> Result<Option<PriceRecord>> {
        match self.prices.get(encode_price_key(date, hour))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All hourly prices of one day, ordered by hour
    pub fn prices_for_date(&self, date: NaiveDate) -> Result<Vec<PriceRecord>> {
        let mut records = Vec::new();
        for item in self.prices.prefix(encode_price_prefix(date)) {
            let (_, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    /// Dates with at least one price, newest first
    pub fn available_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = BTreeSet::new();
        for item in self.prices.iter() {
            let (key, _) = item?;
            let (date, _) = decode_price_key(&key)
                .ok_or_else(|| StoreError::InvalidKey(String::from_utf8_lossy(&key).into_owned()))?;
            dates.insert(date);
        }
        Ok(dates.into_iter().rev().collect())
    }

    pub fn list_devices(&self) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        for item in self.devices.iter() {
            let (_, value) = item?;
            devices.push(serde_json::from_slice(&value)?);
        }
        Ok(devices)
    }

    pub fn get_device(&self, id: u32) -> Result<Option<Device>> {
        match self.devices.get(encode_device_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Add a device with the next free id (highest id + 1)
    pub fn create_device(&self, spec: DeviceSpec) -> Result<Device> {
        let _guard = self.lock_devices()?;

        let next_id = match self.devices.iter().next_back() {
            Some(item) => {
                let (key, _) = item?;
                let last = decode_device_key(&key).ok_or_else(|| {
                    StoreError::InvalidKey(String::from_utf8_lossy(&key).into_owned())
                })?;
                last.checked_add(1).ok_or(StoreError::IdsExhausted)?
            }
            None => 1,
        };

        let device = Device {
            id: next_id,
            manufacturer: resolve_manufacturer(&spec),
            name: spec.name,
            mac: spec.mac,
            present: None,
            presence_updated_at: None,
        };
        self.write_device(&device)?;
        info!(id = device.id, mac = %device.mac, "Device added");
        Ok(device)
    }

    /// Replace name/mac/manufacturer; presence state is kept
    pub fn update_device(&self, id: u32, spec: DeviceSpec) -> Result<Device> {
        let _guard = self.lock_devices()?;

        let existing = self.get_device(id)?.ok_or(StoreError::DeviceNotFound(id))?;
        let device = Device {
            id,
            manufacturer: resolve_manufacturer(&spec),
            name: spec.name,
            mac: spec.mac,
            present: existing.present,
            presence_updated_at: existing.presence_updated_at,
        };
        self.write_device(&device)?;
        debug!(id, "Device updated");
        Ok(device)
    }

    pub fn delete_device(&self, id: u32) -> Result<()> {
        let _guard = self.lock_devices()?;

        let key = encode_device_key(id);
        if !self.devices.contains_key(&key)? {
            return Err(StoreError::DeviceNotFound(id));
        }
        self.devices.remove(key)?;
        info!(id, "Device deleted");
        Ok(())
    }

    /// Record reported presence for a device
    pub fn set_presence(&self, id: u32, present: bool, at: DateTime<Utc>) -> Result<Device> {
        let _guard = self.lock_devices()?;

        let mut device = self.get_device(id)?.ok_or(StoreError::DeviceNotFound(id))?;
        device.present = Some(present);
        device.presence_updated_at = Some(at);
        self.write_device(&device)?;
        debug!(id, present, "Presence recorded");
        Ok(device)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut price_count = 0;
        let mut device_count = 0;

        for item in self.prices.iter() {
            item?;
            price_count += 1;
        }

        for item in self.devices.iter() {
            item?;
            device_count += 1;
        }

        Ok(StoreStats {
            price_count,
            device_count,
        })
    }

    fn write_device(&self, device: &Device) -> Result<()> {
        let value = serde_json::to_vec(device)?;
        self.devices.insert(encode_device_key(device.id), value)?;
        Ok(())
    }

    fn lock_devices(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.device_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("device lock poisoned".to_string()))
    }
}

fn resolve_manufacturer(spec: &DeviceSpec) -> String {
    spec.manufacturer
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| manufacturer_for_mac(&spec.mac).to_string())
}

impl FjallStore {
    fn read_fact(&self, key: FactKey, as_of: NaiveDate) -> Result<Option<SnapshotFact>> {
        match key {
            FactKey::Price { day, hour } => {
                let Some(date) = fact_date(day, as_of) else {
                    return Ok(None);
                };
                Ok(self.price(date, hour)?.map(|record| record.to_fact(key)))
            }
            FactKey::Presence { device_id } => {
                Ok(self.get_device(device_id)?.and_then(|d| d.presence_fact()))
            }
        }
    }
}

#[async_trait]
impl FactStore for FjallStore {
    // Fjall reads block on disk; keep them off the runtime workers
    async fn get_fact(&self, key: &FactKey, as_of: NaiveDate) -> Result<Option<SnapshotFact>> {
        let store = self.clone();
        let key = *key;
        tokio::task::spawn_blocking(move || store.read_fact(key, as_of))
            .await
            .map_err(|e| StoreError::Unavailable(format!("fact read task failed: {e}")))?
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub price_count: usize,
    pub device_count: usize,
}
