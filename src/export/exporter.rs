use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tracing::{debug, info, warn};

use super::error::ExportError;
use super::table::ExportTable;
use crate::config::{ExporterConfig, ValidationError};
use crate::registers::{AddressMap, FactKey, RegisterWidth, ValueEncoder};
use crate::store::FactStore;

/// Encoding and timing knobs for one exporter
#[derive(Debug, Clone, Copy)]
pub struct ExportSettings {
    pub encoder: ValueEncoder,
    pub timeout: Duration,
    pub utc_offset: FixedOffset,
}

impl ExportSettings {
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ValidationError> {
        let width = RegisterWidth::new(config.register_width_bits).ok_or(
            ValidationError::InvalidRegisterWidth {
                bits: config.register_width_bits,
                min: RegisterWidth::MIN_BITS,
                max: RegisterWidth::MAX_BITS,
            },
        )?;
        let utc_offset = config.utc_offset().ok_or(ValidationError::InvalidUtcOffset {
            minutes: config.utc_offset_minutes,
        })?;

        Ok(Self {
            encoder: ValueEncoder {
                rounding: config.rounding,
                width,
                default_value: config.default_value,
            },
            timeout: config.refresh_timeout.as_duration(),
            utc_offset,
        })
    }

    /// Calendar date that counts as "today" at `now`
    pub fn trading_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.utc_offset).date_naive()
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            encoder: ValueEncoder::default(),
            timeout: Duration::from_secs(30),
            utc_offset: Utc.fix(),
        }
    }
}

/// Pulls facts from the store and publishes complete register tables
pub struct Exporter {
    map: Arc<AddressMap>,
    store: Arc<dyn FactStore>,
    settings: ExportSettings,
    table: ArcSwap<ExportTable>,
    generation: AtomicU64,
}

impl Exporter {
    pub fn new(map: Arc<AddressMap>, store: Arc<dyn FactStore>, settings: ExportSettings) -> Self {
        let initial = ExportTable::initial(&map, settings.encoder.default_value);
        Self {
            map,
            store,
            settings,
            table: ArcSwap::from_pointee(initial),
            generation: AtomicU64::new(0),
        }
    }

    pub fn map(&self) -> &Arc<AddressMap> {
        &self.map
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Last published table; never waits on a refresh
    pub fn current_table(&self) -> Arc<ExportTable> {
        self.table.load_full()
    }

    /// Build a new table from the store and publish it
    ///
    /// On error nothing is published and the previous table stays current.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Arc<ExportTable>, ExportError> {
        let timeout = self.settings.timeout;
        let values = tokio::time::timeout(timeout, self.build_values(now))
            .await
            .map_err(|_| {
                warn!(?timeout, "Refresh exceeded timeout");
                ExportError::Timeout(timeout)
            })??;

        let table = Arc::new(ExportTable {
            generation: self.generation.fetch_add(1, Ordering::AcqRel) + 1,
            built_at: Some(now),
            values,
        });
        self.table.store(Arc::clone(&table));

        info!(
            generation = table.generation,
            registers = table.len(),
            "Published export table"
        );
        Ok(table)
    }

    async fn build_values(&self, now: DateTime<Utc>) -> Result<BTreeMap<u16, i64>, ExportError> {
        let as_of = self.settings.trading_day(now);
        // Several entries can mirror one fact (major and minor units)
        let mut facts: HashMap<FactKey, Option<f64>> = HashMap::new();
        let mut values = BTreeMap::new();
        let mut missing = 0usize;

        for entry in self.map.entries() {
            let fact_key = entry.fact();
            let raw = match facts.get(&fact_key) {
                Some(raw) => *raw,
                None => {
                    let raw = self
                        .store
                        .get_fact(&fact_key, as_of)
                        .await
                        .map_err(|e| ExportError::StoreUnavailable(e.to_string()))?
                        .map(|fact| fact.value);
                    facts.insert(fact_key, raw);
                    // Give the refresh timeout a chance to fire between reads
                    tokio::task::yield_now().await;
                    raw
                }
            };

            if raw.is_none() {
                missing += 1;
            }
            values.insert(entry.address, self.settings.encoder.encode(entry.transform, raw));
        }

        debug!(%as_of, entries = values.len(), missing, "Built register values");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{AddressEntry, AddressRange, EntryKey, RoundingPolicy, Transform};
    use crate::store::{MemoryStore, PriceRecord};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn price(date: NaiveDate, hour: u8, value: f64) -> PriceRecord {
        PriceRecord {
            date,
            hour,
            price: value,
            source: "test".to_string(),
            created_at: now(),
        }
    }

    fn two_entry_map() -> Arc<AddressMap> {
        let entries = vec![
            AddressEntry::new(1007, "price.today.7".parse::<EntryKey>().unwrap(), Transform::Identity),
            AddressEntry::new(
                1107,
                "price.today.7.minor".parse::<EntryKey>().unwrap(),
                Transform::Scale(0.1),
            ),
        ];
        Arc::new(AddressMap::new(entries, AddressRange::default()).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_truncates_minor_units() {
        let store = Arc::new(MemoryStore::new());
        store.put_price(price(now().date_naive(), 7, 85.5)).unwrap();

        let exporter = Exporter::new(two_entry_map(), store, ExportSettings::default());
        let table = exporter.refresh(now()).await.unwrap();

        assert_eq!(table.generation, 1);
        assert_eq!(table.get(1007), Some(85));
        assert_eq!(table.get(1107), Some(8));
        assert_eq!(exporter.current_table(), table);
    }

    #[tokio::test]
    async fn test_half_even_rounding() {
        let store = Arc::new(MemoryStore::new());
        store.put_price(price(now().date_naive(), 7, 85.5)).unwrap();

        let mut settings = ExportSettings::default();
        settings.encoder.rounding = RoundingPolicy::HalfEven;
        let exporter = Exporter::new(two_entry_map(), store, settings);
        let table = exporter.refresh(now()).await.unwrap();

        assert_eq!(table.get(1007), Some(86));
        assert_eq!(table.get(1107), Some(9));
    }

    #[tokio::test]
    async fn test_utc_offset_moves_trading_day() {
        let store = Arc::new(MemoryStore::new());
        // 23:30 UTC is already the next day at UTC+1
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        store.put_price(price(next_day, 7, 50.0)).unwrap();

        let settings = ExportSettings {
            utc_offset: FixedOffset::east_opt(3600).unwrap(),
            ..ExportSettings::default()
        };
        let exporter = Exporter::new(two_entry_map(), store, settings);
        let table = exporter.refresh(late).await.unwrap();

        assert_eq!(table.get(1007), Some(50));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let store = Arc::new(MemoryStore::new());
        store.put_price(price(now().date_naive(), 7, 85.5)).unwrap();
        let exporter = Exporter::new(two_entry_map(), store.clone(), ExportSettings::default());

        let first = exporter.refresh(now()).await.unwrap();
        store.set_available(false);
        let err = exporter.refresh(now()).await.unwrap_err();

        assert!(matches!(err, ExportError::StoreUnavailable(_)));
        assert_eq!(exporter.current_table(), first);
    }

    #[test]
    fn test_settings_from_config() {
        let config = ExporterConfig {
            register_width_bits: 8,
            default_value: -1,
            utc_offset_minutes: 60,
            ..ExporterConfig::default()
        };
        let settings = ExportSettings::from_config(&config).unwrap();

        assert_eq!(settings.encoder.width.max(), 127);
        assert_eq!(settings.encoder.default_value, -1);
        assert_eq!(
            settings.trading_day(Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap()),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
    }

    #[test]
    fn test_settings_reject_bad_width() {
        let config = ExporterConfig {
            register_width_bits: 64,
            ..ExporterConfig::default()
        };
        assert!(matches!(
            ExportSettings::from_config(&config),
            Err(ValidationError::InvalidRegisterWidth { bits: 64, .. })
        ));
    }
}
