use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use super::key::{Day, EntryKey, FactKey, KeyParseError};
use super::transform::Transform;
use crate::config::RegistersConfig;

/// Standard layout base addresses
pub const TODAY_PRICE_BASE: u16 = 1000;
pub const TODAY_PRICE_MINOR_BASE: u16 = 1100;
pub const TOMORROW_PRICE_BASE: u16 = 2000;
pub const TOMORROW_PRICE_MINOR_BASE: u16 = 2100;
pub const PRESENCE_BASE: u16 = 3000;

/// EUR/MWh -> ct/kWh
pub const MINOR_UNIT_SCALE: f64 = 0.1;
pub const MINOR_LABEL: &str = "minor";

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("address {address} is assigned to both '{first}' and '{second}'")]
    DuplicateAddress {
        address: u16,
        first: EntryKey,
        second: EntryKey,
    },

    #[error("entry key '{0}' is defined more than once")]
    DuplicateKey(EntryKey),

    #[error("address {address} of '{key}' is outside the valid range {min}..={max}")]
    AddressOutOfRange {
        key: EntryKey,
        address: u16,
        min: u16,
        max: u16,
    },

    #[error("invalid address range {min}..={max}")]
    InvalidRange { min: u16, max: u16 },

    #[error("scale factor {factor} for '{key}' must be finite and non-zero")]
    InvalidScale { key: String, factor: f64 },

    #[error("invalid entry key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: KeyParseError,
    },

    #[error("value_scale references unknown entry '{0}'")]
    UnknownScaleOverride(String),

    #[error("standard layout supports at most {max} presence slots, got {requested}")]
    TooManyPresenceSlots { requested: u32, max: u32 },
}

/// Inclusive range of valid register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressRange {
    pub min: u16,
    pub max: u16,
}

impl AddressRange {
    pub fn new(min: u16, max: u16) -> Result<Self, ConfigurationError> {
        if min > max {
            return Err(ConfigurationError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, address: u16) -> bool {
        (self.min..=self.max).contains(&address)
    }

    /// True if `count` registers starting at `start` all fall in range
    pub fn contains_span(&self, start: u16, count: u16) -> bool {
        if count == 0 {
            return false;
        }
        let end = start as u32 + count as u32 - 1;
        self.contains(start) && end <= self.max as u32
    }
}

impl Default for AddressRange {
    fn default() -> Self {
        Self { min: 0, max: 9999 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressEntry {
    pub address: u16,
    pub key: EntryKey,
    pub transform: Transform,
}

impl AddressEntry {
    pub fn new(address: u16, key: EntryKey, transform: Transform) -> Self {
        Self {
            address,
            key,
            transform,
        }
    }

    pub fn fact(&self) -> FactKey {
        self.key.fact()
    }
}

/// Validated, read-only mapping of entry keys to register addresses
#[derive(Debug, Clone)]
pub struct AddressMap {
    range: AddressRange,
    entries: Vec<AddressEntry>,
    by_key: HashMap<String, usize>,
}

impl AddressMap {
    /// Build a map, rejecting duplicate addresses/keys and out-of-range addresses
    pub fn new(
        entries: Vec<AddressEntry>,
        range: AddressRange,
    ) -> Result<Self, ConfigurationError> {
        let mut entries = entries;
        let mut seen_keys = HashSet::with_capacity(entries.len());

        for entry in &entries {
            if !range.contains(entry.address) {
                return Err(ConfigurationError::AddressOutOfRange {
                    key: entry.key.clone(),
                    address: entry.address,
                    min: range.min,
                    max: range.max,
                });
            }
            if let Transform::Scale(factor) = entry.transform {
                if !factor.is_finite() || factor == 0.0 {
                    return Err(ConfigurationError::InvalidScale {
                        key: entry.key.to_string(),
                        factor,
                    });
                }
            }
            if !seen_keys.insert(entry.key.as_str()) {
                return Err(ConfigurationError::DuplicateKey(entry.key.clone()));
            }
        }

        // Stable sort keeps the declaration order of colliding entries
        entries.sort_by_key(|e| e.address);
        for pair in entries.windows(2) {
            if pair[0].address == pair[1].address {
                return Err(ConfigurationError::DuplicateAddress {
                    address: pair[0].address,
                    first: pair[0].key.clone(),
                    second: pair[1].key.clone(),
                });
            }
        }

        let by_key = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.key.as_str().to_string(), idx))
            .collect();

        debug!(entries = entries.len(), min = range.min, max = range.max, "Address map built");

        Ok(Self {
            range,
            entries,
            by_key,
        })
    }

    /// Default layout used when no explicit entries are configured
    ///
    /// | addresses   | content                          |
    /// |-------------|----------------------------------|
    /// | 1000-1023   | today's hourly price, EUR/MWh    |
    /// | 1100-1123   | today's hourly price, ct/kWh     |
    /// | 2000-2023   | tomorrow's hourly price, EUR/MWh |
    /// | 2100-2123   | tomorrow's hourly price, ct/kWh  |
    /// | 3000-       | presence of device 1.., 1 or 0   |
    pub fn standard(presence_slots: u32) -> Vec<AddressEntry> {
        let mut entries = Vec::with_capacity(96 + presence_slots as usize);

        let blocks = [
            (Day::Today, TODAY_PRICE_BASE, TODAY_PRICE_MINOR_BASE),
            (Day::Tomorrow, TOMORROW_PRICE_BASE, TOMORROW_PRICE_MINOR_BASE),
        ];
        for (day, base, minor_base) in blocks {
            for hour in 0..24u8 {
                let fact = FactKey::Price { day, hour };
                entries.push(AddressEntry::new(
                    base + hour as u16,
                    EntryKey::with_label(fact, None),
                    Transform::Identity,
                ));
                entries.push(AddressEntry::new(
                    minor_base + hour as u16,
                    EntryKey::with_label(fact, Some(MINOR_LABEL)),
                    Transform::Scale(MINOR_UNIT_SCALE),
                ));
            }
        }

        for slot in 0..presence_slots {
            let fact = FactKey::Presence {
                device_id: slot + 1,
            };
            entries.push(AddressEntry::new(
                PRESENCE_BASE + slot as u16,
                EntryKey::with_label(fact, None),
                Transform::Identity,
            ));
        }

        entries
    }

    /// Build from the `[registers]` config section
    ///
    /// Uses the standard layout unless explicit `entries` are configured, then
    /// applies `value_scale` overrides by entry key.
    pub fn from_config(config: &RegistersConfig) -> Result<Self, ConfigurationError> {
        let range = AddressRange::new(config.address_min, config.address_max)?;

        let mut entries = if config.entries.is_empty() {
            let max = (u16::MAX - PRESENCE_BASE) as u32 + 1;
            if config.presence_slots > max {
                return Err(ConfigurationError::TooManyPresenceSlots {
                    requested: config.presence_slots,
                    max,
                });
            }
            Self::standard(config.presence_slots)
        } else {
            config
                .entries
                .iter()
                .map(|e| {
                    let key: EntryKey =
                        e.key.parse().map_err(|source| ConfigurationError::InvalidKey {
                            key: e.key.clone(),
                            source,
                        })?;
                    Ok(AddressEntry::new(e.address, key, Transform::from_factor(e.scale)))
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?
        };

        for (key, factor) in &config.value_scale {
            let entry = entries
                .iter_mut()
                .find(|e| e.key.as_str() == key)
                .ok_or_else(|| ConfigurationError::UnknownScaleOverride(key.clone()))?;
            entry.transform = Transform::from_factor(Some(*factor));
        }

        Self::new(entries, range)
    }

    pub fn resolve(&self, key: &str) -> Option<u16> {
        self.by_key.get(key).map(|idx| self.entries[*idx].address)
    }

    pub fn get(&self, key: &str) -> Option<&AddressEntry> {
        self.by_key.get(key).map(|idx| &self.entries[*idx])
    }

    /// Entries ordered by address
    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryConfig;
    use std::collections::BTreeMap;

    fn entry(address: u16, key: &str) -> AddressEntry {
        AddressEntry::new(address, key.parse().unwrap(), Transform::Identity)
    }

    #[test]
    fn test_standard_layout() {
        let map = AddressMap::new(AddressMap::standard(30), AddressRange::default()).unwrap();
        assert_eq!(map.len(), 96 + 30);
        assert_eq!(map.resolve("price.today.0"), Some(1000));
        assert_eq!(map.resolve("price.today.23.minor"), Some(1123));
        assert_eq!(map.resolve("price.tomorrow.5"), Some(2005));
        assert_eq!(map.resolve("price.tomorrow.5.minor"), Some(2105));
        assert_eq!(map.resolve("presence.1"), Some(3000));
        assert_eq!(map.resolve("presence.30"), Some(3029));
        assert_eq!(map.resolve("presence.31"), None);

        let minor = map.get("price.today.7.minor").unwrap();
        assert_eq!(minor.transform, Transform::Scale(MINOR_UNIT_SCALE));
    }

    #[test]
    fn test_entries_sorted_by_address() {
        let map = AddressMap::new(
            vec![entry(20, "presence.2"), entry(10, "presence.1")],
            AddressRange::default(),
        )
        .unwrap();
        let addresses: Vec<u16> = map.entries().iter().map(|e| e.address).collect();
        assert_eq!(addresses, vec![10, 20]);
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let result = AddressMap::new(
            vec![entry(10, "presence.1"), entry(10, "presence.2")],
            AddressRange::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateAddress { address: 10, .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = AddressMap::new(
            vec![entry(10, "presence.1"), entry(11, "presence.1")],
            AddressRange::default(),
        );
        assert!(matches!(result, Err(ConfigurationError::DuplicateKey(_))));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let range = AddressRange::new(100, 200).unwrap();
        let result = AddressMap::new(vec![entry(201, "presence.1")], range);
        assert!(matches!(
            result,
            Err(ConfigurationError::AddressOutOfRange { address: 201, .. })
        ));
        assert!(AddressRange::new(5, 4).is_err());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let bad = AddressEntry::new(1, "presence.1".parse().unwrap(), Transform::Scale(0.0));
        let result = AddressMap::new(vec![bad], AddressRange::default());
        assert!(matches!(result, Err(ConfigurationError::InvalidScale { .. })));
    }

    #[test]
    fn test_contains_span() {
        let range = AddressRange::new(1000, 1023).unwrap();
        assert!(range.contains_span(1000, 24));
        assert!(!range.contains_span(1000, 25));
        assert!(!range.contains_span(999, 2));
        assert!(!range.contains_span(1000, 0));
        assert!(!AddressRange::new(0, u16::MAX).unwrap().contains_span(u16::MAX, 2));
    }

    #[test]
    fn test_from_config_custom_entries_and_overrides() {
        let mut value_scale = BTreeMap::new();
        value_scale.insert("price.today.7.minor".to_string(), 0.1);

        let config = RegistersConfig {
            address_min: 1000,
            address_max: 1999,
            presence_slots: 0,
            entries: vec![
                EntryConfig {
                    key: "price.today.7".to_string(),
                    address: 1007,
                    scale: None,
                },
                EntryConfig {
                    key: "price.today.7.minor".to_string(),
                    address: 1107,
                    scale: None,
                },
            ],
            value_scale,
        };

        let map = AddressMap::from_config(&config).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("price.today.7").unwrap().transform, Transform::Identity);
        assert_eq!(
            map.get("price.today.7.minor").unwrap().transform,
            Transform::Scale(0.1)
        );
    }

    #[test]
    fn test_from_config_unknown_override() {
        let mut config = RegistersConfig::default();
        config
            .value_scale
            .insert("price.today.99".to_string(), 2.0);
        assert!(matches!(
            AddressMap::from_config(&config),
            Err(ConfigurationError::UnknownScaleOverride(_))
        ));
    }

    #[test]
    fn test_from_config_invalid_key() {
        let config = RegistersConfig {
            entries: vec![EntryConfig {
                key: "voltage.1".to_string(),
                address: 1,
                scale: None,
            }],
            ..RegistersConfig::default()
        };
        assert!(matches!(
            AddressMap::from_config(&config),
            Err(ConfigurationError::InvalidKey { .. })
        ));
    }
}
