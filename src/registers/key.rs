//! Entry keys and the snapshot facts they mirror
//!
//! Key grammar:
//! - `price.<today|tomorrow>.<hour>[.<label>]`
//! - `presence.<device_id>[.<label>]`
//!
//! The optional label distinguishes several registers that mirror the same
//! fact with different transforms (e.g. `price.today.7` and
//! `price.today.7.minor`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("key is empty")]
    Empty,

    #[error("unknown category '{0}', expected 'price' or 'presence'")]
    UnknownCategory(String),

    #[error("invalid day '{0}', expected 'today' or 'tomorrow'")]
    InvalidDay(String),

    #[error("invalid hour '{0}', expected 0-23")]
    InvalidHour(String),

    #[error("invalid device id '{0}'")]
    InvalidDeviceId(String),

    #[error("invalid label '{0}', expected [a-z0-9_]+")]
    InvalidLabel(String),

    #[error("unexpected trailing segments")]
    TrailingSegments,
}

/// Trading day relative to the refresh instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    pub fn offset_days(self) -> u64 {
        match self {
            Day::Today => 0,
            Day::Tomorrow => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Today => "today",
            Day::Tomorrow => "tomorrow",
        }
    }
}

/// Identifies one fact in the snapshot store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum FactKey {
    Price { day: Day, hour: u8 },
    Presence { device_id: u32 },
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactKey::Price { day, hour } => write!(f, "price.{}.{}", day.as_str(), hour),
            FactKey::Presence { device_id } => write!(f, "presence.{}", device_id),
        }
    }
}

/// Name of one address-map entry, e.g. `price.today.7.minor`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryKey {
    raw: String,
    fact: FactKey,
}

impl EntryKey {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The fact this entry mirrors
    pub fn fact(&self) -> FactKey {
        self.fact
    }

    pub(crate) fn with_label(fact: FactKey, label: Option<&str>) -> Self {
        let raw = match label {
            Some(label) => format!("{fact}.{label}"),
            None => fact.to_string(),
        };
        Self { raw, fact }
    }
}

impl FromStr for EntryKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut parts = s.split('.');
        let category = parts.next().unwrap_or_default();

        let fact = match category {
            "price" => {
                let day = match parts.next() {
                    Some("today") => Day::Today,
                    Some("tomorrow") => Day::Tomorrow,
                    other => return Err(KeyParseError::InvalidDay(other.unwrap_or_default().to_string())),
                };
                let hour_str = parts.next().unwrap_or_default();
                let hour: u8 = hour_str
                    .parse()
                    .ok()
                    .filter(|h| *h < 24)
                    .ok_or_else(|| KeyParseError::InvalidHour(hour_str.to_string()))?;
                FactKey::Price { day, hour }
            }
            "presence" => {
                let id_str = parts.next().unwrap_or_default();
                let device_id: u32 = id_str
                    .parse()
                    .map_err(|_| KeyParseError::InvalidDeviceId(id_str.to_string()))?;
                FactKey::Presence { device_id }
            }
            other => return Err(KeyParseError::UnknownCategory(other.to_string())),
        };

        if let Some(label) = parts.next() {
            let valid = !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid {
                return Err(KeyParseError::InvalidLabel(label.to_string()));
            }
        }

        if parts.next().is_some() {
            return Err(KeyParseError::TrailingSegments);
        }

        Ok(Self {
            raw: s.to_string(),
            fact,
        })
    }
}

impl TryFrom<String> for EntryKey {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryKey> for String {
    fn from(key: EntryKey) -> Self {
        key.raw
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
