use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registers::{AddressMap, RegisterValue};

/// One complete, internally consistent set of register values
///
/// Tables are built whole and never edited afterwards. Generation 0 is the
/// all-default table published before the first successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    pub generation: u64,
    pub built_at: Option<DateTime<Utc>>,
    pub values: BTreeMap<u16, RegisterValue>,
}

impl ExportTable {
    pub fn initial(map: &AddressMap, default_value: RegisterValue) -> Self {
        Self {
            generation: 0,
            built_at: None,
            values: map
                .entries()
                .iter()
                .map(|entry| (entry.address, default_value))
                .collect(),
        }
    }

    pub fn get(&self, address: u16) -> Option<RegisterValue> {
        self.values.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values for `count` consecutive addresses; unmapped addresses read as 0
    pub fn read_span(&self, start: u16, count: u16) -> Vec<RegisterValue> {
        (0..count)
            .map(|offset| {
                start
                    .checked_add(offset)
                    .and_then(|address| self.get(address))
                    .unwrap_or(0)
            })
            .collect()
    }
}
