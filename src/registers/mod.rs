//! Address space map: semantic entry keys -> integer register addresses
//!
//! The map is built once at startup from configuration and validated:
//! - every address is unique
//! - every entry key is unique
//! - every address lies inside the configured range
//!
//! After construction it is read-only; exporter cycles and protocol
//! adapters share it behind an `Arc`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spotreg::registers::{AddressMap, AddressRange};
//!
//! let map = AddressMap::new(AddressMap::standard(30), AddressRange::default())?;
//! assert_eq!(map.resolve("price.today.7.minor"), Some(1107));
//! ```

mod key;
mod map;
mod transform;

pub use key::{Day, EntryKey, FactKey, KeyParseError};
pub use map::{
    AddressEntry, AddressMap, AddressRange, ConfigurationError, MINOR_UNIT_SCALE,
    PRESENCE_BASE, TODAY_PRICE_BASE, TODAY_PRICE_MINOR_BASE, TOMORROW_PRICE_BASE,
    TOMORROW_PRICE_MINOR_BASE,
};
pub use transform::{RegisterValue, RegisterWidth, RoundingPolicy, Transform, ValueEncoder};
