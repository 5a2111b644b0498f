use crate::humanize::HumanDuration;
use crate::registers::RoundingPolicy;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub registers: RegistersConfig,
    #[serde(default)]
    pub modbus: ModbusConfig,
    #[serde(default)]
    pub prices: PricesConfig,
}

/// HTTP server and store location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            store_path: default_store_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/spotreg")
}

/// Refresh cadence and register encoding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterConfig {
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
    /// Upper bound for one refresh; exceeding it counts as a failed cycle
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout: HumanDuration,
    #[serde(default = "default_register_width_bits")]
    pub register_width_bits: u8,
    /// Register value written when a fact is missing
    #[serde(default)]
    pub default_value: i64,
    #[serde(default)]
    pub rounding: RoundingPolicy,
    /// Offset from UTC used to decide which date is "today"
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ExporterConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_refresh_interval_seconds(),
            refresh_timeout: default_refresh_timeout(),
            register_width_bits: default_register_width_bits(),
            default_value: 0,
            rounding: RoundingPolicy::default(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_refresh_interval_seconds() -> u64 {
    300
}

fn default_refresh_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_register_width_bits() -> u8 {
    16
}

/// Address space layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistersConfig {
    #[serde(default)]
    pub address_min: u16,
    #[serde(default = "default_address_max")]
    pub address_max: u16,
    /// Presence registers in the standard layout (devices 1..=N)
    #[serde(default = "default_presence_slots")]
    pub presence_slots: u32,
    /// Explicit entries; when empty the standard layout is used
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
    /// Per-entry scale factor overrides, keyed by entry key
    #[serde(default)]
    pub value_scale: BTreeMap<String, f64>,
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            address_min: 0,
            address_max: default_address_max(),
            presence_slots: default_presence_slots(),
            entries: Vec::new(),
            value_scale: BTreeMap::new(),
        }
    }
}

fn default_address_max() -> u16 {
    9999
}

fn default_presence_slots() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryConfig {
    pub key: String,
    pub address: u16,
    #[serde(default)]
    pub scale: Option<f64>,
}

/// Modbus TCP adapter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModbusConfig {
    #[serde(default = "default_modbus_enabled")]
    pub enabled: bool,
    #[serde(default = "default_modbus_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: default_modbus_enabled(),
            bind_addr: default_modbus_bind_addr(),
        }
    }
}

fn default_modbus_enabled() -> bool {
    true
}

// 502 needs elevated privileges on most hosts
fn default_modbus_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5020))
}

/// Price lookup API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricesConfig {
    /// Generate sample prices for unknown dates near today
    #[serde(default)]
    pub generate_missing: bool,
    /// Days of history the sample generator and on-demand generation cover
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            generate_missing: false,
            history_days: default_history_days(),
        }
    }
}

fn default_history_days() -> u32 {
    30
}
