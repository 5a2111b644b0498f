use super::models::Config;
use crate::registers::{AddressMap, ConfigurationError, RegisterWidth};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("refresh_interval_seconds must be positive")]
    InvalidRefreshInterval,

    #[error("refresh_timeout must be positive")]
    InvalidRefreshTimeout,

    #[error("register_width_bits must be between {min} and {max}, got {bits}")]
    InvalidRegisterWidth { bits: u8, min: u8, max: u8 },

    #[error("default_value {value} does not fit a {bits}-bit register ({min}..={max})")]
    DefaultValueOutOfRange {
        value: i64,
        bits: u8,
        min: i64,
        max: i64,
    },

    #[error("utc_offset_minutes must be within +/-1439, got {minutes}")]
    InvalidUtcOffset { minutes: i32 },

    #[error("Modbus registers are 16 bits wide but register_width_bits is {bits}")]
    ModbusRegisterWidth { bits: u8 },

    #[error("history_days must be positive")]
    InvalidHistoryDays,

    #[error("Address map: {0}")]
    AddressMap(#[from] ConfigurationError),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_exporter(config)?;
    validate_modbus(config)?;
    validate_prices(config)?;
    validate_registers(config)?;
    Ok(())
}

fn validate_exporter(config: &Config) -> Result<(), ValidationError> {
    let exporter = &config.exporter;

    if exporter.refresh_interval_seconds == 0 {
        return Err(ValidationError::InvalidRefreshInterval);
    }

    if exporter.refresh_timeout.is_zero() {
        return Err(ValidationError::InvalidRefreshTimeout);
    }

    let width = RegisterWidth::new(exporter.register_width_bits).ok_or(
        ValidationError::InvalidRegisterWidth {
            bits: exporter.register_width_bits,
            min: RegisterWidth::MIN_BITS,
            max: RegisterWidth::MAX_BITS,
        },
    )?;

    if !width.contains(exporter.default_value) {
        return Err(ValidationError::DefaultValueOutOfRange {
            value: exporter.default_value,
            bits: width.bits(),
            min: width.min(),
            max: width.max(),
        });
    }

    if exporter.utc_offset().is_none() {
        return Err(ValidationError::InvalidUtcOffset {
            minutes: exporter.utc_offset_minutes,
        });
    }

    Ok(())
}

/// Each Modbus register carries one 16-bit word
fn validate_modbus(config: &Config) -> Result<(), ValidationError> {
    if config.modbus.enabled && config.exporter.register_width_bits > 16 {
        return Err(ValidationError::ModbusRegisterWidth {
            bits: config.exporter.register_width_bits,
        });
    }
    Ok(())
}

fn validate_prices(config: &Config) -> Result<(), ValidationError> {
    if config.prices.history_days == 0 {
        return Err(ValidationError::InvalidHistoryDays);
    }
    Ok(())
}

/// Build the address map once so layout errors fail the load
fn validate_registers(config: &Config) -> Result<(), ValidationError> {
    AddressMap::from_config(&config.registers)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_interval() {
        let mut config = Config::default();
        config.exporter.refresh_interval_seconds = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidRefreshInterval)
        ));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.exporter.refresh_timeout = crate::humanize::HumanDuration::from_secs(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidRefreshTimeout)
        ));
    }

    #[test]
    fn test_register_width_bounds() {
        let mut config = Config::default();
        config.modbus.enabled = false;

        config.exporter.register_width_bits = 1;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidRegisterWidth { bits: 1, .. })
        ));

        config.exporter.register_width_bits = 32;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_wide_registers_rejected_with_modbus() {
        let mut config = Config::default();
        config.exporter.register_width_bits = 32;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ModbusRegisterWidth { bits: 32 })
        ));
    }

    #[test]
    fn test_default_value_must_fit_width() {
        let mut config = Config::default();
        config.exporter.register_width_bits = 8;
        config.exporter.default_value = 128;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::DefaultValueOutOfRange { value: 128, .. })
        ));

        config.exporter.default_value = -128;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_utc_offset_bounds() {
        let mut config = Config::default();
        config.exporter.utc_offset_minutes = 60;
        assert!(validate(&config).is_ok());

        config.exporter.utc_offset_minutes = 24 * 60;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidUtcOffset { .. })
        ));
    }

    #[test]
    fn test_address_map_errors_surface() {
        let mut config = Config::default();
        config.registers.entries = vec![
            EntryConfig {
                key: "price.today.1".to_string(),
                address: 1001,
                scale: None,
            },
            EntryConfig {
                key: "price.today.2".to_string(),
                address: 1001,
                scale: None,
            },
        ];
        assert!(matches!(
            validate(&config),
            Err(ValidationError::AddressMap(
                ConfigurationError::DuplicateAddress { address: 1001, .. }
            ))
        ));
    }

    #[test]
    fn test_standard_layout_must_fit_range() {
        let mut config = Config::default();
        config.registers.address_max = 2000;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::AddressMap(
                ConfigurationError::AddressOutOfRange { .. }
            ))
        ));
    }
}
