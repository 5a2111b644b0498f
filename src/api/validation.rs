use thiserror::Error;

use crate::store::DeviceSpec;

pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum DeviceValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("name exceeds 64 characters")]
    NameTooLong,
    #[error("mac '{0}' must be six hex octets separated by ':' or '-'")]
    InvalidMac(String),
    #[error("manufacturer exceeds 64 characters")]
    ManufacturerTooLong,
}

pub fn validate_device(spec: &DeviceSpec) -> Result<(), DeviceValidationError> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(DeviceValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DeviceValidationError::NameTooLong);
    }

    if !is_valid_mac(&spec.mac) {
        return Err(DeviceValidationError::InvalidMac(spec.mac.clone()));
    }

    if let Some(manufacturer) = &spec.manufacturer {
        if manufacturer.chars().count() > MAX_NAME_LEN {
            return Err(DeviceValidationError::ManufacturerTooLong);
        }
    }

    Ok(())
}

fn is_valid_mac(mac: &str) -> bool {
    let separator = if mac.contains('-') { '-' } else { ':' };
    let octets: Vec<&str> = mac.split(separator).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}
