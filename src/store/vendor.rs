//! Manufacturer lookup by MAC prefix (OUI)
//!
//! A small static table; anything not listed is reported as "Unknown".

const UNKNOWN: &str = "Unknown";

const PREFIXES: &[(&str, &str)] = &[
    ("00:11:22", "Apple"),
    ("AA:BB:CC", "Samsung"),
    ("11:22:33", "Google"),
    ("22:33:44", "Huawei"),
    ("33:44:55", "Xiaomi"),
    ("44:55:66", "OnePlus"),
    ("55:66:77", "Sony"),
    ("66:77:88", "LG"),
    ("77:88:99", "Nokia"),
    ("88:99:AA", "Motorola"),
];

pub fn manufacturer_for_mac(mac: &str) -> &'static str {
    let Some(prefix) = mac.get(..8) else {
        return UNKNOWN;
    };
    let prefix = prefix.replace('-', ":").to_uppercase();

    PREFIXES
        .iter()
        .find(|(oui, _)| *oui == prefix)
        .map(|(_, vendor)| *vendor)
        .unwrap_or(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefix() {
        assert_eq!(manufacturer_for_mac("00:11:22:33:44:55"), "Apple");
        assert_eq!(manufacturer_for_mac("aa:bb:cc:00:00:01"), "Samsung");
        assert_eq!(manufacturer_for_mac("88-99-aa-01-02-03"), "Motorola");
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(manufacturer_for_mac("FF:FF:FF:00:00:00"), "Unknown");
        assert_eq!(manufacturer_for_mac("short"), "Unknown");
        assert_eq!(manufacturer_for_mac(""), "Unknown");
    }
}
