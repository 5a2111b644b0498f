//! Key layout and encoding utilities for Fjall partitions
//!
//! Partition structure:
//! - `prices`: price:{YYYY-MM-DD}:{hour:02} -> PriceRecord (JSON)
//! - `devices`: device:{id:010} -> Device (JSON)
//!
//! Zero padding keeps lexicographic order equal to numeric order, so
//! prefix scans return hours and devices sorted.
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode a price key: price:{date}:{hour:02}
pub fn encode_price_key(date: NaiveDate, hour: u8) -> Vec<u8> {
    format!("price:{}:{:02}", date.format(DATE_FORMAT), hour).into_bytes()
}

/// Encode a price prefix for one day: price:{date}:
pub fn encode_price_prefix(date: NaiveDate) -> Vec<u8> {
    format!("price:{}:", date.format(DATE_FORMAT)).into_bytes()
}

/// Decode a price key: price:{date}:{hour} -> (date, hour)
pub fn decode_price_key(key: &[u8]) -> Option<(NaiveDate, u8)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (date_str, hour_str) = key_str.strip_prefix("price:")?.rsplit_once(':')?;
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).ok()?;
    let hour = hour_str.parse().ok()?;
    Some((date, hour))
}

/// Encode a device key: device:{id:010}
pub fn encode_device_key(id: u32) -> Vec<u8> {
    format!("device:{:010}", id).into_bytes()
}

/// Decode a device key: device:{id} -> id
pub fn decode_device_key(key: &[u8]) -> Option<u32> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("device:")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_key_encoding() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let key = encode_price_key(date, 7);
        assert_eq!(key, b"price:2024-05-01:07");

        let (decoded_date, decoded_hour) = decode_price_key(&key).unwrap();
        assert_eq!(decoded_date, date);
        assert_eq!(decoded_hour, 7);
    }

    #[test]
    fn test_price_prefix() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(encode_price_prefix(date), b"price:2024-12-31:");
        assert!(encode_price_key(date, 23).starts_with(&encode_price_prefix(date)));
    }

    #[test]
    fn test_price_keys_sort_by_hour() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(encode_price_key(date, 2) < encode_price_key(date, 10));
    }

    #[test]
    fn test_device_key_encoding() {
        let key = encode_device_key(42);
        assert_eq!(key, b"device:0000000042");
        assert_eq!(decode_device_key(&key), Some(42));
        assert!(encode_device_key(9) < encode_device_key(10));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_price_key(b"device:0000000001"), None);
        assert_eq!(decode_price_key(b"price:not-a-date:01"), None);
        assert_eq!(decode_device_key(b"device:abc"), None);
    }
}
