//! Synthetic hourly spot prices
//!
//! Prices follow a fixed daily shape with morning and evening peaks plus
//! uniform jitter, clamped to a plausible band. Used by `spotreg seed` and by
//! on-demand generation in the price API.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::store::PriceRecord;

pub const SAMPLE_SOURCE: &str = "sample_data";

/// EUR/MWh per hour of day before jitter
pub const BASE_PRICES: [f64; 24] = [
    45.0, 42.0, 40.0, 38.0, 39.0, 45.0, // 00-05
    65.0, 75.0, 85.0, 75.0, 65.0, 55.0, // 06-11
    50.0, 48.0, 45.0, 48.0, 52.0, 58.0, // 12-17
    75.0, 85.0, 80.0, 70.0, 60.0, 50.0, // 18-23
];

pub const JITTER: i32 = 15;
pub const MIN_PRICE: f64 = 10.0;
pub const MAX_PRICE: f64 = 120.0;

/// Day-ahead prices become known in the early afternoon
pub const TOMORROW_PUBLISH_HOUR: u32 = 13;

pub struct PriceGenerator {
    rng: StdRng,
}

impl Default for PriceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 24 hourly prices for one day
    pub fn day(&mut self, date: NaiveDate, created_at: DateTime<Utc>) -> Vec<PriceRecord> {
        BASE_PRICES
            .iter()
            .enumerate()
            .map(|(hour, base)| {
                let jitter = self.rng.random_range(-JITTER..=JITTER) as f64;
                PriceRecord {
                    date,
                    hour: hour as u8,
                    price: (base + jitter).clamp(MIN_PRICE, MAX_PRICE),
                    source: SAMPLE_SOURCE.to_string(),
                    created_at,
                }
            })
            .collect()
    }

    /// `days_back` days ending today, plus tomorrow once it would be published
    ///
    /// `now` carries the trading-day offset, so "today" and the publish hour
    /// are local to the market rather than UTC.
    pub fn history(&mut self, now: DateTime<FixedOffset>, days_back: u32) -> Vec<PriceRecord> {
        let today = now.date_naive();
        let created_at = now.with_timezone(&Utc);
        let mut records = Vec::with_capacity((days_back as usize + 1) * 24);

        for offset in (0..days_back).rev() {
            if let Some(date) = today.checked_sub_days(Days::new(offset as u64)) {
                records.extend(self.day(date, created_at));
            }
        }

        if now.hour() >= TOMORROW_PUBLISH_HOUR {
            if let Some(tomorrow) = today.checked_add_days(Days::new(1)) {
                records.extend(self.day(tomorrow, created_at));
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_stays_in_band() {
        let mut generator = PriceGenerator::with_seed(7);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let records = generator.day(date, Utc::now());

        assert_eq!(records.len(), 24);
        for (hour, record) in records.iter().enumerate() {
            assert_eq!(record.hour as usize, hour);
            assert_eq!(record.source, SAMPLE_SOURCE);
            assert!((MIN_PRICE..=MAX_PRICE).contains(&record.price));
            assert!((record.price - BASE_PRICES[hour]).abs() <= JITTER as f64);
            assert_eq!(record.price.fract(), 0.0);
        }
    }

    #[test]
    fn test_seeded_generator_is_repeatable() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let a = PriceGenerator::with_seed(42).day(date, at);
        let b = PriceGenerator::with_seed(42).day(date, at);
        assert_eq!(a, b);
    }

    #[test]
    fn test_history_before_publish_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 9, 0, 0).unwrap().fixed_offset();
        let records = PriceGenerator::with_seed(1).history(now, 30);

        assert_eq!(records.len(), 30 * 24);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(records.last().unwrap().date, now.date_naive());
    }

    #[test]
    fn test_history_includes_tomorrow_after_publish_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 14, 0, 0).unwrap().fixed_offset();
        let records = PriceGenerator::with_seed(1).history(now, 2);

        assert_eq!(records.len(), 3 * 24);
        assert_eq!(
            records.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_history_uses_local_trading_day() {
        // 23:30 UTC on May 31 is already June 1 at UTC+1, before publication
        let offset = FixedOffset::east_opt(3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 23, 30, 0).unwrap().with_timezone(&offset);
        let records = PriceGenerator::with_seed(1).history(now, 1);

        assert_eq!(records.len(), 24);
        assert!(records.iter().all(|r| r.date == NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert_eq!(records[0].created_at, Utc.with_ymd_and_hms(2024, 5, 31, 23, 30, 0).unwrap());
    }
}
