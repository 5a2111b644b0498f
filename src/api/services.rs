use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{
        AddressMapResponse, AvailableDatesResponse, DayPricesResponse, ExportRegistersResponse,
        ExportStatusResponse, HealthResponse, HourlyPrice, MapEntryResponse,
        NetworkStatsResponse, PresenceUpdate, RefreshResponse,
    },
    state::AppState,
    utils::read_json,
    validation::validate_device,
};
use crate::export::TickOutcome;
use crate::registers::MINOR_UNIT_SCALE;
use crate::sample::PriceGenerator;
use crate::store::{DeviceSpec, PriceRecord};

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "spotreg is running" }))
}

/// GET /prices/available-dates
pub async fn available_dates(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let dates = state.store.available_dates()?;
    Ok(Json(AvailableDatesResponse { dates }))
}

/// GET /prices/date/{date}
///
/// Unknown dates are a 404, unless on-demand generation is enabled and the
/// date lies between `history_days` ago and tomorrow. Generated prices are
/// stored so later requests and refreshes see the same values.
pub async fn prices_for_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidPayload(format!("invalid date '{date}', expected YYYY-MM-DD")))?;

    let mut records = state.store.prices_for_date(date)?;

    if records.is_empty() && may_generate(&state, date) {
        let generated = PriceGenerator::new().day(date, Utc::now());
        state.store.put_prices(&generated)?;
        info!(%date, "Generated sample prices on demand");
        records = generated;
    }

    let response =
        summarize(date, &records).ok_or_else(|| ApiError::NotFound(format!("prices for {date}")))?;
    Ok(Json(response))
}

fn may_generate(state: &AppState, date: NaiveDate) -> bool {
    let prices = &state.config.prices;
    if !prices.generate_missing {
        return false;
    }

    let today = state
        .scheduler
        .exporter()
        .settings()
        .trading_day(Utc::now());
    let earliest = today.checked_sub_days(Days::new(prices.history_days as u64));
    let latest = today.checked_add_days(Days::new(1));

    matches!((earliest, latest), (Some(earliest), Some(latest)) if (earliest..=latest).contains(&date))
}

fn summarize(date: NaiveDate, records: &[PriceRecord]) -> Option<DayPricesResponse> {
    let first = records.first()?;

    let prices: Vec<HourlyPrice> = records
        .iter()
        .map(|r| HourlyPrice {
            hour: r.hour,
            price: r.price,
            price_kwh: r.price * MINOR_UNIT_SCALE,
        })
        .collect();

    let min_price = records.iter().map(|r| r.price).fold(f64::INFINITY, f64::min);
    let max_price = records.iter().map(|r| r.price).fold(f64::NEG_INFINITY, f64::max);
    let avg_price = records.iter().map(|r| r.price).sum::<f64>() / records.len() as f64;

    Some(DayPricesResponse {
        date,
        prices,
        min_price,
        max_price,
        avg_price,
        source: first.source.clone(),
    })
}

pub async fn list_devices(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_devices()?))
}

pub async fn create_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let spec: DeviceSpec = read_json(&headers, body).await?;
    validate_device(&spec).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let device = state.store.create_device(spec)?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let spec: DeviceSpec = read_json(&headers, body).await?;
    validate_device(&spec).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    Ok(Json(state.store.update_device(id, spec)?))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_device(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /devices/{id}/presence
///
/// Write path for whatever detects devices on the network. The exporter
/// picks the new value up on its next refresh.
pub async fn set_presence(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let update: PresenceUpdate = read_json(&headers, body).await?;
    let device = state.store.set_presence(id, update.present, Utc::now())?;
    Ok(Json(device))
}

pub async fn network_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let devices = state.store.list_devices()?;

    Ok(Json(NetworkStatsResponse {
        total_devices: devices.len(),
        present_devices: devices.iter().filter(|d| d.present == Some(true)).count(),
        last_refresh: devices.iter().filter_map(|d| d.presence_updated_at).max(),
    }))
}

pub async fn export_registers(State(state): State<AppState>) -> impl IntoResponse {
    let table = state.scheduler.current_table();
    Json(ExportRegistersResponse {
        generation: table.generation,
        built_at: table.built_at,
        values: table.values.clone(),
    })
}

pub async fn export_status(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    Json(ExportStatusResponse {
        stale: state.scheduler.is_stale(now),
        state: state.scheduler.status(),
        generation: state.scheduler.current_table().generation,
        refresh_interval_seconds: state.scheduler.interval().as_secs(),
    })
}

pub async fn export_map(State(state): State<AppState>) -> impl IntoResponse {
    let map = state.scheduler.exporter().map();
    Json(AddressMapResponse {
        range: map.range(),
        entries: map
            .entries()
            .iter()
            .map(|e| MapEntryResponse {
                address: e.address,
                key: e.key.to_string(),
                transform: e.transform,
            })
            .collect(),
    })
}

/// POST /export/refresh
///
/// 202 when a new table was published, 409 when another refresh was
/// running, 503 when the refresh failed and the previous table stays live.
pub async fn export_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.scheduler.run_once(Utc::now()).await;
    let status = match outcome {
        TickOutcome::Refreshed => StatusCode::ACCEPTED,
        TickOutcome::Suppressed => StatusCode::CONFLICT,
        TickOutcome::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };
    let error = match outcome {
        TickOutcome::Failed => state.scheduler.status().last_error,
        _ => None,
    };
    if outcome != TickOutcome::Refreshed {
        warn!(?outcome, "Manual refresh did not publish a table");
    }

    (
        status,
        Json(RefreshResponse {
            outcome,
            generation: state.scheduler.current_table().generation,
            error,
        }),
    )
}

/// Health check endpoint (GET /health)
///
/// 503 when the store cannot be read. A stale export table is reported as
/// degraded but still answers 200 since the adapters keep serving it.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let store_ok = state.store.stats().is_ok();
    components.insert(
        "fjall".to_string(),
        if store_ok { "healthy" } else { "unhealthy" }.to_string(),
    );

    let stale = state.scheduler.is_stale(Utc::now());
    components.insert(
        "exporter".to_string(),
        if stale { "stale" } else { "healthy" }.to_string(),
    );

    let (status_code, overall_status) = match (store_ok, stale) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        (true, true) => (StatusCode::OK, "degraded"),
        (true, false) => (StatusCode::OK, "healthy"),
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hour: u8, price: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            hour,
            price,
            source: "nordpool".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let summary = summarize(date, &[record(0, 40.0), record(1, 80.0), record(2, 60.0)]).unwrap();

        assert_eq!(summary.min_price, 40.0);
        assert_eq!(summary.max_price, 80.0);
        assert_eq!(summary.avg_price, 60.0);
        assert_eq!(summary.source, "nordpool");
        assert_eq!(summary.prices[1].price_kwh, 8.0);
    }

    #[test]
    fn test_summarize_empty() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(summarize(date, &[]).is_none());
    }
}
