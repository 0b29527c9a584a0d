// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor readings API

use chrono::{DateTime, SecondsFormat, Utc};
use rocket::serde::json::Json;
use rocket::{get, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;

use super::error::ApiError;
use super::ApiState;
use crate::bridge::TimedReading;
use crate::persistence::StoredReading;

/// Upper bound of the `limit` query parameter
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ReadingResponse {
    /// Turbidity in NTU
    pub turbidity: f64,
    /// Total dissolved solids in ppm
    pub tds: f64,
    /// RFC 3339 time of the reading
    pub timestamp: String,
}

impl ReadingResponse {
    fn new(turbidity: f64, tds: f64, time: DateTime<Utc>) -> Self {
        Self {
            turbidity,
            tds,
            timestamp: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl From<StoredReading> for ReadingResponse {
    fn from(reading: StoredReading) -> Self {
        Self::new(reading.turbidity, reading.tds, reading.reading_time)
    }
}

impl From<TimedReading> for ReadingResponse {
    fn from(reading: TimedReading) -> Self {
        Self::new(reading.turbidity, reading.tds, reading.timestamp)
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReadingsResponse {
    /// Most recent stored reading
    pub latest: Option<ReadingResponse>,
    /// Stored readings, newest first
    pub recent: Vec<ReadingResponse>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct LatestReadingResponse {
    pub latest: Option<ReadingResponse>,
}

/// Stored readings.
///
/// `limit` defaults to the configured history size and is capped at 100.
#[openapi(tag = "Readings")]
#[get("/readings?<limit>")]
pub async fn get_readings(
    api: &State<ApiState>,
    limit: Option<usize>,
) -> Result<Json<ReadingsResponse>, ApiError> {
    let history = api
        .history
        .clone()
        .ok_or_else(|| ApiError::unavailable("Reading history is disabled"))?;
    let limit = limit.unwrap_or(api.history_limit).min(MAX_HISTORY_LIMIT);

    let rows = tokio::task::spawn_blocking(move || history.recent(limit.max(1))).await??;

    let latest = rows.first().cloned().map(ReadingResponse::from);
    let recent = rows
        .into_iter()
        .take(limit)
        .map(ReadingResponse::from)
        .collect();
    Ok(Json(ReadingsResponse { latest, recent }))
}

/// Last reading parsed from the board since the bridge started
#[openapi(tag = "Readings")]
#[get("/readings/latest")]
pub async fn get_latest_reading(api: &State<ApiState>) -> Json<LatestReadingResponse> {
    Json(LatestReadingResponse {
        latest: api.latest.get().map(ReadingResponse::from),
    })
}
