// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP API of the bridge

pub mod error;
pub mod readings;
pub mod relay;

use std::sync::Arc;

use rocket::Route;
use rocket_okapi::openapi_get_routes;

use crate::bridge::{LatestReading, RelayController};
use crate::persistence::ReadingHistory;

pub use error::{ApiError, ErrorBody};
pub use readings::*;
pub use relay::*;

/// State shared by every API handler
pub struct ApiState {
    pub controller: RelayController,
    pub latest: LatestReading,
    /// `None` when persistence is disabled
    pub history: Option<Arc<dyn ReadingHistory>>,
    /// Default size of the `GET /readings` list
    pub history_limit: usize,
}

/// All API routes, plus `/openapi.json`
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        post_relay_control,
        get_relay_control,
        get_relay_states,
        get_readings,
        get_latest_reading,
    ]
}
