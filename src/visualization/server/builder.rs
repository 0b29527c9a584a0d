// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder and configuration

use log::debug;
use rocket::figment::Figment;
use rocket::{catchers, routes, Build, Rocket};
use rocket_okapi::rapidoc::{make_rapidoc, GeneralConfig, HideShowConfig, RapiDocConfig};
use rocket_okapi::settings::UrlObject;

use super::cors::CORS;
use super::handlers::*;
use crate::visualization::api::{api_routes, ApiState};

/// Build a configured Rocket server instance
///
/// ### Parameters
///
/// * `figment` - The Rocket configuration figment containing server settings
/// * `state` - Relay controller, latest reading and history served by the API
///
/// ### Returns
///
/// A Rocket instance with the API routes, the OpenAPI document at
/// `/openapi.json`, its RapiDoc viewer at `/api/doc/`, the CORS fairing and
/// JSON error catchers.
///
/// ### Example
///
/// ```no_run
/// use rocket::figment::Figment;
/// use water_quality_bridge::bridge::{LatestReading, RelayController};
/// use water_quality_bridge::relay::RelayStateCache;
/// use water_quality_bridge::transport::MockBoard;
/// use water_quality_bridge::visualization::{api::ApiState, server};
///
/// let (_reader, writer, _board) = MockBoard::link(std::time::Duration::from_millis(50));
/// let state = ApiState {
///     controller: RelayController::new(RelayStateCache::new(), Box::new(writer)),
///     latest: LatestReading::new(),
///     history: None,
///     history_limit: 10,
/// };
/// let rocket = server::build_rocket(Figment::from(rocket::Config::default()), state);
/// ```
pub fn build_rocket(figment: Figment, state: ApiState) -> Rocket<Build> {
    debug!(
        "Building HTTP server, history {}",
        if state.history.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    rocket::custom(figment)
        .attach(CORS)
        .manage(state)
        .mount("/", api_routes())
        .mount("/", routes![options])
        .mount(
            "/api/doc/",
            make_rapidoc(&RapiDocConfig {
                title: Some("Water quality bridge API".to_owned()),
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("General", "../../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
        .register("/", catchers![not_found, unprocessable, default_catcher])
}
