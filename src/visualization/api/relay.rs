// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relay control API
//!
//! - `POST /relay_control` with form fields `relay` and `state`
//! - `GET /relay_control` and `GET /relay_states` return the cached states

use std::collections::BTreeMap;

use log::debug;
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::{get, post, FromForm, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;

use super::error::ApiError;
use super::ApiState;

/// Form body of `POST /relay_control`.
///
/// Both fields are required. They are optional here so a missing field is
/// answered with a JSON error instead of a bare 422.
#[derive(Debug, FromForm, JsonSchema)]
pub struct RelayControlForm {
    /// Relay number, 1 to 4
    pub relay: Option<String>,
    /// 0 for off, 1 for on
    pub state: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RelayStatesResponse {
    /// Relay number to state (0 or 1)
    pub states: BTreeMap<u8, u8>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RelayControlResponse {
    pub success: bool,
    /// Relay states after the command
    pub states: BTreeMap<u8, u8>,
}

/// Switch one relay.
///
/// The command is validated, written to the board as `RELAY:<id>,<state>`,
/// and recorded in the relay cache once the write succeeded.
#[openapi(tag = "Relays")]
#[post("/relay_control", data = "<form>")]
pub async fn post_relay_control(
    api: &State<ApiState>,
    form: Form<RelayControlForm>,
) -> Result<Json<RelayControlResponse>, ApiError> {
    let RelayControlForm { relay, state } = form.into_inner();
    let (relay, state) = match (relay, state) {
        (Some(relay), Some(state)) => (relay, state),
        (None, _) => return Err(ApiError::bad_request("Missing form field 'relay'")),
        (_, None) => return Err(ApiError::bad_request("Missing form field 'state'")),
    };
    debug!("Relay control request: relay={} state={}", relay, state);

    // Writing to the serial port blocks
    let controller = api.controller.clone();
    let snapshot =
        tokio::task::spawn_blocking(move || controller.handle(&relay, &state)).await??;

    Ok(Json(RelayControlResponse {
        success: true,
        states: snapshot.to_map(),
    }))
}

/// Current relay states, as polled by the dashboard on the control endpoint
#[openapi(tag = "Relays")]
#[get("/relay_control")]
pub async fn get_relay_control(api: &State<ApiState>) -> Json<RelayStatesResponse> {
    relay_states(api)
}

/// Current relay states
#[openapi(tag = "Relays")]
#[get("/relay_states")]
pub async fn get_relay_states(api: &State<ApiState>) -> Json<RelayStatesResponse> {
    relay_states(api)
}

fn relay_states(api: &ApiState) -> Json<RelayStatesResponse> {
    Json(RelayStatesResponse {
        states: api.controller.snapshot().to_map(),
    })
}
