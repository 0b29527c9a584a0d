// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Catchers and CORS preflight handler

use std::path::PathBuf;

use log::debug;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catch, options, Request};

use crate::visualization::api::error::{catcher_body, ErrorBody};

/// Accept any CORS preflight request; the headers come from the CORS fairing
#[options("/<_path..>")]
pub async fn options(_path: PathBuf) {}

#[catch(404)]
pub fn not_found(request: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: format!("No route for {} {}", request.method(), request.uri()),
    })
}

#[catch(422)]
pub fn unprocessable(request: &Request<'_>) -> Json<ErrorBody> {
    debug!("Unprocessable request body on {}", request.uri());
    catcher_body(Status::UnprocessableEntity)
}

/// Everything else, including 400 and 500
#[catch(default)]
pub fn default_catcher(status: Status, _request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    (status, catcher_body(status))
}
