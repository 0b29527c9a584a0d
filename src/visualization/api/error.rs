// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON error responses
//!
//! Every failure leaving the HTTP surface, from a handler or from a catcher,
//! has the same `{ "error": "<message>" }` body.

use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::OpenApiError;
use schemars::JsonSchema;
use serde::Serialize;

use crate::bridge::CommandError;
use crate::persistence::SinkError;

/// Body of every error response
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An error answered as JSON with a matching HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: Status,
    message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400, the request itself is wrong
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    /// 503, the board link or the store cannot serve the request
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Status::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, message)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        if err.is_validation() {
            Self::bad_request(err.to_string())
        } else {
            Self::unavailable(err.to_string())
        }
    }
}

impl From<SinkError> for ApiError {
    fn from(err: SinkError) -> Self {
        Self::unavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Request task failed: {}", err))
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(ErrorBody {
            error: self.message,
        });
        Response::build_from(body.respond_to(request)?)
            .status(self.status)
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "Invalid relay id or state. Nothing was sent to the board."),
            ("503", "The board link or the reading store is unavailable."),
            ("500", "Unexpected server failure."),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

/// JSON body for a catcher
pub fn catcher_body(status: Status) -> Json<ErrorBody> {
    let reason = status.reason().unwrap_or("Unknown error");
    Json(ErrorBody {
        error: format!("{} {}", status.code, reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayError;
    use crate::transport::TransportError;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let err: ApiError = CommandError::from(RelayError::InvalidRelayId("7".into())).into();
        assert_eq!(err.status(), Status::BadRequest);
        assert!(err.message().contains('7'));
    }

    #[test]
    fn test_transport_errors_are_unavailable() {
        let err: ApiError = CommandError::from(TransportError::Closed("gone".into())).into();
        assert_eq!(err.status(), Status::ServiceUnavailable);
    }

    #[test]
    fn test_catcher_body_names_status() {
        assert_eq!(catcher_body(Status::NotFound).0.error, "404 Not Found");
    }
}
