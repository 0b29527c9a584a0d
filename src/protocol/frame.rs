// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Inbound frame parsing

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DATA_PREFIX, INIT_PREFIX, RELAY_STATE_PREFIX};
use crate::relay::{RelayState, RelayUpdate, RELAY_COUNT};

/// One water quality measurement sent by the board in a `DATA:` frame.
///
/// Any finite value is accepted; range checks (such as negative turbidity)
/// are left to whoever consumes the readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Turbidity in NTU
    pub turbidity: f64,
    /// Total dissolved solids in ppm
    pub tds: f64,
}

/// A parsed inbound line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// `DATA:<turbidity>,<tds>`
    Data(SensorReading),
    /// `RELAY_STATE:<r1>,<r2>,<r3>,<r4>`
    RelayState(RelayUpdate),
    /// `INIT:<r1>,<r2>,<r3>,<r4>`
    Init(RelayUpdate),
    /// Empty line, debug output, or any other unrecognised content
    Unknown,
}

/// Reasons a recognised frame could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("expected {expected} fields in {frame} frame, found {found}")]
    FieldCount {
        frame: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{field} value '{value}' is not a number")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} value '{value}' is not finite")]
    NonFinite { field: &'static str, value: String },
}

/// Turn one line from the link into a [`Frame`].
///
/// The trailing line terminator (`\n` or `\r\n`) and trailing whitespace are
/// ignored. Only `DATA:` frames can fail: relay state frames skip malformed
/// fields instead, leaving the matching relay untouched.
pub fn parse_frame(line: &str) -> Result<Frame, FrameError> {
    let line = line.trim_end();

    if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
        parse_reading(payload).map(Frame::Data)
    } else if let Some(payload) = line.strip_prefix(RELAY_STATE_PREFIX) {
        Ok(Frame::RelayState(parse_relay_fields(payload)))
    } else if let Some(payload) = line.strip_prefix(INIT_PREFIX) {
        Ok(Frame::Init(parse_relay_fields(payload)))
    } else {
        Ok(Frame::Unknown)
    }
}

fn parse_reading(payload: &str) -> Result<SensorReading, FrameError> {
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() != 2 {
        return Err(FrameError::FieldCount {
            frame: "DATA",
            expected: 2,
            found: fields.len(),
        });
    }

    Ok(SensorReading {
        turbidity: parse_measurement("turbidity", fields[0])?,
        tds: parse_measurement("tds", fields[1])?,
    })
}

fn parse_measurement(field: &'static str, raw: &str) -> Result<f64, FrameError> {
    let raw = raw.trim();
    let value = raw.parse::<f64>().map_err(|_| FrameError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(FrameError::NonFinite {
            field,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

// Fields map to relays 1..4 in order; extra fields are ignored.
fn parse_relay_fields(payload: &str) -> RelayUpdate {
    let mut update = [None; RELAY_COUNT];
    for (slot, field) in update.iter_mut().zip(payload.split(',')) {
        *slot = RelayState::parse(field).ok();
    }
    RelayUpdate(update)
}
