// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Latest reading received from the board

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::SensorReading;

/// A reading with the time it was parsed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedReading {
    pub turbidity: f64,
    pub tds: f64,
    pub timestamp: DateTime<Utc>,
}

/// Thread-safe holder of the last reading parsed from the link.
///
/// Updated by the reader loop whether or not persistence succeeds, so the
/// HTTP surface can show live values even without a database.
#[derive(Debug, Clone, Default)]
pub struct LatestReading {
    latest: Arc<Mutex<Option<TimedReading>>>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, reading: SensorReading) {
        let timed = TimedReading {
            turbidity: reading.turbidity,
            tds: reading.tds,
            timestamp: Utc::now(),
        };
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(timed);
    }

    /// The latest reading, if any has been received yet
    pub fn get(&self) -> Option<TimedReading> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
