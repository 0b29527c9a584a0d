// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory reading store

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{ReadingHistory, ReadingSink, SinkError, StoredReading};

/// Keeps the last `capacity` readings in memory; older ones are dropped.
pub struct MemoryStore {
    readings: Mutex<VecDeque<StoredReading>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<StoredReading>> {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ReadingSink for MemoryStore {
    fn insert(&self, turbidity: f64, tds: f64) -> Result<(), SinkError> {
        let mut readings = self.lock();
        if readings.len() == self.capacity {
            readings.pop_front();
        }
        readings.push_back(StoredReading {
            turbidity,
            tds,
            reading_time: Utc::now(),
        });
        Ok(())
    }
}

impl ReadingHistory for MemoryStore {
    fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, SinkError> {
        Ok(self.lock().iter().rev().take(limit).cloned().collect())
    }
}
