// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared relay state cache

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{RelayError, RelayId, RelaySnapshot, RelayState, RelayUpdate, RELAY_COUNT};

/// A thread-safe store of the four relay states.
///
/// Cloning the cache is cheap and yields a handle on the same storage, which is
/// how the reader loop and the relay controller share it. All relays start
/// `Off` and every slot is always present.
#[derive(Debug, Clone, Default)]
pub struct RelayStateCache {
    slots: Arc<Mutex<[RelayState; RELAY_COUNT]>>,
}

impl RelayStateCache {
    /// Create a cache with every relay off
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with the given initial states
    pub fn with_states(states: [RelayState; RELAY_COUNT]) -> Self {
        Self {
            slots: Arc::new(Mutex::new(states)),
        }
    }

    // A panic while holding the guard cannot leave a slot half-written, so a
    // poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, [RelayState; RELAY_COUNT]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of all four states. The lock is released before returning.
    pub fn get(&self) -> RelaySnapshot {
        RelaySnapshot::new(*self.lock())
    }

    /// Set one relay from raw integers and return its previous state.
    ///
    /// ### Errors
    ///
    /// * [`RelayError::InvalidRelayId`] if `id` is outside `1..=4`
    /// * [`RelayError::InvalidState`] if `value` is not `0` or `1`
    ///
    /// The cache is left unchanged on error.
    pub fn set(&self, id: i64, value: i64) -> Result<RelayState, RelayError> {
        let id = RelayId::new(id)?;
        let state = RelayState::from_value(value)?;
        Ok(self.set_relay(id, state))
    }

    /// Set one relay and return its previous state
    pub fn set_relay(&self, id: RelayId, state: RelayState) -> RelayState {
        let mut slots = self.lock();
        std::mem::replace(&mut slots[id.index()], state)
    }

    /// Apply a bulk update from the link and return the resulting snapshot.
    ///
    /// Slots whose value is `None` keep their current state. The whole update
    /// happens under a single lock acquisition.
    pub fn apply_all(&self, update: &RelayUpdate) -> RelaySnapshot {
        let mut slots = self.lock();
        for (slot, value) in slots.iter_mut().zip(update.0.iter()) {
            if let Some(state) = value {
                *slot = *state;
            }
        }
        RelaySnapshot::new(*slots)
    }
}
