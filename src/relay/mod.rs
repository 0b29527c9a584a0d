// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relay outputs of the sensor board
//!
//! This module defines the relay vocabulary shared by the frame parser, the
//! command surface and the serial transport, together with the
//! [`RelayStateCache`], the single source of truth for the state of the four
//! relays.
//!
//! ## Ownership
//!
//! The cache is an explicitly owned object: the daemon creates one and hands
//! clones of it to the reader loop (which applies `RELAY_STATE:`/`INIT:` frames)
//! and to the relay controller (which applies accepted commands). Clones share
//! the same storage.
//!
//! ## Locking
//!
//! All four slots live behind one [`Mutex`]. Every operation takes the lock
//! exactly once, so a bulk update from the link and a single-relay command can
//! never interleave into a torn snapshot.

pub mod cache;

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

pub use cache::RelayStateCache;

/// Number of relays on the board.
pub const RELAY_COUNT: usize = 4;

/// Errors raised when a relay id or state does not belong to the board's range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Invalid relay id '{0}': expected an integer between 1 and 4")]
    InvalidRelayId(String),
    #[error("Invalid relay state '{0}': expected 0 or 1")]
    InvalidState(String),
}

/// State of a single relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelayState {
    #[default]
    Off = 0,
    On = 1,
}

impl RelayState {
    /// Wire value of the state (`0` or `1`).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Build a state from its integer wire value.
    pub fn from_value(value: i64) -> Result<Self, RelayError> {
        match value {
            0 => Ok(RelayState::Off),
            1 => Ok(RelayState::On),
            other => Err(RelayError::InvalidState(other.to_string())),
        }
    }

    /// Parse a state from a text field, as found in frames and form fields.
    pub fn parse(field: &str) -> Result<Self, RelayError> {
        let trimmed = field.trim();
        trimmed
            .parse::<i64>()
            .map_err(|_| RelayError::InvalidState(trimmed.to_string()))
            .and_then(Self::from_value)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Identifier of a relay, guaranteed to be within `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelayId(u8);

impl RelayId {
    /// Build a relay id, rejecting anything outside `1..=4`.
    pub fn new(id: i64) -> Result<Self, RelayError> {
        if (1..=RELAY_COUNT as i64).contains(&id) {
            Ok(RelayId(id as u8))
        } else {
            Err(RelayError::InvalidRelayId(id.to_string()))
        }
    }

    /// Parse a relay id from a text field.
    pub fn parse(field: &str) -> Result<Self, RelayError> {
        let trimmed = field.trim();
        trimmed
            .parse::<i64>()
            .map_err(|_| RelayError::InvalidRelayId(trimmed.to_string()))
            .and_then(Self::new)
    }

    /// All relay ids, in board order.
    pub fn all() -> impl Iterator<Item = RelayId> {
        (1..=RELAY_COUNT as u8).map(RelayId)
    }

    /// The 1-based id as sent on the wire.
    pub fn get(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated request to drive one relay to a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCommand {
    pub id: RelayId,
    pub state: RelayState,
}

impl RelayCommand {
    pub fn new(id: RelayId, state: RelayState) -> Self {
        Self { id, state }
    }

    /// Validate raw `relay` / `state` text fields into a command.
    ///
    /// The relay id is checked first, so a request that is wrong on both
    /// counts reports [`RelayError::InvalidRelayId`].
    pub fn parse(relay: &str, state: &str) -> Result<Self, RelayError> {
        let id = RelayId::parse(relay)?;
        let state = RelayState::parse(state)?;
        Ok(Self { id, state })
    }
}

/// Bulk update carried by a `RELAY_STATE:` or `INIT:` frame.
///
/// Slot `n` holds the value for relay `n + 1`; `None` marks a field that was
/// missing or malformed and must leave the relay untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayUpdate(pub [Option<RelayState>; RELAY_COUNT]);

impl RelayUpdate {
    /// An update that sets every relay.
    pub fn full(states: [RelayState; RELAY_COUNT]) -> Self {
        RelayUpdate(states.map(Some))
    }

    /// Number of relays this update actually touches.
    pub fn len(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable copy of the four relay states at a point in time.
///
/// Serializes as a JSON object keyed by relay id: `{"1":0,"2":1,"3":0,"4":1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelaySnapshot([RelayState; RELAY_COUNT]);

impl RelaySnapshot {
    pub fn new(states: [RelayState; RELAY_COUNT]) -> Self {
        RelaySnapshot(states)
    }

    pub fn get(&self, id: RelayId) -> RelayState {
        self.0[id.index()]
    }

    pub fn states(&self) -> [RelayState; RELAY_COUNT] {
        self.0
    }

    /// Relay id to wire value, suitable for JSON responses.
    pub fn to_map(&self) -> BTreeMap<u8, u8> {
        RelayId::all()
            .map(|id| (id.get(), self.get(id).as_u8()))
            .collect()
    }
}

impl fmt::Display for RelaySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = RelayId::all()
            .map(|id| format!("{}={}", id, self.get(id)))
            .collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

impl Serialize for RelaySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RELAY_COUNT))?;
        for id in RelayId::all() {
            map.serialize_entry(&id.to_string(), &self.get(id).as_u8())?;
        }
        map.end()
    }
}
