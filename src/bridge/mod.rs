// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bridge between the board link, the relay cache and the reading store
//!
//! * [`ReaderLoop`] consumes lines from the link, parses them and dispatches
//!   each frame: readings go to the sink, relay frames to the cache.
//! * [`RelayController`] validates relay commands coming from the HTTP
//!   surface, writes them to the link and records them in the cache.
//! * [`LatestReading`] keeps the most recent reading seen on the link.
//!
//! The reader loop and the controller never talk to each other directly;
//! they only share the [`RelayStateCache`](crate::relay::RelayStateCache).

pub mod controller;
pub mod latest;
pub mod reader;

pub use controller::{CommandError, RelayController};
pub use latest::{LatestReading, TimedReading};
pub use reader::{LineOutcome, ReaderLoop, ReaderState, ReaderStatus};
