// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Background reading loop
//!
//! The loop moves through the following states:
//!
//! ```text
//! Idle -> Reading -> (reading | relay frame | parse failure) -> Reading
//!                 \-> ShuttingDown   (link closed or shutdown requested)
//! ```
//!
//! Every recoverable problem (malformed frame, sink failure) is logged and the
//! loop carries on. Only a closed link ends the loop with an error. Sink writes
//! run inline: a slow sink delays the next frame, which the board's low frame
//! rate tolerates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};

use super::LatestReading;
use crate::persistence::ReadingSink;
use crate::protocol::{parse_frame, Frame, FrameError, SensorReading};
use crate::relay::{RelaySnapshot, RelayStateCache, RELAY_COUNT};
use crate::transport::{LineReader, TransportError};

/// Lifecycle of the reading loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    Reading,
    ShuttingDown,
}

/// Shared view of a [`ReaderLoop`] state, readable while the loop runs
#[derive(Debug, Clone)]
pub struct ReaderStatus(Arc<Mutex<ReaderState>>);

impl ReaderStatus {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(ReaderState::Idle)))
    }

    pub fn get(&self) -> ReaderState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: ReaderState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// What the loop did with one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// A reading was handed to the sink and stored
    Stored(SensorReading),
    /// A reading was parsed but not stored: no sink, or the sink failed
    NotStored(SensorReading),
    /// A `RELAY_STATE:` or `INIT:` frame was applied to the cache
    RelaysUpdated(RelaySnapshot),
    /// A recognised frame was malformed and discarded
    ParseFailure(FrameError),
    /// Unknown content, ignored
    Ignored,
}

/// Reads frames from the link until it closes or `running` is cleared.
pub struct ReaderLoop<R: LineReader> {
    reader: R,
    cache: RelayStateCache,
    sink: Option<Arc<dyn ReadingSink>>,
    latest: LatestReading,
    running: Arc<AtomicBool>,
    status: ReaderStatus,
}

impl<R: LineReader> ReaderLoop<R> {
    /// Build a loop over `reader`.
    ///
    /// With `sink` set to `None` readings are only kept as the latest value.
    pub fn new(
        reader: R,
        cache: RelayStateCache,
        sink: Option<Arc<dyn ReadingSink>>,
        latest: LatestReading,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            cache,
            sink,
            latest,
            running,
            status: ReaderStatus::new(),
        }
    }

    /// Handle on the loop state, still valid once [`ReaderLoop::run`] took the loop
    pub fn status(&self) -> ReaderStatus {
        self.status.clone()
    }

    /// Run until shutdown or until the link closes.
    ///
    /// Consumes the loop so the link handle is released on return.
    ///
    /// ### Returns
    ///
    /// * `Ok(())` - `running` was cleared
    /// * `Err(TransportError::Closed)` - the link dropped; the caller should
    ///   shut the process down
    pub fn run(mut self) -> Result<(), TransportError> {
        info!("Reader loop started");
        self.status.set(ReaderState::Reading);

        while self.running.load(Ordering::SeqCst) {
            match self.reader.read_line() {
                Ok(Some(line)) => {
                    self.handle_line(&line);
                }
                Ok(None) => continue,
                Err(err) => {
                    error!("Reader loop stopping: {}", err);
                    self.status.set(ReaderState::ShuttingDown);
                    return Err(err);
                }
            }
        }

        self.status.set(ReaderState::ShuttingDown);
        info!("Reader loop stopped on shutdown request");
        Ok(())
    }

    /// Parse one line and dispatch the resulting frame
    pub fn handle_line(&self, line: &str) -> LineOutcome {
        match parse_frame(line) {
            Ok(Frame::Data(reading)) => self.store_reading(reading),
            Ok(Frame::RelayState(update)) => {
                if update.len() < RELAY_COUNT {
                    warn!("Partial relay state frame {:?}", line);
                }
                let snapshot = self.cache.apply_all(&update);
                debug!("Relay states from board: {}", snapshot);
                LineOutcome::RelaysUpdated(snapshot)
            }
            Ok(Frame::Init(update)) => {
                if update.len() < RELAY_COUNT {
                    warn!("Partial init frame {:?}", line);
                }
                let snapshot = self.cache.apply_all(&update);
                debug!("Board initialised relays: {}", snapshot);
                LineOutcome::RelaysUpdated(snapshot)
            }
            Ok(Frame::Unknown) => {
                if !line.trim().is_empty() {
                    debug!("Ignoring line {:?}", line);
                }
                LineOutcome::Ignored
            }
            Err(err) => {
                warn!("Discarding frame {:?}: {}", line, err);
                LineOutcome::ParseFailure(err)
            }
        }
    }

    fn store_reading(&self, reading: SensorReading) -> LineOutcome {
        self.latest.update(reading);

        let Some(sink) = &self.sink else {
            debug!(
                "Reading turbidity={} NTU tds={} ppm (persistence disabled)",
                reading.turbidity, reading.tds
            );
            return LineOutcome::NotStored(reading);
        };

        match sink.insert(reading.turbidity, reading.tds) {
            Ok(()) => {
                debug!(
                    "Reading saved: turbidity={} NTU tds={} ppm",
                    reading.turbidity, reading.tds
                );
                LineOutcome::Stored(reading)
            }
            Err(err) => {
                error!(
                    "Dropping reading turbidity={} tds={}: {}",
                    reading.turbidity, reading.tds, err
                );
                LineOutcome::NotStored(reading)
            }
        }
    }
}
