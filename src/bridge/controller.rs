// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Relay command handling
//!
//! A command is validated first. An invalid command is answered with an error
//! and has no effect: no frame is sent and the cache is untouched. A valid
//! command is written to the link and, only once the write succeeded,
//! recorded in the cache. A failed write drops the command without retry.

use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info};
use thiserror::Error;

use crate::relay::{RelayCommand, RelayError, RelaySnapshot, RelayStateCache};
use crate::transport::{CommandWriter, TransportError};

/// Why a relay command was not applied
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CommandError {
    /// `true` when the request itself was wrong, as opposed to the link failing
    pub fn is_validation(&self) -> bool {
        matches!(self, CommandError::Relay(_))
    }
}

/// Applies relay commands to the link and the cache.
///
/// Clones share the writer and the cache. The writer lock is held from the
/// frame write until the cache update, so concurrent commands reach the board
/// and the cache in the same order.
#[derive(Clone)]
pub struct RelayController {
    cache: RelayStateCache,
    writer: Arc<Mutex<Box<dyn CommandWriter>>>,
}

impl RelayController {
    pub fn new(cache: RelayStateCache, writer: Box<dyn CommandWriter>) -> Self {
        Self {
            cache,
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Current relay states
    pub fn snapshot(&self) -> RelaySnapshot {
        self.cache.get()
    }

    /// Validate raw `relay` / `state` fields and apply the resulting command.
    ///
    /// ### Returns
    ///
    /// The relay states after the command on success.
    ///
    /// ### Errors
    ///
    /// * [`CommandError::Relay`] - invalid relay id or state, nothing sent
    /// * [`CommandError::Transport`] - the frame could not be written, cache untouched
    pub fn handle(&self, relay: &str, state: &str) -> Result<RelaySnapshot, CommandError> {
        let command = RelayCommand::parse(relay, state)?;
        self.execute(command)
    }

    /// Apply an already validated command
    pub fn execute(&self, command: RelayCommand) -> Result<RelaySnapshot, CommandError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(err) = writer.write_command(&command) {
            error!(
                "Relay {} command to {} dropped: {}",
                command.id, command.state, err
            );
            return Err(err.into());
        }

        let previous = self.cache.set_relay(command.id, command.state);
        let snapshot = self.cache.get();
        info!(
            "Relay {} set to {} (was {}), states {}",
            command.id, command.state, previous, snapshot
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayState::{Off, On};
    use crate::transport::MockBoard;
    use std::time::Duration;

    fn controller() -> (RelayController, MockBoard) {
        let (_reader, writer, board) = MockBoard::link(Duration::from_millis(10));
        (
            RelayController::new(RelayStateCache::new(), Box::new(writer)),
            board,
        )
    }

    #[test]
    fn test_valid_command_writes_frame_and_updates_cache() {
        let (controller, board) = controller();
        let snapshot = controller.handle("2", "1").unwrap();
        assert_eq!(board.written(), vec!["RELAY:2,1\n".to_string()]);
        assert_eq!(snapshot.states(), [Off, On, Off, Off]);
        assert_eq!(controller.snapshot(), snapshot);
    }

    #[test]
    fn test_invalid_command_has_no_effect() {
        let (controller, board) = controller();
        for (relay, state) in [("0", "1"), ("5", "0"), ("x", "1"), ("1", "2"), ("1", "")] {
            let err = controller.handle(relay, state).unwrap_err();
            assert!(err.is_validation(), "{}/{} should be rejected", relay, state);
        }
        assert!(board.written().is_empty());
        assert_eq!(controller.snapshot().states(), [Off; 4]);
    }

    #[test]
    fn test_write_failure_leaves_cache_untouched() {
        let (controller, board) = controller();
        board.fail_writes(true);
        let err = controller.handle("3", "1").unwrap_err();
        assert!(matches!(
            err,
            CommandError::Transport(TransportError::WriteFailure(_))
        ));
        assert!(!err.is_validation());
        assert_eq!(controller.snapshot().states(), [Off; 4]);

        board.fail_writes(false);
        controller.handle("3", "1").unwrap();
        assert_eq!(controller.snapshot().states(), [Off, Off, On, Off]);
    }
}
