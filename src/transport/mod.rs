// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Link to the sensor/relay board
//!
//! The link is split into two halves so that the blocking reader and the
//! command writer can live on different threads:
//!
//! * [`LineReader`] - a lazy, infinite, non-restartable sequence of lines.
//!   Reads are bounded by a poll timeout so the caller can notice a shutdown
//!   request even when the board is silent.
//! * [`CommandWriter`] - synchronous writes of `RELAY:<id>,<state>\n` frames.
//!
//! Two implementations are provided:
//!
//! * [`serial`] - a real serial port, through the `serialport` crate
//! * [`mock`] - an in-memory board used by tests and by the simulation mode

pub mod mock;
pub mod serial;

use thiserror::Error;

use crate::relay::RelayCommand;

pub use mock::{MockBoard, MockCommandWriter, MockLineReader};
pub use serial::{SerialCommandWriter, SerialLineReader, SerialTransport};

/// Errors raised by the link to the board.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device could not be opened. Fatal at startup.
    #[error("Serial port {address} is unavailable: {reason}")]
    PortUnavailable { address: String, reason: String },

    /// The link dropped while reading. The reader must stop and release the handle.
    #[error("Serial link closed: {0}")]
    Closed(String),

    /// A command frame could not be written. The command is dropped, not retried.
    #[error("Failed to write command frame: {0}")]
    WriteFailure(#[source] std::io::Error),
}

/// Reading half of the link.
pub trait LineReader: Send {
    /// Wait for the next complete line.
    ///
    /// ### Returns
    ///
    /// * `Ok(Some(line))` - a complete line, without its terminator
    /// * `Ok(None)` - the poll timeout elapsed without a complete line
    /// * `Err(TransportError::Closed)` - the link is gone; do not call again
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;
}

/// Writing half of the link.
pub trait CommandWriter: Send {
    /// Format `command` as `RELAY:<id>,<state>\n` and write it synchronously.
    fn write_command(&mut self, command: &RelayCommand) -> Result<(), TransportError>;
}

impl<T: LineReader + ?Sized> LineReader for Box<T> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        (**self).read_line()
    }
}

impl<T: CommandWriter + ?Sized> CommandWriter for Box<T> {
    fn write_command(&mut self, command: &RelayCommand) -> Result<(), TransportError> {
        (**self).write_command(command)
    }
}
