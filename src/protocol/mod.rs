// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial wire protocol
//!
//! The sensor board speaks a line-oriented ASCII protocol. Every frame is one
//! newline-terminated line; there are no frames spanning several lines.
//!
//! ## Inbound frames
//!
//! | Frame | Fields |
//! |---|---|
//! | `DATA:<f>,<f>` | turbidity (NTU), TDS (ppm) |
//! | `RELAY_STATE:<i>,<i>,<i>,<i>` | relay 1..4 current state |
//! | `INIT:<i>,<i>,<i>,<i>` | relay 1..4 initial state |
//!
//! Prefixes are case-sensitive and must start the line. Anything else is
//! [`Frame::Unknown`] and ignored.
//!
//! ## Outbound frames
//!
//! | Frame | Fields |
//! |---|---|
//! | `RELAY:<id>,<state>\n` | command to set one relay |

pub mod frame;

pub use frame::{parse_frame, Frame, FrameError, SensorReading};

use crate::relay::RelayCommand;

pub const DATA_PREFIX: &str = "DATA:";
pub const RELAY_STATE_PREFIX: &str = "RELAY_STATE:";
pub const INIT_PREFIX: &str = "INIT:";
pub const RELAY_COMMAND_PREFIX: &str = "RELAY:";

/// Format a relay command as an outbound frame, terminator included.
///
/// ```
/// use water_quality_bridge::protocol::encode_command;
/// use water_quality_bridge::relay::RelayCommand;
///
/// let command = RelayCommand::parse("2", "1").unwrap();
/// assert_eq!(encode_command(&command), "RELAY:2,1\n");
/// ```
pub fn encode_command(command: &RelayCommand) -> String {
    format!(
        "{}{},{}\n",
        RELAY_COMMAND_PREFIX,
        command.id.get(),
        command.state.as_u8()
    )
}
