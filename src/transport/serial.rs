// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial port implementation of the board link
//!
//! The port is opened once with 8N1 framing and no flow control, then cloned
//! into an independent reading handle and writing handle.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use log::{debug, info, warn};
use serialport::SerialPort;

use super::{CommandWriter, LineReader, TransportError};
use crate::protocol::encode_command;
use crate::relay::RelayCommand;

/// Longest line kept while waiting for a terminator. Longer garbage is dropped.
const MAX_LINE_LENGTH: usize = 4096;

/// Opens the serial device shared by the reader and the writer.
pub struct SerialTransport;

impl SerialTransport {
    /// Open `address` at `baud_rate` and split it into its two halves.
    ///
    /// `read_timeout` bounds each blocking read, and therefore how long a
    /// shutdown request can wait on a silent link.
    ///
    /// ### Errors
    ///
    /// [`TransportError::PortUnavailable`] if the device cannot be opened or
    /// its handle cannot be cloned.
    pub fn open(
        address: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<(SerialLineReader, SerialCommandWriter), TransportError> {
        let unavailable = |err: serialport::Error| TransportError::PortUnavailable {
            address: address.to_string(),
            reason: err.to_string(),
        };

        let port = serialport::new(address, baud_rate)
            .timeout(read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(unavailable)?;
        let writer = port.try_clone().map_err(unavailable)?;

        info!("Serial port {} opened at {} baud", address, baud_rate);
        Ok((
            SerialLineReader::new(port),
            SerialCommandWriter { port: writer },
        ))
    }
}

/// Reading half of a serial port, assembling bytes into lines.
///
/// Generic over the byte source so the line assembly also works on any
/// [`Read`] implementation.
pub struct SerialLineReader<P: Read + Send = Box<dyn SerialPort>> {
    port: P,
    pending: Vec<u8>,
}

impl<P: Read + Send> SerialLineReader<P> {
    /// Assemble lines from `port`, which should time out its reads
    pub fn new(port: P) -> Self {
        Self {
            port,
            pending: Vec::with_capacity(256),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<P: Read + Send> LineReader for SerialLineReader<P> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; 256];
        match self.port.read(&mut chunk) {
            Ok(0) => Err(TransportError::Closed("end of stream".to_string())),
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                if self.pending.len() > MAX_LINE_LENGTH && !self.pending.contains(&b'\n') {
                    warn!(
                        "Discarding {} bytes received without a line terminator",
                        self.pending.len()
                    );
                    self.pending.clear();
                }
                Ok(self.take_line())
            }
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Closed(err.to_string())),
        }
    }
}

/// Writing half of a serial port.
pub struct SerialCommandWriter {
    port: Box<dyn SerialPort>,
}

impl CommandWriter for SerialCommandWriter {
    fn write_command(&mut self, command: &RelayCommand) -> Result<(), TransportError> {
        let frame = encode_command(command);
        debug!("Writing frame {:?}", frame.trim_end());
        self.port
            .write_all(frame.as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(TransportError::WriteFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Byte source replaying scripted chunks and errors
    struct ScriptedPort {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedPort {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => Err(io::Error::new(ErrorKind::TimedOut, "no more data")),
            }
        }
    }

    fn reader(reads: Vec<io::Result<Vec<u8>>>) -> SerialLineReader<ScriptedPort> {
        SerialLineReader::new(ScriptedPort::new(reads))
    }

    fn line(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut reader = reader(vec![Ok(b"DATA:1.5,200\r\n".to_vec())]);
        assert_eq!(reader.read_line().unwrap(), line("DATA:1.5,200"));
    }

    #[test]
    fn test_several_lines_in_one_chunk() {
        let mut reader = reader(vec![Ok(
            b"INIT:0,0,0,0\nDATA:1,2\r\nRELAY_STATE:1,0,0,0\n".to_vec(),
        )]);
        assert_eq!(reader.read_line().unwrap(), line("INIT:0,0,0,0"));
        assert_eq!(reader.read_line().unwrap(), line("DATA:1,2"));
        assert_eq!(reader.read_line().unwrap(), line("RELAY_STATE:1,0,0,0"));
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut reader = reader(vec![
            Ok(b"DATA:4.".to_vec()),
            Ok(b"25,31".to_vec()),
            Ok(b"0.5\r".to_vec()),
            Ok(b"\n".to_vec()),
        ]);
        assert_eq!(reader.read_line().unwrap(), None);
        assert_eq!(reader.read_line().unwrap(), None);
        assert_eq!(reader.read_line().unwrap(), None);
        assert_eq!(reader.read_line().unwrap(), line("DATA:4.25,310.5"));
    }

    #[test]
    fn test_overlong_garbage_is_dropped() {
        let mut reads: Vec<io::Result<Vec<u8>>> = (0..17).map(|_| Ok(vec![b'x'; 256])).collect();
        reads.push(Ok(b"DATA:1,2\n".to_vec()));
        let mut reader = reader(reads);

        let mut lines = Vec::new();
        for _ in 0..18 {
            if let Some(line) = reader.read_line().unwrap() {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["DATA:1,2".to_string()]);
        assert!(reader.pending.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let mut reader = reader(vec![Ok(b"DATA:1,\xff2\n".to_vec())]);
        assert_eq!(reader.read_line().unwrap(), line("DATA:1,\u{FFFD}2"));
    }

    #[test]
    fn test_timeouts_yield_nothing() {
        let mut reader = reader(vec![
            Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            Err(io::Error::new(ErrorKind::Interrupted, "signal")),
        ]);
        assert_eq!(reader.read_line().unwrap(), None);
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn test_end_of_stream_is_closed() {
        let mut reader = reader(vec![Ok(Vec::new())]);
        assert!(matches!(reader.read_line(), Err(TransportError::Closed(_))));
    }

    #[test]
    fn test_io_error_is_closed() {
        let mut reader = reader(vec![Err(io::Error::new(
            ErrorKind::BrokenPipe,
            "device unplugged",
        ))]);
        match reader.read_line() {
            Err(TransportError::Closed(reason)) => assert!(reason.contains("unplugged")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_buffered_line_served_before_reading() {
        let mut reader = reader(vec![
            Ok(b"DATA:1,2\nDATA:3,4\n".to_vec()),
            Ok(Vec::new()),
        ]);
        assert_eq!(reader.read_line().unwrap(), line("DATA:1,2"));
        assert_eq!(reader.read_line().unwrap(), line("DATA:3,4"));
        assert!(matches!(reader.read_line(), Err(TransportError::Closed(_))));
    }

    #[test]
    fn test_open_missing_device_is_port_unavailable() {
        let result = SerialTransport::open(
            "/dev/this-serial-port-does-not-exist",
            9600,
            Duration::from_millis(100),
        );
        match result {
            Err(TransportError::PortUnavailable { address, .. }) => {
                assert_eq!(address, "/dev/this-serial-port-does-not-exist")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing device should fail"),
        }
    }
}
