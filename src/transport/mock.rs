// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory board link
//!
//! [`MockBoard::link`] returns the two halves of a link plus a [`MockBoard`]
//! handle playing the role of the microcontroller: it injects inbound lines,
//! records outbound frames, can make writes fail and can drop the link.
//!
//! [`MockBoard::spawn_simulator`] turns the handle into a small board
//! simulation (periodic `DATA:` frames, relay commands echoed back as
//! `RELAY_STATE:`) so the daemon can run without hardware.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};

use super::{CommandWriter, LineReader, TransportError};
use crate::protocol::encode_command;
use crate::relay::{RelayCommand, RelayState, RELAY_COUNT};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Board side of an in-memory link.
#[derive(Clone)]
pub struct MockBoard {
    sender: Arc<Mutex<Option<Sender<String>>>>,
    written: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockBoard {
    /// Create a link whose reader polls for `poll_timeout` before yielding `Ok(None)`.
    pub fn link(poll_timeout: Duration) -> (MockLineReader, MockCommandWriter, MockBoard) {
        let (sender, receiver) = mpsc::channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let board = MockBoard {
            sender: Arc::new(Mutex::new(Some(sender))),
            written: written.clone(),
            fail_writes: fail_writes.clone(),
        };
        let reader = MockLineReader {
            receiver,
            poll_timeout,
        };
        let writer = MockCommandWriter {
            written,
            fail_writes,
        };
        (reader, writer, board)
    }

    /// Queue a line for the reader. Returns `false` once the link is closed.
    pub fn send_line(&self, line: &str) -> bool {
        match lock(&self.sender).as_ref() {
            Some(sender) => sender.send(line.to_string()).is_ok(),
            None => false,
        }
    }

    /// Drop the link. The reader drains queued lines, then reports `Closed`.
    pub fn close(&self) {
        lock(&self.sender).take();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }

    /// Frames written by the host so far, terminators included.
    pub fn written(&self) -> Vec<String> {
        lock(&self.written).clone()
    }

    /// Frames written since the last call, terminators included.
    pub fn take_written(&self) -> Vec<String> {
        std::mem::take(&mut *lock(&self.written))
    }

    /// Make every following write fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Run a simulated board on a background thread until `running` is cleared
    /// or the host reading half is dropped.
    ///
    /// The simulator announces `INIT:0,0,0,0`, then emits one `DATA:` frame
    /// per `interval` and answers every relay command with a `RELAY_STATE:`
    /// frame reflecting its own relay outputs.
    pub fn spawn_simulator(self, interval: Duration, running: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::spawn(move || {
            info!("Simulated board started");
            let mut relays = [RelayState::Off; RELAY_COUNT];
            let mut tick: u64 = 0;
            self.send_line(&state_line("INIT", &relays));

            while running.load(Ordering::SeqCst) && !self.is_closed() {
                let commands = self.take_written();
                if !commands.is_empty() {
                    for frame in &commands {
                        apply_command_frame(frame, &mut relays);
                    }
                    if !self.send_line(&state_line("RELAY_STATE", &relays)) {
                        break;
                    }
                }

                // Slowly drifting values, enough to make the dashboard move.
                let phase = tick as f64 / 10.0;
                let turbidity = 5.0 + 2.0 * phase.sin();
                let tds = 300.0 + 25.0 * phase.cos();
                if !self.send_line(&format!("DATA:{:.2},{:.2}", turbidity, tds)) {
                    debug!("Host side of the simulated link is gone");
                    break;
                }
                tick += 1;

                thread::sleep(interval);
            }
            debug!("Simulated board stopped");
        })
    }
}

fn state_line(prefix: &str, relays: &[RelayState; RELAY_COUNT]) -> String {
    let values: Vec<String> = relays.iter().map(|s| s.to_string()).collect();
    format!("{}:{}", prefix, values.join(","))
}

fn apply_command_frame(frame: &str, relays: &mut [RelayState; RELAY_COUNT]) {
    let Some(payload) = frame.trim_end().strip_prefix("RELAY:") else {
        return;
    };
    if let Some((relay, state)) = payload.split_once(',') {
        if let Ok(command) = RelayCommand::parse(relay, state) {
            relays[command.id.get() as usize - 1] = command.state;
        }
    }
}

/// Host reading half of an in-memory link.
pub struct MockLineReader {
    receiver: Receiver<String>,
    poll_timeout: Duration,
}

impl LineReader for MockLineReader {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.receiver.recv_timeout(self.poll_timeout) {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TransportError::Closed("mock board disconnected".to_string()))
            }
        }
    }
}

/// Host writing half of an in-memory link.
pub struct MockCommandWriter {
    written: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl CommandWriter for MockCommandWriter {
    fn write_command(&mut self, command: &RelayCommand) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailure(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock board rejected the write",
            )));
        }
        lock(&self.written).push(encode_command(command));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_then_closed() {
        let (mut reader, _writer, board) = MockBoard::link(Duration::from_millis(10));
        assert!(board.send_line("DATA:1,2"));
        assert_eq!(reader.read_line().unwrap(), Some("DATA:1,2".to_string()));
        assert_eq!(reader.read_line().unwrap(), None);

        board.send_line("INIT:0,0,0,0");
        board.close();
        assert!(!board.send_line("DATA:3,4"));
        assert_eq!(reader.read_line().unwrap(), Some("INIT:0,0,0,0".to_string()));
        assert!(matches!(reader.read_line(), Err(TransportError::Closed(_))));
    }

    #[test]
    fn test_writes_are_recorded_or_rejected() {
        let (_reader, mut writer, board) = MockBoard::link(Duration::from_millis(10));
        let command = RelayCommand::parse("3", "1").unwrap();
        writer.write_command(&command).unwrap();
        assert_eq!(board.written(), vec!["RELAY:3,1\n".to_string()]);

        board.fail_writes(true);
        assert!(matches!(
            writer.write_command(&command),
            Err(TransportError::WriteFailure(_))
        ));
        assert_eq!(board.take_written().len(), 1);
        assert!(board.written().is_empty());
    }

    #[test]
    fn test_simulator_echoes_commands() {
        let (mut reader, mut writer, board) = MockBoard::link(Duration::from_millis(500));
        let running = Arc::new(AtomicBool::new(true));
        let handle = board
            .clone()
            .spawn_simulator(Duration::from_millis(5), running.clone());

        assert_eq!(reader.read_line().unwrap(), Some("INIT:0,0,0,0".to_string()));
        writer
            .write_command(&RelayCommand::parse("2", "1").unwrap())
            .unwrap();

        let mut echoed = false;
        for _ in 0..200 {
            if let Some(line) = reader.read_line().unwrap() {
                if line == "RELAY_STATE:0,1,0,0" {
                    echoed = true;
                    break;
                }
            }
        }
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
        assert!(echoed, "simulator never echoed the relay command");
    }

    #[test]
    fn test_simulator_stops_when_reader_is_dropped() {
        let (reader, _writer, board) = MockBoard::link(Duration::from_millis(10));
        let running = Arc::new(AtomicBool::new(true));
        let handle = board.spawn_simulator(Duration::from_millis(5), running.clone());

        drop(reader);
        handle.join().unwrap();
        assert!(running.load(Ordering::SeqCst));
    }
}
