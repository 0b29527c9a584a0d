// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::bridge::{LatestReading, ReaderLoop, ReaderState, ReaderStatus, RelayController};
use crate::config::{Config, PersistenceBackend, PersistenceConfig};
use crate::persistence::{MemoryStore, ReadingHistory, ReadingSink, SqliteStore};
use crate::relay::RelayStateCache;
use crate::transport::{CommandWriter, LineReader, MockBoard, SerialTransport};
use crate::visualization::api::ApiState;
use crate::visualization::build_figment;
use crate::visualization::server::build_rocket;

/// Interval between two frames of the simulated board
const SIMULATOR_INTERVAL: Duration = Duration::from_secs(2);

/// Both faces of the opened reading store
struct Storage {
    sink: Arc<dyn ReadingSink>,
    history: Arc<dyn ReadingHistory>,
}

/// Owns the bridge components and the background tasks driving them
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    /// Wakes the heartbeat on shutdown
    stop: Arc<Notify>,
    /// Raised when the link or the web server dies
    fatal: Arc<Notify>,
    cache: RelayStateCache,
    latest: LatestReading,
    controller: Option<RelayController>,
    reader_status: Option<ReaderStatus>,
    rocket_shutdown: Option<rocket::Shutdown>,
    join_timeout: Duration,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            stop: Arc::new(Notify::new()),
            fatal: Arc::new(Notify::new()),
            cache: RelayStateCache::new(),
            latest: LatestReading::new(),
            controller: None,
            reader_status: None,
            rocket_shutdown: None,
            join_timeout: Duration::from_secs(5),
        }
    }

    /// Open the board link described by `config` and launch every task.
    ///
    /// ### Errors
    ///
    /// Fails when the serial port cannot be opened, the reading store cannot
    /// be opened or the web server cannot be configured. Every task already
    /// started is told to stop in that case.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let (reader, writer): (Box<dyn LineReader>, Box<dyn CommandWriter>) =
            if config.serial.simulate {
                info!("Using the simulated board");
                let (reader, writer, board) = MockBoard::link(config.serial.read_timeout());
                self.start_simulator(board);
                (Box::new(reader), Box::new(writer))
            } else {
                let (reader, writer) = SerialTransport::open(
                    &config.serial.port,
                    config.serial.baud_rate,
                    config.serial.read_timeout(),
                )
                .with_context(|| format!("Cannot open serial port {}", config.serial.port))?;
                (Box::new(reader), Box::new(writer))
            };

        self.launch_with_link(config, reader, writer).await
    }

    /// Launch every task over an already opened link
    ///
    /// On failure the daemon is shut down before the error is returned.
    pub async fn launch_with_link(
        &mut self,
        config: &Config,
        reader: Box<dyn LineReader>,
        writer: Box<dyn CommandWriter>,
    ) -> Result<()> {
        self.join_timeout = Duration::from_secs(config.daemon.join_timeout_s.max(1));

        let storage = match open_storage(&config.persistence) {
            Ok(storage) => storage,
            Err(err) => {
                self.shutdown();
                return Err(err);
            }
        };
        let controller = RelayController::new(self.cache.clone(), writer);
        self.controller = Some(controller.clone());

        if config.visualization.enabled {
            let state = ApiState {
                controller,
                latest: self.latest.clone(),
                history: storage.as_ref().map(|s| s.history.clone()),
                history_limit: config.persistence.history_limit,
            };
            if let Err(err) = self.start_web_server(config, state).await {
                self.shutdown();
                return Err(err);
            }
        }

        self.start_reader(reader, storage.map(|s| s.sink));
        self.start_heartbeat(Duration::from_secs(
            config.daemon.heartbeat_interval_s.max(1),
        ));

        Ok(())
    }

    /// Start the Rocket web server
    async fn start_web_server(&mut self, config: &Config, state: ApiState) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.visualization.address, config.visualization.port
        );

        let figment = build_figment(&config.visualization)?;
        let rocket = build_rocket(figment, state)
            .ignite()
            .await
            .context("Failed to configure the web server")?;
        self.rocket_shutdown = Some(rocket.shutdown());

        let fatal = self.fatal.clone();
        let running = self.running.clone();
        let task = tokio::spawn(async move {
            if let Err(err) = rocket.launch().await {
                error!("Web server failed: {}", err);
                if running.swap(false, Ordering::SeqCst) {
                    fatal.notify_one();
                }
                return Err(anyhow!("Web server failed: {}", err));
            }
            info!("Web server stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the reader loop on a blocking thread
    fn start_reader(&mut self, reader: Box<dyn LineReader>, sink: Option<Arc<dyn ReadingSink>>) {
        info!("Starting serial reader");

        let reader_loop = ReaderLoop::new(
            reader,
            self.cache.clone(),
            sink,
            self.latest.clone(),
            self.running.clone(),
        );
        self.reader_status = Some(reader_loop.status());
        let running = self.running.clone();
        let fatal = self.fatal.clone();

        let task = tokio::task::spawn_blocking(move || match reader_loop.run() {
            Ok(()) => Ok(()),
            Err(err) if running.swap(false, Ordering::SeqCst) => {
                // The link is gone, nothing else can make progress
                fatal.notify_one();
                Err(anyhow!(err))
            }
            Err(err) => {
                debug!("Link closed during shutdown: {}", err);
                Ok(())
            }
        });

        self.tasks.push(task);
    }

    /// Run the simulated board until shutdown
    fn start_simulator(&mut self, board: MockBoard) {
        let handle = board.spawn_simulator(SIMULATOR_INTERVAL, self.running.clone());
        let task = tokio::task::spawn_blocking(move || {
            handle
                .join()
                .map_err(|_| anyhow!("Simulated board thread panicked"))
        });
        self.tasks.push(task);
    }

    /// Start a heartbeat task that logs the relay states periodically
    fn start_heartbeat(&mut self, interval: Duration) {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let stop = self.stop.clone();
        let cache = self.cache.clone();
        let latest = self.latest.clone();
        let reader_status = self.reader_status.clone();
        let task = tokio::spawn(async move {
            loop {
                // Registered before the flag is checked so a concurrent
                // shutdown cannot slip in between
                let stopped = stop.notified();
                tokio::pin!(stopped);
                stopped.as_mut().enable();
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let reader = reader_status.as_ref().map(ReaderStatus::get);
                match latest.get() {
                    Some(reading) => debug!(
                        "Daemon heartbeat: reader {:?}, relays {}, last reading turbidity={} tds={} at {}",
                        reader,
                        cache.get(),
                        reading.turbidity,
                        reading.tds,
                        reading.timestamp
                    ),
                    None => debug!(
                        "Daemon heartbeat: reader {:?}, relays {}, no reading yet",
                        reader,
                        cache.get()
                    ),
                }
                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = stopped => break,
                }
            }
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Relay cache shared by the reader loop and the controller
    pub fn cache(&self) -> &RelayStateCache {
        &self.cache
    }

    /// Last reading parsed from the link
    pub fn latest(&self) -> &LatestReading {
        &self.latest
    }

    /// Relay controller, available once launched
    pub fn controller(&self) -> Option<&RelayController> {
        self.controller.as_ref()
    }

    /// State of the reader loop, `None` before launch
    pub fn reader_state(&self) -> Option<ReaderState> {
        self.reader_status.as_ref().map(ReaderStatus::get)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolve once the board link closed or the web server died
    pub async fn wait_fatal(&self) {
        self.fatal.notified().await;
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_waiters();
        if let Some(shutdown) = &self.rocket_shutdown {
            shutdown.clone().notify();
        }
    }

    /// Wait for all tasks to complete
    ///
    /// Each task gets the configured join timeout. A task that does not finish
    /// in time is logged and abandoned.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match time::timeout(self.join_timeout, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!("Task ended with an error: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        Ok(())
    }
}

/// Open the reading store, `None` when persistence is disabled
fn open_storage(config: &PersistenceConfig) -> Result<Option<Storage>> {
    if !config.enabled {
        info!("Reading persistence disabled");
        return Ok(None);
    }

    let storage = match config.backend {
        PersistenceBackend::Sqlite => {
            let store = Arc::new(SqliteStore::open(&config.database_path).with_context(|| {
                format!("Cannot open reading database {}", config.database_path)
            })?);
            info!("Storing readings in {}", config.database_path);
            Storage {
                sink: store.clone(),
                history: store,
            }
        }
        PersistenceBackend::Memory => {
            let store = Arc::new(MemoryStore::default());
            info!("Storing readings in memory");
            Storage {
                sink: store.clone(),
                history: store,
            }
        }
    };
    Ok(Some(storage))
}
