//! Console capture and batch upload for app development tooling.
//!
//! The relay observes a process's `tracing` emissions through a subscriber
//! layer, keeps a bounded history of recent entries for a dev-console UI,
//! and forwards flattened records to a collection endpoint in size- and
//! time-bounded batches. Delivery is best effort by design: transport
//! failures are swallowed and never retried, and the pipeline filters out
//! its own traffic so it cannot report on itself.
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let relay = console_relay::init()?;
//!     tracing::info!("captured for display and queued for upload");
//!     relay.shutdown();
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

mod batch;
mod config;
mod layer;
mod level;
mod store;
mod transport;
mod value;

pub use config::RelayConfig;
pub use layer::CaptureLayer;
pub use level::LogLevel;
pub use store::{ConsoleState, ConsoleStore, LogEntry};
pub use transport::{HttpTransport, LogPayload, LogTransport};
pub use value::{LogValue, OPAQUE_PLACEHOLDER, format_values};

use std::sync::OnceLock;

use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// The installed relay. Doubles as the guard against double
/// initialization: once set, later `init` calls are no-ops.
static RELAY: OnceLock<ConsoleRelay> = OnceLock::new();

/// Handle to a capture pipeline.
#[derive(Debug, Clone)]
pub struct ConsoleRelay {
    store: ConsoleStore,
    batcher: batch::BatcherHandle,
}

impl ConsoleRelay {
    /// Build a pipeline without installing a global subscriber. The caller
    /// composes the returned layer into its own subscriber stack.
    ///
    /// Must be called inside a Tokio runtime; the upload worker is spawned
    /// onto it.
    pub fn new(config: &RelayConfig) -> Result<(Self, CaptureLayer), String> {
        let transport = HttpTransport::new(&config.endpoint)?;
        Self::with_transport(config, transport)
    }

    /// Same as [`ConsoleRelay::new`], with a caller-supplied transport.
    pub fn with_transport<T: LogTransport>(
        config: &RelayConfig,
        transport: T,
    ) -> Result<(Self, CaptureLayer), String> {
        tokio::runtime::Handle::try_current()
            .map_err(|_| "console-relay must be initialized inside a tokio runtime".to_string())?;

        let store = ConsoleStore::new(config.history_limit);
        let batcher = batch::spawn(transport, config.batch_interval, config.max_batch_size);
        let layer = CaptureLayer::new(store.clone(), batcher.clone(), config.source_url.clone());

        Ok((Self { store, batcher }, layer))
    }

    /// The display store backing the console UI.
    pub fn store(&self) -> &ConsoleStore {
        &self.store
    }

    /// Owned copy of the current console state.
    pub fn snapshot(&self) -> ConsoleState {
        self.store.snapshot()
    }

    /// Receiver resolving whenever the console state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConsoleState> {
        self.store.subscribe()
    }

    /// Drop all retained display entries.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Submit still-queued payloads as one final detached transmission and
    /// stop the upload worker. Capture into the display store continues;
    /// later payloads are dropped silently.
    pub fn shutdown(&self) {
        self.batcher.shutdown();
    }
}

/// Install the relay with environment-derived configuration.
///
/// Call once at application startup, before other log-producing code runs.
/// The first call builds the pipeline and installs a global subscriber
/// (stderr output plus capture); later calls return the existing handle
/// unchanged.
pub fn init() -> Result<ConsoleRelay, String> {
    init_with_config(RelayConfig::from_env())
}

/// Install the relay with explicit configuration. See [`init`].
pub fn init_with_config(config: RelayConfig) -> Result<ConsoleRelay, String> {
    if let Some(existing) = RELAY.get() {
        return Ok(existing.clone());
    }

    let (relay, capture_layer) = ConsoleRelay::new(&config)?;
    let handle = relay.clone();

    if RELAY.set(relay).is_err() {
        // Lost an initialization race with another thread; tear down the
        // redundant worker and hand out the stored pipeline.
        handle.shutdown();
        return RELAY
            .get()
            .cloned()
            .ok_or_else(|| "Failed to read back relay handle".to_string());
    }

    install_subscriber(capture_layer, &handle);
    Ok(handle)
}

/// The installed relay, if [`init`] has run.
pub fn current() -> Option<ConsoleRelay> {
    RELAY.get().cloned()
}

fn install_subscriber(capture_layer: CaptureLayer, relay: &ConsoleRelay) {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .with(capture_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized; console capture is inactive");
        return;
    }

    relay.store.set_capturing(true);
}
