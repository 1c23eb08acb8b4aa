//! Queueing and flushing of wire payloads in bounded batches.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::transport::{LogPayload, LogTransport};

/// Messages that never leave the process: the relay's own diagnostic
/// prefixes and well-known dev-tooling banners. Forwarding them would have
/// the pipeline reporting on itself or on ambient environment noise.
const NOISE_MARKERS: &[&str] = &[
    "[ConsoleListener]",
    "[ErrorReporter]",
    "Download the React DevTools",
    "[vite]",
];

pub(crate) fn is_internal_noise(message: &str) -> bool {
    NOISE_MARKERS.iter().any(|marker| message.contains(marker))
}

#[derive(Debug)]
enum Command {
    Enqueue(LogPayload),
    Shutdown,
}

/// Producer-side handle to the batch worker.
#[derive(Debug, Clone)]
pub struct BatcherHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl BatcherHandle {
    /// Queue a payload for upload. Internal-noise messages are discarded
    /// here, before they reach the queue. A handle whose worker has shut
    /// down drops payloads silently.
    pub fn enqueue(&self, payload: LogPayload) {
        if is_internal_noise(&payload.message) {
            return;
        }
        let _ = self.tx.send(Command::Enqueue(payload));
    }

    /// Ask the worker to submit everything still queued as one final
    /// detached transmission and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// Spawn the batch worker onto the current runtime.
pub(crate) fn spawn<T: LogTransport>(
    transport: T,
    batch_interval: Duration,
    max_batch_size: usize,
) -> BatcherHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(rx, transport, batch_interval, max_batch_size));
    BatcherHandle { tx }
}

/// The worker owns the queue and the flush deadline, so queue mutation
/// needs no locking. Payloads flush in enqueue order, at most
/// `max_batch_size` per request.
async fn run_worker<T: LogTransport>(
    mut rx: mpsc::UnboundedReceiver<Command>,
    transport: T,
    batch_interval: Duration,
    max_batch_size: usize,
) {
    let mut queue: VecDeque<LogPayload> = VecDeque::new();
    // Some while a flush is scheduled, None while idle.
    let mut deadline: Option<Instant> = None;

    debug!("Batch worker started");

    loop {
        let wake = deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            biased;
            command = rx.recv() => match command {
                Some(Command::Enqueue(payload)) => {
                    queue.push_back(payload);
                    if queue.len() >= max_batch_size {
                        // Clear the pending deadline before the out-of-band
                        // flush so the batch cannot be sent twice.
                        deadline = None;
                        flush(&mut queue, &transport, max_batch_size).await;
                        if !queue.is_empty() {
                            deadline = Some(Instant::now() + batch_interval);
                        }
                    } else if deadline.is_none() {
                        deadline = Some(Instant::now() + batch_interval);
                    }
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                deadline = None;
                flush(&mut queue, &transport, max_batch_size).await;
                if !queue.is_empty() {
                    // Keep draining backlog on the regular cadence.
                    deadline = Some(Instant::now() + batch_interval);
                }
            }
        }
    }

    // Teardown: whatever is still queued goes out as one detached,
    // best-effort transmission.
    if !queue.is_empty() {
        transport.deliver_detached(queue.drain(..).collect());
    }
    debug!("Batch worker stopped");
}

/// Drain up to one batch (oldest first) and attempt delivery. Failures are
/// swallowed; the drained payloads are dropped either way.
async fn flush<T: LogTransport>(
    queue: &mut VecDeque<LogPayload>,
    transport: &T,
    max_batch_size: usize,
) {
    if queue.is_empty() {
        return;
    }
    let take = queue.len().min(max_batch_size);
    let batch: Vec<LogPayload> = queue.drain(..take).collect();
    let _ = transport.deliver(batch).await;
}
