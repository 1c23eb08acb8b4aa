//! Bounded in-memory history of captured entries, for the dev-console UI.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::level::LogLevel;
use crate::value::LogValue;

/// Process-wide counter backing entry ids.
static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// One captured emission, retained for display.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Opaque, locally unique id (stable across snapshots).
    pub id: String,
    /// Capture time, epoch milliseconds.
    pub timestamp: i64,
    pub level: LogLevel,
    pub args: Vec<LogValue>,
}

impl LogEntry {
    pub fn new(level: LogLevel, args: Vec<LogValue>) -> Self {
        Self {
            id: format!("{:x}", NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed)),
            timestamp: chrono::Utc::now().timestamp_millis(),
            level,
            args,
        }
    }
}

/// Snapshot of the console observed by the UI.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    /// Retained entries, oldest first.
    pub logs: VecDeque<LogEntry>,
    pub is_capturing: bool,
}

impl ConsoleState {
    /// Entries at `error` level, recomputed from current contents.
    pub fn error_count(&self) -> usize {
        self.count_level(LogLevel::Error)
    }

    /// Entries at `warn` level, recomputed from current contents.
    pub fn warn_count(&self) -> usize {
        self.count_level(LogLevel::Warn)
    }

    fn count_level(&self, level: LogLevel) -> usize {
        self.logs.iter().filter(|entry| entry.level == level).count()
    }
}

/// Reactive store of the most recent entries.
///
/// Every mutation publishes a fresh [`ConsoleState`] through a watch
/// channel, so consumers re-render on change instead of polling.
#[derive(Debug, Clone)]
pub struct ConsoleStore {
    state: watch::Sender<ConsoleState>,
    limit: usize,
}

impl ConsoleStore {
    pub fn new(limit: usize) -> Self {
        let (state, _) = watch::channel(ConsoleState {
            logs: VecDeque::new(),
            is_capturing: false,
        });
        Self { state, limit }
    }

    /// Append an entry, evicting the oldest past the history limit.
    /// Always succeeds.
    pub fn append(&self, entry: LogEntry) {
        self.state.send_modify(|state| {
            state.logs.push_back(entry);
            while state.logs.len() > self.limit {
                state.logs.pop_front();
            }
        });
    }

    /// Drop all retained entries.
    pub fn clear(&self) {
        self.state.send_modify(|state| state.logs.clear());
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.state.send_modify(|state| state.is_capturing = capturing);
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> ConsoleState {
        self.state.borrow().clone()
    }

    /// Receiver that resolves whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConsoleState> {
        self.state.subscribe()
    }
}
