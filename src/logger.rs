//! Store diagnostics
//!
//! Every `app_log!` call is forwarded to `tracing` and also kept in a bounded
//! in-memory history owned by a background thread, so hosts without a
//! subscriber can still show recent persistence failures.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Entries kept by the global history
pub const DEFAULT_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
    }

    fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(LogLevel::Info)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Module that emitted the message
    pub target: String,
    pub message: String,
}

enum Request {
    Record(LogEntry),
    Snapshot(Sender<Vec<LogEntry>>),
    Reset,
}

/// Oldest entries are dropped once `capacity` is reached
struct History {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY)),
            capacity: capacity.max(1),
        }
    }

    fn record(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// Handle to a history thread
pub struct Logger {
    requests: Sender<Request>,
    min_level: AtomicU8,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (requests, inbox) = bounded(DEFAULT_HISTORY);
        std::thread::spawn(move || Self::serve(inbox, capacity));

        Self {
            requests,
            min_level: AtomicU8::new(LogLevel::Debug as u8),
        }
    }

    fn serve(inbox: Receiver<Request>, capacity: usize) {
        let mut history = History::new(capacity);
        for request in inbox {
            match request {
                Request::Record(entry) => history.record(entry),
                Request::Snapshot(reply) => {
                    let _ = reply.send(history.snapshot());
                }
                Request::Reset => history.entries.clear(),
            }
        }
    }

    /// Record a message; dropped when below the minimum level or when the
    /// history thread is backed up
    pub fn log(&self, level: LogLevel, target: &str, message: &str) {
        if level < self.min_level() {
            return;
        }

        let _ = self.requests.try_send(Request::Record(LogEntry {
            timestamp: Utc::now(),
            level,
            target: target.to_string(),
            message: message.to_string(),
        }));
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn min_level(&self) -> LogLevel {
        LogLevel::from_index(self.min_level.load(Ordering::Relaxed))
    }

    /// Recorded entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let (reply, response) = bounded(1);
        if self.requests.send(Request::Snapshot(reply)).is_err() {
            return Vec::new();
        }
        response.recv().unwrap_or_default()
    }

    /// Entries whose message mentions `needle`, e.g. a storage key
    pub fn entries_mentioning(&self, needle: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.message.contains(needle))
            .collect()
    }

    pub fn clear(&self) {
        let _ = self.requests.try_send(Request::Reset);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    pub static ref LOGGER: Logger = Logger::new();
}

/// Install a `tracing` fmt subscriber filtered by `filter` (e.g. "branchstore=debug")
///
/// `RUST_LOG` wins when set. Later calls are ignored.
pub fn init_tracing(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}

/// Log through `tracing` and the in-memory history
#[macro_export]
macro_rules! app_log {
    ($level:expr, $($arg:tt)*) => {{
        let level: $crate::logger::LogLevel = $level;
        let message = format!($($arg)*);
        $crate::logger::LOGGER.log(level, module_path!(), &message);
        match level {
            $crate::logger::LogLevel::Error => tracing::error!("{}", message),
            $crate::logger::LogLevel::Warn => tracing::warn!("{}", message),
            $crate::logger::LogLevel::Info => tracing::info!("{}", message),
            $crate::logger::LogLevel::Debug => tracing::debug!("{}", message),
        }
    }};
}
