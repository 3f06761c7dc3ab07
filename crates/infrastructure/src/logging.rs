use rdns_application::ports::{LogLevel, LogSink};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Default log sink: forwards into the `tracing` ecosystem at the mapped
/// level. Messages below `min_level` are dropped.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogSink {
    min_level: LogLevel,
}

impl TracingLogSink {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Debug,
        }
    }

    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        match level {
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error | LogLevel::Fatal => error!("{}", message),
        }
    }
}

/// Sink that captures messages in memory; test support.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(recorded, message)| *recorded == level && message.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
