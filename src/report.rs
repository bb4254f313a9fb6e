//! Message sink for run progress and anomalies
//!
//! The batch runner never prints. It hands every message to a
//! [`MessageSink`] and the caller decides whether that ends up on a
//! console, in a dialog or in a log file.

use std::fmt;
use tracing::{error, info, warn};

/// Severity of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Progress and summaries
    Info,
    /// Non-fatal anomaly (sequence overflow, missing folder)
    Warning,
    /// A file could not be processed or may be corrupted
    Error,
}

/// A single message emitted by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Destination for runner messages
pub trait MessageSink {
    fn emit(&mut self, message: Message);
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn emit(&mut self, message: Message) {
        (**self).emit(message);
    }
}

/// Forwards messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn emit(&mut self, message: Message) {
        match message.level {
            Level::Info => info!("{}", message.text),
            Level::Warning => warn!("{}", message.text),
            Level::Error => error!("{}", message.text),
        }
    }
}

/// Keeps every message in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub messages: Vec<Message>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of one level, in emission order
    pub fn at_level(&self, level: Level) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.level == level)
    }

    /// Whether any message of `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.at_level(level).any(|m| m.text.contains(needle))
    }
}

impl MessageSink for MemorySink {
    fn emit(&mut self, message: Message) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_level() {
        let mut sink = MemorySink::new();
        sink.emit(Message::info("1/2 Skipped IMG-20201018-WA0000.jpg"));
        sink.emit(Message::warning("time order lost"));
        sink.emit(Message::error("possibly corrupted"));

        assert_eq!(sink.at_level(Level::Info).count(), 1);
        assert!(sink.contains(Level::Warning, "order"));
        assert!(!sink.contains(Level::Info, "corrupted"));
    }

    #[test]
    fn test_sink_through_mut_reference() {
        fn emit_twice(mut sink: impl MessageSink) {
            sink.emit(Message::info("a"));
            sink.emit(Message::info("b"));
        }

        let mut sink = MemorySink::new();
        emit_twice(&mut sink);
        assert_eq!(sink.messages.len(), 2);
    }
}
