// SPDX-License-Identifier: GPL-2.0-or-later

use common::{ILogger, LogEntry, LogLevel, LogMessage, LogSource, MsgLogger};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::Deref,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::sync::broadcast;

/// Logger used everywhere across the workspace.
pub struct Logger {
    /// Internal logging feed.
    feed: broadcast::Sender<LogEntryWithTime>,

    sources: Vec<LogSource>,

    /// Entries above this level are dropped.
    max_level: LogLevel,
}

impl Logger {
    /// Creates a new logger.
    #[must_use]
    pub fn new(sources: Vec<LogSource>, max_level: LogLevel) -> Self {
        let (feed, _) = broadcast::channel(64);

        let mut sources = sources;
        sources.push(LogSource::try_from("affinity").expect("source should be valid"));
        sources.push(LogSource::try_from("matcher").expect("source should be valid"));
        sources.sort();
        sources.dedup();

        Self {
            feed,
            sources,
            max_level,
        }
    }

    /// Subscribes to the log feed and returns a channel that receives all log entries.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntryWithTime> {
        self.feed.subscribe()
    }

    #[must_use]
    pub fn sources(&self) -> &Vec<LogSource> {
        &self.sources
    }

    fn format_and_send(&self, log: LogEntryWithTime) {
        // Print to stdout.
        println!("{log}");

        // Only returns an error if there are no subscribers.
        self.feed.send(log).ok();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Vec::new(), LogLevel::Info)
    }
}

impl ILogger for Logger {
    /// Sends log entry to all subscribers. The timestamp is applied now.
    fn log(&self, log: LogEntry) {
        if log.level > self.max_level {
            return;
        }
        self.format_and_send(LogEntryWithTime {
            level: log.level,
            source: log.source,
            message: log.message,
            time: UnixMicro::now(),
        });
    }
}

/// `MsgLogger` that tags every message with a fixed source.
pub struct SourceLogger {
    logger: Arc<Logger>,
    source: &'static str,
}

impl SourceLogger {
    #[must_use]
    pub fn new(logger: Arc<Logger>, source: &'static str) -> Arc<Self> {
        Arc::new(Self { logger, source })
    }
}

impl MsgLogger for SourceLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        self.logger.log(LogEntry::new(level, self.source, msg));
    }
}

/// Microseconds since the `UNIX_EPOCH`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnixMicro(u64);

impl UnixMicro {
    /// Current time as `UnixMicro`.
    fn now() -> Self {
        UnixMicro(
            u64::try_from(
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("broken system clock")
                    .as_micros(),
            )
            .expect("really broken system clock"),
        )
    }
}

impl From<u64> for UnixMicro {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl Deref for UnixMicro {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Log entry with time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntryWithTime {
    /// Severity.
    pub level: LogLevel,

    /// Source.
    pub source: LogSource,

    /// Message.
    pub message: LogMessage,

    // Timestamp.
    pub time: UnixMicro,
}

impl fmt::Display for LogEntryWithTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Error => write!(f, "[ERROR] ")?,
            LogLevel::Warning => write!(f, "[WARNING] ")?,
            LogLevel::Info => write!(f, "[INFO] ")?,
            LogLevel::Debug => write!(f, "[DEBUG] ")?,
        };

        let mut src_titel = self.source.to_string();
        make_ascii_titlecase(&mut src_titel);

        write!(f, "{}: {}", src_titel, self.message)?;

        Ok(())
    }
}

/// Make the first character in a string uppercase.
fn make_ascii_titlecase(s: &mut str) {
    if let Some(r) = s.get_mut(0..1) {
        r.make_ascii_uppercase();
    }
}
