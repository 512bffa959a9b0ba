// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, convert::TryFrom, fmt, ops::Deref, str::FromStr, sync::Arc};
use thiserror::Error;

pub trait ILogger {
    /// Send log.
    fn log(&self, _: LogEntry) {}
}

/// Log entry. See `LogEntryWithTime`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub source: LogSource,
    pub message: LogMessage,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, source: &'static str, message: &str) -> Self {
        let source: LogSource = source.try_into().expect("source should be valid");
        let message = match LogMessage::try_from(message.to_owned()) {
            Ok(v) => v,
            Err(e) => LogMessage::try_from(format!("bad message: {e}"))
                .expect("error message should be a valid log message"),
        };
        Self {
            level,
            source,
            message,
        }
    }
}

/// Severity of the log message.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Something requires attention.
    Error,

    /// Something may require attention.
    Warning,

    /// Standard information.
    Info,

    /// Verbose debugging information.
    Debug,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLogLevelError {
    #[error("unknown log level: '{0}'")]
    UnknownLevel(String),
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(ParseLogLevelError::UnknownLevel(s.to_owned())),
        }
    }
}

#[macro_export]
macro_rules! impl_deserialize_try_from_and_display {
    ($type:ident) => {
        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                String::deserialize(deserializer)?
                    .try_into()
                    .map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

pub const LOG_SOURCE_MAX_LENGTH: usize = 8;

#[repr(transparent)]
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, PartialOrd, Ord)]
pub struct LogSource(Cow<'static, str>);
impl_deserialize_try_from_and_display!(LogSource);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLogSourceError {
    #[error("empty string")]
    Empty,

    #[error("invalid characters: '{0}'")]
    InvalidChars(String),

    #[error("too long")]
    TooLong,
}

fn validate_log_source(s: &str) -> Result<(), ParseLogSourceError> {
    use ParseLogSourceError::*;
    if s.is_empty() {
        return Err(Empty);
    }
    if !s.chars().all(char::is_alphanumeric) {
        return Err(InvalidChars(s.to_owned()));
    }
    if s.len() > LOG_SOURCE_MAX_LENGTH {
        return Err(TooLong);
    }
    Ok(())
}

impl TryFrom<String> for LogSource {
    type Error = ParseLogSourceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_log_source(&s)?;
        Ok(Self(Cow::Owned(s)))
    }
}

impl TryFrom<&'static str> for LogSource {
    type Error = ParseLogSourceError;

    fn try_from(s: &'static str) -> Result<Self, Self::Error> {
        validate_log_source(s)?;
        Ok(Self(Cow::Borrowed(s)))
    }
}

impl FromStr for LogSource {
    type Err = ParseLogSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl Deref for LogSource {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[repr(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LogMessage(String);
impl_deserialize_try_from_and_display!(LogMessage);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLogMessageError {
    #[error("empty string")]
    Empty,

    #[error("too long")]
    TooLong,
}

const LOG_MESSAGE_MAX_LENGTH: usize = 1024 * 4;

impl TryFrom<String> for LogMessage {
    type Error = ParseLogMessageError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(ParseLogMessageError::Empty);
        }
        if s.len() > LOG_MESSAGE_MAX_LENGTH {
            return Err(ParseLogMessageError::TooLong);
        }
        Ok(Self(s))
    }
}

impl FromStr for LogMessage {
    type Err = ParseLogMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl Deref for LogMessage {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub type ArcMsgLogger = Arc<dyn MsgLogger + Send + Sync>;

/// Logger that is already bound to a source.
pub trait MsgLogger {
    fn log(&self, level: LogLevel, msg: &str);
}

pub struct DummyMsgLogger;

impl MsgLogger for DummyMsgLogger {
    fn log(&self, _: LogLevel, _: &str) {}
}

#[must_use]
pub fn new_dummy_msg_logger() -> Arc<impl MsgLogger> {
    Arc::new(DummyMsgLogger {})
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        write!(f, "{s}")
    }
}
