// SPDX-License-Identifier: GPL-2.0-or-later

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Which entities get matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    /// Each row is matched to a column. Axis 0.
    Rows,

    /// Each column is matched to a row. Axis 1.
    #[default]
    Columns,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAxisError {
    #[error("axis can only be 0 or 1, got {0}")]
    Invalid(usize),
}

impl TryFrom<usize> for Axis {
    type Error = ParseAxisError;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Rows),
            1 => Ok(Self::Columns),
            _ => Err(ParseAxisError::Invalid(v)),
        }
    }
}

impl Axis {
    #[must_use]
    pub fn as_usize(self) -> usize {
        match self {
            Self::Rows => 0,
            Self::Columns => 1,
        }
    }
}

impl<'de> Deserialize<'de> for Axis {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = usize::deserialize(deserializer)?;
        Self::try_from(v).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => write!(f, "rows"),
            Self::Columns => write!(f, "columns"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    #[serde(default)]
    pub axis: Axis,

    /// Reject candidates equal to the global minimum of the matrix.
    #[serde(default = "default_limit")]
    pub limit: bool,

    /// Treat the matrix as costs, lower is better.
    #[serde(default)]
    pub minimum: bool,
}

fn default_limit() -> bool {
    true
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            axis: Axis::default(),
            limit: default_limit(),
            minimum: false,
        }
    }
}

impl MatchConfig {
    /// Reads the `matcher` object from a larger JSON document.
    /// Returns `None` if the object is missing or empty.
    pub fn from_json(raw: serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        #[derive(Deserialize)]
        struct Temp {
            matcher: serde_json::Value,
        }
        let Ok(temp) = serde_json::from_value::<Temp>(raw) else {
            return Ok(None);
        };
        if temp.matcher == serde_json::Value::Object(serde_json::Map::new()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(temp.matcher)?))
    }
}

#[derive(Debug, Error)]
pub enum ParseMatchConfigError {
    #[error("deserialize toml: {0}")]
    Toml(#[from] toml::de::Error),
}

pub fn parse_config(raw: &str) -> Result<MatchConfig, ParseMatchConfigError> {
    Ok(toml::from_str(raw)?)
}
