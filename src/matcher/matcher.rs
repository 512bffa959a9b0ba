// SPDX-License-Identifier: GPL-2.0-or-later

mod assignment;
mod config;
mod resolve;

#[cfg(test)]
mod test;

pub use assignment::{Assignment, Displacement, MatchOutcome, UNMATCHED};
pub use config::{parse_config, Axis, MatchConfig, ParseAxisError, ParseMatchConfigError};

use common::{ArcMsgLogger, LogLevel};
use ndarray::ArrayView2;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error(transparent)]
    InvalidAxis(#[from] ParseAxisError),

    #[error("non-finite value at row {row}, column {col}")]
    NonFinite { row: usize, col: usize },

    #[error("too many targets: {0}")]
    TooLarge(usize),
}

/// Matches each row (`axis == 0`) or column (`axis == 1`) of `matrix`
/// to at most one entity on the other axis.
///
/// With `limit`, candidates whose affinity equals the global minimum of
/// the matrix are never matched. The matrix is not modified.
pub fn recursive_match(
    matrix: ArrayView2<'_, f32>,
    axis: usize,
    limit: bool,
) -> Result<Assignment, MatchError> {
    let axis = Axis::try_from(axis)?;
    Ok(resolve::resolve_all(matrix, axis, limit, false)?.assignment)
}

/// Like `recursive_match`, but an invalid axis is logged as a warning
/// and no assignment is computed.
#[must_use]
pub fn match_or_warn(
    logger: &ArcMsgLogger,
    matrix: ArrayView2<'_, f32>,
    axis: usize,
    limit: bool,
) -> Option<Assignment> {
    let axis = match Axis::try_from(axis) {
        Ok(v) => v,
        Err(e) => {
            logger.log(LogLevel::Warning, &e.to_string());
            return None;
        }
    };
    let config = MatchConfig {
        axis,
        limit,
        minimum: false,
    };
    Matcher::new(config, logger.clone()).run(matrix)
}

/// Greedy one-to-one assignment over an affinity matrix.
///
/// Entities along the configured axis are visited in index order and each
/// one claims its highest-affinity target. A claimed target is taken over by
/// a challenger whose affinity is greater than or equal to the incumbent's,
/// and the displaced incumbent moves on to its next best target. The result
/// is not globally optimal.
pub struct Matcher {
    config: MatchConfig,
    logger: ArcMsgLogger,
}

impl Matcher {
    #[must_use]
    pub fn new(config: MatchConfig, logger: ArcMsgLogger) -> Self {
        Self { config, logger }
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Returns `None` and logs a warning if the matrix is rejected.
    #[must_use]
    pub fn run(&self, matrix: ArrayView2<'_, f32>) -> Option<Assignment> {
        match self.run_traced(matrix) {
            Ok(outcome) => Some(outcome.assignment),
            Err(e) => {
                self.logger.log(LogLevel::Warning, &format!("match: {e}"));
                None
            }
        }
    }

    /// Also returns every displacement that happened along the way.
    pub fn run_traced(&self, matrix: ArrayView2<'_, f32>) -> Result<MatchOutcome, MatchError> {
        let MatchConfig {
            axis,
            limit,
            minimum,
        } = self.config;

        let outcome = resolve::resolve_all(matrix, axis, limit, minimum)?;

        self.logger.log(
            LogLevel::Debug,
            &format!(
                "matched {}/{} {}, displacements={} suppressions={}",
                outcome.assignment.matched_count(),
                outcome.assignment.len(),
                axis,
                outcome.displacements.len(),
                outcome.suppressions,
            ),
        );
        Ok(outcome)
    }
}
