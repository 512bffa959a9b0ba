// SPDX-License-Identifier: GPL-2.0-or-later

use serde::Serialize;
use std::ops::Deref;

/// Assignment entry of an entity without a match.
pub const UNMATCHED: i32 = -1;

/// Target index per entity, or `UNMATCHED`.
///
/// No target appears more than once.
#[repr(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Assignment(Vec<i32>);

impl Assignment {
    pub(crate) fn unmatched(len: usize) -> Self {
        Self(vec![UNMATCHED; len])
    }

    // The caller guarantees that every target fits in an `i32`.
    pub(crate) fn from_targets(targets: Vec<Option<usize>>) -> Self {
        Self(
            targets
                .into_iter()
                .map(|t| match t {
                    Some(t) => i32::try_from(t).expect("target count should have been checked"),
                    None => UNMATCHED,
                })
                .collect(),
        )
    }

    /// Target of `entity`, `None` if unmatched or out of range.
    #[must_use]
    pub fn get(&self, entity: usize) -> Option<usize> {
        self.0.get(entity).and_then(|&t| usize::try_from(t).ok())
    }

    /// `(entity, target)` pairs in entity order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| Some((i, usize::try_from(t).ok()?)))
    }

    /// Entities without a target.
    pub fn unmatched_entities(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| (t == UNMATCHED).then_some(i))
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.0.iter().filter(|&&t| t != UNMATCHED).count()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<i32> {
        self.0
    }
}

impl Deref for Assignment {
    type Target = [i32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<Vec<i32>> for Assignment {
    fn eq(&self, other: &Vec<i32>) -> bool {
        &self.0 == other
    }
}

impl PartialEq<Assignment> for Vec<i32> {
    fn eq(&self, other: &Assignment) -> bool {
        self == &other.0
    }
}

/// One displacement: `challenger` took `target` from `displaced`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Displacement {
    pub target: usize,
    pub displaced: usize,
    pub challenger: usize,
    pub displaced_affinity: f32,
    pub challenger_affinity: f32,
}

/// Result of a traced run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub assignment: Assignment,

    /// In the order they happened.
    pub displacements: Vec<Displacement>,

    /// Number of candidates that were ruled out for an entity.
    pub suppressions: usize,
}
