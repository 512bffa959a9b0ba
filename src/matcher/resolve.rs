// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    assignment::{Assignment, Displacement, MatchOutcome},
    config::Axis,
    MatchError,
};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Working value of a candidate that was ruled out for an entity.
/// Lower than any finite affinity.
const SUPPRESSED: f32 = f32::NEG_INFINITY;

pub(crate) fn resolve_all(
    matrix: ArrayView2<'_, f32>,
    axis: Axis,
    limit: bool,
    minimum: bool,
) -> Result<MatchOutcome, MatchError> {
    if let Some(((row, col), _)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(MatchError::NonFinite { row, col });
    }

    // Row `i` of the oriented matrix holds the candidates of entity `i`.
    let oriented = match axis {
        Axis::Rows => matrix,
        Axis::Columns => matrix.reversed_axes(),
    };
    let (entities, targets) = oriented.dim();
    if i32::try_from(targets).is_err() {
        return Err(MatchError::TooLarge(targets));
    }
    if entities == 0 || targets == 0 {
        return Ok(MatchOutcome {
            assignment: Assignment::unmatched(entities),
            ..MatchOutcome::default()
        });
    }

    let affinity = if minimum {
        // The smallest cost becomes the largest affinity.
        let max_value = oriented.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        oriented.mapv(|v| max_value - v)
    } else {
        oriented.to_owned()
    };

    let mut resolver = Resolver::new(affinity.view(), limit);
    for entity in 0..entities {
        resolver.resolve(entity);
    }
    Ok(resolver.finish())
}

struct Resolver<'a> {
    affinity: ArrayView2<'a, f32>,

    // Copy of `affinity` where ruled out candidates are `SUPPRESSED`.
    working: Array2<f32>,

    // Global minimum. Candidates at or below it fail the limit.
    min_value: f32,
    limit: bool,

    matches: Vec<Option<usize>>,

    // Reverse of `matches`.
    claimed_by: Vec<Option<usize>>,

    displacements: Vec<Displacement>,
    suppressions: usize,
}

impl<'a> Resolver<'a> {
    fn new(affinity: ArrayView2<'a, f32>, limit: bool) -> Self {
        let (entities, targets) = affinity.dim();
        let min_value = affinity.iter().copied().fold(f32::INFINITY, f32::min);
        Self {
            affinity,
            working: affinity.to_owned(),
            min_value,
            limit,
            matches: vec![None; entities],
            claimed_by: vec![None; targets],
            displacements: Vec::new(),
            suppressions: 0,
        }
    }

    // Runs the displacement chain started by `entity` until some entity
    // settles on a free target or runs out of acceptable candidates.
    //
    // Every step that does not end the chain suppresses one candidate of one
    // entity for the rest of the run. A whole run is bounded by
    // `entities * targets` steps and a chain can never revisit a state.
    fn resolve(&mut self, entity: usize) {
        let mut current = entity;
        while let Some((best, value)) = self.best_candidate(current) {
            let Some(incumbent) = self.claimed_by[best] else {
                self.claim(current, best);
                return;
            };

            // Ties go to the challenger.
            let incumbent_value = self.affinity[[incumbent, best]];
            if value >= incumbent_value {
                self.displacements.push(Displacement {
                    target: best,
                    displaced: incumbent,
                    challenger: current,
                    displaced_affinity: incumbent_value,
                    challenger_affinity: value,
                });
                self.matches[incumbent] = None;
                self.claim(current, best);
                current = incumbent;
            }

            // `current` is now either the challenger that lost
            // or the incumbent that was displaced.
            self.suppress(current, best);
        }
    }

    fn best_candidate(&self, entity: usize) -> Option<(usize, f32)> {
        let (best, value) = argmax(self.working.row(entity))?;
        if value < self.min_value {
            // Exhausted.
            return None;
        }
        if self.limit && value <= self.min_value {
            return None;
        }
        Some((best, value))
    }

    fn claim(&mut self, entity: usize, target: usize) {
        self.matches[entity] = Some(target);
        self.claimed_by[target] = Some(entity);
    }

    fn suppress(&mut self, entity: usize, target: usize) {
        self.working[[entity, target]] = SUPPRESSED;
        self.suppressions += 1;
    }

    fn finish(self) -> MatchOutcome {
        MatchOutcome {
            assignment: Assignment::from_targets(self.matches),
            displacements: self.displacements,
            suppressions: self.suppressions,
        }
    }
}

// First index of the largest value.
fn argmax(items: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in items.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((i, v)),
        }
    }
    best
}
