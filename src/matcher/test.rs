// SPDX-License-Identifier: GPL-2.0-or-later

#![allow(clippy::unwrap_used, clippy::needless_pass_by_value)]

use crate::{
    match_or_warn, recursive_match, Axis, MatchConfig, MatchError, Matcher, ParseAxisError,
    UNMATCHED,
};
use common::{new_dummy_msg_logger, ArcMsgLogger, LogLevel, MsgLogger};
use ndarray::{array, Array2};
use pretty_assertions::assert_eq;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use test_case::test_case;

fn matrix(rows: Vec<Vec<f32>>) -> Array2<f32> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect()).unwrap()
}

fn run(m: &Array2<f32>, axis: usize, limit: bool) -> Vec<i32> {
    recursive_match(m.view(), axis, limit).unwrap().into_inner()
}

// Intersection over union of five detections and five ground truth boxes.
fn detection_fixture() -> Array2<f32> {
    array![
        [0.0, 0.0, 0.0, 0.0, 0.0],
        [0.206_896_55, 0.074_074_07, 0.047_619_05, 0.0, 0.230_769_23],
        [0.0, 0.0, 0.384_615_38, 0.0, 0.0],
        [0.0, 0.0, 0.043_478_26, 0.5, 0.0],
        [0.5, 0.0, 0.0, 0.0, 1.0],
    ]
}

#[derive(Default)]
struct RecordingLogger(Mutex<Vec<(LogLevel, String)>>);

impl MsgLogger for RecordingLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        self.0.lock().unwrap().push((level, msg.to_owned()));
    }
}

impl RecordingLogger {
    fn entries(&self, level: LogLevel) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

#[test_case(vec![vec![10.0, 2.0], vec![1.0, 10.0]], 0, true,  vec![0, 1];  "uncontested")]
#[test_case(vec![vec![1.0, 9.0], vec![1.0, 10.0]],  0, true,  vec![-1, 1]; "displaced_below_limit")]
#[test_case(vec![vec![1.0, 9.0], vec![1.0, 10.0]],  0, false, vec![0, 1];  "displaced_forced")]
#[test_case(vec![vec![9.0, 1.0], vec![5.0, 2.0]],   0, true,  vec![0, 1];  "incumbent_wins")]
#[test_case(vec![vec![9.0, 1.0], vec![5.0, 1.0]],   0, true,  vec![0, -1]; "incumbent_wins_below_limit")]
#[test_case(vec![vec![5.0, 1.0], vec![5.0, 2.0]],   0, true,  vec![-1, 0]; "tie_goes_to_challenger")]
#[test_case(vec![vec![5.0, 1.0], vec![5.0, 2.0]],   0, false, vec![1, 0];  "tie_goes_to_challenger_forced")]
#[test_case(vec![vec![3.0, 1.0, 2.0], vec![4.0, 5.0, 6.0]], 1, true,  vec![0, -1, 1]; "columns_exhausted")]
#[test_case(vec![vec![3.0, 1.0, 2.0], vec![4.0, 5.0, 6.0]], 1, false, vec![0, -1, 1]; "columns_exhausted_forced")]
fn test_recursive_match(rows: Vec<Vec<f32>>, axis: usize, limit: bool, want: Vec<i32>) {
    assert_eq!(want, run(&matrix(rows), axis, limit));
}

#[test_case(1, true,  vec![1, -1, 2, 3, 4]; "columns")]
#[test_case(0, true,  vec![-1, 0, 2, 3, 4]; "rows")]
#[test_case(1, false, vec![1, 0, 2, 3, 4];  "columns_forced")]
#[test_case(0, false, vec![1, 0, 2, 3, 4];  "rows_forced")]
fn test_detection_fixture(axis: usize, limit: bool, want: Vec<i32>) {
    assert_eq!(want, run(&detection_fixture(), axis, limit));
}

#[test]
fn test_detection_fixture_from_rectangles() {
    let detections = array![
        [120.0, 100.0, 160.0, 140.0],
        [30.0, 80.0, 70.0, 130.0],
        [70.0, 30.0, 90.0, 90.0],
        [90.0, 20.0, 150.0, 60.0],
        [20.0, 100.0, 50.0, 140.0],
    ];
    let ground_truth = array![
        [10.0, 110.0, 60.0, 140.0],
        [20.0, 60.0, 50.0, 90.0],
        [60.0, 40.0, 100.0, 100.0],
        [100.0, 10.0, 160.0, 70.0],
        [20.0, 100.0, 50.0, 140.0],
    ];
    let m = affinity::iou_matrix_from_rows(detections.view(), ground_truth.view()).unwrap();

    // Ground truth 1 has no detection with a positive overlap left.
    assert_eq!(vec![1, -1, 2, 3, 4], run(&m, 1, true));
}

#[test]
fn test_displacement_trace() {
    let m = matrix(vec![vec![1.0, 9.0], vec![1.0, 10.0]]);
    let config = MatchConfig {
        axis: Axis::Rows,
        limit: true,
        minimum: false,
    };
    let outcome = Matcher::new(config, new_dummy_msg_logger())
        .run_traced(m.view())
        .unwrap();

    assert_eq!(1, outcome.displacements.len());
    let d = outcome.displacements[0];
    assert_eq!((1, 0, 1), (d.target, d.displaced, d.challenger));
    assert!((d.displaced_affinity - 9.0).abs() < f32::EPSILON);
    assert!((d.challenger_affinity - 10.0).abs() < f32::EPSILON);
    assert_eq!(1, outcome.suppressions);
}

#[test]
fn test_all_equal() {
    let m = Array2::from_elem((3, 2), 5.0);

    // Every candidate sits at the global minimum.
    assert_eq!(vec![-1, -1, -1], run(&m, 0, true));
    assert_eq!(vec![-1, -1], run(&m, 1, true));

    // Two targets for three entities, the first one ends up exhausted.
    assert_eq!(vec![-1, 1, 0], run(&m, 0, false));
    assert_eq!(vec![1, 0], run(&Array2::from_elem((2, 2), 5.0), 0, false));
}

#[test]
fn test_all_equal_terminates_on_large_input() {
    let m = Array2::from_elem((40, 30), 1.0);
    let got = run(&m, 0, false);
    assert_eq!(30, got.iter().filter(|&&t| t != UNMATCHED).count());
}

#[test]
fn test_empty() {
    assert_eq!(Vec::<i32>::new(), run(&Array2::zeros((0, 3)), 0, true));
    assert_eq!(vec![-1, -1, -1], run(&Array2::zeros((0, 3)), 1, true));
    assert_eq!(vec![-1, -1, -1], run(&Array2::zeros((3, 0)), 0, false));
    assert_eq!(Vec::<i32>::new(), run(&Array2::zeros((3, 0)), 1, false));
    assert_eq!(Vec::<i32>::new(), run(&Array2::zeros((0, 0)), 0, true));
}

#[test]
fn test_invalid_axis() {
    let m = matrix(vec![vec![1.0]]);
    assert_eq!(
        Err(MatchError::InvalidAxis(ParseAxisError::Invalid(2))),
        recursive_match(m.view(), 2, true)
    );
}

#[test]
fn test_non_finite() {
    let m = matrix(vec![vec![1.0, 2.0], vec![f32::NAN, f32::INFINITY]]);
    assert_eq!(
        Err(MatchError::NonFinite { row: 1, col: 0 }),
        recursive_match(m.view(), 0, true)
    );
}

#[test]
fn test_matrix_is_not_modified() {
    let m = detection_fixture();
    let before = m.clone();
    run(&m, 0, true);
    run(&m, 1, false);
    assert_eq!(before, m);
}

#[test]
fn test_axes_are_symmetric() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let m = random_matrix(&mut rng, false);
        let transposed = m.t().to_owned();
        for limit in [true, false] {
            assert_eq!(run(&m, 1, limit), run(&transposed, 0, limit));
        }
    }
}

// Each row prefers the first column and rows further down are stronger,
// so every new row pushes all previous rows one column to the right.
#[test]
fn test_long_cascade() {
    let n = 250;
    let m = Array2::from_shape_fn((n, n), |(i, j)| {
        f32::from(u16::try_from((i + 1) * (n - j)).unwrap())
    });
    let want: Vec<i32> = (0..n).rev().map(|j| i32::try_from(j).unwrap()).collect();
    assert_eq!(want, run(&m, 0, false));
}

#[test]
fn test_minimum_mode() {
    let costs = matrix(vec![vec![1.0, 9.0], vec![8.0, 2.0]]);
    let config = MatchConfig {
        axis: Axis::Rows,
        limit: true,
        minimum: true,
    };
    let got = Matcher::new(config, new_dummy_msg_logger())
        .run(costs.view())
        .unwrap();
    assert_eq!(vec![0, 1], got.into_inner());

    // The highest cost is the global minimum after inversion.
    let costs = matrix(vec![vec![9.0, 9.0], vec![9.0, 2.0]]);
    let got = Matcher::new(config, new_dummy_msg_logger())
        .run(costs.view())
        .unwrap();
    assert_eq!(vec![-1, 1], got.into_inner());
}

#[test]
fn test_match_or_warn_invalid_axis() {
    let logger = Arc::new(RecordingLogger::default());
    let msg_logger: ArcMsgLogger = logger.clone();

    let m = matrix(vec![vec![1.0, 2.0]]);
    assert!(match_or_warn(&msg_logger, m.view(), 2, true).is_none());
    assert_eq!(
        vec!["axis can only be 0 or 1, got 2".to_owned()],
        logger.entries(LogLevel::Warning)
    );
}

#[test]
fn test_match_or_warn_ok() {
    let logger = Arc::new(RecordingLogger::default());
    let msg_logger: ArcMsgLogger = logger.clone();

    let m = matrix(vec![vec![1.0, 9.0], vec![1.0, 10.0]]);
    let got = match_or_warn(&msg_logger, m.view(), 0, true).unwrap();
    assert_eq!(vec![-1, 1], got.into_inner());
    assert!(logger.entries(LogLevel::Warning).is_empty());
    assert_eq!(
        vec!["matched 1/2 rows, displacements=1 suppressions=1".to_owned()],
        logger.entries(LogLevel::Debug)
    );
}

#[test]
fn test_matcher_run_rejected() {
    let logger = Arc::new(RecordingLogger::default());
    let matcher = Matcher::new(MatchConfig::default(), logger.clone());

    let m = matrix(vec![vec![1.0, f32::NAN]]);
    assert!(matcher.run(m.view()).is_none());
    assert_eq!(
        vec!["match: non-finite value at row 0, column 1".to_owned()],
        logger.entries(LogLevel::Warning)
    );
}

// Random matrix with up to 7 rows and columns. With `ties`, values are
// drawn from a handful of integers so that equal affinities are common.
fn random_matrix(rng: &mut ChaCha8Rng, ties: bool) -> Array2<f32> {
    let rows = rng.random_range(0..8);
    let cols = rng.random_range(0..8);
    if ties {
        Array2::from_shape_simple_fn((rows, cols), || f32::from(rng.random_range(0_u8..4)))
    } else {
        Array2::from_shape_simple_fn((rows, cols), || rng.random::<f32>())
    }
}

// Strictly positive and pairwise distinct.
fn random_distinct_matrix(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> Array2<f32> {
    let mut values: Vec<f32> = (1..=rows * cols)
        .map(|v| f32::from(u16::try_from(v).unwrap()))
        .collect();
    values.shuffle(rng);
    Array2::from_shape_vec((rows, cols), values).unwrap()
}

fn global_min(m: &Array2<f32>) -> f32 {
    m.iter().copied().fold(f32::INFINITY, f32::min)
}

fn check_properties(m: &Array2<f32>, axis: Axis, limit: bool) {
    let config = MatchConfig {
        axis,
        limit,
        minimum: false,
    };
    let matcher = Matcher::new(config, new_dummy_msg_logger());
    let outcome = matcher.run_traced(m.view()).unwrap();
    let assignment = &outcome.assignment;

    let (entities, targets) = match axis {
        Axis::Rows => m.dim(),
        Axis::Columns => (m.ncols(), m.nrows()),
    };
    let affinity = |entity: usize, target: usize| match axis {
        Axis::Rows => m[[entity, target]],
        Axis::Columns => m[[target, entity]],
    };
    assert_eq!(entities, assignment.len());

    // Range.
    for &t in assignment.iter() {
        assert!(t == UNMATCHED || usize::try_from(t).unwrap() < targets, "{t}");
    }

    // Uniqueness.
    let mut seen = HashSet::new();
    for (_, target) in assignment.pairs() {
        assert!(seen.insert(target), "{target} matched twice: {assignment:?}");
    }

    // Limit floor.
    if limit && !m.is_empty() {
        let min = global_min(m);
        for (entity, target) in assignment.pairs() {
            assert!(affinity(entity, target) > min);
        }
    }

    // Monotonic improvement.
    for d in &outcome.displacements {
        assert!(d.challenger_affinity >= d.displaced_affinity);
        if let Some((holder, _)) = assignment.pairs().find(|&(_, t)| t == d.target) {
            assert!(affinity(holder, d.target) >= d.displaced_affinity);
        }
    }

    // Termination bound.
    assert!(outcome.suppressions <= entities * targets);

    // Idempotence.
    assert_eq!(outcome, matcher.run_traced(m.view()).unwrap());
}

#[test_case(1)]
#[test_case(2)]
#[test_case(3)]
#[test_case(4)]
fn test_properties(seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..200 {
        let ties = rng.random_bool(0.5);
        let m = random_matrix(&mut rng, ties);
        for axis in [Axis::Rows, Axis::Columns] {
            for limit in [true, false] {
                check_properties(&m, axis, limit);
            }
        }
    }
}

#[test_case(11)]
#[test_case(12)]
#[test_case(13)]
fn test_forced_coverage(seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..100 {
        let rows = rng.random_range(1..8);
        let cols = rng.random_range(rows..=8);
        let m = random_distinct_matrix(&mut rng, rows, cols);

        let got = run(&m, 0, false);
        assert!(!got.contains(&UNMATCHED), "{m:?}\n{got:?}");

        // More entities than targets leaves exactly the surplus unmatched.
        let got = run(&m, 1, false);
        let unmatched = got.iter().filter(|&&t| t == UNMATCHED).count();
        assert_eq!(cols - rows, unmatched, "{m:?}\n{got:?}");
    }
}
