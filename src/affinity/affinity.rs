// SPDX-License-Identifier: GPL-2.0-or-later

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keeps the union away from zero for degenerate rectangles.
pub const EPSILON: f32 = 1e-7;

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RectangleError {
    #[error("max corner is less than min corner")]
    Inverted,
}

impl Rectangle {
    #[must_use]
    pub fn area(&self) -> f32 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    /// Overlapping area, zero if the rectangles are disjoint on either axis.
    #[must_use]
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let max_left = f32::max(self.min_x, other.min_x);
        let max_top = f32::max(self.min_y, other.min_y);
        let min_right = f32::min(self.max_x, other.max_x);
        let min_bottom = f32::min(self.max_y, other.max_y);

        let w = f32::max(0.0, min_right - max_left);
        let h = f32::max(0.0, min_bottom - max_top);
        w * h
    }
}

// [min_x, min_y, max_x, max_y]
impl TryFrom<[f32; 4]> for Rectangle {
    type Error = RectangleError;

    fn try_from(v: [f32; 4]) -> Result<Self, Self::Error> {
        let [min_x, min_y, max_x, max_y] = v;
        if max_x < min_x || max_y < min_y {
            return Err(RectangleError::Inverted);
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

// Intersection over union.
#[must_use]
pub fn iou(a: &Rectangle, b: &Rectangle) -> f32 {
    let intersection_area = a.intersection_area(b);
    let union_area = a.area() + b.area() - intersection_area;

    intersection_area / (union_area + EPSILON)
}

/// Pairwise IoU, entry `(i, j)` is `iou(a[i], b[j])`.
#[must_use]
pub fn iou_matrix(a: &[Rectangle], b: &[Rectangle]) -> Array2<f32> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| iou(&a[i], &b[j]))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AffinityError {
    #[error("expected 4 columns per rectangle, got {0}")]
    BadShape(usize),

    #[error("rectangle {0}: {1}")]
    Rectangle(usize, RectangleError),
}

/// Same as `iou_matrix` for rectangles stored one per row as
/// `[min_x, min_y, max_x, max_y]`.
pub fn iou_matrix_from_rows(
    a: ArrayView2<'_, f32>,
    b: ArrayView2<'_, f32>,
) -> Result<Array2<f32>, AffinityError> {
    let a = rectangles_from_rows(a)?;
    let b = rectangles_from_rows(b)?;
    Ok(iou_matrix(&a, &b))
}

fn rectangles_from_rows(rows: ArrayView2<'_, f32>) -> Result<Vec<Rectangle>, AffinityError> {
    if rows.ncols() != 4 {
        return Err(AffinityError::BadShape(rows.ncols()));
    }
    rows.outer_iter()
        .enumerate()
        .map(|(i, row)| {
            Rectangle::try_from([row[0], row[1], row[2], row[3]])
                .map_err(|e| AffinityError::Rectangle(i, e))
        })
        .collect()
}
