/////////////////////////////////////////////////////////////////////////////////////////////
//
// Classifies query points as inside or outside the convex hull of the observation points.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # hull
//!
//! Boundary-inclusive convex hull membership, used to mask extrapolated
//! values. A query point lies in the hull exactly when it has a convex
//! barycentric representation over the observation points, i.e. when
//!
//! ```text
//! sum_i w_i y_i = p,   sum_i w_i = 1,   w_i >= 0
//! ```
//!
//! is feasible. Feasibility is decided by a dense phase-one simplex solve
//! with Bland's rule, which terminates finitely and deterministically in any
//! dimension.

use crate::common;
use faer::MatRef;

/// Classifies each query point against the convex hull of `hull_points`.
///
/// If there are too few hull points to span a full-dimensional simplex
/// (fewer than D + 1), every query is reported outside. In one dimension the
/// hull is the closed interval of the observations.
pub(crate) fn points_in_hull(
    query_points: MatRef<'_, f64>,
    hull_points: MatRef<'_, f64>,
) -> Vec<bool> {
    let dimensions = query_points.ncols();
    debug_assert_eq!(hull_points.ncols(), dimensions);

    if hull_points.nrows() <= dimensions {
        return vec![false; query_points.nrows()];
    }

    if dimensions == 1 {
        let extents = common::get_pointarray_extents(hull_points);
        let (min, max) = (extents[0], extents[1]);
        return (0..query_points.nrows())
            .map(|i| {
                let x = *query_points.get(i, 0);
                x >= min && x <= max
            })
            .collect();
    }

    // Feasibility tolerance relative to the coordinate scale.
    let extents = common::get_pointarray_extents(hull_points);
    let scale = extents
        .iter()
        .map(|v| v.abs())
        .fold(1.0f64, f64::max);
    let tolerance = 1e-9 * scale;

    (0..query_points.nrows())
        .map(|i| contains_point(query_points, i, hull_points, tolerance))
        .collect()
}

/// Phase-one simplex feasibility test for one query point.
///
/// The constraint matrix has one row per coordinate plus the convexity row;
/// artificial variables provide the starting basis and the query is inside
/// the hull exactly when the total infeasibility is driven to zero.
fn contains_point(
    query_points: MatRef<'_, f64>,
    query_index: usize,
    hull_points: MatRef<'_, f64>,
    tolerance: f64,
) -> bool {
    let dimensions = query_points.ncols();
    let num_hull = hull_points.nrows();
    let num_rows = dimensions + 1;
    let num_cols = num_hull + num_rows;
    let rhs_col = num_cols;

    // Tableau rows: [ coordinates | artificial identity | rhs ].
    let mut tableau = vec![vec![0.0f64; num_cols + 1]; num_rows];
    for row in 0..dimensions {
        for j in 0..num_hull {
            tableau[row][j] = *hull_points.get(j, row);
        }
        tableau[row][rhs_col] = *query_points.get(query_index, row);
    }
    for j in 0..num_hull {
        tableau[dimensions][j] = 1.0;
    }
    tableau[dimensions][rhs_col] = 1.0;

    // Flip rows so every right-hand side is non-negative, then install the
    // artificial basis.
    for row in tableau.iter_mut() {
        if row[rhs_col] < 0.0 {
            for value in row.iter_mut() {
                *value = -*value;
            }
        }
    }
    for (i, row) in tableau.iter_mut().enumerate() {
        row[num_hull + i] = 1.0;
    }
    let mut basis: Vec<usize> = (num_hull..num_cols).collect();

    // Phase-one objective row: total infeasibility expressed over the
    // original columns.
    let mut objective = vec![0.0f64; num_cols + 1];
    for row in &tableau {
        for j in 0..num_hull {
            objective[j] += row[j];
        }
        objective[rhs_col] += row[rhs_col];
    }

    let pivot_tolerance = 1e-12;
    let max_pivots = 16 * (num_cols + 1);

    for _ in 0..max_pivots {
        // Bland's rule: entering column is the lowest index with a positive
        // reduced cost, which rules out cycling.
        let Some(entering) = (0..num_cols).find(|&j| objective[j] > pivot_tolerance) else {
            break;
        };

        // Ratio test; ties resolve to the smallest basic variable index.
        let mut leaving: Option<usize> = None;
        let mut best_ratio = f64::INFINITY;
        for i in 0..num_rows {
            let coeff = tableau[i][entering];
            if coeff > pivot_tolerance {
                let ratio = tableau[i][rhs_col] / coeff;
                let better = match leaving {
                    None => true,
                    Some(current) => {
                        ratio < best_ratio || (ratio == best_ratio && basis[i] < basis[current])
                    }
                };
                if better {
                    best_ratio = ratio;
                    leaving = Some(i);
                }
            }
        }

        // Phase one is bounded below by zero, so an unbounded ray only
        // arises from numerical noise; treat it as infeasible.
        let Some(leaving) = leaving else {
            return false;
        };

        // Pivot.
        let pivot = tableau[leaving][entering];
        for value in tableau[leaving].iter_mut() {
            *value /= pivot;
        }
        let pivot_row = tableau[leaving].clone();
        for (i, row) in tableau.iter_mut().enumerate() {
            if i == leaving {
                continue;
            }
            let factor = row[entering];
            if factor != 0.0 {
                for (value, pivot_value) in row.iter_mut().zip(pivot_row.iter()) {
                    *value -= factor * pivot_value;
                }
            }
        }
        let factor = objective[entering];
        if factor != 0.0 {
            for (value, pivot_value) in objective.iter_mut().zip(pivot_row.iter()) {
                *value -= factor * pivot_value;
            }
        }
        basis[leaving] = entering;
    }

    objective[rhs_col].abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn interval_membership_in_1d() {
        let hull = mat![[0.0], [1.0], [2.0]];
        let queries = mat![[-5.0], [0.0], [1.0], [2.0], [7.0]];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![false, true, true, true, false]);
    }

    #[test]
    fn too_few_points_for_a_simplex_means_outside() {
        // Two points cannot span a 2D simplex, even for queries on the segment.
        let hull = mat![[0.0, 0.0], [1.0, 1.0]];
        let queries = mat![[0.5, 0.5], [0.0, 0.0]];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![false, false]);
    }

    #[test]
    fn unit_square_membership_2d() {
        let hull = mat![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let queries = mat![
            [0.5, 0.5],
            [0.99, 0.01],
            [2.0, 2.0],
            [-0.1, 0.5],
            [1.0, 1.0],
            [0.5, 0.0],
        ];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![true, true, false, false, true, true]);
    }

    #[test]
    fn interior_points_of_a_point_cloud_2d() {
        // Hull corners plus interior points; membership depends only on the hull.
        let hull = mat![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.5, 0.5],
            [0.2, 0.8],
        ];
        let queries = mat![[0.3, 0.3], [1.5, 0.5]];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![true, false]);
    }

    #[test]
    fn tetrahedron_membership_3d() {
        let hull = mat![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let queries = mat![
            [0.2, 0.2, 0.2],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0],
            [-0.2, 0.1, 0.1],
        ];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![true, false, true, false]);
    }

    #[test]
    fn degenerate_collinear_cloud_in_2d() {
        // Three collinear points span no area; only queries on the segment
        // have a convex representation.
        let hull = mat![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]];
        let queries = mat![[0.25, 0.25], [0.25, 0.3]];
        let inside = points_in_hull(queries.as_ref(), hull.as_ref());
        assert_eq!(inside, vec![true, false]);
    }
}
