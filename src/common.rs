/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for random point generation, evaluation grids, and row selection.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef};

/// Generate a matrix of random points in the unit hypercube.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Optional random seed.
///   - If `Some(seed)` is provided, the same sequence of points will be generated
///     deterministically across runs and platforms (useful for reproducible tests).
///   - If `None`, the generator is seeded from the operating system's randomness source.
///
/// # Returns
/// A `Mat<f64>` of shape `(n, d)` where each element lies in `[0.0, 1.0)`.
///
/// # Example
/// ```
/// use ferreus_scatter::generate_random_points;
///
/// // Generate 100 reproducible 3D points
/// let pts = generate_random_points(100, 3, Some(42));
/// assert_eq!(pts.ncols(), 3);
/// ```
pub fn generate_random_points(n: usize, d: usize, seed: Option<u64>) -> Mat<f64> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = match seed.is_some() {
        true => StdRng::seed_from_u64(seed.unwrap()),
        false => StdRng::from_os_rng(),
    };

    Mat::from_fn(n, d, |_, _| rng.random_range(0.0..1.0))
}

/// Create a regular evaluation grid from per-dimension ranges and sample counts.
///
/// # Arguments
/// * `ranges` - Inclusive `(min, max)` range for each dimension.
/// * `counts` - Number of grid samples per range; must match `ranges.len()`.
///
/// # Returns
/// A `Mat<f64>` with one row per grid point and one column per dimension.
pub fn create_evaluation_grid(ranges: &[(f64, f64)], counts: &[usize]) -> Mat<f64> {
    assert_eq!(ranges.len(), counts.len());

    let dimensions = counts.to_vec();
    let total_points: usize = dimensions.iter().product();
    let num_dimensions = ranges.len();

    Mat::from_fn(total_points, num_dimensions, |row_idx, col_idx| {
        let dim_points = dimensions[col_idx];
        let (start, end) = ranges[col_idx];
        let step = (end - start) / (dim_points as f64 - 1.0);

        let stride = match col_idx == 0 {
            true => 1,
            false => dimensions[..col_idx].iter().product::<usize>(),
        };

        let index_in_dim = (row_idx / stride) % dim_points;
        start + step * index_in_dim as f64
    })
}

/// Returns an owned `Mat<T>` from a subset of row indices.
#[inline(always)]
pub(crate) fn select_mat_rows<T>(existing_mat: MatRef<'_, T>, row_indices: &[usize]) -> Mat<T>
where
    T: Clone,
{
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        existing_mat.get(row_indices[i], j).clone()
    })
}

/// Computes the axis aligned bounding box extents of a matrix of points.
///
/// The result is arranged as `[min_0, ..., min_{d-1}, max_0, ..., max_{d-1}]`.
#[inline(always)]
pub(crate) fn get_pointarray_extents(points: MatRef<'_, f64>) -> Vec<f64> {
    let ncols = points.ncols();

    let mut extents: Vec<f64> = vec![*points.get(0, 0); 2 * ncols];

    for col in 0..ncols {
        extents[col] = *points.get(0, col);
        extents[col + ncols] = *points.get(0, col);
    }

    for row in points.row_iter() {
        for (col, item) in row.iter().enumerate() {
            if *item < extents[col] {
                extents[col] = *item;
            }
            if *item > extents[col + ncols] {
                extents[col + ncols] = *item;
            }
        }
    }

    extents
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn select_rows_picks_requested_subset() {
        let matrix = mat![[0.0, 1.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0f64]];
        let sub = select_mat_rows(matrix.as_ref(), &[0, 2]);
        assert_eq!(sub, mat![[0.0, 1.0], [2.0, 2.0f64]]);
    }

    #[test]
    fn extents_cover_mins_then_maxs() {
        let points = mat![[1.0, 2.0], [3.0, -1.0], [0.5, 4.0f64]];
        let extents = get_pointarray_extents(points.as_ref());
        assert_eq!(extents, vec![0.5, -1.0, 3.0, 4.0]);
    }

    #[test]
    fn evaluation_grid_spans_ranges() {
        let grid = create_evaluation_grid(&[(0.0, 1.0), (0.0, 2.0)], &[2, 3]);
        assert_eq!(grid.nrows(), 6);
        assert_eq!(grid.ncols(), 2);
        assert_eq!(grid[(0, 0)], 0.0);
        assert_eq!(grid[(1, 0)], 1.0);
        assert_eq!(grid[(5, 1)], 2.0);
    }
}
