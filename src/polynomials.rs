/////////////////////////////////////////////////////////////////////////////////////////////
//
// Generates monomial exponent sets and evaluates (possibly differentiated) monomial matrices.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef};
use itertools::Itertools;

/// Returns the exponent set spanning all polynomials of total degree at most
/// `order` in `dimensions` variables, in canonical enumeration order:
/// ascending total degree, combination order within each degree.
///
/// An `order` of `-1` produces the empty set (no polynomial terms). The set
/// has `C(order + dimensions, dimensions)` members.
pub(crate) fn monomial_powers(order: i32, dimensions: usize) -> Vec<Vec<u32>> {
    let mut out = Vec::new();
    if order < 0 {
        return out;
    }

    for degree in 0..=order as usize {
        for combo in (0..dimensions).combinations_with_replacement(degree) {
            let mut powers = vec![0u32; dimensions];
            for axis in combo {
                powers[axis] += 1;
            }
            out.push(powers);
        }
    }

    out
}

/// Evaluates each monomial of the exponent set at each point, optionally
/// differentiated by the per-dimension orders in `diff`.
///
/// Differentiating `x^p` `k` times gives the falling factorial
/// `p (p-1) ... (p-k+1) x^(p-k)`, or zero when `k > p`.
pub(crate) fn evaluate_monomials(
    points: MatRef<'_, f64>,
    powers: &[Vec<u32>],
    diff: Option<&[usize]>,
) -> Mat<f64> {
    let num_points = points.nrows();
    let dimensions = points.ncols();

    Mat::from_fn(num_points, powers.len(), |i, col| {
        let exponents = &powers[col];
        let mut value = 1.0;

        for d in 0..dimensions {
            let p = exponents[d] as i64;
            let k = diff.map_or(0, |orders| orders[d]) as i64;

            if k > p {
                return 0.0;
            }

            let mut factor = 1.0;
            for step in 0..k {
                factor *= (p - step) as f64;
            }

            value *= factor * points.get(i, d).powi((p - k) as i32);
        }

        value
    })
}
