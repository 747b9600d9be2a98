/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the partitioned saddle-point solver and the batched local system solver.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # linalg
//!
//! Solves the bordered system
//!
//! ```text
//! [ K  P ] [a]   [d]
//! [ P' 0 ] [b] = [0]
//! ```
//!
//! by eliminating the border through the Schur complement `S = P' K^-1 P`
//! rather than factorising the full matrix, so the symmetric structure of `K`
//! is exploited and singularity detection is centralised here.

use crate::error::{InterpolationError, InterpolationResult};
use faer::linalg::solvers::{ColPivQr, Lblt, Llt, PartialPivLu, Solve};
use faer::{Mat, MatRef, Side};
use rayon::prelude::*;

/// Factorisation of the kernel block.
///
/// Cholesky is attempted first for the symmetric case; conditionally positive
/// definite kernels produce indefinite blocks, which fall back to
/// Bunch-Kaufman. Per-centre shape parameters make the block unsymmetric and
/// force a plain LU.
enum KernelFactor {
    Llt(Llt<f64>),
    Lblt(Lblt<f64>),
    Lu(PartialPivLu<f64>),
}

impl KernelFactor {
    fn new(kernel: &Mat<f64>, symmetric: bool) -> Self {
        if symmetric {
            match kernel.llt(Side::Lower) {
                Ok(llt) => KernelFactor::Llt(llt),
                Err(_) => KernelFactor::Lblt(kernel.lblt(Side::Lower)),
            }
        } else {
            KernelFactor::Lu(kernel.partial_piv_lu())
        }
    }

    fn solve(&self, rhs: MatRef<'_, f64>) -> Mat<f64> {
        match self {
            KernelFactor::Llt(factor) => factor.solve(rhs),
            KernelFactor::Lblt(factor) => factor.solve(rhs),
            KernelFactor::Lu(factor) => factor.solve(rhs),
        }
    }
}

/// Solver for the saddle-point system formed by a kernel block `K` and a
/// polynomial constraint block `P`.
pub(crate) struct PartitionedSolver {
    kernel_factor: KernelFactor,
    poly: Mat<f64>,
    kinv_poly: Mat<f64>,
    schur: Option<ColPivQr<f64>>,
}

impl PartitionedSolver {
    /// Factorises the system. `symmetric` states whether `K` is symmetric
    /// (a uniform shape parameter guarantees it).
    ///
    /// Fails with [`InterpolationError::SingularSystem`] when the kernel
    /// block cannot be inverted or the Schur complement is rank deficient.
    pub fn new(
        kernel: Mat<f64>,
        poly: Mat<f64>,
        symmetric: bool,
    ) -> InterpolationResult<Self> {
        let num_monomials = poly.ncols();
        let kernel_factor = KernelFactor::new(&kernel, symmetric);

        if num_monomials == 0 {
            return Ok(Self {
                kernel_factor,
                poly,
                kinv_poly: Mat::new(),
                schur: None,
            });
        }

        let kinv_poly = kernel_factor.solve(poly.as_ref());
        if !all_finite(kinv_poly.as_ref()) {
            return Err(InterpolationError::SingularSystem {
                context: "kernel block",
            });
        }

        let schur = poly.transpose() * &kinv_poly;
        let qr = schur.col_piv_qr();

        // Rank of the Schur complement from the pivoted R diagonal; tiny
        // entries relative to the leading one count as zero.
        let rfac = qr.thin_R();
        let thresh = 1e-10 * rfac.get(0, 0).abs();
        let rank = rfac
            .diagonal()
            .column_vector()
            .iter()
            .filter(|val| val.abs() > thresh)
            .count();

        if rank < num_monomials {
            return Err(InterpolationError::SingularSystem {
                context: "polynomial constraint",
            });
        }

        Ok(Self {
            kernel_factor,
            poly,
            kinv_poly,
            schur: Some(qr),
        })
    }

    /// Solves for the kernel and polynomial coefficient blocks given the
    /// observed values (one column per value channel).
    pub fn solve(
        &self,
        values: MatRef<'_, f64>,
    ) -> InterpolationResult<(Mat<f64>, Option<Mat<f64>>)> {
        let kinv_values = self.kernel_factor.solve(values);

        let Some(schur) = &self.schur else {
            if !all_finite(kinv_values.as_ref()) {
                return Err(InterpolationError::SingularSystem {
                    context: "kernel block",
                });
            }
            return Ok((kinv_values, None));
        };

        // S b = P' K^-1 d, then a = K^-1 (d - P b).
        let constraint_rhs = self.poly.transpose() * &kinv_values;
        let poly_coefficients = schur.solve(&constraint_rhs);
        let point_coefficients = kinv_values - &self.kinv_poly * &poly_coefficients;

        if !all_finite(point_coefficients.as_ref()) || !all_finite(poly_coefficients.as_ref()) {
            return Err(InterpolationError::SingularSystem {
                context: "saddle-point",
            });
        }

        Ok((point_coefficients, Some(poly_coefficients)))
    }
}

/// Solves a batch of independent small dense systems.
///
/// Each system is factorised and solved on its own; the systems never share
/// state, so the batch runs data-parallel while the result order matches the
/// input order.
pub(crate) fn solve_bordered_batch(
    systems: Vec<(Mat<f64>, Mat<f64>)>,
) -> InterpolationResult<Vec<Mat<f64>>> {
    systems
        .into_par_iter()
        .map(|(lhs, rhs)| {
            let lu = lhs.partial_piv_lu();
            let solution = lu.solve(&rhs);
            if !all_finite(solution.as_ref()) {
                return Err(InterpolationError::SingularSystem {
                    context: "local neighbourhood",
                });
            }
            Ok(solution)
        })
        .collect()
}

fn all_finite(values: MatRef<'_, f64>) -> bool {
    values.col_iter().all(|col| col.iter().all(|v| v.is_finite()))
}
