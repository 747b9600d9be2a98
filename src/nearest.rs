/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the k-nearest interpolator: per-target local systems over neighbourhoods.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    common,
    error::{InterpolationError, InterpolationResult},
    interpolant_config::InterpolantSettings,
    kdtree::KDTree,
    kernels, linalg, polynomials,
    progress::{ProgressMsg, ProgressSink},
};

use faer::{concat, Mat, MatRef};
use std::sync::Arc;
use std::time::Instant;

/// Default number of neighbouring observations used per target point.
pub const DEFAULT_NEIGHBOURHOOD_SIZE: usize = 20;

/// Default number of target points evaluated per batch. Smaller than the
/// global interpolator's default because each target assembles its own local
/// system.
pub const DEFAULT_NEAREST_CHUNK_SIZE: usize = 100;

/// Convenience builder for constructing a [`NearestRBFInterpolator`].
///
/// The builder should be called via the [`NearestRBFInterpolator::builder`]
/// method.
pub struct NearestRBFInterpolatorBuilder {
    points: Mat<f64>,
    point_values: Mat<f64>,
    interpolant_settings: InterpolantSettings,
    neighbourhood_size: usize,
    chunk_size: Option<usize>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl NearestRBFInterpolatorBuilder {
    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> Self {
        Self {
            points,
            point_values,
            interpolant_settings,
            neighbourhood_size: DEFAULT_NEIGHBOURHOOD_SIZE,
            chunk_size: Some(DEFAULT_NEAREST_CHUNK_SIZE),
            progress_callback: None,
        }
    }

    /// Sets the number of neighbouring observations used per target point.
    /// Clamped to the observation count during construction.
    pub fn neighbourhood_size(mut self, neighbourhood_size: usize) -> Self {
        self.neighbourhood_size = neighbourhood_size;
        self
    }

    /// Sets the default evaluation chunk size. `None` disables chunking.
    pub fn chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Optional callback for reporting progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds the configured [`NearestRBFInterpolator`].
    pub fn build(self) -> InterpolationResult<NearestRBFInterpolator> {
        NearestRBFInterpolator::new(
            self.points,
            self.point_values,
            self.interpolant_settings,
            self.neighbourhood_size,
            self.chunk_size,
            self.progress_callback,
        )
    }
}

/// Approximation to [`crate::RBFInterpolator`] that only uses the k nearest
/// observations for each target point.
///
/// No global system is solved: construction builds a spatial index once, and
/// every evaluation derives fresh local coefficients per target from a
/// `(k + M) x (k + M)` bordered system over that target's neighbourhood. This
/// requires significantly less memory than the global interpolator when the
/// observation count is large.
///
/// The per-target systems are independent, so a batch is solved
/// data-parallel; results do not depend on the batching. Extrapolation
/// masking is not available here: every target always has k neighbours and a
/// value is always returned.
///
/// Compact-support kernels are rejected at construction, since a fixed-size
/// dense neighbourhood is incompatible with their sparse evaluation model.
#[derive(Debug)]
pub struct NearestRBFInterpolator {
    /// Coordinates of the observation points.
    pub points: Mat<f64>,

    /// Observed values at each observation point, one column per channel.
    pub point_values: Mat<f64>,

    /// Settings used to configure the interpolator.
    interpolant_settings: InterpolantSettings,

    /// Shape parameter broadcast to one entry per observation point.
    shape_parameter: Vec<f64>,

    /// Smoothing magnitudes broadcast to one entry per observation point.
    smoothing: Vec<f64>,

    /// Monomial exponent set for the polynomial term.
    powers: Vec<Vec<u32>>,

    /// Number of neighbouring observations used per target point.
    neighbourhood_size: usize,

    /// Default evaluation chunk size; `None` disables chunking.
    chunk_size: Option<usize>,

    /// Spatial index over the observation points, built once.
    tree: KDTree,

    /// Optional callback for reporting progress.
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl NearestRBFInterpolator {
    /// Creates a new [`NearestRBFInterpolatorBuilder`] for the given points,
    /// values, and settings.
    pub fn builder(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> NearestRBFInterpolatorBuilder {
        NearestRBFInterpolatorBuilder::new(points, point_values, interpolant_settings)
    }

    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
        neighbourhood_size: usize,
        chunk_size: Option<usize>,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> InterpolationResult<Self> {
        let build_start = Instant::now();

        let num_points = points.nrows();
        let dimensions = points.ncols();

        if num_points == 0 {
            return Err(InterpolationError::ShapeMismatch {
                name: "points",
                expected: 1,
                found: 0,
            });
        }
        if point_values.nrows() != num_points {
            return Err(InterpolationError::ShapeMismatch {
                name: "point_values",
                expected: num_points,
                found: point_values.nrows(),
            });
        }

        if interpolant_settings.kernel_type.is_sparse_support() {
            return Err(InterpolationError::Configuration {
                message: format!(
                    "kernel {:?} has compact support and is not supported by the \
                    k-nearest interpolator",
                    interpolant_settings.kernel_type
                ),
            });
        }

        let shape_parameter = interpolant_settings.shape_parameter.broadcast(num_points)?;
        let smoothing = interpolant_settings.smoothing.broadcast(num_points)?;
        let powers =
            polynomials::monomial_powers(interpolant_settings.polynomial_order, dimensions);

        let neighbourhood_size = neighbourhood_size.clamp(1, num_points);
        let tree = KDTree::new(points.as_ref());

        if let Some(sink) = &progress_callback {
            let msg = format!(
                "Took {:?} to build the spatial index over {} points",
                build_start.elapsed(),
                num_points,
            );
            sink.emit(ProgressMsg::Message { message: msg });
        }

        Ok(Self {
            points,
            point_values,
            interpolant_settings,
            shape_parameter,
            smoothing,
            powers,
            neighbourhood_size,
            chunk_size,
            tree,
            progress_callback,
        })
    }

    /// Evaluates the interpolant at the target points using the configured
    /// chunk size.
    ///
    /// ### Returns
    /// A `(n_targets x n_value_channels)` matrix of interpolated values.
    pub fn evaluate(&self, target_points: &Mat<f64>) -> InterpolationResult<Mat<f64>> {
        self.evaluate_with(target_points, None, self.chunk_size)
    }

    /// Evaluates a partial derivative of the interpolant at the target
    /// points.
    ///
    /// `diff` holds one non-negative derivative order per spatial dimension.
    pub fn evaluate_diff(
        &self,
        target_points: &Mat<f64>,
        diff: &[usize],
    ) -> InterpolationResult<Mat<f64>> {
        self.evaluate_with(target_points, Some(diff), self.chunk_size)
    }

    /// Evaluates the interpolant with explicit control over the derivative
    /// orders and chunking.
    pub fn evaluate_with(
        &self,
        target_points: &Mat<f64>,
        diff: Option<&[usize]>,
        chunk_size: Option<usize>,
    ) -> InterpolationResult<Mat<f64>> {
        let dimensions = self.points.ncols();

        if target_points.ncols() != dimensions {
            return Err(InterpolationError::ShapeMismatch {
                name: "target_points",
                expected: dimensions,
                found: target_points.ncols(),
            });
        }
        if let Some(orders) = diff {
            if orders.len() != dimensions {
                return Err(InterpolationError::ShapeMismatch {
                    name: "diff",
                    expected: dimensions,
                    found: orders.len(),
                });
            }
        }
        if self.powers.len() > self.neighbourhood_size {
            return Err(InterpolationError::InsufficientData {
                monomials: self.powers.len(),
                available: self.neighbourhood_size,
                context: "neighbours",
            });
        }

        let num_targets = target_points.nrows();
        let num_channels = self.point_values.ncols();
        let chunk = chunk_size.unwrap_or(num_targets.max(1)).max(1);

        let mut out = Mat::<f64>::zeros(num_targets, num_channels);

        let mut start = 0usize;
        while start < num_targets {
            let len = chunk.min(num_targets - start);
            let batch = self.evaluate_batch(target_points.subrows(start, len), diff)?;
            out.submatrix_mut(start, 0, len, num_channels).copy_from(&batch);

            if let Some(sink) = &self.progress_callback {
                sink.emit(ProgressMsg::EvaluationChunk {
                    completed: start + len,
                    total: num_targets,
                });
            }

            start += len;
        }

        Ok(out)
    }

    /// Evaluates one contiguous batch of validated targets: per-target local
    /// bordered systems assembled from the k nearest observations, solved as
    /// an independent batch, then recombined at each target.
    fn evaluate_batch(
        &self,
        targets: MatRef<'_, f64>,
        diff: Option<&[usize]>,
    ) -> InterpolationResult<Mat<f64>> {
        let k = self.neighbourhood_size;
        let num_targets = targets.nrows();
        let num_channels = self.point_values.ncols();
        let num_monomials = self.powers.len();
        let kernel_type = self.interpolant_settings.kernel_type;

        let (_, neighbour_indices) = self.tree.query(targets, k);

        let mut systems = Vec::with_capacity(num_targets);
        let mut neighbourhoods = Vec::with_capacity(num_targets);

        for t in 0..num_targets {
            let indices: Vec<usize> = (0..k).map(|j| neighbour_indices[(t, j)]).collect();
            let neighbour_points = common::select_mat_rows(self.points.as_ref(), &indices);
            let shape: Vec<f64> = indices.iter().map(|&i| self.shape_parameter[i]).collect();
            let smoothing: Vec<f64> = indices.iter().map(|&i| self.smoothing[i]).collect();

            let kernel_mat = kernels::kernel_matrix_regularised(
                kernel_type,
                neighbour_points.as_ref(),
                &shape,
                &smoothing,
            );
            let neighbour_values = common::select_mat_rows(self.point_values.as_ref(), &indices);

            let (lhs, rhs) = if num_monomials == 0 {
                (kernel_mat, neighbour_values)
            } else {
                let poly_mat =
                    polynomials::evaluate_monomials(neighbour_points.as_ref(), &self.powers, None);
                let poly_t = poly_mat.transpose().to_owned();
                let zeros = Mat::<f64>::zeros(num_monomials, num_monomials);
                (
                    concat![[kernel_mat, poly_mat], [poly_t, zeros]],
                    concat![
                        [neighbour_values],
                        [Mat::<f64>::zeros(num_monomials, num_channels)]
                    ],
                )
            };

            systems.push((lhs, rhs));
            neighbourhoods.push((neighbour_points, shape));
        }

        let solutions = linalg::solve_bordered_batch(systems)?;

        let mut out = Mat::<f64>::zeros(num_targets, num_channels);
        for (t, solution) in solutions.iter().enumerate() {
            let (neighbour_points, shape) = &neighbourhoods[t];
            let target = targets.subrows(t, 1);

            let kernel_row = kernels::kernel_matrix(
                kernel_type,
                target,
                neighbour_points.as_ref(),
                shape,
                diff,
            );
            let poly_row = polynomials::evaluate_monomials(target, &self.powers, diff);

            let phi_coeff = solution.subrows(0, k);
            let poly_coeff = solution.subrows(k, num_monomials);

            let value = kernel_row * phi_coeff + poly_row * poly_coeff;
            out.row_mut(t).copy_from(value.row(0));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::generate_random_points;
    use crate::interpolant_config::{InterpolantSettings, RBFKernelType};
    use crate::rbf::RBFInterpolator;
    use crate::rbf_test_functions::RBFTestFunctions;
    use equator::assert;
    use faer::utils::approx::*;
    use faer::{mat, Mat};

    #[test]
    fn linear_observations_give_the_identity_interpolant() {
        let points = mat![[0.0], [1.0], [2.0]];
        let values = mat![[0.0], [1.0], [2.0]];
        let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();

        let rbfi = NearestRBFInterpolator::builder(points, values, settings)
            .neighbourhood_size(3)
            .build()
            .expect("well-posed");

        let out = rbfi.evaluate(&mat![[0.5]]).unwrap();
        assert!((out[(0, 0)] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn full_neighbourhood_matches_the_global_interpolator() {
        let points = generate_random_points(50, 2, Some(42));
        let values = RBFTestFunctions::franke_2d(&points);
        let targets = generate_random_points(20, 2, Some(43));

        let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();

        let global = RBFInterpolator::builder(points.clone(), values.clone(), settings.clone())
            .build()
            .expect("well-posed");
        let local = NearestRBFInterpolator::builder(points, values, settings)
            .neighbourhood_size(50)
            .build()
            .expect("well-posed");

        let global_out = global.evaluate(&targets).unwrap();
        let local_out = local.evaluate(&targets).unwrap();

        let approx_eq = CwiseMat(ApproxEq::eps() * 1e9);
        assert!(&local_out ~ &global_out);
    }

    #[test]
    fn observations_are_reproduced_at_their_own_locations() {
        // With zero smoothing each observation point belongs to its own
        // neighbourhood, so the local fit passes through its value exactly.
        let points = generate_random_points(100, 2, Some(7));
        let values = RBFTestFunctions::franke_2d(&points);

        let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();
        let rbfi = NearestRBFInterpolator::builder(points.clone(), values.clone(), settings)
            .neighbourhood_size(15)
            .build()
            .expect("well-posed");

        let fitted = rbfi.evaluate(&points).unwrap();

        let approx_eq = CwiseMat(ApproxEq::eps() * 1e8);
        assert!(&fitted ~ &values);
    }

    #[test]
    fn chunked_and_unchunked_evaluation_are_identical() {
        let points = generate_random_points(80, 2, Some(12));
        let values = RBFTestFunctions::franke_2d(&points);
        let targets = generate_random_points(33, 2, Some(13));

        let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();
        let rbfi = NearestRBFInterpolator::builder(points, values, settings)
            .build()
            .expect("well-posed");

        let unchunked = rbfi.evaluate_with(&targets, None, None).unwrap();
        for chunk in [1usize, 7, 33, 500] {
            let chunked = rbfi.evaluate_with(&targets, None, Some(chunk)).unwrap();
            // Each target's neighbourhood and local solve are independent of
            // the batching, so the outputs match exactly.
            assert!(chunked == unchunked);
        }
    }

    #[test]
    fn polynomial_observations_reproduce_values_and_derivatives() {
        let points = generate_random_points(12, 1, Some(3));
        let values = Mat::from_fn(12, 1, |i, _| {
            let x = points[(i, 0)];
            x * x - 3.0 * x + 2.0
        });

        let settings = InterpolantSettings::builder(RBFKernelType::Phs3)
            .polynomial_order(2)
            .build();
        let rbfi = NearestRBFInterpolator::builder(points, values, settings)
            .neighbourhood_size(12)
            .build()
            .expect("well-posed");

        let targets = mat![[0.2], [0.8]];
        let out = rbfi.evaluate(&targets).unwrap();
        let ddx = rbfi.evaluate_diff(&targets, &[1]).unwrap();

        let expected = Mat::from_fn(2, 1, |i, _| {
            let x = targets[(i, 0)];
            x * x - 3.0 * x + 2.0
        });
        let expected_ddx = Mat::from_fn(2, 1, |i, _| 2.0 * targets[(i, 0)] - 3.0);

        let approx_eq = CwiseMat(ApproxEq::eps() * 1e9);
        assert!(&out ~ &expected);
        assert!(&ddx ~ &expected_ddx);
    }

    #[test]
    fn sparse_support_kernels_are_rejected() {
        let points = generate_random_points(30, 2, Some(5));
        let values = RBFTestFunctions::franke_2d(&points);
        let settings = InterpolantSettings::builder(RBFKernelType::Wendland31).build();

        let outcome = NearestRBFInterpolator::builder(points, values, settings).build();
        assert!(matches!(
            outcome,
            Err(InterpolationError::Configuration { .. })
        ));
    }

    #[test]
    fn polynomial_order_exceeding_the_neighbourhood_is_rejected() {
        let points = generate_random_points(30, 2, Some(6));
        let values = RBFTestFunctions::franke_2d(&points);
        let settings = InterpolantSettings::builder(RBFKernelType::Phs3)
            .polynomial_order(2)
            .build();

        // M = 6 monomials in 2D at order 2, but only 3 neighbours.
        let rbfi = NearestRBFInterpolator::builder(points, values, settings)
            .neighbourhood_size(3)
            .build()
            .expect("the neighbourhood check happens at evaluation time");

        let outcome = rbfi.evaluate(&generate_random_points(4, 2, Some(8)));
        assert!(matches!(
            outcome,
            Err(InterpolationError::InsufficientData {
                monomials: 6,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn value_count_mismatch_is_rejected() {
        let points = mat![[0.0], [1.0], [2.0]];
        let values = mat![[0.0], [1.0]];
        let outcome =
            NearestRBFInterpolator::builder(points, values, InterpolantSettings::default())
                .build();
        assert!(matches!(
            outcome,
            Err(InterpolationError::ShapeMismatch { name: "point_values", .. })
        ));
    }

    #[test]
    fn target_dimension_mismatch_fails_before_evaluation() {
        let points = mat![[0.0], [1.0], [2.0]];
        let values = mat![[0.0], [1.0], [2.0]];
        let rbfi = NearestRBFInterpolator::builder(points, values, InterpolantSettings::default())
            .build()
            .expect("well-posed");

        let outcome = rbfi.evaluate(&mat![[0.5, 0.5]]);
        assert!(matches!(
            outcome,
            Err(InterpolationError::ShapeMismatch { name: "target_points", .. })
        ));
    }

    #[test]
    fn oversized_neighbourhood_clamps_to_the_observation_count() {
        let points = generate_random_points(25, 2, Some(19));
        let values = RBFTestFunctions::franke_2d(&points);
        let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();

        let rbfi = NearestRBFInterpolator::builder(points, values, settings)
            .neighbourhood_size(1000)
            .build()
            .expect("well-posed");

        let out = rbfi.evaluate(&generate_random_points(5, 2, Some(20))).unwrap();
        assert!((0..5).all(|i| out[(i, 0)].is_finite()));
    }
}
