/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for scattered-data RBF interpolation.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Scattered-data interpolation with Radial Basis Functions (RBFs).
//!
//! This crate approximates a function known only at irregularly placed
//! sample points, with polynomial augmentation for well-posedness and a
//! tunable smoothing term for noisy data. Two interpolant types share one
//! mathematical core:
//!
//! - [`RBFInterpolator`] solves a single regularised system over **all**
//!   observations at construction time. Use it when the observation count is
//!   small enough to form the dense global matrix.
//! - [`NearestRBFInterpolator`] builds a small local system from only the k
//!   nearest observations of each target point, scaling to large datasets
//!   with bounded memory.
//!
//! # Features
//! - Catalog of polyharmonic, Gaussian, multiquadric, and compact-support
//!   Wendland kernels
//! - Analytic partial derivatives of the interpolant of any order
//! - Per-observation smoothing magnitudes for noisy data
//! - Optional masking of extrapolated values outside the convex hull of the
//!   observations
//! - Chunked evaluation to bound peak memory on large target sets
//! - Built on [`faer`](https://docs.rs/faer/latest/faer/) for linear algebra,
//!   avoiding complex build dependencies
//!
//! # Examples
//!
//! ```
//! use faer::mat;
//! use ferreus_scatter::{
//!     interpolant_config::{InterpolantSettings, RBFKernelType},
//!     RBFInterpolator,
//! };
//!
//! // Observations sampled from the identity function on a line.
//! let points = mat![[0.0], [1.0], [2.0]];
//! let values = mat![[0.0], [1.0], [2.0]];
//!
//! // Cubic kernel with the default linear polynomial term and no smoothing.
//! let settings = InterpolantSettings::builder(RBFKernelType::Phs3).build();
//!
//! // Setup and solve the interpolation system.
//! let rbfi = RBFInterpolator::builder(points, values, settings).build()?;
//!
//! // The interpolant reproduces the sampled function.
//! let interpolated = rbfi.evaluate(&mat![[0.5]])?;
//! assert!((interpolated[(0, 0)] - 0.5).abs() < 1e-8);
//! # Ok::<(), ferreus_scatter::InterpolationError>(())
//! ```
//!
//! # References
//! 1. Fasshauer, G., 2007. Meshfree Approximation Methods with Matlab. World
//!    Scientific Publishing Co.
//! 2. Wendland, H., 2005. Scattered Data Approximation. Cambridge University
//!    Press.
pub mod interpolant_config;

mod common;

mod error;

mod hull;

mod kdtree;

mod kernels;

mod linalg;

mod nearest;

mod polynomials;

pub mod progress;

mod rbf;

mod rbf_test_functions;

pub use {
    common::{create_evaluation_grid, generate_random_points},
    error::{InterpolationError, InterpolationResult},
    nearest::{
        NearestRBFInterpolator, NearestRBFInterpolatorBuilder, DEFAULT_NEAREST_CHUNK_SIZE,
        DEFAULT_NEIGHBOURHOOD_SIZE,
    },
    rbf::{
        Coefficients, ModelIOError, RBFInterpolator, RBFInterpolatorBuilder, DEFAULT_CHUNK_SIZE,
    },
    rbf_test_functions::RBFTestFunctions,
};
