/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the error taxonomy shared by the interpolators and their supporting solvers.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use std::error::Error;
use std::fmt;

/// Convenience alias used throughout the crate.
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Errors raised while constructing or evaluating an interpolant.
///
/// Every failure is synchronous: construction and evaluation either complete
/// with a well-formed result or return one of these variants. There is no
/// partially-built state to recover.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// An input array's extent disagrees with the stated invariants, e.g. the
    /// value count differs from the observation count, or a target point has
    /// the wrong dimensionality. Raised before any numerical work.
    ShapeMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    /// The requested polynomial order produces more monomial constraints than
    /// there are observations (global case) or neighbours (k-nearest case).
    InsufficientData {
        monomials: usize,
        available: usize,
        context: &'static str,
    },

    /// An incompatible kernel/formulation combination was requested, such as
    /// a compact-support kernel with the k-nearest interpolator.
    Configuration { message: String },

    /// The assembled linear system is singular or severely ill-conditioned.
    SingularSystem { context: &'static str },
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationError::ShapeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "shape mismatch for `{}`: expected {}, found {}",
                name, expected, found
            ),
            InterpolationError::InsufficientData {
                monomials,
                available,
                context,
            } => write!(
                f,
                "the polynomial order requires {} monomial terms but only {} {} are available",
                monomials, available, context
            ),
            InterpolationError::Configuration { message } => write!(f, "{}", message),
            InterpolationError::SingularSystem { context } => write!(
                f,
                "the {} system is singular or severely ill-conditioned",
                context
            ),
        }
    }
}

impl Error for InterpolationError {}
