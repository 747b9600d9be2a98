/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies kernel, smoothing, shape parameter, and polynomial options for interpolants.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies kernel, smoothing, shape parameter, and polynomial options for interpolants.

use crate::error::{InterpolationError, InterpolationResult};
use serde::{Deserialize, Serialize};

/// The catalog of implemented radial basis kernels.
///
/// Polyharmonic splines (`Phs1` .. `Phs8`) are conditionally positive
/// definite: the interpolation system is only guaranteed well-posed when the
/// polynomial order is at least [`RBFKernelType::min_polynomial_order`].
/// The Wendland kernels (`Wendland10` .. `Wendland32`) have compact support;
/// they are flagged as sparse-support and rejected by the k-nearest
/// interpolator, whose fixed-size dense neighbourhoods assume every kernel
/// entry is meaningful.
#[derive(Clone, Debug, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RBFKernelType {
    /// `phi(r) = -r`
    Phs1,
    /// `phi(r) = r^2 log r` (thin plate spline)
    Phs2,
    /// `phi(r) = r^3`
    Phs3,
    /// `phi(r) = -r^4 log r`
    Phs4,
    /// `phi(r) = -r^5`
    Phs5,
    /// `phi(r) = r^6 log r`
    Phs6,
    /// `phi(r) = r^7`
    Phs7,
    /// `phi(r) = -r^8 log r`
    Phs8,
    /// `phi(r) = exp(-r^2)`
    Gaussian,
    /// `phi(r) = -sqrt(1 + r^2)`
    Multiquadric,
    /// `phi(r) = 1 / sqrt(1 + r^2)`
    InverseMultiquadric,
    /// `phi(r) = 1 / (1 + r^2)`
    InverseQuadratic,
    /// Compactly supported Wendland kernel, C^0 in 1D.
    Wendland10,
    /// Compactly supported Wendland kernel, C^2 in 1D.
    Wendland11,
    /// Compactly supported Wendland kernel, C^4 in 1D.
    Wendland12,
    /// Compactly supported Wendland kernel, C^0 in 3D.
    Wendland30,
    /// Compactly supported Wendland kernel, C^2 in 3D.
    Wendland31,
    /// Compactly supported Wendland kernel, C^4 in 3D.
    Wendland32,
}

impl RBFKernelType {
    /// Whether this kernel belongs to the compact (sparse) support family.
    pub fn is_sparse_support(&self) -> bool {
        matches!(
            self,
            RBFKernelType::Wendland10
                | RBFKernelType::Wendland11
                | RBFKernelType::Wendland12
                | RBFKernelType::Wendland30
                | RBFKernelType::Wendland31
                | RBFKernelType::Wendland32
        )
    }

    /// Minimum polynomial order that guarantees a well-posed interpolation
    /// system for this kernel. `-1` means no polynomial term is required.
    pub fn min_polynomial_order(&self) -> i32 {
        match self {
            RBFKernelType::Phs1 => 0,
            RBFKernelType::Phs2 | RBFKernelType::Phs3 => 1,
            RBFKernelType::Phs4 | RBFKernelType::Phs5 => 2,
            RBFKernelType::Phs6 | RBFKernelType::Phs7 => 3,
            RBFKernelType::Phs8 => 4,
            RBFKernelType::Multiquadric => 0,
            _ => -1,
        }
    }
}

/// Shape parameter controlling the width of the basis functions.
///
/// A uniform value applies the same scaling to every basis centre; a
/// per-centre vector must have one entry per observation point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeParameter {
    Uniform(f64),
    PerCentre(Vec<f64>),
}

impl ShapeParameter {
    /// Broadcasts to one value per observation, validating vector lengths.
    pub(crate) fn broadcast(&self, num_points: usize) -> InterpolationResult<Vec<f64>> {
        match self {
            ShapeParameter::Uniform(eps) => Ok(vec![*eps; num_points]),
            ShapeParameter::PerCentre(values) => {
                if values.len() != num_points {
                    return Err(InterpolationError::ShapeMismatch {
                        name: "shape_parameter",
                        expected: num_points,
                        found: values.len(),
                    });
                }
                Ok(values.clone())
            }
        }
    }

    pub(crate) fn is_uniform(&self) -> bool {
        matches!(self, ShapeParameter::Uniform(_))
    }
}

impl From<f64> for ShapeParameter {
    fn from(eps: f64) -> Self {
        ShapeParameter::Uniform(eps)
    }
}

impl From<Vec<f64>> for ShapeParameter {
    fn from(values: Vec<f64>) -> Self {
        ShapeParameter::PerCentre(values)
    }
}

/// Smoothing magnitudes added (squared) to the kernel diagonal.
///
/// A value of `0.0` (default) enforces an exact fit to all input data.
/// Larger values soften the fit, which reduces sensitivity to noisy data. A
/// per-observation vector should be proportional to the one standard
/// deviation uncertainty of each observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Smoothing {
    Uniform(f64),
    PerObservation(Vec<f64>),
}

impl Smoothing {
    /// Broadcasts to one value per observation, validating vector lengths.
    pub(crate) fn broadcast(&self, num_points: usize) -> InterpolationResult<Vec<f64>> {
        match self {
            Smoothing::Uniform(sigma) => Ok(vec![*sigma; num_points]),
            Smoothing::PerObservation(values) => {
                if values.len() != num_points {
                    return Err(InterpolationError::ShapeMismatch {
                        name: "smoothing",
                        expected: num_points,
                        found: values.len(),
                    });
                }
                Ok(values.clone())
            }
        }
    }
}

impl From<f64> for Smoothing {
    fn from(sigma: f64) -> Self {
        Smoothing::Uniform(sigma)
    }
}

impl From<Vec<f64>> for Smoothing {
    fn from(values: Vec<f64>) -> Self {
        Smoothing::PerObservation(values)
    }
}

/// A convenience builder for constructing an [`InterpolantSettings`] instance.
///
/// The builder should be called via the [`InterpolantSettings::builder`] method.
///
/// See [`InterpolantSettings`] for details on each field.
#[derive(Debug, Clone)]
pub struct InterpolantSettingsBuilder {
    kernel_type: RBFKernelType,
    shape_parameter: ShapeParameter,
    smoothing: Smoothing,
    polynomial_order: i32,
    extrapolate: bool,
}

impl InterpolantSettingsBuilder {
    fn new(kernel_type: RBFKernelType) -> Self {
        Self {
            kernel_type,
            shape_parameter: ShapeParameter::Uniform(1.0),
            smoothing: Smoothing::Uniform(0.0),
            polynomial_order: 1,
            extrapolate: true,
        }
    }

    /// Sets the shape parameter.
    pub fn shape_parameter(mut self, shape_parameter: impl Into<ShapeParameter>) -> Self {
        self.shape_parameter = shape_parameter.into();
        self
    }

    /// Sets the smoothing magnitudes.
    pub fn smoothing(mut self, smoothing: impl Into<Smoothing>) -> Self {
        self.smoothing = smoothing.into();
        self
    }

    /// Sets the order of the added polynomial terms. Use `-1` for no added
    /// polynomial terms.
    pub fn polynomial_order(mut self, polynomial_order: i32) -> Self {
        self.polynomial_order = polynomial_order.max(-1);
        self
    }

    /// Sets whether target points outside the convex hull of the observations
    /// are evaluated (`true`) or masked with NaN (`false`). Only the global
    /// interpolator consults this flag.
    pub fn extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Builds and returns an instance of [`InterpolantSettings`] from the
    /// values defined in the builder.
    pub fn build(self) -> InterpolantSettings {
        InterpolantSettings {
            kernel_type: self.kernel_type,
            shape_parameter: self.shape_parameter,
            smoothing: self.smoothing,
            polynomial_order: self.polynomial_order,
            extrapolate: self.extrapolate,
        }
    }
}

/// Configuration shared by both interpolator types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolantSettings {
    /// The RBF kernel to use for interpolation.
    pub kernel_type: RBFKernelType,

    /// Shape parameter controlling basis function width.
    pub shape_parameter: ShapeParameter,

    /// Smoothing magnitudes; squared values are added to the kernel diagonal.
    pub smoothing: Smoothing,

    /// Order of the added polynomial terms. `-1` disables the polynomial
    /// block entirely.
    pub polynomial_order: i32,

    /// Whether evaluation outside the convex hull of the observations is
    /// permitted. When `false`, such targets evaluate to NaN.
    pub extrapolate: bool,
}

impl InterpolantSettings {
    /// Returns a new [`InterpolantSettingsBuilder`] for the given kernel type.
    pub fn builder(kernel_type: RBFKernelType) -> InterpolantSettingsBuilder {
        InterpolantSettingsBuilder::new(kernel_type)
    }
}

impl Default for InterpolantSettings {
    fn default() -> Self {
        InterpolantSettings::builder(RBFKernelType::Phs3).build()
    }
}
