/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the radial kernel catalog and its analytic partial derivative evaluation.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # kernels
//!
//! Every kernel in the catalog is a radial profile `f` of the squared scaled
//! distance, `phi(eps * r) = f(s)` with `s = eps^2 * |x - y|^2`. Partial
//! derivatives of any order with respect to the target coordinates are exact:
//! differentiating a term of the form
//!
//! ```text
//! coeff * eps^(2m) * prod_d (x_d - y_d)^(p_d) * f^(m)(s)
//! ```
//!
//! with respect to `x_i` yields two terms of the same form, so a requested
//! derivative-order vector expands once into a finite term list which is then
//! evaluated per point pair. Each profile supplies a closed form for its m-th
//! derivative in `s`.

use crate::interpolant_config::RBFKernelType;
use faer::{Mat, MatRef};
use std::collections::BTreeMap;

/// Radial profile families. `s` is the squared scaled distance.
#[derive(Debug, Clone, Copy)]
enum RadialProfile {
    /// `coeff * s^(exponent / 2)`, odd exponent (polyharmonic splines r^k).
    Power { coeff: f64, exponent: u32 },

    /// `(coeff / 2) * s^(exponent / 2) * ln s`, even exponent
    /// (polyharmonic splines r^k log r).
    PowerLog { coeff: f64, exponent: u32 },

    /// `exp(-s)` (Gaussian).
    Exp,

    /// `coeff * (1 + s)^power` (multiquadric family).
    Shifted { coeff: f64, power: f64 },

    /// `sum_j c_j * s^(j / 2)` on `s <= 1`, zero outside (Wendland family).
    Compact { terms: &'static [(f64, u32)] },
}

const WENDLAND_10: &[(f64, u32)] = &[(1.0, 0), (-1.0, 1)];
const WENDLAND_11: &[(f64, u32)] = &[(1.0, 0), (-6.0, 2), (8.0, 3), (-3.0, 4)];
const WENDLAND_12: &[(f64, u32)] = &[
    (1.0, 0),
    (-7.0, 2),
    (35.0, 4),
    (-56.0, 5),
    (35.0, 6),
    (-8.0, 7),
];
const WENDLAND_30: &[(f64, u32)] = &[(1.0, 0), (-2.0, 1), (1.0, 2)];
const WENDLAND_31: &[(f64, u32)] = &[(1.0, 0), (-10.0, 2), (20.0, 3), (-15.0, 4), (4.0, 5)];
const WENDLAND_32: &[(f64, u32)] = &[
    (1.0, 0),
    (-28.0 / 3.0, 2),
    (70.0, 4),
    (-448.0 / 3.0, 5),
    (140.0, 6),
    (-64.0, 7),
    (35.0 / 3.0, 8),
];

fn profile(kernel: RBFKernelType) -> RadialProfile {
    match kernel {
        RBFKernelType::Phs1 => RadialProfile::Power {
            coeff: -1.0,
            exponent: 1,
        },
        RBFKernelType::Phs3 => RadialProfile::Power {
            coeff: 1.0,
            exponent: 3,
        },
        RBFKernelType::Phs5 => RadialProfile::Power {
            coeff: -1.0,
            exponent: 5,
        },
        RBFKernelType::Phs7 => RadialProfile::Power {
            coeff: 1.0,
            exponent: 7,
        },
        RBFKernelType::Phs2 => RadialProfile::PowerLog {
            coeff: 1.0,
            exponent: 2,
        },
        RBFKernelType::Phs4 => RadialProfile::PowerLog {
            coeff: -1.0,
            exponent: 4,
        },
        RBFKernelType::Phs6 => RadialProfile::PowerLog {
            coeff: 1.0,
            exponent: 6,
        },
        RBFKernelType::Phs8 => RadialProfile::PowerLog {
            coeff: -1.0,
            exponent: 8,
        },
        RBFKernelType::Gaussian => RadialProfile::Exp,
        RBFKernelType::Multiquadric => RadialProfile::Shifted {
            coeff: -1.0,
            power: 0.5,
        },
        RBFKernelType::InverseMultiquadric => RadialProfile::Shifted {
            coeff: 1.0,
            power: -0.5,
        },
        RBFKernelType::InverseQuadratic => RadialProfile::Shifted {
            coeff: 1.0,
            power: -1.0,
        },
        RBFKernelType::Wendland10 => RadialProfile::Compact { terms: WENDLAND_10 },
        RBFKernelType::Wendland11 => RadialProfile::Compact { terms: WENDLAND_11 },
        RBFKernelType::Wendland12 => RadialProfile::Compact { terms: WENDLAND_12 },
        RBFKernelType::Wendland30 => RadialProfile::Compact { terms: WENDLAND_30 },
        RBFKernelType::Wendland31 => RadialProfile::Compact { terms: WENDLAND_31 },
        RBFKernelType::Wendland32 => RadialProfile::Compact { terms: WENDLAND_32 },
    }
}

/// Falling-factorial product `nu * (nu - 1) * ... * (nu - order + 1)`.
#[inline(always)]
fn falling_product(nu: f64, order: u32) -> f64 {
    let mut prod = 1.0;
    for i in 0..order {
        prod *= nu - i as f64;
    }
    prod
}

/// Evaluates the `order`-th derivative of the profile with respect to `s`.
///
/// Where a derivative diverges as `s -> 0` the signed infinity of the
/// analytic limit is returned; callers relying on the full term expansion get
/// the correct finite limits because diverging terms always carry a vanishing
/// monomial factor for derivative orders at which the kernel is smooth.
fn profile_derivative(profile: &RadialProfile, order: u32, s: f64) -> f64 {
    match profile {
        RadialProfile::Power { coeff, exponent } => {
            let nu = *exponent as f64 / 2.0;
            let prod = falling_product(nu, order);
            if prod == 0.0 {
                return 0.0;
            }
            coeff * prod * s.powf(nu - order as f64)
        }
        RadialProfile::PowerLog { coeff, exponent } => {
            let a = (exponent / 2) as i64;
            let mut log_coeff = coeff / 2.0;
            let mut plain_coeff = 0.0;
            for i in 0..order as i64 {
                let factor = (a - i) as f64;
                plain_coeff = plain_coeff * factor + log_coeff;
                log_coeff *= factor;
            }

            if s == 0.0 {
                return if a > order as i64 {
                    0.0
                } else if log_coeff != 0.0 {
                    f64::NEG_INFINITY * log_coeff.signum()
                } else if plain_coeff != 0.0 {
                    f64::INFINITY * plain_coeff.signum()
                } else {
                    0.0
                };
            }

            (log_coeff * s.ln() + plain_coeff) * s.powf((a - order as i64) as f64)
        }
        RadialProfile::Exp => {
            let value = (-s).exp();
            if order % 2 == 0 {
                value
            } else {
                -value
            }
        }
        RadialProfile::Shifted { coeff, power } => {
            coeff * falling_product(*power, order) * (1.0 + s).powf(power - order as f64)
        }
        RadialProfile::Compact { terms } => {
            if s > 1.0 {
                return 0.0;
            }
            let mut value = 0.0;
            for (c, j) in terms.iter() {
                let nu = *j as f64 / 2.0;
                let prod = falling_product(nu, order);
                if prod == 0.0 {
                    continue;
                }
                value += c * prod * s.powf(nu - order as f64);
            }
            value
        }
    }
}

/// One term of the expanded derivative:
/// `coeff * eps^(2 * order) * prod_d u_d^(powers_d) * f^(order)(s)`.
#[derive(Debug, Clone)]
struct Term {
    coeff: f64,
    powers: Vec<u32>,
    order: u32,
}

/// Collapses duplicate (powers, order) keys; the BTreeMap keeps the term
/// ordering deterministic.
fn merge_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut merged: BTreeMap<(Vec<u32>, u32), f64> = BTreeMap::new();
    for term in terms {
        *merged.entry((term.powers, term.order)).or_insert(0.0) += term.coeff;
    }
    merged
        .into_iter()
        .filter(|(_, coeff)| *coeff != 0.0)
        .map(|((powers, order), coeff)| Term {
            coeff,
            powers,
            order,
        })
        .collect()
}

/// Expands a derivative-order vector into the term list by repeatedly
/// applying the product/chain rule along each axis.
fn expand_terms(dimensions: usize, diff: &[usize]) -> Vec<Term> {
    let mut terms = vec![Term {
        coeff: 1.0,
        powers: vec![0; dimensions],
        order: 0,
    }];

    for (axis, &times) in diff.iter().enumerate() {
        for _ in 0..times {
            let mut next = Vec::with_capacity(terms.len() * 2);
            for term in &terms {
                // d/dx_i of u_i^p contributes p * u_i^(p-1).
                if term.powers[axis] > 0 {
                    let mut powers = term.powers.clone();
                    powers[axis] -= 1;
                    next.push(Term {
                        coeff: term.coeff * term.powers[axis] as f64,
                        powers,
                        order: term.order,
                    });
                }

                // d/dx_i of f^(m)(s) contributes 2 * eps^2 * u_i * f^(m+1)(s).
                let mut powers = term.powers.clone();
                powers[axis] += 1;
                next.push(Term {
                    coeff: term.coeff * 2.0,
                    powers,
                    order: term.order + 1,
                });
            }
            terms = merge_terms(next);
        }
    }

    terms
}

/// Builds the dense kernel evaluation matrix between targets and sources.
///
/// `shape` holds one shape parameter per source point; `diff` optionally
/// requests a partial derivative order per spatial dimension (the zero vector
/// is the plain function value).
pub(crate) fn kernel_matrix(
    kernel: RBFKernelType,
    target_points: MatRef<'_, f64>,
    source_points: MatRef<'_, f64>,
    shape: &[f64],
    diff: Option<&[usize]>,
) -> Mat<f64> {
    let dimensions = source_points.ncols();
    debug_assert_eq!(target_points.ncols(), dimensions);
    debug_assert_eq!(shape.len(), source_points.nrows());

    let profile = profile(kernel);
    let zero_diff = vec![0usize; dimensions];
    let diff = diff.unwrap_or(&zero_diff);
    let terms = expand_terms(dimensions, diff);

    let num_targets = target_points.nrows();
    let num_sources = source_points.nrows();
    let mut a_matrix = Mat::<f64>::zeros(num_targets, num_sources);
    let mut u = vec![0.0f64; dimensions];

    for j in 0..num_sources {
        let source = source_points.row(j);
        let eps2 = shape[j] * shape[j];

        for i in 0..num_targets {
            let target = target_points.row(i);

            let mut r2 = 0.0;
            for (d, (t, y)) in target.iter().zip(source.iter()).enumerate() {
                u[d] = t - y;
                r2 += u[d] * u[d];
            }
            let s = eps2 * r2;

            let mut value = 0.0;
            for term in &terms {
                let mut mono = 1.0;
                for (ud, p) in u.iter().zip(term.powers.iter()) {
                    mono *= ud.powi(*p as i32);
                }
                // A vanished monomial factor also encodes the r -> 0 limit of
                // the diverging profile derivatives it multiplies.
                if mono == 0.0 {
                    continue;
                }
                value += term.coeff
                    * eps2.powi(term.order as i32)
                    * mono
                    * profile_derivative(&profile, term.order, s);
            }

            a_matrix[(i, j)] = value;
        }
    }

    a_matrix
}

/// Builds the symmetric kernel matrix over one point set, adding the squared
/// smoothing magnitudes to the diagonal.
pub(crate) fn kernel_matrix_regularised(
    kernel: RBFKernelType,
    points: MatRef<'_, f64>,
    shape: &[f64],
    smoothing: &[f64],
) -> Mat<f64> {
    let mut a_matrix = kernel_matrix(kernel, points, points, shape, None);
    for i in 0..points.nrows() {
        a_matrix[(i, i)] += smoothing[i] * smoothing[i];
    }
    a_matrix
}

/// Evaluates the kernel function at scaled distance `eps * r`.
#[cfg(test)]
pub(crate) fn kernel_phi(kernel: RBFKernelType, r: f64) -> f64 {
    profile_derivative(&profile(kernel), 0, r * r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn catalog_matches_closed_forms() {
        let r = 0.75f64;
        assert!((kernel_phi(RBFKernelType::Phs1, r) - (-r)).abs() < 1e-14);
        assert!((kernel_phi(RBFKernelType::Phs2, r) - r * r * r.ln()).abs() < 1e-14);
        assert!((kernel_phi(RBFKernelType::Phs3, r) - r.powi(3)).abs() < 1e-14);
        assert!((kernel_phi(RBFKernelType::Phs5, r) + r.powi(5)).abs() < 1e-14);
        assert!((kernel_phi(RBFKernelType::Gaussian, r) - (-r * r).exp()).abs() < 1e-14);
        assert!(
            (kernel_phi(RBFKernelType::Multiquadric, r) + (1.0 + r * r).sqrt()).abs() < 1e-14
        );
        assert!(
            (kernel_phi(RBFKernelType::InverseQuadratic, r) - 1.0 / (1.0 + r * r)).abs() < 1e-14
        );
    }

    #[test]
    fn wendland_kernels_vanish_outside_support() {
        for kernel in [
            RBFKernelType::Wendland10,
            RBFKernelType::Wendland11,
            RBFKernelType::Wendland12,
            RBFKernelType::Wendland30,
            RBFKernelType::Wendland31,
            RBFKernelType::Wendland32,
        ] {
            assert!((kernel_phi(kernel, 0.0) - 1.0).abs() < 1e-12);
            assert!(kernel_phi(kernel, 1.0).abs() < 1e-12);
            assert_eq!(kernel_phi(kernel, 1.5), 0.0);
        }
    }

    #[test]
    fn wendland31_matches_polynomial_form() {
        let r = 0.4f64;
        let expected = (1.0f64 - r).powi(4) * (4.0 * r + 1.0);
        assert!((kernel_phi(RBFKernelType::Wendland31, r) - expected).abs() < 1e-12);
    }

    #[test]
    fn phs3_first_derivative_1d() {
        // d/dx |x - y|^3 = 3 (x - y) |x - y|
        let targets = mat![[2.0]];
        let sources = mat![[0.5]];
        let k = kernel_matrix(
            RBFKernelType::Phs3,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[1]),
        );
        assert!((k[(0, 0)] - 3.0 * 1.5 * 1.5).abs() < 1e-12);
    }

    #[test]
    fn phs3_second_derivative_1d() {
        // d^2/dx^2 |x - y|^3 = 6 |x - y|
        let targets = mat![[2.0]];
        let sources = mat![[0.5]];
        let k = kernel_matrix(
            RBFKernelType::Phs3,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[2]),
        );
        assert!((k[(0, 0)] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn phs3_second_derivative_has_zero_limit_at_centre() {
        let points = mat![[0.3]];
        let k = kernel_matrix(
            RBFKernelType::Phs3,
            points.as_ref(),
            points.as_ref(),
            &[1.0],
            Some(&[2]),
        );
        assert_eq!(k[(0, 0)], 0.0);
    }

    #[test]
    fn phs3_gradient_2d() {
        // d/dx r^3 = 3 r (x - y_x)
        let targets = mat![[1.0, 2.0]];
        let sources = mat![[0.2, 0.7]];
        let ux = 0.8f64;
        let uy = 1.3f64;
        let r = (ux * ux + uy * uy).sqrt();

        let kx = kernel_matrix(
            RBFKernelType::Phs3,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[1, 0]),
        );
        let ky = kernel_matrix(
            RBFKernelType::Phs3,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[0, 1]),
        );

        assert!((kx[(0, 0)] - 3.0 * r * ux).abs() < 1e-12);
        assert!((ky[(0, 0)] - 3.0 * r * uy).abs() < 1e-12);
    }

    #[test]
    fn thin_plate_spline_gradient_2d() {
        // d/dx (r^2 log r) = (x - y_x) (2 log r + 1)
        let targets = mat![[0.9, 0.1]];
        let sources = mat![[0.4, 0.8]];
        let ux = 0.5f64;
        let uy = -0.7f64;
        let r = (ux * ux + uy * uy).sqrt();

        let kx = kernel_matrix(
            RBFKernelType::Phs2,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[1, 0]),
        );

        assert!((kx[(0, 0)] - ux * (2.0 * r.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn gaussian_derivatives_respect_shape_parameter() {
        // d/dx exp(-(eps u)^2) = -2 eps^2 u exp(-(eps u)^2)
        let eps = 2.0f64;
        let u = 0.3f64;
        let targets = mat![[1.0]];
        let sources = mat![[1.0 - u]];

        let k1 = kernel_matrix(
            RBFKernelType::Gaussian,
            targets.as_ref(),
            sources.as_ref(),
            &[eps],
            Some(&[1]),
        );
        let expected1 = -2.0 * eps * eps * u * (-(eps * u).powi(2)).exp();
        assert!((k1[(0, 0)] - expected1).abs() < 1e-12);

        // d^2/dx^2 exp(-(eps u)^2) = (4 eps^4 u^2 - 2 eps^2) exp(-(eps u)^2)
        let k2 = kernel_matrix(
            RBFKernelType::Gaussian,
            targets.as_ref(),
            sources.as_ref(),
            &[eps],
            Some(&[2]),
        );
        let e2 = eps * eps;
        let expected2 = (4.0 * e2 * e2 * u * u - 2.0 * e2) * (-(eps * u).powi(2)).exp();
        assert!((k2[(0, 0)] - expected2).abs() < 1e-12);
    }

    #[test]
    fn mixed_partial_of_cubic_kernel_2d() {
        // d^2/dxdy r^3 = 3 u_x u_y / r
        let targets = mat![[1.1, -0.2]];
        let sources = mat![[0.3, 0.5]];
        let ux = 0.8f64;
        let uy = -0.7f64;
        let r = (ux * ux + uy * uy).sqrt();

        let kxy = kernel_matrix(
            RBFKernelType::Phs3,
            targets.as_ref(),
            sources.as_ref(),
            &[1.0],
            Some(&[1, 1]),
        );
        assert!((kxy[(0, 0)] - 3.0 * ux * uy / r).abs() < 1e-12);
    }

    #[test]
    fn zero_diff_vector_matches_plain_evaluation() {
        let targets = mat![[0.1, 0.4], [0.8, 0.2]];
        let sources = mat![[0.0, 0.0], [0.5, 0.5], [1.0, 0.3]];
        let shape = [1.3, 1.3, 1.3];

        let plain = kernel_matrix(
            RBFKernelType::Multiquadric,
            targets.as_ref(),
            sources.as_ref(),
            &shape,
            None,
        );
        let zeros = kernel_matrix(
            RBFKernelType::Multiquadric,
            targets.as_ref(),
            sources.as_ref(),
            &shape,
            Some(&[0, 0]),
        );
        assert_eq!(plain, zeros);
    }

    #[test]
    fn regularised_matrix_adds_squared_smoothing_to_diagonal() {
        let points = mat![[0.0], [1.0], [2.0]];
        let shape = [1.0, 1.0, 1.0];
        let sigma = [0.5, 0.0, 2.0];

        let plain = kernel_matrix(
            RBFKernelType::Phs3,
            points.as_ref(),
            points.as_ref(),
            &shape,
            None,
        );
        let reg = kernel_matrix_regularised(RBFKernelType::Phs3, points.as_ref(), &shape, &sigma);

        assert!((reg[(0, 0)] - plain[(0, 0)] - 0.25).abs() < 1e-14);
        assert!((reg[(1, 1)] - plain[(1, 1)]).abs() < 1e-14);
        assert!((reg[(2, 2)] - plain[(2, 2)] - 4.0).abs() < 1e-14);
        assert_eq!(reg[(0, 1)], plain[(0, 1)]);
    }
}
