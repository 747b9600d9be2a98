/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the global interpolator: one regularised system over all observations.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    error::{InterpolationError, InterpolationResult},
    hull,
    interpolant_config::InterpolantSettings,
    kernels, linalg, polynomials,
    progress::{ProgressMsg, ProgressSink},
};

use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Default number of target points evaluated per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Coefficients of a solved interpolation system.
///
/// After fitting, the interpolator produces a set of coefficients that define
/// the contribution of each basis function. These coefficients are stored in
/// this struct and used during evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct Coefficients {
    /// Coefficients associated with the basis centres (observation points).
    pub point_coefficients: Mat<f64>,

    /// Coefficients associated with the polynomial term, if present.
    ///
    /// This is `None` when no polynomial component was included in the
    /// system, or `Some(matrix)` otherwise.
    pub poly_coefficients: Option<Mat<f64>>,
}

impl Coefficients {
    pub(crate) fn new(point_coefficients: Mat<f64>, poly_coefficients: Option<Mat<f64>>) -> Self {
        Self {
            point_coefficients,
            poly_coefficients,
        }
    }
}

/// Convenience builder for constructing an [`RBFInterpolator`].
///
/// The builder should be called via the [`RBFInterpolator::builder`] method.
///
/// See [`RBFInterpolator`] for details on each field.
pub struct RBFInterpolatorBuilder {
    points: Mat<f64>,
    point_values: Mat<f64>,
    interpolant_settings: InterpolantSettings,
    chunk_size: Option<usize>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RBFInterpolatorBuilder {
    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> Self {
        Self {
            points,
            point_values,
            interpolant_settings,
            chunk_size: Some(DEFAULT_CHUNK_SIZE),
            progress_callback: None,
        }
    }

    /// Sets the default evaluation chunk size. `None` disables chunking so
    /// every evaluation call processes all target points in one batch.
    pub fn chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Optional callback for reporting progress.
    ///
    /// Skipped during serialization.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds the configured [`RBFInterpolator`], solving the interpolation
    /// system.
    pub fn build(self) -> InterpolationResult<RBFInterpolator> {
        RBFInterpolator::new(
            self.points,
            self.point_values,
            self.interpolant_settings,
            self.chunk_size,
            self.progress_callback,
        )
    }
}

/// Regularised radial basis function interpolator over all observations.
///
/// The interpolant has the form `f(x) = K(x, y) a + P(x) b`, where `K` holds
/// the kernel evaluated between `x` and the observation points `y`, and `P`
/// holds the monomial basis. The coefficients minimise a regularised misfit:
/// with zero smoothing the observations are reproduced exactly, while larger
/// smoothing magnitudes trade fit for smoothness. Construction solves the
/// bordered system
///
/// ```text
/// [ K + diag(sigma^2)  P ] [a]   [d]
/// [ P'                 0 ] [b] = [0]
/// ```
///
/// once; the interpolator is immutable afterwards and evaluation only reads
/// solved state, so concurrent evaluation calls are safe.
///
/// Values may carry several channels (one column each); all channels share
/// the same factorisation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RBFInterpolator {
    /// Coordinates of the observation points.
    pub points: Mat<f64>,

    /// Observed values at each observation point, one column per channel.
    pub point_values: Mat<f64>,

    /// Solved coefficients for the kernel and polynomial terms.
    pub coefficients: Coefficients,

    /// Settings used to configure the interpolator.
    interpolant_settings: InterpolantSettings,

    /// Shape parameter broadcast to one entry per observation point.
    shape_parameter: Vec<f64>,

    /// Monomial exponent set for the polynomial term.
    powers: Vec<Vec<u32>>,

    /// Default evaluation chunk size; `None` disables chunking.
    chunk_size: Option<usize>,

    /// Optional callback for reporting progress.
    /// Skipped during serialization.
    #[serde(skip, default)]
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl RBFInterpolator {
    /// Creates a new [`RBFInterpolatorBuilder`] for the given points, values,
    /// and settings.
    ///
    /// This is the way to construct an interpolator.
    pub fn builder(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
    ) -> RBFInterpolatorBuilder {
        RBFInterpolatorBuilder::new(points, point_values, interpolant_settings)
    }

    fn new(
        points: Mat<f64>,
        point_values: Mat<f64>,
        interpolant_settings: InterpolantSettings,
        chunk_size: Option<usize>,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> InterpolationResult<Self> {
        let solver_start = Instant::now();

        let num_points = points.nrows();
        let dimensions = points.ncols();

        if point_values.nrows() != num_points {
            return Err(InterpolationError::ShapeMismatch {
                name: "point_values",
                expected: num_points,
                found: point_values.nrows(),
            });
        }

        let shape_parameter = interpolant_settings.shape_parameter.broadcast(num_points)?;
        let smoothing = interpolant_settings.smoothing.broadcast(num_points)?;

        let powers =
            polynomials::monomial_powers(interpolant_settings.polynomial_order, dimensions);
        if powers.len() > num_points {
            return Err(InterpolationError::InsufficientData {
                monomials: powers.len(),
                available: num_points,
                context: "observations",
            });
        }

        let kernel_mat = kernels::kernel_matrix_regularised(
            interpolant_settings.kernel_type,
            points.as_ref(),
            &shape_parameter,
            &smoothing,
        );
        let poly_mat = polynomials::evaluate_monomials(points.as_ref(), &powers, None);

        let solver = linalg::PartitionedSolver::new(
            kernel_mat,
            poly_mat,
            interpolant_settings.shape_parameter.is_uniform(),
        )?;
        let (point_coefficients, poly_coefficients) = solver.solve(point_values.as_ref())?;

        let interpolator = Self {
            points,
            point_values,
            coefficients: Coefficients::new(point_coefficients, poly_coefficients),
            interpolant_settings,
            shape_parameter,
            powers,
            chunk_size,
            progress_callback,
        };

        if let Some(sink) = &interpolator.progress_callback {
            let msg = format!(
                "Took {:?} to solve the interpolation system for {} points using \
                kernel {:?} with polynomial order {}",
                solver_start.elapsed(),
                interpolator.points.nrows(),
                interpolator.interpolant_settings.kernel_type,
                interpolator.interpolant_settings.polynomial_order,
            );
            sink.emit(ProgressMsg::Message { message: msg });
        }

        Ok(interpolator)
    }

    /// Evaluates the interpolant at the target points using the configured
    /// chunk size.
    ///
    /// ### Returns
    /// A `(n_targets x n_value_channels)` matrix of interpolated values. With
    /// extrapolation disabled, targets outside the convex hull of the
    /// observation points evaluate to NaN.
    pub fn evaluate(&self, target_points: &Mat<f64>) -> InterpolationResult<Mat<f64>> {
        self.evaluate_with(target_points, None, self.chunk_size)
    }

    /// Evaluates a partial derivative of the interpolant at the target
    /// points.
    ///
    /// `diff` holds one non-negative derivative order per spatial dimension;
    /// the zero vector reproduces [`RBFInterpolator::evaluate`].
    pub fn evaluate_diff(
        &self,
        target_points: &Mat<f64>,
        diff: &[usize],
    ) -> InterpolationResult<Mat<f64>> {
        self.evaluate_with(target_points, Some(diff), self.chunk_size)
    }

    /// Evaluates the interpolant with explicit control over the derivative
    /// orders and chunking.
    ///
    /// Chunking bounds peak memory by processing targets in contiguous
    /// batches; the concatenated output is identical to an unchunked
    /// evaluation. `None` disables chunking.
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

        let num_targets = target_points.nrows();
        let num_channels = self.point_values.ncols();
        let chunk = chunk_size.unwrap_or(num_targets.max(1)).max(1);

        let mut out = Mat::<f64>::zeros(num_targets, num_channels);

        let mut start = 0usize;
        while start < num_targets {
            let len = chunk.min(num_targets - start);
            let batch = self.evaluate_batch(target_points.subrows(start, len), diff);
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

    /// Evaluates the fitted interpolant at the observation points.
    ///
    /// With zero smoothing this reproduces the observed values to solver
    /// accuracy; with smoothing it exposes the regularised fit, which is
    /// useful for misfit diagnostics.
    pub fn evaluate_at_source(&self) -> InterpolationResult<Mat<f64>> {
        self.evaluate_with(&self.points, None, self.chunk_size)
    }

    /// Evaluates one contiguous batch of validated targets.
    fn evaluate_batch(&self, targets: MatRef<'_, f64>, diff: Option<&[usize]>) -> Mat<f64> {
        let kernel_mat = kernels::kernel_matrix(
            self.interpolant_settings.kernel_type,
            targets,
            self.points.as_ref(),
            &self.shape_parameter,
            diff,
        );

        let mut values = kernel_mat * &self.coefficients.point_coefficients;

        if let Some(poly_coefficients) = &self.coefficients.poly_coefficients {
            let poly_mat = polynomials::evaluate_monomials(targets, &self.powers, diff);
            values += poly_mat * poly_coefficients;
        }

        if !self.interpolant_settings.extrapolate {
            let inside = hull::points_in_hull(targets, self.points.as_ref());
            for (i, inside) in inside.iter().enumerate() {
                if !inside {
                    values.row_mut(i).fill(f64::NAN);
                }
            }
        }

        values
    }

    /// Save this interpolator to a JSON envelope `{ format, version, model }`.
    ///
    /// The on-disk format is versioned; files produced here are intended to
    /// be read back with [`RBFInterpolator::load_model`].
    ///
    /// ### Errors
    /// Returns `ModelIOError::{Create, Serialize, Flush}` on I/O or
    /// serialization failures.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> ModelIOResult<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| ModelIOError::Create {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut w = BufWriter::new(file);

        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            model: self,
        };

        serde_json::to_writer_pretty(&mut w, &env).map_err(|e| ModelIOError::Serialize {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        w.flush().map_err(|e| ModelIOError::Flush {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Load an interpolator from a versioned JSON envelope, validating the
    /// format and version fields.
    ///
    /// If `progress` is `Some`, the sink is installed on the returned model
    /// so subsequent evaluations can report progress.
    ///
    /// ### Errors
    /// Returns `ModelIOError::{Open, Parse, FormatMismatch, VersionMismatch}`
    /// as appropriate.
    pub fn load_model<P: AsRef<Path>>(
        path: P,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> ModelIOResult<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| ModelIOError::Open {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let env: JsonEnvelopeOwned<Self> =
            serde_json::from_reader(reader).map_err(|e| ModelIOError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if env.format != JSON_FORMAT_NAME {
            return Err(ModelIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }

        if env.version != JSON_VERSION {
            return Err(ModelIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        let mut model = env.model;
        if let Some(sink) = progress {
            model.progress_callback = Some(sink);
        }
        Ok(model)
    }
}

const JSON_FORMAT_NAME: &str = "ferreus_scatter.json";
const JSON_VERSION: u32 = 1;

/// Borrowing envelope for SAVE (no clone of the model).
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    model: &'a T,
}

/// Owning envelope for LOAD (generic over the concrete model).
#[derive(Serialize, Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    #[serde(flatten)]
    model: T,
}

type ModelIOResult<T> = std::result::Result<T, ModelIOError>;

/// Errors that can occur when saving or loading an [`RBFInterpolator`] model.
#[derive(Debug)]
pub enum ModelIOError {
    /// Failed to create the target file before writing a model.
    Create { path: PathBuf, source: io::Error },
    /// Failed to open an existing model file for reading.
    Open { path: PathBuf, source: io::Error },
    /// Failed to flush buffered output when finishing a write.
    Flush { path: PathBuf, source: io::Error },
    /// Error serializing the in-memory model to JSON.
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Error parsing JSON when reading a model from disk.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The JSON `format` field does not match the expected model format.
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },
    /// The JSON `version` field does not match the supported version.
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl fmt::Display for ModelIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelIOError::Create { path, source } => {
                write!(f, "creating {}: {}", path.display(), source)
            }
            ModelIOError::Open { path, source } => {
                write!(f, "opening {}: {}", path.display(), source)
            }
            ModelIOError::Flush { path, source } => {
                write!(f, "flushing {}: {}", path.display(), source)
            }
            ModelIOError::Serialize { path, source } => {
                write!(f, "serializing JSON to {}: {}", path.display(), source)
            }
            ModelIOError::Parse { path, source } => {
                write!(f, "parsing JSON in {}: {}", path.display(), source)
            }
            ModelIOError::FormatMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported format {:?} (expected {:?}) in {}",
                found,
                expected,
                path.display()
            ),
            ModelIOError::VersionMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported version {} (expected {}) in {}",
                found,
                expected,
                path.display()
            ),
        }
    }
}

impl Error for ModelIOError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelIOError::Create { source, .. }
            | ModelIOError::Open { source, .. }
            | ModelIOError::Flush { source, .. } => Some(source),
            ModelIOError::Serialize { source, .. } | ModelIOError::Parse { source, .. } => {
                Some(source)
            }
            ModelIOError::FormatMismatch { .. } | ModelIOError::VersionMismatch { .. } => None,
        }
    }
}
