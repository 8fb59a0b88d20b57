//! Voxelwise Pearson correlation.
//!
//! Every analysis in this crate reduces to the same numeric core: a Pearson
//! correlation over pairs of samples where any pair holding a NaN is
//! excluded, followed by a two-sided significance test with `n - 2` degrees
//! of freedom. The core reports its result as a [`VoxelOutcome`], so that
//! callers can tell an undefined correlation apart from a computed one and
//! know why it is undefined.
//!
//! [`VoxelOutcome`]: ./enum.VoxelOutcome.html

use ndarray::{s, ArrayView4};
use statrs::function::beta::beta_reg;

use crate::error::{Result, VoxcorrError};
use crate::options::{AnalysisOptions, DEFAULT_MIN_VALID_SAMPLES};
use crate::scan::{scan_voxels, CorrelationMaps};
use crate::volume::shape::VolumeGrid;

/// The result of correlating the samples of one voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoxelOutcome {
    /// A correlation coefficient `r`, its two-sided p-value `p` and the
    /// number of jointly valid samples `n` it was computed from.
    #[allow(missing_docs)]
    Correlated { r: f64, p: f64, n: usize },
    /// Fewer jointly valid samples than required.
    #[allow(missing_docs)]
    InsufficientSamples { valid: usize },
    /// At least one of the series is constant over the valid samples.
    ZeroVariance,
    /// The covariate is constant over the valid samples, so nothing can be
    /// regressed out of the series.
    DegenerateCovariate,
    /// The computation produced a non-finite value.
    NumericalFailure,
}

impl Default for VoxelOutcome {
    fn default() -> Self {
        VoxelOutcome::InsufficientSamples { valid: 0 }
    }
}

impl VoxelOutcome {
    /// The `(r, p)` pair, `(NaN, NaN)` unless a correlation was computed.
    pub fn pair(&self) -> (f64, f64) {
        match *self {
            VoxelOutcome::Correlated { r, p, .. } => (r, p),
            _ => (std::f64::NAN, std::f64::NAN),
        }
    }

    /// Whether a correlation was computed.
    pub fn is_correlated(&self) -> bool {
        matches!(self, VoxelOutcome::Correlated { .. })
    }

    /// The number of jointly valid samples, when known.
    pub fn valid_samples(&self) -> Option<usize> {
        match *self {
            VoxelOutcome::Correlated { n, .. } => Some(n),
            VoxelOutcome::InsufficientSamples { valid } => Some(valid),
            _ => None,
        }
    }
}

/// Two-sided p-value of a Pearson correlation `r` computed from `n` samples,
/// under the null hypothesis of no correlation.
///
/// NaN if `n < 3` or `r` is NaN.
pub fn p_value(r: f64, n: usize) -> f64 {
    if n < 3 || r.is_nan() {
        return std::f64::NAN;
    }
    let r2 = r * r;
    if r2 >= 1. {
        return 0.;
    }
    let df = (n - 2) as f64;
    // P(|T| > t) = I_{df / (df + t^2)}(df / 2, 1 / 2), and df / (df + t^2) = 1 - r^2
    beta_reg(df / 2., 0.5, 1. - r2)
}

/// Pearson correlation over an iterator of sample pairs.
///
/// Pairs where either value is NaN are excluded. `min_valid` is raised to 3
/// when lower, since the test needs at least one degree of freedom.
pub fn pearson_pairs<I>(pairs: I, min_valid: usize) -> VoxelOutcome
where
    I: IntoIterator<Item = (f64, f64)>,
    I::IntoIter: Clone,
{
    let min_valid = min_valid.max(DEFAULT_MIN_VALID_SAMPLES);
    let pairs = pairs
        .into_iter()
        .filter(|(a, b)| !a.is_nan() && !b.is_nan());

    let mut n = 0usize;
    let (mut sum_a, mut sum_b) = (0., 0.);
    let (mut min_a, mut max_a) = (std::f64::INFINITY, std::f64::NEG_INFINITY);
    let (mut min_b, mut max_b) = (std::f64::INFINITY, std::f64::NEG_INFINITY);
    for (a, b) in pairs.clone() {
        n += 1;
        sum_a += a;
        sum_b += b;
        min_a = min_a.min(a);
        max_a = max_a.max(a);
        min_b = min_b.min(b);
        max_b = max_b.max(b);
    }
    if n < min_valid {
        return VoxelOutcome::InsufficientSamples { valid: n };
    }
    if min_a == max_a || min_b == max_b {
        return VoxelOutcome::ZeroVariance;
    }

    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;
    let (mut sab, mut saa, mut sbb) = (0., 0., 0.);
    for (a, b) in pairs {
        let (ca, cb) = (a - mean_a, b - mean_b);
        sab += ca * cb;
        saa += ca * ca;
        sbb += cb * cb;
    }
    let denom = saa.sqrt() * sbb.sqrt();
    if denom == 0. {
        return VoxelOutcome::ZeroVariance;
    }
    let r = sab / denom;
    if !r.is_finite() {
        return VoxelOutcome::NumericalFailure;
    }
    let r = r.max(-1.).min(1.);
    let p = p_value(r, n);
    if p.is_nan() {
        return VoxelOutcome::NumericalFailure;
    }
    VoxelOutcome::Correlated { r, p, n }
}

/// Pearson correlation over an iterator of sample pairs, each series centered
/// on its own NaN-aware mean.
///
/// Unlike [`pearson_pairs`], a value whose partner is NaN still contributes to
/// the mean and the sum of squares of its own series. Only the cross-product
/// is restricted to the pairs where both values are defined, and `n` counts
/// those pairs.
///
/// [`pearson_pairs`]: ./fn.pearson_pairs.html
pub fn pearson_own_means<I>(pairs: I, min_valid: usize) -> VoxelOutcome
where
    I: IntoIterator<Item = (f64, f64)>,
    I::IntoIter: Clone,
{
    let min_valid = min_valid.max(DEFAULT_MIN_VALID_SAMPLES);
    let pairs = pairs.into_iter();

    let mut n = 0usize;
    let (mut count_a, mut count_b) = (0usize, 0usize);
    let (mut sum_a, mut sum_b) = (0., 0.);
    for (a, b) in pairs.clone() {
        if !a.is_nan() {
            count_a += 1;
            sum_a += a;
        }
        if !b.is_nan() {
            count_b += 1;
            sum_b += b;
        }
        if !a.is_nan() && !b.is_nan() {
            n += 1;
        }
    }
    if n < min_valid {
        return VoxelOutcome::InsufficientSamples { valid: n };
    }

    let mean_a = sum_a / count_a as f64;
    let mean_b = sum_b / count_b as f64;
    let (mut sab, mut saa, mut sbb) = (0., 0., 0.);
    for (a, b) in pairs {
        let (ca, cb) = (a - mean_a, b - mean_b);
        if !a.is_nan() {
            saa += ca * ca;
        }
        if !b.is_nan() {
            sbb += cb * cb;
        }
        if !a.is_nan() && !b.is_nan() {
            sab += ca * cb;
        }
    }
    let denom = saa.sqrt() * sbb.sqrt();
    if denom == 0. {
        return VoxelOutcome::ZeroVariance;
    }
    let r = sab / denom;
    if !r.is_finite() {
        return VoxelOutcome::NumericalFailure;
    }
    let r = r.max(-1.).min(1.);
    let p = p_value(r, n);
    if p.is_nan() {
        return VoxelOutcome::NumericalFailure;
    }
    VoxelOutcome::Correlated { r, p, n }
}

/// Pearson correlation of two equally long series.
///
/// Series of different lengths cannot be paired and yield
/// `VoxelOutcome::NumericalFailure`.
pub fn pearson(a: &[f64], b: &[f64], min_valid: usize) -> VoxelOutcome {
    if a.len() != b.len() {
        return VoxelOutcome::NumericalFailure;
    }
    pearson_pairs(a.iter().cloned().zip(b.iter().cloned()), min_valid)
}

/// Correlation coefficient and two-sided p-value of two series, with the
/// default minimum of valid samples. `(NaN, NaN)` whenever the correlation is
/// undefined.
///
/// # Example
///
/// ```
/// let (r, p) = voxcorr::correlate(&[1., 2., 3., 4.], &[2., 4., 6., 8.]);
/// assert!((r - 1.).abs() < 1e-12);
/// assert!(p < 1e-12);
///
/// let (r, p) = voxcorr::correlate(&[1., std::f64::NAN, 3.], &[1., 2., 3.]);
/// assert!(r.is_nan() && p.is_nan());
/// ```
pub fn correlate(a: &[f64], b: &[f64]) -> (f64, f64) {
    pearson(a, b, DEFAULT_MIN_VALID_SAMPLES).pair()
}

/// Correlate two `(X, Y, Z, T)` arrays voxel by voxel along time.
///
/// Each time series is centered on its own NaN-aware mean, so timepoints
/// padded with NaN in one array still shape the other array's statistics.
///
/// # Errors
///
/// - `VoxcorrError::IncompatibleShapes` if the arrays differ in shape.
pub fn temporal_map(
    x: ArrayView4<f32>,
    y: ArrayView4<f32>,
    options: &AnalysisOptions,
) -> Result<CorrelationMaps> {
    if x.shape() != y.shape() {
        return Err(VoxcorrError::IncompatibleShapes(
            x.shape().to_vec(),
            y.shape().to_vec(),
        ));
    }
    let (nx, ny, nz, _) = x.dim();
    let min_valid = options.min_valid_samples();
    scan_voxels(VolumeGrid::new(nx, ny, nz), options.chunk_len(), |i, j, k| {
        let a = x.slice(s![i, j, k, ..]);
        let b = y.slice(s![i, j, k, ..]);
        pearson_own_means(
            a.iter().zip(b.iter()).map(|(a, b)| (f64::from(*a), f64::from(*b))),
            min_valid,
        )
    })
}

/// Correlate the per-subject values of each voxel of an `(X, Y, Z, S)` array
/// with a reference vector holding one value per subject.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if `reference` does not have `S`
///   values. No voxel is processed in that case.
pub fn cross_subject_map(
    data: ArrayView4<f32>,
    reference: &[f64],
    options: &AnalysisOptions,
) -> Result<CorrelationMaps> {
    let (nx, ny, nz, subjects) = data.dim();
    if reference.len() != subjects {
        return Err(VoxcorrError::LengthMismatch(
            "reference",
            subjects,
            reference.len(),
        ));
    }
    let min_valid = options.min_valid_samples();
    scan_voxels(VolumeGrid::new(nx, ny, nz), options.chunk_len(), |i, j, k| {
        let values = data.slice(s![i, j, k, ..]);
        pearson_pairs(
            values
                .iter()
                .zip(reference.iter())
                .map(|(v, r)| (f64::from(*v), *r)),
            min_valid,
        )
    })
}
