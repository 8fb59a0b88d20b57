//! Partial correlation against a single covariate.
//!
//! Both the voxel series and the reference series are regressed on the
//! covariate by ordinary least squares, and the residuals are correlated with
//! the Pearson core. Samples are used only where the voxel, reference and
//! covariate values are all defined.

use ndarray::{s, ArrayView4};

use crate::correlation::{pearson_pairs, VoxelOutcome};
use crate::error::{Result, VoxcorrError};
use crate::options::{AnalysisOptions, DEFAULT_MIN_VALID_SAMPLES};
use crate::scan::{scan_voxels, CorrelationMaps};
use crate::volume::shape::VolumeGrid;

/// Residuals of the simple linear regression of `y` on `x`.
///
/// `None` if `x` is constant, in which case no slope can be fitted.
pub fn residualize(y: &[f64], x: &[f64]) -> Option<Vec<f64>> {
    debug_assert_eq!(y.len(), x.len());
    let first = *x.first()?;
    if x.iter().all(|v| *v == first) {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0., 0.);
    for (xi, yi) in x.iter().zip(y) {
        let cx = xi - mean_x;
        sxy += cx * (yi - mean_y);
        sxx += cx * cx;
    }
    if sxx == 0. {
        return None;
    }
    let slope = sxy / sxx;
    Some(
        x.iter()
            .zip(y)
            .map(|(xi, yi)| (yi - mean_y) - slope * (xi - mean_x))
            .collect(),
    )
}

/// Partial correlation over `(voxel, reference, covariate)` triples.
///
/// Triples holding a NaN are excluded. `min_valid` is raised to 3 when
/// lower.
pub fn partial_pearson<I>(triples: I, min_valid: usize) -> VoxelOutcome
where
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let min_valid = min_valid.max(DEFAULT_MIN_VALID_SAMPLES);
    let mut voxel = Vec::new();
    let mut reference = Vec::new();
    let mut covariate = Vec::new();
    for (v, r, c) in triples {
        if !v.is_nan() && !r.is_nan() && !c.is_nan() {
            voxel.push(v);
            reference.push(r);
            covariate.push(c);
        }
    }
    if voxel.len() < min_valid {
        return VoxelOutcome::InsufficientSamples { valid: voxel.len() };
    }
    let (voxel, reference) = match (
        residualize(&voxel, &covariate),
        residualize(&reference, &covariate),
    ) {
        (Some(v), Some(r)) => (v, r),
        _ => return VoxelOutcome::DegenerateCovariate,
    };
    pearson_pairs(voxel.into_iter().zip(reference), min_valid)
}

fn check_lengths(subjects: usize, reference: &[f64], covariate: &[f64]) -> Result<()> {
    if reference.len() != subjects {
        return Err(VoxcorrError::LengthMismatch(
            "reference",
            subjects,
            reference.len(),
        ));
    }
    if covariate.len() != subjects {
        return Err(VoxcorrError::LengthMismatch(
            "covariate",
            subjects,
            covariate.len(),
        ));
    }
    Ok(())
}

/// Partial correlation coefficient and two-sided p-value of a voxel's
/// per-subject values with a reference vector, controlling for a covariate.
/// `(NaN, NaN)` whenever the correlation is undefined.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if the three series differ in length.
pub fn partial_correlate(voxel: &[f64], reference: &[f64], covariate: &[f64]) -> Result<(f64, f64)> {
    check_lengths(voxel.len(), reference, covariate)?;
    let triples = voxel
        .iter()
        .zip(reference)
        .zip(covariate)
        .map(|((v, r), c)| (*v, *r, *c));
    Ok(partial_pearson(triples, DEFAULT_MIN_VALID_SAMPLES).pair())
}

/// Partial correlation maps along with their degrees of freedom.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialCorrelationMaps {
    /// per-voxel outcomes, correlation and p-value maps
    pub maps: CorrelationMaps,
    /// degrees of freedom of the test when every subject is valid, `S - 2`
    pub dof: usize,
}

/// Partial correlation of the per-subject values of each voxel of an
/// `(X, Y, Z, S)` array with a reference vector, controlling for a
/// covariate vector.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if either vector does not have `S`
///   values. No voxel is processed in that case.
pub fn partial_correlation_map(
    data: ArrayView4<f32>,
    reference: &[f64],
    covariate: &[f64],
    options: &AnalysisOptions,
) -> Result<PartialCorrelationMaps> {
    let (nx, ny, nz, subjects) = data.dim();
    check_lengths(subjects, reference, covariate)?;
    let min_valid = options.min_valid_samples();
    let maps = scan_voxels(VolumeGrid::new(nx, ny, nz), options.chunk_len(), |i, j, k| {
        let values = data.slice(s![i, j, k, ..]);
        partial_pearson(
            values
                .iter()
                .zip(reference)
                .zip(covariate)
                .map(|((v, r), c)| (f64::from(*v), *r, *c)),
            min_valid,
        )
    })?;
    Ok(PartialCorrelationMaps {
        maps,
        dof: subjects.saturating_sub(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::correlate;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array4, ShapeBuilder};
    use std::f64::NAN;

    #[test]
    fn residuals_are_orthogonal_to_covariate() {
        let x = [1., 2., 4., 7., 8.];
        let y = [3., 1., 4., 1., 5.];
        let res = residualize(&y, &x).unwrap();
        assert_abs_diff_eq!(res.iter().sum::<f64>(), 0., epsilon = 1e-12);
        let dot: f64 = res.iter().zip(&x).map(|(r, x)| r * x).sum();
        assert_abs_diff_eq!(dot, 0., epsilon = 1e-12);
        assert!(residualize(&y, &[2., 2., 2., 2., 2.]).is_none());
    }

    #[test]
    fn matches_first_order_partial_formula() {
        let v = [2.1, 3.9, 6.2, 7.8, 10.1, 12.5, 13.1];
        let r = [1., 2., 3., 4., 5., 6., 8.];
        let c = [0.5, 0.1, 0.9, 0.3, 0.8, 0.2, 0.4];
        let (rvr, _) = correlate(&v, &r);
        let (rvc, _) = correlate(&v, &c);
        let (rrc, _) = correlate(&r, &c);
        let expected = (rvr - rvc * rrc) / ((1. - rvc * rvc).sqrt() * (1. - rrc * rrc).sqrt());
        let (got, p) = partial_correlate(&v, &r, &c).unwrap();
        assert_abs_diff_eq!(got, expected, epsilon = 1e-9);
        assert!(p >= 0. && p <= 1.);
    }

    #[test]
    fn constant_covariate() {
        let outcome = partial_pearson(
            vec![(1., 2., 5.), (2., 1., 5.), (3., 4., 5.), (4., 3., 5.)],
            3,
        );
        assert_eq!(outcome, VoxelOutcome::DegenerateCovariate);
        let (r, p) = partial_correlate(&[1., 2., 3., 4.], &[2., 1., 4., 3.], &[5., 5., 5., 5.]).unwrap();
        assert!(r.is_nan() && p.is_nan());
    }

    #[test]
    fn nan_in_any_series_excludes_the_sample() {
        let outcome = partial_pearson(
            vec![(1., 2., 5.), (NAN, 1., 4.), (3., NAN, 3.), (4., 3., NAN)],
            3,
        );
        assert_eq!(outcome, VoxelOutcome::InsufficientSamples { valid: 1 });
    }

    #[test]
    fn length_checks_happen_first() {
        assert!(partial_correlate(&[1., 2., 3.], &[1., 2.], &[1., 2., 3.]).is_err());
        let data = Array4::<f32>::zeros((1, 1, 1, 4).f());
        match partial_correlation_map(data.view(), &[1.; 4], &[1.; 3], &AnalysisOptions::new()) {
            Err(VoxcorrError::LengthMismatch("covariate", 4, 3)) => {}
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn map_reports_degrees_of_freedom() {
        let data = Array4::from_shape_fn((2, 1, 1, 6).f(), |(x, _, _, s)| {
            (s * s + x) as f32
        });
        let reference = [1., 2., 3., 4., 5., 6.];
        let covariate = [0.3, 0.1, 0.4, 0.1, 0.5, 0.9];
        let partial = partial_correlation_map(
            data.view(),
            &reference,
            &covariate,
            &AnalysisOptions::new(),
        )
        .unwrap();
        assert_eq!(partial.dof, 4);
        assert!(partial.maps.outcomes().iter().all(|o| o.is_correlated()));
        let r = partial.maps.r()[[0, 0, 0]];
        assert!(r > 0.9 && r <= 1.);
    }
}
