//! Significance thresholding of correlation maps.

use ndarray::{Array3, ArrayView3, Zip};

use crate::error::{Result, VoxcorrError};

/// A correlation map restricted to its significant voxels, and the
/// corresponding binary mask.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceMaps {
    /// the correlation where significant, NaN elsewhere
    pub masked: Array3<f32>,
    /// 1 where significant, 0 elsewhere
    pub mask: Array3<f32>,
}

/// Keep the correlations whose p-value is strictly below `alpha`.
///
/// Voxels with a NaN p-value are never significant.
///
/// # Errors
///
/// - `VoxcorrError::IncompatibleShapes` if the maps differ in shape.
///
/// # Example
///
/// ```
/// use ndarray::arr3;
/// use voxcorr::threshold::threshold;
///
/// let r = arr3(&[[[0.8_f32, -0.3, 0.5]]]);
/// let p = arr3(&[[[0.01_f32, 0.2, std::f32::NAN]]]);
/// let sig = threshold(r.view(), p.view(), 0.1)?;
/// assert_eq!(sig.mask, arr3(&[[[1., 0., 0.]]]));
/// assert_eq!(sig.masked[[0, 0, 0]], 0.8);
/// assert!(sig.masked[[0, 0, 1]].is_nan());
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
pub fn threshold(r: ArrayView3<f32>, p: ArrayView3<f32>, alpha: f64) -> Result<SignificanceMaps> {
    if r.shape() != p.shape() {
        return Err(VoxcorrError::IncompatibleShapes(
            r.shape().to_vec(),
            p.shape().to_vec(),
        ));
    }
    let significant = |p: f32| f64::from(p) < alpha;
    let masked = Zip::from(&r)
        .and(&p)
        .map_collect(|&r, &p| if significant(p) { r } else { std::f32::NAN });
    let mask = p.map(|&p| if significant(p) { 1. } else { 0. });
    Ok(SignificanceMaps { masked, mask })
}
