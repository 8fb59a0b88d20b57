//! Combination of maps from several stimulus categories.

use ndarray::{Array3, ArrayView3, Zip};

use crate::error::{Result, VoxcorrError};
use crate::sink::MapSink;
use crate::util::nan_mean;

/// Voxelwise mean of two maps, ignoring NaN. A voxel is NaN only when it is
/// NaN in both maps.
///
/// # Errors
///
/// - `VoxcorrError::IncompatibleShapes` if the maps differ in shape.
pub fn combine_mean(a: ArrayView3<f32>, b: ArrayView3<f32>) -> Result<Array3<f32>> {
    if a.shape() != b.shape() {
        return Err(VoxcorrError::IncompatibleShapes(
            a.shape().to_vec(),
            b.shape().to_vec(),
        ));
    }
    Ok(Zip::from(&a)
        .and(&b)
        .map_collect(|&a, &b| nan_mean([a, b].iter().cloned())))
}

/// Combine the masked correlation maps of two categories and submit the
/// result both as the `<name>_masked_corr` matrix and as the
/// `<name>_combined_map` map.
pub fn combine_categories<K: MapSink>(
    a: ArrayView3<f32>,
    b: ArrayView3<f32>,
    name: &str,
    mut sink: K,
) -> Result<Array3<f32>> {
    let combined = combine_mean(a, b)?;
    let label = ["masked_corr".to_string()];
    sink.submit(
        &format!("{}_masked_corr", name),
        combined.view().into_dyn(),
        &label,
    )?;
    sink.submit(
        &format!("{}_combined_map", name),
        combined.view().into_dyn(),
        &label,
    )?;
    Ok(combined)
}
