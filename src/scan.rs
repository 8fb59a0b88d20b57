//! Data-parallel evaluation of a per-voxel kernel.
//!
//! The flat, column major voxel index space of a grid is split in chunks of a
//! fixed length. Each chunk owns a disjoint part of the outcome buffer and is
//! processed by one rayon worker.

use log::debug;
use ndarray::{Array3, ShapeBuilder};
use rayon::prelude::*;
use std::time::Instant;

use crate::correlation::VoxelOutcome;
use crate::error::Result;
use crate::util::finite_range;
use crate::volume::shape::VolumeGrid;

/// Per-voxel outcomes of a correlation analysis along with the correlation
/// and p-value maps derived from them. Undefined voxels are NaN in both maps.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMaps {
    outcomes: Array3<VoxelOutcome>,
    r: Array3<f32>,
    p: Array3<f32>,
}

impl CorrelationMaps {
    /// Derive the correlation and p-value maps from per-voxel outcomes.
    pub fn from_outcomes(outcomes: Array3<VoxelOutcome>) -> Self {
        let r = outcomes.map(|o| o.pair().0 as f32);
        let p = outcomes.map(|o| o.pair().1 as f32);
        CorrelationMaps { outcomes, r, p }
    }

    /// Per-voxel outcomes.
    pub fn outcomes(&self) -> &Array3<VoxelOutcome> {
        &self.outcomes
    }

    /// The correlation map.
    pub fn r(&self) -> &Array3<f32> {
        &self.r
    }

    /// The p-value map.
    pub fn p(&self) -> &Array3<f32> {
        &self.p
    }

    /// Minimum and maximum of the defined correlations.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        finite_range(self.r.iter().cloned())
    }

    /// Decompose into outcomes, correlation map and p-value map.
    pub fn into_parts(self) -> (Array3<VoxelOutcome>, Array3<f32>, Array3<f32>) {
        (self.outcomes, self.r, self.p)
    }
}

/// Evaluate `kernel` at every voxel `(x, y, z)` of the grid.
pub fn scan_voxels<F>(grid: VolumeGrid, chunk_len: usize, kernel: F) -> Result<CorrelationMaps>
where
    F: Fn(usize, usize, usize) -> VoxelOutcome + Sync,
{
    let start = Instant::now();
    let chunk_len = chunk_len.max(1);
    let mut outcomes = vec![VoxelOutcome::default(); grid.voxel_count()];
    outcomes
        .par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(c, chunk)| {
            let base = c * chunk_len;
            for (i, slot) in chunk.iter_mut().enumerate() {
                let (x, y, z) = grid.coords(base + i);
                *slot = kernel(x, y, z);
            }
        });
    debug!("Scanned {} voxels in {:?}", grid, start.elapsed());
    let outcomes = Array3::from_shape_vec(grid.shape().f(), outcomes)?;
    Ok(CorrelationMaps::from_outcomes(outcomes))
}

#[cfg(test)]
mod tests {
    use super::scan_voxels;
    use crate::correlation::VoxelOutcome;
    use approx::assert_abs_diff_eq;
    use crate::volume::shape::VolumeGrid;

    #[test]
    fn every_voxel_in_place() {
        let grid = VolumeGrid::new(5, 3, 2);
        // a chunk length which does not divide the voxel count
        let maps = scan_voxels(grid, 4, |x, y, z| VoxelOutcome::Correlated {
            r: (x + 10 * y + 100 * z) as f64 / 1000.,
            p: 0.5,
            n: 3,
        })
        .unwrap();
        assert_eq!(maps.r().shape(), &[5, 3, 2]);
        for ((x, y, z), r) in maps.r().indexed_iter() {
            assert_abs_diff_eq!(*r, (x + 10 * y + 100 * z) as f32 / 1000., epsilon = 1e-6);
        }
        let (lo, hi) = maps.finite_range().unwrap();
        assert_eq!(lo, 0.);
        assert_abs_diff_eq!(hi, 0.124, epsilon = 1e-6);
    }

    #[test]
    fn undefined_voxels_are_nan() {
        let grid = VolumeGrid::new(2, 2, 1);
        let maps = scan_voxels(grid, 0, |x, _, _| {
            if x == 0 {
                VoxelOutcome::ZeroVariance
            } else {
                VoxelOutcome::Correlated { r: 0.2, p: 0.7, n: 4 }
            }
        })
        .unwrap();
        assert!(maps.r()[[0, 1, 0]].is_nan() && maps.p()[[0, 1, 0]].is_nan());
        assert_eq!(maps.p()[[1, 1, 0]], 0.7);
        assert_eq!(maps.outcomes()[[0, 0, 0]], VoxelOutcome::ZeroVariance);
    }
}
