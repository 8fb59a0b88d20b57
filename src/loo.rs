//! Leave-one-out group averages.
//!
//! The leave-one-out mean of subject `s` is, per element, the NaN-aware mean
//! of the same element over every subject but `s`. Rather than averaging
//! `S - 1` slices for each of the `S` subjects, [`LeaveOneOut`] accumulates
//! the sum and valid count of every element over all subjects in a single
//! streaming pass, and derives each subject's mean by taking that subject's
//! own contribution back out.
//!
//! [`LeaveOneOut`]: ./struct.LeaveOneOut.html

use log::debug;
use ndarray::{Array4, Array5, ArrayView4, ArrayView5, Axis, Ix4, ShapeBuilder, Zip};
use std::path::Path;

use crate::error::{Result, VoxcorrError};
use crate::store::{GroupVolume, GroupVolumeWriter};

/// Per-element sum and valid sample count over all subjects of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveOneOut {
    sum: Array4<f64>,
    count: Array4<u32>,
    subjects: usize,
}

impl LeaveOneOut {
    /// Accumulate the subject slices of a group volume, reading one slice at
    /// a time.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::InsufficientSubjects` if the group has fewer than two
    ///   subjects.
    pub fn new(group: &GroupVolume) -> Result<Self> {
        let subjects = group.subjects();
        let mut loo = LeaveOneOut::empty(group.shape().slice_shape(), subjects)?;
        for slice in group.stream()? {
            let slice = slice?.into_dimensionality::<Ix4>()?;
            loo.accumulate(slice.view());
        }
        debug!("Accumulated {} subjects of {}", subjects, group.path().display());
        Ok(loo)
    }

    /// Accumulate the subject slices of an in-memory `(X, Y, Z, T, S)` array.
    pub fn from_array(data: ArrayView5<f32>) -> Result<Self> {
        let (x, y, z, t, subjects) = data.dim();
        let mut loo = LeaveOneOut::empty([x, y, z, t], subjects)?;
        for slice in data.axis_iter(Axis(4)) {
            loo.accumulate(slice);
        }
        Ok(loo)
    }

    fn empty(shape: [usize; 4], subjects: usize) -> Result<Self> {
        if subjects < 2 {
            return Err(VoxcorrError::InsufficientSubjects(subjects));
        }
        Ok(LeaveOneOut {
            sum: Array4::zeros(shape.f()),
            count: Array4::zeros(shape.f()),
            subjects,
        })
    }

    fn accumulate(&mut self, slice: ArrayView4<f32>) {
        Zip::from(&mut self.sum)
            .and(&mut self.count)
            .and(&slice)
            .for_each(|sum, count, &v| {
                if !v.is_nan() {
                    *sum += f64::from(v);
                    *count += 1;
                }
            });
    }

    /// Number of accumulated subjects.
    pub fn subjects(&self) -> usize {
        self.subjects
    }

    /// The leave-one-out mean of the subject whose own `(X, Y, Z, T)` slice
    /// is `own`. An element is NaN only when every other subject is NaN
    /// there.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::IncompatibleShapes` if `own` does not have the slice
    ///   shape of the group.
    pub fn subject_mean(&self, own: ArrayView4<f32>) -> Result<Array4<f32>> {
        if own.shape() != self.sum.shape() {
            return Err(VoxcorrError::IncompatibleShapes(
                self.sum.shape().to_vec(),
                own.shape().to_vec(),
            ));
        }
        let mut mean = Array4::zeros(self.sum.raw_dim().f());
        Zip::from(&mut mean)
            .and(&self.sum)
            .and(&self.count)
            .and(&own)
            .for_each(|mean, &sum, &count, &v| {
                let (sum, count) = if v.is_nan() {
                    (sum, count)
                } else {
                    (sum - f64::from(v), count.saturating_sub(1))
                };
                *mean = if count == 0 {
                    std::f32::NAN
                } else {
                    (sum / f64::from(count)) as f32
                };
            });
        Ok(mean)
    }
}

/// Write the leave-one-out means of every subject of `group` as a new group
/// volume at `path`.
pub fn average<P: AsRef<Path>>(group: &mut GroupVolume, path: P) -> Result<GroupVolume> {
    let loo = LeaveOneOut::new(group)?;
    let mut writer = GroupVolumeWriter::create(path, group.shape())?;
    for s in 0..group.subjects() {
        let own = group.read_subject(s)?;
        let mean = loo.subject_mean(own.view())?;
        writer.write_subject(s, mean.view())?;
    }
    writer.finish()
}

/// The leave-one-out means of every subject of an in-memory
/// `(X, Y, Z, T, S)` array.
pub fn average_in_memory(data: ArrayView5<f32>) -> Result<Array5<f32>> {
    let loo = LeaveOneOut::from_array(data)?;
    let mut out = Array5::zeros(data.raw_dim().f());
    for (own, mut target) in data.axis_iter(Axis(4)).zip(out.axis_iter_mut(Axis(4))) {
        target.assign(&loo.subject_mean(own)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{average, average_in_memory, LeaveOneOut};
    use crate::error::VoxcorrError;
    use crate::store::GroupVolume;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, Array5, ShapeBuilder};
    use tempfile::tempdir;

    fn constant_subjects() -> Array5<f32> {
        Array::from_shape_fn((2, 2, 2, 2, 4).f(), |(_, _, _, _, s)| (s + 1) as f32)
    }

    #[test]
    fn mean_of_the_others() {
        let data = constant_subjects();
        let loo = average_in_memory(data.view()).unwrap();
        let total = 1. + 2. + 3. + 4.;
        for ((_, _, _, _, s), v) in loo.indexed_iter() {
            let own = (s + 1) as f32;
            assert_abs_diff_eq!(*v, (total - own) / 3., epsilon = 1e-6);
        }
    }

    #[test]
    fn nan_only_when_all_others_are_nan() {
        let mut data = constant_subjects();
        for s in 1..4 {
            data[[0, 0, 0, 0, s]] = std::f32::NAN;
        }
        data[[1, 0, 0, 0, 2]] = std::f32::NAN;
        let loo = average_in_memory(data.view()).unwrap();
        // subject 0 is the only valid one at the first element
        assert!(loo[[0, 0, 0, 0, 0]].is_nan());
        assert_eq!(loo[[0, 0, 0, 0, 1]], 1.);
        assert_eq!(loo[[1, 0, 0, 0, 0]], 3.);
        assert_abs_diff_eq!(loo[[1, 0, 0, 0, 2]], 7. / 3., epsilon = 1e-6);
    }

    #[test]
    fn single_subject_is_rejected() {
        let data = Array5::<f32>::zeros((2, 2, 2, 2, 1));
        match LeaveOneOut::from_array(data.view()) {
            Err(VoxcorrError::InsufficientSubjects(1)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn out_of_core_matches_in_memory() {
        let dir = tempdir().unwrap();
        let data = Array::from_shape_fn((3, 2, 1, 4, 3).f(), |(x, y, _, t, s)| {
            if (x + t + s) % 5 == 0 {
                std::f32::NAN
            } else {
                (x * 7 + y * 3 + t * s) as f32
            }
        });
        let mut group = GroupVolume::create_from(dir.path().join("g.gvol"), data.view()).unwrap();
        let mut averaged = average(&mut group, dir.path().join("loo.gvol")).unwrap();
        let expected = average_in_memory(data.view()).unwrap();
        let got = averaged.to_array().unwrap();
        for (a, b) in got.iter().zip(expected.iter()) {
            assert!(a.is_nan() == b.is_nan());
            if !a.is_nan() {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
            }
        }
    }
}
