//! Subject typicality.
//!
//! The typicality of a subject at a voxel is the temporal correlation of the
//! subject's time series with the leave-one-out mean time series of all
//! other subjects. Highly typical subjects respond to the stimulus the way
//! the rest of the group does.

use log::{debug, info};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, ArrayView5, Axis, ShapeBuilder};
use std::time::Instant;

use crate::analysis::AnalysisOutput;
use crate::assemble::AnalysisKind;
use crate::correlation::temporal_map;
use crate::error::{Result, VoxcorrError};
use crate::loo::LeaveOneOut;
use crate::options::AnalysisOptions;
use crate::sink::MapSink;
use crate::store::GroupVolume;
use crate::util::nan_mean;

/// Typicality and p-value maps of every subject, as `(X, Y, Z, S)` arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct TypicalityMaps {
    /// typicality (correlation) maps
    pub r: Array4<f32>,
    /// p-value maps
    pub p: Array4<f32>,
}

impl TypicalityMaps {
    fn with_shape(shape: (usize, usize, usize, usize)) -> Self {
        TypicalityMaps {
            r: Array4::from_elem(shape.f(), std::f32::NAN),
            p: Array4::from_elem(shape.f(), std::f32::NAN),
        }
    }

    /// Number of subjects.
    pub fn subjects(&self) -> usize {
        self.r.len_of(Axis(3))
    }

    /// The typicality map of subject `s`.
    pub fn subject(&self, s: usize) -> Result<ArrayView3<f32>> {
        if s >= self.subjects() {
            return Err(VoxcorrError::OutOfBounds(vec![s]));
        }
        Ok(self.r.index_axis(Axis(3), s))
    }

    /// The group typicality map: the mean over subjects, ignoring NaN.
    pub fn group_average(&self) -> Array3<f32> {
        self.r
            .map_axis(Axis(3), |lane| nan_mean(lane.iter().cloned()))
    }

    /// Threshold the typicality map of subject `s` and assemble its result
    /// maps.
    pub fn analysis(&self, s: usize, options: &AnalysisOptions) -> Result<AnalysisOutput> {
        let r = self.subject(s)?.to_owned();
        let p = self.p.index_axis(Axis(3), s).to_owned();
        AnalysisOutput::from_maps(AnalysisKind::Typicality, r, p, options.alpha())
    }

    fn fill(
        &mut self,
        s: usize,
        own: ArrayView4<f32>,
        loo: &LeaveOneOut,
        options: &AnalysisOptions,
    ) -> Result<()> {
        let start = Instant::now();
        let mean = loo.subject_mean(own)?;
        let maps = temporal_map(own, mean.view(), options)?;
        self.r.index_axis_mut(Axis(3), s).assign(maps.r());
        self.p.index_axis_mut(Axis(3), s).assign(maps.p());
        debug!("Typicality of subject {} computed in {:?}", s, start.elapsed());
        Ok(())
    }
}

/// Typicality of every subject of a group volume. Subjects are processed one
/// at a time, so memory use is bounded by a few subject slices.
///
/// # Errors
///
/// - `VoxcorrError::InsufficientSubjects` if the group has fewer than two
///   subjects.
pub fn typicality(group: &mut GroupVolume, options: &AnalysisOptions) -> Result<TypicalityMaps> {
    let start = Instant::now();
    let loo = LeaveOneOut::new(group)?;
    let (nx, ny, nz) = group.grid().shape();
    let mut maps = TypicalityMaps::with_shape((nx, ny, nz, group.subjects()));
    for s in 0..group.subjects() {
        let own = group.read_subject(s)?;
        maps.fill(s, own.view(), &loo, options)?;
    }
    info!(
        "Typicality of {} subjects computed in {:?}",
        group.subjects(),
        start.elapsed()
    );
    Ok(maps)
}

/// Typicality of every subject of an in-memory `(X, Y, Z, T, S)` array.
pub fn typicality_in_memory(data: ArrayView5<f32>, options: &AnalysisOptions) -> Result<TypicalityMaps> {
    let loo = LeaveOneOut::from_array(data)?;
    let (nx, ny, nz, _, subjects) = data.dim();
    let mut maps = TypicalityMaps::with_shape((nx, ny, nz, subjects));
    for (s, own) in data.axis_iter(Axis(4)).enumerate() {
        maps.fill(s, own, &loo, options)?;
    }
    Ok(maps)
}

/// Submit the typicality maps of a movie: all subjects as `<movie>_typs`,
/// the group average as `<movie>_typ_avg` and each subject as
/// `<movie>_typ_<subject>`.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if there is not one subject identifier
///   per subject.
pub fn write_typicality<I, K>(maps: &TypicalityMaps, subjects: &[I], movie: &str, mut sink: K) -> Result<()>
where
    I: AsRef<str>,
    K: MapSink,
{
    if subjects.len() != maps.subjects() {
        return Err(VoxcorrError::LengthMismatch(
            "subject",
            maps.subjects(),
            subjects.len(),
        ));
    }
    let label = [AnalysisKind::Typicality.labels()[0].to_string()];
    let subject_labels: Vec<String> = subjects.iter().map(|s| s.as_ref().to_string()).collect();
    sink.submit(
        &format!("{}_{}", movie, AnalysisKind::Typicality.matrix_suffix()),
        maps.r.view().into_dyn(),
        &subject_labels,
    )?;
    sink.submit(
        &format!("{}_typ_avg", movie),
        maps.group_average().view().into_dyn(),
        &label,
    )?;
    for (s, subject) in subjects.iter().enumerate() {
        sink.submit(
            &format!("{}_typ_{}", movie, subject.as_ref()),
            maps.subject(s)?.into_dyn(),
            &label,
        )?;
    }
    Ok(())
}
