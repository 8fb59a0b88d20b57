//! Cross-subject correlation analyses, from per-subject maps to labelled
//! result volumes.
//!
//! Each analysis scans the voxels of an `(X, Y, Z, S)` array, thresholds the
//! resulting correlation map at the configured significance level and stacks
//! the four result maps into one volume, ready to be submitted to a
//! [`MapSink`](../sink/trait.MapSink.html).

use log::info;
use ndarray::{Array3, ArrayView4};

use crate::assemble::{assemble, AnalysisKind, StackedMaps};
use crate::correlation::cross_subject_map;
use crate::error::Result;
use crate::options::AnalysisOptions;
use crate::partial::partial_correlation_map;
use crate::scan::CorrelationMaps;
use crate::sink::MapSink;
use crate::threshold::{threshold, SignificanceMaps};

/// All result maps of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// the analysis the maps come from
    pub kind: AnalysisKind,
    /// correlation map
    pub r: Array3<f32>,
    /// p-value map
    pub p: Array3<f32>,
    /// masked correlation and significance mask
    pub significance: SignificanceMaps,
    /// the four maps stacked into one labelled volume
    pub stacked: StackedMaps,
}

impl AnalysisOutput {
    /// Threshold a correlation map at `alpha` and assemble the result maps.
    pub fn from_maps(kind: AnalysisKind, r: Array3<f32>, p: Array3<f32>, alpha: f64) -> Result<Self> {
        let significance = threshold(r.view(), p.view(), alpha)?;
        let stacked = assemble(
            kind,
            r.view(),
            p.view(),
            significance.masked.view(),
            significance.mask.view(),
        )?;
        Ok(AnalysisOutput {
            kind,
            r,
            p,
            significance,
            stacked,
        })
    }

    /// Number of significant voxels.
    pub fn significant_voxels(&self) -> usize {
        self.significance.mask.iter().filter(|v| **v == 1.).count()
    }

    /// Submit the stacked maps as `<prefix>_<stack suffix>` and the masked
    /// correlation as `<prefix>_<matrix suffix>`.
    ///
    /// See [`analysis_prefix`](../layout/fn.analysis_prefix.html) for the
    /// usual prefix.
    pub fn write<K: MapSink>(&self, prefix: &str, mut sink: K) -> Result<()> {
        sink.submit(
            &format!("{}_{}", prefix, self.kind.stack_suffix()),
            self.stacked.data.view().into_dyn(),
            &self.stacked.labels,
        )?;
        sink.submit(
            &format!("{}_{}", prefix, self.kind.matrix_suffix()),
            self.significance.masked.view().into_dyn(),
            &[self.kind.labels()[2].to_string()],
        )
    }
}

fn log_range(kind: AnalysisKind, maps: &CorrelationMaps) {
    match maps.finite_range() {
        Some((lo, hi)) => info!("{:?} range: {} to {}", kind, lo, hi),
        None => info!("{:?}: no voxel has a defined correlation", kind),
    }
}

/// Correlate each voxel of an `(X, Y, Z, S)` array with a reference vector
/// and threshold the result.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if `reference` does not have `S` values.
pub fn correlation_analysis(
    data: ArrayView4<f32>,
    reference: &[f64],
    options: &AnalysisOptions,
) -> Result<AnalysisOutput> {
    let maps = cross_subject_map(data, reference, options)?;
    log_range(AnalysisKind::Correlation, &maps);
    let (_, r, p) = maps.into_parts();
    AnalysisOutput::from_maps(AnalysisKind::Correlation, r, p, options.alpha())
}

/// Partially correlate each voxel of an `(X, Y, Z, S)` array with a
/// reference vector, controlling for a covariate, and threshold the result.
///
/// # Errors
///
/// - `VoxcorrError::LengthMismatch` if either vector does not have `S`
///   values.
pub fn partial_correlation_analysis(
    data: ArrayView4<f32>,
    reference: &[f64],
    covariate: &[f64],
    options: &AnalysisOptions,
) -> Result<AnalysisOutput> {
    let partial = partial_correlation_map(data, reference, covariate, options)?;
    log_range(AnalysisKind::PartialCorrelation, &partial.maps);
    info!("Degrees of freedom: {}", partial.dof);
    let (_, r, p) = partial.maps.into_parts();
    AnalysisOutput::from_maps(AnalysisKind::PartialCorrelation, r, p, options.alpha())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use ndarray::{Array4, ShapeBuilder};
    use pretty_assertions::assert_eq;

    fn data() -> Array4<f32> {
        // voxel x = 0 follows the subject index, x = 1 is constant
        Array4::from_shape_fn((2, 1, 1, 6).f(), |(x, _, _, s)| {
            if x == 0 {
                s as f32 * 1.5 + 0.25 * (s % 2) as f32
            } else {
                3.
            }
        })
    }

    #[test]
    fn correlation_end_to_end() {
        let reference = [1., 2., 3., 4., 5., 6.];
        let output = correlation_analysis(data().view(), &reference, &AnalysisOptions::new()).unwrap();
        assert!(output.r[[0, 0, 0]] > 0.9);
        assert!(output.r[[1, 0, 0]].is_nan());
        assert_eq!(output.significant_voxels(), 1);
        assert_eq!(output.stacked.data.shape(), &[2, 1, 1, 4]);

        let mut sink = MemorySink::new();
        output.write("Movie1.rating", &mut sink).unwrap();
        assert_eq!(
            sink.names(),
            vec!["Movie1.rating_typicality", "Movie1.rating_corr"]
        );
        assert_eq!(
            sink.get("Movie1.rating_corr").unwrap().labels,
            vec!["masked_corr".to_string()]
        );
    }

    #[test]
    fn partial_end_to_end() {
        let reference = [1., 2., 3., 4., 5., 6.];
        let covariate = [0.3, 0.1, 0.4, 0.1, 0.5, 0.9];
        let output = partial_correlation_analysis(
            data().view(),
            &reference,
            &covariate,
            &AnalysisOptions::new().with_alpha(0.05),
        )
        .unwrap();
        assert_eq!(output.kind, AnalysisKind::PartialCorrelation);
        assert_eq!(output.stacked.labels[0], "partial_corr");
        assert!(partial_correlation_analysis(
            data().view(),
            &reference,
            &covariate[..5],
            &AnalysisOptions::new()
        )
        .is_err());
    }
}
