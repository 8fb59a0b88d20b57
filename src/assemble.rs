//! Stacking of result maps into labelled multi-channel volumes.

use ndarray::{stack, Array4, ArrayView3, Axis};

use crate::error::{Result, VoxcorrError};

/// The analysis a set of result maps comes from. It determines the channel
/// labels and the output names of the maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    /// Cross-subject correlation with a reference vector
    Correlation,
    /// Cross-subject correlation controlling for a covariate
    PartialCorrelation,
    /// Correlation of subjects with their leave-one-out group average
    Typicality,
}

impl AnalysisKind {
    /// Labels of the correlation, p-value, masked correlation and mask
    /// channels, in that order.
    pub fn labels(self) -> [&'static str; 4] {
        match self {
            AnalysisKind::Correlation => ["corr", "pval", "masked_corr", "sig_mask"],
            AnalysisKind::PartialCorrelation => {
                ["partial_corr", "pval", "masked_partial_corr", "sig_mask"]
            }
            AnalysisKind::Typicality => ["typ", "pval", "masked_typ", "sig_mask"],
        }
    }

    /// Suffix of the stacked output volume.
    pub fn stack_suffix(self) -> &'static str {
        match self {
            AnalysisKind::Correlation => "typicality",
            AnalysisKind::PartialCorrelation => "partial_corr",
            AnalysisKind::Typicality => "typ",
        }
    }

    /// Suffix of the masked correlation matrix.
    pub fn matrix_suffix(self) -> &'static str {
        match self {
            AnalysisKind::Correlation => "corr",
            AnalysisKind::PartialCorrelation => "partial_corr",
            AnalysisKind::Typicality => "typs",
        }
    }
}

/// A four-channel `(X, Y, Z, 4)` volume and its channel labels.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedMaps {
    /// channels along the last axis
    pub data: Array4<f32>,
    /// one label per channel
    pub labels: Vec<String>,
}

/// Stack correlation, p-value, masked correlation and mask maps along a
/// trailing channel axis. Values are copied unchanged.
///
/// # Errors
///
/// - `VoxcorrError::IncompatibleShapes` if the maps differ in shape.
pub fn assemble<'a>(
    kind: AnalysisKind,
    r: ArrayView3<'a, f32>,
    p: ArrayView3<'a, f32>,
    masked: ArrayView3<'a, f32>,
    mask: ArrayView3<'a, f32>,
) -> Result<StackedMaps> {
    for other in &[p, masked, mask] {
        if other.shape() != r.shape() {
            return Err(VoxcorrError::IncompatibleShapes(
                r.shape().to_vec(),
                other.shape().to_vec(),
            ));
        }
    }
    let data = stack(Axis(3), &[r, p, masked, mask])?;
    Ok(StackedMaps {
        data,
        labels: kind.labels().iter().map(|l| l.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{assemble, AnalysisKind};
    use ndarray::{s, Array3};
    use pretty_assertions::assert_eq;

    #[test]
    fn channels_in_order() {
        let r = Array3::from_elem((2, 3, 1), 0.5_f32);
        let p = Array3::from_elem((2, 3, 1), 0.01_f32);
        let masked = r.clone();
        let mask = Array3::from_elem((2, 3, 1), 1_f32);
        let stacked = assemble(
            AnalysisKind::PartialCorrelation,
            r.view(),
            p.view(),
            masked.view(),
            mask.view(),
        )
        .unwrap();
        assert_eq!(stacked.data.shape(), &[2, 3, 1, 4]);
        assert_eq!(stacked.data.slice(s![.., .., .., 1]), p);
        assert_eq!(stacked.data.slice(s![.., .., .., 3]), mask);
        assert_eq!(
            stacked.labels,
            vec!["partial_corr", "pval", "masked_partial_corr", "sig_mask"]
        );
    }

    #[test]
    fn mismatched_maps() {
        let a = Array3::<f32>::zeros((2, 2, 2));
        let b = Array3::<f32>::zeros((2, 2, 3));
        assert!(assemble(AnalysisKind::Correlation, a.view(), a.view(), b.view(), a.view()).is_err());
    }

    #[test]
    fn naming() {
        assert_eq!(AnalysisKind::Correlation.stack_suffix(), "typicality");
        assert_eq!(AnalysisKind::Correlation.matrix_suffix(), "corr");
        assert_eq!(AnalysisKind::Typicality.labels()[0], "typ");
    }
}
