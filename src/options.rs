//! Analysis configuration.
//!
//! [`AnalysisOptions`] holds every tunable parameter of the voxelwise
//! analyses. The defaults reproduce the settings the lab's maps have always
//! been produced with.
//!
//! [`AnalysisOptions`]: ./struct.AnalysisOptions.html

/// Default significance threshold. Looser than the conventional 0.05 on
/// purpose: maps are exploratory and are thresholded again downstream.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// Smallest number of jointly valid samples for which a correlation is
/// defined. A two-sided test needs at least one degree of freedom.
pub const DEFAULT_MIN_VALID_SAMPLES: usize = 3;

/// Default number of voxels handed to a worker at a time.
pub const DEFAULT_CHUNK_LEN: usize = 4096;

/// Options for the voxelwise correlation analyses.
///
/// ```
/// use voxcorr::AnalysisOptions;
///
/// let options = AnalysisOptions::new()
///     .with_alpha(0.05)
///     .with_min_valid_samples(5);
/// assert_eq!(options.alpha(), 0.05);
/// assert_eq!(options.min_valid_samples(), 5);
/// assert_eq!(options.chunk_len(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    alpha: f64,
    min_valid_samples: usize,
    chunk_len: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            alpha: DEFAULT_ALPHA,
            min_valid_samples: DEFAULT_MIN_VALID_SAMPLES,
            chunk_len: DEFAULT_CHUNK_LEN,
        }
    }
}

impl AnalysisOptions {
    /// Options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the significance threshold: voxels with `p < alpha` are kept in
    /// the masked map.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the minimum number of jointly valid samples per voxel. Values
    /// below [`DEFAULT_MIN_VALID_SAMPLES`] are raised to it.
    ///
    /// [`DEFAULT_MIN_VALID_SAMPLES`]: ./constant.DEFAULT_MIN_VALID_SAMPLES.html
    pub fn with_min_valid_samples(mut self, min_valid_samples: usize) -> Self {
        self.min_valid_samples = min_valid_samples.max(DEFAULT_MIN_VALID_SAMPLES);
        self
    }

    /// Set how many voxels a worker processes at a time. Zero is treated as
    /// one.
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }

    /// The significance threshold.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The minimum number of jointly valid samples per voxel.
    pub fn min_valid_samples(&self) -> usize {
        self.min_valid_samples
    }

    /// The number of voxels processed by a worker at a time.
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }
}
