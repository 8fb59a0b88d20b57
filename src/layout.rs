//! Naming conventions of a dataset on disk.
//!
//! ```text
//! <root>/
//!   Matrices/<movie>/<movie>.gvol          group volume
//!   Matrices/<movie>/<prefix>_corr.gvol    masked correlation matrices
//!   Maps/<movie>/<prefix>_typicality.gvol  stacked result maps
//! ```
//!
//! Subject volumes live under a separate source root, one directory per
//! subject.

use std::path::{Path, PathBuf};

use crate::source::{FileSource, SUBJECT_PLACEHOLDER};

/// Directory of matrices under the dataset root.
pub const MATRICES_DIR: &str = "Matrices";
/// Directory of result maps under the dataset root.
pub const MAPS_DIR: &str = "Maps";

/// The prefix of every output of an analysis of `movie` against the
/// reference vector named `reference`.
///
/// ```
/// assert_eq!(voxcorr::layout::analysis_prefix("Movie3", "empathy"), "Movie3.empathy");
/// ```
pub fn analysis_prefix(movie: &str, reference: &str) -> String {
    format!("{}.{}", movie, reference)
}

/// Locations of the inputs and outputs of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLayout {
    root: PathBuf,
    source_root: PathBuf,
}

impl DatasetLayout {
    /// A layout rooted at `root`, which also holds the subject volumes.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DatasetLayout {
            root: root.as_ref().to_path_buf(),
            source_root: root.as_ref().to_path_buf(),
        }
    }

    /// Read subject volumes from a different root.
    pub fn with_source_root<P: AsRef<Path>>(mut self, source_root: P) -> Self {
        self.source_root = source_root.as_ref().to_path_buf();
        self
    }

    /// The dataset root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The root of the subject volumes.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Directory of the matrices of a movie.
    pub fn matrices_dir(&self, movie: &str) -> PathBuf {
        self.root.join(MATRICES_DIR).join(movie)
    }

    /// Directory of the result maps of a movie.
    pub fn maps_dir(&self, movie: &str) -> PathBuf {
        self.root.join(MAPS_DIR).join(movie)
    }

    /// The group volume of a movie.
    pub fn group_volume_path(&self, movie: &str) -> PathBuf {
        self.matrices_dir(movie).join(format!("{}.gvol", movie))
    }

    /// The leave-one-out averages of a movie.
    pub fn leave_one_out_path(&self, movie: &str) -> PathBuf {
        self.matrices_dir(movie).join(format!("{}_loo.gvol", movie))
    }

    /// The path pattern of the subject volumes of a movie, as
    /// `<source root>/<movie>/{subject}/results/errts.{subject}.<movie>.gvol`.
    pub fn subject_pattern(&self, movie: &str) -> String {
        self.source_root
            .join(movie)
            .join(SUBJECT_PLACEHOLDER)
            .join("results")
            .join(format!(
                "errts.{}.{}.gvol",
                SUBJECT_PLACEHOLDER, movie
            ))
            .to_string_lossy()
            .into_owned()
    }

    /// A subject source following [`subject_pattern`](#method.subject_pattern).
    pub fn subject_source(&self, movie: &str) -> FileSource {
        FileSource::new(self.subject_pattern(movie))
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetLayout;
    use std::path::Path;

    #[test]
    fn paths() {
        let layout = DatasetLayout::new("/study").with_source_root("/raw/SocCog");
        assert_eq!(
            layout.group_volume_path("Movie2"),
            Path::new("/study/Matrices/Movie2/Movie2.gvol")
        );
        assert_eq!(layout.maps_dir("Movie2"), Path::new("/study/Maps/Movie2"));
        let source = layout.subject_source("Movie2");
        assert_eq!(
            source.path_for("BD119"),
            Path::new("/raw/SocCog/Movie2/BD119/results/errts.BD119.Movie2.gvol")
        );
    }
}
