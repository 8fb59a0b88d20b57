//! Per-subject volume loaders.
//!
//! A [`SubjectSource`] maps a subject identifier to zero or one volume. The
//! distinction between the three possible answers matters to the group
//! volume builder:
//!
//! - `Ok(Some(volume))`: a 3D or 4D volume was loaded;
//! - `Ok(None)`: the subject has no volume (e.g. the file does not exist);
//! - `Err(_)`: a volume exists but could not be read.
//!
//! [`SubjectSource`]: ./trait.SubjectSource.html

use ndarray::ArrayD;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::error::{Result, VoxcorrError};
use crate::volume::read_volume;

/// Placeholder replaced by the subject identifier in path patterns.
pub const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// A loader of per-subject volumes.
pub trait SubjectSource {
    /// Load the volume of the given subject.
    fn load(&self, subject: &str) -> Result<Option<ArrayD<f32>>>;
}

impl<'a, S> SubjectSource for &'a S
where
    S: SubjectSource + ?Sized,
{
    fn load(&self, subject: &str) -> Result<Option<ArrayD<f32>>> {
        (**self).load(subject)
    }
}

/// Subject volumes read from volume files named after a path pattern.
///
/// The pattern must contain `{subject}`, e.g.
/// `/data/SocCog/Movie1/{subject}/results/errts.{subject}.gvol`. When the
/// file does not exist, the same path with a ".gz" suffix is tried before
/// reporting the subject as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSource {
    pattern: String,
}

impl FileSource {
    /// Create a source from a path pattern.
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        FileSource {
            pattern: pattern.into(),
        }
    }

    /// The path pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The uncompressed file path of a subject's volume.
    pub fn path_for(&self, subject: &str) -> PathBuf {
        PathBuf::from(self.pattern.replace(SUBJECT_PLACEHOLDER, subject))
    }
}

impl SubjectSource for FileSource {
    fn load(&self, subject: &str) -> Result<Option<ArrayD<f32>>> {
        let path = self.path_for(subject);
        let mut gz_path = path.clone().into_os_string();
        gz_path.push(".gz");
        let gz_path = PathBuf::from(gz_path);

        for candidate in &[path, gz_path] {
            match read_volume(candidate) {
                Ok((_, data)) => return Ok(Some(data)),
                Err(VoxcorrError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

/// Subject volumes held in memory, keyed by subject identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySource {
    volumes: HashMap<String, ArrayD<f32>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the volume of a subject, replacing any previous one.
    pub fn insert<S: Into<String>>(&mut self, subject: S, volume: ArrayD<f32>) {
        let _ = self.volumes.insert(subject.into(), volume);
    }

    /// Builder-style variant of [`insert`](#method.insert).
    pub fn with<S: Into<String>>(mut self, subject: S, volume: ArrayD<f32>) -> Self {
        self.insert(subject, volume);
        self
    }
}

impl SubjectSource for MemorySource {
    fn load(&self, subject: &str) -> Result<Option<ArrayD<f32>>> {
        Ok(self.volumes.get(subject).cloned())
    }
}

/// Adapter turning a closure into a subject source.
///
/// ```
/// use ndarray::ArrayD;
/// use voxcorr::source::{FnSource, SubjectSource};
///
/// let source = FnSource(|subject: &str| {
///     Ok(if subject == "BD119" { None } else { Some(ArrayD::zeros(vec![2, 2, 2])) })
/// });
/// assert!(source.load("BD119")?.is_none());
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnSource<F>(pub F);

impl<F> SubjectSource for FnSource<F>
where
    F: Fn(&str) -> Result<Option<ArrayD<f32>>>,
{
    fn load(&self, subject: &str) -> Result<Option<ArrayD<f32>>> {
        (self.0)(subject)
    }
}
