//! Out-of-core multi-subject storage.
//!
//! A [`GroupVolume`] is a five-dimensional `(X, Y, Z, T, S)` single precision
//! array persisted in an uncompressed volume file. Subjects are the slowest
//! axis, so each subject slice occupies one contiguous byte range and can be
//! read or written independently of the others.
//!
//! Group volumes are produced with a [`GroupVolumeWriter`], which owns the
//! file during construction, and are read-only once [finished]. The
//! [`VolumeStore`] builds one from a [`SubjectSource`], keeping at most one
//! subject volume in memory at a time.
//!
//! [`GroupVolume`]: ./struct.GroupVolume.html
//! [`GroupVolumeWriter`]: ./struct.GroupVolumeWriter.html
//! [finished]: ./struct.GroupVolumeWriter.html#method.finish
//! [`VolumeStore`]: ./struct.VolumeStore.html
//! [`SubjectSource`]: ../source/trait.SubjectSource.html

use log::{debug, info, warn};
use ndarray::{Array4, Array5, ArrayView4, ArrayView5, Axis, ShapeBuilder};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::iter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{Result, VoxcorrError};
use crate::header::VolumeHeader;
use crate::source::SubjectSource;
use crate::util::is_gz_file;
use crate::volume::shape::{conform, coords_to_index, subject_shape, GroupShape, VolumeGrid};
use crate::volume::{read_values, write_values, StreamedVolume};

/// A read-only, file-backed `(X, Y, Z, T, S)` array.
#[derive(Debug)]
pub struct GroupVolume {
    path: PathBuf,
    header: VolumeHeader,
    shape: GroupShape,
    file: File,
}

impl GroupVolume {
    /// Open a persisted group volume.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::CompressedStore` if the path ends in ".gz";
    /// - `VoxcorrError::IncorrectVolumeDimensionality` if the volume is not
    ///   five-dimensional.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_gz_file(path) {
            return Err(VoxcorrError::CompressedStore(path.to_path_buf()));
        }
        let mut file = File::open(path)?;
        let header = VolumeHeader::from_reader(BufReader::new(&mut file))?;
        let shape = GroupShape::from_dim(&header.dim)?;
        let expected_len = header.vox_offset() + header.data_len();
        if file.metadata()?.len() < expected_len {
            return Err(VoxcorrError::InvalidFormat);
        }
        Ok(GroupVolume {
            path: path.to_path_buf(),
            header,
            shape,
            file,
        })
    }

    /// Persist an in-memory `(X, Y, Z, T, S)` array as a group volume.
    pub fn create_from<P: AsRef<Path>>(path: P, data: ArrayView5<f32>) -> Result<Self> {
        let (x, y, z, t, s) = data.dim();
        let shape = GroupShape::from_slice_shape([x, y, z, t], s);
        let mut writer = GroupVolumeWriter::create(path, shape)?;
        for (s, slice) in data.axis_iter(Axis(4)).enumerate() {
            writer.write_subject(s, slice)?;
        }
        writer.finish()
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The volume header.
    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    /// The `(X, Y, Z, T, S)` extent.
    pub fn shape(&self) -> GroupShape {
        self.shape
    }

    /// The spatial extent.
    pub fn grid(&self) -> VolumeGrid {
        self.shape.grid
    }

    /// Number of timepoints.
    pub fn timepoints(&self) -> usize {
        self.shape.timepoints
    }

    /// Number of subjects.
    pub fn subjects(&self) -> usize {
        self.shape.subjects
    }

    fn read_range(&mut self, first_element: usize, count: usize) -> Result<Vec<f32>> {
        let size = self.header.datatype.size_of() as u64;
        let offset = self.header.vox_offset() + first_element as u64 * size;
        let _ = self.file.seek(SeekFrom::Start(offset))?;
        read_values(
            BufReader::new(&mut self.file),
            self.header.endianness,
            self.header.datatype,
            count,
        )
    }

    /// Read the `(X, Y, Z, T)` slice of subject `s` into memory.
    pub fn read_subject(&mut self, s: usize) -> Result<Array4<f32>> {
        if s >= self.shape.subjects {
            return Err(VoxcorrError::OutOfBounds(vec![s]));
        }
        let len = self.shape.slice_len();
        let values = self.read_range(s * len, len)?;
        Ok(Array4::from_shape_vec(self.shape.slice_shape().f(), values)?)
    }

    /// Read a single element.
    pub fn read_voxel(&mut self, x: usize, y: usize, z: usize, t: usize, s: usize) -> Result<f32> {
        let dim = self.header.dim.shape();
        let index = coords_to_index(&[x, y, z, t, s], &dim)?;
        let values = self.read_range(index, 1)?;
        Ok(values[0])
    }

    /// Gather the spatial maps of every subject at timepoint `t` into an
    /// `(X, Y, Z, S)` array.
    pub fn subject_values(&mut self, t: usize) -> Result<Array4<f32>> {
        if t >= self.shape.timepoints {
            return Err(VoxcorrError::OutOfBounds(vec![t]));
        }
        let voxels = self.shape.grid.voxel_count();
        let (nx, ny, nz) = self.shape.grid.shape();
        let subjects = self.shape.subjects;
        let mut values = Vec::with_capacity(voxels * subjects);
        for s in 0..subjects {
            let first = (s * self.shape.timepoints + t) * voxels;
            values.extend(self.read_range(first, voxels)?);
        }
        Ok(Array4::from_shape_vec((nx, ny, nz, subjects).f(), values)?)
    }

    /// Read the whole volume into memory.
    pub fn to_array(&mut self) -> Result<Array5<f32>> {
        let values = self.read_range(0, self.shape.element_count())?;
        let [x, y, z, t] = self.shape.slice_shape();
        Ok(Array5::from_shape_vec(
            (x, y, z, t, self.shape.subjects).f(),
            values,
        )?)
    }

    /// Stream the subject slices in order, each as an `(X, Y, Z, T)` array.
    pub fn stream(&self) -> Result<StreamedVolume<Box<dyn std::io::Read>>> {
        StreamedVolume::from_file(&self.path)
    }
}

/// Exclusive writer of a new group volume.
///
/// The file is allocated on creation. Subject slices may be written in any
/// order; [`finish`](#method.finish) fills every slice that was never
/// written with NaN and reopens the file for reading.
#[derive(Debug)]
pub struct GroupVolumeWriter {
    path: PathBuf,
    header: VolumeHeader,
    shape: GroupShape,
    file: File,
    written: Vec<bool>,
}

impl GroupVolumeWriter {
    /// Create (or truncate) the file at `path` and allocate room for a group
    /// volume of the given shape.
    pub fn create<P: AsRef<Path>>(path: P, shape: GroupShape) -> Result<Self> {
        let path = path.as_ref();
        if is_gz_file(path) {
            return Err(VoxcorrError::CompressedStore(path.to_path_buf()));
        }
        let header = VolumeHeader::new(shape.dim()?);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        {
            let mut w = BufWriter::new(&mut file);
            header.write_to(&mut w)?;
            w.flush()?;
        }
        file.set_len(header.vox_offset() + header.data_len())?;
        Ok(GroupVolumeWriter {
            path: path.to_path_buf(),
            header,
            shape,
            file,
            written: vec![false; shape.subjects],
        })
    }

    /// The `(X, Y, Z, T, S)` extent.
    pub fn shape(&self) -> GroupShape {
        self.shape
    }

    fn write_slice<I>(&mut self, s: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f32>,
    {
        if s >= self.shape.subjects {
            return Err(VoxcorrError::OutOfBounds(vec![s]));
        }
        let size = self.header.datatype.size_of() as u64;
        let offset = self.header.vox_offset() + (s * self.shape.slice_len()) as u64 * size;
        let _ = self.file.seek(SeekFrom::Start(offset))?;
        let mut w = BufWriter::new(&mut self.file);
        write_values(&mut w, self.header.endianness, values)?;
        w.flush()?;
        self.written[s] = true;
        Ok(())
    }

    /// Write the `(X, Y, Z, T)` slice of subject `s`.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::IncompatibleShapes` if the slice does not have the
    ///   exact slice shape of this volume.
    pub fn write_subject(&mut self, s: usize, data: ArrayView4<f32>) -> Result<()> {
        let expected = self.shape.slice_shape();
        if data.shape() != &expected[..] {
            return Err(VoxcorrError::IncompatibleShapes(
                expected.to_vec(),
                data.shape().to_vec(),
            ));
        }
        self.write_slice(s, data.t().iter().cloned())
    }

    /// Fill the slice of subject `s` with NaN.
    pub fn write_missing(&mut self, s: usize) -> Result<()> {
        let len = self.shape.slice_len();
        self.write_slice(s, iter::repeat(std::f32::NAN).take(len))
    }

    /// Flush all written slices to the storage device.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Complete the volume and reopen it read-only.
    pub fn finish(mut self) -> Result<GroupVolume> {
        for s in 0..self.shape.subjects {
            if !self.written[s] {
                self.write_missing(s)?;
            }
        }
        self.flush()?;
        let GroupVolumeWriter { path, file, .. } = self;
        drop(file);
        GroupVolume::open(path)
    }
}

/// Builder of group volumes from per-subject volumes.
///
/// # Example
///
/// ```no_run
/// use voxcorr::source::FileSource;
/// use voxcorr::store::VolumeStore;
///
/// let subjects = ["BD119", "AM086", "JF054"];
/// let source = FileSource::new("/data/Movie1/{subject}/errts.{subject}.gvol.gz");
/// let group = VolumeStore::new(source).build(&subjects, "Movie1.gvol")?;
/// assert_eq!(group.subjects(), 3);
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
#[derive(Debug, Clone)]
pub struct VolumeStore<S> {
    source: S,
}

impl<S> VolumeStore<S>
where
    S: SubjectSource,
{
    /// Create a builder reading subject volumes from the given source.
    pub fn new(source: S) -> Self {
        VolumeStore { source }
    }

    /// The subject source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the group volume of the given subjects at `path`.
    ///
    /// The first subject with a loadable 3D or 4D volume determines the
    /// `(X, Y, Z, T)` shape of every slice. Other volumes are truncated or
    /// NaN-padded to that shape. Missing or unreadable subjects get an
    /// all-NaN slice.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::NoValidSource` if no subject has a usable volume;
    /// - I/O errors on the group volume file itself.
    pub fn build<I, P>(&self, subjects: &[I], path: P) -> Result<GroupVolume>
    where
        I: AsRef<str>,
        P: AsRef<Path>,
    {
        let start = Instant::now();
        let (first, first_volume, target) = self.probe(subjects)?;
        let shape = GroupShape::from_slice_shape(target, subjects.len());
        let dim = shape.dim()?;
        info!(
            "Building group volume {} of shape {:?} from subject {}",
            path.as_ref().display(),
            dim.as_ref(),
            subjects[first].as_ref()
        );

        let mut writer = GroupVolumeWriter::create(path, shape)?;
        // subjects before the first usable one were already reported
        for s in 0..first {
            writer.write_missing(s)?;
        }
        writer.write_subject(first, first_volume.view())?;
        drop(first_volume);

        for (s, subject) in subjects.iter().enumerate().skip(first + 1) {
            let subject = subject.as_ref();
            let loaded_at = Instant::now();
            match self.load_conformed(subject, target) {
                Some(data) => writer.write_subject(s, data.view())?,
                None => writer.write_missing(s)?,
            }
            debug!("Subject {} processed in {:?}", subject, loaded_at.elapsed());
        }

        let group = writer.finish()?;
        info!("Group volume ready in {:?}", start.elapsed());
        Ok(group)
    }

    fn probe<I: AsRef<str>>(&self, subjects: &[I]) -> Result<(usize, Array4<f32>, [usize; 4])> {
        for (s, subject) in subjects.iter().enumerate() {
            let subject = subject.as_ref();
            match self.source.load(subject) {
                Ok(Some(volume)) => match subject_shape(&volume.view()) {
                    Ok(target) => {
                        let data = conform(volume.view(), target)?;
                        return Ok((s, data, target));
                    }
                    Err(e) => warn!("Skipping volume of subject {}: {}", subject, e),
                },
                Ok(None) => warn!("No volume for subject {}, filling with NaN", subject),
                Err(e) => warn!("Failed to load subject {}: {}, filling with NaN", subject, e),
            }
        }
        Err(VoxcorrError::NoValidSource)
    }

    fn load_conformed(&self, subject: &str, target: [usize; 4]) -> Option<Array4<f32>> {
        let volume = match self.source.load(subject) {
            Ok(Some(volume)) => volume,
            Ok(None) => {
                warn!("No volume for subject {}, filling with NaN", subject);
                return None;
            }
            Err(e) => {
                warn!("Failed to load subject {}: {}, filling with NaN", subject, e);
                return None;
            }
        };
        let shape = match subject_shape(&volume.view()) {
            Ok(shape) => shape,
            Err(e) => {
                warn!("Skipping volume of subject {}: {}", subject, e);
                return None;
            }
        };
        if shape != target {
            warn!(
                "Shape mismatch for subject {}: expected {:?}, got {:?}; truncating and padding",
                subject, target, shape
            );
        }
        match conform(volume.view(), target) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Could not conform subject {}: {}", subject, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GroupVolume, GroupVolumeWriter, VolumeStore};
    use crate::error::VoxcorrError;
    use crate::source::{FnSource, MemorySource};
    use crate::volume::shape::GroupShape;
    use ndarray::{Array, Array4, ArrayD, IxDyn, ShapeBuilder};
    use tempfile::tempdir;

    fn ramp(shape: &[usize], offset: f32) -> ArrayD<f32> {
        let len = shape.iter().product::<usize>();
        ArrayD::from_shape_vec(
            IxDyn(shape).f(),
            (0..len).map(|v| v as f32 + offset).collect(),
        )
        .unwrap()
    }

    #[test]
    fn writer_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("group.gvol");
        let shape = GroupShape::from_slice_shape([2, 3, 1, 2], 3);
        let mut writer = GroupVolumeWriter::create(&path, shape).unwrap();
        let slice = Array4::from_shape_fn((2, 3, 1, 2), |(x, y, _, t)| (x + 2 * y + 6 * t) as f32);
        writer.write_subject(2, slice.view()).unwrap();
        writer.write_subject(0, slice.view()).unwrap();
        assert!(writer.write_subject(3, slice.view()).is_err());
        writer.flush().unwrap();
        let mut group = writer.finish().unwrap();

        assert_eq!(group.shape(), shape);
        assert_eq!(group.read_subject(0).unwrap(), slice);
        assert_eq!(group.read_subject(2).unwrap(), slice);
        assert!(group.read_subject(1).unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(group.read_voxel(1, 2, 0, 1, 2).unwrap(), 11.);
        assert!(group.read_voxel(2, 0, 0, 0, 0).is_err());

        let at_t1 = group.subject_values(1).unwrap();
        assert_eq!(at_t1.shape(), &[2, 3, 1, 3]);
        assert_eq!(at_t1[[1, 1, 0, 0]], 9.);
        assert!(at_t1[[1, 1, 0, 1]].is_nan());

        let streamed: Vec<_> = group.stream().unwrap().collect();
        assert_eq!(streamed.len(), 3);
    }

    #[test]
    fn writer_rejects_wrong_slice_and_compression() {
        let dir = tempdir().unwrap();
        let shape = GroupShape::from_slice_shape([2, 2, 2, 1], 2);
        match GroupVolumeWriter::create(dir.path().join("group.gvol.gz"), shape) {
            Err(VoxcorrError::CompressedStore(_)) => {}
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
        let mut writer = GroupVolumeWriter::create(dir.path().join("group.gvol"), shape).unwrap();
        let wrong = Array4::<f32>::zeros((2, 2, 2, 2));
        assert!(writer.write_subject(0, wrong.view()).is_err());
    }

    #[test]
    fn create_from_array() {
        let dir = tempdir().unwrap();
        let data = Array::from_shape_fn((2, 2, 1, 3, 2).f(), |(x, y, _, t, s)| {
            (x + 2 * y + 4 * t + 12 * s) as f32
        });
        let mut group = GroupVolume::create_from(dir.path().join("g.gvol"), data.view()).unwrap();
        assert_eq!(group.to_array().unwrap(), data);
    }

    #[test]
    fn build_tolerates_missing_and_mismatched() {
        let dir = tempdir().unwrap();
        let source = MemorySource::new()
            .with("b", ramp(&[2, 2, 2, 3], 0.))
            .with("c", ramp(&[3, 2, 1, 4], 100.))
            .with("e", ramp(&[2, 2, 2], 7.));
        let subjects = ["a", "b", "c", "d", "e"];
        let mut group = VolumeStore::new(&source)
            .build(&subjects, dir.path().join("group.gvol"))
            .unwrap();

        assert_eq!(group.shape(), GroupShape::from_slice_shape([2, 2, 2, 3], 5));
        assert!(group.read_subject(0).unwrap().iter().all(|v| v.is_nan()));
        assert!(group.read_subject(3).unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(group.read_voxel(1, 1, 1, 2, 1).unwrap(), 23.);

        // truncated along x and t, padded along z
        let c = group.read_subject(2).unwrap();
        assert_eq!(c[[1, 1, 0, 2]], 100. + 1. + 3. + 12.);
        assert!(c[[0, 0, 1, 0]].is_nan());

        // a 3D volume fills the first timepoint only
        let e = group.read_subject(4).unwrap();
        assert_eq!(e[[1, 0, 0, 0]], 8.);
        assert!(e[[1, 0, 0, 1]].is_nan());
    }

    #[test]
    fn build_skips_failing_sources() {
        let dir = tempdir().unwrap();
        let source = FnSource(|subject: &str| match subject {
            "broken" => Err(VoxcorrError::InvalidFormat),
            _ => Ok(Some(ramp(&[1, 1, 2, 2], 1.))),
        });
        let mut group = VolumeStore::new(source)
            .build(&["broken", "ok"], dir.path().join("group.gvol"))
            .unwrap();
        assert!(group.read_subject(0).unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(group.read_voxel(0, 0, 1, 1, 1).unwrap(), 4.);
    }

    #[test]
    fn build_without_any_source() {
        let dir = tempdir().unwrap();
        let source = MemorySource::new();
        match VolumeStore::new(source).build(&["x", "y"], dir.path().join("group.gvol")) {
            Err(VoxcorrError::NoValidSource) => {}
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
