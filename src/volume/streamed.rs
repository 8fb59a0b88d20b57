//! Streamed interface of a volume file.
//!
//! This API provides slice-by-slice reading of volumes, thus lowering
//! memory requirements and better supporting the manipulation of
//! large volumes.
//!
//! Since volumes are physically persisted in column major order, each slice
//! covers the full range of all axes but the last one, and iteration
//! traverses the last axis. For a group volume of shape `(X, Y, Z, T, S)`,
//! this yields one `(X, Y, Z, T)` subject slice at a time, starting at
//! subject 0.
//!
//! # Example
//!
//! ```no_run
//! # use voxcorr::volume::StreamedVolume;
//! let volume = StreamedVolume::from_file("Matrices/Movie1/Movie1.gvol")?;
//! for slice in volume {
//!     let slice = slice?;
//!     // use slice
//! }
//! # Ok::<(), voxcorr::VoxcorrError>(())
//! ```

use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use std::io::Read;
use std::path::Path;

use super::read_values;
use super::shape::Dim;
use crate::error::{Result, VoxcorrError};
use crate::header::VolumeHeader;
use crate::util::open_file;

/// A volume which is read slice by slice from a byte stream.
///
/// See the [module-level documentation] for more details.
///
/// [module-level documentation]: ./index.html
#[derive(Debug)]
pub struct StreamedVolume<R> {
    source: R,
    header: VolumeHeader,
    slice_shape: Vec<usize>,
    slices_read: usize,
    slices_left: usize,
}

impl StreamedVolume<Box<dyn Read>> {
    /// Open a volume file for streaming. Files ending in ".gz" are decoded
    /// as Gzip streams.
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(open_file(path)?)
    }
}

impl<R> StreamedVolume<R>
where
    R: Read,
{
    /// Read the header from the byte stream and prepare to read the
    /// slices that follow it.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::IncorrectVolumeDimensionality` if the volume has
    ///   a single axis, so it has no slices.
    pub fn from_reader(mut source: R) -> Result<Self> {
        let header = VolumeHeader::from_reader(&mut source)?;
        let rank = header.dim.rank();
        if rank < 2 {
            return Err(VoxcorrError::IncorrectVolumeDimensionality(2, rank));
        }
        let shape = header.dim.shape();
        let slice_shape = shape[..rank - 1].to_vec();
        let slices_left = shape[rank - 1];
        Ok(StreamedVolume {
            source,
            header,
            slice_shape,
            slices_read: 0,
            slices_left,
        })
    }

    /// Retrieve the volume header.
    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    /// Retrieve the full volume shape.
    pub fn dim(&self) -> &Dim {
        &self.header.dim
    }

    /// Retrieve the shape of the slices.
    pub fn slice_shape(&self) -> &[usize] {
        &self.slice_shape
    }

    /// Retrieve the number of slices already read
    pub fn slices_read(&self) -> usize {
        self.slices_read
    }

    /// Retrieve the number of slices left
    pub fn slices_left(&self) -> usize {
        self.slices_left
    }

    /// Read the next slice from the data source into memory.
    pub fn read_slice(&mut self) -> Result<ArrayD<f32>> {
        let count = self.slice_shape.iter().product();
        let values = read_values(
            &mut self.source,
            self.header.endianness,
            self.header.datatype,
            count,
        )?;
        self.slices_read += 1;
        self.slices_left = self.slices_left.saturating_sub(1);
        Ok(ArrayD::from_shape_vec(
            IxDyn(&self.slice_shape).f(),
            values,
        )?)
    }
}

impl<R> Iterator for StreamedVolume<R>
where
    R: Read,
{
    type Item = Result<ArrayD<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.slices_left == 0 {
            return None;
        }
        Some(self.read_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::StreamedVolume;
    use crate::header::VolumeHeader;
    use crate::volume::shape::Dim;
    use crate::volume::write_values;

    fn volume_bytes() -> Vec<u8> {
        let header = VolumeHeader::new(Dim::from_slice(&[2, 3, 2]).unwrap());
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        write_values(&mut bytes, header.endianness, (0..12).map(|v| v as f32)).unwrap();
        bytes
    }

    #[test]
    fn test_streamed_base() {
        let bytes = volume_bytes();
        let mut volume = StreamedVolume::from_reader(&bytes[..]).unwrap();

        assert_eq!(volume.dim().as_ref(), &[2, 3, 2]);
        assert_eq!(volume.slice_shape(), &[2, 3]);
        assert_eq!(volume.slices_read(), 0);
        assert_eq!(volume.slices_left(), 2);

        {
            let slice = volume
                .next()
                .expect("1st slice should exist")
                .expect("should not fail to read the slice");
            assert_eq!(slice.shape(), &[2, 3]);
            assert_eq!(slice[[1, 0]], 1.);
            assert_eq!(slice[[0, 2]], 4.);
        }
        {
            let slice = volume
                .next()
                .expect("2nd slice should exist")
                .expect("should not fail to read the slice");
            assert_eq!(slice[[0, 0]], 6.);
            assert_eq!(slice[[1, 2]], 11.);
        }
        assert!(volume.next().is_none());
        assert_eq!(volume.slices_read(), 2);
    }

    #[test]
    fn test_streamed_truncated() {
        let bytes = volume_bytes();
        let mut volume = StreamedVolume::from_reader(&bytes[..bytes.len() - 4]).unwrap();
        assert!(volume.next().unwrap().is_ok());
        assert!(volume.next().unwrap().is_err());
    }
}
