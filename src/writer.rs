//! Utility functions to write volume files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteordered::Endianness;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{Result, VoxcorrError};
use crate::header::VolumeHeader;
use crate::util::is_gz_file;
use crate::volume::shape::Dim;
use crate::volume::write_values;

/// Options and flags which can be used to configure how a volume file is
/// written.
///
/// # Example
///
/// ```no_run
/// use ndarray::Array4;
/// use voxcorr::writer::WriterOptions;
///
/// let maps = Array4::<f32>::zeros((64, 64, 32, 4));
/// WriterOptions::new("Movie1.rating_typicality.gvol.gz")
///     .labels(vec!["corr", "pval", "masked_corr", "sig_mask"])
///     .write_volume(&maps)?;
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    path: PathBuf,
    labels: Vec<String>,
    compression: Option<Compression>,
    endianness: Endianness,
}

impl WriterOptions {
    /// Prepare to write a volume to the given path. The output is Gzip
    /// compressed when the file name ends in ".gz".
    pub fn new<P: AsRef<Path>>(path: P) -> WriterOptions {
        let compression = if is_gz_file(&path) {
            Some(Compression::default())
        } else {
            None
        };
        WriterOptions {
            path: path.as_ref().to_path_buf(),
            labels: Vec::new(),
            compression,
            endianness: Endianness::native(),
        }
    }

    /// Set the sub-volume labels. A volume of rank 4 has one sub-volume per
    /// index of its last axis, any other volume has a single sub-volume.
    pub fn labels<I, S>(mut self, labels: I) -> WriterOptions
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the compression level, or disable compression with `None`.
    pub fn compression(mut self, compression: Option<Compression>) -> WriterOptions {
        self.compression = compression;
        self
    }

    /// Set the byte order of the file.
    pub fn endianness(mut self, endianness: Endianness) -> WriterOptions {
        self.endianness = endianness;
        self
    }

    /// Write the array to the volume file.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::LabelCount` if labels were given but their number
    ///   does not match the number of sub-volumes.
    pub fn write_volume<S, D>(&self, data: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let dim = Dim::from_slice(data.shape())?;
        let subvolumes = if data.ndim() == 4 { data.shape()[3] } else { 1 };
        if !self.labels.is_empty() && self.labels.len() != subvolumes {
            return Err(VoxcorrError::LabelCount(subvolumes, self.labels.len()));
        }
        let header = VolumeHeader {
            endianness: self.endianness,
            ..VolumeHeader::new(dim)
        }
        .with_labels(self.labels.iter().cloned());

        let writer = BufWriter::new(File::create(&self.path)?);
        match self.compression {
            Some(level) => {
                let mut e = GzEncoder::new(writer, level);
                write_header_and_data(&mut e, &header, data)?;
                e.finish()?.flush()?;
            }
            None => {
                let mut writer = writer;
                write_header_and_data(&mut writer, &header, data)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

fn write_header_and_data<W, S, D>(
    writer: &mut W,
    header: &VolumeHeader,
    data: &ArrayBase<S, D>,
) -> Result<()>
where
    W: Write,
    S: Data<Elem = f32>,
    D: Dimension,
{
    header.write_to(&mut *writer)?;
    // the transpose iterates with the first axis fastest, as persisted
    write_values(writer, header.endianness, data.t().iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::WriterOptions;
    use crate::volume::read_volume;
    use byteordered::Endianness;
    use ndarray::{Array, Array3, Ix3, IxDyn, ShapeBuilder};
    use tempfile::tempdir;

    fn c_order_array() -> Array3<f32> {
        Array::from_shape_fn((3, 4, 2), |(x, y, z)| (x + 10 * y + 100 * z) as f32)
    }

    #[test]
    fn test_c_and_fortran_writing() {
        let dir = tempdir().unwrap();
        let arr = c_order_array();
        let f_arr = Array::from_shape_vec(
            (3, 4, 2).f(),
            arr.t().iter().cloned().collect(),
        )
        .unwrap();
        assert_eq!(arr, f_arr);

        for (name, data) in &[("c.gvol", &arr), ("f.gvol.gz", &f_arr)] {
            let path = dir.path().join(name);
            WriterOptions::new(&path).write_volume(*data).unwrap();
            let (header, read) = read_volume(&path).unwrap();
            assert_eq!(header.dim.as_ref(), &[3, 4, 2]);
            assert_eq!(read.into_dimensionality::<Ix3>().unwrap(), arr);
        }
    }

    #[test]
    fn test_big_endian_with_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labelled.gvol");
        let data = Array::from_elem(IxDyn(&[2, 2, 2, 2]), 0.5_f32);
        WriterOptions::new(&path)
            .endianness(Endianness::Big)
            .labels(vec!["typ", "pval"])
            .write_volume(&data)
            .unwrap();
        let (header, read) = read_volume(&path).unwrap();
        assert_eq!(header.endianness, Endianness::Big);
        assert_eq!(header.labels, vec!["typ".to_string(), "pval".to_string()]);
        assert_eq!(read, data);
    }

    #[test]
    fn test_label_count_mismatch() {
        let dir = tempdir().unwrap();
        let data = Array::from_elem(IxDyn(&[2, 2, 2, 4]), 0.5_f32);
        let result = WriterOptions::new(dir.path().join("bad.gvol"))
            .labels(vec!["corr"])
            .write_volume(&data);
        assert!(result.is_err());
    }
}
