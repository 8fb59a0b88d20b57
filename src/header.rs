//! This module defines the `VolumeHeader` struct, which describes the
//! contents of a volume file: element type, shape, byte order and the
//! optional channel labels.
//!
//! # File layout
//!
//! | field        | type          | notes                                 |
//! |--------------|---------------|---------------------------------------|
//! | magic        | `[u8; 4]`     | `b"GVOL"`                             |
//! | byte order   | `u8`          | `b'<'` little endian, `b'>'` big      |
//! | version      | `u16`         | currently 1                           |
//! | datatype     | `i16`         | 16 (f32) or 64 (f64)                  |
//! | dim          | `[u16; 8]`    | rank followed by the axis extents     |
//! | vox_offset   | `u64`         | byte offset of the first element      |
//! | label count  | `u16`         |                                       |
//! | labels       | `u16` + bytes | length-prefixed UTF-8, one per label  |
//!
//! All multi-byte fields after the byte order marker use that byte order.
//! Elements follow at `vox_offset` in column major order.

use byteordered::{ByteOrdered, Endianness};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Result, VoxcorrError};
use crate::typedef::ElementType;
use crate::util::open_file;
use crate::volume::shape::Dim;

/// Magic code of every volume file.
pub const MAGIC_CODE: &[u8; 4] = b"GVOL";
/// The format version written by this crate.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed part of the header, in bytes.
const FIXED_LEN: u64 = 4 + 1 + 2 + 2 + 16 + 8 + 2;

/// Header of a volume file.
///
/// # Example
///
/// ```
/// use voxcorr::VolumeHeader;
/// use voxcorr::volume::shape::Dim;
///
/// let header = VolumeHeader::new(Dim::from_slice(&[4, 4, 2, 4])?)
///     .with_labels(vec!["corr", "pval", "masked_corr", "sig_mask"]);
/// assert_eq!(header.labels.len(), 4);
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHeader {
    /// Volume shape
    pub dim: Dim,
    /// Element data type
    pub datatype: ElementType,
    /// Sub-volume (channel) labels, possibly empty
    pub labels: Vec<String>,
    /// Byte order of the header fields and elements
    pub endianness: Endianness,
}

impl VolumeHeader {
    /// Create a header for a single precision volume in native byte order.
    pub fn new(dim: Dim) -> Self {
        VolumeHeader {
            dim,
            datatype: ElementType::Float32,
            labels: Vec::new(),
            endianness: Endianness::native(),
        }
    }

    /// Replace the channel labels.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Retrieve a volume header from the given file.
    /// The file is decoded as a Gzip stream if its name ends in ".gz".
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<VolumeHeader> {
        VolumeHeader::from_reader(open_file(path)?)
    }

    /// Read a volume header from the given byte stream. The stream is left
    /// positioned at the first element of the volume.
    pub fn from_reader<S>(mut input: S) -> Result<VolumeHeader>
    where
        S: Read,
    {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic)?;
        if &magic != MAGIC_CODE {
            return Err(VoxcorrError::InvalidFormat);
        }
        let mut order = [0u8; 1];
        input.read_exact(&mut order)?;
        let endianness = match &order {
            b"<" => Endianness::Little,
            b">" => Endianness::Big,
            _ => return Err(VoxcorrError::InvalidFormat),
        };

        let mut input = ByteOrdered::runtime(input, endianness);
        let version = input.read_u16()?;
        if version != FORMAT_VERSION {
            return Err(VoxcorrError::UnsupportedVersion(version));
        }
        let datatype = ElementType::from_code(input.read_i16()?)?;
        let mut raw_dim = [0u16; 8];
        for d in &mut raw_dim {
            *d = input.read_u16()?;
        }
        let dim = Dim::new(raw_dim)?;
        let vox_offset = input.read_u64()?;
        let nlabels = input.read_u16()?;
        let mut labels = Vec::with_capacity(usize::from(nlabels));
        let mut consumed = FIXED_LEN;
        for _ in 0..nlabels {
            let len = input.read_u16()?;
            let mut bytes = vec![0u8; usize::from(len)];
            input.read_exact(&mut bytes)?;
            labels.push(String::from_utf8(bytes).map_err(|_| VoxcorrError::InvalidLabel)?);
            consumed += 2 + u64::from(len);
        }

        // skip any padding up to the first element
        if vox_offset < consumed {
            return Err(VoxcorrError::InvalidFormat);
        }
        let mut input = input.into_inner();
        let skipped = io::copy(&mut (&mut input).take(vox_offset - consumed), &mut io::sink())?;
        if skipped != vox_offset - consumed {
            return Err(VoxcorrError::InvalidFormat);
        }

        Ok(VolumeHeader {
            dim,
            datatype,
            labels,
            endianness,
        })
    }

    /// The byte offset of the first element, which is also the encoded
    /// length of this header.
    pub fn vox_offset(&self) -> u64 {
        FIXED_LEN
            + self
                .labels
                .iter()
                .map(|l| 2 + l.len() as u64)
                .sum::<u64>()
    }

    /// Number of bytes taken by the volume elements.
    pub fn data_len(&self) -> u64 {
        (self.dim.element_count() * self.datatype.size_of()) as u64
    }

    /// Write this header to the given byte sink.
    pub fn write_to<W>(&self, mut output: W) -> Result<()>
    where
        W: Write,
    {
        for label in &self.labels {
            if label.len() > usize::from(u16::MAX) {
                return Err(VoxcorrError::InvalidLabel);
            }
        }
        if self.labels.len() > usize::from(u16::MAX) {
            return Err(VoxcorrError::LabelCount(usize::from(u16::MAX), self.labels.len()));
        }

        output.write_all(MAGIC_CODE)?;
        output.write_all(match self.endianness {
            Endianness::Little => b"<",
            Endianness::Big => b">",
        })?;
        let mut output = ByteOrdered::runtime(output, self.endianness);
        output.write_u16(FORMAT_VERSION)?;
        output.write_i16(self.datatype.code())?;
        for d in self.dim.raw() {
            output.write_u16(*d)?;
        }
        output.write_u64(self.vox_offset())?;
        output.write_u16(self.labels.len() as u16)?;
        for label in &self.labels {
            output.write_u16(label.len() as u16)?;
            output.write_all(label.as_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{VolumeHeader, MAGIC_CODE};
    use crate::typedef::ElementType;
    use crate::volume::shape::Dim;
    use byteordered::Endianness;

    #[test]
    fn header_roundtrip_both_orders() {
        for &endianness in &[Endianness::Little, Endianness::Big] {
            let header = VolumeHeader {
                endianness,
                datatype: ElementType::Float64,
                ..VolumeHeader::new(Dim::from_slice(&[2, 3, 4, 5]).unwrap())
            }
            .with_labels(vec!["typ"]);
            let mut bytes = Vec::new();
            header.write_to(&mut bytes).unwrap();
            assert_eq!(bytes.len() as u64, header.vox_offset());
            assert_eq!(&bytes[..4], MAGIC_CODE);

            let read = VolumeHeader::from_reader(&bytes[..]).unwrap();
            assert_eq!(read, header);
        }
    }

    #[test]
    fn bad_magic() {
        let bytes = b"NOPE<\x01\x00";
        assert!(VolumeHeader::from_reader(&bytes[..]).is_err());
    }

    #[test]
    fn bad_version() {
        let header = VolumeHeader::new(Dim::from_slice(&[2]).unwrap());
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        // version follows the magic code and byte order marker
        bytes[5] = 9;
        bytes[6] = 9;
        assert!(VolumeHeader::from_reader(&bytes[..]).is_err());
    }
}
