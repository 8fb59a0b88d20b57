//! This module defines the volume reading API: whole volumes are read into an
//! `ndarray` array with a dynamic number of dimensions, and large volumes can
//! be traversed slice by slice with a [`StreamedVolume`].
//!
//! #### Note on memory order
//!
//! Volumes are stored in column major order (also called Fortran order). The
//! arrays produced here keep that memory order, so traversing them along the
//! first axis is the cheapest access pattern.
//!
//! [`StreamedVolume`]: ./streamed/struct.StreamedVolume.html

pub mod shape;
pub mod streamed;

pub use self::streamed::StreamedVolume;

use byteordered::{ByteOrdered, Endianness};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;
use crate::header::VolumeHeader;
use crate::typedef::ElementType;
use crate::util::open_file;

/// Read a whole volume file into memory, decoding it as a Gzip stream if
/// its name ends in ".gz".
///
/// # Example
///
/// ```no_run
/// let (header, data) = voxcorr::volume::read_volume("sub-01.gvol.gz")?;
/// assert_eq!(data.shape().len(), header.dim.rank());
/// # Ok::<(), voxcorr::VoxcorrError>(())
/// ```
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<(VolumeHeader, ArrayD<f32>)> {
    read_volume_from(open_file(path)?)
}

/// Read a whole volume, header included, from a byte stream.
pub fn read_volume_from<R: Read>(mut source: R) -> Result<(VolumeHeader, ArrayD<f32>)> {
    let header = VolumeHeader::from_reader(&mut source)?;
    let values = read_values(
        &mut source,
        header.endianness,
        header.datatype,
        header.dim.element_count(),
    )?;
    let data = ArrayD::from_shape_vec(IxDyn(&header.dim.shape()).f(), values)?;
    Ok((header, data))
}

/// Largest number of elements reserved up front when reading values.
const PREALLOC_LIMIT: usize = 1 << 20;

/// Read `count` elements from the source, converting them to single
/// precision.
pub(crate) fn read_values<R: Read>(
    source: R,
    endianness: Endianness,
    datatype: ElementType,
    count: usize,
) -> Result<Vec<f32>> {
    let mut source = ByteOrdered::runtime(source, endianness);
    // header counts are untrusted, reserve at most the limit
    let mut values = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    match datatype {
        ElementType::Float32 => {
            for _ in 0..count {
                values.push(source.read_f32()?);
            }
        }
        ElementType::Float64 => {
            for _ in 0..count {
                values.push(source.read_f64()? as f32);
            }
        }
    }
    Ok(values)
}

/// Write single precision elements in the given byte order.
pub(crate) fn write_values<W, I>(sink: W, endianness: Endianness, values: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = f32>,
{
    let mut sink = ByteOrdered::runtime(sink, endianness);
    for v in values {
        sink.write_f32(v)?;
    }
    Ok(())
}
