//! Shape and index constructs for voxel volumes.
//!
//! Volume files keep a `dim` field of 8 integers where the first element is
//! the number of dimensions (at most 7) and the following ones are the
//! extents of each axis. [`Dim`] validates and wraps that field.
//!
//! Multi-subject analyses use two more specific shapes: [`VolumeGrid`], the
//! spatial `(X, Y, Z)` extent shared by every map of a dataset, and
//! [`GroupShape`], the `(X, Y, Z, T, S)` extent of a group volume.
//!
//! All linear indices in this crate follow column major order (first axis
//! fastest), which is also the order in which voxels are persisted.
//!
//! [`Dim`]: ./struct.Dim.html
//! [`VolumeGrid`]: ./struct.VolumeGrid.html
//! [`GroupShape`]: ./struct.GroupShape.html
use crate::error::{Result, VoxcorrError};
use ndarray::{s, Array4, ArrayViewD, Axis, Ix4, ShapeBuilder};
use std::convert::TryFrom;
use std::fmt;

/// A validated volume shape of rank 1 to 7.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct Dim(
    /// dimensions starting at 1, dim[0] is the rank
    [u16; 8],
);

impl Dim {
    /// Validate and create a new volume shape from the raw `dim` field.
    ///
    /// # Example
    ///
    /// ```
    /// # use voxcorr::volume::shape::Dim;
    /// let dim = Dim::new([3, 64, 32, 16, 0, 0, 0, 0])?;
    /// assert_eq!(dim.as_ref(), &[64, 32, 16]);
    /// # Ok::<(), voxcorr::VoxcorrError>(())
    /// ```
    pub fn new(dim: [u16; 8]) -> Result<Self> {
        validate_dim(&dim)?;
        Ok(Dim(dim))
    }

    /// Create a new volume shape from the concrete extents of each axis.
    ///
    /// # Example
    ///
    /// ```
    /// # use voxcorr::volume::shape::Dim;
    /// let dim = Dim::from_slice(&[2, 2, 2, 6, 5])?;
    /// assert_eq!(dim.rank(), 5);
    /// assert_eq!(dim.element_count(), 240);
    /// # Ok::<(), voxcorr::VoxcorrError>(())
    /// ```
    pub fn from_slice(dim: &[usize]) -> Result<Self> {
        if dim.is_empty() || dim.len() > 7 {
            return Err(VoxcorrError::InconsistentDim(0, dim.len()));
        }
        let mut raw = [0; 8];
        raw[0] = dim.len() as u16;
        for (i, d) in dim.iter().enumerate() {
            if *d > usize::from(u16::MAX) {
                return Err(VoxcorrError::InconsistentDim(i + 1, *d));
            }
            raw[i + 1] = *d as u16;
        }
        Dim::new(raw)
    }

    /// Retrieve a reference to the raw dim field
    pub fn raw(&self) -> &[u16; 8] {
        &self.0
    }

    /// Retrieve the rank of this shape (dimensionality)
    pub fn rank(&self) -> usize {
        usize::from(self.0[0])
    }

    /// The extents of each axis as `usize`, ready to build an array shape.
    pub fn shape(&self) -> Vec<usize> {
        self.as_ref().iter().cloned().map(usize::from).collect()
    }

    /// Calculate the number of elements in this shape
    pub fn element_count(&self) -> usize {
        self.as_ref().iter().cloned().map(usize::from).product()
    }
}

impl AsRef<[u16]> for Dim {
    fn as_ref(&self) -> &[u16] {
        &self.0[1..=self.rank()]
    }
}

/// Size in bytes of the widest supported element type.
const MAX_ELEMENT_SIZE: usize = 8;

fn validate_dim(raw: &[u16; 8]) -> Result<()> {
    let rank = raw[0];
    if rank == 0 || rank > 7 {
        return Err(VoxcorrError::InconsistentDim(0, usize::from(rank)));
    }
    for (i, d) in raw[1..=usize::from(rank)].iter().enumerate() {
        if *d == 0 {
            return Err(VoxcorrError::InconsistentDim(i + 1, 0));
        }
    }
    // the byte length of the widest element type must stay addressable
    raw[1..=usize::from(rank)]
        .iter()
        .try_fold(MAX_ELEMENT_SIZE, |len: usize, d| len.checked_mul(usize::from(*d)))
        .and_then(|len| u64::try_from(len).ok())
        .ok_or(VoxcorrError::InvalidFormat)?;
    Ok(())
}

/// The spatial extent `(X, Y, Z)` of every map in a dataset.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct VolumeGrid {
    nx: usize,
    ny: usize,
    nz: usize,
}

impl VolumeGrid {
    /// Create a grid with the given extents.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        VolumeGrid { nx, ny, nz }
    }

    /// The extents as a tuple, ready to build an `Array3` shape.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Number of voxels in the grid.
    pub fn voxel_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Linear (column major) index of a voxel.
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.nx * (y + self.ny * z)
    }

    /// Voxel coordinates of a linear (column major) index.
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.nx;
        let rest = index / self.nx;
        (x, rest % self.ny, rest / self.ny)
    }
}

impl fmt::Display for VolumeGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// The extent `(X, Y, Z, T, S)` of a group volume: a spatial grid, a number
/// of timepoints and a number of subjects.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct GroupShape {
    /// spatial extent
    pub grid: VolumeGrid,
    /// number of timepoints (1 for static maps)
    pub timepoints: usize,
    /// number of subjects
    pub subjects: usize,
}

impl GroupShape {
    /// Build a group shape from the `(X, Y, Z, T)` shape of one subject
    /// and the number of subjects.
    pub fn from_slice_shape(slice: [usize; 4], subjects: usize) -> Self {
        GroupShape {
            grid: VolumeGrid::new(slice[0], slice[1], slice[2]),
            timepoints: slice[3],
            subjects,
        }
    }

    /// Interpret a rank 5 `Dim` as a group shape.
    pub fn from_dim(dim: &Dim) -> Result<Self> {
        let shape = dim.shape();
        if shape.len() != 5 {
            return Err(VoxcorrError::IncorrectVolumeDimensionality(5, shape.len()));
        }
        Ok(GroupShape::from_slice_shape(
            [shape[0], shape[1], shape[2], shape[3]],
            shape[4],
        ))
    }

    /// The rank 5 `Dim` of this group shape.
    pub fn dim(&self) -> Result<Dim> {
        let (nx, ny, nz) = self.grid.shape();
        Dim::from_slice(&[nx, ny, nz, self.timepoints, self.subjects])
    }

    /// The `(X, Y, Z, T)` shape of a single subject slice.
    pub fn slice_shape(&self) -> [usize; 4] {
        let (nx, ny, nz) = self.grid.shape();
        [nx, ny, nz, self.timepoints]
    }

    /// Number of elements in a single subject slice.
    pub fn slice_len(&self) -> usize {
        self.grid.voxel_count() * self.timepoints
    }

    /// Number of elements in the whole group volume.
    pub fn element_count(&self) -> usize {
        self.slice_len() * self.subjects
    }
}

/// Convert the given coordinates into a column major linear index.
pub fn coords_to_index(coords: &[usize], dim: &[usize]) -> Result<usize> {
    if coords.len() != dim.len() || coords.is_empty() {
        return Err(VoxcorrError::IncorrectVolumeDimensionality(
            dim.len(),
            coords.len(),
        ));
    }

    if !coords.iter().zip(dim).all(|(i, d)| i < d) {
        return Err(VoxcorrError::OutOfBounds(Vec::from(coords)));
    }

    let index = coords
        .iter()
        .zip(dim)
        .rev()
        .fold(0, |acc, (c, d)| acc * d + c);
    Ok(index)
}

/// Obtain the `(X, Y, Z, T)` shape of a subject volume. Three-dimensional
/// volumes are treated as having a single timepoint.
pub fn subject_shape(volume: &ArrayViewD<f32>) -> Result<[usize; 4]> {
    match *volume.shape() {
        [x, y, z] => Ok([x, y, z, 1]),
        [x, y, z, t] => Ok([x, y, z, t]),
        ref other => Err(VoxcorrError::IncorrectVolumeDimensionality(4, other.len())),
    }
}

/// Conform a subject volume to the target `(X, Y, Z, T)` shape.
///
/// The overlapping region (the per-axis minimum extent) is copied and the
/// remainder is filled with NaN. Values are never resampled. The output is in
/// column major memory order.
pub fn conform(volume: ArrayViewD<f32>, target: [usize; 4]) -> Result<Array4<f32>> {
    let shape = subject_shape(&volume)?;
    let volume = if volume.ndim() == 3 {
        volume.insert_axis(Axis(3))
    } else {
        volume
    };
    let volume = volume.into_dimensionality::<Ix4>()?;

    let mut out = Array4::from_elem(target.f(), std::f32::NAN);
    let [a, b, c, d] = [
        shape[0].min(target[0]),
        shape[1].min(target[1]),
        shape[2].min(target[2]),
        shape[3].min(target[3]),
    ];
    out.slice_mut(s![..a, ..b, ..c, ..d])
        .assign(&volume.slice(s![..a, ..b, ..c, ..d]));
    Ok(out)
}
