//! Element data types of volume files.
//!
//! Codes follow the NIfTI-1 `datatype` convention so that volumes coming out
//! of a NIfTI converter keep their type code.

use crate::error::{Result, VoxcorrError};
use num_traits::FromPrimitive;

/// Data type of the elements stored in a volume file.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum ElementType {
    /// 32 bit float.
    // NIFTI_TYPE_FLOAT32        16
    Float32 = 16,
    /// 64 bit float = double.
    // NIFTI_TYPE_FLOAT64        64
    Float64 = 64,
}

impl ElementType {
    /// Resolve a raw data type code.
    ///
    /// # Errors
    ///
    /// - `VoxcorrError::UnsupportedDataType` for any code other than 16 and 64.
    pub fn from_code(code: i16) -> Result<Self> {
        ElementType::from_i16(code).ok_or(VoxcorrError::UnsupportedDataType(code))
    }

    /// The raw data type code.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        match self {
            ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }
}

impl Default for ElementType {
    fn default() -> Self {
        ElementType::Float32
    }
}
