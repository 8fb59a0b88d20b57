//! Types for error handling go here.
use ndarray::ShapeError;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum VoxcorrError {
        /// Not a valid volume file
        InvalidFormat {
            display("Invalid volume file")
        }
        /// The volume file was written by an unsupported format version
        UnsupportedVersion(version: u16) {
            display("Unsupported volume file version {}", version)
        }
        /// The element data type code is not supported
        UnsupportedDataType(code: i16) {
            display("Unsupported element data type code {}", code)
        }
        /// A channel label is not valid UTF-8 or is too long
        InvalidLabel {
            display("Invalid channel label")
        }
        /// Inconsistent or unsupported volume size (axis, value)
        InconsistentDim(axis: usize, value: usize) {
            display("Inconsistent value `{}` in volume dimension at axis {}", value, axis)
        }
        /// Attempted to read volume outside boundaries.
        OutOfBounds(coords: Vec<usize>) {
            display("Out of bounds access to volume: {:?}", &coords[..])
        }
        /// Attempted to access a volume with the wrong number of dimensions
        IncorrectVolumeDimensionality(expected: usize, got: usize) {
            display("Unexpected volume dimensionality: expected {}, got {}", expected, got)
        }
        /// Two arrays that must share a shape do not
        IncompatibleShapes(expected: Vec<usize>, got: Vec<usize>) {
            display("Incompatible shapes: expected {:?}, got {:?}", &expected[..], &got[..])
        }
        /// A per-subject vector does not have one value per subject
        LengthMismatch(what: &'static str, expected: usize, got: usize) {
            display("Length of the {} vector ({}) does not match the number of subjects ({})",
                    what, got, expected)
        }
        /// The number of channel labels does not match the number of channels
        LabelCount(expected: usize, got: usize) {
            display("Expected {} channel labels, got {}", expected, got)
        }
        /// No subject yielded a loadable volume, so the volume grid is unknown
        NoValidSource {
            display("No valid subject volume found to determine the expected data shape")
        }
        /// Leave-one-out averaging requires at least two subjects
        InsufficientSubjects(subjects: usize) {
            display("Leave-one-out averaging requires at least 2 subjects, got {}", subjects)
        }
        /// Group volumes must be randomly writable, so they cannot be compressed
        CompressedStore(path: PathBuf) {
            display("Cannot use compressed file {} as a group volume store", path.display())
        }
        /// Array shape error
        Shape(err: ShapeError) {
            from()
            source(err)
            display("Array shape error: {}", err)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, VoxcorrError>;
