//! Private utility module
use flate2::bufread::GzDecoder;
use num_traits::{Float, NumCast};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

/// Check whether the given path has the `.gz` extension.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Open a file for sequential reading, transparently decoding it as a Gzip
/// stream when the path ends in `.gz`.
pub fn open_file<P>(path: P) -> Result<Box<dyn Read>>
where
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(&path)?);
    if is_gz_file(&path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Mean of the non-NaN values. NaN if there are none.
pub fn nan_mean<T, I>(values: I) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((T::zero(), 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        T::nan()
    } else {
        sum / <T as NumCast>::from(count).unwrap_or_else(T::nan)
    }
}

/// Minimum and maximum of the finite values, if any.
pub fn finite_range<T, I>(values: I) -> Option<(T, T)>
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::{finite_range, is_gz_file, nan_mean};
    use std::f32::NAN;

    #[test]
    fn test_is_gz_file() {
        assert!(is_gz_file("/path/to/something.gvol.gz"));
        assert!(is_gz_file("/path/to/something.gz"));
        assert!(!is_gz_file("/path/to/something.gvol"));
        assert!(!is_gz_file("/path/to/gz"));
        assert!(!is_gz_file("/path/to/.gz/something.gvol"));
    }

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(vec![1.0_f32, NAN, 3.0]), 2.0);
        assert!(nan_mean(vec![NAN, NAN]).is_nan());
        assert!(nan_mean(Vec::<f64>::new()).is_nan());
    }

    #[test]
    fn test_finite_range() {
        assert_eq!(finite_range(vec![0.5_f32, NAN, -0.25, 0.75]), Some((-0.25, 0.75)));
        assert_eq!(finite_range(vec![NAN]), None);
    }
}
