use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use std::path::Path;
use voxcorr::writer::WriterOptions;

/// Subject identifiers of the five-subject test dataset.
pub const SUBJECTS: [&str; 5] = ["BD119", "AM086", "JF054", "RL201", "NK332"];

/// A `(2, 2, 2, 6)` subject volume whose voxels follow a subject-specific
/// amplitude, so that voxel values correlate with the subject index.
pub fn subject_volume(s: usize) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(&[2, 2, 2, 6]).f(), |ix| {
        let (x, y, z, t) = (ix[0], ix[1], ix[2], ix[3]);
        let drift = ((x + 2 * y + 4 * z + 3 * t) % 5) as f32 * 0.01;
        (s + 1) as f32 * (1. + t as f32) + drift
    })
}

/// Write the volumes of every subject but `missing` under `dir` as
/// `<dir>/<subject>.gvol.gz`, returning the path pattern to read them back.
#[allow(dead_code)]
pub fn write_dataset(dir: &Path, missing: Option<usize>) -> String {
    for (s, subject) in SUBJECTS.iter().enumerate() {
        if Some(s) == missing {
            continue;
        }
        WriterOptions::new(dir.join(format!("{}.gvol.gz", subject)))
            .write_volume(&subject_volume(s))
            .unwrap();
    }
    dir.join("{subject}.gvol").to_string_lossy().into_owned()
}

/// Whether two values are equal, treating NaN as equal to NaN.
#[allow(dead_code)]
pub fn same_or_both_nan(a: f32, b: f32) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-6
}
