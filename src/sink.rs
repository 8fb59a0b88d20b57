//! Destinations of result maps.
//!
//! A [`MapSink`] receives every map produced by an analysis, under a name and
//! with one label per channel. Conversion to third-party neuroimaging formats
//! and template alignment belong to sink implementations outside this crate.
//!
//! [`MapSink`]: ./trait.MapSink.html

use byteordered::Endianness;
use flate2::Compression;
use log::info;
use ndarray::{ArrayD, ArrayViewD};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::writer::WriterOptions;

/// A destination of named, labelled result maps.
pub trait MapSink {
    /// Submit a map. Rank 4 maps have one label per index of their last
    /// axis, other maps have a single label.
    fn submit(&mut self, name: &str, data: ArrayViewD<f32>, labels: &[String]) -> Result<()>;
}

impl<'a, K> MapSink for &'a mut K
where
    K: MapSink + ?Sized,
{
    fn submit(&mut self, name: &str, data: ArrayViewD<f32>, labels: &[String]) -> Result<()> {
        (**self).submit(name, data, labels)
    }
}

/// Writes each map as a volume file `<dir>/<name>.gvol` (or `.gvol.gz`).
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySink {
    dir: PathBuf,
    compression: Option<Compression>,
    endianness: Endianness,
}

impl DirectorySink {
    /// Write maps uncompressed, in native byte order, under `dir`. The
    /// directory is created on the first submission if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DirectorySink {
            dir: dir.as_ref().to_path_buf(),
            compression: None,
            endianness: Endianness::native(),
        }
    }

    /// Gzip the written files with the given level.
    pub fn compression(mut self, compression: Option<Compression>) -> Self {
        self.compression = compression;
        self
    }

    /// Set the byte order of the written files.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file a map of the given name is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let ext = if self.compression.is_some() {
            "gvol.gz"
        } else {
            "gvol"
        };
        self.dir.join(format!("{}.{}", name, ext))
    }
}

impl MapSink for DirectorySink {
    fn submit(&mut self, name: &str, data: ArrayViewD<f32>, labels: &[String]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        WriterOptions::new(&path)
            .compression(self.compression)
            .endianness(self.endianness)
            .labels(labels.iter().cloned())
            .write_volume(&data)?;
        info!("Saved {}", path.display());
        Ok(())
    }
}

/// A map submitted to a [`MemorySink`](./struct.MemorySink.html).
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    /// map name
    pub name: String,
    /// map contents
    pub data: ArrayD<f32>,
    /// channel labels
    pub labels: Vec<String>,
}

/// Keeps every submitted map in memory, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    entries: Vec<SinkEntry>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All submitted maps.
    pub fn entries(&self) -> &[SinkEntry] {
        &self.entries
    }

    /// The last map submitted under the given name.
    pub fn get(&self, name: &str) -> Option<&SinkEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    /// The names of the submitted maps, in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

impl MapSink for MemorySink {
    fn submit(&mut self, name: &str, data: ArrayViewD<f32>, labels: &[String]) -> Result<()> {
        self.entries.push(SinkEntry {
            name: name.to_string(),
            data: data.to_owned(),
            labels: labels.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectorySink, MapSink, MemorySink};
    use crate::volume::read_volume;
    use flate2::Compression;
    use ndarray::{Array4, ArrayD, IxDyn};
    use tempfile::tempdir;

    fn labels() -> Vec<String> {
        vec!["corr".to_string(), "pval".to_string()]
    }

    #[test]
    fn directory_sink_writes_labelled_volumes() {
        let dir = tempdir().unwrap();
        let data = Array4::from_elem((2, 2, 1, 2), 0.25_f32);
        let mut sink = DirectorySink::new(dir.path().join("Maps").join("Movie1"))
            .compression(Some(Compression::fast()));
        sink.submit("Movie1.rating_typicality", data.view().into_dyn(), &labels())
            .unwrap();

        let path = sink.path_for("Movie1.rating_typicality");
        assert!(path.to_str().unwrap().ends_with("Movie1.rating_typicality.gvol.gz"));
        let (header, read) = read_volume(&path).unwrap();
        assert_eq!(header.labels, labels());
        assert_eq!(read, data.into_dyn());
    }

    fn submit_two<K: MapSink>(mut sink: K) {
        let data = ArrayD::<f32>::zeros(IxDyn(&[1, 1, 1]));
        sink.submit("a", data.view(), &labels()[..1]).unwrap();
        sink.submit("b", data.view(), &[]).unwrap();
    }

    #[test]
    fn memory_sink_through_a_reference() {
        let mut sink = MemorySink::new();
        submit_two(&mut sink);
        assert_eq!(sink.names(), vec!["a", "b"]);
        assert_eq!(sink.get("a").unwrap().labels, vec!["corr".to_string()]);
        assert!(sink.get("c").is_none());
    }
}
