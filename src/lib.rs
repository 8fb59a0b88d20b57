//! Voxelwise typicality and cross-subject correlation over multi-subject
//! brain-imaging data.
//!
//! The typical workflow goes as follows:
//!
//! 1. Build a [`GroupVolume`], the out-of-core `(X, Y, Z, T, S)` array of all
//!    subjects, with a [`VolumeStore`] reading from a [`SubjectSource`].
//!    Missing or unreadable subjects become all-NaN slices.
//! 2. Compute the [typicality] of every subject, the correlation of its time
//!    series with the leave-one-out average of the others.
//! 3. Correlate per-subject maps (typicality maps, or any `(X, Y, Z, S)`
//!    array) with a behavioral reference vector, optionally controlling for a
//!    covariate, with [`correlation_analysis`] or
//!    [`partial_correlation_analysis`].
//! 4. Submit the thresholded, labelled result maps to a [`MapSink`].
//!
//! # Example
//!
//! ```no_run
//! use voxcorr::{
//!     correlation_analysis, typicality, AnalysisOptions, DatasetLayout, DirectorySink,
//!     VolumeStore,
//! };
//!
//! let layout = DatasetLayout::new("/study").with_source_root("/raw/SocCog");
//! let subjects = ["BD119", "AM086", "JF054", "RL201"];
//! let options = AnalysisOptions::new();
//!
//! let mut group = VolumeStore::new(layout.subject_source("Movie1"))
//!     .build(&subjects, layout.group_volume_path("Movie1"))?;
//! let typ = typicality(&mut group, &options)?;
//!
//! let empathy = [31., 42., 27., 38.];
//! let output = correlation_analysis(typ.r.view(), &empathy, &options)?;
//! output.write(
//!     &voxcorr::layout::analysis_prefix("Movie1", "empathy"),
//!     DirectorySink::new(layout.maps_dir("Movie1")),
//! )?;
//! # Ok::<(), voxcorr::VoxcorrError>(())
//! ```
//!
//! Individual correlations are available through [`correlate`] and
//! [`pearson`], the latter reporting why a correlation is undefined.
//!
//! [`GroupVolume`]: ./store/struct.GroupVolume.html
//! [`VolumeStore`]: ./store/struct.VolumeStore.html
//! [`SubjectSource`]: ./source/trait.SubjectSource.html
//! [typicality]: ./typicality/index.html
//! [`correlation_analysis`]: ./analysis/fn.correlation_analysis.html
//! [`partial_correlation_analysis`]: ./analysis/fn.partial_correlation_analysis.html
//! [`MapSink`]: ./sink/trait.MapSink.html
//! [`correlate`]: ./correlation/fn.correlate.html
//! [`pearson`]: ./correlation/fn.pearson.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate num_derive;

pub mod analysis;
pub mod assemble;
pub mod combine;
pub mod correlation;
pub mod error;
pub mod header;
pub mod layout;
pub mod loo;
pub mod options;
pub mod partial;
pub mod scan;
pub mod sink;
pub mod source;
pub mod store;
pub mod threshold;
pub mod typedef;
pub mod typicality;
pub mod volume;
pub mod writer;
mod util;

pub use crate::analysis::{correlation_analysis, partial_correlation_analysis, AnalysisOutput};
pub use crate::assemble::{AnalysisKind, StackedMaps};
pub use crate::correlation::{correlate, pearson, VoxelOutcome};
pub use crate::error::{Result, VoxcorrError};
pub use crate::header::VolumeHeader;
pub use crate::layout::DatasetLayout;
pub use crate::options::AnalysisOptions;
pub use crate::partial::partial_correlate;
pub use crate::scan::CorrelationMaps;
pub use crate::sink::{DirectorySink, MapSink, MemorySink};
pub use crate::source::{FileSource, SubjectSource};
pub use crate::store::{GroupVolume, GroupVolumeWriter, VolumeStore};
pub use crate::typicality::{typicality, TypicalityMaps};
pub use crate::volume::shape::{GroupShape, VolumeGrid};
pub use byteordered::Endianness;
