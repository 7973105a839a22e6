//! # rusted_amc13
//! Codec for AMC13 event records: the CDF header and trailer, crate header and trailer, and the
//! per-board sub-headers that frame front-end readout data in the DAQ stream.
//!
//! Events are assembled with [`Amc13Event`] and frozen with [`Amc13Event::finalize`], which runs every
//! consistency check and reports all failures at once.

pub mod bitfield;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod process;
pub mod raw_file;
pub mod validator;
pub mod words;

pub use error::{ValidationError, Violation};
pub use event::{Amc13Event, BoardBlock, EventRecord, TruncationPolicy, ValidatedEvent};
pub use words::{BoardHeader, CdfHeader, CdfTrailer, CrateHeader, CrateTrailer, WordKind};
