//! Reduction of optical disdrometer output into rainfall statistics.
//!
//! The library is a pure pipeline from instrument text to
//! [`pipeline::Reduction`]; the `rusty-drop` binary adds file handling, the
//! CSV report and the figures.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod report;

pub use config::ReductionConfig;
pub use data::model::{Batch, CalibrationTable, Measurement, Spectrogram, SpectrumOrder};
pub use error::{ReductionError, Result};
pub use pipeline::{reduce, Reduction};
