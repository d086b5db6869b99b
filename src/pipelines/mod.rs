//! # Pipeline Module
//!
//! The coordinate-ascent driver and the end-to-end reconstruction workflow
//! built on it.

pub mod coordinate_ascent;
pub mod reconstruction;

pub use coordinate_ascent::{CoordinateAscent, DriverOptions, SolveReport};
pub use reconstruction::ReconstructionPipeline;
