//! # kdpfc Library
//!
//! Clustered k-Dollo phylogeny reconstruction from noisy binary matrices.
//! Taxa and characters are grouped into clusters and a cluster-level k-Dollo
//! matrix is fit by coordinate ascent on the data log-likelihood under an
//! asymmetric false-positive/false-negative error model.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: Input matrix, solution matrix, structural reduction
//! - `error`: Error types and result aliases
//! - `io`: Matrix and assignment text formats
//! - `model`: Likelihood, cluster initialization, sub-solvers, verification
//! - `pipelines`: Coordinate-ascent driver and end-to-end workflow
//! - `utils`: Thread pools and numeric tolerance

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use data::matrix::{Entry, TernaryMatrix};
pub use data::reduction::Reduction;
pub use data::solution::{SolutionMatrix, Violation};
pub use error::{KdpfcError, Result};
pub use model::cluster::{ClusterInitializer, KMeansInitializer};
pub use model::likelihood::{BaseLikelihood, Multiplicities};
pub use model::parameters::ModelParams;
pub use model::solver::{ExactSolver, LocalSearchSolver, SolverBudget, SubSolver};
pub use model::verify::VerificationMode;
pub use utils::tolerance::Tolerance;

pub use pipelines::{CoordinateAscent, DriverOptions, ReconstructionPipeline, SolveReport};
