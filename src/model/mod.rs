//! # Model Module
//!
//! Likelihood model and the optimisation collaborators of the driver.
//!
//! ## Components
//! - `Parameters`: error rates, loss bound and the emission table
//! - `Likelihood`: base likelihood of structurally fixed cells, multiplicities
//! - `Cluster`: initial taxon and character cluster assignments
//! - `Solver`: sub-solvers fitting the cluster-level k-Dollo matrix
//! - `Verify`: k-Dollo and monotonicity checks

pub mod cluster;
pub mod likelihood;
pub mod parameters;
pub mod solver;
pub mod verify;
