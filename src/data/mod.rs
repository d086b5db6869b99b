//! # Data Module
//!
//! In-memory representations of the input and output matrices.
//!
//! ## Design Philosophy
//! - **Row-major flat storage:** both matrices keep one contiguous `Vec` and
//!   index it as `row * n_cols + col`; the Z-steps scan whole rows and the
//!   layout keeps those scans sequential.
//! - **Enum-based entries:** `Entry` replaces the `-1/0/1` integer codes of
//!   the text format so MISSING can never be mistaken for a state.
//! - **Structural classes:** `CharacterClass`/`TaxonClass` replace negative
//!   sentinel codes for structurally fixed columns and rows.

pub mod matrix;
pub mod reduction;
pub mod solution;

// Re-export commonly used types
pub use matrix::{Entry, TernaryMatrix};
pub use reduction::{CharacterClass, Reduction, TaxonClass};
pub use solution::{is_present, CladeKind, SolutionMatrix, Violation, ABSENT, PRESENT};
