//! # Utilities Module
//!
//! ## Role
//! Cross-cutting helpers that don't belong in domain-specific modules.
//!
//! ## Sub-modules
//! - `threading`: Rayon thread pool configuration for the sub-solvers
//! - `tolerance`: Explicit floating-point comparison tolerance

pub mod threading;
pub mod tolerance;

pub use threading::{build_thread_pool, PoolCache};
pub use tolerance::Tolerance;
