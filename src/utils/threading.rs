//! # Threading Configuration
//!
//! ## Role
//! Configure rayon thread pools for the sub-solvers. The coordinate-ascent
//! driver itself is sequential; only the E-step fans out, and it does so on
//! a dedicated pool sized by the caller's thread budget rather than on the
//! global pool.

use rayon::ThreadPool;

use crate::error::{KdpfcError, Result};

/// Create a configured thread pool.
pub fn build_thread_pool(n_threads: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .thread_name(|i| format!("kdpfc-worker-{}", i))
        .build()
        .map_err(|e| KdpfcError::config(format!("Failed to create thread pool: {}", e)))
}

/// Lazily built pool, rebuilt only when the requested size changes.
///
/// The E-step runs once per driver iteration, so solvers keep their pool
/// across calls instead of spawning workers every time.
#[derive(Default)]
pub struct PoolCache {
    pool: Option<ThreadPool>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a pool with exactly `n_threads` workers
    pub fn get(&mut self, n_threads: usize) -> Result<&ThreadPool> {
        let n_threads = n_threads.max(1);
        let stale = self
            .pool
            .as_ref()
            .map_or(true, |p| p.current_num_threads() != n_threads);
        if stale {
            self.pool = Some(build_thread_pool(n_threads)?);
        }
        self.pool
            .as_ref()
            .ok_or_else(|| KdpfcError::algorithm("thread pool unavailable"))
    }
}
