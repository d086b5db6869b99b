//! # Configuration Logic
//!
//! ## Role
//! CLI argument parsing and validation.
//!
//! ## Layout
//! - `struct Config` derives `clap::Parser`.
//! - Fields:
//!   - `input: PathBuf` - Input matrix
//!   - `output: Option<PathBuf>` - Output file (default: stdout)
//!   - `k: u8` - Maximum number of losses per character (default: 1)
//!   - `alpha: f64` - False-positive rate (default: 1e-3)
//!   - `beta: f64` - False-negative rate (default: 0.3)
//!   - `character_clusters: Option<usize>` - Character clusters (default: unlimited)
//!   - `taxon_clusters: usize` - Taxon clusters (default: 10)
//!   - `exact: bool` - Use the exact sub-solver
//!   - `seed: u64` - Seed of the first restart (default: 0)
//!   - `time_limit: Option<u64>` - Seconds per sub-solver call
//!   - `memory_limit: Option<usize>` - Megabytes for the exact sub-solver
//!   - `threads: usize` - Sub-solver threads (default: 1)
//!
//! ## Validation
//! - Ensure `0 < alpha < 1` and `0 < beta < 1`
//! - Ensure cluster counts, threads, restarts and iterations are at least 1
//! - Ensure the tolerance is positive
//! - Ensure the input file exists
//!
//! ## Example CLI
//! ```bash
//! kdpfc input.txt output.txt -k 1 -a 0.001 -b 0.3 -l 5 --taxon-clusters 8 -N 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{KdpfcError, Result};
use crate::model::parameters::{ModelParams, MAX_LOSSES};
use crate::model::solver::SolverBudget;
use crate::model::verify::VerificationMode;
use crate::pipelines::coordinate_ascent::DriverOptions;
use crate::utils::tolerance::Tolerance;

#[derive(Parser, Debug, Clone)]
#[command(name = "kdpfc")]
#[command(version, about = "Clustered k-Dollo phylogeny reconstruction from noisy binary matrices", long_about = None)]
pub struct Config {
    /// Input matrix file
    pub input: PathBuf,

    /// Output file (default: stdout)
    pub output: Option<PathBuf>,

    /// Maximum number of losses per character
    #[arg(short = 'k', long = "losses", default_value_t = 1)]
    pub k: u8,

    /// False-positive rate
    #[arg(short = 'a', long = "alpha", default_value_t = 1e-3)]
    pub alpha: f64,

    /// False-negative rate
    #[arg(short = 'b', long = "beta", default_value_t = 0.3)]
    pub beta: f64,

    /// Number of character clusters (default: unlimited)
    #[arg(short = 'l', long = "character-clusters")]
    pub character_clusters: Option<usize>,

    /// Number of taxon clusters
    #[arg(short = 'L', long = "taxon-clusters", default_value_t = 10)]
    pub taxon_clusters: usize,

    /// Use the exact sub-solver
    #[arg(long = "exact", default_value_t = false)]
    pub exact: bool,

    /// Random number generator seed
    #[arg(short = 's', long = "seed", default_value_t = 0)]
    pub seed: u64,

    /// Time limit per sub-solver call in seconds (default: unlimited)
    #[arg(short = 'T', long = "time-limit")]
    pub time_limit: Option<u64>,

    /// Memory limit in MB (default: unlimited)
    #[arg(short = 'M', long = "memory-limit")]
    pub memory_limit: Option<usize>,

    /// Number of threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    pub verbose: bool,

    /// Number of restarts
    #[arg(short = 'N', long = "restarts", default_value_t = 1)]
    pub restarts: usize,

    /// Maximum iterations per restart
    #[arg(long = "max-iterations", default_value_t = 100)]
    pub max_iterations: usize,

    /// Convergence tolerance on the log likelihood
    #[arg(long = "tolerance", default_value_t = 1e-4)]
    pub tolerance: f64,

    /// Introduce loss labels lazily in the sub-solver
    #[arg(long = "lazy", default_value_t = false)]
    pub lazy: bool,

    /// Verification of intermediate solutions: off, warn or strict
    #[arg(long = "verify", default_value = "warn")]
    pub verification: VerificationMode,

    /// Also write the solution expanded to the input dimensions
    #[arg(long = "expanded")]
    pub expanded: Option<PathBuf>,
}

impl Config {
    /// Parse command line arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(KdpfcError::config(format!(
                    "{} must lie strictly between 0 and 1, got {}",
                    name, rate
                )));
            }
        }
        if self.k > MAX_LOSSES {
            return Err(KdpfcError::config(format!(
                "-k must be at most {}, got {}",
                MAX_LOSSES, self.k
            )));
        }
        if self.taxon_clusters == 0 {
            return Err(KdpfcError::config("--taxon-clusters must be at least 1"));
        }
        if self.character_clusters == Some(0) {
            return Err(KdpfcError::config("-l must be at least 1"));
        }
        if self.threads == 0 {
            return Err(KdpfcError::config("-t must be at least 1"));
        }
        if self.restarts == 0 {
            return Err(KdpfcError::config("--restarts must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(KdpfcError::config("--max-iterations must be at least 1"));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(KdpfcError::config(format!(
                "--tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !self.input.exists() {
            return Err(KdpfcError::FileNotFound {
                path: self.input.clone(),
            });
        }
        Ok(())
    }

    pub fn model_params(&self) -> Result<ModelParams> {
        ModelParams::new(self.alpha, self.beta, self.k)
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            n_taxon_clusters: self.taxon_clusters,
            n_character_clusters: self.character_clusters.unwrap_or(usize::MAX),
            seed: self.seed,
            lazy: self.lazy,
            max_iterations: self.max_iterations,
            tolerance: Tolerance::new(self.tolerance),
            verification: self.verification,
        }
    }

    pub fn solver_budget(&self) -> SolverBudget {
        SolverBudget {
            time_limit: self.time_limit.map(Duration::from_secs),
            memory_limit_mb: self.memory_limit,
            threads: self.threads,
            verbose: self.verbose,
        }
    }
}
