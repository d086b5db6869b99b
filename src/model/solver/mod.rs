//! # Sub-Solvers
//!
//! ## Role
//! The E-step collaborator. Given fixed cluster assignments, a sub-solver
//! fits the `s × t` k-Dollo matrix `E` maximising
//!
//! ```text
//! baseL + sum over (h, f) of score(h, f, E[h][f])
//! ```
//!
//! where `score(h, f, state)` is the weighted log-likelihood of every reduced
//! cell `(p, c)` with `zT[p] = h` and `zC[c] = f` under that state.
//!
//! ## Contract
//! - The returned matrix is always a valid k-Dollo matrix.
//! - Its objective is never below that of a valid warm start.
//! - `success = false` means the budget ran out before the solver finished;
//!   the matrix is still the best one found.
//!
//! ## Implementations
//! - [`ExactSolver`]: branch and bound over columns
//! - [`LocalSearchSolver`]: parallel hill climbing from the warm start

pub mod exact;
pub mod local_search;

use std::time::{Duration, Instant};

use crate::data::matrix::TernaryMatrix;
use crate::data::solution::{is_present, SolutionMatrix, ABSENT, FIRST_LOSS};
use crate::error::{KdpfcError, Result};
use crate::model::likelihood::Multiplicities;
use crate::model::parameters::ModelParams;

pub use exact::ExactSolver;
pub use local_search::LocalSearchSolver;

/// Everything a sub-solver needs for one E-step
#[derive(Clone, Copy, Debug)]
pub struct SubProblem<'a> {
    /// Reduced input matrix
    pub matrix: &'a TernaryMatrix,
    pub multiplicities: &'a Multiplicities,
    pub base_log_likelihood: f64,
    /// Error rates and loss bound
    pub params: &'a ModelParams,
    /// Only introduce a new loss label when the used ones are exhausted
    pub lazy: bool,
    pub n_character_clusters: usize,
    /// `zC`
    pub character_assignment: &'a [usize],
    pub n_taxon_clusters: usize,
    /// `zT`
    pub taxon_assignment: &'a [usize],
    /// Solution of an earlier E-step of the same restart
    pub warm_start: Option<&'a SolutionMatrix>,
}

/// Resources one sub-solver call may use
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverBudget {
    /// Wall-clock limit per call
    pub time_limit: Option<Duration>,
    /// Memory limit in megabytes
    pub memory_limit_mb: Option<usize>,
    /// Worker threads for the solver's own pool
    pub threads: usize,
    pub verbose: bool,
}

impl Default for SolverBudget {
    fn default() -> Self {
        Self {
            time_limit: None,
            memory_limit_mb: None,
            threads: 1,
            verbose: false,
        }
    }
}

/// Result of one sub-solver call
#[derive(Clone, Debug)]
pub struct SubSolution {
    pub matrix: SolutionMatrix,
    /// `false` when the budget was exhausted
    pub success: bool,
}

/// Solves the cluster-level problem of an E-step
pub trait SubSolver {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn solve(&mut self, problem: &SubProblem<'_>, budget: &SolverBudget) -> Result<SubSolution>;
}

/// Wall-clock cut-off of one solver call
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Summed present/absent log-likelihood of every cluster cell
#[derive(Clone, Debug)]
pub struct CellScores {
    n_rows: usize,
    n_cols: usize,
    present: Vec<f64>,
    absent: Vec<f64>,
}

impl CellScores {
    /// Aggregate the reduced matrix over the problem's assignments
    pub fn new(problem: &SubProblem<'_>) -> Result<Self> {
        let matrix = problem.matrix;
        let s = problem.n_taxon_clusters;
        let t = problem.n_character_clusters;
        validate_assignment(problem.taxon_assignment, matrix.n_taxa(), s, "taxon")?;
        validate_assignment(
            problem.character_assignment,
            matrix.n_characters(),
            t,
            "character",
        )?;
        let mult = problem.multiplicities;
        if mult.n_taxa() != matrix.n_taxa() || mult.n_characters() != matrix.n_characters() {
            return Err(KdpfcError::invalid_data(format!(
                "multiplicities are {} x {}, matrix is {} x {}",
                mult.n_taxa(),
                mult.n_characters(),
                matrix.n_taxa(),
                matrix.n_characters()
            )));
        }

        let params = problem.params;
        let mut present = vec![0.0; s * t];
        let mut absent = vec![0.0; s * t];
        for p in 0..matrix.n_taxa() {
            let h = problem.taxon_assignment[p];
            for c in 0..matrix.n_characters() {
                let d = matrix.entry(p, c);
                if d.is_missing() {
                    continue;
                }
                let w = mult.get(p, c) as f64;
                let idx = h * t + problem.character_assignment[c];
                present[idx] += w * params.log_prob(d, true);
                absent[idx] += w * params.log_prob(d, false);
            }
        }

        Ok(Self {
            n_rows: s,
            n_cols: t,
            present,
            absent,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn score(&self, h: usize, f: usize, state: u8) -> f64 {
        let idx = h * self.n_cols + f;
        if is_present(state) {
            self.present[idx]
        } else {
            self.absent[idx]
        }
    }

    /// Best score of a cell ignoring the k-Dollo constraint
    #[inline]
    pub fn best(&self, h: usize, f: usize) -> f64 {
        let idx = h * self.n_cols + f;
        self.present[idx].max(self.absent[idx])
    }

    /// Score of column `f` set to `column`
    pub fn column_score(&self, f: usize, column: &[u8]) -> f64 {
        column
            .iter()
            .enumerate()
            .map(|(h, &state)| self.score(h, f, state))
            .sum()
    }

    /// `base + sum of cell scores`
    pub fn objective(&self, e: &SolutionMatrix, base: f64) -> f64 {
        let mut total = base;
        for h in 0..self.n_rows {
            for f in 0..self.n_cols {
                total += self.score(h, f, e.get(h, f));
            }
        }
        total
    }
}

/// Length and range of a cluster assignment
pub(crate) fn validate_assignment(
    z: &[usize],
    len: usize,
    n_clusters: usize,
    what: &str,
) -> Result<()> {
    if z.len() != len {
        return Err(KdpfcError::invalid_data(format!(
            "{} assignment has {} entries, expected {}",
            what,
            z.len(),
            len
        )));
    }
    if let Some((i, &v)) = z.iter().enumerate().find(|(_, &v)| v >= n_clusters) {
        return Err(KdpfcError::invalid_data(format!(
            "{} {} assigned to cluster {}, only {} clusters",
            what, i, v, n_clusters
        )));
    }
    Ok(())
}

/// The warm start when it has the right shape and is feasible, otherwise the
/// all-absent matrix
pub fn starting_point(problem: &SubProblem<'_>) -> SolutionMatrix {
    let s = problem.n_taxon_clusters;
    let t = problem.n_character_clusters;
    match problem.warm_start {
        Some(warm)
            if warm.n_rows() == s && warm.n_cols() == t && warm.is_k_dollo(problem.params.k()) =>
        {
            warm.clone()
        }
        _ => SolutionMatrix::new(s, t),
    }
}

/// Every column of length `len` over states `0..=max_state`, with loss
/// labels canonical: the first loss used is 2, the next new one 3, and so on.
///
/// Returns `None` once more than `cap` columns would be produced.
pub fn enumerate_columns(len: usize, max_state: u8, cap: usize) -> Option<Vec<Vec<u8>>> {
    fn extend(
        column: &mut Vec<u8>,
        len: usize,
        max_state: u8,
        next_loss: u8,
        cap: usize,
        out: &mut Vec<Vec<u8>>,
    ) -> bool {
        if column.len() == len {
            if out.len() >= cap {
                return false;
            }
            out.push(column.clone());
            return true;
        }
        let top = next_loss.min(max_state);
        for state in ABSENT..=top {
            column.push(state);
            let next = if state == next_loss {
                next_loss.saturating_add(1)
            } else {
                next_loss
            };
            let ok = extend(column, len, max_state, next, cap, out);
            column.pop();
            if !ok {
                return false;
            }
        }
        true
    }

    let mut out = Vec::new();
    let mut column = Vec::with_capacity(len);
    if extend(&mut column, len, max_state, FIRST_LOSS, cap, &mut out) {
        Some(out)
    } else {
        None
    }
}
