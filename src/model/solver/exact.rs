//! # Exact Sub-Solver
//!
//! Branch and bound over the columns of `E`.
//!
//! Every candidate column (canonical loss labels) is scored against every
//! cluster column once per call, in parallel, and each column's candidates
//! are ranked best first. The search then fixes columns left to right; a
//! candidate is accepted only when it is compatible with the columns already
//! fixed. The bound at column `f` is the current score plus the unconstrained
//! best of every cell in columns `f..t`, so ranked candidates can be cut as
//! soon as one falls below the incumbent.
//!
//! The number of candidates grows as `(k + 2)^s`; when ranking them would
//! exceed the memory limit (or a hard cap) the call returns its starting
//! point with `success = false`.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{
    enumerate_columns, starting_point, CellScores, Deadline, SolverBudget, SubProblem,
    SubSolution, SubSolver,
};
use crate::data::solution::{columns_compatible, SolutionMatrix};
use crate::error::Result;
use crate::utils::threading::PoolCache;

/// Hard cap on ranked `(column, candidate)` pairs per call
const MAX_RANKED: usize = 1 << 22;
/// Deadline is polled once every this many search nodes
const DEADLINE_POLL: u64 = 1024;
/// Bound slack
const PRUNE_EPS: f64 = 1e-9;

#[derive(Default)]
pub struct ExactSolver {
    pools: PoolCache,
}

impl ExactSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Candidate index and its score for one column
type Ranked = Vec<(u32, f64)>;

struct Search<'a> {
    candidates: &'a [Vec<u8>],
    ranked: &'a [Ranked],
    /// `suffix[f]` = unconstrained best of columns `f..t`
    suffix: &'a [f64],
    deadline: Deadline,
    chosen: Vec<u32>,
    best: Vec<u32>,
    best_score: f64,
    nodes: u64,
    timed_out: bool,
}

impl Search<'_> {
    fn run(&mut self, f: usize, score: f64) {
        if self.timed_out {
            return;
        }
        self.nodes += 1;
        if self.nodes % DEADLINE_POLL == 0 && self.deadline.expired() {
            self.timed_out = true;
            return;
        }

        if f == self.ranked.len() {
            if score > self.best_score + PRUNE_EPS {
                self.best_score = score;
                self.best.clone_from(&self.chosen);
            }
            return;
        }

        let ranked = self.ranked;
        for &(idx, cand_score) in &ranked[f] {
            if score + cand_score + self.suffix[f + 1] <= self.best_score + PRUNE_EPS {
                break;
            }
            let candidate = &self.candidates[idx as usize];
            let fits = self
                .chosen
                .iter()
                .all(|&g| columns_compatible(candidate, &self.candidates[g as usize]));
            if !fits {
                continue;
            }
            self.chosen.push(idx);
            self.run(f + 1, score + cand_score);
            self.chosen.pop();
            if self.timed_out {
                return;
            }
        }
    }
}

impl SubSolver for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(&mut self, problem: &SubProblem<'_>, budget: &SolverBudget) -> Result<SubSolution> {
        let deadline = Deadline::new(budget.time_limit);
        let scores = CellScores::new(problem)?;
        let start = starting_point(problem);
        let s = problem.n_taxon_clusters;
        let t = problem.n_character_clusters;

        let mut cap = MAX_RANKED / t.max(1);
        if let Some(mb) = budget.memory_limit_mb {
            // Per candidate: its states plus one ranked entry per column
            let per_candidate = s + 24 + t * std::mem::size_of::<(u32, f64)>();
            cap = cap.min(mb.saturating_mul(1 << 20) / per_candidate.max(1));
        }
        cap = cap.min(u32::MAX as usize);

        let Some(candidates) = enumerate_columns(s, problem.params.max_state(), cap) else {
            warn!(
                "exact solver: more than {} candidate columns for {} taxon clusters, keeping the starting point",
                cap, s
            );
            return Ok(SubSolution {
                matrix: start,
                success: false,
            });
        };

        let pool = self.pools.get(budget.threads)?;
        let ranked: Vec<Ranked> = pool.install(|| {
            (0..t)
                .into_par_iter()
                .map(|f| {
                    let mut r: Ranked = candidates
                        .iter()
                        .enumerate()
                        .map(|(i, cand)| (i as u32, scores.column_score(f, cand)))
                        .collect();
                    r.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                    r
                })
                .collect()
        });

        let mut suffix = vec![0.0; t + 1];
        for f in (0..t).rev() {
            suffix[f] = suffix[f + 1] + (0..s).map(|h| scores.best(h, f)).sum::<f64>();
        }

        let start_score = scores.objective(&start, 0.0);
        let mut search = Search {
            candidates: &candidates,
            ranked: &ranked,
            suffix: &suffix,
            deadline,
            chosen: Vec::with_capacity(t),
            best: Vec::new(),
            best_score: start_score,
            nodes: 0,
            timed_out: false,
        };
        search.run(0, 0.0);

        let matrix = if search.best.len() == t && search.best_score > start_score {
            let columns: Vec<&[u8]> = search
                .best
                .iter()
                .map(|&i| candidates[i as usize].as_slice())
                .collect();
            SolutionMatrix::from_columns(s, &columns)
        } else {
            start
        };

        let objective = problem.base_log_likelihood + scores.objective(&matrix, 0.0);
        if budget.verbose {
            info!(
                "exact solver: {} candidates, {} nodes, objective {:.4}, {:.2}s",
                candidates.len(),
                search.nodes,
                objective,
                deadline.elapsed().as_secs_f64()
            );
        } else {
            debug!(
                "exact solver: {} candidates, {} nodes, objective {:.4}",
                candidates.len(),
                search.nodes,
                objective
            );
        }

        Ok(SubSolution {
            matrix,
            success: !search.timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::matrix::TernaryMatrix;
    use crate::model::likelihood::Multiplicities;
    use crate::model::parameters::ModelParams;
    use crate::model::solver::tests::Fixture;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Best objective over every s × t matrix, by exhaustive search
    fn brute_force(fx: &Fixture, s: usize, t: usize) -> f64 {
        let problem = fx.problem(s, t);
        let scores = CellScores::new(&problem).unwrap();
        let max_state = fx.params.max_state() as u32;
        let n_cells = s * t;
        let mut best = f64::NEG_INFINITY;
        let total = (max_state + 1).pow(n_cells as u32);
        for code in 0..total {
            let mut e = SolutionMatrix::new(s, t);
            let mut rest = code;
            for cell in 0..n_cells {
                e.set(cell / t, cell % t, (rest % (max_state + 1)) as u8);
                rest /= max_state + 1;
            }
            if e.is_k_dollo(fx.params.k()) {
                best = best.max(scores.objective(&e, 0.0));
            }
        }
        best
    }

    fn random_fixture(rng: &mut StdRng, m: usize, n: usize, s: usize, t: usize, k: u8) -> Fixture {
        let matrix = TernaryMatrix::from_fn(m, n, |_, _| {
            match rng.random_range(0..5) {
                0 => crate::data::matrix::Entry::Missing,
                1 | 2 => crate::data::matrix::Entry::One,
                _ => crate::data::matrix::Entry::Zero,
            }
        });
        Fixture {
            matrix,
            mult: Multiplicities::uniform(m, n, 1),
            params: ModelParams::new(0.05, 0.3, k).unwrap(),
            z_taxa: (0..m).map(|_| rng.random_range(0..s)).collect(),
            z_chars: (0..n).map(|_| rng.random_range(0..t)).collect(),
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut solver = ExactSolver::new();
        for _ in 0..15 {
            let k = rng.random_range(0..2u8);
            let fx = random_fixture(&mut rng, 6, 6, 3, 3, k);
            let problem = fx.problem(3, 3);
            let out = solver.solve(&problem, &SolverBudget::default()).unwrap();
            assert!(out.success);
            assert!(out.matrix.is_k_dollo(k));
            let scores = CellScores::new(&problem).unwrap();
            let got = scores.objective(&out.matrix, 0.0);
            assert!((got - brute_force(&fx, 3, 3)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_three_gamete_needs_loss() {
        // Conflicting gain clades become feasible once a loss is allowed
        let matrix = TernaryMatrix::from_codes(&[vec![1, 1], vec![1, 0], vec![0, 1]]).unwrap();
        let mk = |k| Fixture {
            matrix: matrix.clone(),
            mult: Multiplicities::uniform(3, 2, 1),
            params: ModelParams::new(0.01, 0.01, k).unwrap(),
            z_taxa: vec![0, 1, 2],
            z_chars: vec![0, 1],
        };
        let mut solver = ExactSolver::new();

        let fx0 = mk(0);
        let no_loss = solver.solve(&fx0.problem(3, 2), &SolverBudget::default()).unwrap();
        let fx1 = mk(1);
        let one_loss = solver.solve(&fx1.problem(3, 2), &SolverBudget::default()).unwrap();
        assert!(no_loss.matrix.is_k_dollo(0));
        assert!(one_loss.matrix.is_k_dollo(1));

        // With one loss every observed entry can be matched
        for h in 0..3 {
            for f in 0..2 {
                let observed = matrix.entry(h, f) == crate::data::matrix::Entry::One;
                assert_eq!(one_loss.matrix.get(h, f) == 1, observed);
            }
        }
        let s0 = CellScores::new(&fx0.problem(3, 2)).unwrap();
        let s1 = CellScores::new(&fx1.problem(3, 2)).unwrap();
        assert!(s1.objective(&one_loss.matrix, 0.0) > s0.objective(&no_loss.matrix, 0.0));
    }

    #[test]
    fn test_memory_limit_keeps_start() {
        let mut rng = StdRng::seed_from_u64(8);
        let fx = random_fixture(&mut rng, 8, 4, 8, 2, 2);
        let warm = SolutionMatrix::new(8, 2);
        let mut problem = fx.problem(8, 2);
        problem.warm_start = Some(&warm);
        let budget = SolverBudget {
            memory_limit_mb: Some(0),
            ..SolverBudget::default()
        };
        let out = ExactSolver::new().solve(&problem, &budget).unwrap();
        assert!(!out.success);
        assert_eq!(out.matrix, warm);
    }

    #[test]
    fn test_never_below_warm_start() {
        let mut rng = StdRng::seed_from_u64(21);
        let fx = random_fixture(&mut rng, 5, 5, 2, 3, 1);
        let warm = SolutionMatrix::from_rows(vec![vec![1, 0, 1], vec![0, 0, 1]]).unwrap();
        let mut problem = fx.problem(2, 3);
        problem.warm_start = Some(&warm);
        let out = ExactSolver::new()
            .solve(&problem, &SolverBudget::default())
            .unwrap();
        let scores = CellScores::new(&problem).unwrap();
        assert!(scores.objective(&out.matrix, 0.0) >= scores.objective(&warm, 0.0));
    }
}
