//! # Local-Search Sub-Solver
//!
//! Hill climbing over feasible k-Dollo matrices, starting from the warm start
//! (or the all-absent matrix, which is always feasible).
//!
//! A sweep scores, in parallel over columns, the best improving move of each
//! column:
//! - a single cell changed to another state
//! - a cell set to present while another absent cell of the same column
//!   takes a loss label, which widens the gain clade without changing its
//!   likelihood
//!
//! Moves are then applied one at a time by decreasing gain, each re-checked
//! against the columns changed earlier in the sweep. The search stops when a
//! sweep applies nothing or the deadline passes.

use rayon::prelude::*;
use tracing::{debug, info};

use super::{starting_point, CellScores, Deadline, SolverBudget, SubProblem, SubSolution, SubSolver};
use crate::data::solution::{SolutionMatrix, ABSENT, FIRST_LOSS, PRESENT};
use crate::error::Result;
use crate::utils::threading::PoolCache;

/// Smallest gain a move must bring
const MIN_GAIN: f64 = 1e-9;

#[derive(Default)]
pub struct LocalSearchSolver {
    pools: PoolCache,
}

impl LocalSearchSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Replacement for one column and what it gains
#[derive(Clone, Debug)]
struct Move {
    col: usize,
    column: Vec<u8>,
    gain: f64,
}

/// States a cell of `column` may move to
fn allowed_states(column: &[u8], max_state: u8, lazy: bool) -> Vec<u8> {
    if !lazy {
        return (ABSENT..=max_state).collect();
    }
    let mut states = vec![ABSENT];
    if max_state >= PRESENT {
        states.push(PRESENT);
    }
    let mut fresh = None;
    for label in FIRST_LOSS..=max_state {
        if column.contains(&label) {
            states.push(label);
        } else if fresh.is_none() {
            fresh = Some(label);
        }
    }
    states.extend(fresh);
    states
}

/// Best improving feasible move for column `f`
fn best_move(
    e: &SolutionMatrix,
    scores: &CellScores,
    f: usize,
    max_state: u8,
    lazy: bool,
) -> Option<Move> {
    let current = e.column(f);
    let states = allowed_states(&current, max_state, lazy);
    let loss_states: Vec<u8> = states.iter().copied().filter(|&s| s >= FIRST_LOSS).collect();
    let mut best: Option<Move> = None;

    let consider = |column: Vec<u8>, gain: f64, best: &mut Option<Move>| {
        if gain <= MIN_GAIN || best.as_ref().is_some_and(|b| b.gain >= gain) {
            return;
        }
        if e.column_fits(f, &column) {
            *best = Some(Move {
                col: f,
                column,
                gain,
            });
        }
    };

    for h in 0..current.len() {
        let old = current[h];
        let old_score = scores.score(h, f, old);
        for &state in &states {
            if state == old {
                continue;
            }
            let gain = scores.score(h, f, state) - old_score;
            let mut column = current.clone();
            column[h] = state;
            consider(column, gain, &mut best);
        }

        if old == PRESENT {
            continue;
        }
        let gain = scores.score(h, f, PRESENT) - old_score;
        if gain <= MIN_GAIN {
            continue;
        }
        let mut single = current.clone();
        single[h] = PRESENT;
        if e.column_fits(f, &single) {
            continue;
        }
        for h2 in (0..current.len()).filter(|&h2| h2 != h && current[h2] == ABSENT) {
            for &label in &loss_states {
                let mut column = single.clone();
                column[h2] = label;
                let pair_gain =
                    gain + scores.score(h2, f, label) - scores.score(h2, f, ABSENT);
                consider(column, pair_gain, &mut best);
            }
        }
    }

    best
}

impl SubSolver for LocalSearchSolver {
    fn name(&self) -> &'static str {
        "local-search"
    }

    fn solve(&mut self, problem: &SubProblem<'_>, budget: &SolverBudget) -> Result<SubSolution> {
        let deadline = Deadline::new(budget.time_limit);
        let scores = CellScores::new(problem)?;
        let mut e = starting_point(problem);
        let max_state = problem.params.max_state();
        let lazy = problem.lazy;
        let t = problem.n_character_clusters;
        let pool = self.pools.get(budget.threads)?;

        let mut sweeps = 0usize;
        let mut success = true;
        loop {
            if deadline.expired() {
                success = false;
                break;
            }
            sweeps += 1;

            let mut moves: Vec<Move> = pool.install(|| {
                (0..t)
                    .into_par_iter()
                    .filter_map(|f| best_move(&e, &scores, f, max_state, lazy))
                    .collect()
            });
            moves.sort_by(|a, b| b.gain.total_cmp(&a.gain).then(a.col.cmp(&b.col)));

            let mut applied = 0usize;
            for mv in moves {
                if e.column_fits(mv.col, &mv.column) {
                    e.set_column(mv.col, &mv.column);
                    applied += 1;
                }
            }
            debug!("local search sweep {}: {} moves applied", sweeps, applied);
            if applied == 0 {
                break;
            }
        }

        if budget.verbose {
            info!(
                "local search: {} sweeps, objective {:.4}, {:.2}s",
                sweeps,
                scores.objective(&e, problem.base_log_likelihood),
                deadline.elapsed().as_secs_f64()
            );
        }

        Ok(SubSolution { matrix: e, success })
    }
}
