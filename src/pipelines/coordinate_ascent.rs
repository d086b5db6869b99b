//! # Coordinate-Ascent Driver
//!
//! ## Role
//! Fits the cluster-level k-Dollo matrix `E` together with the taxon
//! assignment `zT` and the character assignment `zC` by alternating block
//! maximisation of the data log-likelihood.
//!
//! ## Algorithm
//! Per restart `r = 1..=n_restarts`:
//! 1. Reseed `zT`, `zC` from the initializer with seed `seed + r - 1`.
//! 2. Iterate while the likelihood still moves, iterations remain and the
//!    sub-solver has not reported an exhausted budget:
//!    a. E-step: the sub-solver fits `E` for the current assignments, warm
//!       started from the previous E-step of the same restart.
//!    b. Z-step on taxa: every taxon moves to its best cluster.
//!    c. Z-step on characters: every character moves to its best cluster.
//! 3. Keep the restart when it strictly beats the incumbent.
//!
//! The driver ends holding the incumbent. It starts as the all-absent
//! solution with every taxon and character in cluster 0.
//!
//! ## Likelihood
//! ```text
//! total = baseL + sum_p sum_c mult[p][c] * log P(D[p][c] | E[zT[p]][zC[c]])
//! ```
//! Both Z-steps are exact block maximisers, so neither can lower `total`.

use tracing::{debug, info, info_span};

use crate::data::matrix::TernaryMatrix;
use crate::data::reduction::Reduction;
use crate::data::solution::SolutionMatrix;
use crate::error::{KdpfcError, Result};
use crate::io::reconstruction::Reconstruction;
use crate::model::cluster::ClusterInitializer;
use crate::model::likelihood::BaseLikelihood;
use crate::model::parameters::ModelParams;
use crate::model::solver::{validate_assignment, SolverBudget, SubProblem, SubSolver};
use crate::model::verify::{check_k_dollo, check_non_decreasing, VerificationMode};
use crate::utils::tolerance::Tolerance;

/// Numeric settings of the driver
#[derive(Clone, Debug, PartialEq)]
pub struct DriverOptions {
    /// Requested taxon clusters `s`, capped by the number of reduced taxa
    pub n_taxon_clusters: usize,
    /// Requested character clusters `t`, capped by the number of reduced
    /// characters; `usize::MAX` means one cluster per character
    pub n_character_clusters: usize,
    /// Seed of the first restart
    pub seed: u64,
    /// Passed through to the sub-solver
    pub lazy: bool,
    /// Iteration cap per restart
    pub max_iterations: usize,
    /// Convergence threshold on the likelihood change
    pub tolerance: Tolerance,
    /// How failed checks are handled
    pub verification: VerificationMode,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            n_taxon_clusters: 10,
            n_character_clusters: usize::MAX,
            seed: 0,
            lazy: false,
            max_iterations: 100,
            tolerance: Tolerance::default(),
            verification: VerificationMode::default(),
        }
    }
}

/// Outcome of one E-step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EStepOutcome {
    pub log_likelihood: f64,
    /// `false` when the sub-solver ran out of budget
    pub success: bool,
}

/// Likelihoods after each step of one iteration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationTrace {
    pub e_step: f64,
    pub z_taxa: f64,
    pub z_characters: f64,
    pub solver_success: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RestartSummary {
    /// 1-based
    pub restart: usize,
    pub seed: u64,
    pub iterations: Vec<IterationTrace>,
    /// Likelihood the restart ended with
    pub log_likelihood: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    pub restarts: Vec<RestartSummary>,
    /// Index into `restarts` of the restart that produced the incumbent,
    /// `None` when none beat the all-absent start
    pub best_restart: Option<usize>,
    /// Likelihood of the incumbent
    pub log_likelihood: f64,
    /// Whether a sub-solver call ran out of budget
    pub budget_exhausted: bool,
}

pub struct CoordinateAscent {
    /// Reduced input matrix
    matrix: TernaryMatrix,
    params: ModelParams,
    base: BaseLikelihood,
    options: DriverOptions,
    n_taxon_clusters: usize,
    n_character_clusters: usize,
    e: SolutionMatrix,
    z_taxa: Vec<usize>,
    z_characters: Vec<usize>,
    log_likelihood: f64,
    /// An E-step of the current restart has produced `e`
    warm: bool,
    solver: Box<dyn SubSolver>,
    initializer: Box<dyn ClusterInitializer>,
}

impl CoordinateAscent {
    /// Build a driver over an already reduced matrix and its base likelihood
    pub fn new(
        matrix: TernaryMatrix,
        base: BaseLikelihood,
        params: ModelParams,
        options: DriverOptions,
        solver: Box<dyn SubSolver>,
        initializer: Box<dyn ClusterInitializer>,
    ) -> Result<Self> {
        let mult = base.multiplicities();
        if mult.n_taxa() != matrix.n_taxa() || mult.n_characters() != matrix.n_characters() {
            return Err(KdpfcError::invalid_data(format!(
                "multiplicities are {} x {}, reduced matrix is {} x {}",
                mult.n_taxa(),
                mult.n_characters(),
                matrix.n_taxa(),
                matrix.n_characters()
            )));
        }
        if options.n_taxon_clusters == 0 || options.n_character_clusters == 0 {
            return Err(KdpfcError::config("cluster counts must be at least 1"));
        }
        if options.max_iterations == 0 {
            return Err(KdpfcError::config("max iterations must be at least 1"));
        }

        let s = options.n_taxon_clusters.min(matrix.n_taxa()).max(1);
        let t = options.n_character_clusters.min(matrix.n_characters()).max(1);
        let mut driver = Self {
            e: SolutionMatrix::new(s, t),
            z_taxa: vec![0; matrix.n_taxa()],
            z_characters: vec![0; matrix.n_characters()],
            log_likelihood: 0.0,
            warm: false,
            n_taxon_clusters: s,
            n_character_clusters: t,
            matrix,
            params,
            base,
            options,
            solver,
            initializer,
        };
        driver.log_likelihood = driver.total_log_likelihood();
        Ok(driver)
    }

    /// Build the base likelihood from a structural reduction and drive its
    /// reduced matrix
    pub fn from_reduction(
        reduction: &Reduction,
        params: ModelParams,
        options: DriverOptions,
        solver: Box<dyn SubSolver>,
        initializer: Box<dyn ClusterInitializer>,
    ) -> Result<Self> {
        let reduced = reduction.reduced();
        let base = BaseLikelihood::new(
            &params,
            reduction.character_mapping(),
            reduction.taxon_mapping(),
            reduced.n_taxa(),
            reduced.n_characters(),
        )?;
        info!(
            "Number of fixed characters = {}, fixed taxa = {}, base log likelihood = {:.6}",
            base.n_fixed_characters(),
            base.n_fixed_taxa(),
            base.value()
        );
        Self::new(reduced.clone(), base, params, options, solver, initializer)
    }

    pub fn n_taxon_clusters(&self) -> usize {
        self.n_taxon_clusters
    }

    pub fn n_character_clusters(&self) -> usize {
        self.n_character_clusters
    }

    pub fn matrix(&self) -> &TernaryMatrix {
        &self.matrix
    }

    pub fn base_log_likelihood(&self) -> f64 {
        self.base.value()
    }

    pub fn solution(&self) -> &SolutionMatrix {
        &self.e
    }

    /// `zT`
    pub fn taxon_assignment(&self) -> &[usize] {
        &self.z_taxa
    }

    /// `zC`
    pub fn character_assignment(&self) -> &[usize] {
        &self.z_characters
    }

    /// Likelihood recorded by the last step
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn reconstruction(&self) -> Reconstruction {
        Reconstruction {
            matrix: self.e.clone(),
            taxa: self.z_taxa.clone(),
            characters: self.z_characters.clone(),
        }
    }

    /// Replace `zT` and `zC`
    pub fn set_assignments(&mut self, z_taxa: Vec<usize>, z_characters: Vec<usize>) -> Result<()> {
        validate_assignment(&z_taxa, self.matrix.n_taxa(), self.n_taxon_clusters, "taxon")?;
        validate_assignment(
            &z_characters,
            self.matrix.n_characters(),
            self.n_character_clusters,
            "character",
        )?;
        self.z_taxa = z_taxa;
        self.z_characters = z_characters;
        self.log_likelihood = self.total_log_likelihood();
        Ok(())
    }

    /// Replace `E`
    pub fn set_solution(&mut self, e: SolutionMatrix) -> Result<()> {
        if e.n_rows() != self.n_taxon_clusters || e.n_cols() != self.n_character_clusters {
            return Err(KdpfcError::invalid_data(format!(
                "solution is {} x {}, expected {} x {}",
                e.n_rows(),
                e.n_cols(),
                self.n_taxon_clusters,
                self.n_character_clusters
            )));
        }
        self.e = e;
        self.log_likelihood = self.total_log_likelihood();
        Ok(())
    }

    /// Reseed `zT` and `zC` from the initializer
    pub fn init_z(&mut self, seed: u64) -> Result<()> {
        let z = self.initializer.initialize(
            &self.matrix,
            self.n_taxon_clusters,
            self.n_character_clusters,
            seed,
        )?;
        self.set_assignments(z.taxa, z.characters)
    }

    /// `mult[p][c] * log P(D[p][c] | E[h][f])`
    #[inline]
    pub fn cell_log_likelihood(&self, p: usize, h: usize, c: usize, f: usize) -> f64 {
        self.params.log_likelihood(
            self.matrix.entry(p, c),
            self.e.get(h, f),
            self.base.multiplicities().get(p, c),
        )
    }

    /// Character `c` placed in cluster `f`, every taxon at its assignment
    pub fn character_log_likelihood(&self, c: usize, f: usize) -> f64 {
        (0..self.matrix.n_taxa())
            .map(|p| self.cell_log_likelihood(p, self.z_taxa[p], c, f))
            .sum()
    }

    /// Taxon `p` placed in cluster `h`, every character at its assignment
    pub fn taxon_log_likelihood(&self, p: usize, h: usize) -> f64 {
        (0..self.matrix.n_characters())
            .map(|c| self.cell_log_likelihood(p, h, c, self.z_characters[c]))
            .sum()
    }

    pub fn total_log_likelihood(&self) -> f64 {
        let mut total = self.base.value();
        for p in 0..self.matrix.n_taxa() {
            total += self.taxon_log_likelihood(p, self.z_taxa[p]);
        }
        total
    }

    /// Fit `E` for the current assignments
    pub fn solve_e(&mut self, budget: &SolverBudget) -> Result<EStepOutcome> {
        let problem = SubProblem {
            matrix: &self.matrix,
            multiplicities: self.base.multiplicities(),
            base_log_likelihood: self.base.value(),
            params: &self.params,
            lazy: self.options.lazy,
            n_character_clusters: self.n_character_clusters,
            character_assignment: &self.z_characters,
            n_taxon_clusters: self.n_taxon_clusters,
            taxon_assignment: &self.z_taxa,
            warm_start: self.warm.then_some(&self.e),
        };
        let out = self.solver.solve(&problem, budget)?;

        if out.matrix.n_rows() != self.n_taxon_clusters
            || out.matrix.n_cols() != self.n_character_clusters
        {
            return Err(KdpfcError::algorithm(format!(
                "{} solver returned a {} x {} matrix, expected {} x {}",
                self.solver.name(),
                out.matrix.n_rows(),
                out.matrix.n_cols(),
                self.n_taxon_clusters,
                self.n_character_clusters
            )));
        }

        self.e = out.matrix;
        self.warm = true;
        self.log_likelihood = self.total_log_likelihood();
        Ok(EStepOutcome {
            log_likelihood: self.log_likelihood,
            success: out.success,
        })
    }

    /// Move every taxon to its best cluster, ties to the lowest index
    pub fn solve_z_taxa(&mut self) -> f64 {
        let mut total = self.base.value();
        for p in 0..self.matrix.n_taxa() {
            let (h, best) = argmax((0..self.n_taxon_clusters).map(|h| self.taxon_log_likelihood(p, h)));
            self.z_taxa[p] = h;
            total += best;
        }
        self.log_likelihood = total;
        total
    }

    /// Move every character to its best cluster, ties to the lowest index
    pub fn solve_z_characters(&mut self) -> f64 {
        let mut total = self.base.value();
        for c in 0..self.matrix.n_characters() {
            let (f, best) = argmax(
                (0..self.n_character_clusters).map(|f| self.character_log_likelihood(c, f)),
            );
            self.z_characters[c] = f;
            total += best;
        }
        self.log_likelihood = total;
        total
    }

    /// Run `n_restarts` restarts of coordinate ascent and keep the best
    pub fn solve(&mut self, budget: &SolverBudget, n_restarts: usize) -> Result<SolveReport> {
        let mode = self.options.verification;
        let tolerance = self.options.tolerance;
        let k = self.params.k();

        let mut best_e = self.e.clone();
        let mut best_z_taxa = self.z_taxa.clone();
        let mut best_z_characters = self.z_characters.clone();
        let mut best_likelihood = self.total_log_likelihood();
        let mut best_restart = None;

        let mut restarts = Vec::new();
        let mut time_left = true;
        let mut restart = 1;
        while restart <= n_restarts && time_left {
            let _span = info_span!("restart", restart).entered();
            let seed = self.options.seed.wrapping_add(restart as u64 - 1);
            self.init_z(seed)?;
            self.warm = false;

            let mut iterations = Vec::new();
            let mut delta = f64::INFINITY;
            let mut previous = f64::NEG_INFINITY;
            while tolerance.non_zero(delta) && iterations.len() < self.options.max_iterations && time_left
            {
                let iteration = iterations.len() + 1;
                let e_step = self.solve_e(budget)?;
                time_left = e_step.success;
                info!(
                    "Restart {} -- iteration {} -- E step -- log likelihood {:.6}",
                    restart, iteration, e_step.log_likelihood
                );
                mode.apply(|| check_k_dollo(&self.e, k))?;
                if e_step.success {
                    mode.apply(|| {
                        check_non_decreasing("E-step", previous, e_step.log_likelihood, &tolerance)
                    })?;
                }

                let z_taxa = self.solve_z_taxa();
                info!(
                    "Restart {} -- iteration {} -- zT step -- log likelihood {:.6}",
                    restart, iteration, z_taxa
                );
                mode.apply(|| {
                    check_non_decreasing("taxon Z-step", e_step.log_likelihood, z_taxa, &tolerance)
                })?;

                let z_characters = self.solve_z_characters();
                info!(
                    "Restart {} -- iteration {} -- zC step -- log likelihood {:.6}",
                    restart, iteration, z_characters
                );
                mode.apply(|| {
                    check_non_decreasing("character Z-step", z_taxa, z_characters, &tolerance)
                })?;

                iterations.push(IterationTrace {
                    e_step: e_step.log_likelihood,
                    z_taxa,
                    z_characters,
                    solver_success: e_step.success,
                });
                delta = z_characters - previous;
                previous = z_characters;
            }
            if !time_left {
                debug!("restart {}: sub-solver budget exhausted", restart);
            }

            if self.log_likelihood > best_likelihood {
                best_e = self.e.clone();
                best_z_taxa = self.z_taxa.clone();
                best_z_characters = self.z_characters.clone();
                best_likelihood = self.log_likelihood;
                best_restart = Some(restarts.len());
            }
            restarts.push(RestartSummary {
                restart,
                seed,
                iterations,
                log_likelihood: self.log_likelihood,
            });
            restart += 1;
        }

        self.e = best_e;
        self.z_taxa = best_z_taxa;
        self.z_characters = best_z_characters;
        self.log_likelihood = best_likelihood;
        info!(
            "Best log likelihood {:.6} over {} restart(s)",
            best_likelihood,
            restarts.len()
        );

        Ok(SolveReport {
            restarts,
            best_restart,
            log_likelihood: best_likelihood,
            budget_exhausted: !time_left,
        })
    }
}

/// Index and value of the maximum, first index on ties
fn argmax(values: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::matrix::Entry;
    use crate::model::cluster::KMeansInitializer;
    use crate::model::solver::{LocalSearchSolver, SubSolution};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn driver(d: &TernaryMatrix, k: u8, s: usize, t: usize) -> CoordinateAscent {
        let options = DriverOptions {
            n_taxon_clusters: s,
            n_character_clusters: t,
            ..DriverOptions::default()
        };
        CoordinateAscent::from_reduction(
            &Reduction::new(d),
            ModelParams::new(0.01, 0.2, k).unwrap(),
            options,
            Box::new(LocalSearchSolver::new()),
            Box::new(KMeansInitializer::default()),
        )
        .unwrap()
    }

    fn random_matrix(rng: &mut StdRng, m: usize, n: usize) -> TernaryMatrix {
        TernaryMatrix::from_fn(m, n, |_, _| match rng.random_range(0..8) {
            0 => Entry::Missing,
            1..=3 => Entry::One,
            _ => Entry::Zero,
        })
    }

    /// Returns a fixed matrix and a fixed success flag
    struct FixedSolver {
        matrix: SolutionMatrix,
        success: bool,
    }

    impl SubSolver for FixedSolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&mut self, _: &SubProblem<'_>, _: &SolverBudget) -> Result<SubSolution> {
            Ok(SubSolution {
                matrix: self.matrix.clone(),
                success: self.success,
            })
        }
    }

    /// Replays its answers in order, repeating the last one
    struct ScriptedSolver {
        answers: Vec<SubSolution>,
        calls: usize,
    }

    impl SubSolver for ScriptedSolver {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn solve(&mut self, _: &SubProblem<'_>, _: &SolverBudget) -> Result<SubSolution> {
            let i = self.calls.min(self.answers.len() - 1);
            self.calls += 1;
            Ok(self.answers[i].clone())
        }
    }

    /// A good fit first, then the all-absent matrix reported with `success`
    fn regressing_solver(success: bool) -> ScriptedSolver {
        let good = SolutionMatrix::from_rows(vec![vec![1, 1], vec![0, 0]]).unwrap();
        ScriptedSolver {
            answers: vec![
                SubSolution {
                    matrix: good,
                    success: true,
                },
                SubSolution {
                    matrix: SolutionMatrix::new(2, 2),
                    success,
                },
            ],
            calls: 0,
        }
    }

    fn with_solver(
        d: &TernaryMatrix,
        solver: impl SubSolver + 'static,
        mode: VerificationMode,
    ) -> CoordinateAscent {
        let options = DriverOptions {
            n_taxon_clusters: 2,
            n_character_clusters: 2,
            verification: mode,
            ..DriverOptions::default()
        };
        CoordinateAscent::from_reduction(
            &Reduction::new(d),
            ModelParams::new(0.01, 0.2, 1).unwrap(),
            options,
            Box::new(solver),
            Box::new(KMeansInitializer::default()),
        )
        .unwrap()
    }

    fn scenario() -> TernaryMatrix {
        TernaryMatrix::from_codes(&[
            vec![0, 1, 1],
            vec![0, 1, 0],
            vec![0, 0, 1],
            vec![0, -1, 1],
        ])
        .unwrap()
    }

    #[test]
    fn test_initial_state_is_all_absent() {
        let ca = driver(&scenario(), 1, 2, 2);
        assert_eq!(ca.solution(), &SolutionMatrix::new(2, 2));
        assert!(ca.taxon_assignment().iter().all(|&h| h == 0));
        assert_relative_eq!(ca.log_likelihood(), ca.total_log_likelihood());
    }

    #[test]
    fn test_scenario_one_iteration() {
        let d = scenario();
        let mut ca = driver(&d, 1, 2, 2);
        ca.options.max_iterations = 1;
        let base = ca.base_log_likelihood();
        assert_relative_eq!(base, 4.0 * (0.8f64).ln(), epsilon = 1e-12);
        let start = ca.total_log_likelihood();

        let report = ca.solve(&SolverBudget::default(), 1).unwrap();
        assert_eq!(report.restarts.len(), 1);
        assert_eq!(report.restarts[0].iterations.len(), 1);
        assert!(ca.taxon_assignment().iter().all(|&h| h < ca.n_taxon_clusters()));
        assert!(ca.character_assignment().iter().all(|&f| f < ca.n_character_clusters()));
        let total = ca.total_log_likelihood();
        assert!(total.is_finite());
        assert!(total <= base);
        assert!(total >= start);
        assert_relative_eq!(total, report.log_likelihood, epsilon = 1e-9);
    }

    #[test]
    fn test_all_missing_equals_base() {
        let d = TernaryMatrix::from_fn(4, 5, |_, _| Entry::Missing);
        let mut ca = driver(&d, 1, 3, 3);
        assert_eq!(ca.base_log_likelihood(), 0.0);
        ca.solve(&SolverBudget::default(), 2).unwrap();
        assert_eq!(ca.total_log_likelihood(), ca.base_log_likelihood());
    }

    #[test]
    fn test_z_ties_go_to_lowest_cluster() {
        let d = TernaryMatrix::from_fn(4, 4, |p, c| {
            if (p + c) % 3 == 0 {
                Entry::Missing
            } else {
                Entry::One
            }
        });
        let mut ca = driver(&d, 1, 3, 3);
        // With E all absent every cluster scores the same
        let s = ca.n_taxon_clusters();
        let t = ca.n_character_clusters();
        let m = ca.matrix().n_taxa();
        let n = ca.matrix().n_characters();
        ca.set_assignments(vec![s - 1; m], vec![t - 1; n]).unwrap();
        ca.solve_z_taxa();
        ca.solve_z_characters();
        assert!(ca.taxon_assignment().iter().all(|&h| h == 0));
        assert!(ca.character_assignment().iter().all(|&f| f == 0));
    }

    #[test]
    fn test_z_phase_never_decreases() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..25 {
            let d = random_matrix(&mut rng, 9, 7);
            let mut ca = driver(&d, 1, 3, 3);
            let (s, t) = (ca.n_taxon_clusters(), ca.n_character_clusters());
            let e = SolutionMatrix::from_rows(
                (0..s)
                    .map(|h| (0..t).map(|f| u8::from(h <= f)).collect())
                    .collect(),
            )
            .unwrap();
            ca.set_solution(e).unwrap();
            let z_taxa = (0..ca.matrix().n_taxa()).map(|_| rng.random_range(0..s)).collect();
            let z_chars = (0..ca.matrix().n_characters())
                .map(|_| rng.random_range(0..t))
                .collect();
            ca.set_assignments(z_taxa, z_chars).unwrap();

            let before = ca.total_log_likelihood();
            let after_taxa = ca.solve_z_taxa();
            assert!(after_taxa >= before - 1e-9);
            assert_relative_eq!(after_taxa, ca.total_log_likelihood(), epsilon = 1e-9);
            let after_chars = ca.solve_z_characters();
            assert!(after_chars >= after_taxa - 1e-9);
            assert_relative_eq!(after_chars, ca.total_log_likelihood(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_likelihood_queries_agree() {
        let mut rng = StdRng::seed_from_u64(2);
        let d = random_matrix(&mut rng, 6, 6);
        let mut ca = driver(&d, 1, 2, 2);
        let (s, t) = (ca.n_taxon_clusters(), ca.n_character_clusters());
        let mut e = SolutionMatrix::new(s, t);
        e.set(s - 1, 0, 1);
        e.set(0, t - 1, 1);
        ca.set_solution(e).unwrap();
        let by_taxa: f64 = (0..ca.matrix().n_taxa())
            .map(|p| ca.taxon_log_likelihood(p, ca.taxon_assignment()[p]))
            .sum();
        let by_chars: f64 = (0..ca.matrix().n_characters())
            .map(|c| ca.character_log_likelihood(c, ca.character_assignment()[c]))
            .sum();
        assert_relative_eq!(by_taxa, by_chars, epsilon = 1e-9);
        assert_relative_eq!(
            ca.total_log_likelihood(),
            ca.base_log_likelihood() + by_taxa,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_setters_validate() {
        let mut ca = driver(&scenario(), 1, 2, 2);
        assert!(ca.set_solution(SolutionMatrix::new(3, 2)).is_err());
        let m = ca.matrix().n_taxa();
        let n = ca.matrix().n_characters();
        assert!(ca.set_assignments(vec![5; m], vec![0; n]).is_err());
        assert!(ca.set_assignments(vec![0; m + 1], vec![0; n]).is_err());
    }

    #[test]
    fn test_strict_mode_rejects_invalid_solution() {
        let mut bad = SolutionMatrix::new(2, 2);
        bad.set(1, 1, 7);
        let solver = FixedSolver {
            matrix: bad,
            success: true,
        };
        let mut ca = with_solver(&scenario(), solver, VerificationMode::Strict);
        let err = ca.solve(&SolverBudget::default(), 1).unwrap_err();
        assert!(matches!(err, KdpfcError::Verification { .. }));
    }

    #[test]
    fn test_warn_mode_continues() {
        let mut bad = SolutionMatrix::new(2, 2);
        bad.set(1, 1, 7);
        let solver = FixedSolver {
            matrix: bad,
            success: true,
        };
        let mut ca = with_solver(&scenario(), solver, VerificationMode::Warn);
        assert!(ca.solve(&SolverBudget::default(), 1).is_ok());
    }

    #[test]
    fn test_exhausted_budget_stops_restarts() {
        let solver = FixedSolver {
            matrix: SolutionMatrix::new(2, 2),
            success: false,
        };
        let mut ca = with_solver(&scenario(), solver, VerificationMode::Strict);
        let report = ca.solve(&SolverBudget::default(), 3).unwrap();
        assert!(report.budget_exhausted);
        assert_eq!(report.restarts.len(), 1);
        assert_eq!(report.restarts[0].iterations.len(), 1);
        assert!(!report.restarts[0].iterations[0].solver_success);
    }

    #[test]
    fn test_wrong_solution_shape_is_algorithm_error() {
        let solver = FixedSolver {
            matrix: SolutionMatrix::new(1, 1),
            success: true,
        };
        let mut ca = with_solver(&scenario(), solver, VerificationMode::Off);
        assert!(matches!(
            ca.solve_e(&SolverBudget::default()),
            Err(KdpfcError::Algorithm { .. })
        ));
    }

    #[test]
    fn test_strict_mode_rejects_regressing_e_step() {
        let mut ca = with_solver(&scenario(), regressing_solver(true), VerificationMode::Strict);
        let err = ca.solve(&SolverBudget::default(), 1).unwrap_err();
        match err {
            KdpfcError::Verification { message } => assert!(message.contains("E-step")),
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_regression_waived_when_budget_exhausted() {
        let mut ca = with_solver(&scenario(), regressing_solver(false), VerificationMode::Strict);
        let report = ca.solve(&SolverBudget::default(), 2).unwrap();
        assert!(report.budget_exhausted);
        assert_eq!(report.restarts.len(), 1);

        let iterations = &report.restarts[0].iterations;
        assert_eq!(iterations.len(), 2);
        assert!(iterations[0].solver_success);
        assert!(!iterations[1].solver_success);
        assert!(iterations[1].e_step < iterations[0].z_characters);
    }
}
