//! # Reconstruction Pipeline
//!
//! ## Role
//! End-to-end run of the command line tool:
//! 1. Read the input matrix
//! 2. Classify fixed rows/columns and collapse duplicates
//! 3. Run coordinate ascent with the selected sub-solver over the restarts
//! 4. Write `E`, `zT` and `zC`, optionally the expanded matrix too

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{info, info_span, instrument, warn};

use crate::config::Config;
use crate::data::reduction::Reduction;
use crate::data::solution::SolutionMatrix;
use crate::error::Result;
use crate::io::matrix::{read_ternary_matrix_file, write_solution_matrix};
use crate::io::reconstruction::{write_reconstruction, Reconstruction};
use crate::model::cluster::KMeansInitializer;
use crate::model::solver::{ExactSolver, LocalSearchSolver, SubSolver};
use crate::pipelines::coordinate_ascent::{CoordinateAscent, SolveReport};

pub struct ReconstructionPipeline {
    config: Config,
}

impl ReconstructionPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[instrument(name = "reconstruction", skip(self), fields(input = ?self.config.input))]
    pub fn run(&mut self) -> Result<SolveReport> {
        let d = read_ternary_matrix_file(&self.config.input)?;
        info!(
            "Input: {} taxa, {} characters, {} missing entries",
            d.n_taxa(),
            d.n_characters(),
            d.n_missing()
        );

        let reduction = info_span!("reduce").in_scope(|| Reduction::new(&d));
        info!(
            "Reduced matrix: {} taxa, {} characters",
            reduction.reduced().n_taxa(),
            reduction.reduced().n_characters()
        );

        let solver: Box<dyn SubSolver> = if self.config.exact {
            Box::new(ExactSolver::new())
        } else {
            Box::new(LocalSearchSolver::new())
        };
        let mut driver = CoordinateAscent::from_reduction(
            &reduction,
            self.config.model_params()?,
            self.config.driver_options(),
            solver,
            Box::new(KMeansInitializer::default()),
        )?;
        info!(
            "Clusters: {} taxon, {} character; sub-solver: {}",
            driver.n_taxon_clusters(),
            driver.n_character_clusters(),
            if self.config.exact { "exact" } else { "local-search" }
        );

        let report = driver.solve(&self.config.solver_budget(), self.config.restarts)?;
        if report.budget_exhausted {
            warn!("Time limit reached, refinement stopped early");
        }

        let rec = driver.reconstruction();
        match &self.config.output {
            Some(path) => {
                let mut out = BufWriter::new(File::create(path)?);
                write_reconstruction(&mut out, &rec)?;
                out.flush()?;
            }
            None => {
                let mut out = io::stdout().lock();
                write_reconstruction(&mut out, &rec)?;
                out.flush()?;
            }
        }

        if let Some(path) = &self.config.expanded {
            let full = expand(&reduction, &rec)?;
            write_matrix_file(path, &full)?;
            info!("Expanded solution written to {:?}", path);
        }

        Ok(report)
    }
}

fn expand(reduction: &Reduction, rec: &Reconstruction) -> Result<SolutionMatrix> {
    reduction.expand(&rec.matrix, &rec.taxa, &rec.characters)
}

fn write_matrix_file(path: &Path, e: &SolutionMatrix) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_solution_matrix(&mut out, e)?;
    out.flush()?;
    Ok(())
}
