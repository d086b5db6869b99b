//! # Reconstruction Output
//!
//! The file written by the pipeline: the solution matrix `E`, then `zT`
//! under `#taxa`, then `zC` under `#characters`.

use std::io::{BufRead, Write};

use crate::data::solution::SolutionMatrix;
use crate::error::{KdpfcError, Result};
use crate::io::assignment::{read_assignment, write_assignment};
use crate::io::lines::LineReader;
use crate::io::matrix::{read_solution_matrix, write_solution_matrix};

/// A cluster-level solution with its assignments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconstruction {
    pub matrix: SolutionMatrix,
    /// Reduced taxon -> taxon cluster
    pub taxa: Vec<usize>,
    /// Reduced character -> character cluster
    pub characters: Vec<usize>,
}

pub fn write_reconstruction<W: Write>(out: &mut W, rec: &Reconstruction) -> Result<()> {
    write_solution_matrix(out, &rec.matrix)?;
    write_assignment(out, &rec.taxa, "taxa")?;
    write_assignment(out, &rec.characters, "characters")?;
    Ok(())
}

/// Read a reconstruction back; assignments must index into the matrix
pub fn read_reconstruction<R: BufRead>(reader: R, max_state: u8) -> Result<Reconstruction> {
    let mut lines = LineReader::new(reader);
    let matrix = read_solution_matrix(&mut lines, max_state)?;
    let taxa = read_assignment(&mut lines)?;
    let characters = read_assignment(&mut lines)?;

    if taxa.iter().any(|&h| h >= matrix.n_rows()) {
        return Err(KdpfcError::invalid_data(format!(
            "taxon assignment exceeds the {} rows of the solution",
            matrix.n_rows()
        )));
    }
    if characters.iter().any(|&f| f >= matrix.n_cols()) {
        return Err(KdpfcError::invalid_data(format!(
            "character assignment exceeds the {} columns of the solution",
            matrix.n_cols()
        )));
    }

    Ok(Reconstruction {
        matrix,
        taxa,
        characters,
    })
}
