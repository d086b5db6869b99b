//! # Matrix Text Format
//!
//! ```text
//! <m> #taxa
//! <n> #characters
//! <m lines of n whitespace-separated entries>
//! ```
//!
//! Input matrices hold `0`, `1` and `-1` (MISSING); solution matrices hold
//! k-Dollo states. Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::info_span;

use crate::data::matrix::{Entry, TernaryMatrix};
use crate::data::solution::SolutionMatrix;
use crate::error::{KdpfcError, Result};
use crate::io::lines::{parse_count, LineReader};

/// Header pair, then `m` rows parsed entry by entry
fn read_rows<R: BufRead, T>(
    lines: &mut LineReader<R>,
    mut parse: impl FnMut(&str) -> Option<T>,
) -> Result<(usize, usize, Vec<T>)> {
    let (num, line) = lines.expect_non_empty("the taxon count")?;
    let m = parse_count(num, line)?;
    let (num, line) = lines.expect_non_empty("the character count")?;
    let n = parse_count(num, line)?;

    // Header counts are untrusted; entries grow as rows are actually read
    let mut entries = Vec::new();
    for p in 0..m {
        let (num, line) = lines.expect_non_empty(&format!("row {} of {}", p + 1, m))?;
        let before = entries.len();
        for token in line.split_whitespace() {
            let value = parse(token)
                .ok_or_else(|| KdpfcError::parse(num, format!("invalid entry '{}'", token)))?;
            entries.push(value);
        }
        let found = entries.len() - before;
        if found != n {
            return Err(KdpfcError::parse(
                num,
                format!("expected {} entries, found {}", n, found),
            ));
        }
    }
    Ok((m, n, entries))
}

/// Read an input matrix
pub fn read_ternary_matrix<R: BufRead>(lines: &mut LineReader<R>) -> Result<TernaryMatrix> {
    let (m, n, entries) = read_rows(lines, |token| {
        token.parse::<i64>().ok().and_then(Entry::from_code)
    })?;
    Ok(TernaryMatrix::from_fn(m, n, |p, c| entries[p * n + c]))
}

/// Read an input matrix from a file
pub fn read_ternary_matrix_file(path: &Path) -> Result<TernaryMatrix> {
    info_span!("read_matrix", path = ?path).in_scope(|| {
        if !path.exists() {
            return Err(KdpfcError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        read_ternary_matrix(&mut LineReader::new(BufReader::new(file)))
    })
}

pub fn write_ternary_matrix<W: Write>(out: &mut W, matrix: &TernaryMatrix) -> Result<()> {
    writeln!(out, "{} #taxa", matrix.n_taxa())?;
    writeln!(out, "{} #characters", matrix.n_characters())?;
    for p in 0..matrix.n_taxa() {
        let row: Vec<String> = matrix.row(p).iter().map(|e| e.code().to_string()).collect();
        writeln!(out, "{}", row.join(" "))?;
    }
    Ok(())
}

/// Read a solution matrix; states above `max_state` are rejected
pub fn read_solution_matrix<R: BufRead>(
    lines: &mut LineReader<R>,
    max_state: u8,
) -> Result<SolutionMatrix> {
    let (m, n, states) = read_rows(lines, |token| {
        token.parse::<u8>().ok().filter(|&s| s <= max_state)
    })?;
    let mut e = SolutionMatrix::new(m, n);
    for h in 0..m {
        for f in 0..n {
            e.set(h, f, states[h * n + f]);
        }
    }
    Ok(e)
}

pub fn write_solution_matrix<W: Write>(out: &mut W, e: &SolutionMatrix) -> Result<()> {
    writeln!(out, "{} #taxa", e.n_rows())?;
    writeln!(out, "{} #characters", e.n_cols())?;
    for h in 0..e.n_rows() {
        let row: Vec<String> = e.row(h).iter().map(|s| s.to_string()).collect();
        writeln!(out, "{}", row.join(" "))?;
    }
    Ok(())
}
