//! # Structural Reduction
//!
//! Classifies the columns and rows of the input matrix whose best solution is
//! fixed by their own content, and collapses the remaining free rows and
//! columns into a smaller matrix of distinct patterns.
//!
//! ## Column classes
//! - `AllZero`: every entry is 0 (never gained)
//! - `AllOne`: every entry is 1 (gained above every taxon)
//! - `SingleOne`: exactly one 1 and every other entry 0 (taxon-specific)
//! - `Free(c)`: anything else, including every column with a MISSING entry;
//!   `c` is the index of its pattern in the reduced matrix
//!
//! ## Row classes
//! - `AllZero`: every entry is 0
//! - `Free(p)`: anything else
//!
//! Two free columns share a reduced index when they agree on every free row;
//! two free rows share one when they agree on every free column.

use std::collections::HashMap;

use crate::data::matrix::{Entry, TernaryMatrix};
use crate::data::solution::{SolutionMatrix, ABSENT, PRESENT};
use crate::error::{KdpfcError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacterClass {
    Free(usize),
    AllZero,
    AllOne,
    SingleOne { taxon: usize },
}

impl CharacterClass {
    pub fn is_fixed(self) -> bool {
        !matches!(self, CharacterClass::Free(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaxonClass {
    Free(usize),
    AllZero,
}

impl TaxonClass {
    pub fn is_fixed(self) -> bool {
        matches!(self, TaxonClass::AllZero)
    }
}

/// Structural mapping plus the reduced matrix of free patterns
#[derive(Clone, Debug)]
pub struct Reduction {
    n_taxa: usize,
    n_characters: usize,
    characters: Vec<CharacterClass>,
    taxa: Vec<TaxonClass>,
    reduced: TernaryMatrix,
}

/// Fixed class of a column, or `None` when it is free
fn fixed_character_class(matrix: &TernaryMatrix, c: usize) -> Option<CharacterClass> {
    let mut n_zero = 0usize;
    let mut n_one = 0usize;
    let mut last_one = 0usize;
    for (p, entry) in matrix.column(c).enumerate() {
        match entry {
            Entry::Zero => n_zero += 1,
            Entry::One => {
                n_one += 1;
                last_one = p;
            }
            Entry::Missing => return None,
        }
    }

    let m = matrix.n_taxa();
    if n_zero == m {
        Some(CharacterClass::AllZero)
    } else if n_one == m {
        Some(CharacterClass::AllOne)
    } else if n_one == 1 {
        Some(CharacterClass::SingleOne { taxon: last_one })
    } else {
        None
    }
}

impl Reduction {
    pub fn new(matrix: &TernaryMatrix) -> Self {
        let n_taxa = matrix.n_taxa();
        let n_characters = matrix.n_characters();

        let zero_rows: Vec<bool> = (0..n_taxa)
            .map(|p| matrix.row(p).iter().all(|&e| e == Entry::Zero))
            .collect();
        let free_taxa: Vec<usize> = (0..n_taxa).filter(|&p| !zero_rows[p]).collect();

        // Collapse free characters by their pattern over free taxa
        let mut char_index: HashMap<Vec<Entry>, usize> = HashMap::new();
        let mut representative_chars = Vec::new();
        let mut characters = Vec::with_capacity(n_characters);
        for c in 0..n_characters {
            if let Some(class) = fixed_character_class(matrix, c) {
                characters.push(class);
                continue;
            }
            let key: Vec<Entry> = free_taxa.iter().map(|&p| matrix.entry(p, c)).collect();
            let idx = match char_index.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = representative_chars.len();
                    representative_chars.push(c);
                    char_index.insert(key, idx);
                    idx
                }
            };
            characters.push(CharacterClass::Free(idx));
        }

        // Collapse free taxa by their pattern over the distinct free characters
        let mut taxon_index: HashMap<Vec<Entry>, usize> = HashMap::new();
        let mut representative_taxa = Vec::new();
        let mut taxa = Vec::with_capacity(n_taxa);
        for p in 0..n_taxa {
            if zero_rows[p] {
                taxa.push(TaxonClass::AllZero);
                continue;
            }
            let key: Vec<Entry> = representative_chars
                .iter()
                .map(|&c| matrix.entry(p, c))
                .collect();
            let idx = match taxon_index.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = representative_taxa.len();
                    representative_taxa.push(p);
                    taxon_index.insert(key, idx);
                    idx
                }
            };
            taxa.push(TaxonClass::Free(idx));
        }

        let reduced = TernaryMatrix::from_fn(
            representative_taxa.len(),
            representative_chars.len(),
            |i, j| matrix.entry(representative_taxa[i], representative_chars[j]),
        );

        Self {
            n_taxa,
            n_characters,
            characters,
            taxa,
            reduced,
        }
    }

    /// Taxa in the original matrix
    pub fn n_taxa(&self) -> usize {
        self.n_taxa
    }

    /// Characters in the original matrix
    pub fn n_characters(&self) -> usize {
        self.n_characters
    }

    /// Per original column
    pub fn character_mapping(&self) -> &[CharacterClass] {
        &self.characters
    }

    /// Per original row
    pub fn taxon_mapping(&self) -> &[TaxonClass] {
        &self.taxa
    }

    /// Matrix of distinct free patterns the driver optimizes over
    pub fn reduced(&self) -> &TernaryMatrix {
        &self.reduced
    }

    pub fn n_fixed_characters(&self) -> usize {
        self.characters.iter().filter(|c| c.is_fixed()).count()
    }

    pub fn n_fixed_taxa(&self) -> usize {
        self.taxa.iter().filter(|t| t.is_fixed()).count()
    }

    /// Map a cluster-level solution back onto the original `m × n` grid.
    ///
    /// Fixed columns and rows receive their deterministic states; each free
    /// cell receives `solution[z_taxa[p'], z_characters[c']]` for its reduced
    /// taxon `p'` and reduced character `c'`.
    pub fn expand(
        &self,
        solution: &SolutionMatrix,
        z_taxa: &[usize],
        z_characters: &[usize],
    ) -> Result<SolutionMatrix> {
        if z_taxa.len() != self.reduced.n_taxa()
            || z_characters.len() != self.reduced.n_characters()
        {
            return Err(KdpfcError::invalid_data(format!(
                "assignments cover {} taxa and {} characters, reduced matrix is {} x {}",
                z_taxa.len(),
                z_characters.len(),
                self.reduced.n_taxa(),
                self.reduced.n_characters()
            )));
        }
        if z_taxa.iter().any(|&h| h >= solution.n_rows())
            || z_characters.iter().any(|&f| f >= solution.n_cols())
        {
            return Err(KdpfcError::invalid_data(
                "cluster assignment exceeds solution dimensions",
            ));
        }

        let mut expanded = SolutionMatrix::new(self.n_taxa, self.n_characters);
        for (p, taxon) in self.taxa.iter().enumerate() {
            for (c, character) in self.characters.iter().enumerate() {
                let state = match (*character, *taxon) {
                    (CharacterClass::AllZero, _) => ABSENT,
                    (CharacterClass::AllOne, _) => PRESENT,
                    (CharacterClass::SingleOne { taxon }, _) => {
                        if taxon == p {
                            PRESENT
                        } else {
                            ABSENT
                        }
                    }
                    (CharacterClass::Free(_), TaxonClass::AllZero) => ABSENT,
                    (CharacterClass::Free(cc), TaxonClass::Free(pp)) => {
                        solution.get(z_taxa[pp], z_characters[cc])
                    }
                };
                expanded.set(p, c, state);
            }
        }
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(codes: &[&[i64]]) -> TernaryMatrix {
        let rows: Vec<Vec<i64>> = codes.iter().map(|r| r.to_vec()).collect();
        TernaryMatrix::from_codes(&rows).unwrap()
    }

    #[test]
    fn test_column_classes() {
        let d = matrix(&[
            &[0, 1, 0, 1, -1],
            &[0, 1, 1, 0, 0],
            &[0, 1, 0, 1, 1],
        ]);
        let r = Reduction::new(&d);
        assert_eq!(r.character_mapping()[0], CharacterClass::AllZero);
        assert_eq!(r.character_mapping()[1], CharacterClass::AllOne);
        assert_eq!(r.character_mapping()[2], CharacterClass::SingleOne { taxon: 1 });
        assert_eq!(r.character_mapping()[3], CharacterClass::Free(0));
        // A MISSING entry keeps a column free
        assert_eq!(r.character_mapping()[4], CharacterClass::Free(1));
        assert_eq!(r.n_fixed_characters(), 3);
    }

    #[test]
    fn test_single_taxon_column_is_all_one() {
        let d = matrix(&[&[1, 0]]);
        let r = Reduction::new(&d);
        assert_eq!(r.character_mapping()[0], CharacterClass::AllOne);
        assert_eq!(r.character_mapping()[1], CharacterClass::AllZero);
    }

    #[test]
    fn test_duplicates_collapse() {
        let d = matrix(&[
            &[1, 1, 0, 1],
            &[0, 0, 0, 0],
            &[1, 1, 1, 1],
            &[0, 0, 1, 1],
            &[1, 1, 0, 1],
        ]);
        let r = Reduction::new(&d);
        assert_eq!(r.taxon_mapping()[1], TaxonClass::AllZero);
        assert_eq!(r.n_fixed_taxa(), 1);
        // Columns 0 and 1 are identical
        assert_eq!(r.character_mapping()[0], r.character_mapping()[1]);
        // Rows 0 and 4 are identical
        assert_eq!(r.taxon_mapping()[0], r.taxon_mapping()[4]);
        assert_eq!(r.reduced().n_taxa(), 3);
        assert_eq!(r.reduced().n_characters(), 3);
    }

    #[test]
    fn test_reduced_entries_match_original() {
        let d = matrix(&[
            &[1, 0, 1, -1],
            &[1, 0, 1, 0],
            &[0, 1, -1, 1],
            &[0, 0, 0, 0],
        ]);
        let r = Reduction::new(&d);
        for (p, t) in r.taxon_mapping().iter().enumerate() {
            for (c, ch) in r.character_mapping().iter().enumerate() {
                if let (TaxonClass::Free(pp), CharacterClass::Free(cc)) = (t, ch) {
                    assert_eq!(r.reduced().entry(*pp, *cc), d.entry(p, c));
                }
            }
        }
    }

    #[test]
    fn test_expand() {
        let d = matrix(&[&[0, 1, 1, 0], &[0, 1, 0, 1], &[0, 0, 0, 0], &[0, 1, 0, 1]]);
        let r = Reduction::new(&d);
        // Free columns: 1 ([1,1,0,1] has three ones) and 3; column 2 is single-one
        assert_eq!(r.character_mapping()[2], CharacterClass::SingleOne { taxon: 0 });
        let e = SolutionMatrix::from_rows(vec![vec![1, 0], vec![1, 1]]).unwrap();
        let n_reduced_taxa = r.reduced().n_taxa();
        let n_reduced_chars = r.reduced().n_characters();
        let z_taxa: Vec<usize> = (0..n_reduced_taxa).map(|p| p.min(1)).collect();
        let z_chars: Vec<usize> = (0..n_reduced_chars).map(|c| c.min(1)).collect();
        let full = r.expand(&e, &z_taxa, &z_chars).unwrap();
        assert_eq!(full.n_rows(), 4);
        assert_eq!(full.n_cols(), 4);
        assert_eq!(full.column(0), vec![0, 0, 0, 0]);
        assert_eq!(full.column(2), vec![1, 0, 0, 0]);
        assert_eq!(full.row(2), &[0, 0, 0, 0]);
        assert_eq!(full.get(1, 3), 1);
        assert_eq!(full.get(0, 3), 0);
    }

    #[test]
    fn test_expand_rejects_bad_assignment() {
        let d = matrix(&[&[1, 0], &[0, 1], &[1, 1]]);
        let r = Reduction::new(&d);
        let e = SolutionMatrix::new(1, 1);
        assert!(r.expand(&e, &[0], &[0]).is_err());
    }
}
