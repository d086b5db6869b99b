//! # Base Likelihood and Multiplicities
//!
//! Precomputed once when the driver is built. Structurally fixed columns and
//! rows have a deterministic best state, so their log-likelihood is folded
//! into a single scalar `baseL` and they never enter the iterative
//! optimization. The remaining free cells are weighted by how many original
//! cells each reduced cell stands for.
//!
//! With `m` original taxa, `n` original characters and `n_fixed` fixed
//! columns:
//!
//! ```text
//! all-zero column     m * log(1-b)
//! all-one column      m * log(1-a)
//! single-one column   (m-1) * log(1-b) + log(1-a)
//! all-zero row        (n - n_fixed) * log(1-b)
//! ```
//!
//! All-zero rows skip the fixed columns, which are already counted.

use crate::data::reduction::{CharacterClass, TaxonClass};
use crate::error::{KdpfcError, Result};
use crate::model::parameters::ModelParams;

/// Per reduced cell: (original taxa mapped to the row) × (original
/// characters mapped to the column)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multiplicities {
    n_taxa: usize,
    n_characters: usize,
    weights: Vec<u64>,
}

impl Multiplicities {
    /// Uniform weights, used when the matrix was not reduced
    pub fn uniform(n_taxa: usize, n_characters: usize, weight: u64) -> Self {
        Self {
            n_taxa,
            n_characters,
            weights: vec![weight; n_taxa * n_characters],
        }
    }

    #[inline]
    pub fn get(&self, p: usize, c: usize) -> u64 {
        self.weights[p * self.n_characters + c]
    }

    pub fn n_taxa(&self) -> usize {
        self.n_taxa
    }

    pub fn n_characters(&self) -> usize {
        self.n_characters
    }

    /// Sum over all cells; equals the number of free original cells
    pub fn total(&self) -> u64 {
        self.weights.iter().sum()
    }
}

/// `baseL` together with the multiplicity matrix
#[derive(Clone, Debug)]
pub struct BaseLikelihood {
    value: f64,
    multiplicities: Multiplicities,
    n_fixed_characters: usize,
    n_fixed_taxa: usize,
}

impl BaseLikelihood {
    /// Fold the fixed rows/columns into `baseL` and build multiplicities over
    /// the reduced `n_taxa × n_characters` space.
    pub fn new(
        params: &ModelParams,
        characters: &[CharacterClass],
        taxa: &[TaxonClass],
        n_taxa: usize,
        n_characters: usize,
    ) -> Result<Self> {
        let m = taxa.len();
        let n = characters.len();
        let log_tn = params.log_true_negative();
        let log_tp = params.log_true_positive();

        let mut value = 0.0;
        let mut n_fixed_characters = 0usize;
        let mut char_counts = vec![0u64; n_characters];
        for class in characters {
            match *class {
                CharacterClass::AllZero => {
                    value += log_tn * m as f64;
                    n_fixed_characters += 1;
                }
                CharacterClass::AllOne => {
                    value += log_tp * m as f64;
                    n_fixed_characters += 1;
                }
                CharacterClass::SingleOne { .. } => {
                    value += log_tn * m.saturating_sub(1) as f64 + log_tp;
                    n_fixed_characters += 1;
                }
                CharacterClass::Free(c) => {
                    let slot = char_counts.get_mut(c).ok_or_else(|| {
                        KdpfcError::invalid_data(format!(
                            "character maps to reduced index {} of {}",
                            c, n_characters
                        ))
                    })?;
                    *slot += 1;
                }
            }
        }

        let mut n_fixed_taxa = 0usize;
        let mut taxon_counts = vec![0u64; n_taxa];
        for class in taxa {
            match *class {
                TaxonClass::AllZero => {
                    value += log_tn * (n - n_fixed_characters) as f64;
                    n_fixed_taxa += 1;
                }
                TaxonClass::Free(p) => {
                    let slot = taxon_counts.get_mut(p).ok_or_else(|| {
                        KdpfcError::invalid_data(format!(
                            "taxon maps to reduced index {} of {}",
                            p, n_taxa
                        ))
                    })?;
                    *slot += 1;
                }
            }
        }

        let mut weights = Vec::with_capacity(n_taxa * n_characters);
        for &n_orig_taxa in &taxon_counts {
            for &n_orig_chars in &char_counts {
                weights.push(n_orig_taxa * n_orig_chars);
            }
        }

        Ok(Self {
            value,
            multiplicities: Multiplicities {
                n_taxa,
                n_characters,
                weights,
            },
            n_fixed_characters,
            n_fixed_taxa,
        })
    }

    /// `baseL`
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn multiplicities(&self) -> &Multiplicities {
        &self.multiplicities
    }

    pub fn n_fixed_characters(&self) -> usize {
        self.n_fixed_characters
    }

    pub fn n_fixed_taxa(&self) -> usize {
        self.n_fixed_taxa
    }
}
