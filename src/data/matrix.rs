//! # Ternary Input Matrix
//!
//! The observed taxa × characters matrix. Every entry is 0, 1 or MISSING.

use crate::error::{KdpfcError, Result};

/// One observed entry of the input matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Entry {
    #[default]
    Zero,
    One,
    Missing,
}

impl Entry {
    /// Decode the text-format code (`0`, `1`, `-1`)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Entry::Zero),
            1 => Some(Entry::One),
            -1 => Some(Entry::Missing),
            _ => None,
        }
    }

    /// Text-format code
    pub fn code(self) -> i8 {
        match self {
            Entry::Zero => 0,
            Entry::One => 1,
            Entry::Missing => -1,
        }
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self == Entry::Missing
    }
}

/// Dense m × n matrix of observed entries, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TernaryMatrix {
    n_taxa: usize,
    n_characters: usize,
    entries: Vec<Entry>,
}

impl TernaryMatrix {
    /// All-zero matrix
    pub fn new(n_taxa: usize, n_characters: usize) -> Self {
        Self {
            n_taxa,
            n_characters,
            entries: vec![Entry::Zero; n_taxa * n_characters],
        }
    }

    /// Build from a generator `(taxon, character) -> Entry`
    pub fn from_fn(
        n_taxa: usize,
        n_characters: usize,
        mut f: impl FnMut(usize, usize) -> Entry,
    ) -> Self {
        let mut entries = Vec::with_capacity(n_taxa * n_characters);
        for p in 0..n_taxa {
            for c in 0..n_characters {
                entries.push(f(p, c));
            }
        }
        Self {
            n_taxa,
            n_characters,
            entries,
        }
    }

    /// Build from rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<Entry>>) -> Result<Self> {
        let n_taxa = rows.len();
        let n_characters = rows.first().map_or(0, |r| r.len());
        let mut entries = Vec::with_capacity(n_taxa * n_characters);
        for (p, row) in rows.into_iter().enumerate() {
            if row.len() != n_characters {
                return Err(KdpfcError::invalid_data(format!(
                    "taxon {} has {} entries, expected {}",
                    p,
                    row.len(),
                    n_characters
                )));
            }
            entries.extend(row);
        }
        Ok(Self {
            n_taxa,
            n_characters,
            entries,
        })
    }

    /// Build from text-format codes (`0`, `1`, `-1`)
    pub fn from_codes(rows: &[Vec<i64>]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&code| {
                        Entry::from_code(code).ok_or_else(|| {
                            KdpfcError::invalid_data(format!("invalid entry code {}", code))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }

    /// Number of taxa (rows)
    #[inline]
    pub fn n_taxa(&self) -> usize {
        self.n_taxa
    }

    /// Number of characters (columns)
    #[inline]
    pub fn n_characters(&self) -> usize {
        self.n_characters
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at (taxon, character)
    #[inline]
    pub fn entry(&self, p: usize, c: usize) -> Entry {
        debug_assert!(p < self.n_taxa && c < self.n_characters);
        self.entries[p * self.n_characters + c]
    }

    pub fn set_entry(&mut self, p: usize, c: usize, entry: Entry) {
        debug_assert!(p < self.n_taxa && c < self.n_characters);
        self.entries[p * self.n_characters + c] = entry;
    }

    /// All entries of one taxon
    #[inline]
    pub fn row(&self, p: usize) -> &[Entry] {
        let start = p * self.n_characters;
        &self.entries[start..start + self.n_characters]
    }

    /// All entries of one character, top to bottom
    pub fn column(&self, c: usize) -> impl Iterator<Item = Entry> + '_ {
        (0..self.n_taxa).map(move |p| self.entry(p, c))
    }

    /// Number of MISSING entries
    pub fn n_missing(&self) -> usize {
        self.entries.iter().filter(|e| e.is_missing()).count()
    }
}
