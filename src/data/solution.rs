//! # Cluster-Level Solution Matrix
//!
//! The `s × t` matrix `E` fit by the sub-solver. Rows are taxon clusters,
//! columns are character clusters, and each entry is a k-Dollo state:
//!
//! ```text
//! 0        character never gained in this taxon cluster
//! 1        character present
//! 2..=k+1  character lost, by loss event (state - 1)
//! ```
//!
//! ## k-Dollo structure
//! Every column defines a *gain clade* (rows with state >= 1) and one *loss
//! clade* per loss label (rows with exactly that state). A matrix is a valid
//! k-Dollo phylogeny matrix iff all states are in `0..=k+1` and the family of
//! all clades over all columns is laminar: any two clades are either nested
//! or disjoint. A conflicting pair is reported with a three-row witness
//! `[in both, only in first, only in second]`.

use std::fmt;

use crate::error::{KdpfcError, Result};

/// Never gained
pub const ABSENT: u8 = 0;
/// Present
pub const PRESENT: u8 = 1;
/// Label of the first loss event
pub const FIRST_LOSS: u8 = 2;

/// Whether the likelihood model sees a state as present
///
/// Only state 1 is present. Lost characters are absent in the descendants of
/// the loss, exactly like characters that were never gained.
#[inline]
pub fn is_present(state: u8) -> bool {
    state == PRESENT
}

/// A clade induced by one column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CladeKind {
    /// Rows with state >= 1
    Gain,
    /// Rows with exactly this loss state
    Loss(u8),
}

impl CladeKind {
    #[inline]
    pub fn contains(self, state: u8) -> bool {
        match self {
            CladeKind::Gain => state >= PRESENT,
            CladeKind::Loss(label) => state == label,
        }
    }
}

impl fmt::Display for CladeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CladeKind::Gain => write!(f, "gain"),
            CladeKind::Loss(label) => write!(f, "loss {}", label),
        }
    }
}

/// One structural defect of a solution matrix
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    StateOutOfRange {
        row: usize,
        col: usize,
        state: u8,
        max_state: u8,
    },
    Conflict {
        first_col: usize,
        first: CladeKind,
        second_col: usize,
        second: CladeKind,
        /// `[in both, only in first, only in second]`
        witness: [usize; 3],
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::StateOutOfRange {
                row,
                col,
                state,
                max_state,
            } => write!(
                f,
                "state {} at ({}, {}) exceeds maximum state {}",
                state, row, col, max_state
            ),
            Violation::Conflict {
                first_col,
                first,
                second_col,
                second,
                witness,
            } => write!(
                f,
                "{} clade of column {} and {} clade of column {} overlap without nesting (rows {}, {}, {})",
                first, first_col, second, second_col, witness[0], witness[1], witness[2]
            ),
        }
    }
}

/// Clades of one column: the gain clade (if non-empty) followed by every
/// loss clade in order of first appearance.
pub fn clades(column: &[u8]) -> Vec<CladeKind> {
    let mut out = Vec::new();
    if column.iter().any(|&s| s >= PRESENT) {
        out.push(CladeKind::Gain);
    }
    for &state in column {
        if state >= FIRST_LOSS && !out.contains(&CladeKind::Loss(state)) {
            out.push(CladeKind::Loss(state));
        }
    }
    out
}

/// First pair of clades of two columns that overlap without nesting
pub fn find_conflict(a: &[u8], b: &[u8]) -> Option<(CladeKind, CladeKind, [usize; 3])> {
    debug_assert_eq!(a.len(), b.len());
    let clades_b = clades(b);
    for ka in clades(a) {
        for &kb in &clades_b {
            let mut both = None;
            let mut only_a = None;
            let mut only_b = None;
            for (r, (&sa, &sb)) in a.iter().zip(b).enumerate() {
                match (ka.contains(sa), kb.contains(sb)) {
                    (true, true) if both.is_none() => both = Some(r),
                    (true, false) if only_a.is_none() => only_a = Some(r),
                    (false, true) if only_b.is_none() => only_b = Some(r),
                    _ => {}
                }
            }
            if let (Some(x), Some(y), Some(z)) = (both, only_a, only_b) {
                return Some((ka, kb, [x, y, z]));
            }
        }
    }
    None
}

/// Whether two columns can coexist in one k-Dollo phylogeny
#[inline]
pub fn columns_compatible(a: &[u8], b: &[u8]) -> bool {
    find_conflict(a, b).is_none()
}

/// Dense `s × t` state matrix, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SolutionMatrix {
    n_rows: usize,
    n_cols: usize,
    states: Vec<u8>,
}

impl SolutionMatrix {
    /// All-absent matrix; always a valid k-Dollo matrix
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            states: vec![ABSENT; n_rows * n_cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut states = Vec::with_capacity(n_rows * n_cols);
        for (h, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(KdpfcError::invalid_data(format!(
                    "solution row {} has {} entries, expected {}",
                    h,
                    row.len(),
                    n_cols
                )));
            }
            states.extend(row);
        }
        Ok(Self {
            n_rows,
            n_cols,
            states,
        })
    }

    /// Build column by column
    pub fn from_columns(n_rows: usize, columns: &[&[u8]]) -> Self {
        let mut out = Self::new(n_rows, columns.len());
        for (f, column) in columns.iter().enumerate() {
            out.set_column(f, column);
        }
        out
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn get(&self, h: usize, f: usize) -> u8 {
        debug_assert!(h < self.n_rows && f < self.n_cols);
        self.states[h * self.n_cols + f]
    }

    #[inline]
    pub fn set(&mut self, h: usize, f: usize, state: u8) {
        debug_assert!(h < self.n_rows && f < self.n_cols);
        self.states[h * self.n_cols + f] = state;
    }

    pub fn row(&self, h: usize) -> &[u8] {
        let start = h * self.n_cols;
        &self.states[start..start + self.n_cols]
    }

    /// Copy of one column
    pub fn column(&self, f: usize) -> Vec<u8> {
        (0..self.n_rows).map(|h| self.get(h, f)).collect()
    }

    pub fn set_column(&mut self, f: usize, column: &[u8]) {
        debug_assert_eq!(column.len(), self.n_rows);
        for (h, &state) in column.iter().enumerate() {
            self.set(h, f, state);
        }
    }

    /// Whether a replacement for column `f` is compatible with every other column
    pub fn column_fits(&self, f: usize, column: &[u8]) -> bool {
        (0..self.n_cols)
            .filter(|&g| g != f)
            .all(|g| columns_compatible(column, &self.column(g)))
    }

    /// Every k-Dollo violation, states first, then clade conflicts by column pair
    pub fn identify_violations(&self, k: u8) -> Vec<Violation> {
        let max_state = k.saturating_add(1);
        let mut violations = Vec::new();

        for h in 0..self.n_rows {
            for f in 0..self.n_cols {
                let state = self.get(h, f);
                if state > max_state {
                    violations.push(Violation::StateOutOfRange {
                        row: h,
                        col: f,
                        state,
                        max_state,
                    });
                }
            }
        }

        let columns: Vec<Vec<u8>> = (0..self.n_cols).map(|f| self.column(f)).collect();
        for c in 0..self.n_cols {
            for d in (c + 1)..self.n_cols {
                if let Some((first, second, witness)) = find_conflict(&columns[c], &columns[d]) {
                    violations.push(Violation::Conflict {
                        first_col: c,
                        first,
                        second_col: d,
                        second,
                        witness,
                    });
                }
            }
        }

        violations
    }

    pub fn is_k_dollo(&self, k: u8) -> bool {
        self.identify_violations(k).is_empty()
    }
}
