//! # I/O Module
//!
//! Text formats of the input matrix, solution matrices and cluster
//! assignments. Parse errors carry 1-based line numbers.

pub mod assignment;
pub mod lines;
pub mod matrix;
pub mod reconstruction;

pub use assignment::{parse_assignment, read_assignment, write_assignment};
pub use lines::LineReader;
pub use matrix::{
    read_solution_matrix, read_ternary_matrix, read_ternary_matrix_file, write_solution_matrix,
    write_ternary_matrix,
};
pub use reconstruction::{read_reconstruction, write_reconstruction, Reconstruction};
