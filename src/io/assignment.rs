//! # Assignment Sequences
//!
//! Text format of `zT` and `zC`:
//!
//! ```text
//! <len> #<label>
//! <v_0> <v_1> ... <v_len-1>
//! ```
//!
//! The values line immediately follows the header. A zero-length sequence
//! may omit it.

use std::io::{BufRead, Cursor, Write};

use crate::error::{KdpfcError, Result};
use crate::io::lines::{parse_count, LineReader};

/// Write `values` under a `#label` header
pub fn write_assignment<W: Write>(out: &mut W, values: &[usize], label: &str) -> Result<()> {
    writeln!(out, "{} #{}", values.len(), label)?;
    let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    writeln!(out, "{}", line.join(" "))?;
    Ok(())
}

/// Read one sequence: the header is the next line with content, the values
/// are on the line right after it
pub fn read_assignment<R: BufRead>(lines: &mut LineReader<R>) -> Result<Vec<usize>> {
    let (header_num, header) = lines.expect_non_empty("an assignment header")?;
    let len = parse_count(header_num, header)?;

    let (line_num, line) = match lines.next_line()? {
        Some(next) => next,
        None if len == 0 => return Ok(Vec::new()),
        None => {
            return Err(KdpfcError::parse(
                header_num + 1,
                format!("expected {} values, found end of input", len),
            ))
        }
    };

    let mut values = Vec::with_capacity(len.min(line.len() / 2 + 1));
    for token in line.split_whitespace() {
        if values.len() == len {
            return Err(KdpfcError::parse(
                line_num,
                format!("more than the declared {} values", len),
            ));
        }
        let value: usize = token
            .parse()
            .map_err(|_| KdpfcError::parse(line_num, format!("invalid value '{}'", token)))?;
        values.push(value);
    }
    if values.len() < len {
        return Err(KdpfcError::parse(
            line_num,
            format!("expected {} values, found {}", len, values.len()),
        ));
    }
    Ok(values)
}

/// Read one sequence from a string
pub fn parse_assignment(text: &str) -> Result<Vec<usize>> {
    read_assignment(&mut LineReader::new(Cursor::new(text)))
}
