//! # Line Reader
//!
//! Buffered line access with a 1-based line counter, shared by every text
//! format so parse errors name the line they refer to.

use std::io::BufRead;

use crate::error::{KdpfcError, Result};

pub struct LineReader<R> {
    reader: R,
    line_num: usize,
    buf: String,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far, which is also the 1-based number of
    /// the last line returned
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Next line without its terminator, or `None` at end of input
    pub fn next_line(&mut self) -> Result<Option<(usize, &str)>> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_num += 1;
        let line = self.buf.trim_end_matches(['\n', '\r']);
        Ok(Some((self.line_num, line)))
    }

    /// Next line with content, skipping blank lines
    pub fn next_non_empty(&mut self) -> Result<Option<(usize, &str)>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_num += 1;
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        Ok(Some((self.line_num, self.buf.trim())))
    }

    /// Next line with content; end of input is a parse error mentioning `what`
    pub fn expect_non_empty(&mut self, what: &str) -> Result<(usize, &str)> {
        let next = self.line_num + 1;
        self.next_non_empty()?
            .ok_or_else(|| KdpfcError::parse(next, format!("unexpected end of input, expected {}", what)))
    }
}

/// Parse a `<count> #<label>` header line; negative counts are rejected
pub fn parse_count(line_num: usize, line: &str) -> Result<usize> {
    let token = line
        .split_whitespace()
        .next()
        .ok_or_else(|| KdpfcError::parse(line_num, "missing count"))?;
    let value: i64 = token
        .parse()
        .map_err(|_| KdpfcError::parse(line_num, format!("invalid count '{}'", token)))?;
    if value < 0 {
        return Err(KdpfcError::parse(
            line_num,
            format!("count must be non-negative, got {}", value),
        ));
    }
    usize::try_from(value)
        .map_err(|_| KdpfcError::parse(line_num, format!("count {} is too large", value)))
}
