//! Line-oriented parsing of model output.
//!
//! The filter and scorer both round-trip numbered candidates through the
//! model and get pipe-delimited rows back. Parsing is per-line: a malformed
//! line is a typed error the caller logs and skips, never a failed response.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("expected at least {expected} fields, got {got}")]
    TooFewFields { expected: usize, got: usize },

    #[error("leading field {0:?} is not an index")]
    BadIndex(String),
}

/// A parsed `INDEX | field | field | ...` row. The index is 1-based, as
/// presented to the model; `fields` holds everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipedRow {
    pub index: usize,
    pub fields: Vec<String>,
}

/// Parse one pipe-delimited row. `min_fields` counts the index field.
pub fn parse_piped_row(line: &str, min_fields: usize) -> Result<PipedRow, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < min_fields {
        return Err(ParseError::TooFewFields {
            expected: min_fields,
            got: fields.len(),
        });
    }

    // Models sometimes render "3." or "3)" for the index.
    let index_str = fields[0].trim_end_matches(['.', ')']).trim();
    let index: usize = index_str
        .parse()
        .map_err(|_| ParseError::BadIndex(fields[0].to_string()))?;

    Ok(PipedRow {
        index,
        fields: fields[1..].iter().map(|f| f.to_string()).collect(),
    })
}

/// Loose fallback for responses that ignored the requested format: numbered
/// (`1. text`) or bulleted (`- text`) lines, keeping lines longer than
/// `min_len` after the marker is stripped. Unmarked prose is ignored.
pub fn parse_loose_lines(text: &str, min_len: usize) -> Vec<String> {
    text.lines()
        .filter_map(|line| strip_list_marker(line.trim()))
        .filter(|stripped| stripped.len() > min_len)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> Option<&str> {
    let without_digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() < line.len() {
        // Had a number prefix — also consume its punctuation.
        return Some(without_digits.trim_start_matches(['.', ')']).trim_start());
    }
    let without_bullet = line.trim_start_matches(['-', '*', '•']);
    (without_bullet.len() < line.len()).then(|| without_bullet.trim_start())
}
