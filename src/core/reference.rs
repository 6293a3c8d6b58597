//! A1-style cell and range references
//!
//! Rows and columns are 1-based. Columns use bijective base-26 letters:
//! A = 1 .. Z = 26, AA = 27, AZ = 52, BA = 53, and so on without an upper
//! bound other than `u32`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::GridcalcError;

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$?(?<letters>[A-Za-z]+)\$?(?<digits>[0-9]+)$").expect("A1 pattern is valid")
    })
}

/// Position of a cell within a sheet.
///
/// Ordering is row-major, which is also the order range values are read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn is_valid(&self) -> bool {
        self.row >= 1 && self.col >= 1
    }

    /// Parse `A1`, `b12`, `$C$3` or `AA100`. Returns None on anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = a1_re().captures(text)?;
        let col = letters_to_col(&caps["letters"])?;
        let row = caps["digits"].parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self::new(row, col))
    }
}

impl FromStr for CellCoord {
    type Err = GridcalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| GridcalcError::InvalidReference(s.to_string()))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row)
    }
}

/// Convert column letters to a 1-based column number (`A` -> 1, `AA` -> 27).
pub fn letters_to_col(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// Convert a 1-based column number to letters (1 -> `A`, 27 -> `AA`).
pub fn col_to_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// A rectangular block of cells, normalised so `start` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRef {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl RangeRef {
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        Self {
            start: CellCoord::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellCoord::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn rows(&self) -> usize {
        (self.end.row - self.start.row) as usize + 1
    }

    pub fn cols(&self) -> usize {
        (self.end.col - self.start.col) as usize + 1
    }

    pub fn len(&self) -> usize {
        self.rows().saturating_mul(self.cols())
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.start.row..=self.end.row).contains(&coord.row)
            && (self.start.col..=self.end.col).contains(&coord.col)
    }

    /// Cells in row-major order: left to right, then top to bottom.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellCoord::new(row, col)))
    }
}

impl FromStr for RangeRef {
    type Err = GridcalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| GridcalcError::InvalidReference(s.to_string()))?;
        Ok(Self::new(a.trim().parse()?, b.trim().parse()?))
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// What a formula reads: one cell or a block of cells on the current sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reference {
    Cell(CellCoord),
    Range(RangeRef),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Cell(c) => c.fmt(f),
            Reference::Range(r) => r.fmt(f),
        }
    }
}
