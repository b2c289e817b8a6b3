//! Cell types stored in variant matrices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest valid genotype code.
pub const MIN_CODE: i8 = -4;
/// Highest valid genotype code.
pub const MAX_CODE: i8 = 3;

/// A single allele call in the allele matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Allele {
    A,
    C,
    G,
    T,
    /// Masked or missing call.
    N,
    /// Deletion.
    Gap,
}

impl Allele {
    /// Parse an allele from its one-character encoding.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'C' => Some(Self::C),
            'G' => Some(Self::G),
            'T' => Some(Self::T),
            'N' => Some(Self::N),
            '-' => Some(Self::Gap),
            _ => None,
        }
    }

    /// One-character encoding.
    pub fn as_char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::T => 'T',
            Self::N => 'N',
            Self::Gap => '-',
        }
    }

    /// True for the four nucleotides.
    pub fn is_nucleotide(&self) -> bool {
        matches!(self, Self::A | Self::C | Self::G | Self::T)
    }

    /// True for masked calls.
    pub fn is_masked(&self) -> bool {
        matches!(self, Self::N)
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A value that can be stored in a [`VariantMatrix`](super::VariantMatrix) cell.
///
/// Implementors define how a cell is read from and written to TSV text.
pub trait Cell: nalgebra::Scalar + Send + Sync {
    /// Parse a trimmed TSV field, returning `None` for invalid values.
    fn parse_cell(field: &str) -> Option<Self>;

    /// Format the cell for TSV output.
    fn format_cell(&self) -> String;
}

impl Cell for i8 {
    fn parse_cell(field: &str) -> Option<Self> {
        field
            .parse::<i8>()
            .ok()
            .filter(|code| (MIN_CODE..=MAX_CODE).contains(code))
    }

    fn format_cell(&self) -> String {
        self.to_string()
    }
}

impl Cell for Allele {
    fn parse_cell(field: &str) -> Option<Self> {
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Allele::from_char(c),
            _ => None,
        }
    }

    fn format_cell(&self) -> String {
        self.as_char().to_string()
    }
}
