//! Paired code and allele matrices kept in row correspondence.

use super::variant_matrix::{AlleleMatrix, CodeMatrix};
use crate::error::{CleanError, Result};
use std::path::Path;

/// Check that two matrices describe the same rows and samples, in the same order.
pub fn check_correspondence(code: &CodeMatrix, alleles: &AlleleMatrix) -> Result<()> {
    if code.n_rows() != alleles.n_rows() {
        return Err(CleanError::CorrespondenceViolation(format!(
            "code matrix has {} rows, allele matrix has {}",
            code.n_rows(),
            alleles.n_rows()
        )));
    }
    if code.sample_ids() != alleles.sample_ids() {
        return Err(CleanError::CorrespondenceViolation(
            "sample identifiers differ between code and allele matrices".to_string(),
        ));
    }
    if let Some(row) = code
        .labels()
        .iter()
        .zip(alleles.labels())
        .position(|(a, b)| a != b)
    {
        return Err(CleanError::CorrespondenceViolation(format!(
            "row {} is '{}' in the code matrix but '{}' in the allele matrix",
            row,
            code.labels()[row],
            alleles.labels()[row]
        )));
    }
    Ok(())
}

/// A genotype-code matrix and its allele matrix.
///
/// Row `i` of both matrices always refers to the same variant event.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixPair {
    code: CodeMatrix,
    alleles: AlleleMatrix,
}

impl MatrixPair {
    /// Pair two matrices, failing if they do not correspond row for row.
    pub fn new(code: CodeMatrix, alleles: AlleleMatrix) -> Result<Self> {
        check_correspondence(&code, &alleles)?;
        Ok(Self { code, alleles })
    }

    /// Load both matrices from TSV files.
    pub fn from_tsv<P: AsRef<Path>, Q: AsRef<Path>>(code_path: P, allele_path: Q) -> Result<Self> {
        let code = CodeMatrix::from_tsv(code_path)?;
        let alleles = AlleleMatrix::from_tsv(allele_path)?;
        Self::new(code, alleles)
    }

    /// Write both matrices to TSV files.
    pub fn to_tsv<P: AsRef<Path>, Q: AsRef<Path>>(&self, code_path: P, allele_path: Q) -> Result<()> {
        self.code.to_tsv(code_path)?;
        self.alleles.to_tsv(allele_path)
    }

    /// The genotype-code matrix.
    #[inline]
    pub fn code(&self) -> &CodeMatrix {
        &self.code
    }

    /// The allele matrix.
    #[inline]
    pub fn alleles(&self) -> &AlleleMatrix {
        &self.alleles
    }

    /// Shared row labels.
    #[inline]
    pub fn labels(&self) -> &[String] {
        self.code.labels()
    }

    /// Number of rows in both matrices.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.code.n_rows()
    }

    /// Split into the two matrices.
    pub fn into_parts(self) -> (CodeMatrix, AlleleMatrix) {
        (self.code, self.alleles)
    }

    /// Select the same rows from both matrices.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        Self::new(
            self.code.subset_rows(indices)?,
            self.alleles.subset_rows(indices)?,
        )
    }

    /// Replace the labels of both matrices.
    pub fn with_labels(self, labels: Vec<String>) -> Result<Self> {
        let code = self.code.with_labels(labels.clone())?;
        let alleles = self.alleles.with_labels(labels)?;
        Self::new(code, alleles)
    }
}
