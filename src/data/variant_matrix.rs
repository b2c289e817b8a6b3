//! Dense variant matrix with annotation row labels.

use super::allele::{Allele, Cell};
use crate::error::{CleanError, Result};
use nalgebra::DMatrix;
use std::path::Path;

/// Header of the label column in TSV files.
pub const LABEL_HEADER: &str = "annotation";

/// A dense matrix of variant calls across samples.
///
/// Rows represent annotated variant events, columns represent samples.
/// Every row is identified by its annotation string.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantMatrix<T: Cell> {
    /// Dense matrix (variants × samples)
    data: DMatrix<T>,
    /// Annotation strings (row names)
    labels: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

/// Genotype-code matrix, cells in `-4..=3`.
pub type CodeMatrix = VariantMatrix<i8>;

/// Allele-call matrix.
pub type AlleleMatrix = VariantMatrix<Allele>;

impl<T: Cell> VariantMatrix<T> {
    /// Create a new VariantMatrix from dense data and identifiers.
    pub fn new(data: DMatrix<T>, labels: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != labels.len() {
            return Err(CleanError::DimensionMismatch {
                expected: nrows,
                actual: labels.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(CleanError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            labels,
            sample_ids,
        })
    }

    /// Build a matrix from row-major rows.
    pub fn from_rows(rows: Vec<Vec<T>>, labels: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let ncols = sample_ids.len();
        let mut cells = Vec::with_capacity(rows.len() * ncols);
        for row in &rows {
            if row.len() != ncols {
                return Err(CleanError::DimensionMismatch {
                    expected: ncols,
                    actual: row.len(),
                });
            }
            cells.extend(row.iter().cloned());
        }
        let data = DMatrix::from_row_slice(rows.len(), ncols, &cells);
        Self::new(data, labels, sample_ids)
    }

    /// Load a matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the annotation header)
    /// - Subsequent rows: annotation followed by one cell per sample
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Annotations are free text, so quotes carry no meaning here.
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(CleanError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        let mut labels = Vec::new();
        let mut cells: Vec<T> = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let label = record.get(0).unwrap_or_default();
            labels.push(label.to_string());

            for (col_idx, field) in record.iter().skip(1).enumerate() {
                let value = T::parse_cell(field.trim()).ok_or_else(|| CleanError::InvalidCell {
                    value: field.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                cells.push(value);
            }
        }

        let data = DMatrix::from_row_slice(labels.len(), n_samples, &cells);
        Self::new(data, labels, sample_ids)
    }

    /// Write the matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path)?;

        let mut header = Vec::with_capacity(self.n_samples() + 1);
        header.push(LABEL_HEADER.to_string());
        header.extend(self.sample_ids.iter().cloned());
        writer.write_record(&header)?;

        for (row_idx, label) in self.labels.iter().enumerate() {
            let mut record = Vec::with_capacity(self.n_samples() + 1);
            record.push(label.clone());
            record.extend(self.row_iter(row_idx).map(Cell::format_cell));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the value at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[(row, col)]
    }

    /// Number of variant rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Row annotations.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<T> {
        &self.data
    }

    /// Iterate over the cells of one row.
    pub fn row_iter(&self, row: usize) -> impl Iterator<Item = &T> + '_ {
        (0..self.n_samples()).map(move |col| &self.data[(row, col)])
    }

    /// Copy one row into a vector.
    pub fn row_dense(&self, row: usize) -> Vec<T> {
        self.row_iter(row).cloned().collect()
    }

    /// True if the row holds at least two distinct values.
    pub fn row_has_variation(&self, row: usize) -> bool {
        let mut cells = self.row_iter(row);
        match cells.next() {
            Some(first) => cells.any(|cell| cell != first),
            None => false,
        }
    }

    /// Select rows by index, in the given order.
    ///
    /// Indices may repeat; a repeated index duplicates the row.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows()) {
            return Err(CleanError::InvalidParameter(format!(
                "Row index {} out of bounds",
                bad
            )));
        }

        let data = DMatrix::from_fn(indices.len(), self.n_samples(), |r, c| {
            self.data[(indices[r], c)].clone()
        });
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();

        Self::new(data, labels, self.sample_ids.clone())
    }

    /// Replace the row labels.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.n_rows() {
            return Err(CleanError::DimensionMismatch {
                expected: self.n_rows(),
                actual: labels.len(),
            });
        }
        self.labels = labels;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> AlleleMatrix {
        use Allele::*;
        // 3 variants × 4 samples
        let rows = vec![
            vec![A, A, C, A],
            vec![G, G, G, G],
            vec![N, T, T, Gap],
        ];
        let labels = vec!["var_1".to_string(), "var_2".to_string(), "var_3".to_string()];
        let sample_ids = vec![
            "sample1".to_string(),
            "sample2".to_string(),
            "sample3".to_string(),
            "sample4".to_string(),
        ];
        AlleleMatrix::from_rows(rows, labels, sample_ids).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_rows(), 3);
        assert_eq!(mat.n_samples(), 4);
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(*mat.get(0, 2), Allele::C);
        assert_eq!(*mat.get(2, 3), Allele::Gap);
        assert_eq!(mat.row_dense(1), vec![Allele::G; 4]);
    }

    #[test]
    fn test_row_variation() {
        let mat = create_test_matrix();
        assert!(mat.row_has_variation(0));
        assert!(!mat.row_has_variation(1));
        assert!(mat.row_has_variation(2));
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = CodeMatrix::from_rows(
            vec![vec![0, 1], vec![1]],
            vec!["a".to_string(), "b".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        );
        assert!(matches!(result, Err(CleanError::DimensionMismatch { .. })));

        let data = DMatrix::from_element(2, 2, 0i8);
        let result = CodeMatrix::new(data, vec!["a".to_string()], vec!["s1".into(), "s2".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tsv_roundtrip() {
        let mat = create_test_matrix();

        let temp_file = NamedTempFile::new().unwrap();
        mat.to_tsv(temp_file.path()).unwrap();

        let loaded = AlleleMatrix::from_tsv(temp_file.path()).unwrap();
        assert_eq!(loaded, mat);
    }

    #[test]
    fn test_tsv_keeps_annotation_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "annotation\tS1\tS2").unwrap();
        writeln!(file, "SNP at 10 > A \"quoted\";A|x|y|z|w|v|u|t|s|;\t1\t-4").unwrap();
        file.flush().unwrap();

        let mat = CodeMatrix::from_tsv(file.path()).unwrap();
        assert_eq!(mat.labels()[0], "SNP at 10 > A \"quoted\";A|x|y|z|w|v|u|t|s|;");
        assert_eq!(mat.row_dense(0), vec![1, -4]);
    }

    #[test]
    fn test_tsv_invalid_cell() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "annotation\tS1\tS2").unwrap();
        writeln!(file, "var_1\t0\t9").unwrap();
        file.flush().unwrap();

        let result = CodeMatrix::from_tsv(file.path());
        assert!(matches!(
            result,
            Err(CleanError::InvalidCell { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn test_subset_rows_with_repeats() {
        let mat = create_test_matrix();
        let subset = mat.subset_rows(&[0, 0, 2]).unwrap();

        assert_eq!(subset.n_rows(), 3);
        assert_eq!(subset.n_samples(), 4);
        assert_eq!(subset.labels(), &["var_1", "var_1", "var_3"]);
        assert_eq!(subset.row_dense(1), mat.row_dense(0));
        assert_eq!(subset.row_dense(2), mat.row_dense(2));

        assert!(mat.subset_rows(&[3]).is_err());
    }

    #[test]
    fn test_with_labels() {
        let mat = create_test_matrix();
        let relabeled = mat
            .clone()
            .with_labels(vec!["x".into(), "y".into(), "z".into()])
            .unwrap();
        assert_eq!(relabeled.labels(), &["x", "y", "z"]);
        assert!(mat.with_labels(vec!["x".into()]).is_err());
    }
}
