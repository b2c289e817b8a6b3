//! Removal of rows that carry no variation across samples.

use crate::data::{check_correspondence, AuditLog, AuditReason, Cell, MatrixPair, VariantMatrix};
use crate::error::Result;
use rayon::prelude::*;

/// Indices of rows holding at least two distinct values.
fn variable_rows<T: Cell>(matrix: &VariantMatrix<T>) -> Vec<usize> {
    (0..matrix.n_rows())
        .into_par_iter()
        .filter(|&row| matrix.row_has_variation(row))
        .collect()
}

fn audit_removed(labels: &[String], keep: &[usize]) -> AuditLog {
    let mut audit = AuditLog::new();
    let mut kept = keep.iter().peekable();
    for (row, label) in labels.iter().enumerate() {
        if kept.peek() == Some(&&row) {
            kept.next();
        } else {
            log::debug!("Removing invariant row {}: {}", row, label);
            audit.push(AuditReason::NoVariation, row, label);
        }
    }
    audit
}

/// Remove rows without variation from a single matrix.
///
/// A row is removed when every cell holds the same value, which includes rows
/// that are masked (`N`) in every sample.
pub fn remove_invariant_rows<T: Cell>(
    matrix: &VariantMatrix<T>,
) -> Result<(VariantMatrix<T>, AuditLog)> {
    let keep = variable_rows(matrix);
    let audit = audit_removed(matrix.labels(), &keep);
    let filtered = matrix.subset_rows(&keep)?;
    log::info!(
        "Presence filter: {} rows in, {} invariant removed",
        matrix.n_rows(),
        audit.len()
    );
    Ok((filtered, audit))
}

/// Remove rows without variation from both matrices of a pair.
///
/// Variation is judged on the allele matrix and the resulting mask is applied
/// to both matrices, so their rows stay in correspondence.
pub fn remove_invariant_rows_pair(pair: &MatrixPair) -> Result<(MatrixPair, AuditLog)> {
    check_correspondence(pair.code(), pair.alleles())?;

    let keep = variable_rows(pair.alleles());
    let audit = audit_removed(pair.labels(), &keep);
    let filtered = pair.subset_rows(&keep)?;

    log::info!(
        "Presence filter: {} rows in, {} invariant removed",
        pair.n_rows(),
        audit.len()
    );
    if pair.n_rows() > 0 && filtered.n_rows() == 0 {
        log::warn!("Presence filter removed every row");
    }
    Ok((filtered, audit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Allele, AlleleMatrix, CodeMatrix};
    use Allele::*;

    fn create_test_pair() -> MatrixPair {
        // 5 variants × 4 samples
        let rows = vec![
            vec![A, A, C, A],   // polymorphic
            vec![G, G, G, G],   // monomorphic
            vec![N, N, N, N],   // fully masked
            vec![N, T, N, T],   // masked but variable
            vec![Gap, C, C, C], // deletion against C
        ];
        let labels: Vec<String> = (0..5).map(|i| format!("var_{}", i)).collect();
        let samples: Vec<String> = (0..4).map(|i| format!("S{}", i)).collect();

        let codes = vec![
            vec![0, 0, 1, 0],
            vec![0, 0, 0, 0],
            vec![-4, -4, -4, -4],
            vec![-4, 1, -4, 1],
            vec![-1, 0, 0, 0],
        ];
        let code = CodeMatrix::from_rows(codes, labels.clone(), samples.clone()).unwrap();
        let alleles = AlleleMatrix::from_rows(rows, labels, samples).unwrap();
        MatrixPair::new(code, alleles).unwrap()
    }

    #[test]
    fn test_remove_invariant_rows_pair() {
        let pair = create_test_pair();
        let (filtered, audit) = remove_invariant_rows_pair(&pair).unwrap();

        assert_eq!(filtered.labels(), &["var_0", "var_3", "var_4"]);
        assert_eq!(filtered.code().labels(), filtered.alleles().labels());
        assert_eq!(filtered.code().row_dense(1), vec![-4, 1, -4, 1]);

        assert_eq!(audit.removed_labels(), vec!["var_1", "var_2"]);
        assert_eq!(audit.count(AuditReason::NoVariation), 2);
        assert_eq!(audit.entries()[1].row, 2);
    }

    #[test]
    fn test_survivors_have_variation() {
        let pair = create_test_pair();
        let (filtered, _) = remove_invariant_rows_pair(&pair).unwrap();
        for row in 0..filtered.n_rows() {
            assert!(filtered.alleles().row_has_variation(row));
        }
        let (again, audit) = remove_invariant_rows_pair(&filtered).unwrap();
        assert_eq!(again, filtered);
        assert!(audit.is_empty());
    }

    #[test]
    fn test_single_matrix() {
        let pair = create_test_pair();
        let (filtered, audit) = remove_invariant_rows(pair.code()).unwrap();
        assert_eq!(filtered.n_rows(), 3);
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_no_samples_removes_everything() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let matrix = AlleleMatrix::from_rows(vec![vec![], vec![]], labels, vec![]).unwrap();
        let (filtered, audit) = remove_invariant_rows(&matrix).unwrap();
        assert_eq!(filtered.n_rows(), 0);
        assert_eq!(audit.len(), 2);
    }
}
