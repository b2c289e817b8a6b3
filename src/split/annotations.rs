//! Expansion of multi-annotation rows into one row per annotated event.

use super::plan::plan_split;
use super::provenance::SplitProvenance;
use crate::data::{Cell, MatrixPair, VariantMatrix};
use crate::error::Result;

/// An expanded matrix with the provenance of every row.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult<T: Cell> {
    /// Expanded matrix with rewritten labels.
    pub matrix: VariantMatrix<T>,
    /// Masks and source indices, one entry per row of `matrix`.
    pub provenance: SplitProvenance,
}

/// Split rows annotated with more than one event.
///
/// Each row is repeated once per divider in its annotation (at least once),
/// with its cells copied verbatim. Replicas of a split row are relabelled to
/// reference only their own gene segment, and multiallelic calls are narrowed
/// to the replica's allele.
///
/// # Arguments
/// * `matrix` - Code or allele matrix labelled with annotations
///
/// # Returns
/// The expanded matrix together with its [`SplitProvenance`].
pub fn split_multi_annotations<T: Cell>(matrix: &VariantMatrix<T>) -> Result<SplitResult<T>> {
    let plan = plan_split(matrix.labels());
    let expanded = matrix
        .subset_rows(&plan.source_rows())?
        .with_labels(plan.labels())?;
    let provenance = SplitProvenance::from_plan(&plan, matrix.labels());

    log::info!(
        "Annotation splitter: {} rows in, {} split, {} rows out",
        plan.n_input_rows(),
        plan.n_split_rows(),
        plan.n_output_rows()
    );

    Ok(SplitResult {
        matrix: expanded,
        provenance,
    })
}

/// Split both matrices of a pair with one shared plan.
pub fn split_pair(pair: &MatrixPair) -> Result<(MatrixPair, SplitProvenance)> {
    let plan = plan_split(pair.labels());
    let expanded = pair
        .subset_rows(&plan.source_rows())?
        .with_labels(plan.labels())?;
    let provenance = SplitProvenance::from_plan(&plan, pair.labels());

    log::info!(
        "Annotation splitter: {} rows in, {} split, {} rows out",
        plan.n_input_rows(),
        plan.n_split_rows(),
        plan.n_output_rows()
    );

    Ok((expanded, provenance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::annotation::count_dividers;
    use crate::data::{Allele, AlleleMatrix, AuditReason, CodeMatrix};
    use tempfile::NamedTempFile;

    fn segment(allele: char, gene: &str, tag: &str) -> String {
        format!(
            "{}|missense_variant|MODERATE|{}|{}|transcript|{}.t01|protein_coding|1/1|",
            allele, gene, tag, tag
        )
    }

    fn create_test_labels() -> Vec<String> {
        vec![
            // single event
            format!(
                "SNP at 50 > G functional=SYN locus_tag=Rv0050 Strand Information:+;{};",
                segment('G', "geneA", "Rv0050")
            ),
            // overlapping genes
            format!(
                "SNP at 100 > T functional=NSYN locus_tag=Rv0100 Strand Information:+;{};{};",
                segment('T', "geneB", "Rv0100"),
                segment('T', "geneC", "Rv0101")
            ),
            // multiallelic site in one gene
            format!(
                "SNP at 200 > A,C functional=NSYN locus_tag=Rv0200 Strand Information:-;{};{};",
                segment('A', "geneD", "Rv0200"),
                segment('C', "geneD", "Rv0200")
            ),
            // multiallelic site in overlapping genes
            format!(
                "SNP at 300 > C,G functional=NSYN locus_tag=Rv0300 Strand Information:+;{};{};{};",
                segment('C', "geneE", "Rv0300"),
                segment('G', "geneE", "Rv0300"),
                segment('C', "geneF", "Rv0301")
            ),
        ]
    }

    fn create_test_pair() -> MatrixPair {
        let labels = create_test_labels();
        let samples: Vec<String> = (0..3).map(|i| format!("S{}", i)).collect();
        let codes = vec![vec![0, 1, 0], vec![1, 0, 0], vec![0, 2, -4], vec![3, 0, 0]];
        let alleles = vec![
            vec![Allele::A, Allele::G, Allele::A],
            vec![Allele::T, Allele::C, Allele::C],
            vec![Allele::G, Allele::C, Allele::N],
            vec![Allele::G, Allele::A, Allele::A],
        ];
        MatrixPair::new(
            CodeMatrix::from_rows(codes, labels.clone(), samples.clone()).unwrap(),
            AlleleMatrix::from_rows(alleles, labels, samples).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_split_pair_shapes() {
        let pair = create_test_pair();
        let (split, provenance) = split_pair(&pair).unwrap();

        assert_eq!(split.n_rows(), 8);
        assert_eq!(provenance.len(), 8);
        assert_eq!(provenance.source_rows, vec![0, 1, 1, 2, 2, 3, 3, 3]);
        assert_eq!(provenance.replica_index, vec![0, 0, 1, 0, 1, 0, 1, 2]);
        assert_eq!(
            provenance.multi_annotation,
            vec![false, true, true, true, true, true, true, true]
        );
        assert_eq!(
            provenance.multiallelic,
            vec![false, false, false, true, true, true, true, true]
        );
        assert_eq!(
            provenance.overlapping_genes,
            vec![false, true, true, false, false, true, true, true]
        );
        assert_eq!(split.code().labels(), split.alleles().labels());
    }

    #[test]
    fn test_conservation() {
        let pair = create_test_pair();
        let expected: usize = pair
            .labels()
            .iter()
            .map(|l| count_dividers(l).max(1))
            .sum();
        let (split, _) = split_pair(&pair).unwrap();
        assert_eq!(split.n_rows(), expected);
    }

    #[test]
    fn test_replicas_copy_row_data() {
        let pair = create_test_pair();
        let (split, provenance) = split_pair(&pair).unwrap();
        for (out_row, &source) in provenance.source_rows.iter().enumerate() {
            assert_eq!(split.code().row_dense(out_row), pair.code().row_dense(source));
            assert_eq!(
                split.alleles().row_dense(out_row),
                pair.alleles().row_dense(source)
            );
        }
    }

    #[test]
    fn test_provenance_monotone_and_masks_consistent() {
        let pair = create_test_pair();
        let (_, provenance) = split_pair(&pair).unwrap();

        assert!(provenance.source_rows.windows(2).all(|w| w[0] <= w[1]));
        let mut distinct = provenance.source_rows.clone();
        distinct.dedup();
        assert_eq!(distinct, vec![0, 1, 2, 3]);

        for i in 0..provenance.len() {
            assert!(!provenance.overlapping_genes[i] || provenance.multi_annotation[i]);
        }
    }

    #[test]
    fn test_rewritten_labels() {
        let pair = create_test_pair();
        let (split, _) = split_pair(&pair).unwrap();
        let labels = split.labels();

        assert_eq!(labels[0], pair.labels()[0]);
        assert!(labels[1].contains("|geneB|") && !labels[1].contains("|geneC|"));
        assert!(labels[2].contains("|geneC|") && !labels[2].contains("|geneB|"));
        assert!(labels[3].contains("> A functional=NSYN"));
        assert!(labels[4].contains("> C functional=NSYN"));
        assert!(labels[5].contains("> C functional=NSYN"));
        assert!(labels[6].contains("> G functional=NSYN"));
        assert!(labels[7].contains("> C functional=NSYN") && labels[7].contains("|geneF|"));
        for label in labels {
            assert_eq!(count_dividers(label), 1);
        }
    }

    #[test]
    fn test_split_output_needs_no_further_split() {
        let pair = create_test_pair();
        let (split, _) = split_pair(&pair).unwrap();
        let (again, provenance) = split_pair(&split).unwrap();
        assert_eq!(again.labels(), split.labels());
        assert!(provenance.was_split().iter().all(|&b| !b));
    }

    #[test]
    fn test_split_single_matrix() {
        let pair = create_test_pair();
        let result = split_multi_annotations(pair.alleles()).unwrap();
        assert_eq!(result.matrix.n_rows(), 8);
        assert_eq!(result.provenance.source_rows.len(), 8);
        assert!(result.provenance.audit.is_empty());
    }

    #[test]
    fn test_unresolved_rows_reported() {
        let label = "SNP at 9 > A,T functional=NSYN locus_tag=Rv0009 Strand Information:+;x|y|z|w|v|u|t|s|r|;"
            .to_string();
        let matrix = CodeMatrix::from_rows(
            vec![vec![0, 1]],
            vec![label.clone()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap();
        let result = split_multi_annotations(&matrix).unwrap();
        assert_eq!(result.matrix.labels(), &[label.clone()]);
        let entry = result
            .provenance
            .audit
            .by_reason(AuditReason::UnresolvedAnnotation)
            .next()
            .unwrap();
        assert_eq!(entry.label, label);
    }

    #[test]
    fn test_provenance_tsv() {
        let pair = create_test_pair();
        let (split, provenance) = split_pair(&pair).unwrap();

        let file = NamedTempFile::new().unwrap();
        provenance.to_tsv(file.path(), split.labels()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("annotation\tsource_row"));
        assert!(lines[2].ends_with("\t1\t0\ttrue\tfalse\ttrue"));

        assert!(provenance.to_tsv(file.path(), &split.labels()[..2]).is_err());
    }
}
