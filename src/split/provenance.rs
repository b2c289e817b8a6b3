//! Row provenance vectors produced by annotation splitting.

use super::plan::{RowSplit, SplitPlan};
use crate::data::AuditLog;
use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where each output row of a split came from.
///
/// All vectors have one entry per output row. The three masks are computed on
/// the input row and repeated for each of its replicas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitProvenance {
    /// Input row had more than one gene segment.
    pub multi_annotation: Vec<bool>,
    /// Input row was a multiallelic site.
    pub multiallelic: Vec<bool>,
    /// Input row was annotated against more than one gene.
    pub overlapping_genes: Vec<bool>,
    /// Input row index (0-based, non-decreasing).
    pub source_rows: Vec<usize>,
    /// Ordinal within the replica group (0-based).
    pub replica_index: Vec<usize>,
    /// Rows kept with an annotation that could not be rewritten.
    pub audit: AuditLog,
}

impl SplitProvenance {
    /// Collect the provenance vectors of a plan.
    pub fn from_plan(plan: &SplitPlan, input_labels: &[String]) -> Self {
        Self {
            multi_annotation: plan.broadcast(|r: &RowSplit| r.multi_annotation),
            multiallelic: plan.broadcast(|r: &RowSplit| r.multiallelic),
            overlapping_genes: plan.broadcast(|r: &RowSplit| r.overlapping_genes),
            source_rows: plan.source_rows(),
            replica_index: plan.replica_indices(),
            audit: plan.audit(input_labels),
        }
    }

    /// Number of output rows described.
    pub fn len(&self) -> usize {
        self.source_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_rows.is_empty()
    }

    /// True for output rows that belong to a group of two or more replicas.
    pub fn was_split(&self) -> Vec<bool> {
        let n = self.len();
        (0..n)
            .map(|i| {
                let source = self.source_rows[i];
                (i > 0 && self.source_rows[i - 1] == source)
                    || (i + 1 < n && self.source_rows[i + 1] == source)
            })
            .collect()
    }

    /// Write one line per output row to a TSV file.
    ///
    /// `labels` are the output-row labels and must match the provenance length.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, labels: &[String]) -> Result<()> {
        if labels.len() != self.len() {
            return Err(CleanError::DimensionMismatch {
                expected: self.len(),
                actual: labels.len(),
            });
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path)?;

        writer.write_record([
            "annotation",
            "source_row",
            "replica_index",
            "multi_annotation",
            "multiallelic",
            "overlapping_genes",
        ])?;
        for (i, label) in labels.iter().enumerate() {
            writer.write_record([
                label.clone(),
                self.source_rows[i].to_string(),
                self.replica_index[i].to_string(),
                self.multi_annotation[i].to_string(),
                self.multiallelic[i].to_string(),
                self.overlapping_genes[i].to_string(),
            ])?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl std::fmt::Display for SplitProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = |mask: &[bool]| mask.iter().filter(|&&b| b).count();
        writeln!(f, "Split Provenance")?;
        writeln!(f, "  Output rows:        {}", self.len())?;
        writeln!(f, "  From split groups:  {}", count(&self.was_split()))?;
        writeln!(f, "  Multi-annotation:   {}", count(&self.multi_annotation))?;
        writeln!(f, "  Multiallelic:       {}", count(&self.multiallelic))?;
        writeln!(f, "  Overlapping genes:  {}", count(&self.overlapping_genes))?;
        writeln!(f, "  Unresolved:         {}", self.audit.len())?;
        Ok(())
    }
}
