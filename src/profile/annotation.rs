//! Annotation profiling for variant matrices.

use crate::data::AuditReason;
use crate::filter::{plan_bug_removal, BugFilterConfig};
use crate::split::plan_split;
use serde::{Deserialize, Serialize};

/// Summary of the annotation defects and split structure of a set of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationProfile {
    /// Total number of rows.
    pub n_rows: usize,
    /// Rows carrying a `WARNING` token.
    pub n_warning: usize,
    /// Rows violating the segment grammar.
    pub n_malformed: usize,
    /// Rows with the `CHR_END` sentinel.
    pub n_chr_end: usize,
    /// Rows without locus tag or strand information.
    pub n_missing_strand_info: usize,
    /// Rows with a `None` body.
    pub n_none: usize,
    /// Rows passing every bug check.
    pub n_clean: usize,
    /// Clean rows with more than one gene segment.
    pub n_multi_annotation: usize,
    /// Clean rows at multiallelic sites.
    pub n_multiallelic: usize,
    /// Clean rows annotated against several genes.
    pub n_overlapping_genes: usize,
    /// Rows the clean rows would expand into.
    pub n_expanded_rows: usize,
    /// Largest number of events on a single clean row.
    pub max_events: usize,
}

impl AnnotationProfile {
    /// Number of rows the bug filter would remove.
    pub fn n_buggy(&self) -> usize {
        self.n_rows - self.n_clean
    }

    /// Proportion of rows the bug filter would keep.
    pub fn clean_rate(&self) -> f64 {
        if self.n_rows == 0 {
            return 0.0;
        }
        self.n_clean as f64 / self.n_rows as f64
    }
}

impl std::fmt::Display for AnnotationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Annotation Profile")?;
        writeln!(f, "  Rows:                  {}", self.n_rows)?;
        writeln!(f, "  Bug classes")?;
        writeln!(f, "    WARNING:             {}", self.n_warning)?;
        writeln!(f, "    Malformed:           {}", self.n_malformed)?;
        writeln!(f, "    CHR_END:             {}", self.n_chr_end)?;
        writeln!(f, "    Missing strand info: {}", self.n_missing_strand_info)?;
        writeln!(f, "    None:                {}", self.n_none)?;
        writeln!(
            f,
            "  Clean rows:            {} ({:.1}%)",
            self.n_clean,
            self.clean_rate() * 100.0
        )?;
        writeln!(f, "  Multi-annotation:      {}", self.n_multi_annotation)?;
        writeln!(f, "  Multiallelic:          {}", self.n_multiallelic)?;
        writeln!(f, "  Overlapping genes:     {}", self.n_overlapping_genes)?;
        writeln!(f, "  Rows after splitting:  {}", self.n_expanded_rows)?;
        writeln!(f, "  Max events per row:    {}", self.max_events)?;
        Ok(())
    }
}

/// Profile a set of annotations without modifying anything.
///
/// Bug counts use first-match attribution, as the bug filter does. Split
/// statistics describe the rows that survive bug filtering.
pub fn profile_annotations(labels: &[String], config: &BugFilterConfig) -> AnnotationProfile {
    let (keep, audit) = plan_bug_removal(labels, config);
    let clean: Vec<String> = keep.iter().map(|&i| labels[i].clone()).collect();
    let plan = plan_split(&clean);

    let rows = plan.rows();
    AnnotationProfile {
        n_rows: labels.len(),
        n_warning: audit.count(AuditReason::Warning),
        n_malformed: audit.count(AuditReason::MalformedAnnotation),
        n_chr_end: audit.count(AuditReason::ChromosomeEnd),
        n_missing_strand_info: audit.count(AuditReason::MissingStrandInfo),
        n_none: audit.count(AuditReason::NoneAnnotation),
        n_clean: clean.len(),
        n_multi_annotation: rows.iter().filter(|r| r.multi_annotation).count(),
        n_multiallelic: rows.iter().filter(|r| r.multiallelic).count(),
        n_overlapping_genes: rows.iter().filter(|r| r.overlapping_genes).count(),
        n_expanded_rows: plan.n_output_rows(),
        max_events: rows.iter().map(|r| r.dividers).max().unwrap_or(0),
    }
}
