//! Removal of rows whose annotations match known pipeline bug patterns.

use crate::data::annotation::{self, ParsedAnnotation};
use crate::data::{AuditLog, AuditReason, Cell, MatrixPair, VariantMatrix};
use crate::error::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Token the annotation pipeline writes when it could not annotate cleanly.
pub const WARNING_TOKEN: &str = "WARNING";
/// Sentinel for the last gene in the genome.
pub const CHR_END_TOKEN: &str = "CHR_END";
/// Text written when no strand could be assigned.
pub const NO_STRAND_TOKEN: &str = "No Strand Information found";
/// Locus tag written when no gene could be assigned.
pub const NULL_LOCUS_TAG: &str = "NULL";
/// Literal annotation body for unannotated rows.
pub const NONE_TOKEN: &str = "None";

/// How the pipe structure of an annotation is validated.
///
/// The two modes disagree on a label with a single gene segment and no
/// trailing `;` (`pos;<segment>`): `PerSegment` keeps it, `Ratio` removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipeCheck {
    /// Every gene segment must hold exactly nine pipes. A label needs one
    /// semicolon only, so `pos;<segment>` passes.
    #[default]
    PerSegment,
    /// Legacy rule: `pipes / (semicolons - 1)` must be a whole multiple of nine.
    /// Labels with at most one semicolon fail.
    Ratio,
}

/// Configuration for bug filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BugFilterConfig {
    /// Grammar check used for malformed annotations.
    pub pipe_check: PipeCheck,
    /// Remove rows where no `locus_tag=... Strand` block can be found.
    pub require_locus_tag: bool,
}

impl Default for BugFilterConfig {
    fn default() -> Self {
        Self {
            pipe_check: PipeCheck::PerSegment,
            require_locus_tag: true,
        }
    }
}

/// Annotation defect classes, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BugClass {
    Warning,
    MalformedAnnotation,
    ChromosomeEnd,
    MissingStrandInfo,
    NoneAnnotation,
}

impl BugClass {
    /// All classes in checking order.
    pub const ALL: [BugClass; 5] = [
        BugClass::Warning,
        BugClass::MalformedAnnotation,
        BugClass::ChromosomeEnd,
        BugClass::MissingStrandInfo,
        BugClass::NoneAnnotation,
    ];

    /// Audit reason recorded for rows of this class.
    pub fn reason(&self) -> AuditReason {
        match self {
            Self::Warning => AuditReason::Warning,
            Self::MalformedAnnotation => AuditReason::MalformedAnnotation,
            Self::ChromosomeEnd => AuditReason::ChromosomeEnd,
            Self::MissingStrandInfo => AuditReason::MissingStrandInfo,
            Self::NoneAnnotation => AuditReason::NoneAnnotation,
        }
    }

    /// Check a single label against this class.
    pub fn matches(&self, label: &str, config: &BugFilterConfig) -> bool {
        match self {
            Self::Warning => label.contains(WARNING_TOKEN),
            Self::MalformedAnnotation => match config.pipe_check {
                PipeCheck::PerSegment => ParsedAnnotation::parse(label).is_err(),
                PipeCheck::Ratio => !satisfies_pipe_ratio(label),
            },
            Self::ChromosomeEnd => label.contains(CHR_END_TOKEN),
            Self::MissingStrandInfo => {
                label.contains(NO_STRAND_TOKEN)
                    || match annotation::locus_tag(label) {
                        Some(tag) => tag == NULL_LOCUS_TAG,
                        None => config.require_locus_tag,
                    }
            }
            Self::NoneAnnotation => label.contains(NONE_TOKEN),
        }
    }

    /// First class the label falls into, if any.
    pub fn classify(label: &str, config: &BugFilterConfig) -> Option<BugClass> {
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.matches(label, config))
    }
}

/// Legacy pipe-ratio check.
///
/// True iff the label has more than one semicolon and
/// `pipes / (semicolons - 1)` is a whole number divisible by nine.
pub fn satisfies_pipe_ratio(label: &str) -> bool {
    let semicolons = annotation::semicolon_count(label);
    if semicolons <= 1 {
        return false;
    }
    let pipes = annotation::pipe_count(label);
    let segments = semicolons - 1;
    pipes % segments == 0 && (pipes / segments) % annotation::PIPES_PER_SEGMENT == 0
}

/// Work out which rows survive bug filtering.
///
/// The classes are applied as sequential passes, each over the rows left by
/// the previous one, so every removed row is logged once under the first
/// class it matches. Returns the surviving row indices and the audit log.
pub fn plan_bug_removal(labels: &[String], config: &BugFilterConfig) -> (Vec<usize>, AuditLog) {
    let mut keep: Vec<usize> = (0..labels.len()).collect();
    let mut audit = AuditLog::new();

    for class in BugClass::ALL {
        let hits: Vec<bool> = keep
            .par_iter()
            .map(|&row| class.matches(&labels[row], config))
            .collect();

        let mut survivors = Vec::with_capacity(keep.len());
        for (&row, hit) in keep.iter().zip(hits) {
            if hit {
                log::debug!("Removing row {} ({}): {}", row, class.reason(), labels[row]);
                audit.push(class.reason(), row, &labels[row]);
            } else {
                survivors.push(row);
            }
        }
        keep = survivors;
    }

    (keep, audit)
}

/// Remove rows whose annotation matches any bug class.
///
/// # Arguments
/// * `matrix` - Code or allele matrix labelled with annotations
/// * `config` - Bug filter configuration
///
/// # Returns
/// The filtered matrix and an audit log of every removed row.
pub fn remove_buggy_rows<T: Cell>(
    matrix: &VariantMatrix<T>,
    config: &BugFilterConfig,
) -> Result<(VariantMatrix<T>, AuditLog)> {
    let (keep, audit) = plan_bug_removal(matrix.labels(), config);
    let filtered = matrix.subset_rows(&keep)?;
    log_summary(matrix.n_rows(), filtered.n_rows());
    Ok((filtered, audit))
}

/// Remove buggy rows from both matrices of a pair with one shared mask.
pub fn remove_buggy_rows_pair(
    pair: &MatrixPair,
    config: &BugFilterConfig,
) -> Result<(MatrixPair, AuditLog)> {
    let (keep, audit) = plan_bug_removal(pair.labels(), config);
    let filtered = pair.subset_rows(&keep)?;
    log_summary(pair.n_rows(), filtered.n_rows());
    Ok((filtered, audit))
}

fn log_summary(n_before: usize, n_after: usize) {
    log::info!(
        "Bug filter: {} rows in, {} removed, {} kept",
        n_before,
        n_before - n_after,
        n_after
    );
    if n_before > 0 && n_after == 0 {
        log::warn!("Bug filter removed every row");
    }
}
