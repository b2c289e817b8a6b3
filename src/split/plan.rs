//! Planning how annotation rows expand into one row per annotated event.

use crate::data::annotation::{self, RawAnnotation, PIPES_PER_SEGMENT};
use crate::data::{AuditLog, AuditReason};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How a single input row is expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSplit {
    /// Index of the row in the input matrix.
    pub source_row: usize,
    /// Number of `;` + nucleotide dividers in the annotation.
    pub dividers: usize,
    /// More than one gene segment is present.
    pub multi_annotation: bool,
    /// Two or more alternate alleles are recorded together.
    pub multiallelic: bool,
    /// The gene segments name more than one gene.
    pub overlapping_genes: bool,
    /// Label of each replica, in replica order.
    pub replica_labels: Vec<String>,
    /// A multiallelic call could not be narrowed for at least one replica.
    pub unresolved: bool,
}

impl RowSplit {
    /// Number of output rows produced by this input row.
    pub fn n_replicas(&self) -> usize {
        self.replica_labels.len()
    }
}

/// Plan a single row.
///
/// The row is replicated once per divider (at least once). Replica `k` of a
/// group larger than one keeps the position info plus event segment `k`. At
/// multiallelic sites each replica's allele list is narrowed to the leading
/// nucleotide of its event segment.
pub fn plan_row(source_row: usize, label: &str) -> RowSplit {
    let raw = RawAnnotation::tokenize(label);
    let dividers = annotation::count_dividers(label);
    let multi_annotation = dividers >= 1 && annotation::pipe_count(label) > PIPES_PER_SEGMENT;
    let multiallelic = annotation::is_multiallelic(raw.position_info());
    let overlapping_genes = multi_annotation && raw.gene_ids().len() > 1;

    let events = raw.event_segments();
    let n_replicas = dividers.max(1);
    let mut unresolved = false;
    let mut replica_labels = Vec::with_capacity(n_replicas);

    for replica in 0..n_replicas {
        let event = events.get(replica).copied();

        let mut position = Cow::Borrowed(raw.position_info());
        if multiallelic {
            let narrowed = event
                .and_then(annotation::segment_allele)
                .and_then(|allele| annotation::narrow_alleles(raw.position_info(), allele));
            match narrowed {
                Some(text) => position = Cow::Owned(text),
                None => unresolved = true,
            }
        }

        let replica_label = match event {
            Some(segment) if n_replicas > 1 => raw.assemble(&position, &[segment]),
            _ if matches!(position, Cow::Owned(_)) => raw.assemble(&position, raw.segments()),
            _ => label.to_string(),
        };
        replica_labels.push(replica_label);
    }

    RowSplit {
        source_row,
        dividers,
        multi_annotation,
        multiallelic,
        overlapping_genes,
        replica_labels,
        unresolved,
    }
}

/// Expansion plan for a whole matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    rows: Vec<RowSplit>,
}

impl SplitPlan {
    /// Per-input-row plans, in input order.
    pub fn rows(&self) -> &[RowSplit] {
        &self.rows
    }

    /// Number of input rows.
    pub fn n_input_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of output rows.
    pub fn n_output_rows(&self) -> usize {
        self.rows.iter().map(RowSplit::n_replicas).sum()
    }

    /// Input rows that expand into more than one output row.
    pub fn n_split_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.n_replicas() > 1).count()
    }

    /// Input row index of every output row.
    pub fn source_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .flat_map(|r| std::iter::repeat(r.source_row).take(r.n_replicas()))
            .collect()
    }

    /// Ordinal of every output row within its replica group.
    pub fn replica_indices(&self) -> Vec<usize> {
        self.rows.iter().flat_map(|r| 0..r.n_replicas()).collect()
    }

    /// Label of every output row.
    pub fn labels(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|r| r.replica_labels.iter().cloned())
            .collect()
    }

    /// Broadcast a per-input-row flag to every output row.
    pub fn broadcast(&self, flag: impl Fn(&RowSplit) -> bool) -> Vec<bool> {
        self.rows
            .iter()
            .flat_map(|r| std::iter::repeat(flag(r)).take(r.n_replicas()))
            .collect()
    }

    /// Audit entries for rows whose annotation could not be rewritten.
    pub fn audit(&self, labels: &[String]) -> AuditLog {
        let mut audit = AuditLog::new();
        for row in self.rows.iter().filter(|r| r.unresolved) {
            audit.push(
                AuditReason::UnresolvedAnnotation,
                row.source_row,
                &labels[row.source_row],
            );
        }
        audit
    }
}

/// Plan the expansion of every row.
pub fn plan_split(labels: &[String]) -> SplitPlan {
    let rows: Vec<RowSplit> = labels
        .par_iter()
        .enumerate()
        .map(|(row, label)| plan_row(row, label))
        .collect();

    for row in rows.iter().filter(|r| r.unresolved) {
        log::warn!(
            "Could not narrow multiallelic annotation of row {}: {}",
            row.source_row,
            labels[row.source_row]
        );
    }

    SplitPlan { rows }
}
