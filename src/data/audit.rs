//! Audit records for rows removed or flagged by a cleaning stage.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Why a row was removed or flagged.
///
/// The first five variants are the annotation bug classes, in the order the
/// bug filter checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuditReason {
    /// Annotation carries a `WARNING` token.
    Warning,
    /// Annotation violates the semicolon/pipe grammar.
    MalformedAnnotation,
    /// Annotation carries the `CHR_END` sentinel.
    ChromosomeEnd,
    /// Locus tag or strand information is missing.
    MissingStrandInfo,
    /// Annotation body is the literal `None`.
    NoneAnnotation,
    /// Row shows no variation across samples.
    NoVariation,
    /// Row was kept but its annotation could not be rewritten.
    UnresolvedAnnotation,
}

impl AuditReason {
    /// Get the descriptive name, also used as the log file suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::MalformedAnnotation => "malformed_annotation",
            Self::ChromosomeEnd => "chr_end",
            Self::MissingStrandInfo => "missing_strand_info",
            Self::NoneAnnotation => "none_annotation",
            Self::NoVariation => "no_variation",
            Self::UnresolvedAnnotation => "unresolved_annotation",
        }
    }

    /// True if rows with this reason were dropped from the matrix.
    pub fn is_removal(&self) -> bool {
        !matches!(self, Self::UnresolvedAnnotation)
    }
}

impl std::fmt::Display for AuditReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One removed or flagged row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Reason for the entry.
    pub reason: AuditReason,
    /// Row index in the matrix the stage received. Logs returned by a
    /// pipeline run refer to rows of the pipeline input instead.
    pub row: usize,
    /// Original annotation, verbatim.
    pub label: String,
}

/// Append-only record of what the cleaning stages removed or flagged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row.
    pub fn push(&mut self, reason: AuditReason, row: usize, label: &str) {
        self.entries.push(AuditEntry {
            reason,
            row,
            label: label.to_string(),
        });
    }

    /// Append all entries of another log.
    pub fn extend(&mut self, other: AuditLog) {
        self.entries.extend(other.entries);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    /// Entries with the given reason.
    pub fn by_reason(&self, reason: AuditReason) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| e.reason == reason)
    }

    /// Number of entries with the given reason.
    pub fn count(&self, reason: AuditReason) -> usize {
        self.by_reason(reason).count()
    }

    /// Rows of this log that were dropped from the matrix.
    pub fn removed_rows(&self) -> BTreeSet<usize> {
        self.entries
            .iter()
            .filter(|e| e.reason.is_removal())
            .map(|e| e.row)
            .collect()
    }

    /// Re-express every row through `origin`, where `origin[i]` is the row
    /// that row `i` of the stage input came from.
    pub fn remap_rows(&mut self, origin: &[usize]) {
        for entry in &mut self.entries {
            if let Some(&row) = origin.get(entry.row) {
                entry.row = row;
            }
        }
    }

    /// Labels of all removed rows, in recording order.
    pub fn removed_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.reason.is_removal())
            .map(|e| e.label.as_str())
            .collect()
    }

    /// Append every label to `<dir>/<date>_<reason>.txt`, one per line.
    ///
    /// Files are opened in append mode so repeated calls within a run (or a
    /// day) accumulate rather than overwrite.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P, date: &str) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut reasons: Vec<AuditReason> = self.entries.iter().map(|e| e.reason).collect();
        reasons.sort();
        reasons.dedup();

        for reason in reasons {
            let path = dir.join(format!("{}_{}.txt", date, reason.name()));
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = BufWriter::new(file);
            for entry in self.by_reason(reason) {
                writeln!(writer, "{}", entry.label)?;
            }
            writer.flush()?;
            log::debug!("Appended {} labels to {:?}", self.count(reason), path);
        }

        Ok(())
    }

    /// Same as [`write_to_dir`](Self::write_to_dir) with today's local date.
    pub fn write_today<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        self.write_to_dir(dir, &date)
    }
}

impl std::fmt::Display for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Audit Log")?;
        writeln!(f, "  Entries: {}", self.len())?;
        let mut reasons: Vec<AuditReason> = self.entries.iter().map(|e| e.reason).collect();
        reasons.sort();
        reasons.dedup();
        for reason in reasons {
            writeln!(f, "  {:<24} {}", reason.name(), self.count(reason))?;
        }
        Ok(())
    }
}
