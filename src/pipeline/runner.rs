//! Pipeline runner for composing and executing cleaning steps.

use crate::data::{AuditLog, MatrixPair};
use crate::error::{CleanError, Result};
use crate::filter::{remove_buggy_rows_pair, remove_invariant_rows_pair, BugFilterConfig, PipeCheck};
use crate::split::{split_pair, SplitProvenance};
use serde::{Deserialize, Serialize};

fn default_require_locus_tag() -> bool {
    true
}

/// A step in the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Remove rows whose annotation matches a known bug pattern.
    RemoveBuggyRows {
        #[serde(default)]
        pipe_check: PipeCheck,
        #[serde(default = "default_require_locus_tag")]
        require_locus_tag: bool,
    },
    /// Remove rows without variation across samples.
    RemoveInvariantRows,
    /// Split multi-annotation rows into one row per event.
    SplitAnnotations,
}

impl PipelineStep {
    fn bug_filter(config: BugFilterConfig) -> Self {
        PipelineStep::RemoveBuggyRows {
            pipe_check: config.pipe_check,
            require_locus_tag: config.require_locus_tag,
        }
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(CleanError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CleanError::from)
    }
}

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct CleanedMatrices {
    /// Cleaned code and allele matrices.
    pub pair: MatrixPair,
    /// Every row removed or flagged, across all steps. Entry rows index the
    /// pipeline input.
    pub audit: AuditLog,
    /// Provenance of the last split step, if the pipeline split rows.
    pub provenance: Option<SplitProvenance>,
}

/// Builder for constructing and running cleaning pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Steps added so far.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Add bug filtering with the default configuration.
    pub fn remove_buggy_rows(self) -> Self {
        self.remove_buggy_rows_with(BugFilterConfig::default())
    }

    /// Add bug filtering with a custom configuration.
    pub fn remove_buggy_rows_with(mut self, config: BugFilterConfig) -> Self {
        self.steps.push(PipelineStep::bug_filter(config));
        self
    }

    /// Add removal of rows without variation.
    pub fn remove_invariant_rows(mut self) -> Self {
        self.steps.push(PipelineStep::RemoveInvariantRows);
        self
    }

    /// Add splitting of multi-annotation rows.
    pub fn split_annotations(mut self) -> Self {
        self.steps.push(PipelineStep::SplitAnnotations);
        self
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline on a matrix pair.
    pub fn run(&self, pair: &MatrixPair) -> Result<CleanedMatrices> {
        if self.steps.is_empty() {
            return Err(CleanError::Pipeline(
                "Pipeline has no steps".to_string(),
            ));
        }

        log::info!(
            "Running pipeline '{}' ({} steps) on {} rows",
            self.name,
            self.steps.len(),
            pair.n_rows()
        );

        let mut state = PipelineState::new(pair.clone());
        for (i, step) in self.steps.iter().enumerate() {
            state = state.apply(step).map_err(|e| {
                CleanError::Pipeline(format!("Step {} ({:?}) failed: {}", i + 1, step, e))
            })?;
        }

        Ok(state.finalize())
    }
}

/// Internal state during pipeline execution.
struct PipelineState {
    pair: MatrixPair,
    audit: AuditLog,
    provenance: Option<SplitProvenance>,
    /// Pipeline-input row of every current row.
    origin: Vec<usize>,
}

impl PipelineState {
    fn new(pair: MatrixPair) -> Self {
        let origin = (0..pair.n_rows()).collect();
        Self {
            pair,
            audit: AuditLog::new(),
            provenance: None,
            origin,
        }
    }

    fn apply(mut self, step: &PipelineStep) -> Result<Self> {
        match step {
            PipelineStep::RemoveBuggyRows {
                pipe_check,
                require_locus_tag,
            } => {
                let config = BugFilterConfig {
                    pipe_check: *pipe_check,
                    require_locus_tag: *require_locus_tag,
                };
                let (pair, audit) = remove_buggy_rows_pair(&self.pair, &config)?;
                self.absorb_filter(pair, audit);
            }
            PipelineStep::RemoveInvariantRows => {
                let (pair, audit) = remove_invariant_rows_pair(&self.pair)?;
                self.absorb_filter(pair, audit);
            }
            PipelineStep::SplitAnnotations => {
                let (pair, provenance) = split_pair(&self.pair)?;
                let mut audit = provenance.audit.clone();
                audit.remap_rows(&self.origin);
                self.origin = provenance
                    .source_rows
                    .iter()
                    .map(|&row| self.origin[row])
                    .collect();
                self.pair = pair;
                self.audit.extend(audit);
                self.provenance = Some(provenance);
            }
        }
        Ok(self)
    }

    fn absorb_filter(&mut self, pair: MatrixPair, mut audit: AuditLog) {
        let removed = audit.removed_rows();
        audit.remap_rows(&self.origin);
        self.origin = self
            .origin
            .iter()
            .enumerate()
            .filter(|(row, _)| !removed.contains(row))
            .map(|(_, &origin)| origin)
            .collect();
        self.pair = pair;
        self.audit.extend(audit);
    }

    fn finalize(self) -> CleanedMatrices {
        CleanedMatrices {
            pair: self.pair,
            audit: self.audit,
            provenance: self.provenance,
        }
    }
}

/// Convenience function to run the canonical cleaning pipeline:
/// bug filtering, presence filtering, then annotation splitting.
pub fn run_default(pair: &MatrixPair) -> Result<CleanedMatrices> {
    Pipeline::new()
        .name("default")
        .remove_buggy_rows()
        .remove_invariant_rows()
        .split_annotations()
        .run(pair)
}
