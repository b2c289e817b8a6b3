//! Variant Matrix Cleaning Library
//!
//! This library cleans genomic variant matrices whose rows are labelled with
//! annotation strings from a variant-annotation pipeline, so that downstream
//! phylogenetic analyses work on well-formed rows.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (VariantMatrix, MatrixPair, annotation grammar, AuditLog)
//! - **filter**: Row filtering (annotation bug patterns, rows without variation)
//! - **split**: Expansion of multi-annotation rows with provenance tracking
//! - **profile**: Annotation profiling
//! - **pipeline**: Pipeline composition and execution
//!
//! # Example
//!
//! ```no_run
//! use vmclean::prelude::*;
//!
//! // Load data
//! let pair = MatrixPair::from_tsv("codes.tsv", "alleles.tsv").unwrap();
//!
//! // Run cleaning pipeline
//! let cleaned = Pipeline::new()
//!     .remove_buggy_rows()
//!     .remove_invariant_rows()
//!     .split_annotations()
//!     .run(&pair)
//!     .unwrap();
//!
//! // Persist what was removed
//! cleaned.audit.write_today("logs").unwrap();
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod profile;
pub mod split;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        check_correspondence, Allele, AlleleMatrix, AnnotationError, AuditEntry, AuditLog,
        AuditReason, Cell, CodeMatrix, GeneSegment, MatrixPair, ParsedAnnotation, RawAnnotation,
        VariantMatrix,
    };
    pub use crate::error::{CleanError, Result};
    pub use crate::filter::{
        // Bug filtering
        remove_buggy_rows, remove_buggy_rows_pair, BugClass, BugFilterConfig, PipeCheck,
        // Presence filtering
        remove_invariant_rows, remove_invariant_rows_pair,
    };
    pub use crate::pipeline::{run_default, CleanedMatrices, Pipeline, PipelineConfig, PipelineStep};
    pub use crate::profile::{profile_annotations, AnnotationProfile};
    pub use crate::split::{
        plan_split, split_multi_annotations, split_pair, SplitPlan, SplitProvenance, SplitResult,
    };
}
