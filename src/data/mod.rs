//! Data structures for variant-matrix cleaning.

mod allele;
pub mod annotation;
mod audit;
mod pair;
mod variant_matrix;

pub use allele::{Allele, Cell, MAX_CODE, MIN_CODE};
pub use annotation::{AnnotationError, GeneSegment, ParsedAnnotation, RawAnnotation};
pub use audit::{AuditEntry, AuditLog, AuditReason};
pub use pair::{check_correspondence, MatrixPair};
pub use variant_matrix::{AlleleMatrix, CodeMatrix, VariantMatrix, LABEL_HEADER};
