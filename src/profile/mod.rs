//! Data profiling for annotated variant matrices.

mod annotation;

pub use annotation::{profile_annotations, AnnotationProfile};
