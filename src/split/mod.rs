//! Splitting of rows whose annotation covers several events.

mod annotations;
pub mod plan;
mod provenance;

pub use annotations::{split_multi_annotations, split_pair, SplitResult};
pub use plan::{plan_row, plan_split, RowSplit, SplitPlan};
pub use provenance::SplitProvenance;
