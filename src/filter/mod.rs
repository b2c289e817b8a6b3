//! Row filtering primitives for variant matrices.

pub mod bugs;
pub mod presence;

pub use bugs::{
    plan_bug_removal, remove_buggy_rows, remove_buggy_rows_pair, satisfies_pipe_ratio, BugClass,
    BugFilterConfig, PipeCheck,
};
pub use presence::{remove_invariant_rows, remove_invariant_rows_pair};
