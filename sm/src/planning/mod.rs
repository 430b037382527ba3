//! Goal planning module
//!
//! Oracle-driven decomposition of learning goals into subtask graphs.

mod decomposer;

pub use decomposer::{DEFAULT_DECOMPOSE_PROMPT, DecomposedGoal, DecomposerConfig, GoalDecomposer};
