//! Domain types for studymap
//!
//! Core domain types: Roadmap, Subtask, StudyPlan, Session.
//! All persistable types implement the `planstore::Record` trait.

mod id;
mod plan;
mod roadmap;
mod subtask;

pub use id::{generate_id, slugify};
pub use plan::{PlanType, Session, StudyPlan};
pub use roadmap::{Difficulty, Roadmap};
pub use subtask::{Subtask, SubtaskStatus};

// Re-export planstore types for convenience
pub use planstore::{Filter, FilterOp, IndexValue, Record, Store};
