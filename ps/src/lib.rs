//! PlanStore - generic JSONL-backed record persistence
//!
//! Stores planning records (roadmaps, subtasks, study plans) as append-only
//! JSONL logs, one per collection. Replay is latest-wins, so the log doubles
//! as a cheap history until `compact` rewrites it.
//!
//! # Architecture
//!
//! ```text
//! {base}/
//! ├── roadmaps.jsonl       # one put/delete operation per line
//! ├── subtasks.jsonl
//! └── study_plans.jsonl
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planstore::{Filter, Record, Store};
//!
//! let store = Store::open(".planstore")?;
//! store.create(&roadmap)?;
//! let loaded: Option<Roadmap> = store.get(&roadmap.id)?;
//! let drafts: Vec<Subtask> = store.query(&[Filter::eq("roadmap", roadmap.id.clone())])?;
//! ```
//!
//! Concurrency is the owning application's concern: the store assumes one
//! writer per base directory (last write wins at the file level).

mod record;
mod store;

pub use record::{IndexValue, Record, now_ms};
pub use store::{Filter, FilterOp, Store};
