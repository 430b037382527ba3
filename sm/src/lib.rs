//! Studymap - Learning Roadmap Planning Core
//!
//! Studymap turns a named learning goal into an actionable study calendar.
//! An oracle decomposes the goal into prerequisite-linked subtasks, a
//! constraint scheduler packs them into non-overlapping sessions inside a
//! weekly hour budget, and an idempotent exporter pushes the sessions to a
//! calendar.
//!
//! # Core Concepts
//!
//! - **Oracle Proposes, Scheduler Disposes**: model output is a draft; every
//!   calendar invariant is enforced locally before a plan is returned
//! - **Typed Failures**: operations return populated plans or a specific
//!   [`PlanError`], never silently empty results
//! - **Stable Event Ids**: re-exporting a plan updates events in place
//!
//! # Modules
//!
//! - [`domain`] - Roadmap, Subtask, StudyPlan, and Session types
//! - [`planning`] - Oracle-driven goal decomposition
//! - [`scheduler`] - Proposal strategies and the packing core
//! - [`calendar`] - Calendar API client and idempotent export
//! - [`llm`] - Oracle client trait and gateway implementation
//! - [`config`] - Configuration types and loading

pub mod calendar;
pub mod config;
pub mod domain;
pub mod llm;
pub mod planning;
pub mod scheduler;

mod error;
mod parse;

// Re-export commonly used types
pub use calendar::{CalendarApi, CalendarAuth, CalendarError, CalendarExporter, ExportOutcome, ExportReport};
pub use config::{CalendarConfig, Config, OracleConfig, StorageConfig};
pub use domain::{
    Difficulty, Filter, FilterOp, IndexValue, PlanType, Record, Roadmap, Session, Store, StudyPlan, Subtask,
    SubtaskStatus,
};
pub use error::PlanError;
pub use llm::{CompletionRequest, CompletionResponse, GatewayClient, LlmClient, LlmError, create_client};
pub use parse::{extract_json_array, extract_json_object};
pub use planning::{DecomposedGoal, DecomposerConfig, GoalDecomposer};
pub use scheduler::{
    FallbackProposer, GreedyProposer, OracleProposer, PlanProposer, PlanRequest, ScheduledPlan, Scheduler,
    SchedulerConfig, oracle_scheduler,
};
