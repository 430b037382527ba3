//! Study plan scheduling
//!
//! Proposal strategies draft candidate sessions; the core packs them into
//! a calendar that honors the work window, daily caps, weekly budgets, and
//! prerequisite ordering.

use std::sync::Arc;

mod config;
mod core;
mod order;
mod proposer;

pub use config::SchedulerConfig;
pub use core::{ScheduledPlan, Scheduler};
pub use order::dependency_order;
pub use proposer::{
    DEFAULT_SCHEDULE_PROMPT, FallbackProposer, GreedyProposer, OracleProposer, PlanProposer, PlanRequest,
    ProposedSession,
};

use crate::llm::LlmClient;

/// Build the standard scheduler: oracle proposals with a greedy fallback
pub fn oracle_scheduler(llm: Arc<dyn LlmClient>, config: SchedulerConfig, max_tokens: u32) -> Scheduler {
    let proposer = FallbackProposer::new(
        Box::new(OracleProposer::new(llm, config.clone(), max_tokens)),
        Box::new(GreedyProposer::new(config.clone())),
    );
    Scheduler::new(Box::new(proposer), config)
}
