//! Session proposal strategies
//!
//! A proposer turns a roadmap plus pacing parameters into candidate
//! sessions. The oracle proposer asks the model for a calendar draft; the
//! greedy proposer derives one deterministically from estimates. Either
//! way the scheduler core re-validates and packs every proposal, so a
//! proposer only has to be plausible, not correct.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{PlanType, Roadmap, Subtask};
use crate::error::PlanError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::parse::extract_json_object;

use super::config::SchedulerConfig;
use super::order::dependency_order;

/// System prompt for plan generation
pub const DEFAULT_SCHEDULE_PROMPT: &str = "\
You are an expert study planner. Create a realistic calendar of study \
sessions for the given subtasks.

Rules:
- Schedule sessions between 9:00 AM and 8:00 PM.
- Respect the weekly hour budget and the stated pacing.
- Cover prerequisites before the subtasks that depend on them.
- Name each session after the subtask it covers, e.g. \
\"Study Session: React Hooks\".
- Use ISO 8601 timestamps with timezone offsets.

Respond with JSON matching the provided schema.";

/// Pacing parameters for one scheduling run
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Weekly or monthly pacing
    pub plan_type: PlanType,

    /// Weekly hour budget (positive)
    pub hours_per_week: u32,

    /// First day sessions may be placed on
    pub starting_date: NaiveDate,
}

/// A candidate session before validation and packing
#[derive(Debug, Clone)]
pub struct ProposedSession {
    /// Subtask this session covers, when the proposer can tell
    pub subtask_id: Option<String>,
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ProposedSession {
    /// Proposed length in hours
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }
}

/// Strategy for drafting candidate sessions
#[async_trait]
pub trait PlanProposer: Send + Sync {
    async fn propose(&self, roadmap: &Roadmap, request: &PlanRequest) -> Result<Vec<ProposedSession>, PlanError>;
}

// Oracle wire format for proposed plans

#[derive(Debug, Deserialize)]
struct EventsOutput {
    events: Vec<EventOutput>,
}

#[derive(Debug, Deserialize)]
struct EventOutput {
    summary: String,
    #[serde(default)]
    description: String,
    start: EventTimeOutput,
    end: EventTimeOutput,
}

#[derive(Debug, Deserialize)]
struct EventTimeOutput {
    #[serde(rename = "dateTime")]
    date_time: String,
}

/// JSON schema constraining the oracle's plan output
fn events_schema() -> serde_json::Value {
    let time = serde_json::json!({
        "type": "object",
        "properties": { "dateTime": { "type": "string" } },
        "required": ["dateTime"],
        "additionalProperties": false,
    });
    serde_json::json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string" },
                        "description": { "type": "string" },
                        "start": time,
                        "end": time,
                    },
                    "required": ["summary", "description", "start", "end"],
                    "additionalProperties": false,
                },
            },
        },
        "required": ["events"],
        "additionalProperties": false,
    })
}

/// Oracle-backed proposer
pub struct OracleProposer {
    llm: Arc<dyn LlmClient>,
    config: SchedulerConfig,
    max_tokens: u32,
}

impl OracleProposer {
    pub fn new(llm: Arc<dyn LlmClient>, config: SchedulerConfig, max_tokens: u32) -> Self {
        Self { llm, config, max_tokens }
    }

    /// Describe the roadmap and pacing for the oracle
    fn build_plan_message(&self, roadmap: &Roadmap, request: &PlanRequest) -> String {
        let mut msg = format!(
            "Goal: {}\nPacing: {}\nWeekly budget: {} hours\nStart date: {}\n\nSubtasks:\n",
            roadmap.title, request.plan_type, request.hours_per_week, request.starting_date
        );
        for subtask in roadmap.subtasks.iter().filter(|s| !s.completed) {
            let hours = if subtask.is_estimated() {
                format!("{}h", subtask.estimated_hours)
            } else {
                format!("{}h (assumed)", self.config.default_session_hours)
            };
            msg.push_str(&format!("- {} ({})", subtask.title, hours));
            if !subtask.prerequisites.is_empty() {
                let titles: Vec<&str> = roadmap
                    .subtasks
                    .iter()
                    .filter(|s| subtask.prerequisites.contains(&s.id))
                    .map(|s| s.title.as_str())
                    .collect();
                if !titles.is_empty() {
                    msg.push_str(&format!(" [after: {}]", titles.join(", ")));
                }
            }
            msg.push('\n');
        }
        msg
    }

    /// Parse a timestamp, tolerating missing offsets
    fn parse_time(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt);
        }
        // Oracles sometimes omit the offset; interpret in the configured zone
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
        naive.and_local_timezone(self.config.offset()).single()
    }

    /// Match a session back to the subtask it covers by title
    ///
    /// Prefers the longest matching title so nested titles ("React",
    /// "React Hooks") resolve to the more specific subtask.
    fn tag_subtask(&self, roadmap: &Roadmap, summary: &str, description: &str) -> Option<String> {
        let summary = summary.to_lowercase();
        let description = description.to_lowercase();
        roadmap
            .subtasks
            .iter()
            .filter(|s| !s.title.trim().is_empty())
            .filter(|s| {
                let title = s.title.to_lowercase();
                summary.contains(&title) || description.contains(&title)
            })
            .max_by_key(|s| s.title.trim().len())
            .map(|s| s.id.clone())
    }
}

#[async_trait]
impl PlanProposer for OracleProposer {
    async fn propose(&self, roadmap: &Roadmap, request: &PlanRequest) -> Result<Vec<ProposedSession>, PlanError> {
        debug!(roadmap_id = %roadmap.id, "OracleProposer::propose: called");

        let completion = CompletionRequest::new(
            DEFAULT_SCHEDULE_PROMPT,
            self.build_plan_message(roadmap, request),
            self.max_tokens,
        )
        .with_json_schema("study_plan", events_schema());

        let response = self
            .llm
            .complete(completion)
            .await
            .map_err(PlanError::schedule_failure)?;

        let output: EventsOutput = match serde_json::from_str(&response.content) {
            Ok(o) => o,
            Err(_) => {
                let json = extract_json_object(&response.content)
                    .ok_or_else(|| PlanError::Parse("No JSON object found in plan response".to_string()))?;
                serde_json::from_str(json).map_err(|e| PlanError::Parse(format!("Invalid plan output: {}", e)))?
            }
        };

        if output.events.is_empty() {
            return Err(PlanError::Parse("Oracle proposed no sessions".to_string()));
        }

        let mut proposals = Vec::new();
        for event in output.events {
            let (Some(start), Some(end)) = (
                self.parse_time(&event.start.date_time),
                self.parse_time(&event.end.date_time),
            ) else {
                warn!(summary = %event.summary, "propose: dropping event with unparseable time");
                continue;
            };
            if end <= start {
                warn!(summary = %event.summary, "propose: dropping event with non-positive duration");
                continue;
            }
            proposals.push(ProposedSession {
                subtask_id: self.tag_subtask(roadmap, &event.summary, &event.description),
                summary: event.summary,
                description: event.description,
                start,
                end,
            });
        }

        if proposals.is_empty() {
            return Err(PlanError::Parse("All proposed sessions were unusable".to_string()));
        }

        Ok(proposals)
    }
}

/// Deterministic estimate-driven proposer
///
/// Splits each subtask's estimate into session-sized chunks in dependency
/// order. All chunks are proposed at the plan start; the scheduler core
/// packs them into the calendar.
pub struct GreedyProposer {
    config: SchedulerConfig,
}

impl GreedyProposer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Largest chunk that can ever be placed under the request's budgets
    fn effective_max(&self, request: &PlanRequest) -> f64 {
        self.config
            .max_session_hours
            .min(request.hours_per_week as f64)
            .min(self.config.daily_cap(request.plan_type))
    }

    fn chunks(&self, subtask: &Subtask, max: f64) -> Vec<f64> {
        let total = if subtask.is_estimated() {
            subtask.estimated_hours
        } else {
            self.config.default_session_hours.min(max)
        };

        let mut chunks = Vec::new();
        let mut remaining = total;
        while remaining > max + f64::EPSILON {
            chunks.push(max);
            remaining -= max;
        }
        if remaining > f64::EPSILON {
            chunks.push(remaining);
        }
        chunks
    }
}

#[async_trait]
impl PlanProposer for GreedyProposer {
    async fn propose(&self, roadmap: &Roadmap, request: &PlanRequest) -> Result<Vec<ProposedSession>, PlanError> {
        debug!(roadmap_id = %roadmap.id, "GreedyProposer::propose: called");

        let max = self.effective_max(request);
        let offset = self.config.offset();
        let start = request
            .starting_date
            .and_time(self.config.work_start)
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| PlanError::Validation("Starting date is not representable".to_string()))?;

        let mut proposals = Vec::new();
        for &i in &dependency_order(&roadmap.subtasks) {
            let subtask = &roadmap.subtasks[i];
            if subtask.completed {
                continue;
            }
            for (n, hours) in self.chunks(subtask, max).into_iter().enumerate() {
                let minutes = (hours * 60.0).round() as i64;
                proposals.push(ProposedSession {
                    subtask_id: Some(subtask.id.clone()),
                    summary: format!("Study Session: {}", subtask.title),
                    description: if n == 0 {
                        subtask.description.clone()
                    } else {
                        format!("{} (continued)", subtask.title)
                    },
                    start,
                    end: start + chrono::Duration::minutes(minutes),
                });
            }
        }

        if proposals.is_empty() {
            return Err(PlanError::Validation(
                "Roadmap has no incomplete subtasks to schedule".to_string(),
            ));
        }

        Ok(proposals)
    }
}

/// Oracle proposer with deterministic fallback
///
/// Oracle generation and parse failures degrade to the greedy draft so a
/// flaky oracle never leaves the user without a plan. Validation and
/// configuration failures still propagate; retrying a different strategy
/// cannot fix those.
pub struct FallbackProposer {
    primary: Box<dyn PlanProposer>,
    fallback: Box<dyn PlanProposer>,
}

impl FallbackProposer {
    pub fn new(primary: Box<dyn PlanProposer>, fallback: Box<dyn PlanProposer>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PlanProposer for FallbackProposer {
    async fn propose(&self, roadmap: &Roadmap, request: &PlanRequest) -> Result<Vec<ProposedSession>, PlanError> {
        match self.primary.propose(roadmap, request).await {
            Ok(proposals) => Ok(proposals),
            Err(err @ (PlanError::Generation(_) | PlanError::Parse(_) | PlanError::QuotaExceeded(_))) => {
                warn!(error = %err, "FallbackProposer: primary failed, using fallback draft");
                self.fallback.propose(roadmap, request).await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::LlmError;

    fn roadmap() -> Roadmap {
        let mut rm = Roadmap::new("Learn React", "Web Development", Difficulty::Beginner);
        let jsx = Subtask::new("JSX Basics", "Syntax").with_estimate(3.0);
        let mut hooks = Subtask::new("React Hooks", "useState").with_estimate(7.0);
        hooks.prerequisites.push(jsx.id.clone());
        rm.add_subtask(jsx);
        rm.add_subtask(hooks);
        rm.add_subtask(Subtask::new("Reading", "Docs")); // unestimated
        rm
    }

    fn request() -> PlanRequest {
        PlanRequest {
            plan_type: PlanType::Weekly,
            hours_per_week: 10,
            starting_date: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_greedy_chunks_and_order() {
        let proposer = GreedyProposer::new(SchedulerConfig::default());
        let proposals = proposer.propose(&roadmap(), &request()).await.unwrap();

        // 3h -> one chunk, 7h -> 3+3+1, unestimated -> one 2h chunk
        assert_eq!(proposals.len(), 5);
        assert_eq!(proposals[0].summary, "Study Session: JSX Basics");
        assert_eq!(proposals[0].duration_hours(), 3.0);
        assert_eq!(proposals[3].duration_hours(), 1.0);
        assert_eq!(proposals[4].duration_hours(), 2.0);
        assert!(proposals.iter().all(|p| p.subtask_id.is_some()));
    }

    #[tokio::test]
    async fn test_greedy_skips_completed() {
        let mut rm = roadmap();
        rm.subtasks[0].completed = true;
        let proposer = GreedyProposer::new(SchedulerConfig::default());
        let proposals = proposer.propose(&rm, &request()).await.unwrap();
        assert!(proposals.iter().all(|p| !p.summary.contains("JSX")));
    }

    #[tokio::test]
    async fn test_oracle_proposer_parses_and_tags() {
        let content = serde_json::json!({
            "events": [
                {
                    "summary": "Study Session: JSX Basics",
                    "description": "Syntax drills",
                    "start": {"dateTime": "2025-10-06T09:00:00+00:00"},
                    "end": {"dateTime": "2025-10-06T11:00:00+00:00"},
                },
                {
                    "summary": "Review",
                    "description": "General recap",
                    "start": {"dateTime": "2025-10-07T09:00:00"},
                    "end": {"dateTime": "2025-10-07T10:00:00"},
                },
            ]
        })
        .to_string();

        let rm = roadmap();
        let proposer = OracleProposer::new(
            Arc::new(MockLlmClient::new(vec![content])),
            SchedulerConfig::default(),
            4096,
        );
        let proposals = proposer.propose(&rm, &request()).await.unwrap();

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].subtask_id, Some(rm.subtasks[0].id.clone()));
        assert_eq!(proposals[1].subtask_id, None);
        // Offset-free timestamp got the configured zone
        assert_eq!(proposals[1].duration_hours(), 1.0);
    }

    #[tokio::test]
    async fn test_oracle_tags_longest_matching_title() {
        let mut rm = Roadmap::new("Learn React", "Web Development", Difficulty::Beginner);
        rm.add_subtask(Subtask::new("React", "Overview").with_estimate(2.0));
        rm.add_subtask(Subtask::new("React Hooks", "useState").with_estimate(2.0));

        let content = serde_json::json!({
            "events": [
                {
                    "summary": "Study Session: React Hooks",
                    "description": "",
                    "start": {"dateTime": "2025-10-06T09:00:00+00:00"},
                    "end": {"dateTime": "2025-10-06T11:00:00+00:00"},
                },
            ]
        })
        .to_string();

        let proposer = OracleProposer::new(
            Arc::new(MockLlmClient::new(vec![content])),
            SchedulerConfig::default(),
            4096,
        );
        let proposals = proposer.propose(&rm, &request()).await.unwrap();

        // "React" also matches; the more specific title wins
        assert_eq!(proposals[0].subtask_id, Some(rm.subtasks[1].id.clone()));
    }

    #[tokio::test]
    async fn test_oracle_proposer_drops_bad_events() {
        let content = serde_json::json!({
            "events": [
                {
                    "summary": "Backwards",
                    "description": "",
                    "start": {"dateTime": "2025-10-06T11:00:00+00:00"},
                    "end": {"dateTime": "2025-10-06T09:00:00+00:00"},
                },
            ]
        })
        .to_string();

        let proposer = OracleProposer::new(
            Arc::new(MockLlmClient::new(vec![content])),
            SchedulerConfig::default(),
            4096,
        );
        let result = proposer.propose(&roadmap(), &request()).await;
        assert!(matches!(result, Err(PlanError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fallback_on_generation_failure() {
        let oracle = OracleProposer::new(
            Arc::new(MockLlmClient::failing(|| LlmError::ApiError {
                status: 500,
                message: "boom".to_string(),
            })),
            SchedulerConfig::default(),
            4096,
        );
        let proposer = FallbackProposer::new(
            Box::new(oracle),
            Box::new(GreedyProposer::new(SchedulerConfig::default())),
        );

        let proposals = proposer.propose(&roadmap(), &request()).await.unwrap();
        assert!(!proposals.is_empty());
        assert!(proposals[0].summary.starts_with("Study Session:"));
    }

    #[tokio::test]
    async fn test_fallback_propagates_configuration_failure() {
        let oracle = OracleProposer::new(
            Arc::new(MockLlmClient::failing(|| {
                LlmError::MissingApiKey("STUDYMAP_ORACLE_KEY".to_string())
            })),
            SchedulerConfig::default(),
            4096,
        );
        let proposer = FallbackProposer::new(
            Box::new(oracle),
            Box::new(GreedyProposer::new(SchedulerConfig::default())),
        );

        let result = proposer.propose(&roadmap(), &request()).await;
        assert!(matches!(result, Err(PlanError::Configuration(_))));
    }
}
