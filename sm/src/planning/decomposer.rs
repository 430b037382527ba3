//! GoalDecomposer - oracle-driven decomposition of learning goals
//!
//! Takes a named learning goal and breaks it into an ordered set of
//! subtasks with hour estimates and prerequisite links.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Difficulty, Roadmap, Subtask};
use crate::error::PlanError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::parse::extract_json_array;

/// System prompt for goal decomposition
pub const DEFAULT_DECOMPOSE_PROMPT: &str = "\
You are an expert learning path designer. Break down learning goals into \
clear, actionable subtasks.

Given a learning goal, create 5-12 subtasks that progressively build \
towards mastery. Each subtask should be specific and achievable.

Respond ONLY with a JSON array of objects, each with these fields:
- \"title\": short actionable name (string)
- \"description\": what to do and what success looks like (string)
- \"estimated_hours\": realistic time estimate (number)
- \"prerequisites\": array of titles of earlier subtasks this depends on

Order subtasks from foundational to advanced. Do not include any text \
outside the JSON array.";

/// Oracle output schema for one subtask
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubtaskOutput {
    title: String,
    #[serde(default)]
    description: String,
    /// Estimate in hours; oracles sometimes emit a numeric string
    #[serde(default, deserialize_with = "lenient_hours")]
    estimated_hours: Option<f64>,
    #[serde(default)]
    prerequisites: Vec<String>,
}

/// Accept a JSON number, a numeric string, or null for hour estimates
fn lenient_hours<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hours {
        Number(f64),
        Text(String),
        Null,
    }

    match Hours::deserialize(deserializer)? {
        Hours::Number(n) => Ok(Some(n)),
        Hours::Text(s) => Ok(s.trim().parse::<f64>().ok()),
        Hours::Null => Ok(None),
    }
}

/// Result of goal decomposition
#[derive(Debug, Clone)]
pub struct DecomposedGoal {
    /// Subtasks with resolved prerequisite ids, stamped with the roadmap id
    pub subtasks: Vec<Subtask>,
    /// Any warnings during decomposition
    pub warnings: Vec<String>,
}

/// Configuration for decomposition
#[derive(Debug, Clone)]
pub struct DecomposerConfig {
    /// System prompt for decomposition
    pub system_prompt: String,
    /// Max tokens for the decomposition response
    pub max_tokens: u32,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_DECOMPOSE_PROMPT.to_string(),
            max_tokens: 4096,
        }
    }
}

/// GoalDecomposer breaks learning goals into subtasks
pub struct GoalDecomposer {
    llm: Arc<dyn LlmClient>,
    config: DecomposerConfig,
}

impl GoalDecomposer {
    /// Create a new decomposer
    pub fn new(llm: Arc<dyn LlmClient>, config: DecomposerConfig) -> Self {
        Self { llm, config }
    }

    /// Decompose a roadmap's goal into subtasks
    ///
    /// Validates the goal locally, asks the oracle for a subtask breakdown,
    /// then resolves prerequisite titles to subtask ids. Returned subtasks
    /// carry the roadmap's id; the caller attaches them to the roadmap.
    pub async fn decompose(&self, roadmap: &Roadmap) -> Result<DecomposedGoal, PlanError> {
        if roadmap.title.trim().is_empty() {
            return Err(PlanError::Validation("Goal title must not be empty".to_string()));
        }
        if roadmap.subject.trim().is_empty() {
            return Err(PlanError::Validation("Goal subject must not be empty".to_string()));
        }

        info!(roadmap_id = %roadmap.id, title = %roadmap.title, "Decomposing learning goal");

        let request = CompletionRequest::new(
            self.config.system_prompt.clone(),
            build_goal_message(roadmap),
            self.config.max_tokens,
        );

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(PlanError::decompose_failure)?;

        let outputs = parse_subtask_outputs(&response.content)?;
        let (subtasks, warnings) = self.build_subtasks(roadmap, outputs);

        if subtasks.is_empty() {
            return Err(PlanError::Parse("Oracle returned no usable subtasks".to_string()));
        }

        info!(
            roadmap_id = %roadmap.id,
            subtask_count = subtasks.len(),
            warning_count = warnings.len(),
            "Decomposition complete"
        );

        Ok(DecomposedGoal { subtasks, warnings })
    }

    /// Convert oracle outputs into domain subtasks with resolved prerequisites
    fn build_subtasks(&self, roadmap: &Roadmap, outputs: Vec<SubtaskOutput>) -> (Vec<Subtask>, Vec<String>) {
        let mut warnings = Vec::new();

        if !(5..=12).contains(&outputs.len()) {
            warnings.push(format!(
                "Oracle returned {} subtasks, expected 5-12",
                outputs.len()
            ));
        }

        // First pass: create subtasks, record title -> id
        let mut kept: Vec<(Subtask, Vec<String>)> = Vec::new();
        let mut title_to_id: HashMap<String, String> = HashMap::new();
        for output in outputs {
            let title = output.title.trim().to_string();
            if title.is_empty() {
                warnings.push("Dropped subtask with empty title".to_string());
                continue;
            }
            if title_to_id.contains_key(&title.to_lowercase()) {
                warnings.push(format!("Dropped duplicate subtask title '{}'", title));
                continue;
            }

            let mut subtask = Subtask::new(&title, output.description.trim());
            subtask.roadmap_id = roadmap.id.clone();
            match output.estimated_hours {
                Some(hours) if hours > 0.0 => subtask.estimated_hours = hours,
                Some(hours) => {
                    warnings.push(format!("Ignored non-positive estimate {}h for '{}'", hours, title));
                }
                None => {
                    debug!(%title, "build_subtasks: no estimate provided");
                }
            }

            title_to_id.insert(title.to_lowercase(), subtask.id.clone());
            kept.push((subtask, output.prerequisites));
        }

        // Second pass: resolve prerequisite titles to ids
        let mut subtasks = Vec::with_capacity(kept.len());
        for (mut subtask, prerequisites) in kept {
            for prereq in &prerequisites {
                let key = prereq.trim().to_lowercase();
                match title_to_id.get(&key) {
                    Some(id) if *id == subtask.id => {
                        warnings.push(format!("Dropped self-prerequisite on '{}'", subtask.title));
                    }
                    Some(id) => subtask.prerequisites.push(id.clone()),
                    None => {
                        // Kept verbatim; the scheduler resolves titles as a fallback
                        warnings.push(format!(
                            "Unresolved prerequisite '{}' on '{}'",
                            prereq, subtask.title
                        ));
                        subtask.prerequisites.push(prereq.trim().to_string());
                    }
                }
            }
            subtasks.push(subtask);
        }

        if let Some(cycle_member) = find_cycle(&subtasks) {
            warnings.push(format!(
                "Prerequisite cycle detected involving '{}', scheduling will use listed order",
                cycle_member
            ));
        }

        for warning in &warnings {
            warn!(roadmap_id = %roadmap.id, "{}", warning);
        }

        (subtasks, warnings)
    }
}

/// Build the user message describing the goal
fn build_goal_message(roadmap: &Roadmap) -> String {
    let mut msg = format!(
        "Learning goal: {}\nSubject area: {}\nCurrent level: {}",
        roadmap.title, roadmap.subject, roadmap.difficulty
    );
    if roadmap.difficulty == Difficulty::Beginner {
        msg.push_str("\nAssume no prior knowledge.");
    }
    if !roadmap.description.trim().is_empty() {
        msg.push_str("\nAdditional context: ");
        msg.push_str(roadmap.description.trim());
    }
    msg
}

/// Extract and decode the subtask array from oracle text
fn parse_subtask_outputs(content: &str) -> Result<Vec<SubtaskOutput>, PlanError> {
    let json = extract_json_array(content)
        .ok_or_else(|| PlanError::Parse("No JSON array found in oracle response".to_string()))?;

    serde_json::from_str(json).map_err(|e| PlanError::Parse(format!("Invalid subtask array: {}", e)))
}

/// DFS cycle detection over prerequisite edges; returns a member title if found
fn find_cycle(subtasks: &[Subtask]) -> Option<String> {
    let by_id: HashMap<&str, &Subtask> = subtasks.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut done: HashSet<&str> = HashSet::new();

    for start in subtasks {
        if done.contains(start.id.as_str()) {
            continue;
        }
        let mut in_progress: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&Subtask, usize)> = vec![(start, 0)];
        in_progress.insert(start.id.as_str());

        while let Some((node, next_edge)) = stack.pop() {
            if next_edge < node.prerequisites.len() {
                stack.push((node, next_edge + 1));
                let prereq_id = node.prerequisites[next_edge].as_str();
                if in_progress.contains(prereq_id) {
                    return Some(by_id.get(prereq_id).map(|s| s.title.clone()).unwrap_or_default());
                }
                if !done.contains(prereq_id)
                    && let Some(prereq) = by_id.get(prereq_id)
                {
                    in_progress.insert(prereq_id);
                    stack.push((prereq, 0));
                }
            } else {
                in_progress.remove(node.id.as_str());
                done.insert(node.id.as_str());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::LlmError;

    fn roadmap() -> Roadmap {
        Roadmap::new("Learn React", "Web Development", Difficulty::Beginner)
    }

    fn decomposer(responses: Vec<String>) -> GoalDecomposer {
        GoalDecomposer::new(Arc::new(MockLlmClient::new(responses)), DecomposerConfig::default())
    }

    fn oracle_array() -> String {
        serde_json::json!([
            {"title": "JSX Basics", "description": "Learn JSX syntax", "estimated_hours": 3, "prerequisites": []},
            {"title": "Components", "description": "Function components", "estimated_hours": 4, "prerequisites": ["JSX Basics"]},
            {"title": "Props and State", "description": "Data flow", "estimated_hours": 4, "prerequisites": ["Components"]},
            {"title": "Hooks", "description": "useState and useEffect", "estimated_hours": 6, "prerequisites": ["Props and State"]},
            {"title": "Routing", "description": "React Router", "estimated_hours": 3, "prerequisites": ["Components"]},
        ])
        .to_string()
    }

    #[tokio::test]
    async fn test_decompose_resolves_prerequisites() {
        let d = decomposer(vec![oracle_array()]);
        let result = d.decompose(&roadmap()).await.unwrap();

        assert_eq!(result.subtasks.len(), 5);
        assert!(result.warnings.is_empty());

        let jsx = &result.subtasks[0];
        let components = &result.subtasks[1];
        assert_eq!(components.prerequisites, vec![jsx.id.clone()]);
        assert!(result.subtasks.iter().all(|s| s.roadmap_id == result.subtasks[0].roadmap_id));
        assert_eq!(result.subtasks[3].estimated_hours, 6.0);
    }

    #[tokio::test]
    async fn test_decompose_wrapped_in_prose() {
        let wrapped = format!("Here is your roadmap:\n```json\n{}\n```", oracle_array());
        let d = decomposer(vec![wrapped]);
        let result = d.decompose(&roadmap()).await.unwrap();
        assert_eq!(result.subtasks.len(), 5);
    }

    #[tokio::test]
    async fn test_decompose_unknown_prerequisite_kept_verbatim() {
        let array = serde_json::json!([
            {"title": "A", "description": "", "estimated_hours": 2, "prerequisites": ["Nonexistent"]},
            {"title": "B", "description": "", "estimated_hours": 2, "prerequisites": ["A"]},
            {"title": "C", "description": "", "estimated_hours": 2, "prerequisites": []},
            {"title": "D", "description": "", "estimated_hours": 2, "prerequisites": []},
            {"title": "E", "description": "", "estimated_hours": 2, "prerequisites": []},
        ])
        .to_string();

        let d = decomposer(vec![array]);
        let result = d.decompose(&roadmap()).await.unwrap();
        assert_eq!(result.subtasks[0].prerequisites, vec!["Nonexistent"]);
        assert!(result.warnings.iter().any(|w| w.contains("Nonexistent")));
    }

    #[tokio::test]
    async fn test_decompose_lenient_hours() {
        let array = r#"[
            {"title": "A", "description": "", "estimated_hours": "2.5", "prerequisites": []},
            {"title": "B", "description": "", "prerequisites": []},
            {"title": "C", "description": "", "estimated_hours": -1, "prerequisites": []},
            {"title": "D", "description": "", "estimated_hours": 2, "prerequisites": []},
            {"title": "E", "description": "", "estimated_hours": 2, "prerequisites": []}
        ]"#;

        let d = decomposer(vec![array.to_string()]);
        let result = d.decompose(&roadmap()).await.unwrap();

        assert_eq!(result.subtasks[0].estimated_hours, 2.5);
        assert!(!result.subtasks[1].is_estimated());
        assert!(!result.subtasks[2].is_estimated());
        assert!(result.warnings.iter().any(|w| w.contains("non-positive")));
    }

    #[tokio::test]
    async fn test_decompose_empty_array_is_parse_error() {
        let d = decomposer(vec!["[]".to_string()]);
        let result = d.decompose(&roadmap()).await;
        assert!(matches!(result, Err(PlanError::Parse(_))));
    }

    #[tokio::test]
    async fn test_decompose_no_json_is_parse_error() {
        let d = decomposer(vec!["I cannot help with that.".to_string()]);
        let result = d.decompose(&roadmap()).await;
        assert!(matches!(result, Err(PlanError::Parse(_))));
    }

    #[tokio::test]
    async fn test_decompose_empty_title_is_validation_error() {
        let d = decomposer(vec![]);
        let mut rm = roadmap();
        rm.title = "  ".to_string();
        let result = d.decompose(&rm).await;
        assert!(matches!(result, Err(PlanError::Validation(_))));
        // Rejected before any oracle call
    }

    #[tokio::test]
    async fn test_decompose_rate_limit_is_quota_error() {
        let client = MockLlmClient::failing(|| LlmError::RateLimited {
            retry_after: std::time::Duration::from_secs(60),
        });
        let d = GoalDecomposer::new(Arc::new(client), DecomposerConfig::default());
        let result = d.decompose(&roadmap()).await;
        assert!(matches!(result, Err(PlanError::QuotaExceeded(_))));
    }

    #[test]
    fn test_find_cycle() {
        let mut a = Subtask::new("A", "");
        let mut b = Subtask::new("B", "");
        a.prerequisites.push(b.id.clone());
        b.prerequisites.push(a.id.clone());
        assert!(find_cycle(&[a.clone(), b.clone()]).is_some());

        b.prerequisites.clear();
        assert!(find_cycle(&[a, b]).is_none());
    }
}
