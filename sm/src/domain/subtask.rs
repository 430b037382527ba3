//! Subtask domain type
//!
//! A Subtask is one unit of learning work inside a Roadmap, with an
//! estimated duration and optional prerequisites.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use planstore::{IndexValue, Record, now_ms};

use super::id::generate_id;

/// Subtask progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl std::fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One unit of learning work
///
/// Prerequisites hold subtask ids where the decomposer could resolve them,
/// otherwise raw titles. The relation is a best-effort hint: it is not
/// guaranteed acyclic and may reference subtasks that do not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique identifier (e.g., "019431-subtask-react-hooks")
    pub id: String,

    /// Owning roadmap ID (stamped by `Roadmap::add_subtask`)
    #[serde(default)]
    pub roadmap_id: String,

    /// Short title
    pub title: String,

    /// What the learner will cover
    #[serde(default)]
    pub description: String,

    /// Estimated hours to complete (0 = unestimated)
    #[serde(default)]
    pub estimated_hours: f64,

    /// Subtask ids or titles that should be completed first
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Kept in sync with `status` by `set_status`
    #[serde(default)]
    pub completed: bool,

    /// Progress status
    #[serde(default)]
    pub status: SubtaskStatus,

    /// Optional target date
    #[serde(default)]
    pub deadline: Option<NaiveDate>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Subtask {
    /// Create a new subtask with a generated ID
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("subtask", &title),
            roadmap_id: String::new(),
            title,
            description: description.into(),
            estimated_hours: 0.0,
            prerequisites: Vec::new(),
            completed: false,
            status: SubtaskStatus::NotStarted,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the estimated hours (builder style)
    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = hours.max(0.0);
        self
    }

    /// Add a prerequisite reference (id or title)
    pub fn add_prerequisite(&mut self, prereq: impl Into<String>) {
        self.prerequisites.push(prereq.into());
        self.updated_at = now_ms();
    }

    /// Update the status, keeping `completed` in sync
    pub fn set_status(&mut self, status: SubtaskStatus) {
        self.status = status;
        self.completed = status == SubtaskStatus::Completed;
        self.updated_at = now_ms();
    }

    /// Whether the subtask carries a nonzero estimate
    pub fn is_estimated(&self) -> bool {
        self.estimated_hours > 0.0
    }
}

impl Record for Subtask {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "subtasks"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("roadmap".to_string(), IndexValue::String(self.roadmap_id.clone()));
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_new() {
        let st = Subtask::new("React Hooks", "useState and useEffect");
        assert!(st.id.contains("-subtask-"));
        assert!(st.id.contains("react-hooks"));
        assert_eq!(st.estimated_hours, 0.0);
        assert!(!st.is_estimated());
        assert!(st.prerequisites.is_empty());
        assert_eq!(st.status, SubtaskStatus::NotStarted);
        assert!(!st.completed);
    }

    #[test]
    fn test_set_status_syncs_completed() {
        let mut st = Subtask::new("Test", "");
        st.set_status(SubtaskStatus::Completed);
        assert!(st.completed);

        st.set_status(SubtaskStatus::InProgress);
        assert!(!st.completed);
    }

    #[test]
    fn test_with_estimate_clamps_negative() {
        let st = Subtask::new("Test", "").with_estimate(-3.0);
        assert_eq!(st.estimated_hours, 0.0);
    }

    #[test]
    fn test_indexed_fields() {
        let mut st = Subtask::new("Test", "");
        st.roadmap_id = "rm-1".to_string();
        let fields = st.indexed_fields();

        assert_eq!(fields.get("roadmap"), Some(&IndexValue::String("rm-1".to_string())));
        assert_eq!(
            fields.get("status"),
            Some(&IndexValue::String("not_started".to_string()))
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut st = Subtask::new("CSS Grid", "Layout fundamentals").with_estimate(3.5);
        st.add_prerequisite("CSS Basics");

        let json = serde_json::to_string(&st).unwrap();
        let back: Subtask = serde_json::from_str(&json).unwrap();

        assert_eq!(st.id, back.id);
        assert_eq!(back.estimated_hours, 3.5);
        assert_eq!(back.prerequisites, vec!["CSS Basics"]);
    }
}
