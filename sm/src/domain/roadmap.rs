//! Roadmap domain type
//!
//! A Roadmap is a named learning goal holding an ordered collection of
//! subtasks. Subtask order is insertion order, not dependency order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use planstore::{IndexValue, Record, now_ms};

use super::id::generate_id;
use super::subtask::Subtask;

/// Difficulty level of a learning goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Parse from a user-supplied string; None for unrecognized levels
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// A named learning goal decomposed into subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    /// Unique identifier (e.g., "019431-roadmap-learn-react")
    pub id: String,

    /// Human-readable title (required, non-empty)
    pub title: String,

    /// Subject area (required, non-empty)
    pub subject: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Difficulty level
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Optional overall deadline
    #[serde(default)]
    pub deadline: Option<NaiveDate>,

    /// User tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Subtasks in insertion order
    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Roadmap {
    /// Create a new roadmap with a generated ID
    pub fn new(title: impl Into<String>, subject: impl Into<String>, difficulty: Difficulty) -> Self {
        let title = title.into();
        let now = now_ms();
        Self {
            id: generate_id("roadmap", &title),
            title,
            subject: subject.into(),
            description: String::new(),
            difficulty,
            deadline: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a subtask, stamping its owning roadmap id
    pub fn add_subtask(&mut self, mut subtask: Subtask) {
        subtask.roadmap_id = self.id.clone();
        self.subtasks.push(subtask);
        self.updated_at = now_ms();
    }

    /// Total estimated hours across all subtasks
    pub fn estimated_hours(&self) -> f64 {
        self.subtasks.iter().map(|s| s.estimated_hours).sum()
    }
}

impl Record for Roadmap {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "roadmaps"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("difficulty".to_string(), IndexValue::String(self.difficulty.to_string()));
        fields
    }
}
