//! StudyPlan and Session domain types
//!
//! A StudyPlan is the scheduler's output: an ordered, non-overlapping
//! sequence of calendar sessions realizing a roadmap within a weekly time
//! budget. Plans are immutable once generated; regeneration replaces the
//! whole session set.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use planstore::{IndexValue, Record, now_ms};

use super::id::generate_id;

/// Plan horizon flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Weekly,
    Monthly,
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// One concrete calendar time-slot of study work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Event title (e.g., "Study Session: React Hooks")
    pub summary: String,

    /// Topics covered in this slot
    pub description: String,

    /// Subtask this session covers, when known (used for export keying)
    #[serde(default)]
    pub subtask_id: Option<String>,

    /// Start, with explicit UTC offset
    pub start: DateTime<FixedOffset>,

    /// End, with explicit UTC offset (end > start)
    pub end: DateTime<FixedOffset>,
}

impl Session {
    /// Session length in hours
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }

    /// Whether two sessions overlap in time
    pub fn overlaps(&self, other: &Session) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A scheduled realization of a roadmap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    /// Unique identifier
    pub id: String,

    /// Roadmap this plan realizes
    pub roadmap_id: String,

    /// Weekly or monthly pacing
    pub plan_type: PlanType,

    /// Weekly time budget in hours (positive)
    pub hours_per_week: u32,

    /// First day of the plan
    pub starting_date: NaiveDate,

    /// Sessions sorted ascending by start, non-overlapping
    pub sessions: Vec<Session>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl StudyPlan {
    /// Create a new plan from scheduler output
    pub fn new(
        roadmap_id: impl Into<String>,
        plan_type: PlanType,
        hours_per_week: u32,
        starting_date: NaiveDate,
        sessions: Vec<Session>,
    ) -> Self {
        let roadmap_id = roadmap_id.into();
        let now = now_ms();
        Self {
            id: generate_id("plan", &roadmap_id),
            roadmap_id,
            plan_type,
            hours_per_week,
            starting_date,
            sessions,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total scheduled hours
    pub fn total_hours(&self) -> f64 {
        self.sessions.iter().map(Session::duration_hours).sum()
    }

    /// Scheduled hours per 7-day bucket anchored at `starting_date`
    ///
    /// Bucket 0 covers days 0..7, bucket 1 days 7..14, and so on.
    pub fn weekly_totals(&self) -> HashMap<i64, f64> {
        let mut totals = HashMap::new();
        for session in &self.sessions {
            let days = (session.start.date_naive() - self.starting_date).num_days();
            let bucket = days.div_euclid(7);
            *totals.entry(bucket).or_insert(0.0) += session.duration_hours();
        }
        totals
    }
}

impl Record for StudyPlan {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "study_plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("roadmap".to_string(), IndexValue::String(self.roadmap_id.clone()));
        fields.insert("plan_type".to_string(), IndexValue::String(self.plan_type.to_string()));
        fields
    }
}
