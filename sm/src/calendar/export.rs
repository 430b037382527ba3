//! Idempotent export of study plans to a calendar
//!
//! Every session maps to a stable event id derived from the plan's roadmap
//! and the session's identity, so re-exporting the same plan updates events
//! in place instead of duplicating them.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::{Session, StudyPlan};
use crate::error::PlanError;

use super::api::{CalendarApi, CalendarError, CalendarEvent, EventTime};
use super::auth::CalendarAuth;

/// Outcome of exporting one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Created,
    Updated,
    Failed(String),
}

/// Per-session export result
#[derive(Debug, Clone)]
pub struct SessionExport {
    /// Index of the session within the plan
    pub index: usize,
    /// Stable calendar event id
    pub event_id: String,
    pub outcome: ExportOutcome,
}

/// Full export report
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub results: Vec<SessionExport>,
}

impl ExportReport {
    pub fn created(&self) -> usize {
        self.results.iter().filter(|r| r.outcome == ExportOutcome::Created).count()
    }

    pub fn updated(&self) -> usize {
        self.results.iter().filter(|r| r.outcome == ExportOutcome::Updated).count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ExportOutcome::Failed(_)))
            .count()
    }
}

/// Exports study plans to a calendar through any CalendarApi
pub struct CalendarExporter {
    api: Arc<dyn CalendarApi>,
}

impl CalendarExporter {
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api }
    }

    /// Export every session of a plan
    ///
    /// Existing events with the same id are updated. Individual session
    /// failures are recorded in the report; only authorization problems
    /// abort the export as a whole.
    pub async fn export_sessions(&self, auth: &CalendarAuth, plan: &StudyPlan) -> Result<ExportReport, PlanError> {
        if auth.expired() {
            return Err(PlanError::Configuration("Calendar authorization has expired".to_string()));
        }

        info!(plan_id = %plan.id, session_count = plan.sessions.len(), "Exporting plan to calendar");

        let mut report = ExportReport::default();
        for (index, session) in plan.sessions.iter().enumerate() {
            let event_id = event_id(plan, session, index);
            let event = to_event(&event_id, session);

            let outcome = match self.api.insert_event(auth, &event).await {
                Ok(()) => ExportOutcome::Created,
                Err(CalendarError::Conflict) => match self.api.update_event(auth, &event).await {
                    Ok(()) => ExportOutcome::Updated,
                    Err(CalendarError::Unauthorized) => {
                        return Err(PlanError::Configuration("Calendar authorization rejected".to_string()));
                    }
                    Err(e) => ExportOutcome::Failed(e.to_string()),
                },
                Err(CalendarError::Unauthorized) => {
                    return Err(PlanError::Configuration("Calendar authorization rejected".to_string()));
                }
                Err(e) => ExportOutcome::Failed(e.to_string()),
            };

            if let ExportOutcome::Failed(reason) = &outcome {
                warn!(%event_id, %reason, "export_sessions: session export failed");
            }

            report.results.push(SessionExport {
                index,
                event_id,
                outcome,
            });
        }

        info!(
            created = report.created(),
            updated = report.updated(),
            failed = report.failed(),
            "Export complete"
        );

        Ok(report)
    }
}

/// Stable event id for one session of a plan
///
/// Derived from the roadmap, the session's subtask (or summary when the
/// session is untagged), and its index, so regenerated plans that keep the
/// same shape overwrite their previous events. Hex digest characters stay
/// within the calendar's allowed id alphabet.
pub fn event_id(plan: &StudyPlan, session: &Session, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plan.roadmap_id.as_bytes());
    hasher.update(b"\x00");
    match &session.subtask_id {
        Some(id) => hasher.update(id.as_bytes()),
        None => hasher.update(session.summary.as_bytes()),
    }
    hasher.update(b"\x00");
    hasher.update(index.to_string().as_bytes());
    format!("sm{}", &hex::encode(hasher.finalize())[..30])
}

fn to_event(event_id: &str, session: &Session) -> CalendarEvent {
    CalendarEvent {
        id: event_id.to_string(),
        summary: session.summary.clone(),
        description: session.description.clone(),
        start: EventTime {
            date_time: session.start.to_rfc3339(),
        },
        end: EventTime {
            date_time: session.end.to_rfc3339(),
        },
    }
}
