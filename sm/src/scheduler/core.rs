//! Scheduler core - validation and packing of proposed sessions
//!
//! Proposals from any strategy pass through one packing machine that
//! enforces every calendar invariant: sessions sit inside the work window,
//! never overlap, respect the daily cap and the weekly hour budget, and a
//! subtask never starts before its prerequisites have finished. Hours that
//! cannot be placed within the horizon fail the whole plan.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::{Roadmap, Session, StudyPlan, Subtask};
use crate::error::PlanError;

use super::config::SchedulerConfig;
use super::order::dependency_order;
use super::proposer::{PlanProposer, PlanRequest, ProposedSession};

const EPS: f64 = 1e-6;

/// A validated plan plus any adjustments made while packing
#[derive(Debug)]
pub struct ScheduledPlan {
    pub plan: StudyPlan,
    pub warnings: Vec<String>,
}

/// Turns proposals into invariant-satisfying study plans
pub struct Scheduler {
    proposer: Box<dyn PlanProposer>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(proposer: Box<dyn PlanProposer>, config: SchedulerConfig) -> Self {
        Self { proposer, config }
    }

    /// Generate a study plan for a roadmap
    pub async fn schedule(&self, roadmap: &Roadmap, request: &PlanRequest) -> Result<ScheduledPlan, PlanError> {
        if !(1..=40).contains(&request.hours_per_week) {
            return Err(PlanError::Validation("hours_per_week must be between 1 and 40".to_string()));
        }
        if roadmap.title.trim().is_empty() || roadmap.subject.trim().is_empty() {
            return Err(PlanError::Validation("Roadmap title and subject must not be empty".to_string()));
        }
        if !roadmap.subtasks.iter().any(|s| !s.completed) {
            return Err(PlanError::Validation(
                "Roadmap has no incomplete subtasks to schedule".to_string(),
            ));
        }
        self.config
            .validate()
            .map_err(|e| PlanError::Configuration(e.to_string()))?;

        info!(
            roadmap_id = %roadmap.id,
            plan_type = %request.plan_type,
            hours_per_week = request.hours_per_week,
            "Scheduling study plan"
        );

        let proposals = self.proposer.propose(roadmap, request).await?;
        let (sessions, warnings) = self.pack(roadmap, request, proposals)?;

        let plan = StudyPlan::new(
            &roadmap.id,
            request.plan_type,
            request.hours_per_week,
            request.starting_date,
            sessions,
        );

        info!(
            plan_id = %plan.id,
            session_count = plan.sessions.len(),
            total_hours = plan.total_hours(),
            "Plan scheduled"
        );

        Ok(ScheduledPlan { plan, warnings })
    }

    /// Place proposals subtask by subtask in dependency order
    fn pack(
        &self,
        roadmap: &Roadmap,
        request: &PlanRequest,
        proposals: Vec<ProposedSession>,
    ) -> Result<(Vec<Session>, Vec<String>), PlanError> {
        let eff_max = self
            .config
            .max_session_hours
            .min(request.hours_per_week as f64)
            .min(self.config.daily_cap(request.plan_type));
        let eff_min = self.config.min_session_hours.min(eff_max);

        // Group tagged proposals per subtask, keep untagged in order
        let mut by_subtask: HashMap<&str, Vec<&ProposedSession>> = HashMap::new();
        let mut untagged: Vec<&ProposedSession> = Vec::new();
        for proposal in &proposals {
            match &proposal.subtask_id {
                Some(id) => by_subtask.entry(id.as_str()).or_default().push(proposal),
                None => untagged.push(proposal),
            }
        }
        for group in by_subtask.values_mut() {
            group.sort_by_key(|p| p.start);
        }

        let mut packer = Packer::new(&self.config, request);
        let mut sessions: Vec<Session> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut clamped = 0usize;
        // Finish time per subtask, for prerequisite gating
        let mut finished_at: HashMap<&str, NaiveDateTime> = HashMap::new();

        let order = dependency_order(&roadmap.subtasks);
        for &i in &order {
            let subtask = &roadmap.subtasks[i];
            if subtask.completed {
                continue;
            }

            let earliest = subtask
                .prerequisites
                .iter()
                .filter_map(|p| finished_at.get(p.as_str()))
                .max()
                .copied();

            let required = self.required_hours(subtask);
            let mut placed_hours = 0.0;

            for proposal in by_subtask.get(subtask.id.as_str()).map(Vec::as_slice).unwrap_or(&[]) {
                let hours = proposal.duration_hours().clamp(eff_min, eff_max);
                if (hours - proposal.duration_hours()).abs() > EPS {
                    clamped += 1;
                }
                let proposed_start = proposal.start.with_timezone(&self.config.offset()).naive_local();
                let slot = packer
                    .place(hours, earliest.map(|e| e.max(proposed_start)).or(Some(proposed_start)))
                    .ok_or_else(|| self.overflow(roadmap, &sessions))?;
                sessions.push(self.emit(proposal.summary.clone(), proposal.description.clone(), subtask, slot)?);
                placed_hours += slot_hours(slot);
                finished_at.insert(subtask.id.as_str(), slot.1);
            }

            // Coverage repair: make up any shortfall before dependents run
            if placed_hours + EPS < required {
                if by_subtask.contains_key(subtask.id.as_str()) {
                    warnings.push(format!(
                        "Added make-up sessions for '{}' ({:.1}h proposed, {:.1}h needed)",
                        subtask.title, placed_hours, required
                    ));
                }
                let mut remaining = required - placed_hours;
                let mut first = !sessions.iter().any(|s| s.subtask_id.as_deref() == Some(subtask.id.as_str()));
                while remaining > EPS {
                    let hours = remaining.min(eff_max).max(eff_min);
                    let slot = packer
                        .place(hours, earliest)
                        .ok_or_else(|| self.overflow(roadmap, &sessions))?;
                    let description = if first {
                        subtask.description.clone()
                    } else {
                        format!("{} (continued)", subtask.title)
                    };
                    first = false;
                    sessions.push(self.emit(
                        format!("Study Session: {}", subtask.title),
                        description,
                        subtask,
                        slot,
                    )?);
                    remaining -= slot_hours(slot);
                    finished_at.insert(subtask.id.as_str(), slot.1);
                }
            }
        }

        // Untagged proposals (reviews, recaps) go after the covered work
        for proposal in untagged {
            let hours = proposal.duration_hours().clamp(eff_min, eff_max);
            if (hours - proposal.duration_hours()).abs() > EPS {
                clamped += 1;
            }
            let proposed_start = proposal.start.with_timezone(&self.config.offset()).naive_local();
            let slot = packer
                .place(hours, Some(proposed_start))
                .ok_or_else(|| self.overflow(roadmap, &sessions))?;
            let start = self.at(slot.0)?;
            let end = self.at(slot.1)?;
            sessions.push(Session {
                summary: proposal.summary.clone(),
                description: proposal.description.clone(),
                subtask_id: None,
                start,
                end,
            });
        }

        if clamped > 0 {
            warnings.push(format!("Clamped {} session(s) to the configured length bounds", clamped));
        }

        self.audit(&sessions, request, &mut warnings);
        debug!(session_count = sessions.len(), warning_count = warnings.len(), "pack: done");
        Ok((sessions, warnings))
    }

    /// Hours a subtask needs, quantized to what the packer can place
    fn required_hours(&self, subtask: &Subtask) -> f64 {
        let hours = if subtask.is_estimated() {
            subtask.estimated_hours
        } else {
            self.config.default_session_hours
        };
        (hours * 60.0).round() / 60.0
    }

    /// Hours still owed when placement ran out of horizon
    fn overflow(&self, roadmap: &Roadmap, sessions: &[Session]) -> PlanError {
        let required: f64 = roadmap
            .subtasks
            .iter()
            .filter(|s| !s.completed)
            .map(|s| self.required_hours(s))
            .sum();
        let placed: f64 = sessions.iter().map(Session::duration_hours).sum();
        PlanError::ConstraintViolation {
            overflow_hours: (required - placed).max(self.config.min_session_hours),
        }
    }

    fn emit(
        &self,
        summary: String,
        description: String,
        subtask: &Subtask,
        slot: (NaiveDateTime, NaiveDateTime),
    ) -> Result<Session, PlanError> {
        Ok(Session {
            summary,
            description,
            subtask_id: Some(subtask.id.clone()),
            start: self.at(slot.0)?,
            end: self.at(slot.1)?,
        })
    }

    fn at(&self, naive: NaiveDateTime) -> Result<chrono::DateTime<chrono::FixedOffset>, PlanError> {
        naive
            .and_local_timezone(self.config.offset())
            .single()
            .ok_or_else(|| PlanError::Validation(format!("Unrepresentable session time: {}", naive)))
    }

    /// Recheck invariants over the finished session list
    fn audit(&self, sessions: &[Session], request: &PlanRequest, warnings: &mut Vec<String>) {
        for pair in sessions.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                warnings.push(format!(
                    "Sessions overlap: '{}' and '{}'",
                    pair[0].summary, pair[1].summary
                ));
            }
        }

        let mut weekly: HashMap<i64, f64> = HashMap::new();
        for session in sessions {
            let days = (session.start.date_naive() - request.starting_date).num_days();
            *weekly.entry(days.div_euclid(7)).or_insert(0.0) += session.duration_hours();
        }
        for (week, hours) in weekly {
            if hours > request.hours_per_week as f64 + EPS {
                warnings.push(format!("Week {} holds {:.1}h, over the {}h budget", week, hours, request.hours_per_week));
            }
        }
    }
}

/// Hours a placed slot actually spans
fn slot_hours(slot: (NaiveDateTime, NaiveDateTime)) -> f64 {
    (slot.1 - slot.0).num_minutes() as f64 / 60.0
}

/// Monotonic slot placement under window, cap, and budget constraints
///
/// All bookkeeping is in whole minutes, matching the granularity of the
/// slots it hands out, so caps and budgets never drift from the sessions
/// actually placed.
struct Packer<'a> {
    config: &'a SchedulerConfig,
    request: &'a PlanRequest,
    cursor: NaiveDateTime,
    day_used: HashMap<NaiveDate, i64>,
    week_used: HashMap<i64, i64>,
    horizon: NaiveDate,
}

impl<'a> Packer<'a> {
    fn new(config: &'a SchedulerConfig, request: &'a PlanRequest) -> Self {
        Self {
            config,
            request,
            cursor: request.starting_date.and_time(config.work_start),
            day_used: HashMap::new(),
            week_used: HashMap::new(),
            horizon: request.starting_date + Duration::weeks(config.max_horizon_weeks as i64),
        }
    }

    /// Place a session of `hours`, never before `earliest` or the cursor
    ///
    /// Returns None when no slot exists before the horizon. Every retry
    /// advances at least one day, so the horizon bounds the search.
    fn place(&mut self, hours: f64, earliest: Option<NaiveDateTime>) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let minutes = (hours * 60.0).round() as i64;
        let daily_cap = (self.config.daily_cap(self.request.plan_type) * 60.0).round() as i64;
        let weekly_budget = self.request.hours_per_week as i64 * 60;
        let mut start = match earliest {
            Some(e) if e > self.cursor => e,
            _ => self.cursor,
        };

        loop {
            // Inside the daily work window
            if start.time() < self.config.work_start {
                start = start.date().and_time(self.config.work_start);
            }
            let window_end = start.date().and_time(self.config.work_end);
            if start + Duration::minutes(minutes) > window_end {
                start = (start.date() + Duration::days(1)).and_time(self.config.work_start);
                continue;
            }

            let date = start.date();
            if date >= self.horizon {
                return None;
            }

            // Daily cap
            let day_used = self.day_used.get(&date).copied().unwrap_or(0);
            if day_used + minutes > daily_cap {
                start = (date + Duration::days(1)).and_time(self.config.work_start);
                continue;
            }

            // Weekly budget: defer overflow to the next week's first day
            let week = (date - self.request.starting_date).num_days().div_euclid(7);
            let week_used = self.week_used.get(&week).copied().unwrap_or(0);
            if week_used + minutes > weekly_budget {
                let next_week_start = self.request.starting_date + Duration::weeks(week + 1);
                start = next_week_start.and_time(self.config.work_start);
                continue;
            }

            let end = start + Duration::minutes(minutes);
            *self.day_used.entry(date).or_insert(0) += minutes;
            *self.week_used.entry(week).or_insert(0) += minutes;
            self.cursor = end;
            return Some((start, end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::proposer::GreedyProposer;
    use super::*;
    use crate::domain::{Difficulty, PlanType};

    fn roadmap(estimates: &[f64]) -> Roadmap {
        let mut rm = Roadmap::new("Learn React", "Web Development", Difficulty::Beginner);
        let mut prev_id: Option<String> = None;
        for (i, &hours) in estimates.iter().enumerate() {
            let mut s = Subtask::new(format!("Topic {}", i + 1), "").with_estimate(hours);
            if let Some(prev) = &prev_id {
                s.prerequisites.push(prev.clone());
            }
            prev_id = Some(s.id.clone());
            rm.add_subtask(s);
        }
        rm
    }

    fn request(hours_per_week: u32) -> PlanRequest {
        PlanRequest {
            plan_type: PlanType::Weekly,
            hours_per_week,
            starting_date: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
        }
    }

    fn scheduler() -> Scheduler {
        let config = SchedulerConfig::default();
        Scheduler::new(Box::new(GreedyProposer::new(config.clone())), config)
    }

    #[tokio::test]
    async fn test_schedule_respects_invariants() {
        let rm = roadmap(&[3.0, 7.0, 2.0]);
        let scheduled = scheduler().schedule(&rm, &request(10)).await.unwrap();
        let plan = &scheduled.plan;

        assert!((plan.total_hours() - 12.0).abs() < 1e-9);

        // Sorted, non-overlapping
        for pair in plan.sessions.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(!pair[0].overlaps(&pair[1]));
        }

        // Work window and session bounds
        let config = SchedulerConfig::default();
        for s in &plan.sessions {
            assert!(s.start.time() >= config.work_start);
            assert!(s.end.time() <= config.work_end);
            assert!(s.duration_hours() >= config.min_session_hours - EPS);
            assert!(s.duration_hours() <= config.max_session_hours + EPS);
        }

        // Weekly budget
        for (_, hours) in plan.weekly_totals() {
            assert!(hours <= 10.0 + EPS);
        }
        assert!(scheduled.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_prerequisites_ordered_in_time() {
        let rm = roadmap(&[2.0, 2.0, 2.0]);
        let scheduled = scheduler().schedule(&rm, &request(10)).await.unwrap();

        let end_of = |id: &str| {
            scheduled
                .plan
                .sessions
                .iter()
                .filter(|s| s.subtask_id.as_deref() == Some(id))
                .map(|s| s.end)
                .max()
                .unwrap()
        };
        let start_of = |id: &str| {
            scheduled
                .plan
                .sessions
                .iter()
                .filter(|s| s.subtask_id.as_deref() == Some(id))
                .map(|s| s.start)
                .min()
                .unwrap()
        };

        assert!(end_of(&rm.subtasks[0].id) <= start_of(&rm.subtasks[1].id));
        assert!(end_of(&rm.subtasks[1].id) <= start_of(&rm.subtasks[2].id));
    }

    #[tokio::test]
    async fn test_tight_budget_spills_into_later_weeks() {
        // Ten 1h topics at 1h/week need at least ten weeks
        let rm = roadmap(&[1.0; 10]);
        let scheduled = scheduler().schedule(&rm, &request(1)).await.unwrap();
        let plan = &scheduled.plan;

        assert_eq!(plan.sessions.len(), 10);
        for (_, hours) in plan.weekly_totals() {
            assert!(hours <= 1.0 + EPS);
        }
        let last = plan.sessions.last().unwrap();
        let span_days = (last.start.date_naive() - plan.starting_date).num_days();
        assert!(span_days >= 63, "expected at least 10 weeks, got {} days", span_days);
    }

    #[tokio::test]
    async fn test_monthly_daily_cap() {
        let rm = roadmap(&[4.0, 4.0]);
        let config = SchedulerConfig::default();
        let sched = Scheduler::new(Box::new(GreedyProposer::new(config.clone())), config);
        let req = PlanRequest {
            plan_type: PlanType::Monthly,
            hours_per_week: 8,
            starting_date: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
        };
        let scheduled = sched.schedule(&rm, &req).await.unwrap();

        let mut per_day: HashMap<NaiveDate, f64> = HashMap::new();
        for s in &scheduled.plan.sessions {
            *per_day.entry(s.start.date_naive()).or_insert(0.0) += s.duration_hours();
        }
        for (_, hours) in per_day {
            assert!(hours <= 2.0 + EPS);
        }
    }

    #[tokio::test]
    async fn test_horizon_overflow_fails() {
        let config = SchedulerConfig {
            max_horizon_weeks: 2,
            ..Default::default()
        };
        let rm = roadmap(&[20.0, 20.0]);
        let sched = Scheduler::new(Box::new(GreedyProposer::new(config.clone())), config);
        let result = sched.schedule(&rm, &request(5)).await;

        match result {
            Err(PlanError::ConstraintViolation { overflow_hours }) => {
                assert!(overflow_hours > 0.0);
            }
            other => panic!("expected ConstraintViolation, got {:?}", other.map(|s| s.plan.id)),
        }
    }

    #[tokio::test]
    async fn test_zero_budget_rejected() {
        let rm = roadmap(&[2.0]);
        let result = scheduler().schedule(&rm, &request(0)).await;
        assert!(matches!(result, Err(PlanError::Validation(_))));
    }

    #[tokio::test]
    async fn test_all_completed_rejected() {
        let mut rm = roadmap(&[2.0, 2.0]);
        for s in &mut rm.subtasks {
            s.completed = true;
        }
        let result = scheduler().schedule(&rm, &request(10)).await;
        assert!(matches!(result, Err(PlanError::Validation(_))));
    }

    #[tokio::test]
    async fn test_fractional_estimates_covered_at_minute_granularity() {
        let rm = roadmap(&[3.5816849, 1.2583333]);
        let scheduled = scheduler().schedule(&rm, &request(10)).await.unwrap();
        let plan = &scheduled.plan;

        // Sessions land on whole minutes
        for s in &plan.sessions {
            assert_eq!((s.end - s.start).num_seconds() % 60, 0);
        }

        // Each estimate is covered once rounded to the same granularity
        let required: f64 = [3.5816849f64, 1.2583333].iter().map(|h| (h * 60.0).round() / 60.0).sum();
        assert!(plan.total_hours() + EPS >= required);

        for (_, hours) in plan.weekly_totals() {
            assert!(hours <= 10.0 + EPS);
        }
    }

    #[test]
    fn test_packer_defers_to_next_week() {
        let config = SchedulerConfig::default();
        let req = request(4);
        let mut packer = Packer::new(&config, &req);

        // 4h budget: one 3h and the next 3h must land in week two
        let (start1, _) = packer.place(3.0, None).unwrap();
        let (start2, _) = packer.place(3.0, None).unwrap();
        assert_eq!(start1.date(), req.starting_date);
        assert_eq!(start2.date(), req.starting_date + Duration::weeks(1));
    }
}
