//! Scheduling constraints configuration

use chrono::{FixedOffset, NaiveTime};
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::domain::PlanType;

/// Scheduling constraints
///
/// All session placement happens inside the daily work window, capped per
/// day and per 7-day week. Times are naive; `utc_offset_minutes` fixes the
/// timezone sessions are emitted in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Earliest session start within a day
    #[serde(rename = "work-start")]
    pub work_start: NaiveTime,

    /// Latest session end within a day
    #[serde(rename = "work-end")]
    pub work_end: NaiveTime,

    /// Minimum session length in hours
    #[serde(rename = "min-session-hours")]
    pub min_session_hours: f64,

    /// Maximum session length in hours
    #[serde(rename = "max-session-hours")]
    pub max_session_hours: f64,

    /// Maximum study hours per day for weekly plans
    #[serde(rename = "daily-cap-weekly")]
    pub daily_cap_weekly: f64,

    /// Maximum study hours per day for monthly plans
    #[serde(rename = "daily-cap-monthly")]
    pub daily_cap_monthly: f64,

    /// Session length assumed for subtasks with no estimate
    #[serde(rename = "default-session-hours")]
    pub default_session_hours: f64,

    /// UTC offset applied to emitted session times
    #[serde(rename = "utc-offset-minutes")]
    pub utc_offset_minutes: i32,

    /// Hard limit on plan length; placement past this fails the plan
    #[serde(rename = "max-horizon-weeks")]
    pub max_horizon_weeks: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            min_session_hours: 0.5,
            max_session_hours: 3.0,
            daily_cap_weekly: 4.0,
            daily_cap_monthly: 2.0,
            default_session_hours: 2.0,
            utc_offset_minutes: 0,
            max_horizon_weeks: 52,
        }
    }
}

impl SchedulerConfig {
    /// Validate constraint sanity
    pub fn validate(&self) -> Result<()> {
        if self.work_start >= self.work_end {
            return Err(eyre::eyre!("work-start must be before work-end"));
        }
        if self.min_session_hours <= 0.0 || self.min_session_hours > self.max_session_hours {
            return Err(eyre::eyre!("session length bounds are inconsistent"));
        }
        let window_hours = (self.work_end - self.work_start).num_minutes() as f64 / 60.0;
        if self.max_session_hours > window_hours {
            return Err(eyre::eyre!("max-session-hours does not fit the work window"));
        }
        if self.daily_cap_weekly <= 0.0 || self.daily_cap_monthly <= 0.0 {
            return Err(eyre::eyre!("daily caps must be positive"));
        }
        if self.max_horizon_weeks == 0 {
            return Err(eyre::eyre!("max-horizon-weeks must be positive"));
        }
        Ok(())
    }

    /// Daily hour cap for the given plan pacing
    pub fn daily_cap(&self, plan_type: PlanType) -> f64 {
        match plan_type {
            PlanType::Weekly => self.daily_cap_weekly,
            PlanType::Monthly => self.daily_cap_monthly,
        }
    }

    /// Timezone offset for emitted sessions
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = SchedulerConfig {
            work_start: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_daily_cap_by_plan_type() {
        let config = SchedulerConfig::default();
        assert_eq!(config.daily_cap(PlanType::Weekly), 4.0);
        assert_eq!(config.daily_cap(PlanType::Monthly), 2.0);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
work-start: "08:00:00"
max-session-hours: 2.0
"#;
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.work_start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.max_session_hours, 2.0);
        assert_eq!(config.daily_cap_weekly, 4.0);
    }
}
