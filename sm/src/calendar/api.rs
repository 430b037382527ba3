//! Calendar API client
//!
//! Thin client over the Google Calendar v3 events surface: insert with a
//! caller-chosen event id, update by id, and a bounded ascending listing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::auth::CalendarAuth;
use crate::config::CalendarConfig;

/// Errors from calendar operations
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar authorization rejected")]
    Unauthorized,

    #[error("Event id already exists")]
    Conflict,

    #[error("Calendar rate limited")]
    RateLimited,

    #[error("Calendar API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire representation of an event timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// Wire representation of a calendar event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Caller-chosen stable id; keys idempotent re-export
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

/// Calendar event operations
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Insert a new event; Conflict when the id already exists
    async fn insert_event(&self, auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError>;

    /// Replace an existing event by id
    async fn update_event(&self, auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError>;

    /// List events starting at or after `time_min`, ascending, bounded
    async fn list_events(
        &self,
        auth: &CalendarAuth,
        time_min: &str,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// Google Calendar v3 client
pub struct GoogleCalendarApi {
    base_url: String,
    http: Client,
}

impl GoogleCalendarApi {
    pub fn from_config(config: &CalendarConfig) -> Result<Self, CalendarError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(CalendarError::Network)?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, calendar_id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
        let status = response.status().as_u16();
        match status {
            401 | 403 => Err(CalendarError::Unauthorized),
            409 => Err(CalendarError::Conflict),
            429 => Err(CalendarError::RateLimited),
            _ if !response.status().is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(CalendarError::ApiError { status, message })
            }
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarApi {
    async fn insert_event(&self, auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError> {
        debug!(event_id = %event.id, "insert_event: called");
        let response = self
            .http
            .post(self.events_url(&auth.calendar_id))
            .bearer_auth(&auth.access_token)
            .json(event)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_event(&self, auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError> {
        debug!(event_id = %event.id, "update_event: called");
        let url = format!("{}/{}", self.events_url(&auth.calendar_id), event.id);
        let response = self.http.put(url).bearer_auth(&auth.access_token).json(event).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_events(
        &self,
        auth: &CalendarAuth,
        time_min: &str,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        debug!(%time_min, max_results, "list_events: called");
        let response = self
            .http
            .get(self.events_url(&auth.calendar_id))
            .bearer_auth(&auth.access_token)
            .query(&[
                ("timeMin", time_min),
                ("maxResults", &max_results.to_string()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;
        let response = Self::check(response).await?;

        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            items: Vec<CalendarEvent>,
        }
        let listing: Listing = response.json().await?;
        Ok(listing.items)
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory calendar for tests
    #[derive(Default)]
    pub struct MockCalendarApi {
        /// Stored events by id
        pub events: Mutex<HashMap<String, CalendarEvent>>,
        /// Event ids whose inserts and updates fail with a server error
        pub failing_ids: Vec<String>,
        /// Reject every call as unauthorized
        pub reject_auth: bool,
    }

    impl MockCalendarApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn event_count(&self) -> usize {
            self.events.lock().unwrap().len()
        }

        pub fn event(&self, id: &str) -> Option<CalendarEvent> {
            self.events.lock().unwrap().get(id).cloned()
        }

        fn gate(&self, event_id: &str) -> Result<(), CalendarError> {
            if self.reject_auth {
                return Err(CalendarError::Unauthorized);
            }
            if self.failing_ids.iter().any(|id| id == event_id) {
                return Err(CalendarError::ApiError {
                    status: 500,
                    message: "mock failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CalendarApi for MockCalendarApi {
        async fn insert_event(&self, _auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError> {
            self.gate(&event.id)?;
            let mut events = self.events.lock().unwrap();
            if events.contains_key(&event.id) {
                return Err(CalendarError::Conflict);
            }
            events.insert(event.id.clone(), event.clone());
            Ok(())
        }

        async fn update_event(&self, _auth: &CalendarAuth, event: &CalendarEvent) -> Result<(), CalendarError> {
            self.gate(&event.id)?;
            let mut events = self.events.lock().unwrap();
            if !events.contains_key(&event.id) {
                return Err(CalendarError::ApiError {
                    status: 404,
                    message: "not found".to_string(),
                });
            }
            events.insert(event.id.clone(), event.clone());
            Ok(())
        }

        async fn list_events(
            &self,
            _auth: &CalendarAuth,
            time_min: &str,
            max_results: u32,
        ) -> Result<Vec<CalendarEvent>, CalendarError> {
            if self.reject_auth {
                return Err(CalendarError::Unauthorized);
            }
            let events = self.events.lock().unwrap();
            let mut items: Vec<CalendarEvent> = events
                .values()
                .filter(|e| e.start.date_time.as_str() >= time_min)
                .cloned()
                .collect();
            items.sort_by(|a, b| a.start.date_time.cmp(&b.start.date_time));
            items.truncate(max_results as usize);
            Ok(items)
        }
    }
}
