//! Calendar export
//!
//! Authorization state, a thin events API client, and the idempotent
//! plan exporter built on top of them.

mod api;
mod auth;
mod export;

pub use api::{CalendarApi, CalendarError, CalendarEvent, EventTime, GoogleCalendarApi, mock};
pub use auth::CalendarAuth;
pub use export::{CalendarExporter, ExportOutcome, ExportReport, SessionExport, event_id};
