//! Calendar authorization state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A granted calendar authorization
///
/// Token acquisition is out of scope; the caller brings a token obtained
/// through whatever OAuth flow its platform provides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarAuth {
    /// Bearer token for calendar API calls
    pub access_token: String,

    /// Target calendar identifier ("primary" for the default calendar)
    pub calendar_id: String,

    /// Token expiry, when known
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl CalendarAuth {
    pub fn new(access_token: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            calendar_id: calendar_id.into(),
            expiry: None,
        }
    }

    /// Whether the token is known to have expired
    pub fn expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= Utc::now(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let mut auth = CalendarAuth::new("token", "primary");
        assert!(!auth.expired());

        auth.expiry = Some(Utc::now() + Duration::hours(1));
        assert!(!auth.expired());

        auth.expiry = Some(Utc::now() - Duration::seconds(1));
        assert!(auth.expired());
    }
}
