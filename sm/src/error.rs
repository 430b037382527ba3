//! Public error taxonomy for planning operations
//!
//! Every public operation either returns a populated, invariant-satisfying
//! result or one of these typed failures. Oracle and calendar errors are
//! never swallowed into empty results, and local validation errors are
//! raised before any network call.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the decomposition/scheduling/export pipeline
#[derive(Debug, Error)]
pub enum PlanError {
    /// Missing or invalid credentials, or provider unreachable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Oracle response not decodable into the expected shape
    #[error("failed to parse oracle response: {0}")]
    Parse(String),

    /// Oracle or provider rate/billing limit
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Input rejected before any network call
    #[error("invalid input: {0}")]
    Validation(String),

    /// The plan cannot fit inside the scheduling horizon
    #[error("cannot fit plan: {overflow_hours:.1}h exceed the scheduling horizon")]
    ConstraintViolation { overflow_hours: f64 },

    /// Plan proposal generation failed (caller may retry or fall back)
    #[error("plan generation failed: {0}")]
    Generation(String),
}

impl PlanError {
    /// Map an oracle failure during goal decomposition
    ///
    /// Unreachable/unauthorized oracles are configuration problems from the
    /// caller's point of view; malformed payloads are recoverable parse
    /// failures; rate/billing limits get their own bucket so the caller can
    /// present a specific message.
    pub(crate) fn decompose_failure(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } | LlmError::PaymentRequired(_) => Self::QuotaExceeded(err.to_string()),
            LlmError::MissingApiKey(_) => Self::Configuration(err.to_string()),
            LlmError::ApiError { status: 401 | 403, .. } => Self::Configuration(err.to_string()),
            LlmError::InvalidResponse(_) | LlmError::Json(_) => Self::Parse(err.to_string()),
            LlmError::Network(_) | LlmError::Timeout(_) | LlmError::ApiError { .. } => {
                Self::Configuration(err.to_string())
            }
        }
    }

    /// Map an oracle failure during plan proposal
    pub(crate) fn schedule_failure(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } | LlmError::PaymentRequired(_) => Self::QuotaExceeded(err.to_string()),
            LlmError::MissingApiKey(_) => Self::Configuration(err.to_string()),
            LlmError::ApiError { status: 401 | 403, .. } => Self::Configuration(err.to_string()),
            _ => Self::Generation(err.to_string()),
        }
    }
}
