//! Oracle client module for studymap
//!
//! Provides oracle completion requests and utilities.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gateway;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gateway::GatewayClient;
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, TokenUsage};

use crate::config::OracleConfig;

/// Create an oracle client based on the provider specified in config
///
/// The gateway speaks the OpenAI Chat Completions wire format, so "openai"
/// is served by the same client pointed at a different base URL.
pub fn create_client(config: &OracleConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gateway" | "openai" => Ok(Arc::new(GatewayClient::from_config(config)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown oracle provider: '{}'. Supported: gateway, openai",
            other
        ))),
    }
}
