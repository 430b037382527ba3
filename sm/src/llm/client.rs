//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless oracle client - each call is independent (fresh context)
///
/// This is the core abstraction for interacting with the planning oracle.
/// Each completion request is independent - no conversation state is
/// maintained between calls, so decomposition and scheduling calls can
/// run in any order.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    use crate::llm::TokenUsage;

    /// Scripted oracle client for tests
    pub struct MockLlmClient {
        responses: Vec<Result<String, fn() -> LlmError>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        /// Client that returns the given texts in order
        pub fn new(texts: Vec<String>) -> Self {
            debug!(response_count = %texts.len(), "MockLlmClient::new: called");
            Self {
                responses: texts.into_iter().map(Ok).collect(),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Client whose nth call fails with the given error constructor
        pub fn failing(err: fn() -> LlmError) -> Self {
            Self {
                responses: vec![Err(err)],
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: called");
            match self.responses.get(idx) {
                Some(Ok(text)) => Ok(CompletionResponse {
                    content: text.clone(),
                    usage: TokenUsage::default(),
                }),
                Some(Err(err)) => Err(err()),
                None => Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec!["Response 1".to_string(), "Response 2".to_string()]);

            let req = CompletionRequest::new("Test", "hi", 1000);
            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.content, "Response 1");

            let resp2 = client.complete(req).await.unwrap();
            assert_eq!(resp2.content, "Response 2");
            assert_eq!(client.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.complete(CompletionRequest::new("Test", "hi", 1000)).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_scripted_failure() {
            let client = MockLlmClient::failing(|| LlmError::PaymentRequired("add credits".to_string()));
            let result = client.complete(CompletionRequest::new("Test", "hi", 1000)).await;
            assert!(matches!(result, Err(LlmError::PaymentRequired(_))));
        }
    }
}
