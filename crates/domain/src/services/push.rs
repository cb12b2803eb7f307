//! Push delivery abstraction.
//!
//! Provides the multicast contract the dispatcher sends through, and a mock
//! gateway for development and testing.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use thiserror::Error;

/// Largest token list accepted by a single multicast.
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// One push message addressed to up to [`MAX_MULTICAST_TOKENS`] devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub link: Option<String>,
}

/// Per-token result of a multicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Sent,
    /// The provider no longer recognizes the token. The subscription should
    /// be deleted.
    Unregistered,
    /// Any other failure; the token is kept.
    Failed(String),
}

/// Result set of one multicast, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastResponse {
    pub results: Vec<(String, TokenOutcome)>,
}

impl MulticastResponse {
    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, o)| *o == TokenOutcome::Sent)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn unregistered_tokens(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, o)| *o == TokenOutcome::Unregistered)
            .map(|(t, _)| t.as_str())
    }
}

/// Errors that fail a whole multicast.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("Too many tokens for one multicast: {0}")]
    TooManyTokens(usize),

    #[error("Push service unavailable: {0}")]
    Unavailable(String),

    #[error("Push service authentication failed: {0}")]
    Auth(String),
}

/// Push service trait for sending multicast notifications.
#[async_trait::async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastResponse, PushError>;
}

/// Mock push gateway for development and testing.
///
/// Logs messages instead of sending them and records every call.
#[derive(Debug, Default)]
pub struct MockPushGateway {
    /// Whether every multicast fails.
    pub simulate_failure: bool,
    unregistered: HashSet<String>,
    failing_calls: HashSet<usize>,
    sent: Mutex<Vec<MulticastMessage>>,
}

impl MockPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every multicast fails.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Reports the given tokens as unregistered.
    pub fn with_unregistered<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unregistered.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Fails the n-th multicast (zero based) as a whole.
    pub fn failing_call(mut self, index: usize) -> Self {
        self.failing_calls.insert(index);
        self
    }

    /// Every multicast received, including failed ones.
    pub fn sent(&self) -> Vec<MulticastMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl PushGateway for MockPushGateway {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastResponse, PushError> {
        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(PushError::TooManyTokens(message.tokens.len()));
        }

        let call = {
            let mut sent = self
                .sent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            sent.push(message.clone());
            sent.len() - 1
        };

        if self.simulate_failure || self.failing_calls.contains(&call) {
            tracing::warn!(
                call = call,
                tokens = message.tokens.len(),
                "Mock push gateway simulating failure"
            );
            return Err(PushError::Unavailable("Simulated failure".to_string()));
        }

        tracing::info!(
            tokens = message.tokens.len(),
            title = %message.title,
            "Mock: Would send push multicast"
        );

        let results = message
            .tokens
            .iter()
            .map(|t| {
                let outcome = if self.unregistered.contains(t) {
                    TokenOutcome::Unregistered
                } else {
                    TokenOutcome::Sent
                };
                (t.clone(), outcome)
            })
            .collect();

        Ok(MulticastResponse { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(tokens: &[&str]) -> MulticastMessage {
        MulticastMessage {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            title: "Event updated: Spring Concert".to_string(),
            body: "New location: Green Center.".to_string(),
            data: BTreeMap::new(),
            link: None,
        }
    }

    #[tokio::test]
    async fn test_mock_gateway_send() {
        let gateway = MockPushGateway::new();
        let response = gateway.send_multicast(&message(&["a", "b"])).await.unwrap();
        assert_eq!(response.success_count(), 2);
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_gateway_unregistered() {
        let gateway = MockPushGateway::new().with_unregistered(["b"]);
        let response = gateway.send_multicast(&message(&["a", "b"])).await.unwrap();
        assert_eq!(response.success_count(), 1);
        assert_eq!(response.failure_count(), 1);
        assert_eq!(response.unregistered_tokens().collect::<Vec<_>>(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_mock_gateway_failure() {
        let gateway = MockPushGateway::failing();
        let result = gateway.send_multicast(&message(&["a"])).await;
        assert!(matches!(result, Err(PushError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_mock_gateway_rejects_oversized_multicast() {
        let gateway = MockPushGateway::new();
        let tokens: Vec<String> = (0..=MAX_MULTICAST_TOKENS).map(|i| i.to_string()).collect();
        let msg = MulticastMessage {
            tokens,
            ..message(&[])
        };
        let result = gateway.send_multicast(&msg).await;
        assert_eq!(result, Err(PushError::TooManyTokens(MAX_MULTICAST_TOKENS + 1)));
        assert!(gateway.sent().is_empty());
    }
}
