//! Delegates evaluation back over a channel to the transport connection
//! that originated the request, so a human operator attached to that
//! connection can supply the verdict.
//!
//! A `tokio::sync::mpsc` channel pair is the transport's way of pushing
//! work to, and receiving results from, a long-lived connection task.

use crate::provider::{Provider, ProviderInfo};
use async_trait::async_trait;
use superego_core::{Decision, DecisionAction, Error, ErrorKind, HealthState, HealthStatus, ToolRequest};
use tokio::sync::{mpsc, oneshot};

/// A single host-sampling request: the prompt to show, and where to send
/// the resulting decision.
pub struct HostSampleRequest {
    /// Rendered evaluation prompt.
    pub prompt: String,
    /// Where the host's verdict (or a timeout/disconnect) should be sent.
    pub respond_to: oneshot::Sender<Decision>,
}

/// Provider-side handle; `superego-transport` holds the matching
/// `mpsc::Receiver<HostSampleRequest>` for a given connection and forwards
/// requests to whatever UI the host exposes to its human operator.
#[derive(Clone)]
pub struct HostSamplingProvider {
    name: String,
    channel: mpsc::Sender<HostSampleRequest>,
    wait_timeout: std::time::Duration,
}

impl HostSamplingProvider {
    /// Build a provider bound to one connection's channel.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        channel: mpsc::Sender<HostSampleRequest>,
        wait_timeout: std::time::Duration,
    ) -> Self {
        Self { name: name.into(), channel, wait_timeout }
    }
}

#[async_trait]
impl Provider for HostSamplingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn evaluate(&self, _request: &ToolRequest, prompt: &str) -> Result<Decision, Error> {
        let (tx, rx) = oneshot::channel();
        self.channel
            .send(HostSampleRequest { prompt: prompt.to_string(), respond_to: tx })
            .await
            .map_err(|_| {
                Error::new(ErrorKind::InferenceUnavailable, "host connection channel closed")
            })?;

        match tokio::time::timeout(self.wait_timeout, rx).await {
            Ok(Ok(decision)) => Ok(decision),
            Ok(Err(_)) => {
                // The host disconnected without answering: surface `ask` so
                // the caller's own fail-closed handling decides what to do,
                // rather than silently defaulting to allow or deny here.
                Ok(Decision {
                    action: DecisionAction::Ask,
                    reason: "host disconnected before answering".to_string(),
                    rule_id: None,
                    confidence: 0.0,
                    processing_time_ms: 1,
                    provider: Some(self.name.clone()),
                    risk_factors: vec![],
                })
            }
            Err(_) => Err(Error::new(ErrorKind::InferenceTimeout, "host did not respond in time")),
        }
    }

    async fn health_check(&self) -> HealthStatus {
        if self.channel.is_closed() {
            return HealthStatus::new(
                format!("inference:{}", self.name),
                HealthState::Unhealthy,
                "host connection closed",
            );
        }
        HealthStatus::healthy(format!("inference:{}", self.name))
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.clone(),
            kind: "host-sampling".to_string(),
            models: Vec::new(),
            capabilities: vec!["human-in-the-loop".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn forwards_prompt_and_returns_host_answer() {
        let (tx, mut rx) = mpsc::channel(1);
        let provider =
            HostSamplingProvider::new("host", tx, std::time::Duration::from_secs(1));

        let responder = tokio::spawn(async move {
            let req = rx.recv().await.unwrap();
            assert_eq!(req.prompt, "hi");
            let _ = req.respond_to.send(Decision {
                action: DecisionAction::Deny,
                reason: "operator said no".to_string(),
                rule_id: None,
                confidence: 1.0,
                processing_time_ms: 1,
                provider: Some("host".to_string()),
                risk_factors: vec![],
            });
        });

        let req = ToolRequest::new("x", json!({}), "/tmp", "s", "a").unwrap();
        let decision = provider.evaluate(&req, "hi").await.unwrap();
        assert_eq!(decision.action, DecisionAction::Deny);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn closed_channel_before_send_errors() {
        let (tx, rx) = mpsc::channel(1);
        let provider =
            HostSamplingProvider::new("host", tx, std::time::Duration::from_secs(1));
        drop(rx); // dropped synchronously, so send() itself fails

        let req = ToolRequest::new("x", json!({}), "/tmp", "s", "a").unwrap();
        let result = provider.evaluate(&req, "hi").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn responder_dropped_after_receiving_yields_ask() {
        let (tx, mut rx) = mpsc::channel(1);
        let provider =
            HostSamplingProvider::new("host", tx, std::time::Duration::from_secs(1));

        let responder = tokio::spawn(async move {
            let req = rx.recv().await.unwrap();
            drop(req.respond_to); // host connection dropped without answering
        });

        let req = ToolRequest::new("x", json!({}), "/tmp", "s", "a").unwrap();
        let decision = provider.evaluate(&req, "hi").await.unwrap();
        assert_eq!(decision.action, DecisionAction::Ask);
        responder.await.unwrap();
    }
}
