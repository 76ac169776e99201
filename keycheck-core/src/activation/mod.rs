//! Remaining-activation lookup against the batch activation service.
//!
//! This lookup is best effort. [`ActivationClient::query_remaining`] never
//! fails: every error is rendered into the returned string so it can be
//! reported in place of the count.

mod request;
mod response;

pub use request::{ActivationRequest, REQUEST_NS, RequestShape, SERVICE_NS};
pub use response::{BLOCKED_ERROR_CODE, RemainingActivations, parse_response};

use crate::config::ActivationConfig;
use crate::error::{KeyCheckError, KeyCheckResult};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

const SOAP_ACTION: &str = "SOAPAction";

/// Client for the `BatchActivate` SOAP operation.
#[derive(Debug, Clone)]
pub struct ActivationClient {
    config: ActivationConfig,
    client: Client,
}

impl ActivationClient {
    /// Creates a client with the configured timeout.
    pub fn new(config: ActivationConfig) -> KeyCheckResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KeyCheckError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Queries the remaining activations for `pid`, rendering failures as text.
    ///
    /// - non-success status: `Error: <status>`
    /// - network failure or timeout: `WebException: <message>`
    /// - anything else: `Exception: <message>`
    pub async fn query_remaining(&self, pid: &str) -> String {
        match self.fetch_remaining(pid).await {
            Ok(remaining) => remaining.to_string(),
            Err(e) => {
                warn!("Remaining activations lookup failed: {e}");
                render_failure(&e)
            }
        }
    }

    /// Queries the remaining activations for `pid`.
    pub async fn fetch_remaining(&self, pid: &str) -> KeyCheckResult<RemainingActivations> {
        let envelope = ActivationRequest::new(pid).envelope(self.config.shape);
        debug!(
            "Posting {:?} BatchActivate request to {}",
            self.config.shape, self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header(SOAP_ACTION, &self.config.soap_action)
            .body(envelope)
            .send()
            .await
            .map_err(|e| KeyCheckError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyCheckError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| KeyCheckError::Transport(format!("failed to read response: {e}")))?;
        parse_response(&body)
    }
}

/// Renders a lookup failure the way it is reported in place of the count.
#[must_use]
pub fn render_failure(error: &KeyCheckError) -> String {
    match error {
        KeyCheckError::Status(status) => format!("Error: {status}"),
        KeyCheckError::Transport(message) => format!("WebException: {message}"),
        KeyCheckError::Protocol(message) => format!("Exception: {message}"),
        other => format!("Exception: {other}"),
    }
}
