//! Client for a backend server, plus the wire types both sides share.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendStatus, Counts};
use crate::circuit::Circuit;
use crate::errors::BackendError;

/// Path circuits are submitted to.
pub const SUBMIT_PATH: &str = "/v1/submit";
/// Path answering health checks.
pub const HEALTH_PATH: &str = "/health";

/// Body of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Circuit to run. It must end in a measurement.
    pub circuit: Circuit,
    /// Number of samples to draw.
    pub shots: usize,
}

/// Body of a successful submission response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Outcome counts keyed by bitstring.
    pub counts: Counts,
}

/// Body of any error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable reason.
    pub error: String,
}

/// A backend running in another process, reached over HTTP.
///
/// Uses a blocking client: construct, use and drop it outside of any async runtime, or inside
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    endpoint: String,
    base_url: String,
    client: Client,
}

impl RemoteBackend {
    /// Client for the backend at `endpoint`, either `host:port` or a full `http(s)://` URL.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| unavailable(endpoint, &err))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            base_url: base_url(endpoint),
            client,
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the backend answers its health check.
    pub fn status(&self) -> BackendStatus {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        match self.client.get(url).send() {
            Ok(res) if res.status().is_success() => BackendStatus::Serving,
            _ => BackendStatus::Absent,
        }
    }
}

impl Backend for RemoteBackend {
    fn submit(&self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        let body = SubmitRequest {
            circuit: circuit.clone(),
            shots,
        };
        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(|err| unavailable(&self.endpoint, &err))?;
        let status = res.status();
        if status.is_success() {
            let parsed: SubmitResponse = res
                .json()
                .map_err(|err| BackendError::MalformedResponse(err.to_string()))?;
            tracing::debug!(endpoint = %self.endpoint, outcomes = parsed.counts.len(), "Remote submission finished.");
            return Ok(parsed.counts);
        }
        let text = res.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        if status == StatusCode::BAD_REQUEST {
            Err(BackendError::MalformedCircuit(message))
        } else {
            Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Check whether something answers health checks at `endpoint`.
pub fn probe(endpoint: &str, timeout: Duration) -> BackendStatus {
    match RemoteBackend::new(endpoint, timeout) {
        Ok(backend) => backend.status(),
        Err(err) => {
            tracing::warn!(endpoint, error = %err, "Could not build health check client.");
            BackendStatus::Absent
        }
    }
}

fn base_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn unavailable(endpoint: &str, err: &reqwest::Error) -> BackendError {
    BackendError::Unavailable {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod remote_tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("127.0.0.1:42069"), "http://127.0.0.1:42069");
        assert_eq!(base_url("https://qpu.local/"), "https://qpu.local");
    }

    #[test]
    fn test_error_body_shape() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"bad circuit"}"#).unwrap();
        assert_eq!(body.error, "bad circuit");
    }

    #[test]
    fn test_unreachable_backend_is_unavailable() {
        // Port 9 is the discard service, which is not expected to run an HTTP server.
        let backend = RemoteBackend::new("127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert_eq!(backend.status(), BackendStatus::Absent);
        let circuit = Circuit::from_parts(1, vec![], vec![]);
        assert!(matches!(
            backend.submit(&circuit, 1),
            Err(BackendError::Unavailable { .. })
        ));
    }
}
