//! HTTP client for the target and response classification.

use crate::error::DriverResult;
use crate::tasks::PlannedRequest;
use loadlab_core::{KindProbe, WorkloadKind};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Why a request counts as failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestFailure {
    #[error("HTTP {0}")]
    Http(u16),

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("kind mismatch: expected \"{expected}\", got \"{actual}\"")]
    KindMismatch {
        expected: WorkloadKind,
        actual: String,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result of one request as seen by the driver.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub name: &'static str,
    pub latency: Duration,
    pub result: Result<(), RequestFailure>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Decide whether a completed response is a success.
///
/// Anything other than 200 fails. Endpoints that self-report a kind must
/// return a JSON object whose `kind` equals `expected`.
pub fn classify(
    status: u16,
    body: &[u8],
    expected: Option<WorkloadKind>,
) -> Result<(), RequestFailure> {
    if status != 200 {
        return Err(RequestFailure::Http(status));
    }

    let Some(expected) = expected else {
        return Ok(());
    };

    let document: Value =
        serde_json::from_slice(body).map_err(|e| RequestFailure::Parse(e.to_string()))?;
    let object = document
        .as_object()
        .ok_or_else(|| RequestFailure::Parse("response body is not a JSON object".to_string()))?;

    // A non-string `kind` is reported verbatim.
    let actual = match serde_json::from_value::<KindProbe>(Value::Object(object.clone())) {
        Ok(KindProbe { kind: Some(kind) }) => kind,
        Ok(KindProbe { kind: None }) => "null".to_string(),
        Err(_) => object.get("kind").map(Value::to_string).unwrap_or_default(),
    };

    if actual == expected.as_str() {
        Ok(())
    } else {
        Err(RequestFailure::KindMismatch { expected, actual })
    }
}

/// Shared reqwest client bound to one target base URL.
#[derive(Debug, Clone)]
pub struct TargetClient {
    http: reqwest::Client,
    base_url: String,
}

impl TargetClient {
    /// Connect and read timeouts are applied separately; a read that stalls
    /// longer than `read_timeout` between bytes fails the request.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> DriverResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Send `request` and classify the response. Never returns an error;
    /// transport problems become [`RequestFailure::Transport`].
    pub async fn execute(&self, request: &PlannedRequest) -> RequestOutcome {
        let url = format!("{}{}", self.base_url, request.path);
        let start = Instant::now();

        let result = match self.http.get(&url).query(&request.query).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(body) => classify(status, &body, request.expected_kind),
                    Err(e) => Err(RequestFailure::Transport(e.to_string())),
                }
            }
            Err(e) => Err(RequestFailure::Transport(e.to_string())),
        };

        RequestOutcome {
            name: request.name,
            latency: start.elapsed(),
            result,
        }
    }
}
