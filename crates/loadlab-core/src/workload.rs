//! Response payloads exchanged between the target and the driver.

use crate::params::WorkloadKind;
use serde::{Deserialize, Serialize};

/// Response header carrying the JSON serialization time of `/json`.
pub const SERIALIZE_SECONDS_HEADER: &str = "x-serialize-seconds";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuResult {
    pub kind: WorkloadKind,
    pub iters: i64,
    pub rounds: i64,
    pub elapsed_seconds: f64,
    /// Hex of the key derived in the final round.
    pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemResult {
    pub kind: WorkloadKind,
    pub mb: i64,
    pub ms: i64,
    pub elapsed_seconds: f64,
    pub sample: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoResult {
    pub kind: WorkloadKind,
    pub kb: i64,
    pub elapsed_seconds: f64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixResult {
    pub kind: WorkloadKind,
    pub iters: i64,
    pub kb: i64,
    pub sleep_ms: i64,
    pub elapsed_seconds: f64,
    pub hex: String,
    /// Byte length of the compact encoding `{"blob":"..."}`, so `kb * 1024 + 11`.
    /// Encoders that put a space after the colon report one byte more.
    pub json_len: usize,
}

/// Body of `/json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPayload {
    pub size_kb: i64,
    pub data: String,
}

/// Just the self-reported `kind` of any workload response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KindProbe {
    #[serde(default)]
    pub kind: Option<String>,
}
