//! Serialization cost of a large string field.

use super::WorkloadResult;
use loadlab_core::JsonPayload;
use std::time::{Duration, Instant};

pub fn filler(kb: usize, ch: char) -> String {
    std::iter::repeat(ch).take(kb.saturating_mul(1024)).collect()
}

/// Serialize `{"size_kb": kb, "data": "x" * kb KiB}`.
///
/// Only the encoding step is timed; building the filler is not.
pub fn serialize_filler(kb: usize) -> WorkloadResult<(String, Duration)> {
    let payload = JsonPayload {
        size_kb: kb as i64,
        data: filler(kb, 'x'),
    };

    let start = Instant::now();
    let body = serde_json::to_string(&payload)?;
    Ok((body, start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_body_carries_filler() {
        let (body, _) = serialize_filler(2).unwrap();
        let payload: JsonPayload = serde_json::from_str(&body).unwrap();
        assert_eq!(payload.size_kb, 2);
        assert_eq!(payload.data.len(), 2048);
        assert!(payload.data.chars().all(|c| c == 'x'));
    }
}
