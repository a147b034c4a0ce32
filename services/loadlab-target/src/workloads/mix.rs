//! Composite workload: one derivation plus one serialization.
//! The sleep part is done by the handler on the async side.

use super::json::filler;
use super::{cpu, WorkloadResult};
use serde::Serialize;

const MIX_SALT: &[u8] = b"salt";

#[derive(Serialize)]
struct BlobPayload<'a> {
    blob: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixOutcome {
    pub hex: String,
    /// Length of the compact JSON encoding, no whitespace after separators.
    pub json_len: usize,
}

pub fn run_mix(iters: usize, kb: usize) -> WorkloadResult<MixOutcome> {
    let key = cpu::derive_key(iters, MIX_SALT);
    let blob = filler(kb, 'y');
    let encoded = serde_json::to_string(&BlobPayload { blob: &blob })?;

    Ok(MixOutcome {
        hex: hex::encode(key),
        json_len: encoded.len(),
    })
}
