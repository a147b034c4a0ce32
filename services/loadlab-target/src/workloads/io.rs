//! Memory-mapped read of the local blob file.

use super::{WorkloadError, WorkloadResult};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

pub const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 over exactly `kb` KiB streamed from `path` in 64 KiB chunks,
/// wrapping to the start of the file as often as needed.
///
/// The map is released when this function returns, on every path.
pub fn hash_blob(path: &Path, kb: usize) -> WorkloadResult<String> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(WorkloadError::EmptyBlob {
            path: path.to_path_buf(),
        });
    }

    // SAFETY: the map is read-only and dropped before returning. The blob is
    // a fixed fixture that nothing truncates while the target runs.
    let map = unsafe { Mmap::map(&file)? };

    let target = kb.saturating_mul(1024);
    let mut hasher = Sha256::new();
    let mut read = 0usize;
    let mut pos = 0usize;

    while read < target {
        if pos >= map.len() {
            pos = 0;
        }
        let end = (pos + CHUNK_SIZE).min(map.len()).min(pos + (target - read));
        hasher.update(&map[pos..end]);
        read += end - pos;
        pos = end;
    }

    Ok(hex::encode(hasher.finalize()))
}
