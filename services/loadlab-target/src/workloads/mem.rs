//! Resident-memory pressure.

pub const PAGE_SIZE: usize = 4096;
const MIB: usize = 1024 * 1024;

/// Allocate `mb` MiB and write one byte into every page so the allocation is
/// actually committed. Page `i` receives `i & 0xFF`.
pub fn allocate_touched(mb: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; mb.saturating_mul(MIB)];
    for (page, offset) in (0..buffer.len()).step_by(PAGE_SIZE).enumerate() {
        buffer[offset] = (page & 0xFF) as u8;
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_page_is_touched() {
        let buffer = allocate_touched(2);
        assert_eq!(buffer.len(), 2 * MIB);
        assert_eq!(buffer[0], 0);
        assert_eq!(buffer[PAGE_SIZE], 1);
        assert_eq!(buffer[255 * PAGE_SIZE], 255);
        assert_eq!(buffer[256 * PAGE_SIZE], 0);
        assert_eq!(buffer[PAGE_SIZE + 1], 0);
    }
}
