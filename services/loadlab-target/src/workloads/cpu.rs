//! PBKDF2-HMAC-SHA256 key derivation as a CPU burner.

use rand::RngCore;
use ring::pbkdf2;
use std::num::NonZeroU32;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;

const PASSWORD: [u8; 64] = [b'p'; 64];

fn iterations(iters: usize) -> NonZeroU32 {
    NonZeroU32::new(u32::try_from(iters).unwrap_or(u32::MAX)).unwrap_or(NonZeroU32::MIN)
}

/// Derive one 32-byte key from the fixed password.
pub fn derive_key(iters: usize, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations(iters),
        salt,
        &PASSWORD,
        &mut key,
    );
    key
}

/// Run `rounds` derivations, each with a fresh random salt, and return the
/// hex of the last key.
pub fn derive_rounds(iters: usize, rounds: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    let mut key = [0u8; KEY_LEN];

    for _ in 0..rounds.max(1) {
        rng.fill_bytes(&mut salt);
        key = derive_key(iters, &salt);
    }

    hex::encode(key)
}
