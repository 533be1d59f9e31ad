//! Deterministic pseudo-random source for reproducible optimization runs.
//! A Lehmer/Park-Miller linear congruential generator: given the same seed,
//! the output sequence is bit-for-bit identical across platforms and runs,
//! which is the entire reason to prefer it over system entropy here.

use crate::error::WaybillError;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

/// Park-Miller minimal standard constants, kept verbatim;
/// changing them changes every derived sequence
const MULTIPLIER: u64 = 16_807;
const MODULUS: u64 = 2_147_483_647; // 2^31 - 1

/// Seeded Lehmer generator producing floats in [0, 1)
#[derive(Clone, Debug)]
pub struct Lehmer {
    state: u64,
}

impl Lehmer {
    /// Creates a generator, folding any seed into the valid state
    /// range [1, modulus - 1]; state 0 would be a fixed point
    pub fn new(seed: u64) -> Lehmer {
        Lehmer {
            state: seed % (MODULUS - 1) + 1,
        }
    }

    /// Returns the next pseudo-random float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state * MULTIPLIER % MODULUS;
        self.state as f64 / MODULUS as f64
    }
}

/// Derives a stable seed from any serializable configuration.
///
/// The value is serialized through `serde_json::Value`, whose object maps
/// order keys (at every nesting level) rather than preserving insertion
/// order, so logically identical configurations always hash the same. The
/// first eight bytes of the SHA-256 digest form the seed.
pub fn seed_from<T: Serialize>(value: &T) -> Result<u64, WaybillError> {
    let canonical = serde_json::to_string(&serde_json::to_value(value)?)?;
    let digest = Sha256::digest(canonical.as_bytes());
    let bytes: [u8; 8] = digest[..8].try_into().expect("Hardcode digest length");
    Ok(u64::from_be_bytes(bytes))
}
