use std::hash::Hasher;

use rand::SeedableRng;
use rand::rngs::StdRng;
use siphasher::sip::SipHasher13;

const INITIAL_POSITIONS: u64 = u64::MAX;

/// Seed for substream `index` of a run seeded with `seed`.
///
/// SipHash-1-3 with zero keys over `(seed, index)`, stable across platforms.
pub fn derive_substream_seed(seed: u64, index: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(seed);
    hasher.write_u64(index);
    hasher.finish()
}

/// RNG driving sampler iteration `iteration`
pub fn iteration_rng(seed: u64, iteration: usize) -> StdRng {
    StdRng::seed_from_u64(derive_substream_seed(seed, iteration as u64))
}

/// RNG for drawing the initial walker positions
pub fn initial_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(derive_substream_seed(seed, INITIAL_POSITIONS))
}

/// RNG for synthetic noise in detector `index`
pub fn noise_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(derive_substream_seed(seed ^ 0xA5A5_A5A5_A5A5_A5A5, index as u64))
}
