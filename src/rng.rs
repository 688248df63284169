//! Process-wide seed source
//!
//! Islands and populations derive their random engines from explicit seeds.
//! When no seed is supplied, one is drawn from the process-wide generator
//! defined here. Drawing from this source depends on the order in which
//! threads reach it, so runs that rely on it are not reproducible; prefer
//! explicit seeds wherever determinism matters.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock};

use crate::utils::lock;

static GLOBAL: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn global() -> &'static Mutex<StdRng> {
    GLOBAL.get_or_init(|| Mutex::new(StdRng::from_entropy()))
}

/// Reseed the process-wide generator.
///
/// All subsequent [`next_seed`] draws follow deterministically from `seed`
/// (up to thread interleaving).
pub fn set_global_seed(seed: u64) {
    *lock(global()) = StdRng::seed_from_u64(seed);
}

/// Draw a fresh seed from the process-wide generator.
pub fn next_seed() -> u64 {
    lock(global()).gen()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reseeding_is_reproducible() {
        // Tests in other modules may draw from the global source
        // concurrently; retry until two windows stay undisturbed.
        for _ in 0..50 {
            set_global_seed(123);
            let a = (next_seed(), next_seed());
            set_global_seed(123);
            let b = (next_seed(), next_seed());
            if a == b {
                assert_ne!(a.0, a.1);
                return;
            }
        }
        panic!("global reseeding did not reproduce the seed stream");
    }
}
