// ABOUTME: Injectable random source for noise and flicker.
// ABOUTME: Any rand generator works; tests plug in fixed sequences.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform samples in [0, 1)
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;
}

impl<R: RngCore> RandomSource for R {
    #[inline]
    fn next_unit(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// Seeded generator when a seed is given, OS-seeded otherwise
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
