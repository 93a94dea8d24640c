//! Seedable uniform sampling, the only source of randomness in the crate.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// A closed-interval uniform sampler over a PCG stream.
///
/// Every placement pass draws from a single `Sampler` so that a fixed seed
/// reproduces the exact same sequence of patch positions.
pub struct Sampler {
    rng: Pcg32,
}

impl Sampler {
    /// Deterministic stream; tests and reproducible runs use this.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Nondeterministic stream seeded from the system entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg32::from_entropy(),
        }
    }

    /// Uniform draw from the closed interval `[min, max]`.
    pub fn int_in(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max);
        self.rng.gen_range(min, max + 1)
    }

    /// Uniform draw from `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0, 1.0)
    }
}
