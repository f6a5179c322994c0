//! Identifier generation for games, records, and ledger entries.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates opaque hex identifiers. Seedable so that tests and replays
/// produce stable ids.
#[derive(Debug, Clone)]
pub struct IdSource {
    rng: ChaCha8Rng,
}

impl IdSource {
    /// Deterministic source from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Entropy-seeded source for interactive sessions.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Next identifier: 32 lowercase hex characters.
    pub fn next_id(&mut self) -> String {
        let value: u128 = self.rng.r#gen();
        format!("{value:032x}")
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
