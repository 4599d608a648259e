use crate::error::{Error, Result};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic source behind every sampling decision of a run.
///
/// Reproducibility depends on the seed *and* on the order in which
/// randomness is consumed: file draws, cut points, slot choices and the
/// sub-seed each random filler takes at construction all advance the same
/// stream.
#[derive(Clone, Debug)]
pub struct Randomness {
    seed: u64,
    rng: ChaCha8Rng,
}

impl Randomness {
    /// Seed from OS entropy, picking a seed in `[0, 2^32)`.
    pub fn from_entropy() -> Self {
        let seed = rand::thread_rng().gen_range(0..=u32::MAX as u64);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Reseed, restarting the stream from the beginning.
    pub fn seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw from `[low, high]`.
    pub fn range_inclusive(&mut self, low: usize, high: usize) -> Result<usize> {
        if low > high {
            return Err(Error::EmptyRange { low, high });
        }
        Ok(self.rng.gen_range(low..=high))
    }

    /// `k` distinct values from `[low, high)`, in draw order.
    pub fn sample_distinct(&mut self, low: usize, high: usize, k: usize) -> Result<Vec<usize>> {
        let len = high.saturating_sub(low);
        if k > len {
            return Err(Error::EmptyRange { low, high });
        }
        Ok(index::sample(&mut self.rng, len, k).into_iter().map(|i| low + i).collect())
    }

    /// `k` indices into `[0, len)`, with replacement.
    pub fn choices(&mut self, len: usize, k: usize) -> Result<Vec<usize>> {
        if len == 0 {
            return Err(Error::EmptyRange { low: 0, high: 0 });
        }
        Ok((0..k).map(|_| self.rng.gen_range(0..len)).collect())
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Seed for a child generator (random fillers).
    pub fn sub_seed(&mut self) -> u64 {
        self.rng.gen::<u32>() as u64
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Opaque source id. Drawn from OS entropy, never from a [`Randomness`],
/// so ids do not shift the seeded stream.
pub(crate) fn fresh_id() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}
