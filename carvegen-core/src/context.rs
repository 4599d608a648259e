use crate::error::{Error, Result};
use crate::random::Randomness;
use std::path::{Path, PathBuf};

/// Per-run state: the corpus root and the seeded random source.
///
/// Build one per independent run and hand it to everything that looks up
/// files or consumes randomness. Two contexts never share state.
#[derive(Debug, Default)]
pub struct Context {
    corpus: Option<PathBuf>,
    random: Randomness,
}

impl Context {
    pub fn new(corpus: impl Into<PathBuf>) -> Self {
        Self { corpus: Some(corpus.into()), random: Randomness::from_entropy() }
    }

    pub fn without_corpus() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random.seed(seed);
        self
    }

    pub fn set_corpus(&mut self, corpus: impl Into<PathBuf>) {
        self.corpus = Some(corpus.into());
    }

    pub fn clear_corpus(&mut self) {
        self.corpus = None;
    }

    pub fn corpus(&self) -> Result<&Path> {
        self.corpus.as_deref().ok_or(Error::NoCorpus)
    }

    pub fn seed(&mut self, seed: u64) {
        self.random.seed(seed);
    }

    pub fn get_seed(&self) -> u64 {
        self.random.get_seed()
    }

    pub fn random(&mut self) -> &mut Randomness {
        &mut self.random
    }

    /// Drop the corpus and reseed from entropy.
    pub fn reset(&mut self) {
        self.corpus = None;
        self.random = Randomness::from_entropy();
    }
}
