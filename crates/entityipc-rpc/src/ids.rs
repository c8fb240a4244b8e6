use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of correlation ids for one connection.
///
/// Each connection owns its own source; ids only need to be unique among the
/// calls pending on that connection, which the pending table enforces.
pub trait IdSource: Send {
    fn next_id(&mut self) -> u32;
}

/// Uniformly random ids from a connection-local RNG seeded from OS entropy.
#[derive(Debug)]
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for reproducible tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> u32 {
        self.rng.gen()
    }
}

/// Replays a fixed list of ids, then falls back to a random source.
///
/// Lets tests force a collision with a pending id.
#[derive(Debug)]
pub struct ScriptedIds {
    script: VecDeque<u32>,
    fallback: RandomIds,
}

impl ScriptedIds {
    pub fn new(script: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: RandomIds::seeded(0),
        }
    }
}

impl IdSource for ScriptedIds {
    fn next_id(&mut self) -> u32 {
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_id())
    }
}
