//! Randomized delay before a simulated reply lands.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::chat::core::config::ReplyConfig;
use crate::chat::core::errors::{ChatError, ChatResult};

/// Samples delays uniformly from `[min_ms, max_ms)`.
pub struct ReplyDelay {
    min_ms: u64,
    max_ms: u64,
    rng: Mutex<StdRng>,
}

impl ReplyDelay {
    /// Build a sampler from config with an entropy-seeded RNG.
    ///
    /// # Errors
    /// Returns an error if the range is empty.
    pub fn from_config(config: &ReplyConfig) -> ChatResult<Self> {
        Self::build(config, StdRng::from_entropy())
    }

    /// Build a sampler from config with a fixed seed.
    ///
    /// # Errors
    /// Returns an error if the range is empty.
    pub fn with_seed(config: &ReplyConfig, seed: u64) -> ChatResult<Self> {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: &ReplyConfig, rng: StdRng) -> ChatResult<Self> {
        if config.min_delay_ms >= config.max_delay_ms {
            return Err(ChatError::InvalidConfig(format!(
                "reply delay range [{}, {}) is empty",
                config.min_delay_ms, config.max_delay_ms
            )));
        }
        Ok(Self {
            min_ms: config.min_delay_ms,
            max_ms: config.max_delay_ms,
            rng: Mutex::new(rng),
        })
    }

    /// Draw the next delay.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.gen_range(self.min_ms..self.max_ms))
    }

    /// Upper bound (exclusive) of any sampled delay.
    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}
