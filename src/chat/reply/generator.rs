//! Reply generation.
//!
//! `ReplyGenerator` is the seam where a real model call would plug in. The
//! shipped implementation picks a canned line at random.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::message::Message;

/// Boxed future type for reply generation.
pub type ReplyFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Canned replies used by the simulated assistant.
pub const CANNED_REPLIES: [&str; 8] = [
    "I understand your question. Let me help you with that.",
    "That's an interesting point. Here's what I think...",
    "Based on what you've shared, I'd suggest the following approach...",
    "Let me break this down for you step by step.",
    "I can definitely help you with that. Here are some options to consider...",
    "That's a great question! Let me provide you with a comprehensive answer.",
    "I see what you're looking for. Here's how you can approach this...",
    "Thank you for sharing that. Based on your input, here's my recommendation...",
];

/// Trait abstraction over assistant reply sources.
pub trait ReplyGenerator: Send + Sync {
    /// Produce the assistant reply for a conversation.
    ///
    /// `history` holds the conversation's messages up to and including the
    /// user message being answered.
    ///
    /// # Errors
    /// Returns an error if no reply can be produced.
    fn generate<'a>(&'a self, history: &'a [Message]) -> ReplyFuture<'a, ChatResult<String>>;
}

/// Generator answering with a uniformly chosen canned line.
pub struct CannedReplies {
    rng: Mutex<StdRng>,
}

impl CannedReplies {
    /// Use the built-in reply set with an entropy-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use the built-in reply set with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Pick one reply.
    #[must_use]
    pub fn pick(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        CANNED_REPLIES
            .choose(&mut *rng)
            .copied()
            .unwrap_or_default()
            .to_string()
    }
}

impl Default for CannedReplies {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyGenerator for CannedReplies {
    fn generate<'a>(&'a self, _history: &'a [Message]) -> ReplyFuture<'a, ChatResult<String>> {
        Box::pin(async move { Ok(self.pick()) })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_picks_only_known_replies() {
        let generator = CannedReplies::with_seed(7);
        for _ in 0..64 {
            assert!(CANNED_REPLIES.contains(&generator.pick().as_str()));
        }
    }

    #[test]
    fn test_eventually_covers_the_set() {
        let generator = CannedReplies::with_seed(42);
        let seen: HashSet<String> = (0..512).map(|_| generator.pick()).collect();
        assert_eq!(seen.len(), CANNED_REPLIES.len());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = CannedReplies::with_seed(3);
        let b = CannedReplies::with_seed(3);
        let left: Vec<String> = (0..16).map(|_| a.pick()).collect();
        let right: Vec<String> = (0..16).map(|_| b.pick()).collect();
        assert_eq!(left, right);
    }

    #[tokio::test]
    async fn test_generate_ignores_history() {
        let generator = CannedReplies::with_seed(1);
        let history = vec![Message::user("hello")];
        let reply = generator.generate(&history).await;
        assert!(reply.is_ok_and(|text| CANNED_REPLIES.contains(&text.as_str())));
    }
}
