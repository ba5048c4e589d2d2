//! Simulated assistant replies.

pub mod delay;
pub mod generator;

pub use delay::ReplyDelay;
pub use generator::{CANNED_REPLIES, CannedReplies, ReplyFuture, ReplyGenerator};
