//! Sidebar grouping of conversations by last activity.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::chat::core::conversation::Conversation;
use crate::chat::view::ConversationSummary;

/// Recency bucket, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyGroup {
    /// Same UTC calendar day as now.
    Today,
    /// The UTC calendar day before today.
    Yesterday,
    /// Within the last seven days.
    ThisWeek,
    /// Anything earlier.
    Older,
}

impl RecencyGroup {
    /// All groups in display order.
    pub const ALL: [Self; 4] = [Self::Today, Self::Yesterday, Self::ThisWeek, Self::Older];

    /// Heading shown above the group.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::ThisWeek => "This Week",
            Self::Older => "Older",
        }
    }

    /// Bucket for an activity time relative to `now`.
    #[must_use]
    pub fn classify(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let day = updated_at.date_naive();
        let today = now.date_naive();
        if day == today {
            Self::Today
        } else if today.pred_opt() == Some(day) {
            Self::Yesterday
        } else if updated_at > now - Duration::days(7) {
            Self::ThisWeek
        } else {
            Self::Older
        }
    }
}

impl fmt::Display for RecencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Group conversations into recency buckets.
///
/// Buckets come in [`RecencyGroup::ALL`] order, empty ones are omitted, and
/// list order is preserved inside each bucket.
#[must_use]
pub fn group_by_recency(
    conversations: &[Conversation],
    now: DateTime<Utc>,
) -> Vec<(RecencyGroup, Vec<ConversationSummary>)> {
    let mut buckets: [Vec<ConversationSummary>; 4] = Default::default();
    for conversation in conversations {
        let group = RecencyGroup::classify(conversation.updated_at, now);
        buckets[group as usize].push(ConversationSummary::from(conversation));
    }

    RecencyGroup::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, rows)| !rows.is_empty())
        .collect()
}
