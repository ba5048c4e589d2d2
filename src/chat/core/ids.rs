// File: src/chat/core/ids.rs

//! Identifier types for conversations and messages.
//!
//! Strongly-typed UUID newtypes so a message id can never be passed where a
//! conversation id is expected. Both serialize as the canonical hyphenated
//! string, which is also the form written to the persisted blob.
//!
//! ## Cargo features used by this module
//! - `uuid_v7`: enables `UUIDv7` generation via `uuid/v7`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an ID that sorts roughly by creation time.
///
/// With feature `uuid_v7` enabled, this uses `Uuid::now_v7()`.
/// Otherwise it falls back to `Uuid::new_v4()`.
#[inline]
#[must_use]
fn uuid_time_ordered() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Declare a UUID newtype with a consistent API.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl Default for $name {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// Create a new identifier.
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(uuid_time_ordered())
            }

            /// Wrap an existing UUID.
            #[inline]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

define_uuid_id!(
    /// Identifier of a conversation thread.
    ConversationId
);

define_uuid_id!(
    /// Identifier of a single message inside a conversation.
    MessageId
);
