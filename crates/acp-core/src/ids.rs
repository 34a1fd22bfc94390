//! Opaque identifier newtypes.
//!
//! Unlike `ag-ui-core`'s id types, ACP ids never need to round-trip a
//! foreign provider's string format, so there is no UUID-coercion dance:
//! each id is a plain string, randomly generated from a UUID v4 when the
//! caller doesn't supply one of its own.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype id wrapping a `String`.
macro_rules! define_id_type {
    ($name:ident) => {
        #[doc = concat!(stringify!($name), ": an opaque, server-scoped identifier.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new random id.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wraps an existing string as an id.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

define_id_type!(RunId);
define_id_type!(SessionId);
define_id_type!(MessageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(RunId::random(), RunId::random());
    }

    #[test]
    fn new_preserves_the_given_string() {
        let id = SessionId::new("conversation-42");
        assert_eq!(id.as_str(), "conversation-42");
        assert_eq!(id, *"conversation-42");
    }

    #[test]
    fn display_matches_as_str() {
        let id = MessageId::new("m-1");
        assert_eq!(id.to_string(), "m-1");
    }
}
