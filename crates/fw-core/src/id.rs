//! Identifier newtypes for authored content.
//!
//! Authored content (stories, nodes, choices, achievements) uses
//! human-readable slug identifiers chosen by content authors, so these wrap
//! `String` rather than a generated UUID.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! slug_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from a slug string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The slug as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

slug_id! {
    /// Identifies one authored story.
    StoryId
}

slug_id! {
    /// Identifies a node within a story graph.
    NodeId
}

slug_id! {
    /// Identifies a choice within a story node.
    ChoiceId
}

slug_id! {
    /// Identifies an achievement in the static catalog.
    AchievementId
}
