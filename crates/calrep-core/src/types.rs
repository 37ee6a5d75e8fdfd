//! Core identifier types with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated provider event identifier.
    ///
    /// Unique within one provider calendar. Records arriving without an ID get a
    /// synthetic one during normalization.
    EventId, "event ID"
);

define_string_id!(
    /// A validated recurrence-series identifier.
    ///
    /// Shared by every expanded occurrence of a repeating event.
    SeriesId, "series ID"
);

define_string_id!(
    /// A validated calendar identifier (e.g., "primary" or a group calendar address).
    CalendarId, "calendar ID"
);

impl CalendarId {
    /// The provider's default calendar.
    pub fn primary() -> Self {
        Self("primary".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_blank_values() {
        assert_eq!(
            EventId::new("").unwrap_err(),
            ValidationError::Empty { field: "event ID" }
        );
        assert!(SeriesId::new("   ").is_err());
        assert!(CalendarId::new("team@example.com").is_ok());
    }

    #[test]
    fn ids_deserialize_through_validation() {
        let parsed: Result<SeriesId, _> = serde_json::from_str(r#""""#);
        assert!(parsed.is_err());

        let parsed: SeriesId = serde_json::from_str(r#""abc123""#).unwrap();
        assert_eq!(parsed.as_str(), "abc123");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#""abc123""#);
    }
}
