//! Validated string identifiers shared across the domain

use thiserror::Error;

use super::DomainError;

/// Errors that can occur while validating an identifier
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IdentifierValidationError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} exceeds maximum length of {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} contains invalid character: {ch:?}")]
    InvalidCharacter { kind: &'static str, ch: char },

    #[error("{kind} must start with a letter or number")]
    InvalidStart { kind: &'static str },
}

impl From<IdentifierValidationError> for DomainError {
    fn from(error: IdentifierValidationError) -> Self {
        DomainError::validation(error.to_string())
    }
}

/// Validate a free-form identifier (tenant, permission, principal, role)
///
/// Rules:
/// - Cannot be empty
/// - At most `max` characters
/// - No whitespace or control characters
pub fn validate_identifier(
    kind: &'static str,
    value: &str,
    max: usize,
) -> Result<(), IdentifierValidationError> {
    if value.is_empty() {
        return Err(IdentifierValidationError::Empty { kind });
    }

    if value.chars().count() > max {
        return Err(IdentifierValidationError::TooLong { kind, max });
    }

    if let Some(ch) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdentifierValidationError::InvalidCharacter { kind, ch });
    }

    Ok(())
}

/// Validate an API key public id: ASCII alphanumerics and underscores, starting alphanumeric
pub fn validate_key_id(value: &str, max: usize) -> Result<(), IdentifierValidationError> {
    const KIND: &str = "API key ID";

    if value.is_empty() {
        return Err(IdentifierValidationError::Empty { kind: KIND });
    }

    if value.len() > max {
        return Err(IdentifierValidationError::TooLong { kind: KIND, max });
    }

    if !value.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(IdentifierValidationError::InvalidStart { kind: KIND });
    }

    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(IdentifierValidationError::InvalidCharacter { kind: KIND, ch });
    }

    Ok(())
}

/// Defines a validated, serde-transparent string newtype
macro_rules! define_identifier {
    ($(#[$meta:meta])* $name:ident, $validate:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier after validation
            pub fn new(
                value: impl Into<String>,
            ) -> Result<Self, $crate::domain::identifier::IdentifierValidationError> {
                let value = value.into();
                let validate: fn(
                    &str,
                ) -> Result<(), $crate::domain::identifier::IdentifierValidationError> =
                    $validate;
                validate(&value)?;
                Ok(Self(value))
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::domain::identifier::IdentifierValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::domain::identifier::IdentifierValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

pub(crate) use define_identifier;
