//! Booking confirmation codes of the form `AE-` followed by 8 uppercase hex digits.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const PREFIX: &str = "AE-";
const HEX_DIGITS: usize = 8;

/// Public identifier of a booking, used as the key of the confirmation page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfirmationCode(String);

/// Error returned for strings that are not confirmation codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed confirmation code: {0:?}")]
pub struct InvalidCode(pub String);

impl ConfirmationCode {
    /// Derives a code from the first 8 hex digits of a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        let simple = uuid.simple().to_string();
        let digits: String = simple.chars().take(HEX_DIGITS).collect();
        Self(format!("{PREFIX}{}", digits.to_ascii_uppercase()))
    }

    /// A fresh code from a random v4 UUID.
    #[must_use]
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Validates and wraps an existing code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCode`] unless the input is exactly `AE-` plus 8 uppercase hex digits.
    pub fn parse(value: &str) -> Result<Self, InvalidCode> {
        let digits = value
            .strip_prefix(PREFIX)
            .ok_or_else(|| InvalidCode(value.to_string()))?;
        let well_formed = digits.len() == HEX_DIGITS
            && digits
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidCode(value.to_string()))
        }
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConfirmationCode {
    type Error = InvalidCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConfirmationCode> for String {
    fn from(code: ConfirmationCode) -> Self {
        code.0
    }
}
