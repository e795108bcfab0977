//! Display nickname type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Nickname`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NicknameError {
    /// Length outside the allowed range.
    #[error("nickname must be {min}-{max} characters")]
    Length {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains a character outside the allowed set.
    #[error("nickname may only contain Hangul, letters, digits, '_' and '-' (found {0:?})")]
    InvalidCharacter(char),
}

/// A public nickname chosen at registration.
///
/// 2-50 characters drawn from Hangul syllables, ASCII letters and digits,
/// `_` and `-`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Minimum nickname length in characters.
    pub const MIN_LENGTH: usize = 2;
    /// Maximum nickname length in characters.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a `Nickname`.
    ///
    /// # Errors
    ///
    /// Returns an error if the length or character set is invalid.
    pub fn parse(s: &str) -> Result<Self, NicknameError> {
        let len = s.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(NicknameError::Length {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = s.chars().find(|c| !is_nickname_char(*c)) {
            return Err(NicknameError::InvalidCharacter(bad));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the nickname as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_nickname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\u{AC00}'..='\u{D7A3}')
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
