//! OpenPGP key fingerprint
//!
//! A validated, normalised fingerprint used wherever gpg must be pointed at
//! exactly one key (deletion in particular).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Full key fingerprint: 20 bytes for v4 keys, 32 bytes for v5/v6 keys.
///
/// Stored as upper-case hex without separators.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub const V4_LENGTH: usize = 20;

    pub const V5_LENGTH: usize = 32;

    /// Long key id length in hex digits.
    pub const LONG_ID_DIGITS: usize = 16;

    /// Parse a fingerprint, tolerating the space-grouped form gpg prints.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not hex or has the wrong length.
    pub fn parse(input: &str) -> Result<Self, FingerprintError> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(FingerprintError::Empty);
        }

        let bytes = hex::decode(&compact).map_err(|e| FingerprintError::InvalidHex {
            reason: e.to_string(),
        })?;

        if bytes.len() != Self::V4_LENGTH && bytes.len() != Self::V5_LENGTH {
            return Err(FingerprintError::InvalidLength {
                actual: bytes.len(),
            });
        }

        Ok(Self(hex::encode_upper(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 16-digit long key id: the trailing digits of a v4 fingerprint,
    /// the leading digits of a v5 one.
    pub fn long_key_id(&self) -> &str {
        if self.0.len() == Self::V4_LENGTH * 2 {
            &self.0[self.0.len() - Self::LONG_ID_DIGITS..]
        } else {
            &self.0[..Self::LONG_ID_DIGITS]
        }
    }

    /// True when `id` names this key: the full fingerprint or its long id,
    /// compared without regard to case or spacing.
    pub fn matches(&self, id: &str) -> bool {
        let compact: String = id
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        !compact.is_empty() && (compact == self.0 || compact == self.long_key_id())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint is empty")]
    Empty,

    #[error("fingerprint is not hex: {reason}")]
    InvalidHex { reason: String },

    #[error("fingerprint must be 20 or 32 bytes, got {actual}")]
    InvalidLength { actual: usize },
}
