use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::{PrefixViolation, SpoofError};
use crate::result::Result;

/// Marker every prefix argument has to start with
pub const PREFIX_MARKER: &str = "0x";

/// Maximum count of hex digits accepted when nothing else is configured
pub const DEFAULT_MAX_PREFIX_LENGTH: usize = 16;

/// A validated target prefix, e.g. `0xCAFE` is stored as `cafe`.
///
/// ## Example of usage
/// ```rust
/// use hashspoof_core::PrefixSpec;
///
/// let prefix = PrefixSpec::parse("0xCAFE", 16).expect("valid prefix");
/// assert_eq!(prefix.required_length(), 4);
/// assert!(prefix.matches("cafebabe00"));
/// assert!(!prefix.matches("beefcafe00"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSpec {
    digits: String,
    max_length: usize,
}

impl PrefixSpec {
    /// validates `raw` against the `0x<hex digits>` form and normalizes the digits to lowercase
    pub fn parse(raw: &str, max_length: usize) -> Result<Self> {
        let Some(hex_part) = raw.strip_prefix(PREFIX_MARKER) else {
            return Err(PrefixViolation::MissingMarker.into());
        };
        if hex_part.is_empty() {
            return Err(PrefixViolation::Empty.into());
        }
        let length = hex_part.chars().count();
        if length > max_length {
            return Err(PrefixViolation::TooLong { length, max_length }.into());
        }
        if let Some((position, character)) = hex_part
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(PrefixViolation::NonHexCharacter {
                character,
                position,
            }
            .into());
        }

        Ok(Self {
            digits: hex_part.to_ascii_lowercase(),
            max_length,
        })
    }

    /// the normalized lowercase digits, without the `0x` marker
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn required_length(&self) -> usize {
        self.digits.len()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Case-insensitive check whether `digest` starts with this prefix.
    /// Surrounding whitespace of the digest is ignored.
    pub fn matches(&self, digest: &str) -> bool {
        let digest = digest.trim();
        match digest.get(..self.required_length()) {
            Some(head) => head.eq_ignore_ascii_case(&self.digits),
            None => false,
        }
    }
}

impl FromStr for PrefixSpec {
    type Err = SpoofError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_MAX_PREFIX_LENGTH)
    }
}

impl Display for PrefixSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX_MARKER}{}", self.digits)
    }
}
