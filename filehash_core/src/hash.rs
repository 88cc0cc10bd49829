//! Fixed-size content digest stored in the cache

use crate::{Error, Result, error::ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a [`FileHash`] (SHA-1, 160 bits)
pub const HASH_LEN: usize = 20;

/// Content hash of a file
///
/// Displayed and serialized as 40 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileHash([u8; HASH_LEN]);

impl FileHash {
    /// Wrap raw digest bytes
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHash({self})")
    }
}

impl FromStr for FileHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != HASH_LEN * 2 || !s.is_ascii() {
            return Err(ValidationError::invalid_parameter(
                "hash",
                &format!("expected {} hex characters, got '{s}'", HASH_LEN * 2),
            )
            .into());
        }

        let mut bytes = [0u8; HASH_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| {
                ValidationError::invalid_parameter("hash", &format!("invalid hex digit in '{s}'"))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for FileHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FileHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
