//! Address, transaction hash, and native-value newtypes.
//!
//! Addresses and hashes are stored lowercase so that equality, hashing, and
//! journal round-trips are insensitive to the mixed-case forms tools emit.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// A 20-byte account or contract address, stored as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address. Accepts any hex casing, requires the
    /// `0x` prefix and exactly 20 bytes.
    pub fn new(raw: &str) -> Result<Self> {
        let digits = raw
            .strip_prefix("0x")
            .with_context(|| format!("address {raw:?} is missing the 0x prefix"))?;
        let bytes = hex::decode(digits.to_ascii_lowercase())
            .with_context(|| format!("address {raw:?} is not valid hex"))?;
        if bytes.len() != 20 {
            bail!("address {raw:?} must be 20 bytes, got {}", bytes.len());
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A transaction identifier as reported by the chain adapter.
///
/// Backends differ in hash width, so this only requires a non-empty
/// `0x`-prefixed hex string and normalizes the casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(raw: &str) -> Result<Self> {
        let digits = raw
            .strip_prefix("0x")
            .with_context(|| format!("transaction hash {raw:?} is missing the 0x prefix"))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("transaction hash {raw:?} is not valid hex");
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TxHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// An amount of native currency in its smallest denomination.
///
/// Serialized as a decimal string so journals stay exact regardless of the
/// reader's number precision; deserialization also accepts plain JSON numbers
/// for hand-written module files.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(pub u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Wei {
    fn from(value: u128) -> Self {
        Wei(value)
    }
}

impl FromStr for Wei {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .parse::<u128>()
            .with_context(|| format!("invalid wei amount {s:?}"))?;
        Ok(Wei(value))
    }
}

impl Serialize for Wei {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u128),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Wei(n)),
            Raw::Text(s) => s
                .parse::<u128>()
                .map(Wei)
                .map_err(|_| serde::de::Error::custom(format!("invalid wei amount {s:?}"))),
        }
    }
}
