//! Identifier types for nodes and templates.
//!
//! Identifiers are opaque 16-byte values rendered as lowercase hex. They
//! serialize as strings so they survive JSON round-trips with clients that
//! cannot represent raw byte arrays.

#[cfg(test)]
#[path = "tests/id.rs"]
mod tests;

use core::fmt::{self, Debug, Display, Formatter};
use core::str::FromStr;

use rand::RngCore;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error as ThisError;

/// Width of an identifier in bytes.
pub const ID_LEN: usize = 16;

/// Errors from parsing the textual form of an identifier.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum ParseIdError {
    /// The input was valid hex but not [`ID_LEN`] bytes long.
    #[error("expected {ID_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The input was not valid hex.
    #[error(transparent)]
    InvalidHex(#[from] hex::FromHexError),
}

/// Unique identifier of a node in the content tree.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId {
    bytes: [u8; ID_LEN],
}

impl NodeId {
    /// Wraps raw bytes as an identifier.
    #[must_use]
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self { bytes }
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0_u8; ID_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }

    /// Raw bytes of the identifier.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.bytes
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.bytes))
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

impl FromStr for NodeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; ID_LEN] = bytes
            .try_into()
            .map_err(|rest: Vec<u8>| ParseIdError::InvalidLength(rest.len()))?;
        Ok(Self::new(bytes))
    }
}

impl From<[u8; ID_LEN]> for NodeId {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self::new(bytes)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = NodeId;

            fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "a hex string encoding {ID_LEN} bytes")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}

/// Identifier of the template a node was created from.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TemplateId {
    bytes: [u8; ID_LEN],
}

impl TemplateId {
    /// Wraps raw bytes as a template identifier.
    #[must_use]
    pub const fn new(bytes: [u8; ID_LEN]) -> Self {
        Self { bytes }
    }
}

impl Display for TemplateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.bytes))
    }
}

impl Debug for TemplateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({self})")
    }
}

/// Well-known template identifiers with special pipeline behaviour.
pub mod templates {
    use super::TemplateId;

    /// Ordinary content item with no special handling.
    pub const STANDARD: TemplateId = TemplateId::new([0x01; super::ID_LEN]);

    /// Language definition item. Copies of these must be renamed to a
    /// valid ISO code, so the pipeline warns before copying one.
    pub const LANGUAGE: TemplateId = TemplateId::new([0x4c; super::ID_LEN]);
}
