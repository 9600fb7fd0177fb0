//! Encoded diagnostic packets and the interning table
//!
//! Requests and responses are stored as [`Packet`]s. A packet is a cheap,
//! reference-counted byte buffer; two packets compare equal when their bytes
//! are equal. The [`PacketInterner`] hands out a single canonical instance per
//! distinct byte content so results recorded for the same bytes share storage.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An encoded request or response
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Packet(Bytes);

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Raw bytes of the packet
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// First byte of the packet (the service identifier for UDS)
    pub fn service(&self) -> Option<u8> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex rendering, e.g. `"22f190"`
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a packet from a hex string; whitespace is ignored
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let cleaned = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
            .unwrap_or(cleaned.as_str());
        hex::decode(cleaned).map(Self::new)
    }

    /// True if both packets share the same underlying allocation
    pub fn ptr_eq(&self, other: &Packet) -> bool {
        self.0.len() == other.0.len() && self.0.as_ptr() == other.0.as_ptr()
    }
}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Borrow<[u8]> for Packet {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Vec<u8>> for Packet {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for Packet {
    fn from(value: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<[u8; N]> for Packet {
    fn from(value: [u8; N]) -> Self {
        Self::new(value.to_vec())
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", self.to_hex())
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for Packet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Packet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Packet::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Maps byte content to one canonical [`Packet`]
///
/// Grows monotonically. Keeps first-seen order so derived views such as the
/// supported-response list are stable.
#[derive(Debug, Default, Clone)]
pub struct PacketInterner {
    index: HashSet<Packet>,
    order: Vec<Packet>,
}

impl PacketInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical instance for the packet's bytes, registering it
    /// on first sight
    pub fn intern(&mut self, packet: &Packet) -> Packet {
        if let Some(existing) = self.index.get(packet.as_bytes()) {
            return existing.clone();
        }
        self.index.insert(packet.clone());
        self.order.push(packet.clone());
        packet.clone()
    }

    pub fn get(&self, bytes: &[u8]) -> Option<&Packet> {
        self.index.get(bytes)
    }

    /// All canonical packets in first-seen order
    pub fn packets(&self) -> &[Packet] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
