//! Common types shared between the planner, the engine and the host.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Unique identifier for a room in the floor-plan graph.
///
/// Exporters disagree on whether ids are strings or integers, so a
/// `RoomId` accepts both on input and always stores the textual form.
/// Ordering is lexicographic on that text and is used wherever the
/// planner needs a deterministic tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a RoomId from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RoomId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct RoomIdVisitor;

impl<'de> Visitor<'de> for RoomIdVisitor {
    type Value = RoomId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a room id (string or number)")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RoomId, E> {
        Ok(RoomId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RoomId, E> {
        Ok(RoomId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RoomId, E> {
        Ok(RoomId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RoomId, E> {
        Ok(RoomId(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RoomId, E> {
        if !v.is_finite() {
            return Err(E::custom("room id must be finite"));
        }
        Ok(RoomId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RoomIdVisitor)
    }
}
