//! Identifier newtypes shared across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque message identifier, unique within a run. Supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Group identifier. Many messages share a group; the group carries
/// cancellation, termination, and priority state in the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Create a group id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw group string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource identifier, assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(MessageId(7).to_string(), "msg-7");
        assert_eq!(ResourceId(2).to_string(), "res-2");
        assert_eq!(GroupId::from("orders").to_string(), "orders");
    }

    #[test]
    fn test_group_id_equality() {
        assert_eq!(GroupId::from("a"), GroupId::new("a"));
        assert_ne!(GroupId::from("a"), GroupId::from("b"));
    }
}
