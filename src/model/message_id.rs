//! Server-assigned message identifiers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of one message inside the selected folder.
///
/// Only meaningful for the lifetime of the session that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct MessageId(u32);

impl MessageId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw token as sent on the wire.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for MessageId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Deduplicated collection of message ids.
///
/// Iteration happens to be ascending; callers must not rely on it.
pub type MessageIdSet = BTreeSet<MessageId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: MessageId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_set_deduplicates() {
        let set: MessageIdSet = [7, 3, 7, 7].into_iter().map(MessageId::new).collect();
        assert_eq!(set.len(), 2);
    }
}
