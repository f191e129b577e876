//! In-memory mailbox used by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use attachgrab::error::TransportError;
use attachgrab::mail::{MailSession, MailTransport};
use attachgrab::model::message_id::MessageId;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

/// A folder whose `SEARCH TEXT` is a case-sensitive substring match over
/// the raw message, like a server that does no case folding.
#[derive(Default)]
pub struct MockMailbox {
    messages: BTreeMap<u32, Vec<u8>>,
    failing_fetches: HashSet<u32>,
    failing_variants: HashSet<String>,
    seven_bit_only: bool,
    /// Every criterion received, in order.
    pub queries: Vec<String>,
    /// Every id fetched, in order.
    pub fetched: Vec<u32>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(mut self, id: u32, name: &str) -> Self {
        self.messages.insert(id, fixture_bytes(name));
        self
    }

    /// A message the server lists but whose fetch errors out.
    pub fn with_failing_fetch(mut self, id: u32, name: &str) -> Self {
        self.messages.insert(id, fixture_bytes(name));
        self.failing_fetches.insert(id);
        self
    }

    pub fn with_failing_variant(mut self, variant: &str) -> Self {
        self.failing_variants.insert(variant.to_string());
        self
    }

    /// Answer `BAD` to any search carrying 8-bit text, like a strict server.
    pub fn seven_bit_only(mut self) -> Self {
        self.seven_bit_only = true;
        self
    }

    pub fn into_session(self) -> MailSession<MockMailbox> {
        MailSession::from_transport(self, "INBOX")
    }
}

/// Pull the keyword back out of `[CHARSET UTF-8 ]TEXT "<keyword>"`.
fn keyword_of(criteria: &str) -> String {
    let rest = criteria.strip_prefix("CHARSET UTF-8 ").unwrap_or(criteria);
    let quoted = rest
        .strip_prefix("TEXT \"")
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or_else(|| panic!("unexpected criteria: {criteria}"));

    let mut keyword = String::new();
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            keyword.extend(chars.next());
        } else {
            keyword.push(ch);
        }
    }
    keyword
}

impl MailTransport for MockMailbox {
    fn text_search(&mut self, criteria: &str) -> Result<HashSet<MessageId>, TransportError> {
        self.queries.push(criteria.to_string());
        if self.seven_bit_only && !criteria.is_ascii() {
            return Err(TransportError::Other("BAD 8-bit data in quoted string".into()));
        }
        let keyword = keyword_of(criteria);
        if self.failing_variants.contains(&keyword) {
            return Err(TransportError::Other("BAD parse error in SEARCH".into()));
        }

        Ok(self
            .messages
            .iter()
            .filter(|(_, raw)| String::from_utf8_lossy(raw).contains(&keyword))
            .map(|(&id, _)| MessageId::new(id))
            .collect())
    }

    fn fetch_message(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, TransportError> {
        self.fetched.push(id.get());
        if self.failing_fetches.contains(&id.get()) {
            return Err(TransportError::Other("connection timed out".into()));
        }
        Ok(self.messages.get(&id.get()).cloned())
    }

    fn keepalive(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close_mailbox(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn sign_out(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
