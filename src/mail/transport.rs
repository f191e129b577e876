//! The protocol primitives the core needs, and their IMAP implementation.

use std::collections::HashSet;
use std::io::{Read, Write};

use crate::error::TransportError;
use crate::model::message_id::MessageId;

/// Commands issued against an authenticated session with a selected folder.
///
/// One command is in flight at a time; implementations need no locking.
pub trait MailTransport {
    /// Run a `SEARCH` with the given criteria and return matching ids.
    fn text_search(&mut self, criteria: &str) -> Result<HashSet<MessageId>, TransportError>;

    /// Fetch the complete raw message. `Ok(None)` if the server sent no body.
    fn fetch_message(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, TransportError>;

    /// No-op round trip used as a liveness probe.
    fn keepalive(&mut self) -> Result<(), TransportError>;

    /// Close the selected folder.
    fn close_mailbox(&mut self) -> Result<(), TransportError>;

    /// End the session.
    fn sign_out(&mut self) -> Result<(), TransportError>;
}

impl<T: Read + Write> MailTransport for imap::Session<T> {
    fn text_search(&mut self, criteria: &str) -> Result<HashSet<MessageId>, TransportError> {
        let seqs = self.search(criteria)?;
        Ok(seqs.into_iter().map(MessageId::new).collect())
    }

    fn fetch_message(&mut self, id: MessageId) -> Result<Option<Vec<u8>>, TransportError> {
        let fetches = self.fetch(id.to_string(), "RFC822")?;
        Ok(fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .map(|body| body.to_vec()))
    }

    fn keepalive(&mut self) -> Result<(), TransportError> {
        self.noop()?;
        Ok(())
    }

    fn close_mailbox(&mut self) -> Result<(), TransportError> {
        self.close()?;
        Ok(())
    }

    fn sign_out(&mut self) -> Result<(), TransportError> {
        self.logout()?;
        Ok(())
    }
}

/// Build a full-text `SEARCH` criterion for one keyword variant.
///
/// Quotes and backslashes are escaped; non-ASCII keywords get an explicit
/// `CHARSET UTF-8` prefix.
///
/// Non-ASCII keywords still travel as a quoted string. Servers that only
/// accept 7-bit quoted strings answer `BAD`, which shows up as a failed
/// variant in [`crate::search::SearchOutcome`], never as an empty match.
/// Sending a literal instead would need a continuation round trip that the
/// `imap` client does not perform inside `SEARCH`.
pub fn text_criterion(keyword: &str) -> String {
    let mut quoted = String::with_capacity(keyword.len() + 2);
    for ch in keyword.chars() {
        match ch {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            '\r' | '\n' => quoted.push(' '),
            _ => quoted.push(ch),
        }
    }

    if keyword.is_ascii() {
        format!("TEXT \"{quoted}\"")
    } else {
        format!("CHARSET UTF-8 TEXT \"{quoted}\"")
    }
}
