//! Remote mailbox access: the transport seam and the session lifecycle.

pub mod session;
pub mod transport;

pub use session::{connect, CloseOutcome, ImapTlsSession, MailSession};
pub use transport::MailTransport;
