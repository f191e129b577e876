//! Connection lifecycle: open, probe, and close an authenticated session.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, ImapSettings};
use crate::error::{CloseError, ConnectionError, TransportError};

use super::transport::MailTransport;

/// The session type produced by [`connect`].
pub type ImapTlsSession = imap::Session<TlsStream<TcpStream>>;

/// An authenticated session bound to one selected folder.
///
/// Owned by whoever created it. After [`MailSession::close`] the transport
/// is dropped and every further operation reports [`TransportError::Closed`].
pub struct MailSession<T: MailTransport> {
    transport: Option<T>,
    folder: String,
}

/// Result of [`MailSession::close`]. Failures are reported here, never raised.
#[derive(Debug)]
pub enum CloseOutcome {
    /// Folder closed and logged out.
    Clean,
    /// At least one teardown step failed; the session is unusable anyway.
    Degraded(Vec<CloseError>),
    /// The session had already been closed.
    AlreadyClosed,
}

/// Open a TLS connection, log in, and select the configured folder.
///
/// Failures are logged and returned to the caller; there is no retry.
pub fn connect(
    settings: &ImapSettings,
    credentials: &Credentials,
) -> Result<MailSession<ImapTlsSession>, ConnectionError> {
    open(settings, credentials).inspect_err(|e| {
        error!(
            host = %settings.host,
            port = settings.port,
            folder = %settings.folder,
            error = %e,
            "Could not open mailbox"
        );
    })
}

fn open(
    settings: &ImapSettings,
    credentials: &Credentials,
) -> Result<MailSession<ImapTlsSession>, ConnectionError> {
    let tls = TlsConnector::builder().build()?;

    debug!(host = %settings.host, port = settings.port, "Connecting to IMAP server");
    let client = imap::connect(
        (settings.host.as_str(), settings.port),
        settings.host.as_str(),
        &tls,
    )
    .map_err(|source| ConnectionError::Network {
        host: settings.host.clone(),
        port: settings.port,
        source,
    })?;

    let mut session = client
        .login(credentials.address(), credentials.secret())
        .map_err(|(source, _client)| ConnectionError::Authentication {
            address: credentials.address().to_string(),
            source,
        })?;

    if let Err(source) = session.select(&settings.folder) {
        let _ = session.logout();
        return Err(ConnectionError::SelectFolder {
            folder: settings.folder.clone(),
            source,
        });
    }

    info!(
        host = %settings.host,
        folder = %settings.folder,
        "Connected to mailbox"
    );
    Ok(MailSession::from_transport(session, &settings.folder))
}

impl<T: MailTransport> MailSession<T> {
    /// Wrap a transport whose folder is already selected.
    pub fn from_transport(transport: T, folder: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            folder: folder.into(),
        }
    }

    /// Name of the selected folder.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Borrow the transport for one command.
    pub fn transport(&mut self) -> Result<&mut T, TransportError> {
        self.transport.as_mut().ok_or(TransportError::Closed)
    }

    /// Send a no-op. Any failure, including a closed session, yields `false`.
    pub fn is_alive(&mut self) -> bool {
        let Ok(transport) = self.transport() else {
            return false;
        };
        match transport.keepalive() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Keepalive failed");
                false
            }
        }
    }

    /// Close the folder and log out, best effort.
    ///
    /// Both steps are attempted even if the first fails. The session is
    /// closed afterwards regardless of the outcome.
    pub fn close(&mut self) -> CloseOutcome {
        let Some(mut transport) = self.transport.take() else {
            return CloseOutcome::AlreadyClosed;
        };

        let mut errors = Vec::new();
        if let Err(source) = transport.close_mailbox() {
            errors.push(CloseError::Folder {
                folder: self.folder.clone(),
                source,
            });
        }
        if let Err(e) = transport.sign_out() {
            errors.push(CloseError::Logout(e));
        }

        if errors.is_empty() {
            info!(folder = %self.folder, "Session closed");
            CloseOutcome::Clean
        } else {
            for e in &errors {
                warn!(error = %e, "Error while closing session");
            }
            CloseOutcome::Degraded(errors)
        }
    }
}
