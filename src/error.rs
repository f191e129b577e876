//! Centralized error types for attachgrab.
//!
//! Only [`ConnectionError`] is meant to stop a run. The other types are
//! recovered where they occur and surface inside result reports
//! ([`crate::search::SearchOutcome`], [`crate::export::Inspection`],
//! [`crate::export::ExtractionReport`], [`crate::mail::CloseOutcome`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::model::message_id::MessageId;

/// Failure to open, authenticate, or select a folder on a new session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The TLS connector could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    /// The server could not be reached or the handshake failed.
    #[error("Could not connect to {host}:{port}: {source}")]
    Network {
        host: String,
        port: u16,
        source: imap::Error,
    },

    /// The server rejected the credentials.
    #[error("Authentication rejected for '{address}': {source}")]
    Authentication { address: String, source: imap::Error },

    /// The mailbox folder could not be selected after login.
    #[error("Could not select folder '{folder}': {source}")]
    SelectFolder { folder: String, source: imap::Error },

    /// Required credentials were not supplied.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// A single protocol command failed.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error reported by the IMAP client.
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),

    /// The session has already been closed.
    #[error("Session is closed")]
    Closed,

    /// Any other transport failure (used by non-IMAP transports).
    #[error("{0}")]
    Other(String),
}

/// One keyword variant query failed. Recorded, never raised.
#[derive(Error, Debug)]
#[error("Search for variant '{variant}' failed: {source}")]
pub struct SearchVariantError {
    pub variant: String,
    pub source: TransportError,
}

/// A message could not be fetched or parsed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The transport failed while fetching.
    #[error("Fetch of message {id} failed: {source}")]
    Transport {
        id: MessageId,
        source: TransportError,
    },

    /// The server answered without a message body.
    #[error("Server returned no body for message {0}")]
    EmptyBody(MessageId),

    /// The returned bytes could not be parsed as a message.
    #[error("Message {0} could not be parsed")]
    Unparseable(MessageId),
}

/// Processing one attachment part failed.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The part payload is missing or its transfer encoding is broken.
    #[error("Could not decode attachment '{filename}': {reason}")]
    Decode { filename: String, reason: String },

    /// Writing the decoded bytes to disk failed.
    #[error("Could not write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A step of session teardown failed. Reported, never raised.
#[derive(Error, Debug)]
pub enum CloseError {
    /// Closing the selected folder failed.
    #[error("Closing folder '{folder}' failed: {source}")]
    Folder {
        folder: String,
        source: TransportError,
    },

    /// Logging out failed.
    #[error("Logout failed: {0}")]
    Logout(TransportError),
}
