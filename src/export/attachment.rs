//! Detect and extract attachments of a given file type from a message.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::{ExtractionError, FetchError};
use crate::mail::{MailSession, MailTransport};
use crate::model::download::DownloadedFile;
use crate::model::message_id::MessageId;
use crate::model::part::MimePart;
use crate::parser::mime;

use super::naming::{
    derive_filename, matches_extension, normalize_extension, resolve_path, Clock,
    CollisionPolicy, SystemClock, DEFAULT_TIMESTAMP_FORMAT,
};

/// Outcome of [`inspect`].
#[derive(Debug)]
pub enum Inspection {
    /// A matching attachment exists; the first one found is named.
    Found { filename: String },
    /// The message is multipart but nothing matched.
    NotFound,
    /// Single-part message; no walk was performed.
    NotMultipart,
    /// The message could not be fetched or parsed.
    FetchFailed(FetchError),
}

impl Inspection {
    pub fn has_match(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// How far extraction got for one message.
#[derive(Debug)]
pub enum ExtractionStatus {
    /// The part walk ran to completion (individual parts may still have failed).
    Completed,
    /// Single-part message; no walk was performed.
    NotMultipart,
    /// The message could not be fetched or parsed.
    FetchFailed(FetchError),
}

/// Files written for one message, plus everything that went wrong along the way.
#[derive(Debug)]
pub struct ExtractionReport {
    pub message_id: MessageId,
    pub status: ExtractionStatus,
    pub files: Vec<DownloadedFile>,
    /// Parts that matched but could not be decoded or written.
    pub failures: Vec<ExtractionError>,
}

impl ExtractionReport {
    fn new(message_id: MessageId, status: ExtractionStatus) -> Self {
        Self {
            message_id,
            status,
            files: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Fetch and return the raw bytes of a message.
fn fetch_raw<T: MailTransport>(
    session: &mut MailSession<T>,
    id: MessageId,
) -> Result<Vec<u8>, FetchError> {
    let transport = session
        .transport()
        .map_err(|source| FetchError::Transport { id, source })?;
    match transport.fetch_message(id) {
        Ok(Some(raw)) => Ok(raw),
        Ok(None) => Err(FetchError::EmptyBody(id)),
        Err(source) => Err(FetchError::Transport { id, source }),
    }
}

/// Decide whether a message carries an attachment named `*.{extension}`.
///
/// Never fails: fetch problems come back as [`Inspection::FetchFailed`].
pub fn inspect<T: MailTransport>(
    session: &mut MailSession<T>,
    id: MessageId,
    extension: &str,
) -> Inspection {
    let raw = match fetch_raw(session, id) {
        Ok(raw) => raw,
        Err(e) => {
            error!(id = %id, error = %e, "Could not fetch message for inspection");
            return Inspection::FetchFailed(e);
        }
    };
    let Some(msg) = mime::parse_message(&raw) else {
        error!(id = %id, "Could not parse message for inspection");
        return Inspection::FetchFailed(FetchError::Unparseable(id));
    };
    if !mime::is_multipart(&msg) {
        debug!(id = %id, "Single-part message, no attachments possible");
        return Inspection::NotMultipart;
    }

    let found = mime::visit_parts(&msg, |part| match part.filename {
        Some(name) if part.is_named_attachment() && matches_extension(name, extension) => {
            ControlFlow::Break(name)
        }
        _ => ControlFlow::Continue(()),
    });

    match found {
        Some(name) => {
            debug!(id = %id, filename = %name, "Found matching attachment");
            Inspection::Found {
                filename: name.to_string(),
            }
        }
        None => Inspection::NotFound,
    }
}

/// `true` if the message has at least one matching attachment.
///
/// A message that cannot be fetched counts as having none.
pub fn has_attachment_of_type<T: MailTransport>(
    session: &mut MailSession<T>,
    id: MessageId,
    extension: &str,
) -> bool {
    inspect(session, id, extension).has_match()
}

/// Writes matching attachments into a destination folder.
pub struct AttachmentExtractor<C: Clock = SystemClock> {
    extension: String,
    destination: PathBuf,
    timestamp_format: String,
    collisions: CollisionPolicy,
    clock: C,
}

impl AttachmentExtractor<SystemClock> {
    /// Extract `*.{extension}` attachments into `destination`, which must exist.
    pub fn new(extension: &str, destination: impl Into<PathBuf>) -> Self {
        Self {
            extension: normalize_extension(extension),
            destination: destination.into(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            collisions: CollisionPolicy::default(),
            clock: SystemClock,
        }
    }
}

impl<C: Clock> AttachmentExtractor<C> {
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collisions = policy;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Replace the timestamp source.
    pub fn with_clock<K: Clock>(self, clock: K) -> AttachmentExtractor<K> {
        AttachmentExtractor {
            extension: self.extension,
            destination: self.destination,
            timestamp_format: self.timestamp_format,
            collisions: self.collisions,
            clock,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Walk one message and write every matching attachment.
    ///
    /// A failing part is recorded and skipped; the walk continues.
    pub fn extract<T: MailTransport>(
        &self,
        session: &mut MailSession<T>,
        id: MessageId,
    ) -> ExtractionReport {
        let raw = match fetch_raw(session, id) {
            Ok(raw) => raw,
            Err(e) => {
                error!(id = %id, error = %e, "Could not fetch message for extraction");
                return ExtractionReport::new(id, ExtractionStatus::FetchFailed(e));
            }
        };
        let Some(msg) = mime::parse_message(&raw) else {
            error!(id = %id, "Could not parse message for extraction");
            return ExtractionReport::new(
                id,
                ExtractionStatus::FetchFailed(FetchError::Unparseable(id)),
            );
        };
        if !mime::is_multipart(&msg) {
            debug!(id = %id, "Single-part message, nothing to extract");
            return ExtractionReport::new(id, ExtractionStatus::NotMultipart);
        }

        let mut report = ExtractionReport::new(id, ExtractionStatus::Completed);
        for part in mime::walk_parts(&msg) {
            if !part.is_named_attachment() {
                continue;
            }
            let Some(filename) = part.filename else {
                continue;
            };
            if !matches_extension(filename, &self.extension) {
                continue;
            }

            match self.write_part(id, filename, &part) {
                Ok(file) => {
                    info!(
                        id = %id,
                        source = %filename,
                        path = %file.path.display(),
                        size = file.size,
                        "Saved attachment"
                    );
                    report.files.push(file);
                }
                Err(e) => {
                    error!(id = %id, error = %e, "Failed to extract attachment");
                    report.failures.push(e);
                }
            }
        }
        report
    }

    fn write_part(
        &self,
        id: MessageId,
        filename: &str,
        part: &MimePart<'_>,
    ) -> Result<DownloadedFile, ExtractionError> {
        let bytes = decoded_payload(filename, part)?;

        let extracted_at = self.clock.now();
        let derived = derive_filename(filename, extracted_at, &self.timestamp_format);
        let path = resolve_path(&self.destination, &derived, self.collisions);

        std::fs::write(&path, bytes).map_err(|source| ExtractionError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(DownloadedFile {
            path,
            source_filename: filename.to_string(),
            extracted_at,
            message_id: id,
            size: bytes.len() as u64,
        })
    }
}

fn decoded_payload<'m>(filename: &str, part: &MimePart<'m>) -> Result<&'m [u8], ExtractionError> {
    if part.encoding_problem {
        return Err(ExtractionError::Decode {
            filename: filename.to_string(),
            reason: "malformed transfer encoding".to_string(),
        });
    }
    part.payload.ok_or_else(|| ExtractionError::Decode {
        filename: filename.to_string(),
        reason: "part has no payload".to_string(),
    })
}

/// Extract every `*.{extension}` attachment of one message into `destination`.
///
/// Uses the system clock and overwrites on name collisions.
pub fn extract_attachments<T: MailTransport>(
    session: &mut MailSession<T>,
    id: MessageId,
    extension: &str,
    destination: &Path,
) -> ExtractionReport {
    AttachmentExtractor::new(extension, destination).extract(session, id)
}
