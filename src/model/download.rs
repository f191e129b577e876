//! Record of an attachment written to disk.

use std::path::PathBuf;

use chrono::NaiveDateTime;

use super::message_id::MessageId;

/// A file produced by the extractor. Never mutated after creation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadedFile {
    /// Where the bytes were written.
    pub path: PathBuf,

    /// Filename as it appeared in the message.
    pub source_filename: String,

    /// Second-resolution time used to derive the filename.
    pub extracted_at: NaiveDateTime,

    /// Message the attachment came from.
    pub message_id: MessageId,

    /// Number of bytes written.
    pub size: u64,
}
