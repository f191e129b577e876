//! Attachment inspection and extraction, and the naming of extracted files.

pub mod attachment;
pub mod naming;

pub use attachment::{
    extract_attachments, has_attachment_of_type, inspect, AttachmentExtractor, ExtractionReport,
    ExtractionStatus, Inspection,
};
