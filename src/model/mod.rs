//! Core data model types: message ids, MIME parts, and downloaded files.

pub mod download;
pub mod message_id;
pub mod part;
