//! `attachgrab`: search an IMAP mailbox for a keyword and save matching
//! attachments to disk.
//!
//! The pipeline: [`mail::connect`] opens a session, [`search::search`]
//! finds messages matching any case variant of a keyword, and
//! [`export::inspect`] / [`export::AttachmentExtractor`] look for and write
//! attachments of one file type. [`pipeline::run`] ties these together.

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod mail;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod search;
