//! Email parsing: MIME tree handling.

pub mod mime;
