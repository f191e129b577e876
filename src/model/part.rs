//! A node of a message's content tree, borrowed from the parsed message.

/// How a part asks to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
    /// No `Content-Disposition` header, or an unrecognized value.
    Unspecified,
}

impl Disposition {
    /// Classify a raw disposition type (`attachment`, `inline`, …).
    pub fn from_header(value: &str) -> Self {
        if value.eq_ignore_ascii_case("attachment") {
            Self::Attachment
        } else if value.eq_ignore_ascii_case("inline") {
            Self::Inline
        } else {
            Self::Unspecified
        }
    }
}

/// One part of a MIME tree.
///
/// Containers (multiparts, embedded messages) carry no payload.
#[derive(Debug, Clone)]
pub struct MimePart<'m> {
    /// Depth in the tree; the root part is 0.
    pub depth: usize,

    pub disposition: Disposition,

    /// Filename from `Content-Disposition` or the `name` parameter of
    /// `Content-Type`, if any.
    pub filename: Option<&'m str>,

    /// Transfer-decoded payload. `None` for containers.
    pub payload: Option<&'m [u8]>,

    /// `true` when the transfer encoding could not be decoded cleanly.
    pub encoding_problem: bool,
}

impl MimePart<'_> {
    /// `true` if this is an attachment-disposition part with a non-empty filename.
    pub fn is_named_attachment(&self) -> bool {
        self.disposition == Disposition::Attachment
            && self.filename.is_some_and(|name| !name.trim().is_empty())
    }

    pub fn is_container(&self) -> bool {
        self.payload.is_none()
    }
}
