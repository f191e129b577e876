//! MIME message parsing: multipart detection and depth-first part walking.

use std::ops::ControlFlow;

use mail_parser::{Message, MessageParser, MessagePart, MessagePartId, MimeHeaders, PartType};

use crate::model::part::{Disposition, MimePart};

/// Maximum nesting depth followed while walking (to bound recursion on adversarial input).
const MAX_DEPTH: usize = 32;

/// Parse a complete raw message (headers + body).
///
/// Returns `None` if `mail-parser` cannot make sense of the bytes.
pub fn parse_message(raw_message: &[u8]) -> Option<Message<'_>> {
    MessageParser::default().parse(raw_message)
}

/// `true` if the top-level part is a multipart container.
///
/// A single-part message cannot carry attachments.
pub fn is_multipart(msg: &Message<'_>) -> bool {
    matches!(msg.root_part().body, PartType::Multipart(_))
}

/// Every part of the message in depth-first pre-order, containers included.
///
/// Nested multiparts are descended into, and so are attached
/// `message/rfc822` messages (the embedded message part is listed first,
/// followed by its own parts).
pub fn walk_parts<'m>(msg: &'m Message<'_>) -> Vec<MimePart<'m>> {
    let mut parts = Vec::with_capacity(msg.parts.len());
    let _ = visit_parts(msg, |part| {
        parts.push(part);
        ControlFlow::<()>::Continue(())
    });
    parts
}

/// Visit parts in the same order as [`walk_parts`], stopping as soon as
/// `visit` breaks. Returns the break value, if any.
pub fn visit_parts<'m, B>(
    msg: &'m Message<'_>,
    mut visit: impl FnMut(MimePart<'m>) -> ControlFlow<B>,
) -> Option<B> {
    match visit_into(msg, 0, 0, &mut visit) {
        ControlFlow::Break(value) => Some(value),
        ControlFlow::Continue(()) => None,
    }
}

fn visit_into<'m, B>(
    msg: &'m Message<'_>,
    id: MessagePartId,
    depth: usize,
    visit: &mut impl FnMut(MimePart<'m>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    if depth > MAX_DEPTH {
        tracing::warn!(depth, "MIME tree too deep, not descending further");
        return ControlFlow::Continue(());
    }
    let Some(part) = msg.part(id) else {
        return ControlFlow::Continue(());
    };

    match &part.body {
        PartType::Multipart(children) => {
            visit(to_mime_part(part, depth, None))?;
            for &child in children {
                visit_into(msg, child, depth + 1, visit)?;
            }
            ControlFlow::Continue(())
        }
        PartType::Message(inner) => {
            visit(to_mime_part(part, depth, Some(part.contents())))?;
            visit_into(inner, 0, depth + 1, visit)
        }
        _ => visit(to_mime_part(part, depth, Some(part.contents()))),
    }
}

fn to_mime_part<'m>(
    part: &'m MessagePart<'_>,
    depth: usize,
    payload: Option<&'m [u8]>,
) -> MimePart<'m> {
    let disposition = part
        .content_disposition()
        .map(|d| Disposition::from_header(d.ctype()))
        .unwrap_or(Disposition::Unspecified);

    MimePart {
        depth,
        disposition,
        filename: part.attachment_name(),
        payload,
        encoding_problem: part.is_encoding_problem,
    }
}
