//! Diagnostics serialization
//!
//! Renders request/response payloads into XML fragments for logging,
//! optionally restricted to a sub-path of the document. Fragments are
//! purely advisory: a failure here is a [`ConnectorError::Diagnostics`]
//! and must never be conflated with the outcome of the remote call.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{ConnectorError, ConnectorResult};
use crate::xml::{self, ToXml};

/// Path filter selecting the whole document.
pub const FULL_DOCUMENT: &str = "/";

/// Path filter selecting the children of a `response` root element.
pub const RESPONSE_BODY: &str = "/response/*";

/// Serialize a payload into an XML fragment.
///
/// The payload is rendered to an XML document, then the outer XML of all
/// nodes matching `path_filter` is concatenated. [`FULL_DOCUMENT`] keeps
/// the whole document; a filter like [`RESPONSE_BODY`] extracts only the
/// nodes below the named root. A filter that matches nothing yields an
/// empty fragment.
pub fn serialize<T: ToXml + ?Sized>(payload: &T, path_filter: &str) -> ConnectorResult<String> {
    let document = xml::to_document(payload)
        .map_err(|e| ConnectorError::diagnostics(format!("cannot render payload: {e}")))?;
    filter_document(&document, path_filter)
}

/// Apply a path filter to an XML document, concatenating the outer XML of
/// every matching node.
pub fn filter_document(document: &str, path_filter: &str) -> ConnectorResult<String> {
    if path_filter == FULL_DOCUMENT {
        return Ok(document.to_string());
    }

    let pattern = parse_filter(path_filter)?;

    let mut reader = Reader::from_str(document);
    let mut writer = xml::XmlWriter::new(Vec::new());
    let mut stack: Vec<String> = Vec::new();
    // Depth of the node being captured; None while scanning.
    let mut capture_depth: Option<usize> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConnectorError::diagnostics(format!("cannot re-parse document: {e}")))?;

        match &event {
            Event::Start(e) => {
                stack.push(local_name(e.local_name().as_ref()));
                if capture_depth.is_none() && matches(&stack, &pattern) {
                    capture_depth = Some(stack.len());
                }
            }
            Event::Empty(e) => {
                stack.push(local_name(e.local_name().as_ref()));
                let standalone_match = capture_depth.is_none() && matches(&stack, &pattern);
                stack.pop();
                if standalone_match {
                    writer.write_event(event.clone()).map_err(|e| {
                        ConnectorError::diagnostics(format!("cannot write fragment: {e}"))
                    })?;
                    continue;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if capture_depth.is_some() {
            writer
                .write_event(event.clone())
                .map_err(|e| ConnectorError::diagnostics(format!("cannot write fragment: {e}")))?;
        }

        if let Event::End(_) = &event {
            if capture_depth == Some(stack.len()) {
                capture_depth = None;
            }
            stack.pop();
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| ConnectorError::diagnostics(format!("fragment is not UTF-8: {e}")))
}

fn parse_filter(path_filter: &str) -> ConnectorResult<Vec<String>> {
    let trimmed = path_filter.strip_prefix('/').ok_or_else(|| {
        ConnectorError::diagnostics(format!("path filter '{path_filter}' must start with '/'"))
    })?;

    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return Err(ConnectorError::diagnostics(format!(
            "path filter '{path_filter}' has empty segments"
        )));
    }

    Ok(trimmed.split('/').map(ToString::to_string).collect())
}

fn matches(stack: &[String], pattern: &[String]) -> bool {
    stack.len() == pattern.len()
        && stack
            .iter()
            .zip(pattern)
            .all(|(name, segment)| segment == "*" || name == segment)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
