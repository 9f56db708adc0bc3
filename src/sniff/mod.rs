//! Content-type sniffing
//!
//! Pure classification of a text body's media type, and detection of
//! mismatches between what headers declare and what the body looks like.
//! No state, no I/O; a failed JSON probe just means "not JSON".

use serde_json::Value;
use std::collections::HashMap;

/// Coarse media-type label for a captured body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Html,
    Xml,
    Text,
    FormUrlEncoded,
}

impl ContentKind {
    /// Human-readable label used in discrepancy messages
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Json => "JSON",
            ContentKind::Html => "HTML",
            ContentKind::Xml => "XML",
            ContentKind::Text => "plain text",
            ContentKind::FormUrlEncoded => "form URL-encoded",
        }
    }
}

/// Classify a body's media type.
///
/// A recognized `Content-Type` header wins; otherwise the body itself is
/// sniffed. Deterministic for a given `(body, headers)` pair.
pub fn classify(body: &str, headers: Option<&HashMap<String, String>>) -> ContentKind {
    if let Some(kind) = declared_kind(headers) {
        return kind;
    }
    sniff_body(body)
}

/// Report a mismatch between the header-declared type and the body-sniffed
/// type, if both resolve and disagree.
///
/// Diagnostic only; `classify` is never altered by this result.
pub fn detect_discrepancy(
    body: &str,
    headers: Option<&HashMap<String, String>>,
) -> Option<String> {
    let declared = declared_kind(headers)?;
    let sniffed = sniff_body(body);
    if declared == sniffed {
        return None;
    }
    Some(format!(
        "Content-Type header declares {} but the body looks like {}",
        declared.label(),
        sniffed.label()
    ))
}

/// Map a declared `Content-Type` header to a kind, if one is recognized
fn declared_kind(headers: Option<&HashMap<String, String>>) -> Option<ContentKind> {
    let content_type = headers?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.as_str())?;

    // First match wins, in priority order
    if content_type.contains("application/json") {
        Some(ContentKind::Json)
    } else if content_type.contains("text/html") {
        Some(ContentKind::Html)
    } else if content_type.contains("text/xml") || content_type.contains("application/xml") {
        Some(ContentKind::Xml)
    } else if content_type.contains("text/plain") {
        Some(ContentKind::Text)
    } else if content_type.contains("application/x-www-form-urlencoded") {
        Some(ContentKind::FormUrlEncoded)
    } else {
        None
    }
}

/// Infer a kind from the body text alone
fn sniff_body(body: &str) -> ContentKind {
    let trimmed = body.trim();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(trimmed).is_ok()
    {
        return ContentKind::Json;
    }
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
        return ContentKind::Html;
    }
    if trimmed.starts_with('<') {
        return ContentKind::Xml;
    }
    if trimmed.contains('=') && trimmed.contains('&') {
        return ContentKind::FormUrlEncoded;
    }
    ContentKind::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &str) -> HashMap<String, String> {
        HashMap::from([("Content-Type".to_string(), content_type.to_string())])
    }

    #[test]
    fn sniffs_json_objects_and_arrays() {
        assert_eq!(classify("{\"a\":1}", None), ContentKind::Json);
        assert_eq!(classify("  [1, 2, 3]", None), ContentKind::Json);
    }

    #[test]
    fn malformed_json_falls_through() {
        // Leading brace but not valid JSON; sniffing moves on
        assert_eq!(classify("{not json", None), ContentKind::Text);
    }

    #[test]
    fn sniffs_html_and_xml() {
        assert_eq!(classify("<html></html>", None), ContentKind::Html);
        assert_eq!(classify("<!DOCTYPE html><html>", None), ContentKind::Html);
        assert_eq!(classify("<?xml version=\"1.0\"?>", None), ContentKind::Xml);
        assert_eq!(classify("<rss><item/></rss>", None), ContentKind::Xml);
    }

    #[test]
    fn doctype_match_is_case_sensitive() {
        // Lowercase doctype is not recognized as HTML; leading '<' means XML
        assert_eq!(classify("<!doctype html>", None), ContentKind::Xml);
    }

    #[test]
    fn sniffs_form_encoding_and_plain_text() {
        assert_eq!(classify("a=1&b=2", None), ContentKind::FormUrlEncoded);
        assert_eq!(classify("hello", None), ContentKind::Text);
        assert_eq!(classify("a=1", None), ContentKind::Text);
    }

    #[test]
    fn declared_header_wins_over_body() {
        let h = headers("text/html; charset=utf-8");
        assert_eq!(classify("{\"a\":1}", Some(&h)), ContentKind::Html);
    }

    #[test]
    fn header_key_match_is_case_insensitive() {
        let h = HashMap::from([(
            "content-type".to_string(),
            "application/json".to_string(),
        )]);
        assert_eq!(classify("whatever", Some(&h)), ContentKind::Json);
    }

    #[test]
    fn unrecognized_header_falls_back_to_sniffing() {
        let h = headers("application/octet-stream");
        assert_eq!(classify("{\"a\":1}", Some(&h)), ContentKind::Json);
    }

    #[test]
    fn discrepancy_reports_both_labels() {
        let h = headers("text/html");
        let msg = detect_discrepancy("{\"a\":1}", Some(&h)).expect("mismatch");
        assert!(msg.contains("HTML"));
        assert!(msg.contains("JSON"));
    }

    #[test]
    fn no_discrepancy_when_types_agree() {
        let h = headers("application/json");
        assert_eq!(detect_discrepancy("{\"a\":1}", Some(&h)), None);
    }

    #[test]
    fn no_discrepancy_without_recognized_header() {
        assert_eq!(detect_discrepancy("{\"a\":1}", None), None);
        let h = headers("application/octet-stream");
        assert_eq!(detect_discrepancy("{\"a\":1}", Some(&h)), None);
    }
}
