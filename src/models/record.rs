//! Capture record model
//!
//! Represents a single request/response exchange observed from the embedded
//! web view.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::sniff::{self, ContentKind};

/// Maximum number of characters kept in memory for a body preview.
/// The full body, if any, lives only in the body store.
pub const PREVIEW_LEN: usize = 500;

/// Kind of request as reported by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Fetch,
    Xhr,
    Document,
    Other,
}

impl RequestType {
    /// Convert from string (lossy, defaults to Other)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fetch" => RequestType::Fetch,
            "xhr" => RequestType::Xhr,
            "document" => RequestType::Document,
            _ => RequestType::Other,
        }
    }
}

/// Which side of an exchange a stored body belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyRole {
    Request,
    Response,
}

impl BodyRole {
    /// File extension used for this role in the body store directory
    pub fn file_ext(&self) -> &'static str {
        match self {
            BodyRole::Request => "request",
            BodyRole::Response => "response",
        }
    }
}

/// A single captured request/response exchange.
///
/// Immutable after insertion except for the response fields, which are set
/// exactly once when the exchange completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Unique identifier; also keys the record's body-store entries
    pub id: String,

    /// HTTP method, upper-cased at insert
    pub method: String,

    /// Full request URL
    pub url: String,

    /// Kind of request as reported by the page
    pub request_type: RequestType,

    /// Request headers
    pub request_headers: Option<HashMap<String, String>>,
    /// Prefix of the request body kept for fast display
    pub request_body_preview: Option<String>,

    /// HTTP status code
    pub status: Option<u16>,
    /// HTTP status message
    pub status_text: Option<String>,
    /// Response headers
    pub response_headers: Option<HashMap<String, String>>,
    /// Prefix of the response body kept for fast display
    pub response_body_preview: Option<String>,

    /// Failure description; presence implies failure regardless of status
    pub error: Option<String>,

    /// When the request started, milliseconds since epoch
    pub start_time: i64,
    /// When the response or error arrived, milliseconds since epoch
    pub end_time: Option<i64>,
}

impl CaptureRecord {
    /// Create a record for a request that just started
    pub fn new(
        id: String,
        method: &str,
        url: &str,
        request_type: RequestType,
        request_headers: Option<HashMap<String, String>>,
        request_body_preview: Option<String>,
    ) -> Self {
        Self {
            id,
            method: method.to_uppercase(),
            url: url.to_string(),
            request_type,
            request_headers,
            request_body_preview,
            status: None,
            status_text: None,
            response_headers: None,
            response_body_preview: None,
            error: None,
            start_time: Utc::now().timestamp_millis(),
            end_time: None,
        }
    }

    /// Whether the exchange is still waiting for a response or error
    pub fn is_pending(&self) -> bool {
        self.end_time.is_none() && self.error.is_none()
    }

    /// Whether the exchange failed, by explicit error or status code
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.status.is_some_and(|s| s >= 400)
    }

    /// Total duration in milliseconds, once completed
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Get duration as formatted string
    pub fn duration_str(&self) -> String {
        match self.duration_ms() {
            Some(ms) if ms < 1000 => format!("{}ms", ms),
            Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
            None => "-".to_string(),
        }
    }

    /// Coarse content kind of the request body, from its preview and headers
    pub fn request_content_kind(&self) -> Option<ContentKind> {
        self.request_body_preview
            .as_deref()
            .map(|body| sniff::classify(body, self.request_headers.as_ref()))
    }

    /// Coarse content kind of the response body, from its preview and headers
    pub fn response_content_kind(&self) -> Option<ContentKind> {
        self.response_body_preview
            .as_deref()
            .map(|body| sniff::classify(body, self.response_headers.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CaptureRecord {
        CaptureRecord::new(
            uuid::Uuid::new_v4().to_string(),
            "get",
            "https://example.com/api",
            RequestType::Fetch,
            None,
            None,
        )
    }

    #[test]
    fn method_is_uppercased() {
        let record = sample_record();
        assert_eq!(record.method, "GET");
    }

    #[test]
    fn new_record_is_pending() {
        let record = sample_record();
        assert!(record.is_pending());
        assert_eq!(record.duration_ms(), None);
        assert_eq!(record.duration_str(), "-");
    }

    #[test]
    fn error_implies_failure_without_status() {
        let mut record = sample_record();
        record.error = Some("connection reset".to_string());
        assert!(record.is_failed());
        assert!(!record.is_pending());
    }

    #[test]
    fn status_400_and_up_is_failure() {
        let mut record = sample_record();
        record.status = Some(404);
        assert!(record.is_failed());
        record.status = Some(200);
        assert!(!record.is_failed());
    }

    #[test]
    fn request_type_parses_lossily() {
        assert_eq!(RequestType::from_str_lossy("XHR"), RequestType::Xhr);
        assert_eq!(RequestType::from_str_lossy("fetch"), RequestType::Fetch);
        assert_eq!(
            RequestType::from_str_lossy("document"),
            RequestType::Document
        );
        assert_eq!(RequestType::from_str_lossy("beacon"), RequestType::Other);
    }

    #[test]
    fn response_content_kind_uses_preview_and_headers() {
        let mut record = sample_record();
        record.response_body_preview = Some("{\"ok\":true}".to_string());
        assert_eq!(record.response_content_kind(), Some(ContentKind::Json));
        assert_eq!(sample_record().response_content_kind(), None);
    }
}
