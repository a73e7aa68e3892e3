use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body the inventory service returns alongside a non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            error_code: None,
        }
    }

    /// Extracts the `detail` field from a raw response body. Bodies that are
    /// not the expected JSON shape (proxies, HTML error pages) yield `None`.
    pub fn detail_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|body| body.detail)
            .filter(|detail| !detail.trim().is_empty())
    }
}

#[derive(Debug, Clone, Error)]
#[error("request rejected with status {status}: {detail}")]
pub struct ApiRejection {
    pub status: u16,
    pub detail: String,
}

impl ApiRejection {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<ApiRejection> for ErrorBody {
    fn from(value: ApiRejection) -> Self {
        Self::new(value.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_read_from_json_body() {
        let body = r#"{"detail":"Printer with ID 9 not found"}"#;
        assert_eq!(
            ErrorBody::detail_from_body(body).as_deref(),
            Some("Printer with ID 9 not found")
        );
    }

    #[test]
    fn non_json_or_blank_detail_is_ignored() {
        assert_eq!(ErrorBody::detail_from_body("<html>502</html>"), None);
        assert_eq!(ErrorBody::detail_from_body(r#"{"detail":"  "}"#), None);
    }
}
