//! Typed backend failures

use std::fmt;

/// Longest backend detail shown to an end user
pub const MAX_DETAIL_LEN: usize = 200;

/// Failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Credential invalid, expired or lacking rights (401, 403)
    Unauthorized,
    /// Token or resource absent (404)
    NotFound,
    /// Backend unreachable, timed out or failing (5xx)
    Unavailable,
    /// Any other non-success status
    Rejected,
    /// Success status with a body that is not the expected JSON
    InvalidResponse,
}

impl ApiErrorKind {
    /// Classify an HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ApiErrorKind::Unauthorized,
            404 => ApiErrorKind::NotFound,
            500..=599 => ApiErrorKind::Unavailable,
            _ => ApiErrorKind::Rejected,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::NotFound => "not found",
            ApiErrorKind::Unavailable => "unavailable",
            ApiErrorKind::Rejected => "rejected",
            ApiErrorKind::InvalidResponse => "invalid response",
        };
        f.write_str(name)
    }
}

/// Error from a backend call
///
/// `detail` is already sanitized and safe to show to an end user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, or the synthetic 503/504 for transport failures
    pub status: Option<u16>,
    pub message: String,
    pub detail: Option<String>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self { kind, status: None, message: message.into(), detail: None }
    }

    /// Non-success response
    pub fn from_status(status: u16, detail: Option<&str>) -> Self {
        Self {
            kind: ApiErrorKind::from_status(status),
            status: Some(status),
            message: format!("API error: {}", status),
            detail: detail.map(sanitize_detail).filter(|d| !d.is_empty()),
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: ApiErrorKind::Unavailable,
            status: Some(504),
            message: "Backend API timeout".to_string(),
            detail: None,
        }
    }

    pub fn connect() -> Self {
        Self {
            kind: ApiErrorKind::Unavailable,
            status: Some(503),
            message: "Cannot connect to backend API".to_string(),
            detail: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ApiErrorKind::Unavailable
    }

    /// Text fit for an end user: the backend's detail, else the message
    pub fn user_message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.message)
    }
}

/// Strip markup, collapse whitespace and cap the length of a backend detail
pub fn sanitize_detail(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' if !in_tag => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    // an unclosed '<' was not a tag
    if in_tag {
        if let Some(pos) = raw.rfind('<') {
            text.push_str(&raw[pos..]);
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_DETAIL_LEN {
        let cut: String = collapsed.chars().take(MAX_DETAIL_LEN).collect();
        format!("{}...", cut)
    } else {
        collapsed
    }
}
