//! Backend request and response shapes

use crate::rbac::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile details forwarded with a token verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileHints {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: Option<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = last;
        self
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// Chat ids arrive as JSON numbers from some backend versions
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Result of confirming an account-link token
///
/// Linking binds a chat identity to a regular (non-admin) user account so
/// the backend can send it notifications. It never opens a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Bound to the backend user `user_id`, when reported
    Linked { user_id: Option<i64> },
    /// Token unknown, expired or already used (404)
    InvalidToken,
    /// Request refused (400) with a display-safe reason
    Refused { detail: String },
    /// The chat identity is already bound to another user (409)
    AlreadyLinked,
}

/// Credential issued by the backend on verify or restore
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub admin_id: i64,
    #[serde(default)]
    pub admin_name: Option<String>,
    pub role: Role,
    #[serde(default, deserialize_with = "string_or_number")]
    pub telegram_user_id: Option<String>,
    #[serde(default)]
    pub session_created: bool,
}

impl AuthGrant {
    pub fn display_name(&self) -> Option<String> {
        self.admin_name.clone().filter(|name| !name.trim().is_empty())
    }
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGrant")
            .field("access_token", &crate::logging::mask_token(&self.access_token))
            .field("admin_id", &self.admin_id)
            .field("admin_name", &self.admin_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// One page of a collection, normalized from whatever shape the backend sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl Page {
    /// Accepts a bare list, `{"items": [...]}` or `{"data": [...]}`
    ///
    /// `total` defaults to the item count and `total_pages` to
    /// `ceil(total / page_size)`; at most `page_size` items are kept.
    pub fn from_value(value: Value, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let (mut items, total, total_pages) = match value {
            Value::Array(items) => (items, None, None),
            Value::Object(mut map) => {
                let items = match map.remove("items").or_else(|| map.remove("data")) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                let total = map.get("total").and_then(Value::as_u64);
                let total_pages = map.get("total_pages").and_then(Value::as_u64);
                (items, total, total_pages)
            }
            _ => (Vec::new(), None, None),
        };

        let total = total.unwrap_or(items.len() as u64);
        let total_pages = total_pages
            .map(|p| p.min(u64::from(u32::MAX)) as u32)
            .unwrap_or_else(|| total.div_ceil(u64::from(page_size)).min(u64::from(u32::MAX)) as u32)
            .max(1);
        items.truncate(page_size as usize);

        Self { items, total, page: page.max(1), page_size, total_pages }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grant_from_backend_payload() {
        let grant: AuthGrant = serde_json::from_value(json!({
            "access_token": "jwt",
            "admin_id": 12,
            "admin_name": "Dana",
            "role": "government",
            "telegram_user_id": "555",
            "session_created": true
        }))
        .unwrap();
        assert_eq!(grant.token_type, "bearer");
        assert_eq!(grant.role, Role::Government);
        assert_eq!(grant.display_name().as_deref(), Some("Dana"));
        assert_eq!(grant.telegram_user_id.as_deref(), Some("555"));
        assert!(!format!("{:?}", grant).contains("\"jwt\""));

        let numeric: AuthGrant = serde_json::from_value(json!({
            "access_token": "jwt",
            "admin_id": 12,
            "role": "npo",
            "telegram_user_id": 555
        }))
        .unwrap();
        assert_eq!(numeric.telegram_user_id.as_deref(), Some("555"));
        assert_eq!(numeric.display_name(), None);
    }

    #[test]
    fn test_page_shapes() {
        let bare = Page::from_value(json!([1, 2, 3]), 1, 10);
        assert_eq!(bare.items.len(), 3);
        assert_eq!(bare.total, 3);
        assert_eq!(bare.total_pages, 1);

        let items = Page::from_value(json!({"items": [1, 2], "total": 25}), 2, 10);
        assert_eq!(items.total, 25);
        assert_eq!(items.total_pages, 3);
        assert!(items.has_next());
        assert!(items.has_prev());

        let data = Page::from_value(json!({"data": [1], "total_pages": 7}), 1, 10);
        assert_eq!(data.total, 1);
        assert_eq!(data.total_pages, 7);
        assert!(!data.has_prev());
    }

    #[test]
    fn test_page_edge_cases() {
        let empty = Page::from_value(json!({"items": []}), 1, 10);
        assert!(empty.is_empty());
        assert_eq!(empty.total_pages, 1);
        assert!(!empty.has_next());

        let odd = Page::from_value(json!({"message": "nope"}), 0, 10);
        assert!(odd.is_empty());
        assert_eq!(odd.page, 1);

        let long: Vec<u32> = (0..15).collect();
        let truncated = Page::from_value(json!(long), 1, 10);
        assert_eq!(truncated.items.len(), 10);
        assert_eq!(truncated.total, 15);
        assert_eq!(truncated.total_pages, 2);
    }
}
