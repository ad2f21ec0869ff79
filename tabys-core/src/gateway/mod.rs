//! Backend API gateway
//!
//! The admin backend is an opaque HTTP service. [`AdminBackend`] is the
//! contract the rest of the crate depends on; [`HttpGateway`] implements it
//! over reqwest. This is the only layer that sees transport errors: every
//! failure leaves here as an [`ApiError`] with a kind callers can branch on.

mod error;
mod http;
mod types;

pub use error::{sanitize_detail, ApiError, ApiErrorKind, ApiResult, MAX_DETAIL_LEN};
pub use http::HttpGateway;
pub use types::{AuthGrant, LinkOutcome, Page, ProfileHints};

pub use reqwest::Method;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Query parameters for an authenticated call
pub type Query<'a> = &'a [(&'a str, String)];

/// Operations the bot needs from the admin backend
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Exchange a one-time token for a credential
    async fn verify_one_time_token(
        &self,
        token: &str,
        external_user_id: &str,
        hints: &ProfileHints,
    ) -> ApiResult<AuthGrant>;

    /// Tell the backend the identity logged out
    async fn logout(&self, external_user_id: &str) -> ApiResult<()>;

    /// Re-issue a credential for an identity the backend still trusts
    async fn restore_session(&self, external_user_id: &str) -> ApiResult<AuthGrant>;

    /// Call any endpoint with a bearer credential
    ///
    /// An empty success (204) is returned as `{"success": true}`.
    async fn authenticated_call(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<Value>,
        query: Query<'_>,
    ) -> ApiResult<Value>;

    /// Confirm a token that links the identity to a regular user account
    ///
    /// Backends without linking support refuse with [`ApiErrorKind::Rejected`].
    async fn confirm_link(
        &self,
        _token: &str,
        _external_user_id: &str,
        _hints: &ProfileHints,
    ) -> ApiResult<LinkOutcome> {
        Err(ApiError::new(ApiErrorKind::Rejected, "Account linking is not supported"))
    }

    /// Release pooled connections
    async fn close(&self) {}
}

#[async_trait]
impl<B: AdminBackend + ?Sized> AdminBackend for Arc<B> {
    async fn verify_one_time_token(
        &self,
        token: &str,
        external_user_id: &str,
        hints: &ProfileHints,
    ) -> ApiResult<AuthGrant> {
        (**self).verify_one_time_token(token, external_user_id, hints).await
    }

    async fn logout(&self, external_user_id: &str) -> ApiResult<()> {
        (**self).logout(external_user_id).await
    }

    async fn restore_session(&self, external_user_id: &str) -> ApiResult<AuthGrant> {
        (**self).restore_session(external_user_id).await
    }

    async fn authenticated_call(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<Value>,
        query: Query<'_>,
    ) -> ApiResult<Value> {
        (**self).authenticated_call(method, path, bearer, body, query).await
    }

    async fn confirm_link(
        &self,
        token: &str,
        external_user_id: &str,
        hints: &ProfileHints,
    ) -> ApiResult<LinkOutcome> {
        (**self).confirm_link(token, external_user_id, hints).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
