//! reqwest implementation of the admin backend

use super::{
    sanitize_detail, AdminBackend, ApiError, ApiErrorKind, ApiResult, AuthGrant, LinkOutcome,
    ProfileHints, Query,
};
use crate::config::BackendConfig;
use crate::logging;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const VERIFY_PATH: &str = "/api/v1/telegram-auth/verify-otp";
const LOGOUT_PATH: &str = "/api/v1/telegram-auth/logout";
const RESTORE_PATH: &str = "/api/v1/telegram-auth/restore-session";
const CONFIRM_LINK_PATH: &str = "/api/v2/telegram/confirm-link";
const BOT_SECRET_HEADER: &str = "X-Bot-Secret";

/// HTTP gateway to the admin backend
///
/// The underlying client is pooled and built on first use; [`HttpGateway::shutdown`]
/// drops it and the next call builds a fresh one.
pub struct HttpGateway {
    base_url: String,
    timeout: Duration,
    link_secret: Option<String>,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, timeout, link_secret: None, client: Mutex::new(None) }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let gateway = Self::new(config.base_url.clone(), config.timeout());
        match config.link_secret() {
            Some(secret) => gateway.with_link_secret(secret),
            None => gateway,
        }
    }

    /// Enable account linking with the bot's shared secret
    pub fn with_link_secret(mut self, secret: impl Into<String>) -> Self {
        self.link_secret = Some(secret.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn slot(&self) -> MutexGuard<'_, Option<reqwest::Client>> {
        self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn client(&self) -> ApiResult<reqwest::Client> {
        let mut slot = self.slot();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ApiError::new(ApiErrorKind::Unavailable, format!("Failed to build HTTP client: {}", e))
            })?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn endpoint(&self, path: &str, query: Query<'_>) -> ApiResult<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            ApiError::new(ApiErrorKind::Rejected, format!("Invalid request URL {}: {}", path, e))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &str, query: Query<'_>) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(path, query)?;
        Ok(self.client()?.request(method, url))
    }

    /// Send a prepared request; returns the status and raw body of any response
    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        request: RequestBuilder,
    ) -> ApiResult<(StatusCode, String)> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                logging::api_call(method.as_str(), path, Err(e.to_string().as_str()));
                return Err(transport_error(e));
            }
        };

        let status = response.status();
        logging::api_call(method.as_str(), path, Ok(status.as_u16()));
        let text = response.text().await.map_err(transport_error)?;
        Ok((status, text))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
        query: Query<'_>,
    ) -> ApiResult<Value> {
        let mut request = self.request(method.clone(), path, query)?;
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let (status, text) = self.dispatch(&method, path, request).await?;
        if status == StatusCode::NO_CONTENT {
            return Ok(json!({ "success": true }));
        }
        if !status.is_success() {
            log::error!("API HTTP error: {} - {}", status.as_u16(), text);
            return Err(ApiError::from_status(status.as_u16(), extract_detail(&text).as_deref()));
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::invalid_response(format!("Invalid JSON from {}: {}", path, e))
        })
    }

    fn decode_grant(value: Value) -> ApiResult<AuthGrant> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::invalid_response(format!("Invalid auth response: {}", e)))
    }

    /// Check the backend answers HTTP at all; returns the root status
    pub async fn probe(&self) -> ApiResult<u16> {
        let url = self.endpoint("/", &[])?;
        let response = self.client()?.get(url).send().await.map_err(transport_error)?;
        Ok(response.status().as_u16())
    }

    /// Drop the pooled client
    pub fn shutdown(&self) {
        if self.slot().take().is_some() {
            log::info!("Backend HTTP client closed");
        }
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        log::error!("API timeout: {}", err);
        ApiError::timeout()
    } else if err.is_connect() {
        log::error!("API connection error: {}", err);
        ApiError::connect()
    } else {
        log::error!("API transport error: {}", err);
        ApiError::new(ApiErrorKind::Unavailable, format!("Backend request failed: {}", err))
    }
}

/// Error detail from a failed response body
fn extract_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => Some(detail.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        Ok(_) => None,
        Err(_) if body.trim().is_empty() => None,
        Err(_) => Some(body.to_string()),
    }
}

#[async_trait]
impl AdminBackend for HttpGateway {
    async fn verify_one_time_token(
        &self,
        token: &str,
        external_user_id: &str,
        hints: &ProfileHints,
    ) -> ApiResult<AuthGrant> {
        let body = json!({
            "otp_token": token.trim().to_uppercase(),
            "telegram_user_id": external_user_id,
            "telegram_username": hints.username,
            "telegram_first_name": hints.first_name,
            "telegram_last_name": hints.last_name,
        });
        let value = self.send(Method::POST, VERIFY_PATH, None, Some(&body), &[]).await?;
        let grant = Self::decode_grant(value)?;
        log::info!("OTP verified for telegram_user_id={}", external_user_id);
        Ok(grant)
    }

    async fn logout(&self, external_user_id: &str) -> ApiResult<()> {
        let body = json!({ "telegram_user_id": external_user_id });
        self.send(Method::POST, LOGOUT_PATH, None, Some(&body), &[]).await?;
        log::info!("Logged out telegram_user_id={}", external_user_id);
        Ok(())
    }

    async fn restore_session(&self, external_user_id: &str) -> ApiResult<AuthGrant> {
        let body = json!({ "telegram_user_id": external_user_id });
        let value = self.send(Method::POST, RESTORE_PATH, None, Some(&body), &[]).await?;
        let grant = Self::decode_grant(value)?;
        log::info!("Session restored for telegram_user_id={}", external_user_id);
        Ok(grant)
    }

    async fn authenticated_call(
        &self,
        method: Method,
        path: &str,
        bearer: &str,
        body: Option<Value>,
        query: Query<'_>,
    ) -> ApiResult<Value> {
        self.send(method, path, Some(bearer), body.as_ref(), query).await
    }

    async fn confirm_link(
        &self,
        token: &str,
        external_user_id: &str,
        hints: &ProfileHints,
    ) -> ApiResult<LinkOutcome> {
        let Some(secret) = self.link_secret.as_deref() else {
            return Err(ApiError::new(ApiErrorKind::Rejected, "Account linking is not configured"));
        };

        let body = json!({
            "token": token,
            "telegram_chat_id": external_user_id,
            "telegram_username": hints.username,
            "telegram_first_name": hints.first_name,
        });
        let request = self
            .request(Method::POST, CONFIRM_LINK_PATH, &[])?
            .header(BOT_SECRET_HEADER, secret)
            .json(&body);
        let (status, text) = self.dispatch(&Method::POST, CONFIRM_LINK_PATH, request).await?;

        match status.as_u16() {
            200..=299 => {
                let user_id = serde_json::from_str::<Value>(&text)
                    .ok()
                    .and_then(|v| v.get("user_id").and_then(Value::as_i64));
                log::info!("Linked telegram_chat_id={} to user_id={:?}", external_user_id, user_id);
                Ok(LinkOutcome::Linked { user_id })
            }
            404 => Ok(LinkOutcome::InvalidToken),
            400 => {
                let detail = extract_detail(&text)
                    .map(|d| sanitize_detail(&d))
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string());
                Ok(LinkOutcome::Refused { detail })
            }
            409 => Ok(LinkOutcome::AlreadyLinked),
            code => {
                if code == 403 {
                    log::error!("Backend rejected the bot link secret");
                }
                Err(ApiError::from_status(code, extract_detail(&text).as_deref()))
            }
        }
    }

    async fn close(&self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Role;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Captured request: lower-cased head and raw body
    struct Captured {
        head: String,
        body: String,
    }

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
    }

    /// Serve one canned response and hand back the request that was received
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = header_end(&buf) {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + length {
                        break;
                    }
                }
            }

            let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
            if !body.is_empty() {
                response.push_str(&format!(
                    "Content-Type: application/json\r\nContent-Length: {}\r\n",
                    body.len()
                ));
            }
            response.push_str("\r\n");
            response.push_str(body);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let end = header_end(&buf).unwrap_or(buf.len());
            Captured {
                head: String::from_utf8_lossy(&buf[..end]).to_lowercase(),
                body: String::from_utf8_lossy(&buf[end..]).to_string(),
            }
        });

        (base, handle)
    }

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(base, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_verify_one_time_token() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"access_token":"jwt-1","token_type":"bearer","admin_id":7,"admin_name":"Aruzhan","role":"administrator","telegram_user_id":"U1","session_created":true}"#,
        )
        .await;

        let hints = ProfileHints::new().with_username("aru");
        let grant = gateway(&base).verify_one_time_token(" abcd1234 ", "U1", &hints).await.unwrap();
        assert_eq!(grant.access_token, "jwt-1");
        assert_eq!(grant.admin_id, 7);
        assert_eq!(grant.role, Role::Administrator);

        let request = server.await.unwrap();
        assert!(request.head.starts_with("post /api/v1/telegram-auth/verify-otp http/1.1"));
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["otp_token"], "ABCD1234");
        assert_eq!(body["telegram_user_id"], "U1");
        assert_eq!(body["telegram_username"], "aru");
        assert_eq!(body["telegram_first_name"], Value::Null);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let (base, _server) =
            serve_once("401 Unauthorized", r#"{"detail":"<b>Invalid</b> or expired token"}"#).await;

        let err = gateway(&base)
            .verify_one_time_token("ABCD1234", "U1", &ProfileHints::default())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.status, Some(401));
        assert_eq!(err.user_message(), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_missing_token_is_not_found() {
        let (base, _server) = serve_once("404 Not Found", r#"{"detail":"Token not found"}"#).await;
        let err = gateway(&base)
            .verify_one_time_token("ABCD1234", "U1", &ProfileHints::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_html_detail_is_sanitized() {
        let (base, _server) =
            serve_once("502 Bad Gateway", "<html><h1>502 Bad Gateway</h1></html>").await;
        let err = gateway(&base).restore_session("U1").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.detail.as_deref(), Some("502 Bad Gateway"));
    }

    #[tokio::test]
    async fn test_other_status_is_rejected() {
        let (base, _server) =
            serve_once("422 Unprocessable Entity", r#"{"detail":[{"msg":"field required"}]}"#).await;
        let err = gateway(&base).logout("U1").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert!(err.user_message().contains("field required"));
    }

    #[tokio::test]
    async fn test_authenticated_call_sends_bearer_and_query() {
        let (base, server) = serve_once("200 OK", r#"{"items":[{"id":1}],"total":1}"#).await;

        let value = gateway(&base)
            .authenticated_call(
                Method::GET,
                "/api/v2/events/",
                "tok-1",
                None,
                &[("page", "2".to_string()), ("page_size", "10".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(value["total"], 1);

        let request = server.await.unwrap();
        assert!(request.head.starts_with("get /api/v2/events/?page=2&page_size=10 http/1.1"));
        assert!(request.head.contains("authorization: bearer tok-1"));
        assert!(request.head.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_no_content_is_success_marker() {
        let (base, _server) = serve_once("204 No Content", "").await;
        let value = gateway(&base)
            .authenticated_call(Method::DELETE, "/api/v2/events/3/", "tok", None, &[])
            .await
            .unwrap();
        assert_eq!(value, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let (base, _server) = serve_once("200 OK", "not json").await;
        let err = gateway(&base)
            .authenticated_call(Method::GET, "/api/v2/news/", "tok", None, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_504() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        // accept and never answer
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let gateway = HttpGateway::new(base, Duration::from_millis(200));
        let err = gateway.logout("U1").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.status, Some(504));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = gateway(&base).logout("U1").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.status, Some(503));
    }

    fn linking_gateway(base: &str) -> HttpGateway {
        gateway(base).with_link_secret("bot-secret")
    }

    #[tokio::test]
    async fn test_confirm_link_sends_secret_and_profile() {
        let (base, server) =
            serve_once("200 OK", r#"{"success":true,"user_id":42,"message":"linked"}"#).await;

        let hints = ProfileHints::new().with_username("aru").with_name("Aruzhan", None);
        let outcome =
            linking_gateway(&base).confirm_link("link-tok", "555", &hints).await.unwrap();
        assert_eq!(outcome, LinkOutcome::Linked { user_id: Some(42) });

        let request = server.await.unwrap();
        assert!(request.head.starts_with("post /api/v2/telegram/confirm-link http/1.1"));
        assert!(request.head.contains("x-bot-secret: bot-secret"));
        assert!(!request.head.contains("authorization:"));
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["token"], "link-tok");
        assert_eq!(body["telegram_chat_id"], "555");
        assert_eq!(body["telegram_username"], "aru");
        assert_eq!(body["telegram_first_name"], "Aruzhan");
    }

    #[tokio::test]
    async fn test_confirm_link_status_outcomes() {
        let (base, _server) = serve_once("404 Not Found", r#"{"detail":"Token not found"}"#).await;
        let outcome = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap();
        assert_eq!(outcome, LinkOutcome::InvalidToken);

        let (base, _server) =
            serve_once("400 Bad Request", r#"{"detail":"<b>Admins</b> cannot link"}"#).await;
        let outcome = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Refused { detail: "Admins cannot link".to_string() });

        let (base, _server) = serve_once("400 Bad Request", "").await;
        let outcome = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Refused { detail: "Unknown error".to_string() });

        let (base, _server) = serve_once("409 Conflict", r#"{"detail":"Already linked"}"#).await;
        let outcome = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap();
        assert_eq!(outcome, LinkOutcome::AlreadyLinked);
    }

    #[tokio::test]
    async fn test_confirm_link_bad_secret_is_error() {
        let (base, _server) = serve_once("403 Forbidden", r#"{"detail":"Invalid bot secret"}"#).await;
        let err = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.status, Some(403));

        let (base, _server) = serve_once("500 Internal Server Error", "").await;
        let err = linking_gateway(&base)
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_confirm_link_requires_secret() {
        // nothing listens here; the call must fail before any request is made
        let err = gateway("http://127.0.0.1:9")
            .confirm_link("t", "555", &ProfileHints::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(extract_detail(r#"{"detail":"gone"}"#).as_deref(), Some("gone"));
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
        assert_eq!(extract_detail("plain failure").as_deref(), Some("plain failure"));
        assert_eq!(extract_detail(""), None);
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let gateway = HttpGateway::new("http://localhost:8000/", Duration::from_secs(1));
        assert_eq!(gateway.base_url(), "http://localhost:8000");
        let url = gateway.endpoint("/api/v2/news/", &[("page", "1".into())]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v2/news/?page=1");
    }
}
