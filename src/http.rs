use std::time::Duration;

use reqwest::{header, Method, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::SessionHandle;
use crate::error::{extract_error_message, ClientError, GENERIC_FAILURE};

/// JSON client for the marketplace backend.
///
/// Attaches `Authorization: Bearer <token>` when a token is stored and
/// turns every non-2xx answer into a [`ClientError`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: SessionHandle) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bazaar-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ClientError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ClientError::Transport(e.to_string()))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Builds a request; the flag says whether a bearer token was attached.
    /// Credential exchanges under `/api/auth/` never carry one, so a wrong
    /// password cannot expire a live session.
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<(RequestBuilder, bool), ClientError> {
        let url = self.url(path, query)?;
        let request_id = Uuid::new_v4();
        debug!(%method, %url, %request_id, "dispatch");
        let mut req = self
            .http
            .request(method, url)
            .header("X-Request-Id", request_id.to_string());
        let token = self
            .session
            .token()
            .filter(|_| !is_credential_exchange(path));
        let authorized = token.is_some();
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok((req, authorized))
    }

    async fn send(&self, req: RequestBuilder, authorized: bool) -> Result<reqwest::Response, ClientError> {
        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "request failed before a response");
            ClientError::from_transport(e)
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| GENERIC_FAILURE.to_string());
        warn!(%status, %message, "request rejected");

        if status == StatusCode::UNAUTHORIZED {
            if authorized {
                self.session.expire();
            }
            return Err(ClientError::Unauthorized(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let bytes = resp.bytes().await.map_err(ClientError::from_transport)?;
        // Empty bodies (204, bare 200) decode as JSON null.
        let slice: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(slice).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get_query(path, &[]).await
    }

    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ClientError> {
        let (req, authorized) = self.request(Method::GET, path, query)?;
        Self::decode(self.send(req, authorized).await?).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.with_body(Method::POST, path, body).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.with_body(Method::PATCH, path, body).await
    }

    async fn with_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let (req, authorized) = self.request(method, path, &[])?;
        Self::decode(self.send(req.json(body), authorized).await?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let (req, authorized) = self.request(Method::DELETE, path, &[])?;
        Self::decode(self.send(req, authorized).await?).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        let (req, authorized) = self.request(Method::POST, path, &[])?;
        Self::decode(self.send(req.multipart(form), authorized).await?).await
    }
}

fn is_credential_exchange(path: &str) -> bool {
    path.trim_start_matches('/').starts_with("api/auth/")
}

/// Reads `field` out of a wrapped response (`{"product": {...}}`), or
/// decodes the whole value when the backend answered with the bare object.
pub fn unwrap_field<T: DeserializeOwned>(value: Value, field: &str) -> Result<T, ClientError> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key(field) => map.remove(field).unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| ClientError::Decode(format!("{}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    use crate::testkit;

    fn echo_auth_router() -> Router {
        Router::new()
            .route(
                "/api/echo",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(json!({ "auth": auth }))
                }),
            )
            .route(
                "/api/fail",
                post(|| async {
                    (StatusCode::FORBIDDEN, Json(json!({ "error": "Sellers cannot buy their own listing" })))
                }),
            )
            .route(
                "/api/fail-plain",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/api/private",
                get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token expired" }))) }),
            )
            .route("/api/empty", axum::routing::delete(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/api/auth/login",
                post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid credentials" }))) }),
            )
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_stored() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);

        let anon: Value = ctx.api.get("/api/echo").await.expect("anon");
        assert_eq!(anon["auth"], "");

        ctx.settings.set_token("tok-1");
        let authed: Value = ctx.api.get("/api/echo").await.expect("authed");
        assert_eq!(authed["auth"], "Bearer tok-1");
    }

    #[tokio::test]
    async fn non_2xx_uses_error_field_verbatim() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);

        let err = ctx
            .api
            .post::<_, Value>("/api/fail", &json!({}))
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Sellers cannot buy their own listing");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_generic_message() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);
        let err = ctx.api.get::<Value>("/api/fail-plain").await.unwrap_err();
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn unauthorized_with_token_expires_session() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);
        ctx.session.authenticate(Some("dead"), testkit::user("u1", "a@test.com"));

        let err = ctx.api.get::<Value>("/api/private").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), "Token expired");
        assert_eq!(ctx.settings.token(), None);
        assert!(!ctx.session.view().is_authenticated());
    }

    #[tokio::test]
    async fn failed_login_keeps_existing_session() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);
        ctx.session.authenticate(Some("live"), testkit::user("u1", "a@test.com"));

        let err = ctx
            .api
            .post::<_, Value>("/api/auth/login", &json!({ "email": "a@test.com", "password": "nope" }))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(ctx.settings.token().as_deref(), Some("live"));
        assert!(ctx.session.view().is_authenticated());

        let echoed: Value = ctx.api.get("/api/echo").await.expect("echo");
        assert_eq!(echoed["auth"], "Bearer live");
    }

    #[test]
    fn only_auth_endpoints_skip_the_token() {
        assert!(is_credential_exchange("/api/auth/login"));
        assert!(is_credential_exchange("api/auth/register"));
        assert!(!is_credential_exchange("/api/users/me"));
        assert!(!is_credential_exchange("/api/authors"));
    }

    #[tokio::test]
    async fn empty_body_decodes_as_null() {
        let base = testkit::spawn_backend(echo_auth_router()).await;
        let ctx = testkit::context(&base);
        let value = ctx.api.delete("/api/empty").await.expect("delete");
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let ctx = testkit::context("http://127.0.0.1:9");
        let err = ctx.api.get::<Value>("/api/echo").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_) | ClientError::Timeout));
    }

    #[test]
    fn unwrap_field_accepts_wrapped_and_bare() {
        #[derive(serde::Deserialize)]
        struct Thing {
            id: String,
        }
        let wrapped: Thing = unwrap_field(json!({"thing": {"id": "a"}}), "thing").unwrap();
        assert_eq!(wrapped.id, "a");
        let bare: Thing = unwrap_field(json!({"id": "b"}), "thing").unwrap();
        assert_eq!(bare.id, "b");
        assert!(unwrap_field::<Thing>(json!({"thing": 3}), "thing").is_err());
    }
}
