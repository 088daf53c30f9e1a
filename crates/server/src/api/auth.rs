//! HTTP Basic authentication for the admin routes.

use crate::api::errors::ApiError;
use crate::api::handlers::AppState;
use axum::extract::State;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

/// Administrator credentials accepted by the registration endpoint.
#[derive(Clone)]
pub struct AdminCredentials {
    user: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Compares both parts in constant time.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        let user_ok: bool = user.as_bytes().ct_eq(self.user.as_bytes()).into();
        let password_ok: bool = password.as_bytes().ct_eq(self.password.as_bytes()).into();
        user_ok & password_ok
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Decodes an `Authorization: Basic ...` header value into `(user, password)`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

pub(crate) async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    let authorized = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic)
        .is_some_and(|(user, password)| state.admin.verify(&user, &password));

    if !authorized {
        tracing::warn!(path = %req.uri().path(), "Rejected admin request with invalid credentials");
        return Err(ApiError::Unauthorized(
            "Invalid or missing credentials".to_string(),
        ));
    }
    Ok(next.run(req).await)
}
