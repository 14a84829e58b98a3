use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::ApiError;

/// Request ID carried through request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token auth settings shared with the protected router.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads bearer tokens from `ADREV_API_KEYS` (comma-separated).
    ///
    /// Missing or empty keys disable auth in development and fail startup
    /// anywhere else.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_keys(&std::env::var("ADREV_API_KEYS").unwrap_or_default());

        if keys.is_empty() {
            anyhow::ensure!(
                is_development,
                "ADREV_API_KEYS must hold at least one bearer token outside development"
            );
            tracing::warn!("ADREV_API_KEYS not set; bearer auth disabled in development");
        }

        Ok(Self {
            enabled: !keys.is_empty(),
            api_keys: Arc::new(keys),
        })
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

fn parse_keys(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Attaches a request ID to every request and response.
///
/// An incoming `x-request-id` header wins; otherwise a fresh UUIDv4 is
/// assigned. Handlers read it from the [`RequestId`] extension, and the
/// response echoes it back in the same header.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Requires a valid bearer token on every request when auth is enabled.
///
/// Rejections use the same [`ApiError`] envelope as handler errors, carrying
/// the request ID assigned by [`request_id`].
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let authorized = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .is_some_and(|token| auth.allows(token));

    if authorized {
        next.run(req).await
    } else {
        unauthorized(&req)
    }
}

fn unauthorized(req: &Request) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map_or("unknown", |id| id.0.as_str());
    ApiError::new(request_id, "unauthorized", "missing or invalid bearer token").into_response()
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
