use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::errors::ApiError;

/// Which browser origins may call the API.
///
/// Requests without an `Origin` header (curl, server-to-server) are always let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    AllowAll,
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// An empty list means no restriction.
    pub fn from_origins(origins: Vec<String>) -> Self {
        if origins.is_empty() {
            OriginPolicy::AllowAll
        } else {
            OriginPolicy::AllowList(origins)
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::AllowAll => true,
            OriginPolicy::AllowList(list) => {
                let origin = origin.trim().trim_end_matches('/');
                list.iter().any(|allowed| allowed == origin)
            }
        }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-user-id")]);

        match self {
            OriginPolicy::AllowAll => layer.allow_origin(Any),
            OriginPolicy::AllowList(list) => {
                let origins: Vec<HeaderValue> = list
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            tracing::warn!(origin = %o, "Ignoring unparseable allowed origin");
                            None
                        }
                    })
                    .collect();
                layer.allow_origin(AllowOrigin::list(origins))
            }
        }
    }
}

/// Rejects browser requests from origins outside the allow-list before they reach a handler.
pub async fn enforce_origin(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(ORIGIN) {
        let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
        if !policy.allows(&origin) {
            return ApiError::OriginRejected(origin).into_response();
        }
    }

    next.run(request).await
}
