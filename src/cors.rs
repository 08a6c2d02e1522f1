use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, request, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::CorsConfig;
use crate::errors::AppError;

/// Decides which browser origins may call the API.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    exact: Vec<String>,
    suffix: Option<String>,
}

impl OriginPolicy {
    pub fn new(cfg: &CorsConfig) -> Self {
        Self {
            exact: cfg.allowed_origins.clone(),
            suffix: cfg.allowed_suffix.clone(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/');
        if self.exact.iter().any(|o| o == "*" || o == origin) {
            return true;
        }
        let Some(suffix) = &self.suffix else {
            return false;
        };
        let Some(host) = host_of(origin) else {
            return false;
        };
        host == *suffix || host.ends_with(&format!(".{suffix}"))
    }
}

fn host_of(origin: &str) -> Option<String> {
    let (_, rest) = origin.split_once("://")?;
    let authority = rest.split('/').next()?;
    let host = authority.rsplit_once(':').map_or(authority, |(h, _)| h);
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &request::Parts| {
            origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Answers 403 for any request that names an origin outside the policy.
/// Requests without an `Origin` header (curl, server-to-server) pass.
pub async fn reject_disallowed_origin(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(header::ORIGIN) {
        let allowed = origin.to_str().map(|o| policy.allows(o)).unwrap_or(false);
        if !allowed {
            warn!(origin = ?origin, "rejected cross-origin request");
            return AppError::CorsRejected.into_response();
        }
    }
    next.run(req).await
}
