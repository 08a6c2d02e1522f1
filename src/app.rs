use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    http::{Request, Response},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::Span;

use crate::{
    auth, candidates,
    config::{ServerConfig, StorageConfig},
    cors::{cors_layer, reject_disallowed_origin, OriginPolicy},
    errors::AppError,
    response::ApiResponse,
    state::AppState,
};

async fn index() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Candidate Referral Management API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> ApiResponse<()> {
    ApiResponse::message("Server is running")
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

pub fn build_app(state: AppState) -> Router {
    let policy = Arc::new(OriginPolicy::new(&state.config.cors));

    let api = Router::new()
        .merge(auth::router())
        .merge(candidates::router())
        .route("/health", get(health));

    let mut app = Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .fallback(not_found);

    if let StorageConfig::Local { uploads_dir } = &state.config.storage {
        app = app.nest_service("/uploads", ServeDir::new(uploads_dir));
    }

    app.with_state(state)
        .layer(cors_layer(policy.clone()))
        .layer(middleware::from_fn_with_state(
            policy,
            reject_disallowed_origin,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    let latency_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        tracing::error!(%status, latency_ms, "response");
                    } else {
                        tracing::info!(%status, latency_ms, "response");
                    }
                }),
        )
}

pub async fn serve(app: Router, server: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
