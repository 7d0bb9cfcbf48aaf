use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::audit::{AuditLevel, AuditLogger, Component};
use crate::errors::{ApiError, StoreError};
use crate::model::{
    ClickInfo, ClickView, HealthResponse, ShortUrlRequest, ShortUrlResponse, StatsResponse,
};
use crate::shortcode::{allocate, is_valid_shortcode, DEFAULT_VALIDITY_MINUTES};
use crate::store::UrlStore;
use crate::utils::{client_address, get_header, is_expired, parse_url};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UrlStore>,
    pub audit: AuditLogger,
    pub base_url: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/shorturls", post(create_short_url))
        .route("/shorturls/:shortcode", get(get_short_url_stats))
        .route("/health", get(health))
        .route("/:shortcode", get(redirect))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn create_short_url(
    State(state): State<AppState>,
    Json(request): Json<ShortUrlRequest>,
) -> Result<(StatusCode, Json<ShortUrlResponse>), ApiError> {
    state.audit.emit(
        AuditLevel::Info,
        Component::Controller,
        "Processing create short URL request",
    );

    let url = parse_url(&request.url)?;
    let validity_minutes = match request.validity {
        None => DEFAULT_VALIDITY_MINUTES,
        Some(0) => {
            state.audit.emit(
                AuditLevel::Warn,
                Component::Controller,
                "Invalid validity parameter: 0",
            );
            return Err(ApiError::InvalidValidity);
        }
        Some(minutes) => minutes,
    };

    let record = allocate(
        &state.store,
        &url,
        validity_minutes,
        request.shortcode.as_deref(),
    )
    .map_err(|err| {
        state.audit.emit(
            AuditLevel::Warn,
            Component::Controller,
            format!("Short URL creation failed: {}", err),
        );
        ApiError::from(err)
    })?;

    state.audit.emit(
        AuditLevel::Info,
        Component::Controller,
        format!("Short URL created successfully: {}", record.shortcode),
    );
    Ok((
        StatusCode::CREATED,
        Json(ShortUrlResponse {
            short_link: format!("{}/{}", state.base_url, record.shortcode),
            expiry: record.expires_at,
        }),
    ))
}

pub async fn redirect(
    State(state): State<AppState>,
    Path(shortcode): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = state.store.get(&shortcode).ok_or_else(|| {
        state.audit.emit(
            AuditLevel::Warn,
            Component::Handler,
            format!("Shortcode not found for redirect: {}", shortcode),
        );
        ApiError::NotFound
    })?;

    // Expiry is decided before anything is recorded; a lapsed code must not
    // count as a click.
    if is_expired(record.expires_at) {
        state.audit.emit(
            AuditLevel::Warn,
            Component::Handler,
            format!("Expired shortcode accessed: {}", shortcode),
        );
        return Err(ApiError::Expired {
            expired_at: record.expires_at,
        });
    }

    let click = ClickInfo {
        referrer: get_header("referer", &headers),
        user_agent: get_header("user-agent", &headers),
        source_address: Some(client_address(&headers, peer.map(|info| info.0))),
    };
    state
        .store
        .record_click(&shortcode, click)
        .map_err(|_: StoreError| ApiError::NotFound)?;

    state.audit.emit(
        AuditLevel::Info,
        Component::Handler,
        format!(
            "Redirect successful for shortcode: {} to {}",
            shortcode, record.original_url
        ),
    );
    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", record.original_url)
        .body(Body::empty())
        .expect("Response build failed"))
}

pub async fn get_short_url_stats(
    State(state): State<AppState>,
    Path(shortcode): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    state.audit.emit(
        AuditLevel::Info,
        Component::Controller,
        format!("Processing stats request for shortcode: {}", shortcode),
    );

    if !is_valid_shortcode(&shortcode) {
        return Err(ApiError::InvalidShortcodeFormat);
    }
    let record = state.store.get(&shortcode).ok_or(ApiError::NotFound)?;
    let clicks = state.store.analytics(&shortcode);

    Ok(Json(StatsResponse {
        is_expired: is_expired(record.expires_at),
        total_clicks: clicks.len(),
        click_history: clicks.into_iter().map(ClickView::from).collect(),
        shortcode: record.shortcode,
        original_url: record.original_url,
        created_at: record.created_at,
        expires_at: record.expires_at,
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    state
        .audit
        .emit(AuditLevel::Info, Component::Route, "Health check requested");
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        total_urls: state.store.total_count(),
    })
}
