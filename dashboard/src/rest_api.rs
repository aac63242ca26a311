//! HTTP presentation boundary for a running dashboard session.
//!
//! Serves the live view model, accepts device position pushes for the
//! channel-fed watch backend, and triggers SOS dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use geowatch::PositionFeed;
use proximity::Position;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::controller::DashboardController;
use crate::sos::SosError;

/// Shared state behind the router.
pub struct ApiState {
    pub controller: DashboardController,
    /// Present for channel-fed tourist sessions; `None` otherwise.
    pub feed: Option<PositionFeed>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("malformed payload")]
    MalformedPayload,
    #[error("this session does not accept position pushes")]
    NoPositionFeed,
    #[error("{0}")]
    Sos(#[from] SosError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MalformedPayload => StatusCode::BAD_REQUEST,
            ApiError::NoPositionFeed => StatusCode::CONFLICT,
            ApiError::Sos(SosError::NoLocationAvailable) => StatusCode::CONFLICT,
            ApiError::Sos(SosError::DispatchFailed(_)) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct AcceptedResponse {
    status: String,
}

#[derive(Deserialize)]
struct LocationPush {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct SosPayload {
    #[serde(default)]
    description: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Current view model snapshot.
async fn get_dashboard(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let view = state.controller.view().borrow().clone();
    Json(view)
}

/// Device position push into the watch backend.
async fn push_location(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LocationPush>,
) -> Result<impl IntoResponse, ApiError> {
    let position = Position::new(payload.lat, payload.lng);
    if !position.is_valid() {
        return Err(ApiError::MalformedPayload);
    }

    let feed = state.feed.as_ref().ok_or(ApiError::NoPositionFeed)?;
    if !feed.push(position).await {
        return Err(ApiError::NoPositionFeed);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
        }),
    ))
}

/// SOS dispatch from the current tracked position. Failures come back with
/// an explicit status so the user can decide to resend.
async fn send_sos(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<SosPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state.controller.send_sos(&payload.description).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/location", post(push_location))
        .route("/sos", post(send_sos))
        .with_state(state)
}

/// Serve until the shutdown token fires.
pub async fn serve(
    bind_addr: String,
    state: Arc<ApiState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr: std::net::SocketAddr = bind_addr.parse().context("invalid api bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("api bind failed")?;
    info!("dashboard api listening on {addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("dashboard api shutting down");
        })
        .await
        .context("api server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use backendclient::BackendError;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::MalformedPayload.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Sos(SosError::NoLocationAvailable)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Sos(SosError::DispatchFailed(BackendError::Rejected(
                "503".to_string()
            )))
            .into_response()
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_location_payload_decodes() {
        let push: LocationPush =
            serde_json::from_str(r#"{"lat":12.9716,"lng":77.5946}"#).unwrap();
        assert_eq!(push.lat, 12.9716);
    }
}
