//! REST API Handlers
//!
//! Maps the node RPC surface onto JSON endpoints. Errors become
//! `400` (InvalidArgument), `500` (Internal) or `501` (Unimplemented).

use crate::domain::ports::{
    ExpandVolumeRequest, PublishVolumeRequest, StageVolumeRequest, UnpublishVolumeRequest,
    UnstageVolumeRequest, VolumeStatsRequest,
};
use crate::error::{Error, RpcCode};
use crate::node::NodeService;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

// =============================================================================
// Error Response
// =============================================================================

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

fn status_for(code: RpcCode) -> StatusCode {
    match code {
        RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
        RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        RpcCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.code();
        if code == RpcCode::Internal {
            error!(error = %self, "Request failed");
        }
        (
            status_for(code),
            Json(ApiErrorResponse {
                code: code.to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn respond<T: Serialize>(result: crate::error::Result<T>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    service: Arc<NodeService>,
}

impl RestRouter {
    pub fn new(service: Arc<NodeService>) -> Self {
        Self { service }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        Router::new()
            // Identity endpoints
            .route("/csi/v1/identity/plugin-info", get(get_plugin_info))
            .route("/csi/v1/identity/capabilities", get(get_plugin_capabilities))
            .route("/csi/v1/identity/probe", get(probe))
            .route("/csi/v1/controller/capabilities", get(controller_capabilities))
            // Node endpoints
            .route("/csi/v1/node/stage", post(stage_volume))
            .route("/csi/v1/node/unstage", post(unstage_volume))
            .route("/csi/v1/node/publish", post(publish_volume))
            .route("/csi/v1/node/unpublish", post(unpublish_volume))
            .route("/csi/v1/node/capabilities", get(node_capabilities))
            .route("/csi/v1/node/info", get(node_info))
            .route("/csi/v1/node/volume-stats", post(volume_stats))
            .route("/csi/v1/node/expand", post(expand_volume))
            .route("/health", get(health_check))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.service)
    }
}

type AppState = Arc<NodeService>;

// =============================================================================
// Handlers
// =============================================================================

async fn get_plugin_info(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.get_plugin_info())
}

async fn get_plugin_capabilities(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.get_plugin_capabilities())
}

async fn probe(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.probe())
}

async fn controller_capabilities(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.controller_get_capabilities())
}

async fn stage_volume(
    State(service): State<AppState>,
    Json(request): Json<StageVolumeRequest>,
) -> Response {
    respond(service.node_stage_volume(request).await)
}

async fn unstage_volume(
    State(service): State<AppState>,
    Json(request): Json<UnstageVolumeRequest>,
) -> Response {
    respond(service.node_unstage_volume(request).await)
}

async fn publish_volume(
    State(service): State<AppState>,
    Json(request): Json<PublishVolumeRequest>,
) -> Response {
    respond(service.node_publish_volume(request).await)
}

async fn unpublish_volume(
    State(service): State<AppState>,
    Json(request): Json<UnpublishVolumeRequest>,
) -> Response {
    respond(service.node_unpublish_volume(request).await)
}

async fn node_capabilities(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.node_get_capabilities())
}

async fn node_info(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.node_get_info())
}

async fn volume_stats(
    State(service): State<AppState>,
    Json(request): Json<VolumeStatsRequest>,
) -> Response {
    respond(service.node_get_volume_stats(request))
}

async fn expand_volume(
    State(service): State<AppState>,
    Json(request): Json<ExpandVolumeRequest>,
) -> Response {
    respond(service.node_expand_volume(request))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
