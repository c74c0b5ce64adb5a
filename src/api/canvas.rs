//! Canvas API endpoints
//!
//! GET  /canvas                      - Full canvas state
//! POST /canvas/pixels/:y/:x?color=C - Set one pixel and notify viewers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pixelboard_canvas::Error;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::AppState;

/// Canvas state response
#[derive(Debug, Serialize)]
pub struct CanvasResponse {
    pub width: usize,
    pub height: usize,
    /// Row-major color codes
    pub pixels: Vec<u8>,
}

/// Pixel write query parameters
#[derive(Debug, Deserialize)]
pub struct PixelQuery {
    pub color: i64,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Canvas error mapped onto an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, message) = if err.is_client_error() {
            (StatusCode::BAD_REQUEST, client_message(&err))
        } else {
            error!(error = %err, code = err.code(), "Canvas request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn client_message(err: &Error) -> String {
    match err {
        Error::InvalidColor { color_max, .. } => {
            format!("color must be 0-{}", color_max.saturating_sub(1))
        }
        Error::OutOfRange { .. } => "out of range".to_string(),
        other => other.to_string(),
    }
}

async fn get_canvas(State(state): State<AppState>) -> Json<CanvasResponse> {
    let snapshot = state.board.snapshot();
    Json(CanvasResponse {
        width: snapshot.width,
        height: snapshot.height,
        pixels: snapshot.cells,
    })
}

async fn set_pixel(
    State(state): State<AppState>,
    Path((y, x)): Path<(i64, i64)>,
    Query(query): Query<PixelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state.board.set_pixel(y, x, query.color)?;
    Ok(Json(StatusResponse { status: "ok" }))
}

/// Create canvas routes
pub fn canvas_routes() -> Router<AppState> {
    Router::new()
        .route("/canvas", get(get_canvas))
        .route("/canvas/pixels/:y/:x", post(set_pixel))
}
