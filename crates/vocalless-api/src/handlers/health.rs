//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vocalless_media::ToolRunner;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub jobs: usize,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        jobs: state.registry.len().await,
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: Vec<ToolCheck>,
}

#[derive(Serialize)]
pub struct ToolCheck {
    pub tool: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness check endpoint. Verifies the external tools are on `PATH`.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let media = &state.media;
    let checks: Vec<ToolCheck> = [&media.ytdlp_bin, &media.ffmpeg_bin, &media.python_bin]
        .into_iter()
        .map(|tool| match ToolRunner::new(tool.as_str()).check() {
            Ok(_) => ToolCheck {
                tool: tool.clone(),
                status: "ok".to_string(),
                error: None,
            },
            Err(e) => ToolCheck {
                tool: tool.clone(),
                status: "error".to_string(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    let all_ok = checks.iter().all(|c| c.status == "ok");
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
