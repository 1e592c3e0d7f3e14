//! Collection (playlist) handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use vocalless_models::{CollectionSummary, CreatedCollection, Privacy};
use vocalless_publish::Publisher;
use vocalless_worker::CollectionCoordinator;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for `POST /collections`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollectionRequest {
    #[validate(length(min = 1, max = 150, message = "Title must be between 1 and 150 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<Privacy>,
}

async fn connect(state: &AppState) -> ApiResult<Arc<dyn Publisher>> {
    let factory = state
        .publisher
        .as_ref()
        .ok_or_else(|| ApiError::internal("Publishing is not configured"))?;
    Ok(factory.connect().await?)
}

/// GET /collections
pub async fn list_collections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CollectionSummary>>> {
    let publisher = connect(&state).await?;
    Ok(Json(publisher.list_collections().await?))
}

/// POST /collections
///
/// Returns:
/// - 200: `{collection_id, collection_url}`
/// - 400: invalid title
/// - 500: credentials or the publisher failed
pub async fn create_collection(
    State(state): State<AppState>,
    Json(request): Json<CreateCollectionRequest>,
) -> ApiResult<Json<CreatedCollection>> {
    request.validate()?;
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title must not be blank"));
    }

    let publisher = connect(&state).await?;
    let privacy = request
        .privacy
        .unwrap_or_else(|| state.dispatcher.default_privacy());

    let created = CollectionCoordinator::new(&state.metadata)
        .create(
            publisher.as_ref(),
            title,
            request.description.as_deref(),
            privacy,
        )
        .await?;

    info!(collection_id = %created.collection_id, "Collection created via API");
    Ok(Json(created))
}
