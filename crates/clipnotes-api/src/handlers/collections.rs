//! Collection endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use clipnotes_core::models::CollectionResponse;
use clipnotes_core::AppError;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCollectionRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionListResponse {
    pub collections: Vec<CollectionResponse>,
}

/// List the owner's collections
#[utoipa::path(
    get,
    path = "/api/collections",
    tag = "collections",
    responses((status = 200, description = "Collections", body = CollectionListResponse))
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id))]
pub async fn list_collections(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let collections = state.collections.list(owner.owner_id).await?;
    Ok(Json(CollectionListResponse {
        collections: collections
            .into_iter()
            .map(CollectionResponse::from)
            .collect(),
    }))
}

/// Create a collection
#[utoipa::path(
    post,
    path = "/api/collections",
    tag = "collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Created", body = CollectionResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(owner_id = %owner.owner_id))]
pub async fn create_collection(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "Collection name must not be blank".to_string(),
        )));
    }

    let collection = state.collections.create(owner.owner_id, name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CollectionResponse::from(collection)),
    ))
}
