//! Route table and middleware stack.

use axum::{
    http::{HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::auth::{auth_middleware, AuthState};
use crate::handlers::{collections, ingest_url, stream, transcription, upload, videos};
use crate::state::AppState;

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers(Any)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_state = Arc::new(AuthState {
        jwt_secret: state.config.jwt_secret.clone(),
    });

    let api = Router::new()
        .route(
            "/videos/upload/presigned",
            post(upload::request_presigned_upload),
        )
        .route("/videos/{id}/upload/complete", post(upload::complete_upload))
        .route("/videos/youtube", post(ingest_url::ingest_url))
        .route("/videos", get(videos::list_videos))
        .route(
            "/videos/{id}",
            get(videos::get_video)
                .patch(videos::update_video)
                .delete(videos::delete_video),
        )
        .route("/videos/{id}/status", get(videos::get_video_status))
        .route(
            "/videos/{id}/transcription",
            get(transcription::get_transcription),
        )
        .route("/videos/{id}/stream", get(stream::get_stream))
        .route("/videos/{id}/retry", post(videos::retry_video))
        .route(
            "/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        // Registered after the auth layer: the document itself is public.
        .route("/openapi.json", get(openapi_json))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
}
