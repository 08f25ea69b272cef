//! Application wiring: database, storage, state, routes.

pub mod database;
pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;

use clipnotes_core::Config;
use clipnotes_storage::build_storage;

use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let pool = database::setup_database(&config).await?;
    let storage = build_storage(&config).context("Failed to initialize storage backend")?;

    let state = AppState::build(config, pool, storage);
    let router = routes::build_router(state.clone());

    Ok((state, router))
}
