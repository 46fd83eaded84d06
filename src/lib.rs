use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::entity::UserEntity;
use crate::model::{DbConnection, ModelManager};
use crate::storage::LocalObjectStore;
use crate::utils::{signal::shutdown_signal, sweeper::run_session_sweeper};
use crate::web::UserRole;
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod storage;
pub mod utils;
pub mod web;

pub static APPLICATION_NAME: &str = "eduflow";

/// Connects to the configured database, applies migrations and builds the router.
pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = Config::get_or_init(use_local).await;

    let db = DbConnection::connect(config.app().database_uri())?;
    db.migrate(Path::new("./migrations")).await?;

    let store = LocalObjectStore::from_config(config.storage());
    build_server_with(db, store).await
}

/// Router over an already migrated pool, uploads go to `store`.
pub async fn build_server_with(
    db: DbConnection,
    store: LocalObjectStore,
) -> AppResult<(AppState, Router)> {
    let config = Config::get_or_init(true).await;
    let mm = ModelManager::new(db);

    if let Some((username, password)) = config.app().bootstrap_admin() {
        UserEntity::ensure(&mm, username, password, UserRole::Admin).await?;
    }

    let storage_root: PathBuf = store.root().to_path_buf();
    let state = AppState::new(mm, Arc::new(store), config.app().session_cache_ttl());
    let app = web::routes::build_app(state.clone(), config, &storage_root);
    Ok((state, app))
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (state, app) = build_server().await?;
    let config = Config::get_or_init(false).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;
    let token = CancellationToken::new();

    let sweeper = tokio::spawn(run_session_sweeper(
        state.pool().clone(),
        state.sessions().clone(),
        config.app().session_sweep_interval(),
        token.clone(),
    ));

    tracing::info!("{} is starting at: {}", APPLICATION_NAME, config.host().bindto());
    let axum_handle =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(token.clone()));

    let served = axum_handle.await;
    token.cancel();
    if let Err(e) = sweeper.await {
        error::log_error(&e);
    }

    served?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
