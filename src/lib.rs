pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod models;
pub mod params;
pub mod render;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::cache::PageCache;
use crate::config::AppConfig;
use crate::media::MediaStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub cache: Arc<PageCache>,
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let cache = Arc::new(PageCache::new(Duration::from_secs(config.cache_ttl_secs)));
        let media = Arc::new(MediaStore::new(&config.media_root));
        Self {
            db,
            config,
            cache,
            media,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<PageCache> {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for Arc<MediaStore> {
    fn from_ref(state: &AppState) -> Self {
        state.media.clone()
    }
}
