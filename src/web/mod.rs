/// HTTP layer
///
/// - Shared application state and router (mod.rs)
/// - Request handlers (routes.rs)
/// - HTML fragments (render.rs)
/// - Error to response mapping (error.rs)

pub mod error;
pub mod render;
pub mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::media::thumbnail::prune_thumbnails;
use crate::scan::{scan_photos_folder, PhotoSource, ScanError, SyncResult};
use crate::state::{Library, LibraryError};

use self::error::AppError;

pub struct AppState {
    pub config: Config,
    pub library: Arc<Library>,
}

impl AppState {
    pub fn new(config: Config, library: Library) -> Arc<Self> {
        Arc::new(Self {
            config,
            library: Arc::new(library),
        })
    }

    /// Reconcile the library with the photo source off the async runtime.
    /// Thumbnails of photos the sync removed are dropped from the cache.
    pub async fn sync(&self) -> Result<SyncResult, ScanError> {
        let library = Arc::clone(&self.library);
        let source = PhotoSource::from_config(&self.config);
        let thumbnail_dir = self.config.thumbnail_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<SyncResult, ScanError> {
            let result = scan_photos_folder(&library, &source)?;
            if result.removed > 0 {
                let pruned = prune_thumbnails(&thumbnail_dir, &library.photo_ids()?);
                tracing::debug!(pruned, "Pruned thumbnails of removed photos");
            }
            Ok(result)
        })
        .await?
    }

    /// Run a library query on the blocking pool; the connection lock is
    /// shared with the reconciler and must not be held on a runtime worker
    pub async fn query<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Library) -> Result<T, LibraryError> + Send + 'static,
        T: Send + 'static,
    {
        let library = Arc::clone(&self.library);
        Ok(tokio::task::spawn_blocking(move || f(&library)).await??)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(routes::index_handler))
        .route("/photos", get(routes::photos_handler))
        .route("/photos/scan", post(routes::rescan_handler))
        .route("/photo/{id}", get(routes::photo_detail_handler))
        .route("/upload", post(routes::upload_handler))
        .route("/images/{filename}", get(routes::image_handler))
        .route("/thumbs/{id}", get(routes::thumbnail_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
