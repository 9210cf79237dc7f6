use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::{error::AppError, render, AppState};
use crate::media::thumbnail::ensure_thumbnail;
use crate::scan::is_supported_image;
use crate::upload::{save_upload, UploadForm, UploadedFile};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn index_handler() -> Html<String> {
    Html(render::index_page())
}

/// Grid fragment; syncs the photo folder first
pub async fn photos_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, AppError> {
    state.sync().await?;
    let term = params.q.clone();
    let photos = state
        .query(move |library| library.search_photos(term.as_deref()))
        .await?;
    Ok(Html(render::photo_grid(&photos, &state.config, params.q.as_deref())))
}

/// Manual re-sync, answering with the refreshed grid
pub async fn rescan_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let result = state.sync().await?;
    tracing::debug!(added = result.added, removed = result.removed, "Manual rescan");
    let photos = state.query(|library| library.all_photos()).await?;
    Ok(Html(render::photo_grid(&photos, &state.config, None)))
}

pub async fn photo_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let detail = state
        .query(move |library| library.photo_detail(id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Html(render::photo_detail(&detail, &state.config)))
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = UploadForm::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    file = Some(UploadedFile {
                        original_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "location" => form.location = Some(field.text().await?),
            "taken_at" => form.taken_at = Some(field.text().await?),
            "tags" => form.tags = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let file = file.ok_or(AppError::BadRequest("No file uploaded"))?;

    let app = Arc::clone(&state);
    let saved =
        tokio::task::spawn_blocking(move || save_upload(&app.library, &app.config, form, file))
            .await??;

    Ok((
        [("HX-Trigger", "photos-changed")],
        Html(render::upload_ack(&saved)),
    ))
}

fn content_type(filename: &str) -> &'static str {
    let ext = FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// A bare filename of a supported image, nothing that could leave the folder
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && is_supported_image(filename)
}

/// Photo bytes from the local folder
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if state.config.is_cloud() {
        return Ok(Redirect::temporary(&state.config.photo_url(&filename)).into_response());
    }
    if !is_safe_filename(&filename) {
        return Err(AppError::NotFound);
    }

    let path = state.config.photos_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes).into_response())
}

/// Cached grid thumbnail, falling back to the full image
pub async fn thumbnail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let photo = state
        .query(move |library| library.get_photo(id))
        .await?
        .ok_or(AppError::NotFound)?;
    let full_url = state.config.photo_url(&photo.filename);

    if state.config.is_cloud() {
        return Ok(Redirect::temporary(&full_url).into_response());
    }

    let source = state.config.photos_dir.join(&photo.filename);
    let cache_dir = state.config.thumbnail_dir.clone();
    let generated =
        tokio::task::spawn_blocking(move || ensure_thumbnail(&source, &cache_dir, id)).await?;

    match generated {
        Ok(thumb) => {
            let bytes = tokio::fs::read(&thumb).await?;
            Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
        }
        Err(e) => {
            tracing::warn!(id, error = %e, "Thumbnail unavailable, serving original");
            Ok(Redirect::temporary(&full_url).into_response())
        }
    }
}
