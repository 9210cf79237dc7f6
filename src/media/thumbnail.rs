use image::{imageops::FilterType, ImageFormat};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest edge of generated thumbnails
const THUMBNAIL_SIZE: u32 = 400;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("failed to prepare thumbnail cache {path}: {source}")]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Get the thumbnail path for a photo ID (doesn't generate, just returns the expected path)
pub fn thumbnail_path(cache_dir: &Path, photo_id: i64) -> PathBuf {
    cache_dir.join(format!("{}.jpg", photo_id))
}

/// A cached thumbnail is fresh if it exists and isn't older than its source
fn is_fresh(thumb: &Path, source: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(thumb), modified(source)) {
        (Some(thumb_time), Some(source_time)) => thumb_time >= source_time,
        _ => false,
    }
}

/// Return a thumbnail for `source`, generating it into `cache_dir` when the
/// cached copy is missing or stale.
pub fn ensure_thumbnail(source: &Path, cache_dir: &Path, photo_id: i64) -> Result<PathBuf, ThumbnailError> {
    let thumb = thumbnail_path(cache_dir, photo_id);
    if is_fresh(&thumb, source) {
        return Ok(thumb);
    }

    if !source.is_file() {
        return Err(ThumbnailError::Source {
            path: source.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }

    fs::create_dir_all(cache_dir).map_err(|source| ThumbnailError::CacheDir {
        path: cache_dir.to_path_buf(),
        source,
    })?;

    let img = image::open(source)?;

    // Resize to fit, keeping aspect ratio
    let resized = img.resize(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);

    // JPEG has no alpha channel
    resized.to_rgb8().save_with_format(&thumb, ImageFormat::Jpeg)?;

    tracing::debug!(path = %thumb.display(), "📸 Generated thumbnail");
    Ok(thumb)
}

/// Delete cached thumbnails whose photo ID is no longer in `live_ids`.
/// Returns how many were removed. Files not named `{id}.jpg` are left alone.
pub fn prune_thumbnails(cache_dir: &Path, live_ids: &HashSet<i64>) -> usize {
    let entries = match fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(path = %cache_dir.display(), error = %e, "Failed to read thumbnail cache");
            return 0;
        }
    };

    let mut pruned = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let stale_id = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".jpg"))
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|id| !live_ids.contains(id));

        if stale_id.is_some() {
            match fs::remove_file(&path) {
                Ok(()) => pruned += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale thumbnail"),
            }
        }
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_generates_and_reuses_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wide.png");
        RgbaImage::from_pixel(800, 200, Rgba([200, 30, 30, 128]))
            .save(&source)
            .unwrap();

        let cache = dir.path().join("thumbs");
        let thumb = ensure_thumbnail(&source, &cache, 7).unwrap();
        assert_eq!(thumb, thumbnail_path(&cache, 7));

        let (w, h) = image::image_dimensions(&thumb).unwrap();
        assert_eq!((w, h), (400, 100));

        // Second call hits the cache
        let first_modified = fs::metadata(&thumb).unwrap().modified().unwrap();
        ensure_thumbnail(&source, &cache, 7).unwrap();
        let second_modified = fs::metadata(&thumb).unwrap().modified().unwrap();
        assert_eq!(first_modified, second_modified);
    }

    #[test]
    fn test_undecodable_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        fs::write(&source, b"not a jpeg").unwrap();

        let cache = dir.path().join("thumbs");
        assert!(matches!(
            ensure_thumbnail(&source, &cache, 1),
            Err(ThumbnailError::Image(_))
        ));
        assert!(matches!(
            ensure_thumbnail(&dir.path().join("missing.jpg"), &cache, 2),
            Err(ThumbnailError::Source { .. })
        ));
    }

    #[test]
    fn test_prune_removes_only_stale_ids() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path();
        for name in ["1.jpg", "2.jpg", "3.jpg", "notes.txt", "x.jpg"] {
            fs::write(cache.join(name), b"x").unwrap();
        }

        let live: HashSet<i64> = [1, 3].into_iter().collect();
        assert_eq!(prune_thumbnails(cache, &live), 1);
        assert!(!cache.join("2.jpg").exists());
        for kept in ["1.jpg", "3.jpg", "notes.txt", "x.jpg"] {
            assert!(cache.join(kept).exists(), "{kept} should survive");
        }

        assert_eq!(prune_thumbnails(&cache.join("missing"), &live), 0);
    }
}
