use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::Config;
use crate::state::{Library, LibraryError, NewPhoto};

/// Image extensions picked up from the photo folder (compared lower-cased)
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to create photo folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to list photo folder: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of a folder sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub added: usize,
    pub removed: usize,
}

/// Where the authoritative list of photos comes from
#[derive(Debug, Clone)]
pub enum PhotoSource {
    /// A local folder; the database follows its contents
    Folder(PathBuf),
    /// A cloud bucket; the database itself is the source of truth
    Cloud,
}

impl PhotoSource {
    pub fn from_config(config: &Config) -> Self {
        if config.is_cloud() {
            PhotoSource::Cloud
        } else {
            PhotoSource::Folder(config.photos_dir.clone())
        }
    }
}

/// Whether `name` carries one of the supported image extensions
pub fn is_supported_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Turn a filename like `my_photo-2024.jpg` into `My Photo 2024`.
///
/// Runs of `_`, `-` and `.` in the stem collapse to one space. Falls back to
/// the filename itself when nothing is left.
pub fn filename_to_title(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let mut spaced = String::with_capacity(stem.len());
    let mut in_separator = false;
    for c in stem.chars() {
        if matches!(c, '_' | '-' | '.') {
            if !in_separator {
                spaced.push(' ');
            }
            in_separator = true;
        } else {
            spaced.push(c);
            in_separator = false;
        }
    }

    let title = title_case(spaced.trim());
    if title.is_empty() {
        filename.to_string()
    } else {
        title
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// List supported image files directly inside `dir`, creating it if absent
fn list_folder(dir: &Path) -> Result<HashSet<String>, ScanError> {
    std::fs::create_dir_all(dir).map_err(|source| ScanError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = HashSet::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 filename");
            continue;
        };

        if is_supported_image(name) {
            names.insert(name.to_string());
        }
    }

    Ok(names)
}

/// Bring the library in line with the photo source.
///
/// New files get a record with a title derived from the filename, records
/// whose file has gone are deleted. All changes commit together. In cloud
/// mode nothing is touched.
pub fn scan_photos_folder(library: &Library, source: &PhotoSource) -> Result<SyncResult, ScanError> {
    let dir = match source {
        PhotoSource::Cloud => return Ok(SyncResult::default()),
        PhotoSource::Folder(dir) => dir,
    };

    let on_disk = list_folder(dir)?;
    let in_db = library.filenames()?;

    let now = Utc::now();
    let added: Vec<NewPhoto> = on_disk
        .iter()
        .filter(|name| !in_db.contains(*name))
        .map(|name| NewPhoto::discovered(name.as_str(), filename_to_title(name), now))
        .collect();

    let removed: Vec<String> = in_db
        .iter()
        .filter(|name| !on_disk.contains(*name))
        .cloned()
        .collect();

    if added.is_empty() && removed.is_empty() {
        return Ok(SyncResult::default());
    }

    library.apply_sync(&added, &removed)?;

    let result = SyncResult {
        added: added.len(),
        removed: removed.len(),
    };
    tracing::info!(added = result.added, removed = result.removed, "Photo sync");
    Ok(result)
}
