//! Upload ingestion: naming, metadata extraction and persistence of a new photo.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::media::metadata::{read_exif, ExifSummary};
use crate::scan::{filename_to_title, is_supported_image};
use crate::state::{Library, LibraryError, NewPhoto};

/// Formats accepted for a user supplied capture time, tried in order
const TAKEN_AT_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("uploads need the local storage backend")]
    CloudBackend,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Optional form fields sent along with the file
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub taken_at: Option<String>,
    /// Comma separated
    pub tags: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name the client gave the file; only its extension is kept
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub id: i64,
    pub photo: NewPhoto,
}

/// Collision-proof storage name: random hex ID plus the lower-cased extension
pub fn storage_name(original_name: &str) -> Result<String, UploadError> {
    if !is_supported_image(original_name) {
        return Err(UploadError::UnsupportedType(original_name.to_string()));
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    Ok(format!("{}.{}", Uuid::new_v4().simple(), ext))
}

/// Split comma separated tags, trimming and dropping empties
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a user supplied capture time. Unparseable input yields `None`.
pub fn parse_taken_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    TAKEN_AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.with_timezone(&Utc).naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Assemble the record for an upload. The form's capture time wins over the
/// EXIF one; a missing title is derived from the client's filename.
pub fn build_record(
    filename: String,
    original_name: &str,
    form: UploadForm,
    exif: Option<ExifSummary>,
    now: DateTime<Utc>,
) -> NewPhoto {
    let taken_at = form
        .taken_at
        .as_deref()
        .and_then(parse_taken_at)
        .or_else(|| exif.as_ref().and_then(|e| e.taken_at));

    let title = non_empty(form.title).or_else(|| Some(filename_to_title(original_name)));

    NewPhoto {
        filename,
        title,
        description: non_empty(form.description),
        location: non_empty(form.location),
        taken_at,
        uploaded_at: now,
        tags: form.tags.as_deref().map(parse_tags).unwrap_or_default(),
        exif_data: exif.map(|e| e.fields).filter(|f| !f.is_empty()),
    }
}

/// Store an uploaded photo in the photo folder and record it in the library.
///
/// Blocking; run it off the async runtime. If the record cannot be inserted
/// the written file is removed again.
pub fn save_upload(
    library: &Library,
    config: &Config,
    form: UploadForm,
    file: UploadedFile,
) -> Result<SavedUpload, UploadError> {
    if config.is_cloud() {
        return Err(UploadError::CloudBackend);
    }

    let filename = storage_name(&file.original_name)?;

    let exif = match read_exif(&file.bytes) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(file = %file.original_name, error = %e, "No usable EXIF metadata");
            None
        }
    };

    let dir = &config.photos_dir;
    std::fs::create_dir_all(dir).map_err(|source| UploadError::Io {
        path: dir.clone(),
        source,
    })?;

    let path = dir.join(&filename);
    std::fs::write(&path, &file.bytes).map_err(|source| UploadError::Io {
        path: path.clone(),
        source,
    })?;

    let photo = build_record(filename, &file.original_name, form, exif, Utc::now());
    let id = match library.insert_photo(&photo) {
        Ok(id) => id,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(id, filename = %photo.filename, bytes = file.bytes.len(), "Photo uploaded");
    Ok(SavedUpload { id, photo })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::StorageBackend;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_storage_name_keeps_only_extension() {
        let name = storage_name("../../etc/Holiday Pic.JPG").unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 32 + 4);
        assert!(!name.contains('/'));
        assert_ne!(storage_name("a.png").unwrap(), storage_name("a.png").unwrap());

        assert!(matches!(
            storage_name("notes.txt"),
            Err(UploadError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(" sunset, beach ,,  , Family "),
            ["sunset", "beach", "Family"]
        );
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_parse_taken_at_forms() {
        let expected = at(2024, 6, 15, 19, 30, 0);
        assert_eq!(parse_taken_at("2024-06-15T19:30"), Some(expected));
        assert_eq!(parse_taken_at("2024-06-15T19:30:00"), Some(expected));
        assert_eq!(parse_taken_at("2024-06-15 19:30:00"), Some(expected));
        assert_eq!(parse_taken_at("2024-06-15T21:30:00+02:00"), Some(expected));
        assert_eq!(parse_taken_at("2024-06-15"), Some(at(2024, 6, 15, 0, 0, 0)));
        assert_eq!(parse_taken_at("last summer"), None);
        assert_eq!(parse_taken_at("2024-13-45"), None);
        assert_eq!(parse_taken_at(""), None);
    }

    #[test]
    fn test_build_record_prefers_form_time_over_exif() {
        let mut fields = BTreeMap::new();
        fields.insert("Model".to_string(), "X100V".to_string());
        let exif = ExifSummary {
            fields,
            taken_at: Some(at(2020, 1, 1, 8, 0, 0)),
        };

        let form = UploadForm {
            taken_at: Some("2024-06-15T19:30".to_string()),
            tags: Some("a, b".to_string()),
            description: Some("   ".to_string()),
            ..Default::default()
        };
        let record = build_record("x.jpg".into(), "beach_day.jpg", form, Some(exif.clone()), Utc::now());
        assert_eq!(record.taken_at, Some(at(2024, 6, 15, 19, 30, 0)));
        assert_eq!(record.title.as_deref(), Some("Beach Day"));
        assert_eq!(record.description, None);
        assert_eq!(record.tags, ["a", "b"]);
        assert_eq!(record.exif_data.unwrap()["Model"], "X100V");

        // Garbage form time falls back to the EXIF capture time
        let form = UploadForm {
            taken_at: Some("garbage".to_string()),
            title: Some("Mine".to_string()),
            ..Default::default()
        };
        let record = build_record("x.jpg".into(), "beach_day.jpg", form, Some(exif), Utc::now());
        assert_eq!(record.taken_at, Some(at(2020, 1, 1, 8, 0, 0)));
        assert_eq!(record.title.as_deref(), Some("Mine"));
    }

    #[test]
    fn test_save_upload_writes_file_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path());
        let library = Library::open_in_memory().unwrap();

        let form = UploadForm {
            title: Some("Harbour".to_string()),
            location: Some("Oslo".to_string()),
            tags: Some("sea,boats".to_string()),
            ..Default::default()
        };
        let file = UploadedFile {
            original_name: "IMG_0001.JPG".to_string(),
            bytes: b"no exif in here".to_vec(),
        };

        let saved = save_upload(&library, &config, form, file).unwrap();
        assert!(config.photos_dir.join(&saved.photo.filename).is_file());

        let stored = library.get_photo(saved.id).unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Harbour"));
        assert_eq!(stored.location.as_deref(), Some("Oslo"));
        assert_eq!(stored.tags, ["sea", "boats"]);
        assert_eq!(stored.exif_data, None);
        assert_eq!(stored.taken_at, None);
    }

    #[test]
    fn test_save_upload_rejected_in_cloud_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path());
        config.storage_backend = StorageBackend::S3;
        config.bucket_name = Some("bucket".to_string());
        let library = Library::open_in_memory().unwrap();

        let file = UploadedFile {
            original_name: "a.jpg".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = save_upload(&library, &config, UploadForm::default(), file);
        assert!(matches!(result, Err(UploadError::CloudBackend)));
        assert_eq!(library.photo_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_insert_removes_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path());
        let library = Library::open(&config.database).unwrap();

        // Break the schema behind the library's back so the insert fails
        rusqlite::Connection::open(&config.database)
            .unwrap()
            .execute_batch("DROP TABLE photos")
            .unwrap();

        let file = UploadedFile {
            original_name: "a.jpg".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = save_upload(&library, &config, UploadForm::default(), file);
        assert!(matches!(result, Err(UploadError::Library(_))));

        let left = std::fs::read_dir(&config.photos_dir).unwrap().count();
        assert_eq!(left, 0);
    }
}
