use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data::{
    exif_from_json, tags_from_json, tags_to_json, NewPhoto, Photo, PhotoDetail, TAKEN_AT_FORMAT,
};
use super::error::LibraryError;

/// Columns selected for a full `Photo`, in `photo_from_row` order
const PHOTO_COLUMNS: &str =
    "id, filename, title, description, location, taken_at, uploaded_at, tags, exif_data";

/// Newest first; ID breaks ties between records created in the same scan
const DISPLAY_ORDER: &str = "ORDER BY uploaded_at DESC, id DESC";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS photos (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        filename        TEXT NOT NULL UNIQUE,
        title           TEXT,
        description     TEXT,
        location        TEXT,
        taken_at        TEXT,
        uploaded_at     INTEGER NOT NULL,
        tags            TEXT,
        exif_data       TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_photos_uploaded_at
        ON photos(uploaded_at DESC);
";

/// The Library manages the SQLite photo catalog.
/// It stores one row of metadata per photo file.
pub struct Library {
    /// rusqlite::Connection is not Sync, so it lives behind a Mutex
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Library {
    /// Open or create the catalog at `db_path`, creating parent directories.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LibraryError::DataDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path).map_err(|source| LibraryError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(LibraryError::Schema)?;

        Self::init_schema(&conn)?;
        tracing::info!(path = %db_path.display(), "📁 Database initialized");

        Ok(Library {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Open a throwaway in-memory catalog (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory().map_err(|source| LibraryError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init_schema(&conn)?;
        Ok(Library {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Create tables and indexes if they don't exist.
    fn init_schema(conn: &Connection) -> Result<(), LibraryError> {
        conn.execute_batch(SCHEMA).map_err(LibraryError::Schema)?;
        tracing::debug!("Database schema initialized");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LibraryError> {
        self.conn.lock().map_err(|_| LibraryError::Poisoned)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Get a count of photos in the library
    pub fn photo_count(&self) -> Result<i64, LibraryError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    /// All photos, newest first
    pub fn all_photos(&self) -> Result<Vec<Photo>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {PHOTO_COLUMNS} FROM photos {DISPLAY_ORDER}"))?;

        let photos = stmt
            .query_map([], photo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(photos)
    }

    /// Photos matching `term` (see [`Photo::matches`]), newest first.
    /// A missing or blank term returns everything.
    pub fn search_photos(&self, term: Option<&str>) -> Result<Vec<Photo>, LibraryError> {
        let photos = self.all_photos()?;

        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => Ok(photos.into_iter().filter(|p| p.matches(term)).collect()),
            None => Ok(photos),
        }
    }

    pub fn get_photo(&self, id: i64) -> Result<Option<Photo>, LibraryError> {
        let conn = self.conn()?;
        let photo = conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?1"),
                [id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    /// Look up a photo along with its neighbours in display order.
    /// Returns `None` when the ID is unknown.
    pub fn photo_detail(&self, id: i64) -> Result<Option<PhotoDetail>, LibraryError> {
        let Some(photo) = self.get_photo(id)? else {
            return Ok(None);
        };

        let ids: Vec<i64> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!("SELECT id FROM photos {DISPLAY_ORDER}"))?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let (prev_id, next_id) = match ids.iter().position(|&other| other == id) {
            Some(idx) => (
                idx.checked_sub(1).map(|i| ids[i]),
                ids.get(idx + 1).copied(),
            ),
            None => (None, None),
        };

        Ok(Some(PhotoDetail { photo, prev_id, next_id }))
    }

    /// Every filename currently known to the library
    pub fn filenames(&self) -> Result<HashSet<String>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT filename FROM photos")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(names)
    }

    /// IDs of every photo in the library
    pub fn photo_ids(&self) -> Result<HashSet<i64>, LibraryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM photos")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }

    /// Insert a single record. Returns the new photo ID.
    pub fn insert_photo(&self, photo: &NewPhoto) -> Result<i64, LibraryError> {
        let conn = self.conn()?;
        insert_with(&conn, photo)
    }

    /// Apply a folder sync as one transaction: insert `added`, delete every
    /// record whose filename is in `removed`. Nothing is applied on failure.
    pub fn apply_sync(&self, added: &[NewPhoto], removed: &[String]) -> Result<(), LibraryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for photo in added {
            insert_with(&tx, photo)?;
        }

        {
            let mut delete = tx.prepare("DELETE FROM photos WHERE filename = ?1")?;
            for filename in removed {
                delete.execute([filename])?;
            }
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        Ok(())
    }
}

fn insert_with(conn: &Connection, photo: &NewPhoto) -> Result<i64, LibraryError> {
    let tags = tags_to_json(&photo.tags)?;
    let exif = photo
        .exif_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let taken_at = photo
        .taken_at
        .map(|t| t.format(TAKEN_AT_FORMAT).to_string());

    conn.execute(
        "INSERT INTO photos (filename, title, description, location, taken_at, uploaded_at, tags, exif_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            photo.filename,
            photo.title,
            photo.description,
            photo.location,
            taken_at,
            photo.uploaded_at.timestamp_millis(),
            tags,
            exif,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    let taken_at: Option<String> = row.get(5)?;
    let uploaded_at: i64 = row.get(6)?;
    let tags: Option<String> = row.get(7)?;
    let exif: Option<String> = row.get(8)?;

    Ok(Photo {
        id: row.get(0)?,
        filename: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        taken_at: taken_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, TAKEN_AT_FORMAT).ok()),
        uploaded_at: DateTime::from_timestamp_millis(uploaded_at).unwrap_or_default(),
        tags: tags_from_json(tags.as_deref()),
        exif_data: exif_from_json(exif.as_deref()),
    })
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, NaiveDate, Utc};

    use super::*;

    fn new_photo(filename: &str, minutes_ago: i64) -> NewPhoto {
        NewPhoto::discovered(filename, filename, Utc::now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_open_creates_db_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gallery.db");
        let library = Library::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(library.path(), path.as_path());
        assert_eq!(library.photo_count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_get_round_trips_metadata() {
        let library = Library::open_in_memory().unwrap();
        let mut exif = BTreeMap::new();
        exif.insert("Model".to_string(), "X100V".to_string());
        let taken = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(19, 30, 0)
            .unwrap();

        let photo = NewPhoto {
            filename: "golden.jpg".to_string(),
            title: Some("Golden Hour".to_string()),
            description: Some("Sunset over the city".to_string()),
            location: Some("New York, NY".to_string()),
            taken_at: Some(taken),
            uploaded_at: Utc::now(),
            tags: vec!["sunset".to_string(), "urban".to_string()],
            exif_data: Some(exif.clone()),
        };
        let id = library.insert_photo(&photo).unwrap();

        let stored = library.get_photo(id).unwrap().unwrap();
        assert_eq!(stored.filename, "golden.jpg");
        assert_eq!(stored.taken_at, Some(taken));
        assert_eq!(stored.tags, photo.tags);
        assert_eq!(stored.exif_data, Some(exif));
        assert_eq!(stored.uploaded_at.timestamp_millis(), photo.uploaded_at.timestamp_millis());
    }

    #[test]
    fn test_filename_is_unique() {
        let library = Library::open_in_memory().unwrap();
        library.insert_photo(&new_photo("a.jpg", 0)).unwrap();
        assert!(library.insert_photo(&new_photo("a.jpg", 0)).is_err());
    }

    #[test]
    fn test_all_photos_newest_first() {
        let library = Library::open_in_memory().unwrap();
        library.insert_photo(&new_photo("old.jpg", 30)).unwrap();
        library.insert_photo(&new_photo("new.jpg", 1)).unwrap();
        library.insert_photo(&new_photo("mid.jpg", 10)).unwrap();

        let names: Vec<String> = library
            .all_photos()
            .unwrap()
            .into_iter()
            .map(|p| p.filename)
            .collect();
        assert_eq!(names, ["new.jpg", "mid.jpg", "old.jpg"]);
    }

    #[test]
    fn test_search_filters_by_substring() {
        let library = Library::open_in_memory().unwrap();
        let mut beach = new_photo("beach.jpg", 2);
        beach.tags = vec!["Sunset".to_string()];
        library.insert_photo(&beach).unwrap();
        let mut city = new_photo("city.jpg", 1);
        city.description = Some("Lights at night".to_string());
        library.insert_photo(&city).unwrap();
        library.insert_photo(&new_photo("sunset_pier.png", 3)).unwrap();

        let hits: Vec<String> = library
            .search_photos(Some("sunset"))
            .unwrap()
            .into_iter()
            .map(|p| p.filename)
            .collect();
        assert_eq!(hits, ["beach.jpg", "sunset_pier.png"]);

        assert_eq!(library.search_photos(Some("   ")).unwrap().len(), 3);
        assert_eq!(library.search_photos(None).unwrap().len(), 3);
    }

    #[test]
    fn test_photo_detail_neighbours() {
        let library = Library::open_in_memory().unwrap();
        let oldest = library.insert_photo(&new_photo("oldest.jpg", 30)).unwrap();
        let middle = library.insert_photo(&new_photo("middle.jpg", 20)).unwrap();
        let newest = library.insert_photo(&new_photo("newest.jpg", 10)).unwrap();

        let detail = library.photo_detail(middle).unwrap().unwrap();
        assert_eq!(detail.prev_id, Some(newest));
        assert_eq!(detail.next_id, Some(oldest));

        let detail = library.photo_detail(oldest).unwrap().unwrap();
        assert_eq!(detail.prev_id, Some(middle));
        assert_eq!(detail.next_id, None);

        let detail = library.photo_detail(newest).unwrap().unwrap();
        assert_eq!(detail.prev_id, None);
        assert_eq!(detail.next_id, Some(middle));
    }

    #[test]
    fn test_photo_detail_unknown_id() {
        let library = Library::open_in_memory().unwrap();
        assert!(library.photo_detail(42).unwrap().is_none());
    }

    #[test]
    fn test_apply_sync_is_all_or_nothing() {
        let library = Library::open_in_memory().unwrap();
        library.insert_photo(&new_photo("keep.jpg", 5)).unwrap();
        library.insert_photo(&new_photo("gone.jpg", 5)).unwrap();

        // Second insert collides with the first, so the whole batch must roll back
        let added = vec![new_photo("fresh.jpg", 0), new_photo("keep.jpg", 0)];
        let removed = vec!["gone.jpg".to_string()];
        assert!(library.apply_sync(&added, &removed).is_err());

        let names = library.filenames().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("gone.jpg"));
        assert!(!names.contains("fresh.jpg"));

        library
            .apply_sync(&[new_photo("fresh.jpg", 0)], &removed)
            .unwrap();
        let names = library.filenames().unwrap();
        assert!(names.contains("fresh.jpg"));
        assert!(!names.contains("gone.jpg"));
    }
}
