/// Shared data structures for the gallery state
///
/// These structs represent the data model that flows between
/// the database layer, the reconciler and the web layer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for `taken_at` (ISO-8601 without a zone)
pub const TAKEN_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Represents a single photo in the library
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Unique database ID
    pub id: i64,
    /// Filename only (e.g., "sunset_2024.jpg"), unique across the library
    pub filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// When the photo was captured (user input or EXIF)
    pub taken_at: Option<NaiveDateTime>,
    /// When the record was created; the display order (newest first)
    pub uploaded_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Extracted camera metadata, tag name to display value
    pub exif_data: Option<BTreeMap<String, String>>,
}

impl Photo {
    /// Title to show in the UI, falling back to the filename
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.filename.as_str())
    }

    /// Case-insensitive substring match across filename, title,
    /// description, location and tags.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);

        hit(&self.filename)
            || self.title.as_deref().is_some_and(hit)
            || self.description.as_deref().is_some_and(hit)
            || self.location.as_deref().is_some_and(hit)
            || self.tags.iter().any(|t| hit(t.as_str()))
    }
}

/// A record that has not been stored yet (no ID)
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub taken_at: Option<NaiveDateTime>,
    pub uploaded_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub exif_data: Option<BTreeMap<String, String>>,
}

impl NewPhoto {
    /// A bare record for a file discovered on disk
    pub fn discovered(filename: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            filename: filename.into(),
            title: Some(title.into()),
            description: None,
            location: None,
            taken_at: None,
            uploaded_at: now,
            tags: Vec::new(),
            exif_data: None,
        }
    }
}

/// A photo plus the IDs of its neighbours in the newest-first listing
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoDetail {
    pub photo: Photo,
    /// The newer neighbour (one position earlier in the listing)
    pub prev_id: Option<i64>,
    /// The older neighbour (one position later in the listing)
    pub next_id: Option<i64>,
}

/// Encode tags for storage
pub fn tags_to_json(tags: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

/// Decode stored tags; a missing or corrupt blob reads as no tags
pub fn tags_from_json(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

/// Decode a stored EXIF blob; a corrupt blob reads as absent
pub fn exif_from_json(raw: Option<&str>) -> Option<BTreeMap<String, String>> {
    raw.and_then(|s| serde_json::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Photo {
        Photo {
            id: 1,
            filename: "photo_1.jpg".to_string(),
            title: Some("Golden Hour".to_string()),
            description: Some("Sunset over the city skyline".to_string()),
            location: Some("New York, NY".to_string()),
            taken_at: None,
            uploaded_at: Utc::now(),
            tags: vec!["urban".to_string(), "cityscape".to_string()],
            exif_data: None,
        }
    }

    #[test]
    fn test_matches_is_case_insensitive_across_fields() {
        let photo = sample();
        assert!(photo.matches("SUNSET"));
        assert!(photo.matches("new york"));
        assert!(photo.matches("CityScape"));
        assert!(photo.matches("photo_1"));
        assert!(!photo.matches("mountain"));
    }

    #[test]
    fn test_display_title_falls_back_to_filename() {
        let mut photo = sample();
        assert_eq!(photo.display_title(), "Golden Hour");
        photo.title = Some("   ".to_string());
        assert_eq!(photo.display_title(), "photo_1.jpg");
        photo.title = None;
        assert_eq!(photo.display_title(), "photo_1.jpg");
    }

    #[test]
    fn test_corrupt_blobs_read_as_empty() {
        assert!(tags_from_json(Some("not json")).is_empty());
        assert!(tags_from_json(None).is_empty());
        assert_eq!(exif_from_json(Some("{broken")), None);

        let tags = vec!["b".to_string(), "a".to_string()];
        let json = tags_to_json(&tags).unwrap();
        assert_eq!(tags_from_json(Some(&json)), tags);
    }
}
