use std::collections::BTreeMap;
use std::io::Cursor;

use chrono::NaiveDateTime;

/// EXIF tags kept in the photo's metadata blob
const KEPT_TAGS: [exif::Tag; 13] = [
    exif::Tag::Make,
    exif::Tag::Model,
    exif::Tag::LensModel,
    exif::Tag::DateTimeOriginal,
    exif::Tag::ExposureTime,
    exif::Tag::FNumber,
    exif::Tag::PhotographicSensitivity,
    exif::Tag::FocalLength,
    exif::Tag::PixelXDimension,
    exif::Tag::PixelYDimension,
    exif::Tag::Orientation,
    exif::Tag::Software,
    exif::Tag::Flash,
];

/// Camera metadata pulled from an image's embedded EXIF block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    /// Tag name to display value, e.g. `"Model" -> "X100V"`
    pub fields: BTreeMap<String, String>,
    /// `DateTimeOriginal`, if present and well formed
    pub taken_at: Option<NaiveDateTime>,
}

/// Read the EXIF block from in-memory image bytes.
///
/// Returns `Err` when the container has no EXIF block or it cannot be parsed.
pub fn read_exif(bytes: &[u8]) -> Result<ExifSummary, exif::Error> {
    let mut cursor = Cursor::new(bytes);
    let exif_data = exif::Reader::new().read_from_container(&mut cursor)?;

    let mut summary = ExifSummary::default();
    for field in exif_data.fields() {
        if field.ifd_num != exif::In::PRIMARY || !KEPT_TAGS.contains(&field.tag) {
            continue;
        }

        let value = field_text(field, &exif_data);
        if value.is_empty() {
            continue;
        }

        if field.tag == exif::Tag::DateTimeOriginal {
            summary.taken_at = parse_exif_datetime(&value);
        }
        summary.fields.insert(field.tag.to_string(), value);
    }

    Ok(summary)
}

/// Plain text for a field. ASCII values come back raw (the crate's display
/// form quotes them), everything else uses its display form with units.
fn field_text(field: &exif::Field, exif_data: &exif::Exif) -> String {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => field
            .display_value()
            .with_unit(exif_data)
            .to_string(),
    }
}

/// Parse an EXIF timestamp, `"YYYY:MM:DD HH:MM:SS"`.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S").ok()
}
