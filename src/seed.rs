use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::state::{Library, LibraryError, NewPhoto};

struct Sample {
    filename: &'static str,
    title: &'static str,
    description: &'static str,
    location: Option<&'static str>,
    tags: [&'static str; 3],
    taken_at: (i32, u32, u32, u32, u32),
}

const SAMPLES: [Sample; 12] = [
    Sample { filename: "photo_1.jpg", title: "Golden Hour", description: "Sunset over the city skyline", location: Some("New York, NY"), tags: ["sunset", "urban", "cityscape"], taken_at: (2024, 6, 15, 19, 30) },
    Sample { filename: "photo_2.jpg", title: "Mountain Vista", description: "Early morning in the mountains", location: Some("Rocky Mountains, CO"), tags: ["landscape", "mountains", "nature"], taken_at: (2024, 7, 22, 6, 15) },
    Sample { filename: "photo_3.jpg", title: "Urban Geometry", description: "Abstract architectural patterns", location: Some("Chicago, IL"), tags: ["architecture", "abstract", "urban"], taken_at: (2024, 5, 10, 14, 20) },
    Sample { filename: "photo_4.jpg", title: "Ocean Waves", description: "Crashing waves at sunset", location: Some("Malibu, CA"), tags: ["ocean", "sunset", "nature"], taken_at: (2024, 8, 3, 19, 45) },
    Sample { filename: "photo_5.jpg", title: "Forest Path", description: "Misty morning trail through the woods", location: Some("Olympic National Park, WA"), tags: ["forest", "nature", "mist"], taken_at: (2024, 9, 12, 7, 0) },
    Sample { filename: "photo_6.jpg", title: "Desert Dunes", description: "Sand patterns in the desert", location: Some("Death Valley, CA"), tags: ["desert", "landscape", "abstract"], taken_at: (2024, 4, 18, 16, 30) },
    Sample { filename: "photo_7.jpg", title: "Night Lights", description: "City lights from above", location: Some("Los Angeles, CA"), tags: ["night", "urban", "cityscape"], taken_at: (2024, 10, 5, 21, 15) },
    Sample { filename: "photo_8.jpg", title: "Autumn Colors", description: "Fall foliage in full display", location: Some("Vermont"), tags: ["autumn", "nature", "landscape"], taken_at: (2024, 10, 20, 11, 30) },
    Sample { filename: "photo_9.jpg", title: "Minimalist", description: "Simple lines and shadows", location: None, tags: ["minimal", "abstract", "architecture"], taken_at: (2024, 3, 8, 13, 0) },
    Sample { filename: "photo_10.jpg", title: "Coastal Cliffs", description: "Dramatic coastline at dusk", location: Some("Big Sur, CA"), tags: ["coast", "landscape", "sunset"], taken_at: (2024, 11, 2, 18, 20) },
    Sample { filename: "photo_11.jpg", title: "Urban Rain", description: "Reflections on wet city streets", location: Some("Seattle, WA"), tags: ["urban", "rain", "reflections"], taken_at: (2024, 11, 15, 17, 45) },
    Sample { filename: "photo_12.jpg", title: "Starry Night", description: "Milky Way over the desert", location: Some("Arizona"), tags: ["stars", "night", "landscape"], taken_at: (2024, 8, 25, 23, 30) },
];

fn naive((y, m, d, h, min): (i32, u32, u32, u32, u32)) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, 0))
}

/// Insert the sample photos if the library is empty.
/// Returns how many records were added.
///
/// With the local backend the records only survive the next scan if the
/// matching `photo_N.jpg` files exist in the photo folder.
pub fn seed_library(library: &Library) -> Result<usize, LibraryError> {
    if library.photo_count()? > 0 {
        tracing::info!("Database already seeded");
        return Ok(0);
    }

    let now = Utc::now();
    let records: Vec<NewPhoto> = SAMPLES
        .iter()
        .map(|s| NewPhoto {
            filename: s.filename.to_string(),
            title: Some(s.title.to_string()),
            description: Some(s.description.to_string()),
            location: s.location.map(str::to_string),
            taken_at: naive(s.taken_at),
            uploaded_at: now,
            tags: s.tags.iter().map(|t| t.to_string()).collect(),
            exif_data: None,
        })
        .collect();

    library.apply_sync(&records, &[])?;
    tracing::info!(count = records.len(), "Seeded database with sample photos");
    Ok(records.len())
}
