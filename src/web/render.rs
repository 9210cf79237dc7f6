//! HTML for the gallery page and the htmx fragments it swaps in.

use crate::config::Config;
use crate::state::{Photo, PhotoDetail};
use crate::upload::SavedUpload;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// URL used for grid images: cached thumbnails locally, the original in cloud mode
fn grid_image_url(photo: &Photo, config: &Config) -> String {
    if config.is_cloud() {
        config.photo_url(&photo.filename)
    } else {
        format!("/thumbs/{}", photo.id)
    }
}

pub fn index_page() -> String {
    r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Photo Gallery</title>
  <script src="https://unpkg.com/htmx.org@2.0.4"></script>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1200px; padding: 1rem; }
    .toolbar { display: flex; gap: .5rem; margin-bottom: 1rem; }
    .toolbar input[type=search] { flex: 1; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: .75rem; }
    .card { cursor: pointer; margin: 0; }
    .card img { width: 100%; aspect-ratio: 1; object-fit: cover; border-radius: 4px; }
    .detail img { max-width: 100%; max-height: 70vh; }
    .tag { background: #eee; border-radius: 3px; padding: 0 .3rem; margin-right: .25rem; }
    .empty { color: #777; }
  </style>
</head>
<body>
  <h1>Photo Gallery</h1>
  <div class="toolbar">
    <input type="search" name="q" placeholder="Search photos…"
           hx-get="/photos" hx-trigger="input changed delay:300ms, search" hx-target="#grid">
    <button hx-post="/photos/scan" hx-target="#grid">Rescan folder</button>
  </div>
  <form hx-post="/upload" hx-encoding="multipart/form-data" hx-target="#upload-status">
    <input type="file" name="file" accept="image/*" required>
    <input type="text" name="title" placeholder="Title">
    <input type="text" name="description" placeholder="Description">
    <input type="text" name="location" placeholder="Location">
    <input type="datetime-local" name="taken_at">
    <input type="text" name="tags" placeholder="Tags, comma separated">
    <button type="submit">Upload</button>
    <span id="upload-status"></span>
  </form>
  <section id="detail" class="detail"></section>
  <section id="grid" hx-get="/photos" hx-trigger="load, photos-changed from:body"></section>
</body>
</html>
"##
    .to_string()
}

pub fn photo_grid(photos: &[Photo], config: &Config, query: Option<&str>) -> String {
    if photos.is_empty() {
        return match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => format!(r#"<p class="empty">No photos match “{}”.</p>"#, escape(q)),
            None => r#"<p class="empty">No photos yet. Drop some into the photo folder or upload one.</p>"#
                .to_string(),
        };
    }

    let mut html = String::from(r#"<div class="grid">"#);
    for photo in photos {
        let title = escape(photo.display_title());
        html.push_str(&format!(
            r##"<figure class="card" hx-get="/photo/{id}" hx-target="#detail">
<img src="{src}" alt="{title}" loading="lazy">
<figcaption>{title}</figcaption>
</figure>"##,
            id = photo.id,
            src = escape(&grid_image_url(photo, config)),
            title = title,
        ));
    }
    html.push_str("</div>");
    html
}

pub fn photo_detail(detail: &PhotoDetail, config: &Config) -> String {
    let photo = &detail.photo;
    let title = escape(photo.display_title());

    let mut html = format!(
        r#"<article class="detail-card">
<img src="{src}" alt="{title}">
<h2>{title}</h2>
"#,
        src = escape(&config.photo_url(&photo.filename)),
        title = title,
    );

    if let Some(description) = &photo.description {
        html.push_str(&format!("<p>{}</p>\n", escape(description)));
    }

    html.push_str("<dl>\n");
    if let Some(location) = &photo.location {
        html.push_str(&format!("<dt>Location</dt><dd>{}</dd>\n", escape(location)));
    }
    if let Some(taken_at) = photo.taken_at {
        html.push_str(&format!(
            "<dt>Taken</dt><dd>{}</dd>\n",
            taken_at.format("%B %-d, %Y %H:%M")
        ));
    }
    html.push_str(&format!(
        "<dt>Added</dt><dd>{}</dd>\n",
        photo.uploaded_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("</dl>\n");

    if !photo.tags.is_empty() {
        html.push_str(r#"<p class="tags">"#);
        for tag in &photo.tags {
            html.push_str(&format!(r#"<span class="tag">{}</span>"#, escape(tag)));
        }
        html.push_str("</p>\n");
    }

    if let Some(exif) = photo.exif_data.as_ref().filter(|e| !e.is_empty()) {
        html.push_str("<details><summary>Camera</summary><table>\n");
        for (key, value) in exif {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape(key),
                escape(value)
            ));
        }
        html.push_str("</table></details>\n");
    }

    html.push_str("<nav>");
    if let Some(prev) = detail.prev_id {
        html.push_str(&format!(
            r##"<button hx-get="/photo/{prev}" hx-target="#detail">← Newer</button>"##
        ));
    }
    if let Some(next) = detail.next_id {
        html.push_str(&format!(
            r##"<button hx-get="/photo/{next}" hx-target="#detail">Older →</button>"##
        ));
    }
    html.push_str("</nav>\n</article>");
    html
}

pub fn upload_ack(saved: &SavedUpload) -> String {
    let name = saved
        .photo
        .title
        .as_deref()
        .unwrap_or(saved.photo.filename.as_str());
    format!(
        r#"<span class="ok" data-photo-id="{}">Uploaded “{}”.</span>"#,
        saved.id,
        escape(name)
    )
}
