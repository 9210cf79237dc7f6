/// Image handling module
///
/// This module handles:
/// - Reading camera metadata from uploaded images (metadata.rs)
/// - Generating and caching grid thumbnails (thumbnail.rs)

pub mod metadata;
pub mod thumbnail;
