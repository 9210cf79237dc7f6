/// State management module
///
/// This module handles all persistent gallery state:
/// - Database connection, schema and queries (library.rs)
/// - Shared data structures (data.rs)
/// - Database error type (error.rs)

pub mod data;
pub mod error;
pub mod library;

pub use data::{NewPhoto, Photo, PhotoDetail};
pub use error::LibraryError;
pub use library::Library;
